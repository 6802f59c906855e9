//! RFC9457-style API error wrapper.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lovebrew_bundler::{AssetError, CommandError, ConversionError, MetadataError};

use crate::http::constants::{
    PROBLEM_BAD_REQUEST, PROBLEM_INTERNAL, PROBLEM_INVALID_ASSET, PROBLEM_PAYLOAD_TOO_LARGE,
    PROBLEM_SERVICE_UNAVAILABLE, PROBLEM_TIMEOUT, PROBLEM_UNSUPPORTED_MEDIA,
};
use crate::models::ProblemDetails;

/// Structured API error carrying a stable code.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    pub(crate) code: &'static str,
    detail: Option<String>,
}

impl ApiError {
    const fn new(
        status: StatusCode,
        kind: &'static str,
        title: &'static str,
        code: &'static str,
    ) -> Self {
        Self {
            status,
            kind,
            title,
            code,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
            "INTERNAL_ERROR",
        )
        .with_detail(detail)
    }

    pub(crate) fn bad_request(code: &'static str, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request", code)
            .with_detail(detail)
    }

    pub(crate) fn unsupported_media_type(code: &'static str, detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            PROBLEM_UNSUPPORTED_MEDIA,
            "unsupported media type",
            code,
        )
        .with_detail(detail)
    }

    pub(crate) fn invalid_asset(code: &'static str, detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            PROBLEM_INVALID_ASSET,
            "asset could not be processed",
            code,
        )
        .with_detail(detail)
    }

    pub(crate) fn payload_too_large(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            PROBLEM_PAYLOAD_TOO_LARGE,
            "payload too large",
            "PAYLOAD_TOO_LARGE",
        )
        .with_detail(detail)
    }

    pub(crate) fn service_unavailable(code: &'static str, detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            PROBLEM_SERVICE_UNAVAILABLE,
            "service unavailable",
            code,
        )
        .with_detail(detail)
    }

    pub(crate) fn timeout(code: &'static str, detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            PROBLEM_TIMEOUT,
            "tool timed out",
            code,
        )
        .with_detail(detail)
    }

    fn from_asset(err: &AssetError, detail: String) -> Self {
        match err {
            AssetError::InvalidFileType | AssetError::IconFormatMismatch { .. } => {
                Self::unsupported_media_type(err.code(), detail)
            }
            _ => Self::invalid_asset(err.code(), detail),
        }
    }

    fn from_command(err: &CommandError, code: &'static str, detail: String) -> Self {
        match err {
            CommandError::CommandFailed { .. } => Self::invalid_asset(code, detail),
            CommandError::ExecutableNotFound { .. } => Self::service_unavailable(code, detail),
            CommandError::TimedOut { .. } => Self::timeout(code, detail),
            CommandError::ArgumentMissing { .. }
            | CommandError::MalformedTemplate { .. }
            | CommandError::Spawn { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                PROBLEM_INTERNAL,
                "internal server error",
                code,
            )
            .with_detail(detail),
        }
    }
}

impl From<MetadataError> for ApiError {
    fn from(err: MetadataError) -> Self {
        let detail = err.detail();
        match &err {
            MetadataError::Icon { source, .. } => Self::from_asset(source, detail),
            MetadataError::NoTargets
            | MetadataError::InvalidTarget { .. }
            | MetadataError::UnexpectedIcon { .. } => Self::bad_request(err.code(), detail),
        }
    }
}

impl From<ConversionError> for ApiError {
    fn from(err: ConversionError) -> Self {
        let detail = err.detail();
        match &err {
            ConversionError::InvalidPath { .. } => Self::bad_request(err.code(), detail),
            ConversionError::Asset { source } => Self::from_asset(source, detail),
            ConversionError::Tool { source } => Self::from_command(source, err.code(), detail),
            ConversionError::Io { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                PROBLEM_INTERNAL,
                "internal server error",
                err.code(),
            )
            .with_detail(detail),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::payload_too_large(err.body_text())
        } else {
            Self::bad_request("INVALID_MULTIPART", err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            code: self.code.to_string(),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_errors_are_client_errors() {
        let err = ApiError::from(MetadataError::InvalidTarget {
            value: "bogus".to_string(),
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "TARGET_NOT_VALID");
        assert_eq!(err.detail.as_deref(), Some("'bogus' is not a valid target"));
    }

    #[test]
    fn asset_errors_split_between_415_and_422() {
        let wrong_type = ApiError::from(ConversionError::from(AssetError::InvalidFileType));
        assert_eq!(wrong_type.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(wrong_type.code, "INVALID_FILE_TYPE");

        let empty = ApiError::from(ConversionError::from(AssetError::EmptyFile));
        assert_eq!(empty.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(empty.code, "EMPTY_FILE");
    }

    #[test]
    fn tool_errors_map_by_failure_kind() {
        let failed = ApiError::from(ConversionError::from(CommandError::CommandFailed {
            program: "tex3ds".to_string(),
            exit_code: 1,
            stderr: "bad input".to_string(),
        }));
        assert_eq!(failed.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(failed.code, "CANNOT_PROCESS_FILE");

        let missing = ApiError::from(ConversionError::from(CommandError::ExecutableNotFound {
            program: "tex3ds".to_string(),
        }));
        assert_eq!(missing.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(missing.code, "COMMAND_EXE_NOT_FOUND");
    }

    #[test]
    fn invalid_paths_are_bad_requests() {
        let err = ApiError::from(ConversionError::InvalidPath {
            path: "../escape.png".to_string(),
            reason: "path escapes the archive root",
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INVALID_FILE_PATH");
    }

    #[tokio::test]
    async fn problem_body_carries_code() -> anyhow::Result<()> {
        let response = ApiError::bad_request("NO_FILE_UPLOADED", "no files").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body: ProblemDetails = serde_json::from_slice(&bytes)?;
        assert_eq!(body.code, "NO_FILE_UPLOADED");
        assert_eq!(body.status, 400);
        assert_eq!(body.kind, PROBLEM_BAD_REQUEST);
        assert_eq!(body.detail.as_deref(), Some("no files"));
        Ok(())
    }
}
