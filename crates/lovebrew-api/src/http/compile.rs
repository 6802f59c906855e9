//! `POST /compile`: package the bundled runtime for every requested target.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Multipart, Query, State,
        multipart::MultipartRejection,
        rejection::QueryRejection,
    },
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
};
use base64::{Engine as _, engine::general_purpose};
use lovebrew_bundler::{
    BuildMetadata, CompileOutcome, CompileStatus, MetadataFields, RequestLog, Target,
};
use serde::Deserialize;
use tracing::info;

use crate::http::constants::{GAME_FIELD, ICON_FIELD_PREFIX};
use crate::http::errors::ApiError;
use crate::http::telemetry::current_request_log;
use crate::models::{CompileResponse, TargetFailure};
use crate::state::ApiState;

/// Metadata accepted on the `/compile` query string.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CompileQuery {
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
    version: Option<String>,
    targets: Option<String>,
}

impl From<CompileQuery> for MetadataFields {
    fn from(query: CompileQuery) -> Self {
        Self {
            title: query.title,
            author: query.author,
            description: query.description,
            version: query.version,
            targets: query.targets,
        }
    }
}

/// Uploads carried by the multipart body of a compile request.
#[derive(Debug, Default)]
pub(crate) struct CompileUploads {
    icons: Vec<(Target, Vec<u8>)>,
    game: Option<Vec<u8>>,
}

pub(crate) async fn compile(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<CompileQuery>, QueryRejection>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<CompileResponse>), ApiError> {
    let Query(query) =
        query.map_err(|rejection| ApiError::bad_request("INVALID_QUERY", rejection.body_text()))?;
    // A bodiless compile request carries no uploads.
    let uploads = if headers.contains_key(CONTENT_TYPE) {
        let multipart = multipart.map_err(|rejection| {
            ApiError::bad_request("INVALID_MULTIPART", rejection.body_text())
        })?;
        read_uploads(multipart).await?
    } else {
        CompileUploads::default()
    };
    let metadata = BuildMetadata::from_parts(query.into(), uploads.icons, uploads.game)?;

    let log = current_request_log();
    let outcome = state.orchestrator.compile(&metadata, &log).await;
    let status = outcome.status();
    info!(
        request_id = %log.request_id(),
        status = status.as_str(),
        "compile request finished"
    );
    Ok((status_code(status), Json(render(outcome, &log))))
}

async fn read_uploads(mut multipart: Multipart) -> Result<CompileUploads, ApiError> {
    let mut uploads = CompileUploads::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == GAME_FIELD {
            uploads.game = Some(field.bytes().await?.to_vec());
        } else if let Some(target) = name.strip_prefix(ICON_FIELD_PREFIX) {
            let target = Target::from_str(target)?;
            uploads.icons.push((target, field.bytes().await?.to_vec()));
        } else {
            return Err(ApiError::bad_request(
                "UNEXPECTED_FIELD",
                format!("unexpected upload field '{name}'"),
            ));
        }
    }
    Ok(uploads)
}

const fn status_code(status: CompileStatus) -> StatusCode {
    match status {
        CompileStatus::AllSuccess => StatusCode::OK,
        CompileStatus::PartialSuccess => StatusCode::MULTI_STATUS,
        CompileStatus::Failure => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn render(outcome: CompileOutcome, log: &RequestLog) -> CompileResponse {
    let mut binaries = BTreeMap::new();
    let mut errors = BTreeMap::new();
    for target_outcome in outcome.into_outcomes() {
        match target_outcome.result {
            Ok(binary) => {
                binaries.insert(
                    target_outcome.target,
                    general_purpose::STANDARD.encode(binary),
                );
            }
            Err(err) => {
                errors.insert(
                    target_outcome.target,
                    TargetFailure {
                        code: err.code().to_string(),
                        detail: err.detail(),
                    },
                );
            }
        }
    }
    CompileResponse {
        binaries,
        errors,
        log: log.contents(),
    }
}
