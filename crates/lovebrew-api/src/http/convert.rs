//! `POST /convert`: convert uploaded textures and fonts.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use lovebrew_bundler::ConversionRequest;
use tracing::{info, warn};

use crate::http::errors::ApiError;
use crate::http::telemetry::current_request_log;
use crate::models::ConvertedFile;
use crate::state::ApiState;

pub(crate) async fn convert(
    State(state): State<Arc<ApiState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<ConvertedFile>>, ApiError> {
    let multipart = multipart.map_err(|rejection| {
        ApiError::bad_request("NO_FILE_UPLOADED", rejection.body_text())
    })?;
    let requests = read_requests(multipart).await?;
    if requests.is_empty() {
        return Err(ApiError::bad_request(
            "NO_FILE_UPLOADED",
            "at least one file must be uploaded",
        ));
    }

    let log = current_request_log();
    match state.converter.convert_all(&requests, &log).await {
        Ok(converted) => {
            info!(
                request_id = %log.request_id(),
                files = converted.len(),
                "conversion request finished"
            );
            Ok(Json(converted.iter().map(ConvertedFile::encode).collect()))
        }
        Err(err) => {
            warn!(request_id = %log.request_id(), code = err.code(), "conversion request failed");
            Err(err.into())
        }
    }
}

/// Every upload becomes one request keyed by its field name, the archive-relative path.
async fn read_requests(mut multipart: Multipart) -> Result<Vec<ConversionRequest>, ApiError> {
    let mut requests = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let path = field.name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        requests.push(ConversionRequest::new(&path, bytes.to_vec())?);
    }
    Ok(requests)
}
