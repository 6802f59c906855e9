//! Response payloads returned by the HTTP surface.

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose};
use lovebrew_bundler::{ConvertedAsset, Target, ToolReport};
use lovebrew_config::AppMode;
use serde::{Deserialize, Serialize};

/// RFC9457-compatible problem document surfaced on request errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    /// URI reference identifying the problem type.
    pub kind: String,
    /// Short, human-readable summary of the issue.
    pub title: String,
    /// HTTP status code associated with the error.
    pub status: u16,
    /// Stable machine-readable error code.
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Detailed diagnostic message when available.
    pub detail: Option<String>,
}

/// Failure recorded for one target of a compile request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetFailure {
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable description.
    pub detail: String,
}

/// Body of a `/compile` response.
///
/// Successful targets appear as top-level keys holding the base64 binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompileResponse {
    /// Base64-encoded binaries keyed by target id.
    #[serde(flatten)]
    pub binaries: BTreeMap<Target, String>,
    /// Failures keyed by target id.
    pub errors: BTreeMap<Target, TargetFailure>,
    /// Concatenated request log.
    pub log: String,
}

/// One converted asset in a `/convert` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConvertedFile {
    /// Archive-relative path with the converted extension.
    pub filepath: String,
    /// Base64-encoded converted bytes.
    pub data: String,
}

impl ConvertedFile {
    pub(crate) fn encode(asset: &ConvertedAsset) -> Self {
        Self {
            filepath: asset.filepath.clone(),
            data: general_purpose::STANDARD.encode(&asset.data),
        }
    }
}

/// Body of a `/info` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    /// Current server time (RFC3339).
    pub server_time: String,
    /// Time the server started (RFC3339).
    pub deployed_time: String,
    /// Time since start as `HH:MM:SS`.
    pub uptime: String,
    /// Crate version.
    pub version: String,
    /// Build SHA recorded at start-up.
    pub build: String,
}

/// Body of a `/health` response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: &'static str,
    /// Operating mode.
    pub mode: AppMode,
    /// Build SHA recorded at start-up.
    pub build: String,
    /// SDK tools found and missing on this host.
    pub tools: ToolReport,
    /// Bundled resources that are absent from the resources directory.
    pub missing_resources: Vec<String>,
}
