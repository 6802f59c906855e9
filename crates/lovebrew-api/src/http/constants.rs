//! Shared constants for the HTTP surface.

pub(crate) const HEADER_REQUEST_ID: &str = lovebrew_telemetry::REQUEST_ID_HEADER;

pub(crate) const PROBLEM_INTERNAL: &str = "https://lovebrew.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://lovebrew.dev/problems/bad-request";
pub(crate) const PROBLEM_UNSUPPORTED_MEDIA: &str =
    "https://lovebrew.dev/problems/unsupported-media-type";
pub(crate) const PROBLEM_INVALID_ASSET: &str = "https://lovebrew.dev/problems/invalid-asset";
pub(crate) const PROBLEM_PAYLOAD_TOO_LARGE: &str =
    "https://lovebrew.dev/problems/payload-too-large";
pub(crate) const PROBLEM_SERVICE_UNAVAILABLE: &str =
    "https://lovebrew.dev/problems/service-unavailable";
pub(crate) const PROBLEM_TIMEOUT: &str = "https://lovebrew.dev/problems/tool-timeout";

/// Prefix of multipart fields carrying a custom icon, followed by the target id.
pub(crate) const ICON_FIELD_PREFIX: &str = "icon-";
/// Multipart field carrying the game archive.
pub(crate) const GAME_FIELD: &str = "game";
