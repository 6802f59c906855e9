//! HTTP surface modules (router, handlers, middleware).

/// `/compile` handler and multipart parsing.
pub mod compile;
/// Shared constants and header names.
pub mod constants;
/// `/convert` handler.
pub mod convert;
/// Problem response helpers and error types.
pub mod errors;
/// Health, info, and metrics endpoints.
pub mod health;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
