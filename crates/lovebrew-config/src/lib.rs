#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Typed server configuration for the `LoveBrew` build service.
//!
//! # Design
//! - Configuration is read once at start-up from environment variables.
//! - Every field is parsed and validated at construction; nothing is re-read later.
//! - The lookup source is injectable so tests never mutate the process environment.

pub mod error;
pub mod loader;
pub mod model;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ENV_PREFIX, env_keys};
pub use model::{AppMode, LogFormatChoice, ServerConfig};
