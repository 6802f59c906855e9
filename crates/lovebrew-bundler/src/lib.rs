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

//! Build pipeline for packaging homebrew applications and converting their assets.
//!
//! # Design
//! - [`BuildOrchestrator`] drives one [`Console`] pipeline per requested [`Target`], each in
//!   an exclusive temporary directory, and aggregates partial failures.
//! - External SDK tools run through [`CommandRunner`] from static command templates.
//! - [`ConversionRequest`] converts single textures and fonts with the same runner.
//! - Progress for a request is recorded in a [`RequestLog`] passed down explicitly.

pub mod asset;
pub mod command;
pub mod console;
pub mod consoles;
pub mod conversion;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod metadata;
pub mod orchestrator;
pub mod request_log;
pub mod resources;
pub mod tools;

pub use asset::{
    AssetDescriptor, AssetKind, IconSpec, MediaType, classify, validate_font, validate_icon,
    validate_texture,
};
pub use command::{
    CommandArgs, CommandRunner, CommandTemplate, ExecutionContext, ProcessRunner, ToolRunner,
};
pub use console::{Console, ContainerMagic, Target};
pub use conversion::{ConversionRequest, ConvertedAsset, Converter};
pub use error::{AssetError, BuildError, CommandError, ConversionError, MetadataError};
pub use metadata::{BuildMetadata, MetadataFields};
pub use orchestrator::{BuildOrchestrator, CompileOutcome, CompileStatus, TargetOutcome};
pub use request_log::{LogLevel, RequestLog};
pub use resources::{ResourceStore, TargetResources};
pub use tools::{ToolReport, check_environment};
