//! # Design
//!
//! - Provide structured, constant-message errors for the build pipeline.
//! - Capture operation context (paths, tools, dimensions) to make failures reproducible in tests.
//! - Every error exposes a stable machine-readable `code()` and a human `detail()`.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::console::Target;

/// Result type for command execution.
pub type CommandResult<T> = Result<T, CommandError>;
/// Result type for asset validation.
pub type AssetResult<T> = Result<T, AssetError>;
/// Result type for a single target build.
pub type BuildResult<T> = Result<T, BuildError>;
/// Result type for request metadata validation.
pub type MetadataResult<T> = Result<T, MetadataError>;
/// Result type for single-asset conversion.
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Errors produced while resolving or running an external SDK tool.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A template placeholder had no matching argument; nothing was spawned.
    #[error("command argument missing")]
    ArgumentMissing {
        /// Tool whose template was being resolved.
        tool: String,
        /// Placeholder name without braces.
        name: String,
    },
    /// The template could not be tokenised (unbalanced quotes).
    #[error("command template malformed")]
    MalformedTemplate {
        /// Offending template.
        template: &'static str,
    },
    /// The executable was not found on `PATH`.
    #[error("command executable not found")]
    ExecutableNotFound {
        /// Program name.
        program: String,
    },
    /// The process ran and exited unsuccessfully.
    #[error("command failed")]
    CommandFailed {
        /// Program name.
        program: String,
        /// Exit code, `-1` when terminated by a signal.
        exit_code: i32,
        /// Captured standard error.
        stderr: String,
    },
    /// The process exceeded its deadline and was killed.
    #[error("command timed out")]
    TimedOut {
        /// Program name.
        program: String,
        /// Deadline that elapsed.
        timeout: Duration,
    },
    /// Spawning or waiting on the process failed for another reason.
    #[error("command spawn failed")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl CommandError {
    /// Stable machine-readable identifier.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ArgumentMissing { .. } => "COMMAND_ARGUMENT_NOT_FOUND",
            Self::MalformedTemplate { .. } => "COMMAND_TEMPLATE_INVALID",
            Self::ExecutableNotFound { .. } => "COMMAND_EXE_NOT_FOUND",
            Self::CommandFailed { .. } => "COMMAND_FAILED",
            Self::TimedOut { .. } => "COMMAND_TIMED_OUT",
            Self::Spawn { .. } => "COMMAND_SPAWN_FAILED",
        }
    }

    /// Human-readable description including tool name and captured output.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::ArgumentMissing { tool, name } => {
                format!("{tool}: argument '{name}' was not provided")
            }
            Self::MalformedTemplate { template } => {
                format!("command template is malformed: {template}")
            }
            Self::ExecutableNotFound { program } => format!("{program}: executable not found"),
            Self::CommandFailed {
                program,
                exit_code,
                stderr,
            } => format!("{program} exited with code {exit_code}: {}", stderr.trim()),
            Self::TimedOut { program, timeout } => {
                format!("{program} timed out after {}s", timeout.as_secs())
            }
            Self::Spawn { program, source } => format!("{program}: {source}"),
        }
    }
}

/// Errors produced by asset classification and validation.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The upload contained zero bytes.
    #[error("asset is empty")]
    EmptyFile,
    /// The content is neither a supported image nor a font.
    #[error("asset type is not supported")]
    InvalidFileType,
    /// The content looked like an image but could not be decoded.
    #[error("asset could not be decoded")]
    InvalidImage {
        /// Underlying decoder error.
        source: image::ImageError,
    },
    /// The content carried a font signature but its tables could not be parsed.
    #[error("font could not be parsed")]
    InvalidFont {
        /// Underlying parser error.
        source: ttf_parser::FaceParsingError,
    },
    /// Only the width exceeds the texture limit.
    #[error("texture width too large")]
    WidthTooLarge {
        /// Observed width.
        width: u32,
        /// Largest accepted side.
        max: u32,
    },
    /// Only the height exceeds the texture limit.
    #[error("texture height too large")]
    HeightTooLarge {
        /// Observed height.
        height: u32,
        /// Largest accepted side.
        max: u32,
    },
    /// Both sides exceed the texture limit.
    #[error("texture dimensions too large")]
    DimensionsTooLarge {
        /// Observed width.
        width: u32,
        /// Observed height.
        height: u32,
        /// Largest accepted side.
        max: u32,
    },
    /// At least one side is below the texture minimum.
    #[error("texture dimensions too small")]
    DimensionsTooSmall {
        /// Observed width.
        width: u32,
        /// Observed height.
        height: u32,
        /// Smallest accepted side.
        min: u32,
    },
    /// Icon pixel size differs from the exact size the target requires.
    #[error("icon dimensions mismatch")]
    IconDimensionMismatch {
        /// Required `(width, height)`.
        expected: (u32, u32),
        /// Observed `(width, height)`.
        actual: (u32, u32),
    },
    /// Icon encoding differs from the one the target requires.
    #[error("icon format mismatch")]
    IconFormatMismatch {
        /// Required mime type.
        expected: &'static str,
        /// Sniffed mime type, if any.
        actual: Option<&'static str>,
    },
}

impl AssetError {
    /// Stable machine-readable identifier.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyFile => "EMPTY_FILE",
            Self::InvalidFileType => "INVALID_FILE_TYPE",
            Self::InvalidImage { .. } | Self::InvalidFont { .. } => "CANNOT_PROCESS_FILE",
            Self::WidthTooLarge { .. } => "WIDTH_TOO_LARGE",
            Self::HeightTooLarge { .. } => "HEIGHT_TOO_LARGE",
            Self::DimensionsTooLarge { .. } => "DIMENSIONS_TOO_LARGE",
            Self::DimensionsTooSmall { .. } => "DIMENSIONS_TOO_SMALL",
            Self::IconDimensionMismatch { .. } => "INVALID_ICON_SIZE",
            Self::IconFormatMismatch { .. } => "INVALID_ICON_FORMAT",
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::EmptyFile => "file is empty".to_string(),
            Self::InvalidFileType => "file is not a PNG/JPEG image or a TrueType/OpenType font"
                .to_string(),
            Self::InvalidImage { source } => format!("image could not be decoded: {source}"),
            Self::InvalidFont { source } => format!("font could not be parsed: {source}"),
            Self::WidthTooLarge { width, max } => format!("width {width} exceeds {max}"),
            Self::HeightTooLarge { height, max } => format!("height {height} exceeds {max}"),
            Self::DimensionsTooLarge { width, height, max } => {
                format!("{width}x{height} exceeds {max}x{max}")
            }
            Self::DimensionsTooSmall { width, height, min } => {
                format!("{width}x{height} is below {min}x{min}")
            }
            Self::IconDimensionMismatch { expected, actual } => format!(
                "icon must be exactly {}x{}, got {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            Self::IconFormatMismatch { expected, actual } => format!(
                "icon must be {expected}, got {}",
                actual.unwrap_or("unknown data")
            ),
        }
    }
}

/// Errors produced while building one target. They never abort sibling targets.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Description plus version exceed the metadata blob limit.
    #[error("description too long")]
    DescriptionTooLong {
        /// Combined byte length.
        len: usize,
        /// Allowed byte length.
        max: usize,
    },
    /// Title exceeds the metadata field limit.
    #[error("title too long")]
    TitleTooLong {
        /// Observed length in the target's unit.
        len: usize,
        /// Allowed length.
        max: usize,
    },
    /// Author exceeds the metadata field limit.
    #[error("author too long")]
    AuthorTooLong {
        /// Observed length in the target's unit.
        len: usize,
        /// Allowed length.
        max: usize,
    },
    /// Version exceeds the metadata field limit.
    #[error("version too long")]
    VersionTooLong {
        /// Observed byte length.
        len: usize,
        /// Allowed byte length.
        max: usize,
    },
    /// A pipeline step's tool failed.
    #[error("build tool failed")]
    Tool {
        /// Underlying command error.
        #[from]
        source: CommandError,
    },
    /// A bundled resource was missing from the resources directory.
    #[error("bundled resource missing")]
    MissingResource {
        /// Expected location.
        path: PathBuf,
    },
    /// Every tool succeeded but the final binary was not produced.
    #[error("build output missing")]
    MissingOutput {
        /// Expected location.
        path: PathBuf,
    },
    /// Filesystem failure inside the build directory.
    #[error("build io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Stable machine-readable identifier.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DescriptionTooLong { .. } => "DESCRIPTION_TOO_LONG",
            Self::TitleTooLong { .. } => "TITLE_TOO_LONG",
            Self::AuthorTooLong { .. } => "AUTHOR_TOO_LONG",
            Self::VersionTooLong { .. } => "VERSION_TOO_LONG",
            Self::Tool { source } => source.code(),
            Self::MissingResource { .. } => "RESOURCE_NOT_FOUND",
            Self::MissingOutput { .. } => "BUILD_OUTPUT_NOT_FOUND",
            Self::Io { .. } => "BUILD_IO_FAILURE",
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::DescriptionTooLong { len, max } => {
                format!("description and version are {len} bytes, limit is {max}")
            }
            Self::TitleTooLong { len, max } => format!("title is {len} long, limit is {max}"),
            Self::AuthorTooLong { len, max } => format!("author is {len} long, limit is {max}"),
            Self::VersionTooLong { len, max } => format!("version is {len} bytes, limit is {max}"),
            Self::Tool { source } => source.detail(),
            Self::MissingResource { path } => {
                format!("bundled resource {} is missing", path.display())
            }
            Self::MissingOutput { path } => format!("{} was not produced", path.display()),
            Self::Io {
                operation,
                path,
                source,
            } => format!("{operation} {}: {source}", path.display()),
        }
    }
}

/// Errors that reject a whole compile request before any build starts.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// No target was requested.
    #[error("no targets requested")]
    NoTargets,
    /// A requested target id is not one of the supported targets.
    #[error("invalid target")]
    InvalidTarget {
        /// Offending identifier.
        value: String,
    },
    /// An icon was uploaded for a target that was not requested.
    #[error("icon supplied for unrequested target")]
    UnexpectedIcon {
        /// Target the icon was uploaded for.
        target: Target,
    },
    /// A custom icon failed validation.
    #[error("invalid icon")]
    Icon {
        /// Target the icon was uploaded for.
        target: Target,
        /// Validation failure.
        source: AssetError,
    },
}

impl MetadataError {
    /// Stable machine-readable identifier.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoTargets => "NO_TARGETS_SELECTED",
            Self::InvalidTarget { .. } => "TARGET_NOT_VALID",
            Self::UnexpectedIcon { .. } => "UNEXPECTED_ICON",
            Self::Icon { source, .. } => source.code(),
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::NoTargets => "at least one target must be requested".to_string(),
            Self::InvalidTarget { value } => format!("'{value}' is not a valid target"),
            Self::UnexpectedIcon { target } => {
                format!("icon uploaded for '{target}' which was not requested")
            }
            Self::Icon { target, source } => format!("{target}: {}", source.detail()),
        }
    }
}

/// Errors produced while converting a single uploaded asset.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The upload path is empty or escapes the archive root.
    #[error("invalid asset path")]
    InvalidPath {
        /// Offending path as uploaded.
        path: String,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// The asset failed classification or validation.
    #[error("invalid asset")]
    Asset {
        /// Validation failure.
        #[from]
        source: AssetError,
    },
    /// The converter tool failed.
    #[error("conversion tool failed")]
    Tool {
        /// Underlying command error.
        #[from]
        source: CommandError,
    },
    /// Filesystem failure inside the conversion directory.
    #[error("conversion io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl ConversionError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Stable machine-readable identifier.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidPath { .. } => "INVALID_FILE_PATH",
            Self::Asset { source } => source.code(),
            Self::Tool {
                source: CommandError::CommandFailed { .. },
            } => "CANNOT_PROCESS_FILE",
            Self::Tool { source } => source.code(),
            Self::Io { .. } => "CONVERSION_IO_FAILURE",
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidPath { path, reason } => format!("'{path}' {reason}"),
            Self::Asset { source } => source.detail(),
            Self::Tool { source } => source.detail(),
            Self::Io {
                operation,
                path,
                source,
            } => format!("{operation} {}: {source}", path.display()),
        }
    }
}
