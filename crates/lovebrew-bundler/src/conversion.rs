//! Single-asset conversion for the `/convert` family of operations.
//!
//! # Design
//! - Upload paths are archive-relative: leading and trailing `/` are stripped and the
//!   result may not escape the conversion directory.
//! - The converted file keeps the upload's relative path with its extension replaced.
//! - Conversions share one scratch directory per request, removed when the request ends.

use std::path::{Component, Path, PathBuf};

use lovebrew_telemetry::Metrics;
use tempfile::TempDir;

use crate::asset::{AssetDescriptor, AssetKind, validate_font, validate_texture};
use crate::command::{CommandArgs, CommandRunner, CommandTemplate};
use crate::error::{AssetError, ConversionError, ConversionResult};
use crate::request_log::RequestLog;

/// Converts PNG/JPEG images into packed textures.
pub const TEXTURE_TOOL: CommandTemplate =
    CommandTemplate::new(r#"tex3ds -f rgba8888 -z auto "{file}" -o "{out}""#);
/// Converts TrueType/OpenType fonts into packed fonts.
pub const FONT_TOOL: CommandTemplate = CommandTemplate::new(r#"mkbcfnt "{file}" -o "{out}""#);

/// A validated upload ready to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    filepath: String,
    asset: AssetDescriptor,
}

/// The result of converting one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedAsset {
    /// Archive-relative path of the converted file.
    pub filepath: String,
    /// Converted bytes.
    pub data: Vec<u8>,
}

impl ConversionRequest {
    /// Normalise the upload path and validate the content.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::InvalidPath`] for empty or escaping paths, and the asset
    /// error for empty, unsupported, unparseable, or out-of-range uploads.
    pub fn new(path: &str, bytes: Vec<u8>) -> ConversionResult<Self> {
        let filepath = normalize_path(path)?;
        let asset = AssetDescriptor::new(filepath.clone(), bytes)?;
        match asset.kind {
            AssetKind::Texture => {
                validate_texture(&asset.bytes)?;
            }
            AssetKind::Font => validate_font(&asset.bytes)?,
            AssetKind::Invalid => return Err(AssetError::InvalidFileType.into()),
        }
        Ok(Self { filepath, asset })
    }

    /// Normalised upload path.
    #[must_use]
    pub fn filepath(&self) -> &str {
        &self.filepath
    }

    /// Texture or font.
    #[must_use]
    pub const fn kind(&self) -> AssetKind {
        self.asset.kind
    }

    /// Archive-relative path of the converted file.
    #[must_use]
    pub fn output_path(&self) -> String {
        let extension = self.asset.output_extension().unwrap_or_default();
        Path::new(&self.filepath)
            .with_extension(extension)
            .to_string_lossy()
            .into_owned()
    }

    /// Convert inside `dir`, recreating the upload's parent directories there.
    ///
    /// # Errors
    ///
    /// Returns an IO error for the scratch files or the converter tool's failure.
    pub async fn convert(
        &self,
        dir: &Path,
        runner: &CommandRunner,
    ) -> ConversionResult<ConvertedAsset> {
        let input = dir.join(&self.filepath);
        let output_path = self.output_path();
        let output = dir.join(&output_path);

        if let Some(parent) = input.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConversionError::io("create directory", parent, source))?;
        }
        tokio::fs::write(&input, &self.asset.bytes)
            .await
            .map_err(|source| ConversionError::io("write upload", &input, source))?;

        let template = match self.asset.kind {
            AssetKind::Font => &FONT_TOOL,
            AssetKind::Texture | AssetKind::Invalid => &TEXTURE_TOOL,
        };
        let args = CommandArgs::new()
            .with_path("file", &input)
            .with_path("out", &output);
        runner.execute(template, &args).await?;

        let data = tokio::fs::read(&output)
            .await
            .map_err(|source| ConversionError::io("read converted file", &output, source))?;
        Ok(ConvertedAsset {
            filepath: output_path,
            data,
        })
    }
}

/// Converts every upload of a request.
#[derive(Clone)]
pub struct Converter {
    runner: CommandRunner,
    metrics: Option<Metrics>,
}

impl Converter {
    /// Converter running tools through `runner`.
    #[must_use]
    pub const fn new(runner: CommandRunner) -> Self {
        Self {
            runner,
            metrics: None,
        }
    }

    /// Record conversion counters in the shared metrics registry.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Convert each request in order; the first failure aborts the rest.
    ///
    /// # Errors
    ///
    /// Returns the first conversion failure.
    pub async fn convert_all(
        &self,
        requests: &[ConversionRequest],
        log: &RequestLog,
    ) -> ConversionResult<Vec<ConvertedAsset>> {
        let workspace = create_conversion_dir()?;
        let mut converted = Vec::with_capacity(requests.len());
        for request in requests {
            let result = request.convert(workspace.path(), &self.runner).await;
            if let Some(metrics) = &self.metrics {
                metrics.inc_conversion(request.kind().as_str(), result.is_ok());
            }
            match result {
                Ok(asset) => {
                    log.info(format!("converted {} to {}", request.filepath(), asset.filepath));
                    converted.push(asset);
                }
                Err(err) => {
                    log.error(format!(
                        "{}: {}: {}",
                        request.filepath(),
                        err.code(),
                        err.detail()
                    ));
                    return Err(err);
                }
            }
        }
        Ok(converted)
    }
}

fn create_conversion_dir() -> ConversionResult<TempDir> {
    tempfile::Builder::new()
        .prefix("lovebrew-convert-")
        .tempdir()
        .map_err(|source| {
            ConversionError::io("create conversion directory", std::env::temp_dir(), source)
        })
}

/// Strip leading/trailing `/` and refuse paths that could escape the scratch directory.
///
/// # Errors
///
/// Returns [`ConversionError::InvalidPath`] for empty paths and `.`/`..` segments.
pub fn normalize_path(path: &str) -> ConversionResult<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(ConversionError::InvalidPath {
            path: path.to_string(),
            reason: "is empty",
        });
    }
    let escapes = PathBuf::from(trimmed)
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
        || trimmed.split('/').any(|segment| segment == ".");
    if escapes || trimmed.contains('\\') {
        return Err(ConversionError::InvalidPath {
            path: path.to_string(),
            reason: "must be a relative path without '.' or '..' segments",
        });
    }
    Ok(trimmed.to_string())
}
