//! Content sniffing and validation of uploaded assets.
//!
//! # Design
//! - Classification looks at magic bytes only; upload filenames are untrusted.
//! - Empty payloads are rejected before any decode is attempted.
//! - Texture limits report which side is out of range; icon checks are exact.

use std::fmt;
use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use serde::Serialize;

use crate::error::{AssetError, AssetResult};

/// Smallest accepted texture side in pixels.
pub const MIN_TEXTURE_SIDE: u32 = 3;
/// Largest accepted texture side in pixels.
pub const MAX_TEXTURE_SIDE: u32 = 1024;

/// Encodings the service recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MediaType {
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
    /// TrueType font.
    TrueType,
    /// OpenType (CFF) font.
    OpenType,
    /// TrueType/OpenType collection.
    FontCollection,
}

impl MediaType {
    /// IANA media type.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::TrueType => "font/ttf",
            Self::OpenType => "font/otf",
            Self::FontCollection => "font/collection",
        }
    }

    /// Asset kind this media type converts as.
    #[must_use]
    pub const fn kind(self) -> AssetKind {
        match self {
            Self::Png | Self::Jpeg => AssetKind::Texture,
            Self::TrueType | Self::OpenType | Self::FontCollection => AssetKind::Font,
        }
    }

    const fn image_format(self) -> Option<ImageFormat> {
        match self {
            Self::Png => Some(ImageFormat::Png),
            Self::Jpeg => Some(ImageFormat::Jpeg),
            Self::TrueType | Self::OpenType | Self::FontCollection => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// What an uploaded asset converts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Image converted into a packed texture.
    Texture,
    /// Font converted into a packed font.
    Font,
    /// Anything else.
    Invalid,
}

impl AssetKind {
    /// Extension of the converted file, without the dot.
    #[must_use]
    pub const fn output_extension(self) -> Option<&'static str> {
        match self {
            Self::Texture => Some("t3x"),
            Self::Font => Some("bcfnt"),
            Self::Invalid => None,
        }
    }

    /// Lower-case label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Texture => "texture",
            Self::Font => "font",
            Self::Invalid => "invalid",
        }
    }
}

/// Detect the media type from leading bytes.
#[must_use]
pub fn sniff(bytes: &[u8]) -> Option<MediaType> {
    match bytes.get(..4) {
        Some(b"\x00\x01\x00\x00" | b"true") => return Some(MediaType::TrueType),
        Some(b"OTTO") => return Some(MediaType::OpenType),
        Some(b"ttcf") => return Some(MediaType::FontCollection),
        _ => {}
    }
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Some(MediaType::Png),
        Ok(ImageFormat::Jpeg) => Some(MediaType::Jpeg),
        _ => None,
    }
}

/// Decide whether `bytes` is a texture, a font, or neither.
#[must_use]
pub fn classify(bytes: &[u8]) -> AssetKind {
    sniff(bytes).map_or(AssetKind::Invalid, MediaType::kind)
}

/// Read image dimensions without decoding pixel data.
///
/// # Errors
///
/// Returns [`AssetError::EmptyFile`] for empty input and [`AssetError::InvalidImage`] when
/// the header cannot be read.
pub fn dimensions(bytes: &[u8]) -> AssetResult<(u32, u32)> {
    if bytes.is_empty() {
        return Err(AssetError::EmptyFile);
    }
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|source| AssetError::InvalidImage {
            source: image::ImageError::IoError(source),
        })?
        .into_dimensions()
        .map_err(|source| AssetError::InvalidImage { source })
}

/// Check a texture against the accepted size range and make sure it decodes.
///
/// Returns the texture's `(width, height)`.
///
/// # Errors
///
/// Returns the size error naming the offending side(s), or a decode/type error.
pub fn validate_texture(bytes: &[u8]) -> AssetResult<(u32, u32)> {
    if bytes.is_empty() {
        return Err(AssetError::EmptyFile);
    }
    let media = sniff(bytes)
        .filter(|media| media.kind() == AssetKind::Texture)
        .ok_or(AssetError::InvalidFileType)?;

    let (width, height) = dimensions(bytes)?;
    check_texture_size(width, height)?;

    if let Some(format) = media.image_format() {
        image::load_from_memory_with_format(bytes, format)
            .map_err(|source| AssetError::InvalidImage { source })?;
    }
    Ok((width, height))
}

/// Size rule for textures, independent of decoding.
///
/// # Errors
///
/// Returns the size error naming the offending side(s).
pub const fn check_texture_size(width: u32, height: u32) -> AssetResult<()> {
    let max = MAX_TEXTURE_SIDE;
    match (width > max, height > max) {
        (true, true) => Err(AssetError::DimensionsTooLarge { width, height, max }),
        (true, false) => Err(AssetError::WidthTooLarge { width, max }),
        (false, true) => Err(AssetError::HeightTooLarge { height, max }),
        (false, false) if width < MIN_TEXTURE_SIDE || height < MIN_TEXTURE_SIDE => {
            Err(AssetError::DimensionsTooSmall {
                width,
                height,
                min: MIN_TEXTURE_SIDE,
            })
        }
        (false, false) => Ok(()),
    }
}

/// Parse a font's tables to make sure the converter will accept it.
///
/// # Errors
///
/// Returns [`AssetError::EmptyFile`] for empty input, [`AssetError::InvalidFileType`] for
/// non-font content, and [`AssetError::InvalidFont`] when the tables do not parse.
pub fn validate_font(bytes: &[u8]) -> AssetResult<()> {
    if bytes.is_empty() {
        return Err(AssetError::EmptyFile);
    }
    if classify(bytes) != AssetKind::Font {
        return Err(AssetError::InvalidFileType);
    }
    ttf_parser::Face::parse(bytes, 0)
        .map(|_| ())
        .map_err(|source| AssetError::InvalidFont { source })
}

/// Exact icon requirements for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconSpec {
    /// Required `(width, height)`.
    pub size: (u32, u32),
    /// Required encoding.
    pub format: MediaType,
}

/// Check an icon for exact size and encoding.
///
/// # Errors
///
/// Returns [`AssetError::EmptyFile`], [`AssetError::IconFormatMismatch`], or
/// [`AssetError::IconDimensionMismatch`].
pub fn validate_icon(bytes: &[u8], spec: IconSpec) -> AssetResult<()> {
    if bytes.is_empty() {
        return Err(AssetError::EmptyFile);
    }
    let actual = sniff(bytes);
    if actual != Some(spec.format) {
        return Err(AssetError::IconFormatMismatch {
            expected: spec.format.mime(),
            actual: actual.map(MediaType::mime),
        });
    }
    let size = dimensions(bytes)?;
    if size != spec.size {
        return Err(AssetError::IconDimensionMismatch {
            expected: spec.size,
            actual: size,
        });
    }
    Ok(())
}

/// A single uploaded file after sniffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Path the client uploaded the file under.
    pub filename: String,
    /// Sniffed media type, if recognised.
    pub media_type: Option<MediaType>,
    /// Derived kind.
    pub kind: AssetKind,
    /// Raw content.
    pub bytes: Vec<u8>,
}

impl AssetDescriptor {
    /// Sniff an upload.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::EmptyFile`] for zero-byte uploads.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> AssetResult<Self> {
        if bytes.is_empty() {
            return Err(AssetError::EmptyFile);
        }
        let media_type = sniff(&bytes);
        Ok(Self {
            filename: filename.into(),
            media_type,
            kind: media_type.map_or(AssetKind::Invalid, MediaType::kind),
            bytes,
        })
    }

    /// Extension of the converted output, if the asset is convertible.
    #[must_use]
    pub const fn output_extension(&self) -> Option<&'static str> {
        self.kind.output_extension()
    }
}
