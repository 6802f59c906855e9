//! Encoded asset fixtures.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

/// A `width`×`height` PNG.
///
/// # Panics
///
/// Panics if the in-memory encoder fails.
#[must_use]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

/// A `width`×`height` baseline JPEG.
///
/// # Panics
///
/// Panics if the in-memory encoder fails.
#[must_use]
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

/// A minimal parseable font whose sfnt header starts with `magic`.
///
/// `00 01 00 00`, `OTTO` and `true` produce a single face carrying only the
/// required `head`, `hhea` and `maxp` tables. `ttcf` wraps that face in a
/// one-font collection.
#[must_use]
pub fn font_bytes(magic: &[u8]) -> Vec<u8> {
    if magic == b"ttcf" {
        let mut bytes = b"ttcf".to_vec();
        bytes.extend_from_slice(&0x0001_0000_u32.to_be_bytes());
        bytes.extend_from_slice(&1_u32.to_be_bytes());
        bytes.extend_from_slice(&16_u32.to_be_bytes());
        bytes.extend_from_slice(&sfnt(&[0, 1, 0, 0], 16));
        return bytes;
    }
    sfnt(magic, 0)
}

/// One sfnt face; table offsets are absolute, so `base` is where the face starts.
fn sfnt(magic: &[u8], base: u32) -> Vec<u8> {
    let mut head = vec![0_u8; 54];
    head[..4].copy_from_slice(&0x0001_0000_u32.to_be_bytes());
    head[12..16].copy_from_slice(&0x5F0F_3CF5_u32.to_be_bytes());
    head[18..20].copy_from_slice(&1000_u16.to_be_bytes());

    let mut hhea = vec![0_u8; 36];
    hhea[..4].copy_from_slice(&0x0001_0000_u32.to_be_bytes());
    hhea[4..6].copy_from_slice(&800_i16.to_be_bytes());
    hhea[6..8].copy_from_slice(&(-200_i16).to_be_bytes());
    hhea[34..36].copy_from_slice(&1_u16.to_be_bytes());

    let mut maxp = 0x0000_5000_u32.to_be_bytes().to_vec();
    maxp.extend_from_slice(&1_u16.to_be_bytes());

    // Records must stay sorted by tag.
    let tables: [(&[u8; 4], Vec<u8>); 3] = [(b"head", head), (b"hhea", hhea), (b"maxp", maxp)];
    let mut bytes = magic.to_vec();
    // numTables=3, searchRange=32, entrySelector=1, rangeShift=16
    bytes.extend_from_slice(&[0x00, 0x03, 0x00, 0x20, 0x00, 0x01, 0x00, 0x10]);

    let mut offset = 12 + 16 * 3;
    let mut data = Vec::new();
    for (tag, table) in &tables {
        let len = table.len();
        bytes.extend_from_slice(*tag);
        bytes.extend_from_slice(&0_u32.to_be_bytes());
        bytes.extend_from_slice(&(base + offset).to_be_bytes());
        bytes.extend_from_slice(&u32::try_from(len).unwrap_or_default().to_be_bytes());
        data.extend_from_slice(table);
        let padded = len.next_multiple_of(4);
        data.resize(data.len() + padded - len, 0);
        offset += u32::try_from(padded).unwrap_or_default();
    }
    bytes.extend_from_slice(&data);
    bytes
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        #[allow(clippy::cast_possible_truncation)]
        let shade = ((x ^ y) & 0xff) as u8;
        Rgb([shade, shade.wrapping_add(64), 255 - shade])
    });
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, format)
        .expect("in-memory image encoding");
    buffer.into_inner()
}
