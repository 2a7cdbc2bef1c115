//! Format detection from leading magic bytes

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Inputs must be longer than the WebP signature window (bytes 8..12)
pub const MIN_HEADER_LEN: usize = 13;

const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47];
const GIF_SIGNATURE: &[u8] = b"GIF";
const WEBP_SIGNATURE: &[u8] = b"WEBP";
const WEBP_SIGNATURE_OFFSET: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    WebP,
    Unknown,
}

impl ImageKind {
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ImageKind::Jpeg => Some("jpg"),
            ImageKind::Png => Some("png"),
            ImageKind::Gif => Some("gif"),
            ImageKind::WebP => Some("webp"),
            ImageKind::Unknown => None,
        }
    }

    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            ImageKind::Jpeg => Some("image/jpeg"),
            ImageKind::Png => Some("image/png"),
            ImageKind::Gif => Some("image/gif"),
            ImageKind::WebP => Some("image/webp"),
            ImageKind::Unknown => None,
        }
    }
}

/// Classify `data` by its signature.
///
/// Anything shorter than [`MIN_HEADER_LEN`] is `Unknown`. JPEG, PNG and
/// GIF are matched at offset 0 before WebP is matched at offset 8, so a
/// buffer carrying both a leading signature and "WEBP" resolves to the
/// leading one.
pub fn sniff(data: &[u8]) -> ImageKind {
    if data.len() < MIN_HEADER_LEN {
        return ImageKind::Unknown;
    }

    let kind = if data.starts_with(JPEG_SIGNATURE) {
        ImageKind::Jpeg
    } else if data.starts_with(PNG_SIGNATURE) {
        ImageKind::Png
    } else if data.starts_with(GIF_SIGNATURE) {
        ImageKind::Gif
    } else if data[WEBP_SIGNATURE_OFFSET..].starts_with(WEBP_SIGNATURE) {
        ImageKind::WebP
    } else {
        ImageKind::Unknown
    };

    log::trace!("sniffed {} bytes as {kind}", data.len());
    kind
}
