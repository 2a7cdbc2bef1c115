use thiserror::Error;

use crate::format::{ImageKind, MIN_HEADER_LEN};

/// Why a decode produced no bitmap.
///
/// The `Option` returning entry points collapse all of these into `None`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("input is {len} bytes, need at least {} to read the signature", MIN_HEADER_LEN)]
    TooShort { len: usize },

    #[error("unrecognized image signature")]
    UnknownFormat,

    #[error("{kind} decode failed: {source}")]
    Platform {
        kind: ImageKind,
        #[source]
        source: PlatformError,
    },

    #[error("WebP feature probe failed: {0}")]
    Probe(WebPStatus),

    #[error("WebP decode failed: {0}")]
    Decode(WebPStatus),

    #[error("bitmap construction failed: {0}")]
    Bitmap(#[from] BitmapError),
}

/// Failure of the general-purpose decoder used for JPEG, PNG and GIF
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Bitmap(#[from] BitmapError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BitmapError {
    #[error("bitmap dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("row stride overflows for {width}x{height} with {channels} channels")]
    StrideOverflow { width: u32, height: u32, channels: u8 },

    #[error("pixel buffer holds {actual} bytes, layout needs {required}")]
    BufferTooSmall { required: usize, actual: usize },
}

/// Non-success status codes reported by libwebp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WebPStatus {
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid parameter")]
    InvalidParam,
    #[error("bitstream error")]
    BitstreamError,
    #[error("unsupported feature")]
    UnsupportedFeature,
    #[error("suspended")]
    Suspended,
    #[error("user abort")]
    UserAbort,
    #[error("not enough data")]
    NotEnoughData,
    #[error("unknown status {0}")]
    Unknown(i32),
}

impl WebPStatus {
    /// Map a raw `VP8StatusCode`; `0` (OK) is not an error and yields `None`
    pub fn from_code(code: i32) -> Option<Self> {
        let status = match code {
            0 => return None,
            1 => WebPStatus::OutOfMemory,
            2 => WebPStatus::InvalidParam,
            3 => WebPStatus::BitstreamError,
            4 => WebPStatus::UnsupportedFeature,
            5 => WebPStatus::Suspended,
            6 => WebPStatus::UserAbort,
            7 => WebPStatus::NotEnoughData,
            other => WebPStatus::Unknown(other),
        };
        Some(status)
    }
}
