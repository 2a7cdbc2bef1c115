//! Format-aware decoding

mod libwebp;
mod platform;
mod webp;

pub use libwebp::{LibWebP, LibWebPBuffer};
pub use platform::{ImageCrateDecoder, PlatformDecoder};
pub use webp::{scaled_size, BitstreamFormat, WebPCodec, WebPDecodeConfig, WebPFeatures};

use crate::bitmap::Bitmap;
use crate::config::{DecoderConfig, TargetSize};
use crate::error::DecodeError;
use crate::format::{sniff, ImageKind, MIN_HEADER_LEN};

/// Anything that turns encoded bytes into a bitmap
pub trait ImageDecoding {
    /// Decode at native size, `None` on any failure
    fn decode(&self, data: &[u8]) -> Option<Bitmap>;
}

/// Routes JPEG, PNG and GIF to a platform decoder and WebP to a WebP codec,
/// picked by the signature of the input.
///
/// Holds no mutable state, so one decoder can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct FormatAwareDecoder<P = ImageCrateDecoder, W = LibWebP> {
    platform: P,
    webp: W,
    config: DecoderConfig,
}

impl FormatAwareDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P, W> FormatAwareDecoder<P, W>
where
    P: PlatformDecoder,
    W: WebPCodec,
{
    pub fn with_backends(platform: P, webp: W) -> Self {
        Self {
            platform,
            webp,
            config: DecoderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode, downscaling WebP images to `target` when it is smaller than
    /// the native size in both dimensions
    pub fn decode_with_size(&self, data: &[u8], target: impl Into<TargetSize>) -> Option<Bitmap> {
        self.try_decode(data, target)
            .map_err(|e| log::debug!("decode failed: {e}"))
            .ok()
    }

    /// Like [`decode_with_size`](Self::decode_with_size), keeping the reason
    /// for a failure
    pub fn try_decode(
        &self,
        data: &[u8],
        target: impl Into<TargetSize>,
    ) -> Result<Bitmap, DecodeError> {
        if data.len() < MIN_HEADER_LEN {
            return Err(DecodeError::TooShort { len: data.len() });
        }

        match sniff(data) {
            kind @ (ImageKind::Jpeg | ImageKind::Png | ImageKind::Gif) => {
                log::debug!("delegating {kind} to platform decoder");
                self.platform
                    .decode(data)
                    .map_err(|source| DecodeError::Platform { kind, source })
            }
            ImageKind::WebP => webp::decode(&self.webp, data, target.into(), &self.config),
            ImageKind::Unknown => Err(DecodeError::UnknownFormat),
        }
    }
}

impl<P, W> ImageDecoding for FormatAwareDecoder<P, W>
where
    P: PlatformDecoder,
    W: WebPCodec,
{
    fn decode(&self, data: &[u8]) -> Option<Bitmap> {
        self.decode_with_size(data, TargetSize::NONE)
    }
}
