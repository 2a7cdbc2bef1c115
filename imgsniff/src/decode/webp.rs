//! WebP path: feature probe, output configuration and bitmap bridging

use serde::{Deserialize, Serialize};

use crate::bitmap::{AlphaMode, Bitmap, PixelBuffer, PixelLayout};
use crate::config::{DecoderConfig, TargetSize};
use crate::error::{DecodeError, WebPStatus};

/// Compression used by the bitstream; animations and extended files with
/// mixed frames report `Undefined`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitstreamFormat {
    Undefined,
    Lossy,
    Lossless,
}

impl BitstreamFormat {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => BitstreamFormat::Lossy,
            2 => BitstreamFormat::Lossless,
            _ => BitstreamFormat::Undefined,
        }
    }
}

/// Header information read without decoding pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebPFeatures {
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
    pub has_animation: bool,
    pub format: BitstreamFormat,
}

impl WebPFeatures {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Output size for a scaled decode, if scaling applies.
///
/// Only downscaling in both dimensions is honored. The target is used as-is,
/// so preserving the aspect ratio is up to the caller.
pub fn scaled_size(native: (u32, u32), target: TargetSize) -> Option<(u32, u32)> {
    let (width, height) = native;
    if target.is_none() || target.width >= width || target.height >= height {
        return None;
    }
    Some((target.width, target.height))
}

/// Settings for a single WebP decode, derived from the probed features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebPDecodeConfig {
    features: WebPFeatures,
    layout: PixelLayout,
    scaled: Option<(u32, u32)>,
}

impl WebPDecodeConfig {
    pub fn new(features: WebPFeatures, target: TargetSize, premultiply_alpha: bool) -> Self {
        let alpha = AlphaMode::new(features.has_alpha, premultiply_alpha);
        Self {
            features,
            layout: PixelLayout::for_alpha_mode(alpha),
            scaled: scaled_size(features.dimensions(), target),
        }
    }

    pub fn features(&self) -> &WebPFeatures {
        &self.features
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn scaled_size(&self) -> Option<(u32, u32)> {
        self.scaled
    }

    pub fn output_size(&self) -> (u32, u32) {
        self.scaled.unwrap_or(self.features.dimensions())
    }
}

/// A WebP bitstream decoder.
///
/// `decode` hands back a buffer that owns the decoder's allocation; dropping
/// it must release that allocation.
pub trait WebPCodec {
    type Buffer: PixelBuffer + 'static;

    fn features(&self, data: &[u8]) -> Result<WebPFeatures, WebPStatus>;

    fn decode(&self, data: &[u8], config: &WebPDecodeConfig) -> Result<Self::Buffer, WebPStatus>;
}

pub(crate) fn decode<C>(
    codec: &C,
    data: &[u8],
    target: TargetSize,
    options: &DecoderConfig,
) -> Result<Bitmap, DecodeError>
where
    C: WebPCodec + ?Sized,
{
    let features = codec.features(data).map_err(DecodeError::Probe)?;
    log::debug!(
        "WebP {}x{} alpha={} format={:?}",
        features.width,
        features.height,
        features.has_alpha,
        features.format
    );

    let config = WebPDecodeConfig::new(features, target, options.premultiply_alpha);
    if let Some((width, height)) = config.scaled_size() {
        log::debug!("scaling WebP to {width}x{height}");
    }

    let buffer = codec.decode(data, &config).map_err(DecodeError::Decode)?;

    let (width, height) = config.output_size();
    let bitmap = Bitmap::from_buffer(width, height, config.layout(), buffer)?;
    Ok(bitmap)
}
