//! General-purpose decoding for JPEG, PNG and GIF

use image::{load_from_memory, DynamicImage};

use crate::bitmap::{Bitmap, PixelLayout};
use crate::error::{BitmapError, PlatformError};

/// Decoder for the commonly supported formats
pub trait PlatformDecoder {
    fn decode(&self, data: &[u8]) -> Result<Bitmap, PlatformError>;
}

/// Wraps the image crate's load_from_memory
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl PlatformDecoder for ImageCrateDecoder {
    fn decode(&self, data: &[u8]) -> Result<Bitmap, PlatformError> {
        let img = load_from_memory(data)?;
        Ok(into_bitmap(img)?)
    }
}

fn into_bitmap(img: DynamicImage) -> Result<Bitmap, BitmapError> {
    let (width, height) = (img.width(), img.height());
    if img.color().has_alpha() {
        Bitmap::from_buffer(width, height, PixelLayout::Rgba, img.into_rgba8().into_raw())
    } else {
        Bitmap::from_buffer(width, height, PixelLayout::Rgb, img.into_rgb8().into_raw())
    }
}
