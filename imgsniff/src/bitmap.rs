//! Decoded bitmaps and their pixel layouts

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BitmapError;

/// Backing storage for a [`Bitmap`].
///
/// Storage allocated outside Rust frees itself in `Drop`, which runs exactly
/// once when the owning bitmap (or the failed construction) lets go of it.
pub trait PixelBuffer: Send + Sync {
    fn as_bytes(&self) -> &[u8];
}

impl PixelBuffer for Vec<u8> {
    fn as_bytes(&self) -> &[u8] {
        self
    }
}

/// Order of bytes within a packed 32-bit pixel word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    Big32,
    Little32,
}

/// Where alpha lives in the pixel word and whether color is premultiplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphaInfo {
    None,
    Last,
    PremultipliedLast,
    First,
    PremultipliedFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphaMode {
    None,
    Straight,
    Premultiplied,
}

impl AlphaMode {
    pub fn new(has_alpha: bool, premultiplied: bool) -> Self {
        match (has_alpha, premultiplied) {
            (false, _) => AlphaMode::None,
            (true, false) => AlphaMode::Straight,
            (true, true) => AlphaMode::Premultiplied,
        }
    }

    pub fn has_alpha(self) -> bool {
        self != AlphaMode::None
    }
}

/// Memory layout of one pixel, 8 bits per channel, rows tightly packed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelLayout {
    /// R, G, B
    Rgb,
    /// R, G, B, A with straight alpha
    Rgba,
    /// B, G, R, A with straight alpha: an alpha-first word read little-endian
    Bgra,
    /// B, G, R, A with color premultiplied by alpha
    BgraPremultiplied,
}

impl PixelLayout {
    /// Layout requested from the WebP decoder for a given alpha mode
    pub fn for_alpha_mode(mode: AlphaMode) -> Self {
        match mode {
            AlphaMode::None => PixelLayout::Rgb,
            AlphaMode::Straight => PixelLayout::Bgra,
            AlphaMode::Premultiplied => PixelLayout::BgraPremultiplied,
        }
    }

    pub fn channels(self) -> u8 {
        match self {
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba | PixelLayout::Bgra | PixelLayout::BgraPremultiplied => 4,
        }
    }

    pub fn byte_order(self) -> ByteOrder {
        match self {
            PixelLayout::Rgb | PixelLayout::Rgba => ByteOrder::Big32,
            PixelLayout::Bgra | PixelLayout::BgraPremultiplied => ByteOrder::Little32,
        }
    }

    pub fn alpha_info(self) -> AlphaInfo {
        match self {
            PixelLayout::Rgb => AlphaInfo::None,
            PixelLayout::Rgba => AlphaInfo::Last,
            PixelLayout::Bgra => AlphaInfo::First,
            PixelLayout::BgraPremultiplied => AlphaInfo::PremultipliedFirst,
        }
    }

    pub fn alpha_mode(self) -> AlphaMode {
        match self {
            PixelLayout::Rgb => AlphaMode::None,
            PixelLayout::Rgba | PixelLayout::Bgra => AlphaMode::Straight,
            PixelLayout::BgraPremultiplied => AlphaMode::Premultiplied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    DeviceRgb,
}

/// A decoded image: a tightly packed 8-bit pixel buffer plus its layout
pub struct Bitmap {
    width: u32,
    height: u32,
    bytes_per_row: usize,
    layout: PixelLayout,
    color_space: ColorSpace,
    pixels: Box<dyn PixelBuffer>,
}

impl Bitmap {
    pub const BITS_PER_COMPONENT: u8 = 8;

    /// Wrap `buffer` without copying it.
    ///
    /// On error the buffer is dropped before returning, so foreign
    /// allocations are still released.
    pub fn from_buffer<B>(
        width: u32,
        height: u32,
        layout: PixelLayout,
        buffer: B,
    ) -> Result<Self, BitmapError>
    where
        B: PixelBuffer + 'static,
    {
        if width == 0 || height == 0 {
            return Err(BitmapError::ZeroDimensions { width, height });
        }

        let channels = layout.channels();
        let overflow = BitmapError::StrideOverflow {
            width,
            height,
            channels,
        };
        let bytes_per_row = (width as usize)
            .checked_mul(channels as usize)
            .ok_or(overflow)?;
        let required = bytes_per_row
            .checked_mul(height as usize)
            .ok_or(overflow)?;

        let actual = buffer.as_bytes().len();
        if actual < required {
            return Err(BitmapError::BufferTooSmall { required, actual });
        }

        Ok(Bitmap {
            width,
            height,
            bytes_per_row,
            layout,
            color_space: ColorSpace::DeviceRgb,
            pixels: Box::new(buffer),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn channels(&self) -> u8 {
        self.layout.channels()
    }

    pub fn bits_per_component(&self) -> u8 {
        Self::BITS_PER_COMPONENT
    }

    pub fn bits_per_pixel(&self) -> u8 {
        self.channels() * Self::BITS_PER_COMPONENT
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.layout.byte_order()
    }

    pub fn alpha_info(&self) -> AlphaInfo {
        self.layout.alpha_info()
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// The whole buffer as reported by the decoder, which may extend past
    /// the last row
    pub fn pixels(&self) -> &[u8] {
        self.pixels.as_bytes()
    }

    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.bytes_per_row;
        self.pixels().get(start..start + self.bytes_per_row)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width {
            return None;
        }
        let channels = self.channels() as usize;
        let start = x as usize * channels;
        self.row(y)?.get(start..start + channels)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes_per_row", &self.bytes_per_row)
            .field("layout", &self.layout)
            .field("color_space", &self.color_space)
            .field("buffer_len", &self.pixels().len())
            .finish()
    }
}
