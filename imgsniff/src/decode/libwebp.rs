//! WebP decoding through libwebp's advanced decoding API

use std::os::raw::c_int;

use libwebp_sys::{
    VP8StatusCode, WebPBitstreamFeatures, WebPDecode, WebPDecoderConfig, WebPFreeDecBuffer,
    WebPGetFeatures, WEBP_CSP_MODE,
};

use super::webp::{BitstreamFormat, WebPCodec, WebPDecodeConfig, WebPFeatures};
use crate::bitmap::{PixelBuffer, PixelLayout};
use crate::error::WebPStatus;

#[derive(Debug, Clone, Copy, Default)]
pub struct LibWebP;

/// Pixels written by `WebPDecode`, freed with `WebPFreeDecBuffer` on drop.
///
/// The guard exists before decoding starts, so anything libwebp allocates
/// is released on the error paths as well.
pub struct LibWebPBuffer {
    config: WebPDecoderConfig,
}

// SAFETY: the decoded buffer is exclusively owned and only read through `&self`
unsafe impl Send for LibWebPBuffer {}
unsafe impl Sync for LibWebPBuffer {}

impl LibWebPBuffer {
    fn new() -> Result<Self, WebPStatus> {
        let config = WebPDecoderConfig::new().map_err(|_| WebPStatus::InvalidParam)?;
        Ok(Self { config })
    }
}

impl PixelBuffer for LibWebPBuffer {
    fn as_bytes(&self) -> &[u8] {
        // SAFETY: colorspace is always an RGB mode, so RGBA is the active union member
        let (ptr, size) = unsafe {
            let rgba = &self.config.output.u.RGBA;
            (rgba.rgba, rgba.size)
        };
        if ptr.is_null() {
            return &[];
        }
        // SAFETY: libwebp reports `size` bytes at `ptr`, live until `WebPFreeDecBuffer`
        unsafe { std::slice::from_raw_parts(ptr, size) }
    }
}

impl Drop for LibWebPBuffer {
    fn drop(&mut self) {
        // SAFETY: a no-op for buffers that were never allocated
        unsafe { WebPFreeDecBuffer(&mut self.config.output) };
    }
}

fn check(status: VP8StatusCode) -> Result<(), WebPStatus> {
    match WebPStatus::from_code(status as i32) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn colorspace(layout: PixelLayout) -> WEBP_CSP_MODE {
    match layout {
        PixelLayout::Rgb => WEBP_CSP_MODE::MODE_RGB,
        PixelLayout::Rgba => WEBP_CSP_MODE::MODE_RGBA,
        PixelLayout::Bgra => WEBP_CSP_MODE::MODE_BGRA,
        PixelLayout::BgraPremultiplied => WEBP_CSP_MODE::MODE_bgrA,
    }
}

fn dimension(value: c_int) -> Result<u32, WebPStatus> {
    u32::try_from(value).map_err(|_| WebPStatus::BitstreamError)
}

fn to_c_int(value: u32) -> Result<c_int, WebPStatus> {
    c_int::try_from(value).map_err(|_| WebPStatus::InvalidParam)
}

fn features_from(input: &WebPBitstreamFeatures) -> Result<WebPFeatures, WebPStatus> {
    Ok(WebPFeatures {
        width: dimension(input.width)?,
        height: dimension(input.height)?,
        has_alpha: input.has_alpha != 0,
        has_animation: input.has_animation != 0,
        format: BitstreamFormat::from_code(input.format),
    })
}

impl WebPCodec for LibWebP {
    type Buffer = LibWebPBuffer;

    fn features(&self, data: &[u8]) -> Result<WebPFeatures, WebPStatus> {
        let mut config = WebPDecoderConfig::new().map_err(|_| WebPStatus::InvalidParam)?;
        // SAFETY: `data` is a valid slice and `config.input` a valid out-parameter
        let status = unsafe { WebPGetFeatures(data.as_ptr(), data.len(), &mut config.input) };
        check(status)?;
        features_from(&config.input)
    }

    fn decode(&self, data: &[u8], config: &WebPDecodeConfig) -> Result<LibWebPBuffer, WebPStatus> {
        let mut buffer = LibWebPBuffer::new()?;

        let dec = &mut buffer.config;
        dec.output.colorspace = colorspace(config.layout());
        if let Some((width, height)) = config.scaled_size() {
            dec.options.use_scaling = 1;
            dec.options.scaled_width = to_c_int(width)?;
            dec.options.scaled_height = to_c_int(height)?;
        }

        // SAFETY: `data` is a valid slice; output memory is owned by `buffer`
        let status = unsafe { WebPDecode(data.as_ptr(), data.len(), &mut buffer.config) };
        check(status)?;

        log::trace!("libwebp produced {} bytes", buffer.as_bytes().len());
        Ok(buffer)
    }
}
