pub mod bitmap;
pub mod config;
pub mod decode;
pub mod error;
pub mod format;

// Re-export commonly used types
pub use bitmap::{AlphaInfo, AlphaMode, Bitmap, ByteOrder, ColorSpace, PixelBuffer, PixelLayout};
pub use config::{DecoderConfig, TargetSize};
pub use decode::{FormatAwareDecoder, ImageDecoding};
pub use error::{BitmapError, DecodeError, PlatformError, WebPStatus};
pub use format::{sniff, ImageKind};
