use serde::{Deserialize, Serialize};

/// Requested output size for a decode. `(0, 0)` asks for the native size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const NONE: TargetSize = TargetSize {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        TargetSize { width, height }
    }

    /// True unless both dimensions are set
    pub fn is_none(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<(u32, u32)> for TargetSize {
    fn from((width, height): (u32, u32)) -> Self {
        TargetSize { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Request premultiplied color for WebP images with alpha
    pub premultiply_alpha: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            premultiply_alpha: true,
        }
    }
}

#[test]
fn target_size_needs_both_dimensions() {
    assert!(TargetSize::NONE.is_none());
    assert!(TargetSize::new(400, 0).is_none());
    assert!(TargetSize::new(0, 300).is_none());
    assert!(!TargetSize::from((400, 300)).is_none());
}

#[test]
fn missing_config_fields_use_defaults() {
    let config: DecoderConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, DecoderConfig::default());
    assert!(config.premultiply_alpha);
}
