//! `[images]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [images]
//! cache_dir = ".brisk-cache"
//!
//! [images.jpeg]
//! min = 80                # lowest quality tried
//! max = 90                # highest quality tried
//! target_ssim = 0.999     # stop at the lowest quality reaching this similarity
//!
//! [images.png]
//! min = 0                 # quantization quality floor
//! max = 100               # quantization quality target
//! speed = 4               # 1 (slow, best) ..= 10 (fast)
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Image pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Directory holding the compression cache manifest.
    pub cache_dir: PathBuf,

    pub jpeg: JpegConfig,

    pub png: PngConfig,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".brisk-cache"),
            jpeg: JpegConfig::default(),
            png: PngConfig::default(),
        }
    }
}

/// Progressive JPEG re-encoding band.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JpegConfig {
    pub min: u8,
    pub max: u8,
    pub target_ssim: f64,
}

impl Default for JpegConfig {
    fn default() -> Self {
        Self {
            min: 80,
            max: 90,
            target_ssim: 0.999,
        }
    }
}

/// PNG palette quantization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PngConfig {
    pub min: u8,
    pub max: u8,
    pub speed: i32,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: 100,
            speed: 4,
        }
    }
}

impl ImagesConfig {
    const JPEG: FieldPath = FieldPath::new("images.jpeg");
    const JPEG_SSIM: FieldPath = FieldPath::new("images.jpeg.target_ssim");
    const PNG: FieldPath = FieldPath::new("images.png");
    const PNG_SPEED: FieldPath = FieldPath::new("images.png.speed");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let jpeg = &self.jpeg;
        if jpeg.min == 0 || jpeg.max > 100 || jpeg.min > jpeg.max {
            diag.error(
                Self::JPEG,
                format!("quality band must satisfy 1 <= min <= max <= 100, got {}..={}", jpeg.min, jpeg.max),
            );
        }
        if !(jpeg.target_ssim > 0.0 && jpeg.target_ssim <= 1.0) {
            diag.error(Self::JPEG_SSIM, "must be in (0, 1]");
        }

        let png = &self.png;
        if png.max > 100 || png.min > png.max {
            diag.error(
                Self::PNG,
                format!("quality range must satisfy min <= max <= 100, got {}..={}", png.min, png.max),
            );
        }
        if !(1..=10).contains(&png.speed) {
            diag.error(Self::PNG_SPEED, "must be between 1 and 10");
        }
    }
}
