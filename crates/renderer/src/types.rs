use std::sync::Arc;

use crate::color::Background;
use crate::error::{RenderError, RenderResult};

/// Largest square side accepted for exports before adapter limits apply.
pub const MAX_EXPORT_SIDE: u32 = u16::MAX as u32;

/// Upper bound on scheduled export frames.
pub const MAX_EXPORT_FRAMES: usize = 10_000;

/// The user-facing knobs of the liquid-glass effect.
///
/// Live and export rendering consume the same struct, so equal parameters at
/// an equal time value give the same picture on either path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderParameters {
    pub pattern_scale: f32,
    pub refraction: f32,
    pub edge: f32,
    pub pattern_blur: f32,
    pub liquid: f32,
    /// Live clock multiplier; also stretches export frame delays.
    pub speed: f64,
}

impl Default for ShaderParameters {
    fn default() -> Self {
        Self {
            pattern_scale: 2.0,
            refraction: 0.015,
            edge: 0.4,
            pattern_blur: 0.005,
            liquid: 0.07,
            speed: 0.3,
        }
    }
}

/// A caller-owned RGBA8 image uploaded as the effect's source texture.
///
/// Pixels sit behind an `Arc` so the live view and an export can share them
/// read-only without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl SourceImage {
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> RenderResult<Self> {
        let pixels = pixels.into();
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidImage(format!(
                "image must be non-empty, got {width}x{height}"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|count| count.checked_mul(4))
            .ok_or_else(|| RenderError::InvalidImage(format!("{width}x{height} overflows")))?;
        if pixels.len() != expected {
            return Err(RenderError::InvalidImage(format!(
                "{width}x{height} RGBA image needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Width over height, fed to the shader as `u_img_ratio`.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Settings for one animated export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Output is always `side` x `side` pixels.
    pub side: u32,
    /// Together with `fps`, only decides how many frames sample the loop.
    pub duration_sec: f64,
    pub fps: f64,
    pub background: Background,
}

impl ExportOptions {
    pub fn new(side: u32) -> Self {
        Self {
            side,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.side == 0 || self.side > MAX_EXPORT_SIDE {
            return Err(RenderError::InvalidOptions(format!(
                "side must be between 1 and {MAX_EXPORT_SIDE}, got {}",
                self.side
            )));
        }
        for (name, value) in [("duration", self.duration_sec), ("fps", self.fps)] {
            if !value.is_finite() || value < 0.0 {
                return Err(RenderError::InvalidOptions(format!(
                    "{name} must be a finite, non-negative number, got {value}"
                )));
            }
        }
        let frames = (self.duration_sec * self.fps).round();
        if frames > MAX_EXPORT_FRAMES as f64 {
            return Err(RenderError::InvalidOptions(format!(
                "{frames} frames requested, at most {MAX_EXPORT_FRAMES} are supported"
            )));
        }
        Ok(())
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            side: 512,
            duration_sec: 3.0,
            fps: 20.0,
            background: Background::Transparent,
        }
    }
}
