use bytemuck::{Pod, Zeroable};

use crate::types::ShaderParameters;

/// Canvas aspect fed to `u_ratio`; the viewport is always square.
pub const CANVAS_RATIO: f32 = 1.0;

/// Contract names in the order they occupy the uniform block.
pub const UNIFORM_NAMES: [&str; 8] = [
    "u_time",
    "u_ratio",
    "u_img_ratio",
    "u_patternScale",
    "u_refraction",
    "u_edge",
    "u_patternBlur",
    "u_liquid",
];

/// CPU mirror of the std140 `LiquidParams` block injected ahead of the
/// fragment program. Eight scalars, no padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LiquidUniforms {
    pub time: f32,
    pub ratio: f32,
    pub img_ratio: f32,
    pub pattern_scale: f32,
    pub refraction: f32,
    pub edge: f32,
    pub pattern_blur: f32,
    pub liquid: f32,
}

impl LiquidUniforms {
    /// Copies the parameters in; the caller's struct is never aliased.
    pub fn new(params: &ShaderParameters, time_ms: f32, img_ratio: f32) -> Self {
        Self {
            time: time_ms,
            ratio: CANVAS_RATIO,
            img_ratio,
            pattern_scale: params.pattern_scale,
            refraction: params.refraction,
            edge: params.edge,
            pattern_blur: params.pattern_blur,
            liquid: params.liquid,
        }
    }
}

impl Default for LiquidUniforms {
    fn default() -> Self {
        Self::new(&ShaderParameters::default(), 0.0, 1.0)
    }
}
