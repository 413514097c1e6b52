use quantizer::RowOrder;

use crate::error::RenderResult;
use crate::types::{ShaderParameters, SourceImage};

/// Pixels read back from a render target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub pixels: Vec<u8>,
    pub order: RowOrder,
}

/// A square drawing target bound to one compiled liquid program.
///
/// Every implementation owns its own context, buffers and texture; two
/// surfaces never share bound state.
pub trait ShaderSurface {
    /// Side of the square viewport in device pixels.
    fn side(&self) -> u32;

    /// Replaces the source texture. The previous texture is released first.
    fn upload_image(&mut self, image: &SourceImage) -> RenderResult<()>;

    /// Copies the parameters and the sampled time into the uniform block.
    fn set_uniforms(&mut self, params: &ShaderParameters, time_ms: f32, img_ratio: f32);

    /// Clears to `clear` (normalized RGBA) and draws one frame.
    fn render(&mut self, clear: [f64; 4]) -> RenderResult<()>;

    /// Reads back the most recent frame as tightly packed RGBA.
    fn read_pixels(&mut self) -> RenderResult<CapturedFrame>;

    /// Releases every resource held by the surface.
    fn dispose(self)
    where
        Self: Sized,
    {
    }
}
