//! wgpu implementation of the liquid-glass graphics context.
//!
//! - `context` owns the instance, device and either a window surface or an
//!   offscreen texture, and knows the square viewport inside it.
//! - `pipeline` compiles the wrapped program and links it with the quad
//!   geometry and "over" blending.
//! - `texture` keeps exactly one source-image texture alive.
//! - `uniforms` mirrors the injected uniform block.
//! - `state` glues everything together behind [`crate::ShaderSurface`].

mod context;
mod pipeline;
mod state;
mod texture;
mod uniforms;

pub use state::GpuState;
pub use uniforms::{LiquidUniforms, CANVAS_RATIO, UNIFORM_NAMES};
