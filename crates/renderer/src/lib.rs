//! Liquid-glass renderer.
//!
//! One GLSL fragment program, fed a fixed set of uniforms, is drawn two ways:
//!
//! ```text
//!   ShaderParameters ──┬─▶ LiveView ── AnimationClock ──▶ GpuState (window)
//!                      │
//!                      └─▶ export_animation ── FrameSchedule ──▶ GpuState (offscreen)
//!                                   │
//!                                   └─▶ quantizer::Codec ──▶ GIF bytes
//! ```
//!
//! Both paths talk to the graphics backend only through [`ShaderSurface`],
//! and each builds its own [`GpuState`], so a running preview and an export
//! never share a device, buffer or texture. The export samples exactly one
//! loop period of the program at evenly spaced times, which makes the
//! resulting animation loop without a seam.

mod clock;
mod color;
mod compile;
mod error;
mod export;
mod gpu;
mod live;
mod schedule;
mod surface;
#[cfg(test)]
mod test_support;
mod types;
mod window;

pub use clock::{AnimationClock, ClockState, FrameRequest};
pub use color::Background;
pub use compile::{wrap_fragment_program, IMAGE_SAMPLER_NAME};
pub use error::{RenderError, RenderResult, ShaderStage};
pub use export::{export_animation, export_animation_with, Exporter};
pub use gpu::{GpuState, LiquidUniforms, CANVAS_RATIO, UNIFORM_NAMES};
pub use live::{LiveView, TickOutcome};
pub use schedule::{loop_phase, FrameSchedule, LOOP_PERIOD_MS, MIN_FRAME_DELAY_MS, MIN_SPEED};
pub use surface::{CapturedFrame, ShaderSurface};
pub use types::{ExportOptions, ShaderParameters, SourceImage, MAX_EXPORT_FRAMES, MAX_EXPORT_SIDE};
pub use window::{run_preview, PreviewConfig};
