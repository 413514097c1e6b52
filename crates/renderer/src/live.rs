use tracing::{debug, error, warn};

use crate::clock::{AnimationClock, ClockState};
use crate::color::Background;
use crate::error::RenderResult;
use crate::surface::ShaderSurface;
use crate::types::{ShaderParameters, SourceImage};

/// Result of one display-refresh callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Drawn { time_ms: f64 },
    /// Nothing drawn this refresh; the view is still attached.
    Skipped,
    Detached,
}

/// The live preview: one surface driven frame by frame by an
/// [`AnimationClock`].
///
/// Parameter and image updates are stored and applied on the next tick.
/// After [`LiveView::detach`] the surface is disposed and no further draw can
/// happen.
pub struct LiveView<S: ShaderSurface> {
    surface: Option<S>,
    clock: AnimationClock,
    params: ShaderParameters,
    pending_image: Option<SourceImage>,
    img_ratio: f32,
    background: Background,
    draws: u64,
    warned: bool,
}

impl<S: ShaderSurface> LiveView<S> {
    pub fn attach(mut surface: S, image: &SourceImage, params: ShaderParameters) -> RenderResult<Self> {
        surface.upload_image(image)?;
        let mut clock = AnimationClock::new();
        clock.start();
        debug!(side = surface.side(), "live view attached");
        Ok(Self {
            surface: Some(surface),
            clock,
            params,
            pending_image: None,
            img_ratio: image.aspect_ratio(),
            background: Background::Transparent,
            draws: 0,
            warned: false,
        })
    }

    pub fn set_params(&mut self, params: ShaderParameters) {
        self.params = params;
    }

    pub fn params(&self) -> &ShaderParameters {
        &self.params
    }

    pub fn set_image(&mut self, image: SourceImage) {
        self.pending_image = Some(image);
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = background;
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.clock.elapsed_ms()
    }

    /// Frames drawn since attach.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    /// Runs one display refresh `delta_ms` after the previous one.
    ///
    /// Fatal errors detach the view before being returned. Recoverable ones
    /// are logged once and the frame is skipped.
    pub fn tick(&mut self, delta_ms: f64) -> RenderResult<TickOutcome> {
        match self.draw_frame(delta_ms) {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_fatal() => {
                error!(error = %err, "live view stopped");
                self.detach();
                Err(err)
            }
            Err(err) => {
                if !self.warned {
                    warn!(error = %err, "live frame failed; continuing");
                    self.warned = true;
                }
                Ok(TickOutcome::Skipped)
            }
        }
    }

    fn draw_frame(&mut self, delta_ms: f64) -> RenderResult<TickOutcome> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(TickOutcome::Detached);
        };
        let Some(request) = self.clock.pending() else {
            return Ok(TickOutcome::Skipped);
        };

        if let Some(image) = self.pending_image.take() {
            self.img_ratio = image.aspect_ratio();
            surface.upload_image(&image)?;
        }

        let Some(time_ms) = self.clock.advance(request, delta_ms, self.params.speed) else {
            return Ok(TickOutcome::Skipped);
        };
        surface.set_uniforms(&self.params, time_ms as f32, self.img_ratio);
        surface.render(self.background.clear_color())?;
        self.draws += 1;
        Ok(TickOutcome::Drawn { time_ms })
    }

    /// Cancels the pending frame and disposes the surface. Idempotent.
    pub fn detach(&mut self) {
        self.clock.stop();
        if let Some(surface) = self.surface.take() {
            surface.dispose();
            debug!(draws = self.draws, "live view detached");
        }
    }
}

impl<S: ShaderSurface> Drop for LiveView<S> {
    fn drop(&mut self) {
        self.detach();
    }
}
