use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use tracing::{error, info};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::color::Background;
use crate::gpu::GpuState;
use crate::live::{LiveView, TickOutcome};
use crate::types::{ShaderParameters, SourceImage};

/// Everything the interactive preview window needs.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub fragment_source: String,
    pub image: SourceImage,
    pub params: ShaderParameters,
    pub background: Background,
    pub size: (u32, u32),
    pub title: String,
}

struct PreviewState {
    // Declared first so the surface is released before the window it wraps.
    live: LiveView<GpuState>,
    window: Arc<Window>,
    last_frame: Option<Instant>,
}

impl PreviewState {
    fn redraw(&mut self) -> Result<bool> {
        let now = Instant::now();
        let delta_ms = self
            .last_frame
            .replace(now)
            .map(|previous| now.saturating_duration_since(previous).as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        match self.live.tick(delta_ms)? {
            TickOutcome::Drawn { .. } | TickOutcome::Skipped => Ok(true),
            TickOutcome::Detached => Ok(false),
        }
    }
}

/// Opens a window and runs the live view until it is closed.
pub fn run_preview(config: PreviewConfig) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(config.size.0, config.size.1))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let gpu = GpuState::for_window(window.as_ref(), window.inner_size(), &config.fragment_source)?;
    let mut live = LiveView::attach(gpu, &config.image, config.params)?;
    live.set_background(config.background);
    info!(
        width = config.size.0,
        height = config.size.1,
        "live preview attached"
    );

    let mut state = PreviewState {
        live,
        window,
        last_frame: None,
    };
    state.window.request_redraw();

    let mut outcome = Ok(());
    let run_result = event_loop.run(|event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        let Event::WindowEvent { window_id, event } = event else {
            return;
        };
        if window_id != state.window.id() {
            return;
        }
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                state.live.detach();
                elwt.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = state.live.surface_mut() {
                    gpu.resize(new_size);
                }
                state.window.request_redraw();
            }
            WindowEvent::RedrawRequested => match state.redraw() {
                Ok(true) => state.window.request_redraw(),
                Ok(false) => elwt.exit(),
                Err(err) => {
                    error!(error = %err, "live preview failed");
                    outcome = Err(err);
                    elwt.exit();
                }
            },
            _ => {}
        }
    });
    if let Err(err) = run_result {
        return Err(anyhow!("window event loop error: {err}"));
    }
    outcome
}
