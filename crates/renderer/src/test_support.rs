use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use quantizer::RowOrder;

use crate::error::{RenderError, RenderResult};
use crate::schedule::loop_phase;
use crate::surface::{CapturedFrame, ShaderSurface};
use crate::types::{ShaderParameters, SourceImage};

/// Deterministic software stand-in for the GPU surface.
///
/// The left quarter of every frame is left untouched by the "effect", so it
/// shows the clear colour; the rest is a pattern driven by the loop phase.
pub(crate) struct PatternSurface {
    side: u32,
    order: RowOrder,
    params: ShaderParameters,
    time_ms: f32,
    frame: Vec<u8>,
    renders: Arc<AtomicUsize>,
    pub uploads: usize,
    pub last_img_ratio: f32,
    pub fail_next_render: Option<RenderError>,
    pub fail_next_upload: Option<RenderError>,
}

impl PatternSurface {
    pub fn new(side: u32) -> Self {
        Self {
            side,
            order: RowOrder::TopDown,
            params: ShaderParameters::default(),
            time_ms: 0.0,
            frame: vec![0; (side * side * 4) as usize],
            renders: Arc::new(AtomicUsize::new(0)),
            uploads: 0,
            last_img_ratio: 0.0,
            fail_next_render: None,
            fail_next_upload: None,
        }
    }

    pub fn bottom_up(side: u32) -> Self {
        Self {
            order: RowOrder::BottomUp,
            ..Self::new(side)
        }
    }

    pub fn render_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.renders)
    }

    pub fn time_ms(&self) -> f32 {
        self.time_ms
    }

    fn pixel(&self, x: u32, y: u32, clear: [f64; 4]) -> [u8; 4] {
        if x < self.side / 4 {
            return clear.map(|channel| (channel * 255.0).round() as u8);
        }
        let phase = (loop_phase(f64::from(self.time_ms)) * 255.0) as u32;
        let scale = (self.params.pattern_scale * 10.0) as u32;
        [
            ((x * 7 + phase) % 256) as u8,
            ((y * 5 + phase * 3) % 256) as u8,
            ((x + y + scale) % 256) as u8,
            255,
        ]
    }
}

impl ShaderSurface for PatternSurface {
    fn side(&self) -> u32 {
        self.side
    }

    fn upload_image(&mut self, _image: &SourceImage) -> RenderResult<()> {
        if let Some(err) = self.fail_next_upload.take() {
            return Err(err);
        }
        self.uploads += 1;
        Ok(())
    }

    fn set_uniforms(&mut self, params: &ShaderParameters, time_ms: f32, img_ratio: f32) {
        self.params = *params;
        self.time_ms = time_ms;
        self.last_img_ratio = img_ratio;
    }

    fn render(&mut self, clear: [f64; 4]) -> RenderResult<()> {
        if let Some(err) = self.fail_next_render.take() {
            return Err(err);
        }
        let side = self.side;
        let mut frame = Vec::with_capacity(self.frame.len());
        for y in 0..side {
            let row = match self.order {
                RowOrder::TopDown => y,
                RowOrder::BottomUp => side - 1 - y,
            };
            for x in 0..side {
                frame.extend_from_slice(&self.pixel(x, row, clear));
            }
        }
        self.frame = frame;
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_pixels(&mut self) -> RenderResult<CapturedFrame> {
        Ok(CapturedFrame {
            pixels: self.frame.clone(),
            order: self.order,
        })
    }
}

pub(crate) fn checker_image(side: u32) -> SourceImage {
    let pixels: Vec<u8> = (0..side * side)
        .flat_map(|i| {
            let on = ((i % side) / 4 + (i / side) / 4) % 2 == 0;
            if on {
                [240, 240, 240, 255]
            } else {
                [20, 20, 20, 255]
            }
        })
        .collect();
    SourceImage::new(side, side, pixels).unwrap()
}
