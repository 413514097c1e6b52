use quantizer::{normalize_rows, shared_slot, CodecSlot};
use tracing::{debug, info};

use crate::error::{RenderError, RenderResult};
use crate::gpu::GpuState;
use crate::schedule::FrameSchedule;
use crate::surface::{CapturedFrame, ShaderSurface};
use crate::types::{ExportOptions, ShaderParameters, SourceImage};

/// Produces looping GIF exports on a private offscreen GPU context.
///
/// Each call builds and tears down its own context, so exports never touch
/// the state of a running live view.
#[derive(Debug, Clone)]
pub struct Exporter {
    fragment_source: String,
}

impl Exporter {
    pub fn new(fragment_source: impl Into<String>) -> Self {
        Self {
            fragment_source: fragment_source.into(),
        }
    }

    /// Renders one loop of the effect and returns the GIF bytes.
    ///
    /// Any failure while building the offscreen context, compiling the
    /// program or linking the pipeline is reported as
    /// [`RenderError::ExportContextFailed`], with the backend diagnostic kept
    /// in the message. Failures after setup keep their own kinds.
    pub fn export(
        &self,
        image: &SourceImage,
        params: &ShaderParameters,
        options: &ExportOptions,
    ) -> RenderResult<Vec<u8>> {
        options.validate()?;
        let mut surface =
            GpuState::offscreen(options.side, &self.fragment_source).map_err(setup_failure)?;
        let result = export_animation(&mut surface, image, params, options);
        surface.dispose();
        result
    }
}

fn setup_failure(err: RenderError) -> RenderError {
    match err {
        RenderError::ContextUnavailable(message) => RenderError::ExportContextFailed(message),
        err @ (RenderError::ShaderCompileFailed { .. } | RenderError::ProgramLinkFailed(_)) => {
            RenderError::ExportContextFailed(err.to_string())
        }
        other => other,
    }
}

/// Samples one seamless loop period on `surface` and encodes it with the
/// process-wide codec.
///
/// Frames are captured and appended strictly in schedule order. Any failure
/// aborts the whole export; no partial stream is returned.
pub fn export_animation<S: ShaderSurface>(
    surface: &mut S,
    image: &SourceImage,
    params: &ShaderParameters,
    options: &ExportOptions,
) -> RenderResult<Vec<u8>> {
    export_animation_with(shared_slot(), surface, image, params, options)
}

/// [`export_animation`] drawing its codec from `codecs`.
pub fn export_animation_with<S: ShaderSurface>(
    codecs: &CodecSlot,
    surface: &mut S,
    image: &SourceImage,
    params: &ShaderParameters,
    options: &ExportOptions,
) -> RenderResult<Vec<u8>> {
    options.validate()?;
    let side = surface.side();
    if side != options.side {
        return Err(RenderError::ExportContextFailed(format!(
            "surface is {side}px but the export needs {}px",
            options.side
        )));
    }
    let canvas = u16::try_from(side)
        .map_err(|_| RenderError::InvalidOptions(format!("side {side} exceeds the GIF canvas limit")))?;

    let codec = codecs.get()?;
    surface.upload_image(image)?;

    // Copied once so the whole export sees one consistent parameter set.
    let params = *params;
    let schedule = FrameSchedule::new(options.duration_sec, options.fps);
    let delay_ms = schedule.frame_delay_ms(params.speed);
    let transparent = options.background.is_transparent();
    let clear = options.background.clear_color();
    let img_ratio = image.aspect_ratio();

    let mut encoder = codec.encoder(canvas, canvas)?;
    for (index, time_ms) in schedule.times().enumerate() {
        surface.set_uniforms(&params, time_ms as f32, img_ratio);
        surface.render(clear)?;
        let CapturedFrame { mut pixels, order } = surface.read_pixels()?;
        normalize_rows(&mut pixels, side, side, order)?;
        let record = codec.encode_frame(&pixels, side, side, delay_ms, index == 0, transparent)?;
        encoder.append(&record)?;
        debug!(frame = index, time_ms, colors = record.palette().len(), "captured export frame");
    }

    let bytes = encoder.finish()?;
    info!(
        side,
        frames = schedule.total_frames(),
        delay_ms,
        background = %options.background,
        bytes = bytes.len(),
        "exported animation"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Background;
    use crate::error::ShaderStage;
    use crate::test_support::{checker_image, PatternSurface};
    use quantizer::{Codec, EncodeError};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn options(side: u32, background: Background) -> ExportOptions {
        ExportOptions {
            side,
            duration_sec: 1.0,
            fps: 10.0,
            background,
        }
    }

    fn decode(bytes: &[u8]) -> (Vec<gif::Frame<'static>>, gif::Repeat) {
        let mut decoder = gif::DecodeOptions::new();
        decoder.set_color_output(gif::ColorOutput::Indexed);
        let mut reader = decoder.read_info(bytes).unwrap();
        let mut frames = Vec::new();
        while let Some(frame) = reader.read_next_frame().unwrap() {
            frames.push(frame.clone());
        }
        (frames, reader.repeat())
    }

    #[test]
    fn transparent_export_has_ten_looping_frames() {
        let image = checker_image(16);
        let params = ShaderParameters {
            speed: 1.0,
            ..ShaderParameters::default()
        };
        let mut surface = PatternSurface::new(64);
        let bytes = export_animation(
            &mut surface,
            &image,
            &params,
            &options(64, Background::Transparent),
        )
        .unwrap();

        assert_eq!(&bytes[..6], b"GIF89a");
        let netscape = bytes.windows(11).filter(|w| *w == b"NETSCAPE2.0").count();
        assert_eq!(netscape, 1);

        let (frames, repeat) = decode(&bytes);
        assert_eq!(repeat, gif::Repeat::Infinite);
        assert_eq!(frames.len(), 10);
        for frame in &frames {
            assert_eq!((frame.width, frame.height), (64, 64));
            assert_eq!(frame.delay, 10);
            assert_eq!(frame.transparent, Some(0));
            for (i, &index) in frame.buffer.iter().enumerate() {
                assert_eq!(index == 0, i % 64 < 16, "pixel {i}");
            }
        }
    }

    #[test]
    fn delay_tracks_speed() {
        let image = checker_image(16);
        let params = ShaderParameters::default();
        let mut surface = PatternSurface::new(32);
        let bytes =
            export_animation(&mut surface, &image, &params, &options(32, Background::Transparent)).unwrap();
        let (frames, _) = decode(&bytes);
        // 100ms step at speed 0.3 is 333ms, written as 33cs.
        assert!(frames.iter().all(|frame| frame.delay == 33));
    }

    #[test]
    fn opaque_background_has_no_transparency() {
        let image = checker_image(16);
        let mut surface = PatternSurface::new(32);
        let bytes = export_animation(
            &mut surface,
            &image,
            &ShaderParameters::default(),
            &options(32, Background::Color([10, 200, 30])),
        )
        .unwrap();
        let (frames, _) = decode(&bytes);
        assert_eq!(frames.len(), 10);
        assert!(frames.iter().all(|frame| frame.transparent.is_none()));
    }

    #[test]
    fn exports_are_byte_identical() {
        let image = checker_image(16);
        let params = ShaderParameters::default();
        let opts = options(48, Background::Transparent);
        let first = export_animation(&mut PatternSurface::new(48), &image, &params, &opts).unwrap();
        let second = export_animation(&mut PatternSurface::new(48), &image, &params, &opts).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn bottom_up_surfaces_are_flipped() {
        let image = checker_image(16);
        let params = ShaderParameters::default();
        let opts = options(32, Background::Color([0, 0, 0]));
        let top_down = export_animation(&mut PatternSurface::new(32), &image, &params, &opts).unwrap();
        let bottom_up =
            export_animation(&mut PatternSurface::bottom_up(32), &image, &params, &opts).unwrap();
        assert_eq!(top_down, bottom_up);
    }

    #[test]
    fn samples_one_period_in_order() {
        let image = checker_image(16);
        let mut surface = PatternSurface::new(16);
        let mut opts = options(16, Background::Transparent);
        opts.duration_sec = 0.0;
        export_animation(&mut surface, &image, &ShaderParameters::default(), &opts).unwrap();
        // Two frames at 0ms and 500ms; the last sample left on the surface is the second.
        assert_eq!(surface.time_ms(), 500.0);
        assert_eq!(surface.render_counter().load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn failures_abort_the_export() {
        let image = checker_image(16);
        let mut surface = PatternSurface::new(16);
        surface.fail_next_upload = Some(RenderError::TextureUploadFailed("rejected".into()));
        let result = export_animation(
            &mut surface,
            &image,
            &ShaderParameters::default(),
            &options(16, Background::Transparent),
        );
        assert!(matches!(result, Err(RenderError::TextureUploadFailed(_))));

        let mut surface = PatternSurface::new(16);
        assert!(matches!(
            export_animation(&mut surface, &image, &ShaderParameters::default(), &options(32, Background::Transparent)),
            Err(RenderError::ExportContextFailed(_))
        ));

        let mut bad = options(16, Background::Transparent);
        bad.fps = f64::INFINITY;
        assert!(matches!(
            export_animation(&mut surface, &image, &ShaderParameters::default(), &bad),
            Err(RenderError::InvalidOptions(_))
        ));
    }

    static CODEC_MISSING: AtomicBool = AtomicBool::new(true);

    fn codec_missing_once() -> Result<Codec, EncodeError> {
        if CODEC_MISSING.swap(false, Ordering::SeqCst) {
            Err(EncodeError::CodecLoad("gif backend missing".into()))
        } else {
            Codec::load()
        }
    }

    #[test]
    fn codec_load_failure_aborts_before_drawing() {
        static CODECS: CodecSlot = CodecSlot::new(codec_missing_once);
        let image = checker_image(16);
        let params = ShaderParameters::default();
        let opts = options(16, Background::Transparent);
        let mut surface = PatternSurface::new(16);
        let renders = surface.render_counter();

        let result = export_animation_with(&CODECS, &mut surface, &image, &params, &opts);
        assert!(matches!(result, Err(RenderError::DependencyLoadFailed(ref m)) if m.contains("missing")));
        assert_eq!(renders.load(Ordering::SeqCst), 0);
        assert_eq!(surface.uploads, 0);

        let bytes = export_animation_with(&CODECS, &mut surface, &image, &params, &opts).unwrap();
        assert_eq!(decode(&bytes).0.len(), 10);
        assert_eq!(CODECS.load_attempts(), 2);
    }

    #[test]
    fn setup_failures_become_export_context_failures() {
        let compile = setup_failure(RenderError::ShaderCompileFailed {
            stage: ShaderStage::Fragment,
            diagnostic: "unknown identifier `u_glow`".into(),
        });
        assert!(matches!(compile, RenderError::ExportContextFailed(ref m) if m.contains("u_glow")));

        let link = setup_failure(RenderError::ProgramLinkFailed("location mismatch".into()));
        assert!(matches!(link, RenderError::ExportContextFailed(ref m) if m.contains("location mismatch")));

        let context = setup_failure(RenderError::ContextUnavailable("no adapter".into()));
        assert!(matches!(context, RenderError::ExportContextFailed(ref m) if m == "no adapter"));

        let options = setup_failure(RenderError::InvalidOptions("side".into()));
        assert!(matches!(options, RenderError::InvalidOptions(_)));
    }
}
