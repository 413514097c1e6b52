use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::dither::{dither_ordered, BAYER_4X4};
use crate::encoder::AnimationEncoder;
use crate::error::EncodeError;
use crate::frame::{assemble_frame, mask_transparent, FrameRecord};
use crate::palette::apply_palette;
use crate::quantize::{quantize, QuantizeOptions, MAX_PALETTE_COLORS};

/// Dither strength applied to every exported frame.
pub const EXPORT_DITHER_STRENGTH: f64 = 2.0;

/// The loaded frame pipeline: dither, quantize, map and assemble.
#[derive(Debug, Clone)]
pub struct Codec {
    dither_strength: f64,
    options: QuantizeOptions,
}

impl Codec {
    /// Validates the pipeline tables and proves the GIF backend can produce
    /// a stream before anything is handed out.
    pub fn load() -> Result<Self, EncodeError> {
        let mut seen = [false; 16];
        for &level in &BAYER_4X4 {
            let slot = seen
                .get_mut(usize::from(level))
                .ok_or_else(|| EncodeError::CodecLoad(format!("bayer level {level} out of range")))?;
            if *slot {
                return Err(EncodeError::CodecLoad(format!(
                    "bayer level {level} appears twice"
                )));
            }
            *slot = true;
        }

        let codec = Self {
            dither_strength: EXPORT_DITHER_STRENGTH,
            options: QuantizeOptions::default(),
        };
        let probe = codec.encode_frame(&[0, 0, 0, 255], 1, 1, 0, true, false)?;
        let mut encoder = AnimationEncoder::new(1, 1)?;
        encoder.append(&probe)?;
        let bytes = encoder.finish()?;
        if !bytes.starts_with(b"GIF89a") {
            return Err(EncodeError::CodecLoad(
                "gif backend produced an unexpected header".to_string(),
            ));
        }
        Ok(codec)
    }

    pub fn dither_strength(&self) -> f64 {
        self.dither_strength
    }

    pub fn encoder(&self, width: u16, height: u16) -> Result<AnimationEncoder, EncodeError> {
        AnimationEncoder::new(width, height)
    }

    /// Turns one top-down RGBA frame into a paletted [`FrameRecord`].
    ///
    /// Alpha-aware frames reserve palette slot 0 for transparency and quantize
    /// the remaining colours into 255 entries.
    pub fn encode_frame(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        delay_ms: u32,
        is_first: bool,
        transparent: bool,
    ) -> Result<FrameRecord, EncodeError> {
        let dithered = dither_ordered(rgba, width, height, self.dither_strength)?;
        let palette = if transparent {
            quantize(&dithered, MAX_PALETTE_COLORS - 1, self.options).with_transparent_slot()?
        } else {
            quantize(&dithered, MAX_PALETTE_COLORS, self.options)
        };
        let mut indices = apply_palette(&dithered, &palette);
        if transparent {
            let masked = mask_transparent(&mut indices, rgba);
            debug!(masked, "masked transparent pixels");
        }
        assemble_frame(
            indices, palette, width, height, delay_ms, is_first, transparent,
        )
    }
}

/// Observable state of a [`CodecSlot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecStatus {
    NotLoaded,
    Loaded,
    Failed(String),
}

enum SlotState {
    NotLoaded,
    Loaded(Arc<Codec>),
    Failed(String),
}

/// A lazily loaded codec shared by every caller.
///
/// The loader runs on first use. Concurrent callers wait on the same lock
/// and observe a single load. A failed load is remembered for reporting but
/// retried on the next request.
pub struct CodecSlot {
    state: Mutex<SlotState>,
    attempts: AtomicUsize,
    loader: fn() -> Result<Codec, EncodeError>,
}

impl CodecSlot {
    pub const fn new(loader: fn() -> Result<Codec, EncodeError>) -> Self {
        Self {
            state: Mutex::new(SlotState::NotLoaded),
            attempts: AtomicUsize::new(0),
            loader,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // A panic while holding the lock leaves the state itself intact.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self) -> Result<Arc<Codec>, EncodeError> {
        let mut state = self.lock();
        if let SlotState::Loaded(codec) = &*state {
            return Ok(Arc::clone(codec));
        }
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match (self.loader)() {
            Ok(codec) => {
                let codec = Arc::new(codec);
                *state = SlotState::Loaded(Arc::clone(&codec));
                info!(attempt, "gif codec loaded");
                Ok(codec)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(attempt, error = %message, "gif codec failed to load");
                *state = SlotState::Failed(message.clone());
                Err(EncodeError::CodecLoad(message))
            }
        }
    }

    pub fn status(&self) -> CodecStatus {
        match &*self.lock() {
            SlotState::NotLoaded => CodecStatus::NotLoaded,
            SlotState::Loaded(_) => CodecStatus::Loaded,
            SlotState::Failed(message) => CodecStatus::Failed(message.clone()),
        }
    }

    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

static SHARED: CodecSlot = CodecSlot::new(Codec::load);

/// The process-wide slot behind [`shared_codec`].
pub fn shared_slot() -> &'static CodecSlot {
    &SHARED
}

/// Process-wide codec handle, loaded on first call.
pub fn shared_codec() -> Result<Arc<Codec>, EncodeError> {
    SHARED.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn shared_codec_loads_once() {
        let first = shared_codec().unwrap();
        let second = shared_codec().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(SHARED.status(), CodecStatus::Loaded);
        assert_eq!(SHARED.load_attempts(), 1);
    }

    #[test]
    fn concurrent_callers_share_one_load() {
        static SLOT: CodecSlot = CodecSlot::new(Codec::load);
        let handles: Vec<_> = (0..8).map(|_| std::thread::spawn(|| SLOT.get().unwrap())).collect();
        let codecs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(codecs.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(SLOT.load_attempts(), 1);
    }

    static FAIL_NEXT: AtomicBool = AtomicBool::new(true);

    fn flaky_loader() -> Result<Codec, EncodeError> {
        if FAIL_NEXT.swap(false, Ordering::SeqCst) {
            Err(EncodeError::CodecLoad("backend missing".into()))
        } else {
            Codec::load()
        }
    }

    #[test]
    fn failed_load_is_retried() {
        static SLOT: CodecSlot = CodecSlot::new(flaky_loader);
        assert_eq!(SLOT.status(), CodecStatus::NotLoaded);
        assert!(matches!(SLOT.get(), Err(EncodeError::CodecLoad(_))));
        assert!(matches!(SLOT.status(), CodecStatus::Failed(msg) if msg.contains("backend missing")));
        SLOT.get().unwrap();
        assert_eq!(SLOT.status(), CodecStatus::Loaded);
        assert_eq!(SLOT.load_attempts(), 2);
    }

    #[test]
    fn transparent_frames_reserve_slot_zero() {
        let codec = Codec::load().unwrap();
        let mut rgba = Vec::new();
        for i in 0..16u8 {
            let alpha = if i < 4 { 0 } else { 255 };
            rgba.extend_from_slice(&[i * 15, 255 - i * 15, 90, alpha]);
        }
        let frame = codec.encode_frame(&rgba, 4, 4, 50, true, true).unwrap();
        assert!(frame.palette().has_transparent_slot());
        assert!(frame.palette().len() <= MAX_PALETTE_COLORS);
        assert!(frame.indices()[..4].iter().all(|&i| i == 0));
        assert!(frame.indices()[4..].iter().all(|&i| i != 0));
    }

    #[test]
    fn opaque_frames_use_full_palette() {
        let codec = Codec::load().unwrap();
        let rgba: Vec<u8> = (0..64u32)
            .flat_map(|i| [(i * 4) as u8, (i * 3) as u8, (i * 2) as u8, 255])
            .collect();
        let frame = codec.encode_frame(&rgba, 8, 8, 100, false, false).unwrap();
        assert!(!frame.palette().has_transparent_slot());
        assert!(!frame.is_transparent());
        assert!(!frame.loops_forever());
    }
}
