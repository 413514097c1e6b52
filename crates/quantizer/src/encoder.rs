use gif::{DisposalMethod, Encoder, Frame, Repeat};
use tracing::debug;

use crate::error::EncodeError;
use crate::frame::{FrameRecord, TRANSPARENT_INDEX};

/// Streams [`FrameRecord`]s into an in-memory GIF89a animation.
///
/// Every frame carries its own local colour table; the global table stays
/// empty.
pub struct AnimationEncoder {
    inner: Encoder<Vec<u8>>,
    width: u16,
    height: u16,
    frames: usize,
}

impl AnimationEncoder {
    pub fn new(width: u16, height: u16) -> Result<Self, EncodeError> {
        if width == 0 || height == 0 {
            return Err(EncodeError::Dimensions {
                width: u32::from(width),
                height: u32::from(height),
            });
        }
        let inner = Encoder::new(Vec::new(), width, height, &[])?;
        Ok(Self {
            inner,
            width,
            height,
            frames: 0,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    pub fn append(&mut self, record: &FrameRecord) -> Result<(), EncodeError> {
        if (record.width(), record.height()) != (self.width, self.height) {
            return Err(EncodeError::FrameSize {
                expected: (self.width, self.height),
                actual: (record.width(), record.height()),
            });
        }
        if record.loops_forever() {
            // The application extension must precede the first image block.
            if self.frames > 0 {
                return Err(EncodeError::LateLoopDirective);
            }
            self.inner.set_repeat(Repeat::Infinite)?;
        }

        let transparent = record.is_transparent().then_some(TRANSPARENT_INDEX);
        let mut frame = Frame::from_palette_pixels(
            self.width,
            self.height,
            record.indices(),
            record.palette().to_rgb_bytes(),
            transparent,
        );
        frame.delay = record.delay_centiseconds();
        frame.dispose = if record.is_transparent() {
            DisposalMethod::Background
        } else {
            DisposalMethod::Any
        };
        self.inner.write_frame(&frame)?;
        self.frames += 1;
        debug!(
            frame = self.frames,
            colors = record.palette().len(),
            delay_cs = frame.delay,
            "appended GIF frame"
        );
        Ok(())
    }

    /// Writes the trailer and hands back the finished file.
    pub fn finish(self) -> Result<Vec<u8>, EncodeError> {
        let frames = self.frames;
        let bytes = self.inner.into_inner()?;
        debug!(frames, bytes = bytes.len(), "finished GIF stream");
        Ok(bytes)
    }
}
