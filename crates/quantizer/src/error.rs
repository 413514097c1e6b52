/// Failures raised while preparing or encoding paletted frames.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("pixel buffer holds {actual} bytes, expected {expected} for a {width}x{height} RGBA frame")]
    BufferSize {
        expected: usize,
        actual: usize,
        width: u32,
        height: u32,
    },
    #[error("index buffer holds {actual} entries, expected {expected}")]
    IndexCount { expected: usize, actual: usize },
    #[error("palette must hold between 1 and 256 colours, got {0}")]
    PaletteSize(usize),
    #[error("palette index {index} at pixel {pixel} is outside a {len}-entry palette")]
    IndexOutOfRange { index: u8, pixel: usize, len: usize },
    #[error("frame dimensions {width}x{height} are outside the 1..=65535 GIF range")]
    Dimensions { width: u32, height: u32 },
    #[error("frame is {actual:?} but the animation canvas is {expected:?}")]
    FrameSize {
        expected: (u16, u16),
        actual: (u16, u16),
    },
    #[error("loop directive may only accompany the first frame")]
    LateLoopDirective,
    #[error("gif backend rejected the frame: {0}")]
    Gif(#[from] gif::EncodingError),
    #[error("failed to flush animation stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec failed to load: {0}")]
    CodecLoad(String),
}

/// Verifies that `rgba` is exactly `width * height` RGBA pixels.
pub(crate) fn check_rgba_len(rgba: &[u8], width: u32, height: u32) -> Result<(), EncodeError> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or(EncodeError::Dimensions { width, height })?;
    if rgba.len() != expected {
        return Err(EncodeError::BufferSize {
            expected,
            actual: rgba.len(),
            width,
            height,
        });
    }
    Ok(())
}
