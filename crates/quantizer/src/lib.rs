//! CPU half of the liquidglass export pipeline.
//!
//! Raw RGBA frames captured from the renderer flow through this crate in a
//! fixed order:
//!
//! ```text
//!   readback ─▶ normalize_rows ─▶ dither_ordered ─▶ quantize ─▶ apply_palette
//!                                                                  │
//!                         AnimationEncoder::append ◀─ assemble_frame ◀─ mask_transparent
//! ```
//!
//! Every stage is deterministic: the same input bytes always produce the same
//! palette, the same indices, and therefore the same GIF stream. Palettes are
//! rebuilt for every frame; nothing is carried over between frames.
//!
//! [`Codec`] bundles the stages behind the lazily loaded, process-wide
//! [`shared_codec`] handle used by the export renderer.

mod codec;
mod dither;
mod encoder;
mod error;
mod flip;
mod frame;
mod palette;
mod quantize;

pub use codec::{shared_codec, shared_slot, Codec, CodecSlot, CodecStatus, EXPORT_DITHER_STRENGTH};
pub use dither::{bayer_threshold, dither_ordered, BAYER_4X4};
pub use encoder::AnimationEncoder;
pub use error::EncodeError;
pub use flip::{flip_vertical, normalize_rows, RowOrder};
pub use frame::{assemble_frame, mask_transparent, FrameRecord, ALPHA_CUTOFF, TRANSPARENT_INDEX};
pub use palette::{apply_palette, Palette};
pub use quantize::{quantize, BucketFormat, QuantizeOptions, MAX_PALETTE_COLORS};
