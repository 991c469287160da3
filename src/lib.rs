//! IBMF embedded font rasterizer.
//!
//! Parses the IBMF binary face format, expands its PK-style run-length
//! packed glyphs, walks a UTF-8 line through a font's ligature/kerning
//! program, and composites the resulting glyphs onto a 1-bpp or 8-bpp
//! canvas along a single baseline.
//!
//! The [`facade`] module ties a loaded [`FontData`] and a face index
//! together into the small drawing surface most callers want
//! (`facade::IbmfFont`); [`style`] adapts the same thing to
//! `embedded-graphics`'s `TextRenderer`.
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(unsafe_code)]

extern crate alloc;

mod codes;
mod compositor;
mod draw_target;
mod error;
mod face;
mod fixed;
mod font_data;
mod rle;
mod style;
mod utf8;
mod utils;
mod walker;

pub mod facade;

pub use codes::{GlyphCode, NO_GLYPH_CODE, SPACE_CODE, UNKNOWN_CODEPOINT, ZERO_WIDTH_CODE};
pub use compositor::{Canvas1Bpp, Canvas8Bpp};
pub use error::Error;
pub use face::{Face, FaceHeader, GlyphMetrics, PixelResolution};
pub use facade::IbmfFont;
pub use fixed::Fix16;
pub use font_data::{FontData, FontFormat};
pub use rle::GlyphBitmap;
pub use style::{IbmfTextStyle, IbmfTextStyleBuilder};
pub use utf8::Utf8Cursor;
pub use walker::{GlyphSource, LigKernWalker};
