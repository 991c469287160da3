//! Error taxonomy. Hand-rolled rather than `thiserror`, matching the
//! `no_std`-first tone of the rest of this crate family.

use core::fmt;

/// Everything that can go wrong loading a face or decoding a glyph.
///
/// Per the propagation policy: a [`Error::Parse`] during `FontData`
/// construction leaves the font uninitialized rather than panicking.
/// Decode and allocation errors abort the single glyph and are logged
/// via the `log` crate; they never escape a line-drawing call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The face blob is malformed: wrong length, bad magic, an
    /// out-of-bounds table, or a glyph count at or past
    /// [`crate::codes::UTF32_MAX_GLYPH_COUNT`].
    Parse {
        reason: ParseFailure,
        offset: usize,
    },
    /// A single glyph failed to decode: RLE packet underrun, a row that
    /// overran the declared width, or a repeat count left dangling past
    /// the last row.
    RuntimeDecode {
        reason: DecodeFailure,
        glyph_code: u16,
    },
    /// Could not allocate a scratch buffer for a decoded glyph bitmap.
    Allocation { requested_bytes: usize },
    /// A glyph code fell outside `0..glyphCount` during a metrics or
    /// bitmap lookup.
    LookupMiss { glyph_code: u16, glyph_count: u16 },
    /// Asked to select an 8bpp font resolution against a 1bpp display,
    /// or vice versa in a way the caller's canvas cannot honor.
    ConfigError { reason: &'static str },
}

/// Why a face blob failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseFailure {
    /// The blob ended before every declared table was consumed.
    UnexpectedEnd,
    /// The cursor didn't land exactly on the blob's end after the last
    /// table (§3 invariant: header, pool index, glyph info, pixel pool,
    /// ligKern array must be gaplessly contiguous).
    TrailingOrMissingBytes { expected_end: usize, actual_end: usize },
    /// `glyphCount` met or exceeded `UTF32_MAX_GLYPH_COUNT`.
    GlyphCountTooLarge { glyph_count: u16 },
    /// The preamble's magic tag or format code was not recognized.
    BadPreamble,
}

/// Why a single glyph failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeFailure {
    /// Ran out of packet bytes mid-run.
    PacketUnderrun,
    /// A decoded row produced more or fewer pixels than `bitmapWidth`.
    RowOverrun,
    /// `repeatCount` was still nonzero after the last row was emitted.
    ResidualRepeatCount,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse { reason, offset } => {
                write!(f, "parse error at byte {offset}: {reason:?}")
            }
            Error::RuntimeDecode { reason, glyph_code } => {
                write!(f, "decode error for glyph {glyph_code}: {reason:?}")
            }
            Error::Allocation { requested_bytes } => {
                write!(f, "failed to allocate {requested_bytes} bytes for a glyph bitmap")
            }
            Error::LookupMiss { glyph_code, glyph_count } => {
                write!(f, "glyph code {glyph_code} is out of range (face has {glyph_count} glyphs)")
            }
            Error::ConfigError { reason } => write!(f, "configuration rejected: {reason}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
