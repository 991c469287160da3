//! Glyph-code and codepoint sentinels shared by every module.

/// A 16-bit internal glyph identifier. Not equal to a Unicode codepoint.
pub type GlyphCode = u16;

/// Reserved glyph code standing in for a run of whitespace.
pub const SPACE_CODE: GlyphCode = 0x7FFE;

/// Reserved glyph code meaning "no glyph here", used as the walker's
/// lookahead end-of-line marker.
pub const NO_GLYPH_CODE: GlyphCode = 0x7FFF;

/// Reserved glyph code for a zero-advance, zero-bitmap placeholder
/// (U+FEFF translates here).
pub const ZERO_WIDTH_CODE: GlyphCode = 0x7FFD;

/// Upper bound on `FaceHeader::glyph_count`. A face at or above this count
/// is rejected at load time so that real glyph codes can never collide with
/// the sentinels above.
pub const UTF32_MAX_GLYPH_COUNT: u16 = ZERO_WIDTH_CODE;

/// Sentinel codepoint substituted by the UTF-8 cursor for any malformed
/// byte sequence it resynchronizes past.
pub const UNKNOWN_CODEPOINT: u32 = 0xE05E;

/// U+FEFF, translated to [`ZERO_WIDTH_CODE`].
pub const ZERO_WIDTH_CODEPOINT: u32 = 0xFEFF;
