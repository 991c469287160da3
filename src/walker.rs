//! The ligature/kerning shaping state machine: consumes a UTF-8 line and
//! emits `(glyphCode, kern, firstWordChar, lastWordChar)` tuples.

use crate::codes::{GlyphCode, NO_GLYPH_CODE, SPACE_CODE};
use crate::face::{Face, LigKernOutcome};
use crate::fixed::Fix16;
use crate::font_data::FontData;
use crate::utf8::Utf8Cursor;

/// The capability set the walker needs from a face, so it can in
/// principle run over any glyph source (an IBMF `Face`, or a future
/// scalable-font adapter) rather than being hardwired to one.
pub trait GlyphSource {
    fn translate(&self, codepoint: u32) -> GlyphCode;
    fn lig_kern(&self, code1: GlyphCode, code2: &mut GlyphCode, kern: &mut Fix16) -> bool;
}

/// Adapts a borrowed [`Face`] (plus the [`FontData`] it came from, for
/// codepoint translation) to the [`GlyphSource`] capability set, so the
/// walker stays polymorphic over any future glyph source rather than
/// being hardwired to IBMF faces. Shared by the facade and the
/// embedded-graphics text style.
#[derive(Clone, Copy)]
pub(crate) struct FaceGlyphSource<'a> {
    pub(crate) font_data: &'a FontData,
    pub(crate) face: Face<'a>,
}

impl<'a> GlyphSource for FaceGlyphSource<'a> {
    fn translate(&self, codepoint: u32) -> GlyphCode {
        self.font_data.translate(codepoint)
    }

    fn lig_kern(&self, code1: GlyphCode, code2: &mut GlyphCode, kern: &mut Fix16) -> bool {
        self.face.lig_kern(code1, code2, kern) == LigKernOutcome::Ligature
    }
}

/// One shaped glyph in a line: its code, the kern to apply before it, and
/// whether it starts/ends a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapedGlyph {
    pub glyph_code: GlyphCode,
    pub kern: Fix16,
    pub first_word_char: bool,
    pub last_word_char: bool,
}

/// Walks a UTF-8 line against a [`GlyphSource`], yielding [`ShapedGlyph`]s
/// lazily. Pure and deterministic with respect to the face's tables
/// (§4.6); the drawing and sizing paths each construct their own walker
/// over the same line rather than sharing mutable state.
pub struct LigKernWalker<'a, S: GlyphSource> {
    source: &'a S,
    codepoints: Utf8Cursor<'a>,
    g1: GlyphCode,
    g2: GlyphCode,
    first_word_char: bool,
    was_end_of_word: bool,
    done: bool,
}

impl<'a, S: GlyphSource> LigKernWalker<'a, S> {
    pub fn new(source: &'a S, line: &'a [u8]) -> Self {
        let mut codepoints = Utf8Cursor::new(line);
        let g1 = codepoints
            .next()
            .map(|cp| source.translate(cp))
            .unwrap_or(NO_GLYPH_CODE);
        let g2 = codepoints
            .next()
            .map(|cp| source.translate(cp))
            .unwrap_or(NO_GLYPH_CODE);
        LigKernWalker {
            source,
            codepoints,
            g1,
            g2,
            first_word_char: true,
            was_end_of_word: false,
            done: false,
        }
    }

    fn next_translated(&mut self) -> GlyphCode {
        self.codepoints
            .next()
            .map(|cp| self.source.translate(cp))
            .unwrap_or(NO_GLYPH_CODE)
    }
}

impl<'a, S: GlyphSource> Iterator for LigKernWalker<'a, S> {
    type Item = ShapedGlyph;

    fn next(&mut self) -> Option<ShapedGlyph> {
        if self.done || self.g1 == NO_GLYPH_CODE {
            self.done = true;
            return None;
        }

        if self.was_end_of_word && self.g1 != SPACE_CODE {
            self.first_word_char = true;
            self.was_end_of_word = false;
        }

        let mut kern = Fix16::ZERO;

        // Ligature loop on (g1, g2): keep firing while a ligature replaces
        // g1, pulling in a fresh g2 each time.
        while self.g2 != NO_GLYPH_CODE {
            let mut replaced = self.g2;
            if self.source.lig_kern(self.g1, &mut replaced, &mut kern) {
                self.g1 = replaced;
                self.g2 = self.next_translated();
            } else {
                break;
            }
        }

        // Look-ahead ligature on (g2, g3): peek the next codepoint without
        // consuming unless a ligature actually fires.
        let mut relig_needed = false;
        loop {
            if self.g2 == NO_GLYPH_CODE {
                break;
            }
            let mut peek_codepoints = self.codepoints;
            let g3 = peek_codepoints
                .next()
                .map(|cp| self.source.translate(cp))
                .unwrap_or(NO_GLYPH_CODE);
            if g3 == NO_GLYPH_CODE {
                break;
            }
            let mut replaced = g3;
            let mut discard_kern = Fix16::ZERO;
            if self.source.lig_kern(self.g2, &mut replaced, &mut discard_kern) {
                self.g2 = replaced;
                // Actually consume the codepoint we peeked.
                self.codepoints.next();
                relig_needed = true;
            } else {
                break;
            }
        }
        if relig_needed {
            let mut new_g2 = self.g2;
            self.source.lig_kern(self.g1, &mut new_g2, &mut kern);
            self.g2 = new_g2;
        }

        let last_word_char = self.g2 == SPACE_CODE || self.g2 == NO_GLYPH_CODE;

        let emitted = ShapedGlyph {
            glyph_code: self.g1,
            kern,
            first_word_char: self.first_word_char,
            last_word_char,
        };

        self.first_word_char = false;
        if last_word_char {
            self.was_end_of_word = true;
        }

        self.g1 = self.g2;
        self.g2 = self.next_translated();

        Some(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    /// A tiny glyph source with one ligature ('f'+'i' -> 0x100) and one
    /// kern (glyph 'A' before glyph 'V' is -5).
    struct TestSource;

    impl TestSource {
        const F: GlyphCode = 0x46;
        const I: GlyphCode = 0x49;
        const FI_LIGATURE: GlyphCode = 0x100;
        const A: GlyphCode = 0x41;
        const V: GlyphCode = 0x56;
    }

    impl GlyphSource for TestSource {
        fn translate(&self, codepoint: u32) -> GlyphCode {
            if codepoint == 0x0020 {
                return SPACE_CODE;
            }
            codepoint as GlyphCode
        }

        fn lig_kern(&self, code1: GlyphCode, code2: &mut GlyphCode, kern: &mut Fix16) -> bool {
            *kern = Fix16::ZERO;
            if code1 == Self::F && *code2 == Self::I {
                *code2 = Self::FI_LIGATURE;
                return true;
            }
            if code1 == Self::A && *code2 == Self::V {
                *kern = Fix16::from_raw(-5);
                return false;
            }
            false
        }
    }

    fn collect(line: &[u8]) -> Vec<ShapedGlyph> {
        let src = TestSource;
        LigKernWalker::new(&src, line).collect()
    }

    #[test]
    fn simple_line_without_ligatures_or_kerns() {
        let out = collect(b"AB");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].glyph_code, 0x41);
        assert_eq!(out[1].glyph_code, 0x42);
        assert!(out[0].first_word_char);
        assert!(!out[1].first_word_char);
        assert!(out[1].last_word_char);
    }

    #[test]
    fn ligature_collapses_f_i_into_one_glyph() {
        let out = collect(b"fi");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].glyph_code, TestSource::FI_LIGATURE);
    }

    #[test]
    fn kern_reported_between_a_and_v() {
        let out = collect(b"AV");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].kern, Fix16::from_raw(-5));
        assert_eq!(out[1].kern, Fix16::ZERO);
    }

    #[test]
    fn word_boundaries_track_spaces() {
        let out = collect(b"A B");
        // 'A', ' ', 'B'
        assert_eq!(out.len(), 3);
        assert!(out[0].first_word_char);
        assert!(out[0].last_word_char); // followed by space
        assert!(out[1].first_word_char); // the space itself starts nothing new but flag follows algorithm
        assert!(out[2].first_word_char);
    }

    #[test]
    fn empty_line_yields_nothing() {
        assert_eq!(collect(b"").len(), 0);
    }
}
