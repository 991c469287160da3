//! The small surface most callers actually want: a `FontData` plus a face
//! index, with `drawSingleLineOfText`/`getTextSize`/`getTextWidth`/
//! `getTextHeight`/`lineHeight` (§6.3).

use crate::codes::{GlyphCode, SPACE_CODE};
use crate::compositor::{Canvas1Bpp, Canvas8Bpp};
use crate::error::Error;
use crate::face::{Face, GlyphMetrics, PixelResolution};
use crate::fixed::Fix16;
use crate::font_data::FontData;
use crate::walker::{FaceGlyphSource, LigKernWalker, ShapedGlyph};

/// The accumulated width/ascent/descent of a line, as returned by
/// [`IbmfFont::text_size`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextSize {
    pub width: i32,
    pub height: i32,
}

/// Ties a loaded [`FontData`] and a face index together into the
/// drawing/sizing surface described by §6.3.
pub struct IbmfFont<'a> {
    font_data: &'a FontData,
    face_index: usize,
}

impl<'a> IbmfFont<'a> {
    pub fn new(font_data: &'a FontData, face_index: usize) -> Self {
        IbmfFont {
            font_data,
            face_index,
        }
    }

    fn face(&self) -> Option<Face<'a>> {
        if !self.font_data.is_initialized() {
            return None;
        }
        self.font_data.face(self.face_index)
    }

    fn glyph_source(&self, face: Face<'a>) -> FaceGlyphSource<'a> {
        FaceGlyphSource {
            font_data: self.font_data,
            face,
        }
    }

    /// `lineHeight() -> int` (§6.3).
    pub fn line_height(&self) -> i32 {
        self.face().map(|f| f.line_height()).unwrap_or(0)
    }

    /// `getFacePtSize() -> int` (§6.3).
    pub fn face_pt_size(&self) -> u8 {
        self.face().map(|f| f.pt_size()).unwrap_or(0)
    }

    /// `setDisplayPixelResolution(res) -> bool` (§6.3), re-expressed with
    /// a `Result` per this crate's error-handling conventions. The face's
    /// chosen resolution is validated against the canvas actually passed
    /// to a draw call, not here.
    pub fn set_display_pixel_resolution(&self, res: PixelResolution) -> Result<(), Error> {
        match self.face() {
            Some(face) => {
                face.set_display_pixel_resolution(res);
                Ok(())
            }
            None => Err(Error::ConfigError {
                reason: "font is uninitialized",
            }),
        }
    }

    fn pen_advance(
        &self,
        face: &Face<'a>,
        glyph_code: GlyphCode,
        kern: Fix16,
        last_word_char: bool,
    ) -> i32 {
        if glyph_code == SPACE_CODE {
            let metrics = face.glyph_metrics(glyph_code).unwrap_or_default();
            metrics.advance.floor_pixels()
        } else if last_word_char {
            let width = face.glyph_width(glyph_code) as i32;
            let xoff = face.glyph_h_offset(glyph_code) as i32;
            width - kern.trunc_div64() - xoff
        } else {
            let metrics = face.glyph_metrics(glyph_code).unwrap_or_default();
            (metrics.advance + kern).floor_pixels()
        }
    }

    /// `drawSingleLineOfText(canvas, pos, line, inverted) -> int` for a
    /// 1bpp canvas; returns the pen x after the last glyph.
    pub fn draw_single_line_of_text_1bpp(
        &self,
        canvas: &mut Canvas1Bpp,
        pos: (i32, i32),
        line: &str,
        inverted: bool,
    ) -> Result<i32, Error> {
        let Some(face) = self.face() else {
            return Ok(pos.0);
        };
        if face.display_resolution() != PixelResolution::OneBit {
            return Err(Error::ConfigError {
                reason: "face is configured for 8bpp but a 1bpp canvas was supplied",
            });
        }
        let source = self.glyph_source(face);
        let mut pen_x = pos.0;
        let pen_y = pos.1;
        for ShapedGlyph {
            glyph_code,
            kern,
            first_word_char,
            last_word_char,
        } in LigKernWalker::new(&source, line.as_bytes())
        {
            if first_word_char {
                pen_x += face.glyph_h_offset(glyph_code) as i32;
            }
            let _ = face.draw_glyph_1bpp(canvas, glyph_code, pen_x, pen_y, inverted);
            pen_x += self.pen_advance(&face, glyph_code, kern, last_word_char);
        }
        Ok(pen_x)
    }

    /// As [`IbmfFont::draw_single_line_of_text_1bpp`] but for an 8bpp
    /// canvas.
    pub fn draw_single_line_of_text_8bpp(
        &self,
        canvas: &mut Canvas8Bpp,
        pos: (i32, i32),
        line: &str,
        inverted: bool,
    ) -> Result<i32, Error> {
        let Some(face) = self.face() else {
            return Ok(pos.0);
        };
        if face.display_resolution() != PixelResolution::EightBit {
            return Err(Error::ConfigError {
                reason: "face is configured for 1bpp but an 8bpp canvas was supplied",
            });
        }
        let source = self.glyph_source(face);
        let mut pen_x = pos.0;
        let pen_y = pos.1;
        for ShapedGlyph {
            glyph_code,
            kern,
            first_word_char,
            last_word_char,
        } in LigKernWalker::new(&source, line.as_bytes())
        {
            if first_word_char {
                pen_x += face.glyph_h_offset(glyph_code) as i32;
            }
            let _ = face.draw_glyph_8bpp(canvas, glyph_code, pen_x, pen_y, inverted);
            pen_x += self.pen_advance(&face, glyph_code, kern, last_word_char);
        }
        Ok(pen_x)
    }

    /// `getTextSize(line) -> (width, height)` (§6.3). Runs the same
    /// walker and pen arithmetic as the drawing path, collecting only
    /// metrics.
    pub fn text_size(&self, line: &str) -> TextSize {
        let Some(face) = self.face() else {
            return TextSize::default();
        };
        let source = self.glyph_source(face);
        let mut pen_x = 0i32;
        let mut up = 0i32;
        let mut down = 0i32;
        for ShapedGlyph {
            glyph_code,
            kern,
            first_word_char,
            last_word_char,
        } in LigKernWalker::new(&source, line.as_bytes())
        {
            if first_word_char {
                pen_x += face.glyph_h_offset(glyph_code) as i32;
            }
            let GlyphMetrics { yoff, descent, .. } =
                face.glyph_metrics(glyph_code).unwrap_or_default();
            up = up.max(yoff);
            down = down.max(descent);
            pen_x += self.pen_advance(&face, glyph_code, kern, last_word_char);
        }
        TextSize {
            width: pen_x,
            height: up + down,
        }
    }

    /// `getTextWidth(line) -> int` (§6.3).
    pub fn text_width(&self, line: &str) -> i32 {
        self.text_size(line).width
    }

    /// `getTextHeight(line) -> int` (§6.3).
    pub fn text_height(&self, line: &str) -> i32 {
        self.text_size(line).height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::NO_LIG_KERN_PGM;
    use alloc::vec::Vec;

    fn push_u8(v: &mut Vec<u8>, x: u8) {
        v.push(x);
    }
    fn push_u16(v: &mut Vec<u8>, x: u16) {
        v.extend_from_slice(&x.to_le_bytes());
    }
    fn push_u32(v: &mut Vec<u8>, x: u32) {
        v.extend_from_slice(&x.to_le_bytes());
    }
    fn push_i16(v: &mut Vec<u8>, x: i16) {
        v.extend_from_slice(&x.to_le_bytes());
    }
    fn push_i8(v: &mut Vec<u8>, x: i8) {
        v.push(x as u8);
    }

    /// A one-face font with a single glyph ('A', width 1, advance 1px)
    /// and a space size of 3px, enough to exercise the space-advance
    /// additivity property end to end.
    fn font_with_space(space_size: u8) -> Vec<u8> {
        let mut face = Vec::new();
        push_u16(&mut face, 100);
        push_u8(&mut face, 12);
        push_u8(&mut face, 16);
        push_u16(&mut face, 0);
        push_u16(&mut face, 0);
        push_u8(&mut face, space_size);
        push_u16(&mut face, 1); // glyphCount
        push_u16(&mut face, 0); // ligKernStepCount
        push_u32(&mut face, 1); // pixelsPoolSize
        push_i16(&mut face, 0);
        push_u8(&mut face, 3);
        push_u32(&mut face, 0); // pool index
        push_u8(&mut face, 1); // width
        push_u8(&mut face, 1); // height
        push_i8(&mut face, 0);
        push_i8(&mut face, 0);
        push_u16(&mut face, 1); // packetLength
        push_i16(&mut face, 64); // advance = 1px
        push_u8(&mut face, 0x1F);
        push_u16(&mut face, NO_LIG_KERN_PGM);
        push_u16(&mut face, 0);
        push_u8(&mut face, 0x10);

        let mut blob = Vec::new();
        push_u32(&mut blob, 0x464D_4249);
        push_u8(&mut blob, 1);
        push_u8(&mut blob, 1);
        let face_offset_pos = blob.len();
        push_u32(&mut blob, 0);
        let plane_offset_pos = blob.len();
        push_u32(&mut blob, 0);

        let face_start = blob.len() as u32;
        blob.extend_from_slice(&face);
        let plane_start = blob.len() as u32;
        blob[face_offset_pos..face_offset_pos + 4].copy_from_slice(&face_start.to_le_bytes());
        blob[plane_offset_pos..plane_offset_pos + 4].copy_from_slice(&plane_start.to_le_bytes());

        push_u16(&mut blob, 1); // planeCount
        push_u8(&mut blob, 0);
        push_u16(&mut blob, 0);
        push_u16(&mut blob, 1);
        push_u16(&mut blob, 1); // bundleCount
        push_u8(&mut blob, 0x41);
        push_u8(&mut blob, 1);
        push_u16(&mut blob, 0);

        blob
    }

    #[test]
    fn space_advance_additivity() {
        let blob = font_with_space(3);
        let data = FontData::load(blob).unwrap();
        let font = IbmfFont::new(&data, 0);
        assert_eq!(font.text_width("   "), 9);
        assert_eq!(font.text_width("     "), 15);
    }

    #[test]
    fn text_size_width_matches_text_width() {
        let blob = font_with_space(3);
        let data = FontData::load(blob).unwrap();
        let font = IbmfFont::new(&data, 0);
        assert_eq!(font.text_size("  ").width, font.text_width("  "));
    }

    #[test]
    fn uninitialized_font_yields_empty_bbox() {
        let mut blob = font_with_space(3);
        blob.truncate(2);
        let data = FontData::load(blob).unwrap();
        let font = IbmfFont::new(&data, 0);
        assert_eq!(font.text_size("anything"), TextSize::default());
        assert_eq!(font.line_height(), 0);
    }
}
