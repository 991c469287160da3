//! One point-size of a font: the parsed face header, glyph directory,
//! pixel pool, and ligature/kerning program, plus the operations that read
//! them.
//!
//! `Face` never owns the blob it reads from — `FontData` owns the bytes,
//! and `Face<'a>` is a transient view constructed on demand
//! (`FontData::face`), borrowing both the blob and the eagerly-parsed
//! [`FaceLayout`] it describes. This sidesteps a self-referential struct
//! without unsafe code.

use core::cell::Cell;

use alloc::vec::Vec;
use log::warn;

use crate::codes::{GlyphCode, SPACE_CODE, UTF32_MAX_GLYPH_COUNT};
use crate::compositor::{blit_glyph, blit_glyph_8bpp, Canvas1Bpp, Canvas8Bpp};
use crate::error::{Error, ParseFailure};
use crate::fixed::Fix16;
use crate::rle::{self, GlyphBitmap};
use crate::utils::ByteCursor;

/// Which bit depth a display (and therefore a face's rendering) targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelResolution {
    OneBit,
    EightBit,
}

/// Sentinel meaning "this glyph has no ligature/kerning program".
pub const NO_LIG_KERN_PGM: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy)]
pub struct FaceHeader {
    pub dpi: u16,
    pub point_size: u8,
    pub line_height: u8,
    pub x_height: Fix16,
    pub em_height: Fix16,
    pub space_size: u8,
    pub glyph_count: u16,
    pub lig_kern_step_count: u16,
    pub pixels_pool_size: u32,
    pub slant_correction: Fix16,
    pub descender_height: u8,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RleMetrics {
    pub dyn_f: u8,
    pub first_is_black: bool,
    pub before_added_opt_kern: u8,
    pub after_added_opt_kern: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct GlyphInfo {
    pub bitmap_width: u8,
    pub bitmap_height: u8,
    pub horizontal_offset: i8,
    pub vertical_offset: i8,
    pub packet_length: u16,
    pub advance: Fix16,
    pub rle_metrics: RleMetrics,
    pub lig_kern_pgm_index: u16,
    pub main_code: u16,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum LigKernPayload {
    Kern(Fix16),
    Replace(GlyphCode),
    Goto(u16),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LigKernStep {
    pub next_glyph_code: u16,
    pub stop: bool,
    pub payload: LigKernPayload,
}

/// Metrics for a single glyph, without its bitmap.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlyphMetrics {
    pub xoff: i32,
    pub yoff: i32,
    pub descent: i32,
    pub advance: Fix16,
    pub line_height: i32,
}

/// Outcome of [`Face::lig_kern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LigKernOutcome {
    NoLigature,
    Ligature,
}

/// Owned, eagerly-parsed contents of one face. Lives inside `FontData`;
/// never handed out directly, only through a borrowing [`Face`] view.
pub(crate) struct FaceLayout {
    pub header: FaceHeader,
    pub pool_index: Vec<u32>,
    pub glyph_info: Vec<GlyphInfo>,
    pub pixel_pool_range: core::ops::Range<usize>,
    pub lig_kern_pgm: Vec<LigKernStep>,
    pub resolution: Cell<PixelResolution>,
}

impl FaceLayout {
    /// Parses one face out of `buf`, which must start exactly at the
    /// face's first header byte. Returns the layout plus the number of
    /// bytes consumed so the caller (FontData) can locate the next face.
    pub(crate) fn parse(buf: &[u8]) -> Result<(Self, usize), Error> {
        let mut c = ByteCursor::new(buf);

        let dpi = c.u16()?;
        let point_size = c.u8()?;
        let line_height = c.u8()?;
        let x_height = Fix16::from_raw(c.u16()? as i16);
        let em_height = Fix16::from_raw(c.u16()? as i16);
        let space_size = c.u8()?;
        let glyph_count = c.u16()?;
        let lig_kern_step_count = c.u16()?;
        let pixels_pool_size = c.u32()?;
        let slant_correction = Fix16::from_raw(c.i16()?);
        let descender_height = c.u8()?;

        if glyph_count >= UTF32_MAX_GLYPH_COUNT {
            return Err(Error::Parse {
                reason: ParseFailure::GlyphCountTooLarge { glyph_count },
                offset: c.position(),
            });
        }

        let header = FaceHeader {
            dpi,
            point_size,
            line_height,
            x_height,
            em_height,
            space_size,
            glyph_count,
            lig_kern_step_count,
            pixels_pool_size,
            slant_correction,
            descender_height,
        };

        let mut pool_index = Vec::with_capacity(glyph_count as usize);
        for _ in 0..glyph_count {
            pool_index.push(c.u32()?);
        }

        let mut glyph_info = Vec::with_capacity(glyph_count as usize);
        for _ in 0..glyph_count {
            let bitmap_width = c.u8()?;
            let bitmap_height = c.u8()?;
            let horizontal_offset = c.i8()?;
            let vertical_offset = c.i8()?;
            let packet_length = c.u16()?;
            let advance = Fix16::from_raw(c.i16()?);
            let rle_byte = c.u8()?;
            let rle_metrics = RleMetrics {
                dyn_f: rle_byte & 0x0F,
                first_is_black: (rle_byte >> 4) & 0x01 != 0,
                before_added_opt_kern: (rle_byte >> 5) & 0x03,
                after_added_opt_kern: (rle_byte >> 7) & 0x01 != 0,
            };
            let lig_kern_pgm_index = c.u16()?;
            let main_code = c.u16()?;
            glyph_info.push(GlyphInfo {
                bitmap_width,
                bitmap_height,
                horizontal_offset,
                vertical_offset,
                packet_length,
                advance,
                rle_metrics,
                lig_kern_pgm_index,
                main_code,
            });
        }

        let pixel_pool_start = c.position();
        c.bytes(pixels_pool_size as usize)?;
        let pixel_pool_range = pixel_pool_start..(pixel_pool_start + pixels_pool_size as usize);

        let mut lig_kern_pgm = Vec::with_capacity(lig_kern_step_count as usize);
        for _ in 0..lig_kern_step_count {
            let a = c.u16()?;
            let b = c.u16()?;
            let next_glyph_code = a & 0x7FFF;
            let stop = (a >> 15) & 0x1 != 0;
            let is_a_kern = (b >> 15) & 0x1 != 0;
            let is_a_goto = (b >> 14) & 0x1 != 0;
            let payload = if is_a_kern && is_a_goto {
                LigKernPayload::Goto(b & 0x3FFF)
            } else if is_a_kern {
                LigKernPayload::Kern(Fix16::from_raw((b & 0x7FFF) as i16))
            } else {
                LigKernPayload::Replace(b & 0x7FFF)
            };
            lig_kern_pgm.push(LigKernStep {
                next_glyph_code,
                stop,
                payload,
            });
        }

        if !c.is_at_end() {
            return Err(Error::Parse {
                reason: ParseFailure::TrailingOrMissingBytes {
                    expected_end: buf.len(),
                    actual_end: c.position(),
                },
                offset: c.position(),
            });
        }

        Ok((
            FaceLayout {
                header,
                pool_index,
                glyph_info,
                pixel_pool_range,
                lig_kern_pgm,
                resolution: Cell::new(PixelResolution::OneBit),
            },
            c.position(),
        ))
    }
}

/// A borrowing view over one face's parsed tables, handed out by
/// `FontData::face`. Cheap to construct; never stored back inside
/// `FontData`.
#[derive(Clone, Copy)]
pub struct Face<'a> {
    pub(crate) layout: &'a FaceLayout,
    pub(crate) blob: &'a [u8],
}

impl<'a> Face<'a> {
    pub(crate) fn new(layout: &'a FaceLayout, blob: &'a [u8]) -> Self {
        Face { layout, blob }
    }

    pub fn header(&self) -> &FaceHeader {
        &self.layout.header
    }

    pub fn glyph_count(&self) -> u16 {
        self.layout.header.glyph_count
    }

    pub fn line_height(&self) -> i32 {
        self.layout.header.line_height as i32
    }

    pub fn pt_size(&self) -> u8 {
        self.layout.header.point_size
    }

    pub fn em_height(&self) -> Fix16 {
        self.layout.header.em_height
    }

    pub fn descender_height(&self) -> u8 {
        self.layout.header.descender_height
    }

    pub fn display_resolution(&self) -> PixelResolution {
        self.layout.resolution.get()
    }

    /// Records which bit depth this face should render for. Does not by
    /// itself validate against a canvas — a mismatch between this setting
    /// and the canvas actually passed to a draw call is reported as
    /// [`Error::ConfigError`] by the facade at draw time.
    pub fn set_display_pixel_resolution(&self, res: PixelResolution) {
        self.layout.resolution.set(res);
    }

    fn glyph_info(&self, code: GlyphCode) -> Option<&'a GlyphInfo> {
        self.layout.glyph_info.get(code as usize)
    }

    /// `GlyphInfo.bitmapWidth`, or `spaceSize` for `SPACE_CODE`, or 0
    /// otherwise (§4.4).
    pub fn glyph_width(&self, code: GlyphCode) -> u8 {
        if code == SPACE_CODE {
            return self.layout.header.space_size;
        }
        self.glyph_info(code)
            .map(|g| g.bitmap_width)
            .unwrap_or(0)
    }

    pub fn glyph_h_offset(&self, code: GlyphCode) -> i8 {
        self.glyph_info(code).map(|g| g.horizontal_offset).unwrap_or(0)
    }

    pub fn glyph_v_offset(&self, code: GlyphCode) -> i8 {
        self.glyph_info(code).map(|g| g.vertical_offset).unwrap_or(0)
    }

    /// Metrics only, no pixel decode. For `SPACE_CODE`, advance is
    /// `spaceSize << 6`.
    pub fn glyph_metrics(&self, code: GlyphCode) -> Result<GlyphMetrics, Error> {
        if code == SPACE_CODE {
            return Ok(GlyphMetrics {
                xoff: 0,
                yoff: 0,
                descent: 0,
                advance: Fix16::from_pixels(self.layout.header.space_size as i32),
                line_height: self.layout.header.line_height as i32,
            });
        }
        let info = self.glyph_info(code).ok_or_else(|| Error::LookupMiss {
            glyph_code: code,
            glyph_count: self.layout.header.glyph_count,
        })?;
        Ok(GlyphMetrics {
            xoff: info.horizontal_offset as i32,
            yoff: info.vertical_offset as i32,
            descent: ((info.bitmap_height as i32) - (info.vertical_offset as i32)).max(0),
            advance: info.advance,
            line_height: self.layout.header.line_height as i32,
        })
    }

    /// Cheap xoff/advance-only query, distinct from the full
    /// [`Face::glyph_metrics`], for callers doing a quick width estimate.
    pub fn glyph_horizontal_metrics(&self, code: GlyphCode) -> Result<(i32, Fix16), Error> {
        if code == SPACE_CODE {
            return Ok((0, Fix16::from_pixels(self.layout.header.space_size as i32)));
        }
        let info = self.glyph_info(code).ok_or_else(|| Error::LookupMiss {
            glyph_code: code,
            glyph_count: self.layout.header.glyph_count,
        })?;
        Ok((info.horizontal_offset as i32, info.advance))
    }

    fn packed_glyph_bytes(&self, info: &GlyphInfo, code: GlyphCode) -> &'a [u8] {
        let pool = &self.blob[self.layout.pixel_pool_range.clone()];
        let offset = *self
            .layout
            .pool_index
            .get(code as usize)
            .unwrap_or(&0) as usize;
        let end = (offset + info.packet_length as usize).min(pool.len());
        &pool[offset.min(pool.len())..end]
    }

    /// Decodes a glyph's bitmap.
    pub(crate) fn decode_glyph_bitmap(&self, code: GlyphCode) -> Result<GlyphBitmap, Error> {
        let info = *self.glyph_info(code).ok_or(Error::LookupMiss {
            glyph_code: code,
            glyph_count: self.layout.header.glyph_count,
        })?;
        let packed = self.packed_glyph_bytes(&info, code);
        rle::decode_glyph(
            packed,
            info.bitmap_width,
            info.bitmap_height,
            info.rle_metrics.dyn_f,
            info.rle_metrics.first_is_black,
            self.layout.resolution.get(),
            code,
        )
    }

    fn decode_for_blit(&self, code: GlyphCode) -> Result<(GlyphBitmap, i32, i32), Error> {
        match self.decode_glyph_bitmap(code) {
            Ok(bitmap) => {
                let (h_off, v_off) = self
                    .glyph_info(code)
                    .map(|g| (g.horizontal_offset as i32, g.vertical_offset as i32))
                    .unwrap_or((0, 0));
                Ok((bitmap, h_off, v_off))
            }
            Err(e) => {
                warn!("glyph {code} failed to decode: {e}");
                Err(e)
            }
        }
    }

    /// Decodes and blits a glyph directly into a 1bpp canvas at
    /// `atPos + offsets`, honoring `inverted`.
    pub fn draw_glyph_1bpp(
        &self,
        canvas: &mut Canvas1Bpp,
        code: GlyphCode,
        pos_x: i32,
        pos_y: i32,
        inverted: bool,
    ) -> Result<(), Error> {
        let (bitmap, h_off, v_off) = self.decode_for_blit(code)?;
        blit_glyph(canvas, &bitmap, pos_x - h_off, pos_y - v_off, inverted);
        Ok(())
    }

    /// As [`Face::draw_glyph_1bpp`] but for an 8bpp canvas.
    pub fn draw_glyph_8bpp(
        &self,
        canvas: &mut Canvas8Bpp,
        code: GlyphCode,
        pos_x: i32,
        pos_y: i32,
        inverted: bool,
    ) -> Result<(), Error> {
        let (bitmap, h_off, v_off) = self.decode_for_blit(code)?;
        blit_glyph_8bpp(canvas, &bitmap, pos_x - h_off, pos_y - v_off, inverted);
        Ok(())
    }

    /// One ligature/kerning lookup step (§4.4). Returns the outcome and
    /// leaves `*code2` updated on a replacement.
    pub fn lig_kern(
        &self,
        code1: GlyphCode,
        code2: &mut GlyphCode,
        kern: &mut Fix16,
    ) -> LigKernOutcome {
        *kern = Fix16::ZERO;
        let glyph_count = self.layout.header.glyph_count;
        if code1 >= glyph_count || *code2 >= glyph_count {
            return LigKernOutcome::NoLigature;
        }

        let lk_idx = self.layout.glyph_info[code1 as usize].lig_kern_pgm_index;
        if lk_idx == NO_LIG_KERN_PGM {
            return LigKernOutcome::NoLigature;
        }

        let mut idx = lk_idx as usize;
        let Some(first) = self.layout.lig_kern_pgm.get(idx) else {
            return LigKernOutcome::NoLigature;
        };
        if let LigKernPayload::Goto(displacement) = first.payload {
            idx = displacement as usize;
        }

        let target_main_code = self
            .layout
            .glyph_info
            .get(*code2 as usize)
            .map(|g| g.main_code)
            .unwrap_or(*code2);

        loop {
            let Some(step) = self.layout.lig_kern_pgm.get(idx) else {
                return LigKernOutcome::NoLigature;
            };
            if step.next_glyph_code == target_main_code {
                return match step.payload {
                    LigKernPayload::Kern(value) => {
                        *kern = value;
                        LigKernOutcome::NoLigature
                    }
                    LigKernPayload::Replace(glyph) => {
                        *code2 = glyph;
                        LigKernOutcome::Ligature
                    }
                    LigKernPayload::Goto(_) => LigKernOutcome::NoLigature,
                };
            }
            if step.stop {
                return LigKernOutcome::NoLigature;
            }
            idx += 1;
        }
    }
}

impl<'a> core::fmt::Debug for Face<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Face")
            .field("point_size", &self.layout.header.point_size)
            .field("glyph_count", &self.layout.header.glyph_count)
            .field("lig_kern_step_count", &self.layout.header.lig_kern_step_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Builder(Vec<u8>);

    impl Builder {
        fn new() -> Self {
            Builder(Vec::new())
        }
        fn u8(&mut self, v: u8) -> &mut Self {
            self.0.push(v);
            self
        }
        fn i8(&mut self, v: i8) -> &mut Self {
            self.0.push(v as u8);
            self
        }
        fn u16(&mut self, v: u16) -> &mut Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn i16(&mut self, v: i16) -> &mut Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn u32(&mut self, v: u32) -> &mut Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
    }

    /// Two glyphs, each a single black pixel, with one ligKern step that
    /// kerns glyph0 against glyph1.
    fn two_glyph_face() -> Vec<u8> {
        let mut b = Builder::new();
        // FaceHeader
        b.u16(100) // dpi
            .u8(12) // pointSize
            .u8(16) // lineHeight
            .u16(0) // xHeight
            .u16(0) // emHeight
            .u8(5) // spaceSize
            .u16(2) // glyphCount
            .u16(1) // ligKernStepCount
            .u32(2) // pixelsPoolSize
            .i16(0) // slantCorrection
            .u8(3); // descenderHeight

        // pool index: glyphCount u32 entries
        b.u32(0).u32(1);

        // glyph 0: one black pixel, ligKernPgmIndex = 0
        b.u8(1) // bitmapWidth
            .u8(1) // bitmapHeight
            .i8(0) // horizontalOffset
            .i8(0) // verticalOffset
            .u16(1) // packetLength
            .i16(64) // advance
            .u8(0x1F) // rleMetrics: dynF=15, firstIsBlack=1
            .u16(0) // ligKernPgmIndex
            .u16(0); // mainCode

        // glyph 1: one black pixel, no ligKern program
        b.u8(1)
            .u8(1)
            .i8(0)
            .i8(0)
            .u16(1)
            .i16(64)
            .u8(0x1F)
            .u16(NO_LIG_KERN_PGM)
            .u16(1);

        // pixel pool: two single-byte packets, each one black pixel
        b.u8(0x10).u8(0x10);

        // ligKern program: one step, kern(glyph0 -> glyph1) = 5, stop=true
        let a: u16 = 1 | (1 << 15); // nextGlyphCode=1 (glyph1's mainCode), stop
        let kern_value: u16 = 5;
        let b_field: u16 = kern_value | (1 << 15); // isAKern
        b.u16(a).u16(b_field);

        b.0
    }

    #[test]
    fn parses_exactly_to_end() {
        let blob = two_glyph_face();
        let (layout, consumed) = FaceLayout::parse(&blob).unwrap();
        assert_eq!(consumed, blob.len());
        assert_eq!(layout.header.glyph_count, 2);
        assert_eq!(layout.lig_kern_pgm.len(), 1);
    }

    #[test]
    fn truncated_blob_fails_to_parse() {
        let mut blob = two_glyph_face();
        blob.truncate(blob.len() - 1);
        assert!(FaceLayout::parse(&blob).is_err());
    }

    #[test]
    fn glyph_width_and_space_handling() {
        let blob = two_glyph_face();
        let (layout, _) = FaceLayout::parse(&blob).unwrap();
        let face = Face::new(&layout, &blob);
        assert_eq!(face.glyph_width(0), 1);
        assert_eq!(face.glyph_width(SPACE_CODE), 5);
    }

    #[test]
    fn lig_kern_reports_kern_for_matching_pair() {
        let blob = two_glyph_face();
        let (layout, _) = FaceLayout::parse(&blob).unwrap();
        let face = Face::new(&layout, &blob);
        let mut code2 = 1u16;
        let mut kern = Fix16::ZERO;
        let outcome = face.lig_kern(0, &mut code2, &mut kern);
        assert_eq!(outcome, LigKernOutcome::NoLigature);
        assert_eq!(kern, Fix16::from_raw(5));
        assert_eq!(code2, 1);
    }

    #[test]
    fn lig_kern_no_program_is_a_no_op() {
        let blob = two_glyph_face();
        let (layout, _) = FaceLayout::parse(&blob).unwrap();
        let face = Face::new(&layout, &blob);
        let mut code2 = 0u16;
        let mut kern = Fix16::ZERO;
        let outcome = face.lig_kern(1, &mut code2, &mut kern);
        assert_eq!(outcome, LigKernOutcome::NoLigature);
        assert_eq!(kern, Fix16::ZERO);
    }

    #[test]
    fn decodes_glyph_bitmap() {
        let blob = two_glyph_face();
        let (layout, _) = FaceLayout::parse(&blob).unwrap();
        let face = Face::new(&layout, &blob);
        let bmp = face.decode_glyph_bitmap(0).unwrap();
        assert_eq!(bmp.nonzero_pixel_count(), 1);
    }

    /// A single glyph, one black pixel, with nonzero horizontal and
    /// vertical offsets, to pin down the blit offset sign convention
    /// against `original_source`'s `glyphOffsets.x -= horizontalOffset`,
    /// `glyphOffsets.y = -verticalOffset`.
    fn offset_glyph_face(h_off: i8, v_off: i8) -> Vec<u8> {
        let mut b = Builder::new();
        b.u16(100)
            .u8(12)
            .u8(16)
            .u16(0)
            .u16(0)
            .u8(5)
            .u16(1) // glyphCount
            .u16(0) // ligKernStepCount
            .u32(1) // pixelsPoolSize
            .i16(0)
            .u8(3);
        b.u32(0); // pool index
        b.u8(1) // bitmapWidth
            .u8(1) // bitmapHeight
            .i8(h_off)
            .i8(v_off)
            .u16(1)
            .i16(64)
            .u8(0x1F)
            .u16(NO_LIG_KERN_PGM)
            .u16(0);
        b.u8(0x10); // pixel pool: one black pixel
        b.0
    }

    #[test]
    fn draw_glyph_1bpp_subtracts_offsets_from_pen_position() {
        let blob = offset_glyph_face(2, 1);
        let (layout, _) = FaceLayout::parse(&blob).unwrap();
        let face = Face::new(&layout, &blob);

        let mut buf = [0u8; 16 * 16 / 8];
        let mut canvas = Canvas1Bpp::new(&mut buf, 16, 16);
        face.draw_glyph_1bpp(&mut canvas, 0, 10, 10, false).unwrap();

        // pos_x - h_off = 8, pos_y - v_off = 9
        assert!(canvas.get_pixel(8, 9));
        // Not at the naive (pos_x + h_off, pos_y - v_off) location.
        assert!(!canvas.get_pixel(12, 9));
    }
}
