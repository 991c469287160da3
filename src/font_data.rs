//! Owns the whole multi-face blob plus the codepoint-translation tables,
//! and hands out borrowing [`Face`] views by index.

use alloc::vec::Vec;
use num_enum::TryFromPrimitive;

use crate::codes::{
    GlyphCode, UNKNOWN_CODEPOINT, ZERO_WIDTH_CODE, ZERO_WIDTH_CODEPOINT,
};
use crate::error::{Error, ParseFailure};
use crate::face::{Face, FaceLayout};
use crate::utils::ByteCursor;

const MAGIC: u32 = 0x464D_4249; // little-endian read of ASCII "IBMF"

/// Tag identifying the face-blob encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum FontFormat {
    /// The single layout described by this crate's wire format.
    IbmfV1 = 1,
}

#[derive(Debug, Clone, Copy)]
struct Plane {
    plane_index: u8,
    first_bundle_idx: u16,
    bundle_count: u16,
}

#[derive(Debug, Clone, Copy)]
struct CodepointBundle {
    first_code: u8,
    count: u8,
    first_glyph_code: u16,
}

/// Owns the face blob and the read-only codepoint translator built from
/// it. Immutable after [`FontData::load`] succeeds.
pub struct FontData {
    blob: Vec<u8>,
    format: FontFormat,
    faces: Vec<FaceLayout>,
    planes: Vec<Plane>,
    bundles: Vec<CodepointBundle>,
    unknown_glyph_code: GlyphCode,
    initialized: bool,
}

impl FontData {
    /// Parses a complete IBMF blob. On a parse error this returns `Ok`
    /// with `is_initialized() == false` rather than propagating, per the
    /// crate's error propagation policy — callers that ignore the
    /// `Result` still get a font that silently draws nothing.
    pub fn load(blob: Vec<u8>) -> Result<FontData, Error> {
        match Self::load_inner(&blob) {
            Ok((format, faces, planes, bundles)) => {
                let mut data = FontData {
                    blob,
                    format,
                    faces,
                    planes,
                    bundles,
                    unknown_glyph_code: 0,
                    initialized: true,
                };
                data.unknown_glyph_code = data
                    .translate_raw(UNKNOWN_CODEPOINT)
                    .unwrap_or(crate::codes::NO_GLYPH_CODE);
                Ok(data)
            }
            Err(e) => {
                log::warn!("font failed to parse, leaving FontData uninitialized: {e}");
                Ok(FontData {
                    blob,
                    format: FontFormat::IbmfV1,
                    faces: Vec::new(),
                    planes: Vec::new(),
                    bundles: Vec::new(),
                    unknown_glyph_code: crate::codes::NO_GLYPH_CODE,
                    initialized: false,
                })
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn load_inner(
        blob: &[u8],
    ) -> Result<(FontFormat, Vec<FaceLayout>, Vec<Plane>, Vec<CodepointBundle>), Error> {
        let mut c = ByteCursor::new(blob);
        let magic = c.u32()?;
        if magic != MAGIC {
            return Err(Error::Parse {
                reason: ParseFailure::BadPreamble,
                offset: 0,
            });
        }
        let format_tag = c.u8()?;
        let format = FontFormat::try_from(format_tag).map_err(|_| Error::Parse {
            reason: ParseFailure::BadPreamble,
            offset: c.position(),
        })?;
        let face_count = c.u8()? as usize;
        let mut face_offsets = Vec::with_capacity(face_count);
        for _ in 0..face_count {
            face_offsets.push(c.u32()? as usize);
        }
        let plane_table_offset = c.u32()? as usize;

        let mut faces = Vec::with_capacity(face_count);
        for i in 0..face_count {
            let start = face_offsets[i];
            let end = if i + 1 < face_count {
                face_offsets[i + 1]
            } else {
                plane_table_offset
            };
            if end > blob.len() || start > end {
                return Err(Error::Parse {
                    reason: ParseFailure::UnexpectedEnd,
                    offset: start,
                });
            }
            let (layout, consumed) = FaceLayout::parse(&blob[start..end])?;
            if consumed != end - start {
                return Err(Error::Parse {
                    reason: ParseFailure::TrailingOrMissingBytes {
                        expected_end: end,
                        actual_end: start + consumed,
                    },
                    offset: start + consumed,
                });
            }
            faces.push(layout);
        }

        if plane_table_offset > blob.len() {
            return Err(Error::Parse {
                reason: ParseFailure::UnexpectedEnd,
                offset: plane_table_offset,
            });
        }
        let mut pc = ByteCursor::new(&blob[plane_table_offset..]);
        let plane_count = pc.u16()? as usize;
        let mut planes = Vec::with_capacity(plane_count);
        for _ in 0..plane_count {
            let plane_index = pc.u8()?;
            let first_bundle_idx = pc.u16()?;
            let bundle_count = pc.u16()?;
            planes.push(Plane {
                plane_index,
                first_bundle_idx,
                bundle_count,
            });
        }
        let bundle_count = pc.u16()? as usize;
        let mut bundles = Vec::with_capacity(bundle_count);
        for _ in 0..bundle_count {
            let first_code = pc.u8()?;
            let count = pc.u8()?;
            let first_glyph_code = pc.u16()?;
            bundles.push(CodepointBundle {
                first_code,
                count,
                first_glyph_code,
            });
        }

        if !pc.is_at_end() {
            return Err(Error::Parse {
                reason: ParseFailure::TrailingOrMissingBytes {
                    expected_end: blob.len(),
                    actual_end: plane_table_offset + pc.position(),
                },
                offset: plane_table_offset + pc.position(),
            });
        }

        Ok((format, faces, planes, bundles))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn format(&self) -> FontFormat {
        self.format
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn unknown_glyph_code(&self) -> GlyphCode {
        self.unknown_glyph_code
    }

    /// Returns face `idx`, clamped to the largest available face when
    /// `idx >= face_count` rather than failing (§4.5).
    pub fn face(&self, idx: usize) -> Option<Face<'_>> {
        if self.faces.is_empty() {
            return None;
        }
        let clamped = idx.min(self.faces.len() - 1);
        Some(Face::new(&self.faces[clamped], &self.blob))
    }

    fn translate_raw(&self, codepoint: u32) -> Option<GlyphCode> {
        if codepoint > 0xFFFF {
            return None;
        }
        let plane_index = (codepoint >> 8) as u8;
        let low = (codepoint & 0xFF) as u8;
        let plane = self.planes.iter().find(|p| p.plane_index == plane_index)?;
        let start = plane.first_bundle_idx as usize;
        let end = start + plane.bundle_count as usize;
        let bundle = self.bundles.get(start..end)?.iter().find(|b| {
            low >= b.first_code && (low as u16) < (b.first_code as u16 + b.count as u16)
        })?;
        Some(bundle.first_glyph_code + (low - bundle.first_code) as u16)
    }

    /// Maps a codepoint to an internal glyph code (§4.2).
    pub fn translate(&self, codepoint: u32) -> GlyphCode {
        use crate::codes::SPACE_CODE;

        let is_space = codepoint == 0x0020
            || codepoint == 0x00A0
            || codepoint == 0x202F
            || (0x2000..=0x200F).contains(&codepoint);
        if is_space {
            return SPACE_CODE;
        }
        if codepoint == ZERO_WIDTH_CODEPOINT {
            return ZERO_WIDTH_CODE;
        }
        self.translate_raw(codepoint).unwrap_or(self.unknown_glyph_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::NO_LIG_KERN_PGM;

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

    /// One face with a single glyph mapped from 'A' (U+0041), plus a
    /// plane/bundle table translating U+0041 to glyph 0.
    fn single_glyph_font() -> Vec<u8> {
        let mut face = Vec::new();
        push_u16(&mut face, 100); // dpi
        push_u8(&mut face, 12); // pointSize
        push_u8(&mut face, 16); // lineHeight
        push_u16(&mut face, 0); // xHeight
        push_u16(&mut face, 0); // emHeight
        push_u8(&mut face, 5); // spaceSize
        push_u16(&mut face, 1); // glyphCount
        push_u16(&mut face, 0); // ligKernStepCount
        push_u32(&mut face, 1); // pixelsPoolSize
        push_i16(&mut face, 0); // slantCorrection
        push_u8(&mut face, 3); // descenderHeight
        push_u32(&mut face, 0); // pool index[0]
        push_u8(&mut face, 1); // bitmapWidth
        push_u8(&mut face, 1); // bitmapHeight
        push_i8(&mut face, 0); // horizontalOffset
        push_i8(&mut face, 0); // verticalOffset
        push_u16(&mut face, 1); // packetLength
        push_i16(&mut face, 64); // advance
        push_u8(&mut face, 0x1F); // rleMetrics
        push_u16(&mut face, NO_LIG_KERN_PGM); // ligKernPgmIndex
        push_u16(&mut face, 0); // mainCode
        push_u8(&mut face, 0x10); // pixel pool byte

        let mut blob = Vec::new();
        push_u32(&mut blob, MAGIC);
        push_u8(&mut blob, 1); // format
        push_u8(&mut blob, 1); // faceCount
        let face_offset_pos = blob.len();
        push_u32(&mut blob, 0); // placeholder face offset
        let plane_offset_pos = blob.len();
        push_u32(&mut blob, 0); // placeholder plane table offset

        let face_start = blob.len() as u32;
        blob.extend_from_slice(&face);
        let plane_table_start = blob.len() as u32;

        blob[face_offset_pos..face_offset_pos + 4].copy_from_slice(&face_start.to_le_bytes());
        blob[plane_offset_pos..plane_offset_pos + 4]
            .copy_from_slice(&plane_table_start.to_le_bytes());

        // plane table: one plane covering codepoint 0x0041 (plane index 0)
        push_u16(&mut blob, 1); // planeCount
        push_u8(&mut blob, 0x00); // planeIndex
        push_u16(&mut blob, 0); // firstBundleIdx
        push_u16(&mut blob, 1); // bundleCount

        push_u16(&mut blob, 1); // bundleCount (total)
        push_u8(&mut blob, 0x41); // firstCode ('A')
        push_u8(&mut blob, 1); // count
        push_u16(&mut blob, 0); // firstGlyphCode

        blob
    }

    #[test]
    fn loads_and_translates() {
        let blob = single_glyph_font();
        let data = FontData::load(blob).unwrap();
        assert!(data.is_initialized());
        assert_eq!(data.face_count(), 1);
        assert_eq!(data.translate(0x0041), 0);
    }

    #[test]
    fn translate_space_codepoints() {
        let blob = single_glyph_font();
        let data = FontData::load(blob).unwrap();
        assert_eq!(data.translate(0x0020), crate::codes::SPACE_CODE);
        assert_eq!(data.translate(0x00A0), crate::codes::SPACE_CODE);
        assert_eq!(data.translate(0x2005), crate::codes::SPACE_CODE);
    }

    #[test]
    fn translate_zero_width() {
        let blob = single_glyph_font();
        let data = FontData::load(blob).unwrap();
        assert_eq!(data.translate(0xFEFF), ZERO_WIDTH_CODE);
    }

    #[test]
    fn miss_falls_back_to_unknown_glyph_code() {
        let blob = single_glyph_font();
        let data = FontData::load(blob).unwrap();
        assert_eq!(data.translate(0x1234), data.unknown_glyph_code());
    }

    #[test]
    fn face_index_clamps_past_last() {
        let blob = single_glyph_font();
        let data = FontData::load(blob).unwrap();
        let f0 = data.face(0).unwrap();
        let f5 = data.face(5).unwrap();
        assert_eq!(f0.glyph_count(), f5.glyph_count());
    }

    #[test]
    fn truncated_blob_leaves_font_uninitialized() {
        let mut blob = single_glyph_font();
        blob.truncate(blob.len() - 1);
        let data = FontData::load(blob).unwrap();
        assert!(!data.is_initialized());
        assert_eq!(data.face_count(), 0);
    }

    #[test]
    fn bad_magic_leaves_font_uninitialized() {
        let mut blob = single_glyph_font();
        blob[0] = 0;
        let data = FontData::load(blob).unwrap();
        assert!(!data.is_initialized());
    }
}
