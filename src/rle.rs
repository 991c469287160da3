//! PK-style run-length decoder: expands a packed glyph into a row-major
//! unpacked bitmap, at either 1 bpp or 8 bpp.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{DecodeFailure, Error};
use crate::face::PixelResolution;
use crate::utils::NybbleCursor;

const PK_REPEAT_COUNT: u8 = 14;
const PK_REPEAT_ONCE: u8 = 15;

/// An unpacked glyph bitmap, independent of any destination canvas.
///
/// Produced by [`decode_glyph`]; the compositor later blits this into a
/// caller-owned canvas at an offset.
#[derive(Debug, Clone)]
pub struct GlyphBitmap {
    pub buffer: Vec<u8>,
    pub width: u8,
    pub height: u8,
    /// Bytes per row: `ceil(width/8)` at 1 bpp, `width` at 8 bpp.
    pub pitch: usize,
    pub resolution: PixelResolution,
}

impl GlyphBitmap {
    /// Allocates the scratch buffer for one decoded glyph. Uses a
    /// fallible reservation rather than `vec![...]`'s infallible one, so
    /// a heap-constrained target reports [`Error::Allocation`] instead
    /// of aborting.
    fn blank(width: u8, height: u8, resolution: PixelResolution) -> Result<Self, Error> {
        let pitch = match resolution {
            PixelResolution::OneBit => ((width as usize) + 7) / 8,
            PixelResolution::EightBit => width as usize,
        };
        let paper = match resolution {
            PixelResolution::OneBit => 0x00,
            PixelResolution::EightBit => 0xFF,
        };
        let len = pitch * height as usize;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| Error::Allocation { requested_bytes: len })?;
        buffer.resize(len, paper);
        Ok(GlyphBitmap {
            buffer,
            width,
            height,
            pitch,
            resolution,
        })
    }

    fn set_black(&mut self, row: usize, col: usize) {
        match self.resolution {
            PixelResolution::OneBit => {
                let byte = row * self.pitch + col / 8;
                self.buffer[byte] |= 0x80 >> (col % 8);
            }
            PixelResolution::EightBit => {
                self.buffer[row * self.pitch + col] = 0x00;
            }
        }
    }

    /// Count of ink (black) pixels, used by the RLE-round-trip test
    /// property against an off-line reference count.
    pub fn nonzero_pixel_count(&self) -> usize {
        let mut count = 0;
        for row in 0..self.height as usize {
            for col in 0..self.width as usize {
                let is_black = match self.resolution {
                    PixelResolution::OneBit => {
                        self.buffer[row * self.pitch + col / 8] & (0x80 >> (col % 8)) != 0
                    }
                    PixelResolution::EightBit => self.buffer[row * self.pitch + col] == 0x00,
                };
                if is_black {
                    count += 1;
                }
            }
        }
        count
    }
}

/// Decodes a packed glyph (the bytes between `GlyphInfo.packetLength`'s
/// worth of the pixel pool) into an unpacked [`GlyphBitmap`].
///
/// `dyn_f` and `first_is_black` come from the glyph's RLE metrics byte.
pub(crate) fn decode_glyph(
    packed: &[u8],
    width: u8,
    height: u8,
    dyn_f: u8,
    first_is_black: bool,
    resolution: PixelResolution,
    glyph_code: u16,
) -> Result<GlyphBitmap, Error> {
    let mut bitmap = GlyphBitmap::blank(width, height, resolution)?;
    if width == 0 || height == 0 {
        return Ok(bitmap);
    }

    let err = |reason: DecodeFailure| Error::RuntimeDecode { reason, glyph_code };

    let mut cursor = NybbleCursor::new(packed);
    let mut color_black = first_is_black;
    let mut repeat_count: usize = 0;
    let mut output_row: usize = 0;
    let mut col: usize = 0;
    let width_usize = width as usize;
    let height_usize = height as usize;

    while output_row < height_usize {
        let n = cursor
            .next_nybble()
            .ok_or_else(|| err(DecodeFailure::PacketUnderrun))?;

        let mut run_len = if n == PK_REPEAT_COUNT {
            let first = cursor
                .next_nybble()
                .ok_or_else(|| err(DecodeFailure::PacketUnderrun))?;
            repeat_count = packed_number(first, &mut cursor, dyn_f, glyph_code)? as usize;
            continue;
        } else if n == PK_REPEAT_ONCE {
            repeat_count = 1;
            continue;
        } else {
            packed_number(n, &mut cursor, dyn_f, glyph_code)? as usize
        };

        while run_len > 0 {
            if output_row >= height_usize {
                return Err(err(DecodeFailure::RowOverrun));
            }
            let avail = width_usize - col;
            let take = run_len.min(avail);
            if color_black {
                for i in 0..take {
                    bitmap.set_black(output_row, col + i);
                }
            }
            col += take;
            run_len -= take;

            if col == width_usize {
                if repeat_count > 0 {
                    let (src_start, src_end) =
                        (output_row * bitmap.pitch, (output_row + 1) * bitmap.pitch);
                    let row_bytes = bitmap.buffer[src_start..src_end].to_vec();
                    for k in 1..=repeat_count {
                        let dst = (output_row + k) * bitmap.pitch;
                        if dst + bitmap.pitch > bitmap.buffer.len() {
                            return Err(err(DecodeFailure::RowOverrun));
                        }
                        bitmap.buffer[dst..dst + bitmap.pitch].copy_from_slice(&row_bytes);
                    }
                    output_row += 1 + repeat_count;
                    repeat_count = 0;
                } else {
                    output_row += 1;
                }
                col = 0;
            }
        }

        color_black = !color_black;
    }

    if repeat_count != 0 {
        return Err(err(DecodeFailure::ResidualRepeatCount));
    }

    Ok(bitmap)
}

fn packed_number(
    n: u8,
    cursor: &mut NybbleCursor,
    dyn_f: u8,
    glyph_code: u16,
) -> Result<u32, Error> {
    let underrun = || Error::RuntimeDecode {
        reason: DecodeFailure::PacketUnderrun,
        glyph_code,
    };

    if n == 0 {
        let mut leading_zero_count: u32 = 0;
        let m = loop {
            let d = cursor.next_nybble().ok_or_else(underrun)?;
            if d == 0 {
                leading_zero_count += 1;
            } else {
                break d as u32;
            }
        };
        let base = ((leading_zero_count << 4) | m) << 4;
        let mut tail: u32 = 0;
        for _ in 0..leading_zero_count {
            let d = cursor.next_nybble().ok_or_else(underrun)?;
            tail = tail * 16 + d as u32;
        }
        Ok(base + tail)
    } else if n <= dyn_f {
        Ok(n as u32)
    } else if n < 14 {
        let next = cursor.next_nybble().ok_or_else(underrun)?;
        Ok((((n - dyn_f - 1) as u32) << 4) + next as u32 + dyn_f as u32 + 1)
    } else {
        // A repeat directive appearing where a plain packed number was
        // expected (e.g. as the argument of PK_REPEAT_COUNT itself).
        Err(underrun())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_flat_2x2_all_white() {
        // dynF irrelevant: a single run of 4 (">dynF" branch with dynF=0,
        // n=2 -> ((2-0-1)<<4)+next+1) is awkward to hand-encode for a
        // plain small run, so use the n<=dynF branch: dynF=15 so any
        // nybble n<=15 is taken literally as its value.
        let packed = [0x40]; // n=4: run of 4 white pixels (firstIsBlack=false)
        let bmp = decode_glyph(&packed, 2, 2, 15, false, PixelResolution::OneBit, 0).unwrap();
        assert_eq!(bmp.nonzero_pixel_count(), 0);
        assert_eq!(bmp.pitch, 1);
        assert_eq!(bmp.buffer, vec![0x00]);
    }

    #[test]
    fn decodes_flat_2x2_all_black() {
        let packed = [0x40];
        let bmp = decode_glyph(&packed, 2, 2, 15, true, PixelResolution::OneBit, 0).unwrap();
        assert_eq!(bmp.nonzero_pixel_count(), 4);
    }

    #[test]
    fn alternates_color_between_runs() {
        // Two runs of 2 each, 4x1 glyph: black(2) white(2).
        let packed = [0x22];
        let bmp = decode_glyph(&packed, 4, 1, 15, true, PixelResolution::OneBit, 0).unwrap();
        // bits: 1 1 0 0 -> MSB-first packed into one byte: 0b1100_0000
        assert_eq!(bmp.buffer, vec![0b1100_0000]);
    }

    #[test]
    fn repeat_once_duplicates_completed_row() {
        // Row 0: full black run of width 2 (n=2, dynF=15). Then PK_REPEAT_ONCE
        // (15) then another full run completing row "again" conceptually:
        // repeatCount must be set BEFORE the row that completes is painted,
        // so encode: [PK_REPEAT_ONCE] [run=2 black] for a 2-wide, 2-tall glyph.
        let packed = [0xF2, 0x00]; // nybbles: F(15)=repeat once, 2=run of 2 black
        let bmp = decode_glyph(&packed, 2, 2, 15, true, PixelResolution::OneBit, 0).unwrap();
        assert_eq!(bmp.nonzero_pixel_count(), 4);
        assert_eq!(bmp.buffer, vec![0b1100_0000, 0b1100_0000]);
    }

    #[test]
    fn packet_underrun_is_reported() {
        let packed: [u8; 0] = [];
        let err = decode_glyph(&packed, 2, 2, 15, true, PixelResolution::OneBit, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::RuntimeDecode {
                reason: DecodeFailure::PacketUnderrun,
                ..
            }
        ));
    }

    #[test]
    fn eight_bit_resolution_uses_0_and_255() {
        let packed = [0x40];
        let bmp = decode_glyph(&packed, 2, 2, 15, true, PixelResolution::EightBit, 0).unwrap();
        assert_eq!(bmp.buffer, vec![0x00, 0x00, 0x00, 0x00]);
    }
}
