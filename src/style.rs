use az::SaturatingAs as _;
use embedded_graphics::{
    image::{Image, ImageRaw},
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, Drawable as _, PixelColor, Point, Size},
    primitives::Rectangle,
    text::{
        renderer::{CharacterStyle, TextMetrics, TextRenderer},
        Baseline, DecorationColor,
    },
};

use crate::{
    codes::SPACE_CODE,
    draw_target::{Background, Both, Foreground, MonoFontDrawTarget},
    face::{Face, PixelResolution},
    fixed::Fix16,
    font_data::FontData,
    walker::{FaceGlyphSource, LigKernWalker, ShapedGlyph},
};

/// An `embedded-graphics` `TextRenderer`/`CharacterStyle` over one IBMF
/// face, running the same ligature/kerning walker as [`crate::facade`]
/// but drawing through an arbitrary caller `DrawTarget` instead of this
/// crate's own [`crate::compositor::Canvas1Bpp`].
#[derive(Debug, PartialEq, Clone, Copy)]
#[non_exhaustive]
pub struct IbmfTextStyle<'a, C> {
    pub text_color: Option<C>,
    pub background_color: Option<C>,
    pub underline_color: DecorationColor<C>,
    pub strikethrough_color: DecorationColor<C>,
    font_data: &'a FontData,
    face_index: usize,
}

impl<'a, C> IbmfTextStyle<'a, C>
where
    C: PixelColor,
{
    /// Initializes a style over `font_data`'s face `face_index`, all
    /// decorations transparent/disabled.
    pub fn new(font_data: &'a FontData, face_index: usize) -> Self {
        Self {
            text_color: None,
            background_color: None,
            underline_color: DecorationColor::None,
            strikethrough_color: DecorationColor::None,
            font_data,
            face_index,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.text_color.is_none()
            && self.background_color.is_none()
            && self.underline_color.is_none()
            && self.strikethrough_color.is_none()
    }

    fn face(&self) -> Option<Face<'a>> {
        if !self.font_data.is_initialized() {
            return None;
        }
        self.font_data.face(self.face_index)
    }

    /// Offset from the caller's position pixel to the glyph drawing
    /// origin, for a given baseline convention.
    fn baseline_offset(&self, face: &Face<'a>, baseline: Baseline) -> i32 {
        let ascent = face.em_height().floor_pixels();
        let descent = face.descender_height() as i32;
        match baseline {
            Baseline::Top => ascent,
            Baseline::Bottom => 1 + descent,
            Baseline::Middle => 1 + (ascent + descent) / 2,
            Baseline::Alphabetic => 1,
        }
    }

    fn draw_decorations<D>(
        &self,
        width: u32,
        position: Point,
        face: &Face<'a>,
        target: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = C>,
    {
        if let Some(color) = match self.strikethrough_color {
            DecorationColor::None => None,
            DecorationColor::Custom(custom_color) => Some(custom_color),
            DecorationColor::TextColor => self.text_color,
        } {
            let offset = Point::new(0, -self.baseline_offset(face, Baseline::Middle));
            let rect = Rectangle::new(position + offset, Size::new(width, 1));
            target.fill_solid(&rect, color)?;
        }

        if let Some(color) = match self.underline_color {
            DecorationColor::None => None,
            DecorationColor::Custom(custom_color) => Some(custom_color),
            DecorationColor::TextColor => self.text_color,
        } {
            let offset = Point::new(0, -self.baseline_offset(face, Baseline::Bottom));
            let rect = Rectangle::new(position + offset, Size::new(width, 1));
            target.fill_solid(&rect, color)?;
        }

        Ok(())
    }

    /// Draws one already-decoded glyph bitmap at `position`, offset by
    /// its own horizontal/vertical offsets.
    fn draw_single_glyph<D>(
        &self,
        face: &Face<'a>,
        glyph_code: u16,
        position: Point,
        target: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let Ok(bitmap) = face.decode_glyph_bitmap(glyph_code) else {
            return Ok(());
        };
        if bitmap.width == 0 || bitmap.height == 0 {
            return Ok(());
        }
        let h_off = face.glyph_h_offset(glyph_code) as i32;
        let v_off = face.glyph_v_offset(glyph_code) as i32;
        let raw = ImageRaw::<BinaryColor>::new(&bitmap.buffer, bitmap.width as u32);
        let offset = Point::new(-h_off, -v_off);
        Image::new(&raw, position + offset).draw(target)
    }

    /// Pen-advance arithmetic matching [`crate::facade::IbmfFont`]'s own
    /// `pen_advance`, so both public drawing paths step the pen
    /// identically for a given shaped glyph.
    fn pen_advance(&self, face: &Face<'a>, glyph_code: u16, kern: Fix16, last_word_char: bool) -> i32 {
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

    fn text_bbox(&self, face: &Face<'a>, text: &str, position: Point) -> Option<Rectangle> {
        if text.is_empty() {
            return None;
        }
        let source = FaceGlyphSource {
            font_data: self.font_data,
            face: *face,
        };
        let mut width = 0u32;
        for ShapedGlyph { glyph_code, .. } in LigKernWalker::new(&source, text.as_bytes()) {
            width += face.glyph_width(glyph_code) as u32;
        }
        let offset = Point::new(0, -face.em_height().floor_pixels());
        let size = Size::new(width, face.line_height() as u32);
        Some(Rectangle::new(position + offset, size))
    }

    fn fill_string_background<D>(
        &self,
        face: &Face<'a>,
        text: &str,
        position: Point,
        target: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        if self.background_color.is_none() {
            return Ok(());
        }
        if let Some(bbox) = self.text_bbox(face, text, position) {
            target.fill_solid(&bbox, BinaryColor::Off)
        } else {
            Ok(())
        }
    }

    fn draw_string_binary<D>(
        &self,
        face: &Face<'a>,
        text: &str,
        mut position: Point,
        mut target: D,
    ) -> Result<Point, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        self.fill_string_background(face, text, position, &mut target)?;
        let source = FaceGlyphSource {
            font_data: self.font_data,
            face: *face,
        };
        for ShapedGlyph {
            glyph_code,
            kern,
            first_word_char,
            last_word_char,
        } in LigKernWalker::new(&source, text.as_bytes())
        {
            if first_word_char {
                position.x += face.glyph_h_offset(glyph_code) as i32;
            }
            if glyph_code != SPACE_CODE {
                self.draw_single_glyph(face, glyph_code, position, &mut target)?;
            }
            position.x += self.pen_advance(face, glyph_code, kern, last_word_char);
        }
        Ok(position)
    }
}

impl<'a, C> TextRenderer for IbmfTextStyle<'a, C>
where
    C: PixelColor,
{
    type Color = C;

    fn draw_string<D>(
        &self,
        text: &str,
        position: Point,
        baseline: Baseline,
        target: &mut D,
    ) -> Result<Point, D::Error>
    where
        D: DrawTarget<Color = Self::Color>,
    {
        let Some(face) = self.face() else {
            return Ok(position);
        };
        if face.display_resolution() != PixelResolution::OneBit {
            return Ok(position);
        }
        let position = position + Point::new(0, self.baseline_offset(&face, baseline));

        let next = match (self.text_color, self.background_color) {
            (Some(text_color), Some(background_color)) => self.draw_string_binary(
                &face,
                text,
                position,
                MonoFontDrawTarget::new(target, Both(text_color, background_color)),
            )?,
            (Some(text_color), None) => self.draw_string_binary(
                &face,
                text,
                position,
                MonoFontDrawTarget::new(target, Foreground(text_color)),
            )?,
            (None, Some(background_color)) => self.draw_string_binary(
                &face,
                text,
                position,
                MonoFontDrawTarget::new(target, Background(background_color)),
            )?,
            (None, None) => {
                if let Some(bbox) = self.text_bbox(&face, text, position) {
                    position + bbox.size.x_axis()
                } else {
                    position
                }
            }
        };

        if next.x > position.x {
            let width = (next.x - position.x) as u32;
            self.draw_decorations(width, position, &face, target)?;
        }

        Ok(next - Point::new(0, self.baseline_offset(&face, baseline)))
    }

    fn draw_whitespace<D>(
        &self,
        width: u32,
        mut position: Point,
        baseline: Baseline,
        target: &mut D,
    ) -> Result<Point, D::Error>
    where
        D: DrawTarget<Color = Self::Color>,
    {
        let Some(face) = self.face() else {
            return Ok(position);
        };
        if width != 0 {
            let line_height = face.line_height() as u32;
            position.y += self.baseline_offset(&face, baseline) - face.em_height().floor_pixels();
            if let Some(background_color) = self.background_color {
                target.fill_solid(
                    &Rectangle::new(position, Size::new(width, line_height)),
                    background_color,
                )?;
            }
            position.y += face.em_height().floor_pixels();
            self.draw_decorations(width, position, &face, target)?;
            position.y -= self.baseline_offset(&face, baseline);
            position.x += width.saturating_as::<i32>();
        }
        Ok(position)
    }

    fn measure_string(
        &self,
        text: &str,
        position: Point,
        baseline: Baseline,
    ) -> TextMetrics {
        let Some(face) = self.face() else {
            return TextMetrics {
                bounding_box: Rectangle::new(position, Size::new(0, 0)),
                next_position: position,
            };
        };
        let bbox = if let Some(mut bbox) = self.text_bbox(&face, text, position) {
            bbox.top_left += Point::new(0, self.baseline_offset(&face, baseline));
            bbox
        } else {
            let bb_position = position
                + Point::new(
                    0,
                    self.baseline_offset(&face, baseline) - self.baseline_offset(&face, Baseline::Top),
                );
            Rectangle::new(bb_position, Size::new(0, 0))
        };

        TextMetrics {
            bounding_box: bbox,
            next_position: position + bbox.size.x_axis(),
        }
    }

    fn line_height(&self) -> u32 {
        self.face().map(|f| f.line_height() as u32).unwrap_or(0)
    }
}

impl<'a, C> CharacterStyle for IbmfTextStyle<'a, C>
where
    C: PixelColor,
{
    type Color = C;

    fn set_text_color(&mut self, text_color: Option<Self::Color>) {
        self.text_color = text_color;
    }

    fn set_background_color(&mut self, background_color: Option<Self::Color>) {
        self.background_color = background_color;
    }

    fn set_underline_color(&mut self, underline_color: DecorationColor<Self::Color>) {
        self.underline_color = underline_color;
    }

    fn set_strikethrough_color(&mut self, strikethrough_color: DecorationColor<Self::Color>) {
        self.strikethrough_color = strikethrough_color;
    }
}

/// Builder for [`IbmfTextStyle`], mirroring
/// `embedded_graphics::mono_font::MonoTextStyleBuilder`'s API shape.
#[derive(Clone, Debug)]
pub struct IbmfTextStyleBuilder<'a, C> {
    style: IbmfTextStyle<'a, C>,
}

impl<'a, C> IbmfTextStyleBuilder<'a, C>
where
    C: PixelColor,
{
    pub fn new(font_data: &'a FontData, face_index: usize) -> Self {
        Self {
            style: IbmfTextStyle::new(font_data, face_index),
        }
    }

    pub fn underline(mut self) -> Self {
        self.style.underline_color = DecorationColor::TextColor;
        self
    }

    pub fn strikethrough(mut self) -> Self {
        self.style.strikethrough_color = DecorationColor::TextColor;
        self
    }

    pub fn reset_text_color(mut self) -> Self {
        self.style.text_color = None;
        self
    }

    pub fn reset_background_color(mut self) -> Self {
        self.style.background_color = None;
        self
    }

    pub fn reset_underline(mut self) -> Self {
        self.style.underline_color = DecorationColor::None;
        self
    }

    pub fn reset_strikethrough(mut self) -> Self {
        self.style.strikethrough_color = DecorationColor::None;
        self
    }

    pub fn text_color(mut self, text_color: C) -> Self {
        self.style.text_color = Some(text_color);
        self
    }

    pub fn background_color(mut self, background_color: C) -> Self {
        self.style.background_color = Some(background_color);
        self
    }

    pub fn underline_with_color(mut self, underline_color: C) -> Self {
        self.style.underline_color = DecorationColor::Custom(underline_color);
        self
    }

    pub fn strikethrough_with_color(mut self, strikethrough_color: C) -> Self {
        self.style.strikethrough_color = DecorationColor::Custom(strikethrough_color);
        self
    }

    pub fn build(self) -> IbmfTextStyle<'a, C> {
        self.style
    }
}
