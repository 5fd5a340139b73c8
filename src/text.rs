use ab_glyph::{point, Font, FontVec, Glyph, GlyphId, Point, PxScale, ScaleFont};
use image::{GrayImage, Luma, Pixel, Rgba, RgbaImage};

#[derive(Clone, Debug)]
pub struct GlyphData {
    pub glyphs: Vec<Glyph>,
    pub width: u32,
    pub height: u32,
}

impl GlyphData {
    /// 旋转后宽高互换
    pub fn footprint(&self, rotated: bool) -> (u32, u32) {
        if rotated {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

//把文本转换为字体，方便画图
pub fn text_to_glyphs(text: &str, font: &FontVec, scale: PxScale) -> GlyphData {
    let scaled_font = font.as_scaled(scale);

    let mut glyphs: Vec<Glyph> = vec![];
    layout_paragraph(scaled_font, point(0.0, 0.0), text, &mut glyphs);

    let glyphs_height = scaled_font.height().ceil() as u32;
    let glyphs_width = match (glyphs.first(), glyphs.last()) {
        (Some(first), Some(last)) => {
            let max_x = last.position.x + scaled_font.h_advance(last.id);
            (max_x - first.position.x).ceil() as u32
        }
        _ => 0,
    };

    GlyphData {
        glyphs,
        width: glyphs_width,
        height: glyphs_height,
    }
}

//横排坐标映射到目标图片, 旋转时逆时针转 90 度, 从下往上读
fn place(
    glyph_data: &GlyphData,
    origin: Point,
    rotated: bool,
    x: i64,
    y: i64,
) -> (i64, i64) {
    let (ox, oy) = (origin.x as i64, origin.y as i64);
    if rotated {
        (ox + y, oy + glyph_data.width as i64 - 1 - x)
    } else {
        (ox + x, oy + y)
    }
}

fn for_each_covered_pixel(
    glyph_data: &GlyphData,
    font: &FontVec,
    origin: Point,
    rotated: bool,
    bounds: (u32, u32),
    mut f: impl FnMut(u32, u32, f32),
) {
    for glyph in &glyph_data.glyphs {
        if let Some(outlined) = font.outline_glyph(glyph.clone()) {
            let px_bounds = outlined.px_bounds();
            let (min_x, min_y) = (px_bounds.min.x as i64, px_bounds.min.y as i64);

            outlined.draw(|x, y, v| {
                if v <= 0.0 {
                    return;
                }
                let (final_x, final_y) =
                    place(glyph_data, origin, rotated, min_x + x as i64, min_y + y as i64);
                if final_x < 0 || final_y < 0 {
                    return;
                }
                let (final_x, final_y) = (final_x as u32, final_y as u32);
                if final_x < bounds.0 && final_y < bounds.1 {
                    f(final_x, final_y, v);
                }
            })
        }
    }
}

//标记占用的像素, 返回最上面被画到的行
pub fn draw_glyphs_to_gray_buffer(
    buffer: &mut GrayImage,
    glyph_data: &GlyphData,
    font: &FontVec,
    point: Point,
    rotate: bool,
) -> Option<u32> {
    let bounds = buffer.dimensions();
    let mut first_row: Option<u32> = None;
    for_each_covered_pixel(glyph_data, font, point, rotate, bounds, |x, y, _| {
        buffer.put_pixel(x, y, Luma([1]));
        first_row = Some(first_row.map_or(y, |row| row.min(y)));
    });

    first_row
}

pub fn draw_glyphs_to_rgba_buffer(
    buffer: &mut RgbaImage,
    glyph_data: &GlyphData,
    font: &FontVec,
    point: Point,
    rotate: bool,
    pixel: Rgba<u8>,
) {
    let bounds = buffer.dimensions();
    for_each_covered_pixel(glyph_data, font, point, rotate, bounds, |x, y, v| {
        let px = buffer.get_pixel_mut(x, y);
        px.apply2(&pixel, |old, new| {
            ((v * new as f32) + (1.0 - v) * old as f32) as u8
        });
        px.0[3] = 0xFF;
    });
}

pub fn layout_paragraph<F, SF>(font: SF, position: Point, text: &str, target: &mut Vec<Glyph>)
where
    F: Font,
    SF: ScaleFont<F>,
{
    let v_advance = font.height() + font.line_gap();
    let mut caret = position + point(0.0, font.ascent());
    let mut last_glyph: Option<GlyphId> = None;
    for c in text.chars() {
        if c.is_control() {
            if c == '\n' {
                //进行换行
                caret = point(position.x, caret.y + v_advance);
            }
            continue;
        }

        let mut glyph = font.scaled_glyph(c);
        if let Some(previous) = last_glyph.take() {
            caret.x += font.kern(previous, glyph.id);
        }
        glyph.position = caret;
        last_glyph = Some(glyph.id);
        caret.x += font.h_advance(glyph.id);

        target.push(glyph);
    }
}

#[cfg(test)]
mod tests {
    use ab_glyph::point;

    use super::{place, GlyphData};

    fn data(width: u32, height: u32) -> GlyphData {
        GlyphData {
            glyphs: vec![],
            width,
            height,
        }
    }

    #[test]
    fn footprint_swaps_when_rotated() {
        let glyphs = data(30, 10);
        assert_eq!(glyphs.footprint(false), (30, 10));
        assert_eq!(glyphs.footprint(true), (10, 30));
    }

    #[test]
    fn rotated_placement_stays_inside_footprint() {
        let glyphs = data(30, 10);
        let origin = point(5.0, 7.0);

        assert_eq!(place(&glyphs, origin, false, 0, 0), (5, 7));
        // 左上角转到左下角
        assert_eq!(place(&glyphs, origin, true, 0, 0), (5, 7 + 29));
        assert_eq!(place(&glyphs, origin, true, 29, 9), (5 + 9, 7));
    }
}
