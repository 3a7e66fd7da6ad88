use std::io::Cursor;

use ab_glyph::{FontArc, PxScale};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use super::layout::{Placement, PADDING};

/// Paint placements onto a fresh canvas.
///
/// Without a font each word becomes a solid block covering its glyph area.
pub fn rasterize(
    placements: &[Placement],
    width: u32,
    height: u32,
    background: Rgb<u8>,
    font: Option<&FontArc>,
) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, background);

    for p in placements {
        let color = Rgb(p.color);
        let x = (p.x + PADDING) as i32;
        let y = (p.y + PADDING) as i32;

        match font {
            Some(font) => {
                draw_text_mut(&mut canvas, color, x, y, PxScale::from(p.font_size), font, &p.word);
            }
            None => {
                let inner_w = p.width.saturating_sub(2 * PADDING).max(1);
                let inner_h = p.height.saturating_sub(2 * PADDING).max(1);
                draw_filled_rect_mut(&mut canvas, Rect::at(x, y).of_size(inner_w, inner_h), color);
            }
        }
    }

    canvas
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}
