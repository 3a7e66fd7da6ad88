use serde::Serialize;

use crate::analysis::FrequencyTable;
use crate::util::display_width;

/// Word colours, cycled by rank. The seed rotates the starting colour.
const PALETTE: [[u8; 3]; 8] = [
    [0x1f, 0x77, 0xb4],
    [0xd6, 0x27, 0x28],
    [0x2c, 0xa0, 0x2c],
    [0xff, 0x7f, 0x0e],
    [0x94, 0x67, 0xbd],
    [0x8c, 0x56, 0x4b],
    [0xe3, 0x77, 0xc2],
    [0x17, 0xbe, 0xcf],
];

/// Radius growth per radian of spiral.
const SPIRAL_PITCH: f64 = 3.0;
/// Distance between probes along the spiral, in pixels.
const ARC_STEP: f64 = 6.0;
/// Font size multiplier when a word does not fit.
const SHRINK: f32 = 0.85;
/// Blank border around each word box.
pub(crate) const PADDING: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub width: u32,
    pub height: u32,
    pub min_font_size: f32,
    pub max_font_size: f32,
    pub seed: u64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            min_font_size: 10.0,
            max_font_size: 96.0,
            seed: 0,
        }
    }
}

/// Where one word landed. `x`/`y` is the top-left of its padded box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub word: String,
    pub count: usize,
    pub font_size: f32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub color: [u8; 3],
}

impl Placement {
    fn overlaps(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        x < self.x + self.width
            && self.x < x + width
            && y < self.y + self.height
            && self.y < y + height
    }
}

/// Pack the table's words onto the canvas.
///
/// Words are placed in table order, largest first. Each walks an
/// elliptical Archimedean spiral out from the centre and takes the first
/// spot where its box is fully on-canvas and clear of earlier words. A word
/// that finds no spot is retried smaller, and dropped once it would go
/// below the minimum font size.
pub fn layout(table: &FrequencyTable, options: &LayoutOptions) -> Vec<Placement> {
    let max_count = table.max_count();
    if max_count == 0 || options.width == 0 || options.height == 0 {
        return Vec::new();
    }

    // No glyph can be taller than the canvas.
    let limit = options.width.min(options.height) as f32;
    let min_size = options.min_font_size.max(1.0).min(limit);
    let max_size = options.max_font_size.min(limit).max(min_size);
    let start_angle = ((options.seed % 360) as f64).to_radians();

    let mut placed: Vec<Placement> = Vec::with_capacity(table.len());

    for (rank, entry) in table.iter().enumerate() {
        let ratio = entry.count as f32 / max_count as f32;
        let mut size = min_size + (max_size - min_size) * ratio.sqrt();
        let mut landed = false;

        while size >= min_size {
            let (width, height) = measure(&entry.word, size);
            if let Some((x, y)) = find_spot(width, height, &placed, options, start_angle) {
                placed.push(Placement {
                    word: entry.word.clone(),
                    count: entry.count,
                    font_size: size,
                    x,
                    y,
                    width,
                    height,
                    color: palette_color(rank, options.seed),
                });
                landed = true;
                break;
            }
            size *= SHRINK;
        }

        if !landed {
            tracing::debug!(word = %entry.word, count = entry.count, "No room left on canvas, word dropped");
        }
    }

    placed
}

/// Padded box for `word` at `size`: wide glyphs take 1 em, narrow ones ½ em.
fn measure(word: &str, size: f32) -> (u32, u32) {
    let columns = display_width(word).max(1) as f32;
    let width = ((columns * size * 0.5).ceil() as u32).saturating_add(2 * PADDING);
    let height = (size.ceil() as u32).saturating_add(2 * PADDING);
    (width, height)
}

fn find_spot(
    width: u32,
    height: u32,
    placed: &[Placement],
    options: &LayoutOptions,
    start_angle: f64,
) -> Option<(u32, u32)> {
    if width > options.width || height > options.height {
        return None;
    }

    let cx = options.width as f64 / 2.0;
    let cy = options.height as f64 / 2.0;
    let aspect = options.width as f64 / options.height as f64;
    // Spiral radius is measured in y units; x is stretched by `aspect`.
    let max_radius = (cx / aspect).hypot(cy);

    let mut t = 0.0f64;
    loop {
        let radius = SPIRAL_PITCH * t;
        if radius > max_radius {
            return None;
        }

        let angle = start_angle + t;
        let left = cx + radius * aspect * angle.cos() - width as f64 / 2.0;
        let top = cy + radius * angle.sin() - height as f64 / 2.0;

        if left >= 0.0 && top >= 0.0 {
            let x = left.round() as u32;
            let y = top.round() as u32;
            if x + width <= options.width
                && y + height <= options.height
                && !placed.iter().any(|p| p.overlaps(x, y, width, height))
            {
                return Some((x, y));
            }
        }

        t += (ARC_STEP / radius.max(ARC_STEP)).min(0.5);
    }
}

fn palette_color(rank: usize, seed: u64) -> [u8; 3] {
    let offset = (seed % PALETTE.len() as u64) as usize;
    PALETTE[(rank + offset) % PALETTE.len()]
}
