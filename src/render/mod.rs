//! Word cloud rendering.
//!
//! Layout and rasterization are separate steps: `layout` decides where
//! every word goes (deterministic for a given seed), `raster` paints the
//! result and encodes it as PNG.

mod layout;
mod raster;

use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use image::Rgb;
use thiserror::Error;

use crate::analysis::FrequencyTable;
use crate::config::CloudConfig;

pub use layout::{layout, LayoutOptions, Placement};
pub use raster::{encode_png, rasterize};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to read font '{}': {source}", .path.display())]
    FontIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unsupported font file '{}'", .0.display())]
    InvalidFont(PathBuf),
    #[error("Invalid colour '{0}': expected #rrggbb")]
    InvalidColor(String),
    #[error("Canvas must be at least 1x1, got {0}x{1}")]
    EmptyCanvas(u32, u32),
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// A rendered cloud: PNG bytes plus where each word went.
#[derive(Debug, Clone)]
pub struct RenderedCloud {
    pub png: Vec<u8>,
    pub placements: Vec<Placement>,
}

pub struct Renderer {
    layout: LayoutOptions,
    background: Rgb<u8>,
    font: Option<FontArc>,
}

impl Renderer {
    /// White background, no font.
    pub fn new(layout: LayoutOptions) -> Result<Self, RenderError> {
        if layout.width == 0 || layout.height == 0 {
            return Err(RenderError::EmptyCanvas(layout.width, layout.height));
        }
        Ok(Self {
            layout,
            background: Rgb([255, 255, 255]),
            font: None,
        })
    }

    pub fn background(mut self, background: Rgb<u8>) -> Self {
        self.background = background;
        self
    }

    pub fn font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Build from `[cloud]` settings. `font_path` is the resolved
    /// `cloud.font_path`; a missing file falls back to word blocks, an
    /// unreadable or invalid one is an error.
    pub fn from_config(config: &CloudConfig, font_path: Option<&Path>) -> Result<Self, RenderError> {
        let mut renderer = Self::new(LayoutOptions {
            width: config.width,
            height: config.height,
            min_font_size: config.min_font_size,
            max_font_size: config.max_font_size,
            seed: config.seed,
        })?
        .background(parse_hex_color(&config.background)?);

        match font_path {
            Some(path) if path.exists() => {
                renderer = renderer.font(load_font(path)?);
                tracing::debug!(path = %path.display(), "Loaded word cloud font");
            }
            Some(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "Font file not found, word cloud will show word blocks instead of glyphs"
                );
            }
            None => {
                tracing::warn!("No font configured, word cloud will show word blocks instead of glyphs");
            }
        }
        Ok(renderer)
    }

    pub fn render(&self, table: &FrequencyTable) -> Result<RenderedCloud, RenderError> {
        let placements = layout(table, &self.layout);
        let image = rasterize(
            &placements,
            self.layout.width,
            self.layout.height,
            self.background,
            self.font.as_ref(),
        );
        let png = encode_png(&image)?;

        tracing::debug!(
            words = table.len(),
            placed = placements.len(),
            bytes = png.len(),
            "Rendered word cloud"
        );
        Ok(RenderedCloud { png, placements })
    }
}

/// Load a TrueType/OpenType font. CJK text needs a CJK-capable font.
pub fn load_font(path: &Path) -> Result<FontArc, RenderError> {
    let bytes = std::fs::read(path).map_err(|source| RenderError::FontIo {
        path: path.to_path_buf(),
        source,
    })?;
    FontArc::try_from_vec(bytes).map_err(|_| RenderError::InvalidFont(path.to_path_buf()))
}

/// Parse `#rrggbb` (the `#` is optional).
pub fn parse_hex_color(s: &str) -> Result<Rgb<u8>, RenderError> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(RenderError::InvalidColor(s.to_string()));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| RenderError::InvalidColor(s.to_string()))
    };
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}
