//! Rasterizer: draws a `Scene` onto an RGBA canvas and encodes it as PNG.
//!
//! Fonts (`GothicA1-Black.ttf`, `GothicA1-Regular.ttf`) and crests
//! (`<ABBR>_light.png`) are read from local directories the first time
//! they are needed and kept for the lifetime of the rasterizer.

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::layout::{Align, DrawOp, FontWeight, Scene};
use super::ImageRenderer;
use crate::config::AssetsConfig;
use crate::types::{PipelineError, RenderedImage};

fn font_file(weight: FontWeight) -> &'static str {
    match weight {
        FontWeight::Regular => "GothicA1-Regular.ttf",
        FontWeight::Black => "GothicA1-Black.ttf",
    }
}

pub struct Rasterizer {
    fonts_dir: PathBuf,
    crests_dir: PathBuf,
    fonts: HashMap<FontWeight, FontVec>,
    crests: HashMap<String, RgbaImage>,
}

impl Rasterizer {
    pub fn new(fonts_dir: impl Into<PathBuf>, crests_dir: impl Into<PathBuf>) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
            crests_dir: crests_dir.into(),
            fonts: HashMap::new(),
            crests: HashMap::new(),
        }
    }

    pub fn from_config(assets: &AssetsConfig) -> Self {
        Self::new(&assets.fonts_dir, &assets.crests_dir)
    }

    fn load_font(dir: &Path, weight: FontWeight) -> Result<FontVec, PipelineError> {
        let path = dir.join(font_file(weight));
        let bytes = std::fs::read(&path)
            .map_err(|e| PipelineError::Render(format!("Cannot read font {}: {e}", path.display())))?;
        debug!(path = %path.display(), "Loaded font");
        FontVec::try_from_vec(bytes)
            .map_err(|e| PipelineError::Render(format!("Invalid font {}: {e}", path.display())))
    }

    fn font(&mut self, weight: FontWeight) -> Result<&FontVec, PipelineError> {
        if !self.fonts.contains_key(&weight) {
            let font = Self::load_font(&self.fonts_dir, weight)?;
            self.fonts.insert(weight, font);
        }
        self.fonts
            .get(&weight)
            .ok_or_else(|| PipelineError::Render("Font cache miss".into()))
    }

    fn crest(&mut self, team: &str) -> Result<&RgbaImage, PipelineError> {
        if !self.crests.contains_key(team) {
            let path = self.crests_dir.join(format!("{team}_light.png"));
            let crest = image::open(&path)
                .map_err(|e| PipelineError::Render(format!("Cannot load crest {}: {e}", path.display())))?
                .to_rgba8();
            debug!(path = %path.display(), "Loaded crest");
            self.crests.insert(team.to_string(), crest);
        }
        self.crests
            .get(team)
            .ok_or_else(|| PipelineError::Render("Crest cache miss".into()))
    }

    fn draw(&mut self, canvas: &mut RgbaImage, op: &DrawOp) -> Result<(), PipelineError> {
        match op {
            DrawOp::FillRect {
                x,
                y,
                width,
                height,
                color,
            } => {
                if *width > 0 && *height > 0 {
                    draw_filled_rect_mut(canvas, Rect::at(*x, *y).of_size(*width, *height), Rgba(color.0));
                }
            }
            DrawOp::Rule {
                x0,
                x1,
                y,
                color,
                dashed,
            } => {
                if *y < 0 || *y as u32 >= canvas.height() {
                    return Ok(());
                }
                let step = if *dashed { 2 } else { 1 };
                for x in ((*x0).max(0)..*x1).step_by(step) {
                    if (x as u32) < canvas.width() {
                        canvas.put_pixel(x as u32, *y as u32, Rgba(color.0));
                    }
                }
            }
            DrawOp::Text {
                text,
                x,
                baseline,
                size,
                weight,
                align,
                color,
            } => {
                let scale = PxScale::from(*size);
                let font = self.font(*weight)?;
                let (width, _) = text_size(scale, font, text);
                let left = match align {
                    Align::Left => *x,
                    Align::Center => *x - width as i32 / 2,
                    Align::Right => *x - width as i32,
                };
                let top = *baseline - font.as_scaled(scale).ascent().round() as i32;
                draw_text_mut(canvas, Rgba(color.0), left, top, scale, font, text);
            }
            DrawOp::Crest { team, x, y, size } => {
                let crest = self.crest(team)?;
                let scaled = imageops::resize(crest, *size, *size, FilterType::Triangle);
                imageops::overlay(canvas, &scaled, i64::from(*x), i64::from(*y));
            }
        }
        Ok(())
    }
}

impl ImageRenderer for Rasterizer {
    fn render(&mut self, scene: &Scene) -> Result<RenderedImage, PipelineError> {
        let mut canvas = RgbaImage::from_pixel(scene.width, scene.height, Rgba(scene.background.0));
        for op in &scene.ops {
            self.draw(&mut canvas, op)?;
        }

        let mut bytes = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| PipelineError::Render(format!("PNG encoding failed: {e}")))?;
        debug!(width = scene.width, height = scene.height, bytes = bytes.len(), "Rendered image");
        Ok(RenderedImage::new(bytes))
    }
}
