//! Image production: formatting, layout and rasterization.

pub mod format;
pub mod layout;
pub mod raster;

use crate::types::{PipelineError, RenderedImage};

pub use layout::Scene;
pub use raster::Rasterizer;

/// Turns a laid-out scene into image bytes.
pub trait ImageRenderer: Send {
    fn render(&mut self, scene: &Scene) -> Result<RenderedImage, PipelineError>;
}
