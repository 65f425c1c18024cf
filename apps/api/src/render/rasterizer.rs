//! Page rasterization backed by MuPDF.
//!
//! MuPDF documents are not `Send`; every call opens the document from bytes,
//! renders, and drops it on the calling (blocking) thread.

use image::RgbImage;
use mupdf::{Colorspace, Document, Matrix};
use thiserror::Error;

/// Largest surface edge we allocate, in pixels.
pub const MAX_SURFACE_EDGE: u32 = 16_384;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("File is not a PDF document")]
    NotAPdf,

    #[error("Failed to open PDF: {0}")]
    Open(String),

    #[error("PDF has no pages")]
    NoPages,

    #[error("Drawing surface unavailable for a {width}x{height} viewport")]
    SurfaceUnavailable { width: u32, height: u32 },

    #[error("Failed to render page: {0}")]
    Render(String),

    #[error("Failed to create image blob: {0}")]
    Encode(String),

    #[error("Render task failed: {0}")]
    Task(String),
}

/// Pixel size of a page at a given scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

impl Viewport {
    pub fn new(page_width: f32, page_height: f32, scale: f32) -> Self {
        Self {
            width: to_pixels(page_width * scale),
            height: to_pixels(page_height * scale),
            scale,
        }
    }

    /// Fails when no surface can be allocated for this viewport.
    pub fn check_surface(&self) -> Result<(), RenderError> {
        let usable = self.width > 0
            && self.height > 0
            && self.width <= MAX_SURFACE_EDGE
            && self.height <= MAX_SURFACE_EDGE;
        if usable {
            Ok(())
        } else {
            Err(RenderError::SurfaceUnavailable {
                width: self.width,
                height: self.height,
            })
        }
    }
}

fn to_pixels(v: f32) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.ceil().min(u32::MAX as f32) as u32
    } else {
        0
    }
}

/// Renders one page of a PDF into an RGB raster.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf: &[u8], page_index: usize, scale: f32) -> Result<RgbImage, RenderError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MupdfRasterizer;

impl PageRasterizer for MupdfRasterizer {
    fn rasterize(&self, pdf: &[u8], page_index: usize, scale: f32) -> Result<RgbImage, RenderError> {
        if !pdf.starts_with(PDF_MAGIC) {
            return Err(RenderError::NotAPdf);
        }

        let doc = Document::from_bytes(pdf, "application/pdf")
            .map_err(|e| RenderError::Open(e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| RenderError::Open(e.to_string()))?;
        if page_count <= page_index as i32 {
            return Err(RenderError::NoPages);
        }

        let page = doc
            .load_page(page_index as i32)
            .map_err(|e| RenderError::Render(e.to_string()))?;
        let bounds = page
            .bounds()
            .map_err(|e| RenderError::Render(e.to_string()))?;

        let viewport = Viewport::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0, scale);
        viewport.check_surface()?;

        let matrix = Matrix::new_scale(scale, scale);
        let pixmap = page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), false, true)
            .map_err(|e| RenderError::Render(e.to_string()))?;

        pixmap_to_rgb(&pixmap)
    }
}

fn pixmap_to_rgb(pixmap: &mupdf::Pixmap) -> Result<RgbImage, RenderError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(RenderError::Render(format!(
            "unexpected pixmap with {n} components"
        )));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let pixel = samples
                .get(offset..offset + 3)
                .unwrap_or(&[255, 255, 255]);
            rgb.extend_from_slice(pixel);
        }
    }

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| RenderError::Render("pixmap size mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_pdf;

    #[test]
    fn test_viewport_scales_and_rounds_up() {
        let viewport = Viewport::new(612.0, 792.5, 2.0);
        assert_eq!(viewport.width, 1224);
        assert_eq!(viewport.height, 1585);
        assert!(viewport.check_surface().is_ok());
    }

    #[test]
    fn test_oversized_or_empty_viewport_has_no_surface() {
        assert!(matches!(
            Viewport::new(10_000.0, 100.0, 2.0).check_surface(),
            Err(RenderError::SurfaceUnavailable { .. })
        ));
        assert!(matches!(
            Viewport::new(0.0, 100.0, 2.0).check_surface(),
            Err(RenderError::SurfaceUnavailable { .. })
        ));
    }

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let err = MupdfRasterizer
            .rasterize(b"definitely not a pdf", 0, 2.0)
            .unwrap_err();
        assert!(matches!(err, RenderError::NotAPdf));
    }

    #[test]
    fn test_renders_first_page_at_double_scale() {
        let image = MupdfRasterizer.rasterize(&sample_pdf(200, 100), 0, 2.0).unwrap();
        assert_eq!(image.width(), 400);
        assert_eq!(image.height(), 200);
    }
}
