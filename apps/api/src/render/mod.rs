//! PDF → PNG preview conversion.
//!
//! `convert_pdf_to_image` never fails with `Err`: every stage failure becomes a
//! `PdfConversionResult` with no file and an error message. Callers must check
//! `file` before using the result.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::{DynamicImage, RgbImage};
use tracing::{error, info};

use crate::previews::PreviewRegistry;

pub mod rasterizer;

pub use rasterizer::{MupdfRasterizer, PageRasterizer, RenderError};

pub const PNG_MIME: &str = "image/png";
pub const PDF_MIME: &str = "application/pdf";

/// An uploaded or generated file held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfConversionResult {
    /// Object URL of the PNG; empty on failure.
    pub image_url: String,
    pub file: Option<UploadFile>,
    pub error: Option<String>,
}

impl PdfConversionResult {
    fn failed(err: RenderError) -> Self {
        Self {
            image_url: String::new(),
            file: None,
            error: Some(err.to_string()),
        }
    }
}

/// Renders page 1 of `file` at `scale` and registers the PNG as an object URL.
pub async fn convert_pdf_to_image(
    rasterizer: Arc<dyn PageRasterizer>,
    previews: &PreviewRegistry,
    file: &UploadFile,
    scale: f32,
) -> PdfConversionResult {
    let data = file.data.clone();
    let rendered = tokio::task::spawn_blocking(move || {
        let page = rasterizer.rasterize(&data, 0, scale)?;
        encode_png(page)
    })
    .await
    .map_err(|e| RenderError::Task(e.to_string()))
    .and_then(|r| r);

    let png = match rendered {
        Ok(png) => png,
        Err(e) => {
            error!("convert_pdf_to_image failed for {}: {e}", file.name);
            return PdfConversionResult::failed(e);
        }
    };

    let image_file = UploadFile {
        name: png_file_name(&file.name),
        content_type: PNG_MIME.to_string(),
        data: png,
    };
    info!(
        "Rendered {} to {} ({} bytes)",
        file.name,
        image_file.name,
        image_file.data.len()
    );

    PdfConversionResult {
        image_url: previews.create_object_url(image_file.data.clone(), PNG_MIME),
        file: Some(image_file),
        error: None,
    }
}

fn encode_png(page: RgbImage) -> Result<Bytes, RenderError> {
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(page)
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(Bytes::from(output))
}

/// `resume.pdf` → `resume.png`; names without an extension get `.png` appended.
pub fn png_file_name(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };
    format!("{stem}.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_pdf, StubRasterizer};

    fn pdf_file(name: &str, data: Vec<u8>) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            content_type: PDF_MIME.to_string(),
            data: Bytes::from(data),
        }
    }

    #[test]
    fn test_png_file_name() {
        assert_eq!(png_file_name("resume.pdf"), "resume.png");
        assert_eq!(png_file_name("Resume.PDF"), "Resume.png");
        assert_eq!(png_file_name("cv.final.pdf"), "cv.final.png");
        assert_eq!(png_file_name("resume"), "resume.png");
    }

    #[tokio::test]
    async fn test_valid_pdf_yields_png_file_and_url() {
        let previews = PreviewRegistry::new();
        let file = pdf_file("jane_doe.pdf", sample_pdf(200, 100));

        let result =
            convert_pdf_to_image(Arc::new(MupdfRasterizer), &previews, &file, 2.0).await;

        assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
        let image = result.file.expect("png file");
        assert_eq!(image.name, "jane_doe.png");
        assert_eq!(image.content_type, PNG_MIME);
        assert!(image.data.starts_with(b"\x89PNG"));
        assert!(!result.image_url.is_empty());
        assert!(previews.contains(&result.image_url));

        let decoded = image::load_from_memory(&image.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 200));
    }

    #[tokio::test]
    async fn test_invalid_pdf_returns_error_value() {
        let previews = PreviewRegistry::new();
        let file = pdf_file("notes.pdf", b"hello, world".to_vec());

        let result =
            convert_pdf_to_image(Arc::new(MupdfRasterizer), &previews, &file, 2.0).await;

        assert!(result.file.is_none());
        assert!(result.image_url.is_empty());
        assert!(!result.error.unwrap_or_default().is_empty());
        assert_eq!(previews.live_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_surface_fails_gracefully() {
        let previews = PreviewRegistry::new();
        let file = pdf_file("resume.pdf", sample_pdf(200, 100));
        let rasterizer = StubRasterizer::failing(|| RenderError::SurfaceUnavailable {
            width: 0,
            height: 0,
        });

        let result = convert_pdf_to_image(Arc::new(rasterizer), &previews, &file, 2.0).await;

        assert!(result.file.is_none());
        let error = result.error.unwrap();
        assert!(error.contains("surface unavailable"), "{error}");
    }
}
