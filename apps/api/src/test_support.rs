//! Fakes shared by unit tests across modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::analysis::feedback::FeedbackProvider;
use crate::errors::AppError;
use crate::llm_client::LlmResponse;
use crate::render::{PageRasterizer, RenderError};
use crate::storage::{blob_path, BlobStore, StoredBlob};

/// Builds a one-page PDF whose MediaBox is `width` x `height` points.
pub fn sample_pdf(width: u32, height: u32) -> Vec<u8> {
    let content = "BT /F1 12 Tf 20 20 Td (Jane Doe) Tj ET";
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {width} {height}] \
             /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>"
        ),
        format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_at = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    pdf
}

// ────────────────────────────────────────────────────────────────────────────
// Blob stores
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryBlobStore {
    pub fn insert(&self, path: &str, data: Bytes) {
        self.blobs.lock().insert(path.to_string(), data);
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        name: &str,
        _content_type: &str,
        data: Bytes,
    ) -> Result<StoredBlob, AppError> {
        let path = blob_path(name);
        let size = data.len() as u64;
        self.insert(&path, data);
        Ok(StoredBlob {
            path,
            name: name.to_string(),
            size,
        })
    }

    async fn read(&self, path: &str) -> Result<Option<Bytes>, AppError> {
        Ok(self.blobs.lock().get(path).cloned())
    }
}

/// Reads block until `open` releases them, one permit per read.
#[derive(Clone)]
pub struct GatedBlobStore {
    inner: MemoryBlobStore,
    gate: Arc<Semaphore>,
}

impl GatedBlobStore {
    pub fn new(inner: MemoryBlobStore) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    pub fn open(&self, reads: usize) {
        self.gate.add_permits(reads);
    }
}

#[async_trait]
impl BlobStore for GatedBlobStore {
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredBlob, AppError> {
        self.inner.upload(name, content_type, data).await
    }

    async fn read(&self, path: &str) -> Result<Option<Bytes>, AppError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        permit.forget();
        self.inner.read(path).await
    }
}

/// Fails the n-th upload (1-based); every other call goes to memory.
#[derive(Clone)]
pub struct FailingBlobStore {
    inner: MemoryBlobStore,
    fail_on: usize,
    uploads: Arc<AtomicUsize>,
}

impl FailingBlobStore {
    pub fn fail_on_upload(n: usize) -> Self {
        Self {
            inner: MemoryBlobStore::default(),
            fail_on: n,
            uploads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredBlob, AppError> {
        let attempt = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_on {
            return Err(AppError::Storage(format!("upload of {name} rejected")));
        }
        self.inner.upload(name, content_type, data).await
    }

    async fn read(&self, path: &str) -> Result<Option<Bytes>, AppError> {
        self.inner.read(path).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rasterizer and AI
// ────────────────────────────────────────────────────────────────────────────

pub enum StubRasterizer {
    Blank { width: u32, height: u32 },
    Failing(Box<dyn Fn() -> RenderError + Send + Sync>),
}

impl StubRasterizer {
    pub fn blank(width: u32, height: u32) -> Self {
        StubRasterizer::Blank { width, height }
    }

    pub fn failing<F>(make_error: F) -> Self
    where
        F: Fn() -> RenderError + Send + Sync + 'static,
    {
        StubRasterizer::Failing(Box::new(make_error))
    }
}

impl PageRasterizer for StubRasterizer {
    fn rasterize(&self, _pdf: &[u8], _page: usize, _scale: f32) -> Result<RgbImage, RenderError> {
        match self {
            StubRasterizer::Blank { width, height } => {
                Ok(RgbImage::from_pixel(*width, *height, Rgb([255, 255, 255])))
            }
            StubRasterizer::Failing(make_error) => Err(make_error()),
        }
    }
}

/// Records every request and replies with canned text, or with `None` when
/// built with `unavailable`.
#[derive(Clone)]
pub struct StubFeedback {
    reply: Option<String>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl StubFeedback {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            calls: Arc::default(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            reply: None,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl FeedbackProvider for StubFeedback {
    async fn feedback(
        &self,
        resume_path: &str,
        instructions: &str,
    ) -> Result<Option<LlmResponse>, AppError> {
        self.calls
            .lock()
            .push((resume_path.to_string(), instructions.to_string()));
        Ok(self.reply.as_deref().map(LlmResponse::from_text))
    }
}
