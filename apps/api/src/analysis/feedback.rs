//! AI feedback: the inference collaborator behind step 5 of the upload flow.
//!
//! `FeedbackProvider` mirrors the platform call the flow depends on: a resume
//! path plus an instruction string in, a chat-style response out. `AppState`
//! carries an `Arc<dyn FeedbackProvider>`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::analysis::prompts::FEEDBACK_SYSTEM;
use crate::errors::AppError;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{strip_json_fences, LlmClient, LlmResponse};
use crate::storage::BlobStore;

/// Resume text beyond this many characters is not sent to the model.
const MAX_RESUME_CHARS: usize = 60_000;

#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    /// `Ok(None)` when the resume at `resume_path` cannot be found.
    async fn feedback(
        &self,
        resume_path: &str,
        instructions: &str,
    ) -> Result<Option<LlmResponse>, AppError>;
}

/// Reads the stored PDF, extracts its text and asks Claude for feedback.
pub struct LlmFeedbackProvider {
    llm: LlmClient,
    blobs: Arc<dyn BlobStore>,
}

impl LlmFeedbackProvider {
    pub fn new(llm: LlmClient, blobs: Arc<dyn BlobStore>) -> Self {
        Self { llm, blobs }
    }
}

#[async_trait]
impl FeedbackProvider for LlmFeedbackProvider {
    async fn feedback(
        &self,
        resume_path: &str,
        instructions: &str,
    ) -> Result<Option<LlmResponse>, AppError> {
        let Some(pdf) = self.blobs.read(resume_path).await? else {
            warn!("Resume {resume_path} not found for analysis");
            return Ok(None);
        };

        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
            .await
            .map_err(|e| AppError::Render(format!("text extraction task failed: {e}")))?
            .map_err(|e| AppError::Render(format!("text extraction failed: {e}")))?;

        let text = truncate_chars(text.trim(), MAX_RESUME_CHARS);
        info!(
            "Requesting feedback for {resume_path} ({} chars of resume text)",
            text.len()
        );

        let prompt = format!("{instructions}\n\nRESUME:\n{text}");
        let system = format!("{FEEDBACK_SYSTEM} {JSON_ONLY_SYSTEM}");
        let response = self
            .llm
            .call(&prompt, &system)
            .await
            .map_err(|e| AppError::Llm(format!("Feedback request failed: {e}")))?;

        Ok(Some(response))
    }
}

/// Parses the model's message content into a feedback object.
/// Code fences are tolerated; anything that is not a JSON object is rejected.
pub fn parse_feedback(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(strip_json_fences(text)) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
