use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::ViewContext;
use crate::errors::AppError;
use crate::models::resume::{resume_key, ResumeRecord};
use crate::previews::{PreviewCell, PreviewSlot};
use crate::render::PNG_MIME;

/// One entry in the resume list: summary plus a thumbnail of page one.
pub struct ResumeCardView {
    ctx: ViewContext,
    record: ResumeRecord,
    image: PreviewSlot,
    image_cell: PreviewCell,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSnapshot {
    pub id: Uuid,
    pub company_name: String,
    pub job_title: String,
    pub overall_score: Option<f64>,
    pub image_url: Option<String>,
    pub image_error: Option<String>,
}

impl ResumeCardView {
    /// Mounts a card for `record` and starts loading its thumbnail.
    pub fn mount(ctx: &ViewContext, record: ResumeRecord) -> Self {
        let image_cell = PreviewCell::default();
        let mut image = PreviewSlot::new(
            ctx.blobs.clone(),
            ctx.previews.clone(),
            PNG_MIME,
            Arc::new(image_cell.clone()),
        );
        image.set_source(&record.image_path);
        Self {
            ctx: ctx.clone(),
            record,
            image,
            image_cell,
        }
    }

    pub async fn settled(&mut self) {
        self.image.settled().await;
    }

    /// Re-reads the record. A changed `imagePath` releases the old thumbnail
    /// and loads the new one; a vanished record leaves the card as it was.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        let id = self.record.id;
        let Some(raw) = self.ctx.kv.get(&resume_key(&id)).await? else {
            warn!("Resume {id} disappeared while its card was mounted");
            return Ok(());
        };
        let record: ResumeRecord = serde_json::from_str(&raw)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt record {id}: {e}")))?;

        self.image.set_source(&record.image_path);
        self.record = record;
        self.image.settled().await;
        Ok(())
    }

    pub fn snapshot(&self) -> CardSnapshot {
        let image = self.image_cell.snapshot();
        CardSnapshot {
            id: self.record.id,
            company_name: self.record.company_name.clone(),
            job_title: self.record.job_title.clone(),
            overall_score: self.record.feedback.overall_score(),
            image_url: image.url,
            image_error: image.error,
        }
    }
}
