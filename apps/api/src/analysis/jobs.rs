//! In-process tracker for running upload flows, polled by clients for progress.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::analysis::upload_flow::{
    AnalyzeRequest, FlowOutcome, StatusSink, UploadFlow, ERR_UNEXPECTED,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub statuses: Vec<String>,
    pub current: Option<String>,
    pub preview_url: Option<String>,
    pub outcome: Option<FlowOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Default)]
pub struct UploadJobs {
    jobs: Arc<RwLock<HashMap<Uuid, JobSnapshot>>>,
}

impl UploadJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> JobHandle {
        let job_id = Uuid::new_v4();
        self.jobs.write().insert(
            job_id,
            JobSnapshot {
                job_id,
                statuses: Vec::new(),
                current: None,
                preview_url: None,
                outcome: None,
                started_at: Utc::now(),
                finished_at: None,
            },
        );
        JobHandle {
            job_id,
            jobs: self.clone(),
        }
    }

    pub fn get(&self, job_id: &Uuid) -> Option<JobSnapshot> {
        self.jobs.read().get(job_id).cloned()
    }

    fn update(&self, job_id: &Uuid, f: impl FnOnce(&mut JobSnapshot)) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            f(job);
        }
    }
}

/// Write side of one job; handed to the flow as its `StatusSink`.
#[derive(Clone)]
pub struct JobHandle {
    job_id: Uuid,
    jobs: UploadJobs,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.job_id
    }

    /// Runs the flow on its own task and records the outcome. A panicking
    /// flow still finishes the job, as an abort.
    pub async fn track(self, flow: UploadFlow, request: AnalyzeRequest) {
        let sink = self.clone();
        let outcome = match tokio::spawn(async move { flow.run(request, &sink).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Upload job {} stopped: {e}", self.job_id);
                self.report(ERR_UNEXPECTED);
                FlowOutcome::Aborted {
                    status: ERR_UNEXPECTED.to_string(),
                }
            }
        };
        self.finish(outcome);
    }

    pub fn finish(&self, outcome: FlowOutcome) {
        self.jobs.update(&self.job_id, |job| {
            job.outcome = Some(outcome);
            job.finished_at = Some(Utc::now());
        });
    }
}

impl StatusSink for JobHandle {
    fn report(&self, status: &str) {
        self.jobs.update(&self.job_id, |job| {
            job.statuses.push(status.to_string());
            job.current = Some(status.to_string());
        });
    }

    fn preview(&self, url: Option<&str>) {
        self.jobs.update(&self.job_id, |job| {
            job.preview_url = url.map(String::from);
        });
    }
}
