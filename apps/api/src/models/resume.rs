use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Key under which a resume record is stored.
pub fn resume_key(id: &Uuid) -> String {
    format!("{RESUME_KEY_PREFIX}{id}")
}

pub const RESUME_KEY_PREFIX: &str = "resume:";

/// One uploaded resume and, once analysis finishes, its feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: Uuid,
    pub resume_path: String,
    pub image_path: String,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub feedback: FeedbackState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ResumeRecord {
    pub fn is_complete(&self) -> bool {
        self.feedback.is_ready()
    }
}

/// Stored as `""` while analysis is pending and as the AI's JSON object after.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FeedbackState {
    #[default]
    Pending,
    Ready(Map<String, Value>),
}

impl From<Value> for FeedbackState {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => FeedbackState::Ready(map),
            _ => FeedbackState::Pending,
        }
    }
}

impl From<FeedbackState> for Value {
    fn from(state: FeedbackState) -> Self {
        match state {
            FeedbackState::Pending => Value::String(String::new()),
            FeedbackState::Ready(map) => Value::Object(map),
        }
    }
}

impl FeedbackState {
    pub fn is_ready(&self) -> bool {
        matches!(self, FeedbackState::Ready(_))
    }

    /// `overallScore`, when analysis has produced a numeric one.
    pub fn overall_score(&self) -> Option<f64> {
        match self {
            FeedbackState::Ready(map) => map.get("overallScore").and_then(Value::as_f64),
            FeedbackState::Pending => None,
        }
    }

    /// The `ATS` section with the display defaults applied.
    pub fn ats(&self) -> AtsSection {
        let section = match self {
            FeedbackState::Ready(map) => map.get("ATS"),
            FeedbackState::Pending => None,
        };
        section
            .cloned()
            .and_then(|v| serde_json::from_value::<AtsSection>(v).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AtsSection {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub tips: Vec<FeedbackTip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackTip {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub tip: String,
}
