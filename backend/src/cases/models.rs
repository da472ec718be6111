use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::Urgency;
use uuid::Uuid;

/// A saved record of one past analysis, kept for the session history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: Uuid,
    pub condition: String,
    pub confidence: String,
    pub advice: String,
    pub urgency: Urgency,
    pub image_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_label: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Client-submitted payload for saving a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCase {
    pub condition: String,
    pub confidence: String,
    pub advice: String,
    pub urgency: Urgency,
    pub image_ref: String,
    #[serde(default)]
    pub file_size_label: Option<String>,
}

impl Case {
    pub fn new(new_case: NewCase) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            condition: new_case.condition,
            confidence: new_case.confidence,
            advice: new_case.advice,
            urgency: new_case.urgency,
            image_ref: new_case.image_ref,
            file_size_label: new_case.file_size_label,
            created_at: now,
        }
    }
}
