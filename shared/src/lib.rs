use serde::{Deserialize, Serialize};

/// A single detection returned by the vision provider.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Prediction {
    pub class: String,
    pub confidence: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ImageMeta {
    pub width: u32,
    pub height: u32,
}

/// Raw classification payload from the vision provider, kept exactly as
/// received. A payload without a `predictions` array is malformed.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClassificationResult {
    pub predictions: Vec<Prediction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

/// Provider confidence: either a 0.0..=1.0 ratio or a percentage string
/// that was already formatted upstream.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Confidence {
    Ratio(f32),
    Text(String),
}

impl Confidence {
    /// Render as an integer percentage. Pre-formatted strings pass through
    /// unchanged, so formatting is idempotent.
    pub fn format(&self) -> String {
        match self {
            Confidence::Ratio(value) => format!("{}%", (value * 100.0).round() as i64),
            Confidence::Text(text) if text.contains('%') => text.clone(),
            Confidence::Text(text) => format!("{}%", text),
        }
    }
}

/// Coarse triage bucket derived from the condition name.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Moderate,
    High,
}

/// Prose sections generated by the detailed-analysis service. Field names
/// match the JSON the language model is asked to produce.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DetailedAnalysis {
    pub overview: String,
    pub detection_details: String,
    pub recommendations: String,
    pub important_notes: String,
    pub next_steps: String,
}

/// Normalized, display-ready detection outcome. Condition and advice are
/// never empty; construction is deterministic from a ClassificationResult
/// plus the knowledge base.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalResult {
    pub condition: String,
    pub confidence: String,
    pub advice: String,
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatments: Option<Vec<String>>,
    pub similar_conditions: Vec<String>,
    #[serde(default)]
    pub detections: Vec<Prediction>,
    #[serde(default)]
    pub previsit_care: Vec<String>,
    #[serde(default)]
    pub visit_preparation: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_analysis: Option<DetailedAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hash: Option<String>,
}

/// HTTP envelope returned by the analyze endpoint.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectionResponse {
    pub success: bool,
    pub result: CanonicalResult,
    #[serde(default)]
    pub message: String,
}
