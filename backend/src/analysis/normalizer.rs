use shared::{CanonicalResult, ClassificationResult, Confidence, Prediction, Urgency};

use super::knowledge::{KnowledgeBase, KnowledgeEntry};

const HIGH_URGENCY_KEYWORDS: &[&str] = &["melanoma", "carcinoma", "skin cancer"];
const MODERATE_URGENCY_KEYWORDS: &[&str] =
    &["psoriasis", "eczema", "dermatitis", "lupus", "vasculitis"];

/// Map a raw classification into the display-ready canonical result.
/// Pure function of the payload and the static tables.
pub fn normalize(raw: &ClassificationResult, knowledge: &KnowledgeBase) -> CanonicalResult {
    let Some(top) = top_prediction(&raw.predictions) else {
        return no_detection_result(knowledge);
    };

    let entry = knowledge.resolve(&top.class);
    let confidence = Confidence::Ratio(top.confidence).format();
    build_result(entry, confidence, raw, knowledge)
}

/// The maximum-confidence prediction; ties keep the first occurrence.
pub fn top_prediction(predictions: &[Prediction]) -> Option<&Prediction> {
    let mut best: Option<&Prediction> = None;
    for candidate in predictions {
        match best {
            Some(current) if candidate.confidence <= current.confidence => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Substring triage against the fixed keyword sets, high tier first.
pub fn classify_urgency(condition: &str) -> Urgency {
    let lowered = condition.to_lowercase();
    if HIGH_URGENCY_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        Urgency::High
    } else if MODERATE_URGENCY_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        Urgency::Moderate
    } else {
        Urgency::Low
    }
}

fn no_detection_result(knowledge: &KnowledgeBase) -> CanonicalResult {
    let entry = knowledge.no_detection().clone();
    let empty = ClassificationResult {
        predictions: Vec::new(),
        image: None,
        time: None,
    };
    build_result(entry, "0%".to_string(), &empty, knowledge)
}

fn build_result(
    entry: KnowledgeEntry,
    confidence: String,
    raw: &ClassificationResult,
    knowledge: &KnowledgeBase,
) -> CanonicalResult {
    let condition = entry.name;
    CanonicalResult {
        confidence,
        advice: entry.advice,
        urgency: classify_urgency(&condition),
        overview: Some(entry.overview),
        urgency_note: Some(entry.urgency_note),
        care: Some(entry.care),
        symptoms: non_empty(entry.symptoms),
        causes: non_empty(entry.causes),
        treatments: non_empty(entry.treatments),
        similar_conditions: knowledge.similar_conditions(&condition),
        detections: raw.predictions.clone(),
        previsit_care: knowledge.previsit_care().to_vec(),
        visit_preparation: knowledge.visit_preparation().to_vec(),
        detailed_analysis: None,
        processing_time: raw.time.map(|seconds| format!("{seconds:.2}s")),
        image_hash: None,
        condition,
    }
}

fn non_empty(list: Vec<String>) -> Option<Vec<String>> {
    if list.is_empty() { None } else { Some(list) }
}
