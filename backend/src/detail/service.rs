use std::time::Duration;

use log::warn;
use serde::Deserialize;
use serde_json::json;
use shared::DetailedAnalysis;

const SYSTEM_PROMPT: &str = "You are a medical AI assistant providing educational information \
about skin conditions. Always emphasize that AI analysis is not a substitute for professional \
medical diagnosis and care.";

#[derive(Debug, thiserror::Error)]
enum DetailError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("provider reply had no choices")]
    EmptyReply,
    #[error("could not parse analysis sections: {0}")]
    Parse(String),
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Generates the five detailed-analysis prose sections via an
/// OpenAI-compatible chat endpoint. Degrades to deterministic static
/// sections whenever the upstream call is unavailable or fails; the
/// analysis enriches a result, it never gates one.
#[derive(Clone)]
pub struct DetailService {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl DetailService {
    pub fn new(
        api_key: Option<String>,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    pub async fn generate(
        &self,
        condition: &str,
        confidence: f32,
        basic_advice: &str,
    ) -> DetailedAnalysis {
        if !self.is_configured() {
            return fallback_sections(condition, confidence, basic_advice);
        }

        match self
            .request_analysis(condition, confidence, basic_advice)
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Detailed analysis request failed, using fallback sections: {e}");
                fallback_sections(condition, confidence, basic_advice)
            }
        }
    }

    async fn request_analysis(
        &self,
        condition: &str,
        confidence: f32,
        basic_advice: &str,
    ) -> Result<DetailedAnalysis, DetailError> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(condition, confidence, basic_advice)}
            ],
            "max_tokens": 2000,
            "temperature": 0.3
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetailError::Status(status.as_u16()));
        }

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(DetailError::EmptyReply)?;

        serde_json::from_str(strip_code_fences(&content))
            .map_err(|e| DetailError::Parse(e.to_string()))
    }
}

fn build_prompt(condition: &str, confidence: f32, basic_advice: &str) -> String {
    format!(
        "Based on the detected skin condition \"{condition}\" with {:.1}% confidence, provide \
educational information for each section below. Always include medical disclaimers and \
emphasize the need for professional consultation.\n\n\
1. OVERVIEW: what the condition is, common causes, and typical characteristics.\n\
2. DETECTION_DETAILS: what visual features were identified and typical presentation patterns.\n\
3. RECOMMENDATIONS: immediate care, lifestyle modifications, and when to seek medical attention.\n\
4. IMPORTANT_NOTES: critical safety information, red flags to watch for, and medical disclaimers.\n\
5. NEXT_STEPS: step-by-step action plan including timeline for medical consultation.\n\n\
Basic advice from initial analysis: {basic_advice}\n\n\
Format your response as a JSON object with keys: overview, detection_details, \
recommendations, important_notes, next_steps",
        confidence * 100.0
    )
}

/// Models often wrap JSON replies in Markdown code fences.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Static sections used when no language model is reachable.
fn fallback_sections(condition: &str, confidence: f32, basic_advice: &str) -> DetailedAnalysis {
    let percent = confidence * 100.0;
    DetailedAnalysis {
        overview: format!(
            "The AI analysis indicates a possible case of {condition}. This is a preliminary \
assessment based on visual pattern recognition and should not be considered a definitive \
medical diagnosis. Professional medical evaluation is required for proper identification \
and treatment planning."
        ),
        detection_details: format!(
            "The AI model analyzed visual features in the uploaded image and identified patterns \
consistent with {condition} with a confidence level of {percent:.1}%. The detection evaluated \
factors such as texture, color patterns, and morphological characteristics. AI detection has \
limitations and cannot replace clinical examination by a healthcare professional."
        ),
        recommendations: format!(
            "{basic_advice}\n\nGeneral care recommendations:\n\
• Keep the affected area clean and dry\n\
• Avoid harsh soaps or irritating products\n\
• Do not scratch or pick at the area\n\
• Monitor for changes in appearance\n\
• Seek professional medical advice for proper diagnosis and treatment"
        ),
        important_notes: "IMPORTANT MEDICAL DISCLAIMER:\n\
• This AI analysis is for educational purposes only\n\
• Results should NOT be used for self-diagnosis or treatment\n\
• Always consult a qualified healthcare provider for medical advice\n\
• AI detection may have false positives or miss important details\n\
• Some serious conditions may appear similar to benign ones\n\
• Early professional consultation is recommended for all skin concerns"
            .to_string(),
        next_steps: "Recommended action plan:\n\
1. Save these results for your medical consultation\n\
2. Schedule an appointment with a dermatologist or healthcare provider within 1-2 weeks\n\
3. Monitor the area daily for any changes (size, color, texture, symptoms)\n\
4. Take additional photos to track progression\n\
5. Avoid self-treatment until professional evaluation\n\
6. Seek immediate medical attention if you notice rapid changes, bleeding, or severe symptoms"
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured() -> DetailService {
        DetailService::new(
            None,
            "http://127.0.0.1:1".to_string(),
            "test-model".to_string(),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[actix_web::test]
    async fn unconfigured_service_returns_full_fallback_sections() {
        let service = unconfigured();
        assert!(!service.is_configured());

        let analysis = service.generate("Acne", 0.85, "Use a gentle cleanser.").await;
        assert!(analysis.overview.contains("Acne"));
        assert!(analysis.detection_details.contains("85.0%"));
        assert!(analysis.recommendations.starts_with("Use a gentle cleanser."));
        assert!(!analysis.important_notes.is_empty());
        assert!(!analysis.next_steps.is_empty());
    }

    #[actix_web::test]
    async fn blank_api_key_counts_as_unconfigured() {
        let service = DetailService::new(
            Some("   ".to_string()),
            "http://127.0.0.1:1".to_string(),
            "test-model".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(!service.is_configured());
    }

    #[test]
    fn code_fences_are_stripped_before_parsing() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn prompt_carries_condition_confidence_and_advice() {
        let prompt = build_prompt("Eczema", 0.72, "Moisturize daily.");
        assert!(prompt.contains("\"Eczema\""));
        assert!(prompt.contains("72.0%"));
        assert!(prompt.contains("Moisturize daily."));
    }
}
