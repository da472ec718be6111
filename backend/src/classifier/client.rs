use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use shared::ClassificationResult;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("invalid image payload: {0}")]
    Validation(String),
    #[error("classification provider unreachable")]
    NetworkUnreachable,
    #[error("classification request timed out")]
    Timeout,
    #[error("provider rejected request with status {status}: {message}")]
    ProviderRejected { status: u16, message: String },
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ClassifierError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ClassifierError::Validation(_))
    }

    /// The single human-readable message shown to the end user, chosen by
    /// a fixed status table. Logging keeps the technical detail.
    pub fn user_message(&self) -> String {
        match self {
            ClassifierError::Validation(detail) => format!("Invalid image: {detail}."),
            ClassifierError::NetworkUnreachable => {
                "Network error. Please check your internet connection and try again.".to_string()
            }
            ClassifierError::Timeout => {
                "The analysis request timed out. Please try again.".to_string()
            }
            ClassifierError::ProviderRejected { status, message } => match status {
                400 => "Invalid image format. Please try a different image.".to_string(),
                401 => "API authentication failed. Please try again later.".to_string(),
                403 => "Access denied. Please check your internet connection.".to_string(),
                429 => "Too many requests. Please wait a moment and try again.".to_string(),
                500 => "Server error. Please try again later.".to_string(),
                _ => format!("API Error ({status}): {message}"),
            },
            ClassifierError::MalformedResponse(_) => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }
}

/// Client for the external image-classification service. One request per
/// call, no retries; retry policy belongs to the caller.
#[derive(Clone)]
pub struct ClassifierClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_image_bytes: usize,
}

impl ClassifierClient {
    pub fn new(
        endpoint: String,
        api_key: String,
        timeout: Duration,
        max_image_bytes: usize,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint,
            api_key,
            max_image_bytes,
        })
    }

    /// Classify an image and return the provider's raw prediction set,
    /// unmodified. The image is held in memory only; nothing is written
    /// to disk on any path.
    pub async fn classify(&self, image: &[u8]) -> Result<ClassificationResult, ClassifierError> {
        self.validate(image)?;

        let body = BASE64.encode(image);
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("api_key", self.api_key.as_str())])
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(ClassifierError::ProviderRejected {
                status: status.as_u16(),
                message: provider_message(&text),
            });
        }

        // Missing `predictions` surfaces here as a deserialization failure.
        serde_json::from_str(&text).map_err(|e| ClassifierError::MalformedResponse(e.to_string()))
    }

    fn validate(&self, image: &[u8]) -> Result<(), ClassifierError> {
        if image.is_empty() {
            return Err(ClassifierError::Validation("no image data received".to_string()));
        }
        if image.len() > self.max_image_bytes {
            return Err(ClassifierError::Validation(format!(
                "image exceeds the {} byte limit",
                self.max_image_bytes
            )));
        }
        image::guess_format(image)
            .map_err(|_| ClassifierError::Validation("unrecognized image format".to_string()))?;
        Ok(())
    }
}

fn map_transport_error(err: reqwest::Error) -> ClassifierError {
    if err.is_timeout() {
        ClassifierError::Timeout
    } else {
        ClassifierError::NetworkUnreachable
    }
}

/// Extract a provider error message from a JSON body, falling back to the
/// raw (truncated) text.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "Unknown error".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}
