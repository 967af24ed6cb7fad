//! Gemini client for the Generative Language `generateContent` API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use simpatient_core::CompletionError;

const API_VERSION: &str = "v1beta";

/// Anything that turns a rendered prompt into generated text
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion request; no retries at this level
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Model identifier requests are sent to
    fn model(&self) -> &str;
}

/// Client for the Google Gemini API
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

/// Request body for `generateContent`
#[derive(Serialize)]
struct ApiRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// Response from `generateContent`
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Error detail from the Gemini API
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiClient {
    /// Create a client; `timeout` bounds each HTTP request end to end
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, API_VERSION, self.model
        )
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ApiRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Other(format!("Request timed out: {}", e))
                } else {
                    CompletionError::Other(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        let body = response
            .json::<ApiResponse>()
            .await
            .map_err(|e| CompletionError::Other(format!("Failed to parse response: {}", e)))?;

        extract_text(&body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Sort a non-2xx response into rate-limit vs everything else
fn classify_error(status: StatusCode, body: &str) -> CompletionError {
    let (message, api_status) = match serde_json::from_str::<ApiError>(body) {
        Ok(api_err) => (api_err.error.message, api_err.error.status.unwrap_or_default()),
        Err(_) => (body.to_string(), String::new()),
    };
    let detail = format!("Gemini API error ({}): {}", status, message);

    if status == StatusCode::TOO_MANY_REQUESTS
        || api_status == "RESOURCE_EXHAUSTED"
        || message.to_lowercase().contains("quota")
    {
        CompletionError::RateLimited(detail)
    } else {
        CompletionError::Other(detail)
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: &ApiResponse) -> Result<String, CompletionError> {
    let text: String = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(CompletionError::Other(
            "No text content in response".to_string(),
        ));
    }
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_is_rate_limited() {
        let err = classify_error(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn resource_exhausted_is_rate_limited() {
        let body = r#"{"error":{"code":403,"message":"Out of tokens","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(classify_error(StatusCode::FORBIDDEN, body).is_rate_limited());
    }

    #[test]
    fn quota_message_is_rate_limited() {
        let body = r#"{"error":{"code":400,"message":"Quota exceeded for metric","status":"FAILED_PRECONDITION"}}"#;
        assert!(classify_error(StatusCode::BAD_REQUEST, body).is_rate_limited());
    }

    #[test]
    fn other_errors_are_not_retried() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        let err = classify_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(
            err,
            CompletionError::Other(
                "Gemini API error (400 Bad Request): API key not valid".to_string()
            )
        );
    }

    #[test]
    fn text_parts_are_joined() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"I have "},{"text":"a headache."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(&response).unwrap(), "I have a headache.");
    }

    #[test]
    fn missing_candidates_is_an_error() {
        let response: ApiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            extract_text(&response),
            Err(CompletionError::Other(_))
        ));
    }
}
