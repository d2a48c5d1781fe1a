// decision_core/src/llm_client.rs

use crate::contracts::{AnalysisError, AnalysisResult};
use crate::features::vision::{DetectedElement, VisionRunner};
use crate::utils::logger::log_llm_call;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout, Instant};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
const PROSE_MODEL: &str = "gemini-pro";
const VISION_MODEL: &str = "gemini-pro-vision";

// Minimum spacing between calls to avoid burst limits.
const MIN_DELAY_BETWEEN_CALLS_MS: u64 = 1_200;

/// # NDOC
/// component: `llm_client`
/// purpose: Mockable seam for the prose collaborator. One strictly bounded
///          call per report: "rewrite these findings in diagnostic prose".
#[async_trait]
pub trait ProseGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, deadline: Duration) -> AnalysisResult<String>;
}

/// Gemini-backed client for both prose generation and image element
/// detection. Credential comes from `GEMINI_API_KEY`.
pub struct GeminiClient {
    http: Client,
    api_base: String,
    api_key: String,
    last_call: Mutex<Option<Instant>>,
}

impl GeminiClient {
    pub fn from_env() -> AnalysisResult<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| AnalysisError::llm_transport("GEMINI_API_KEY not set in environment"))?;
        Ok(Self::with_base(api_key, DEFAULT_API_BASE.to_string()))
    }

    /// Test seam: point the client at a local server.
    pub fn with_base(api_key: String, api_base: String) -> Self {
        GeminiClient {
            http: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            last_call: Mutex::new(None),
        }
    }

    async fn respect_call_spacing(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            let spacing = Duration::from_millis(MIN_DELAY_BETWEEN_CALLS_MS);
            if elapsed < spacing {
                sleep(spacing - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn call_model(
        &self,
        model: &str,
        body: Value,
        deadline: Duration,
    ) -> AnalysisResult<String> {
        self.respect_call_spacing().await;

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.api_base, model, self.api_key
        );

        let request = self.http.post(&url).json(&body).send();
        let response = match timeout(deadline, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(AnalysisError::llm_transport(format!(
                    "request failed: {}",
                    e
                )))
            }
            Err(_) => return Err(AnalysisError::llm_timeout("model call exceeded deadline")),
        };

        if !response.status().is_success() {
            return Err(AnalysisError::llm_transport(format!(
                "non-success status {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::llm_transport(format!("invalid response body: {}", e)))?;

        extract_candidate_text(&payload)
            .ok_or_else(|| AnalysisError::llm_transport("no candidate text in model response"))
    }
}

fn extract_candidate_text(payload: &Value) -> Option<String> {
    payload["candidates"]
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|candidate| candidate["content"]["parts"].as_array())
        .and_then(|parts| parts.first())
        .and_then(|part| part["text"].as_str())
        .map(str::to_string)
}

#[async_trait]
impl ProseGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, deadline: Duration) -> AnalysisResult<String> {
        let body = json!({
            "contents": [
                {
                    "parts": [
                        { "text": prompt }
                    ]
                }
            ],
            "generationConfig": {
                "temperature": 0.4,
                "topP": 1.0,
                "topK": 40,
                "candidateCount": 1,
                "maxOutputTokens": 2048
            }
        });

        let result = self.call_model(PROSE_MODEL, body, deadline).await;
        log_llm_call(
            "compose_prose",
            PROSE_MODEL,
            if result.is_ok() { "ok" } else { "error" },
        );
        result
    }
}

const VISION_PROMPT: &str = "You are labeling a marketing page screenshot. Return ONLY a JSON \
array; each entry: {\"label\": one of headline|cta|trust_badge|price_tag|form_field|paragraph|logo|other, \
\"text\": the visible text, \"top_fraction\": vertical position 0.0-1.0}. No prose, no markdown.";

#[async_trait]
impl VisionRunner for GeminiClient {
    async fn detect(&self, image: &[u8]) -> AnalysisResult<Vec<DetectedElement>> {
        let body = json!({
            "contents": [
                {
                    "parts": [
                        { "text": VISION_PROMPT },
                        {
                            "inline_data": {
                                "mime_type": "image/png",
                                "data": base64::engine::general_purpose::STANDARD.encode(image)
                            }
                        }
                    ]
                }
            ],
            "generationConfig": {
                "temperature": 0.0,
                "candidateCount": 1,
                "maxOutputTokens": 4096
            }
        });

        let text = self
            .call_model(VISION_MODEL, body, Duration::from_secs(30))
            .await?;
        log_llm_call("detect_elements", VISION_MODEL, "ok");

        parse_detections(&text)
    }
}

fn parse_detections(text: &str) -> AnalysisResult<Vec<DetectedElement>> {
    // Models fence JSON in markdown more often than not.
    let trimmed = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str::<Vec<DetectedElement>>(trimmed)
        .map_err(|e| AnalysisError::llm_transport(format!("unparseable detection payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{matchers::*, responders::*, Expectation, Server};

    fn candidate_body(text: &str) -> Value {
        json!({
            "candidates": [
                { "content": { "parts": [ { "text": text } ] } }
            ]
        })
    }

    #[tokio::test]
    async fn generate_returns_candidate_text() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path(
                "POST",
                "/v1beta/models/gemini-pro:generateContent",
            ))
            .respond_with(json_encoded(candidate_body("Diagnostic prose here."))),
        );

        let client = GeminiClient::with_base("test-key".to_string(), server.url_str(""));
        let prose = client
            .generate("rewrite these findings", Duration::from_secs(5))
            .await
            .expect("should succeed");

        assert_eq!(prose, "Diagnostic prose here.");
    }

    #[tokio::test]
    async fn non_success_status_is_transport_error() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path(
                "POST",
                "/v1beta/models/gemini-pro:generateContent",
            ))
            .respond_with(status_code(500)),
        );

        let client = GeminiClient::with_base("test-key".to_string(), server.url_str(""));
        let err = client
            .generate("prompt", Duration::from_secs(5))
            .await
            .expect_err("must fail");

        assert_eq!(err.tag(), "llm_transport_error");
    }

    #[tokio::test]
    async fn empty_candidates_is_transport_error() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path(
                "POST",
                "/v1beta/models/gemini-pro:generateContent",
            ))
            .respond_with(json_encoded(json!({ "candidates": [] }))),
        );

        let client = GeminiClient::with_base("test-key".to_string(), server.url_str(""));
        let err = client
            .generate("prompt", Duration::from_secs(5))
            .await
            .expect_err("must fail");

        assert_eq!(err.tag(), "llm_transport_error");
    }

    #[tokio::test]
    async fn vision_detections_parse_through_markdown_fences() {
        let detection_json = r#"```json
[{"label":"headline","text":"Big Promise","top_fraction":0.1}]
```"#;
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path(
                "POST",
                "/v1beta/models/gemini-pro-vision:generateContent",
            ))
            .respond_with(json_encoded(candidate_body(detection_json))),
        );

        let client = GeminiClient::with_base("test-key".to_string(), server.url_str(""));
        let detections = client.detect(&[0u8; 4]).await.expect("should parse");

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].text, "Big Promise");
    }

    #[test]
    fn detection_parse_rejects_garbage() {
        assert!(parse_detections("not json at all").is_err());
    }
}
