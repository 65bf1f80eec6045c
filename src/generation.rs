//! Generation service abstraction and implementations.
//!
//! Defines the [`GenerationClient`] trait and concrete implementations:
//! - **[`DisabledClient`]** — returns errors; used when generation is not configured.
//! - **[`GeminiClient`]** — calls the Google Gemini `generateContent` API with
//!   retry and backoff, multimodal inline attachments, and optional live
//!   web-search grounding.
//!
//! The assistant treats this as an opaque capability: text parts plus
//! binary parts in, generated text plus web-grounding citations out. All
//! transport, auth, and format failures surface as plain errors for the
//! caller to absorb.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::GenerationConfig;

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Base URL for the Gemini API.
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Fixed reasoning depth passed as `thinkingConfig.thinkingBudget`.
const THINKING_BUDGET: u32 = 0;

// ============ Request / reply types ============

/// One part of a multimodal generation request.
#[derive(Debug, Clone)]
pub enum Part {
    Text(String),
    /// Base64-encoded binary content with its MIME type.
    Inline { mime_type: String, data: String },
}

/// A single-turn multimodal generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub parts: Vec<Part>,
    pub system_instruction: String,
    /// Expose the live web-search tool to the model.
    pub web_search: bool,
}

/// A web-grounding citation reported by the service.
#[derive(Debug, Clone)]
pub struct WebCitation {
    pub title: Option<String>,
    pub uri: Option<String>,
}

/// Generated answer plus any web-grounding citations.
#[derive(Debug, Clone)]
pub struct GenerationReply {
    pub text: String,
    pub web_citations: Vec<WebCitation>,
}

/// Trait for generation backends.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.5-flash"`).
    fn model_name(&self) -> &str;

    /// Run one generation request to completion. No cancellation; the
    /// per-request timeout is the only bound.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationReply>;
}

/// Create the appropriate [`GenerationClient`] based on configuration.
///
/// # Errors
///
/// Returns an error for unknown provider names or if the Gemini client
/// cannot be initialized.
pub fn create_client(config: &GenerationConfig) -> Result<Box<dyn GenerationClient>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledClient)),
        "gemini" => Ok(Box::new(GeminiClient::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

// ============ Disabled client ============

/// A no-op generation client that always returns errors.
///
/// Used when `generation.provider = "disabled"` in the configuration.
pub struct DisabledClient;

#[async_trait]
impl GenerationClient for DisabledClient {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationReply> {
        bail!("Generation provider is disabled")
    }
}

// ============ Gemini client ============

/// Generation client for the Google Gemini `generateContent` endpoint.
///
/// Requires the `GEMINI_API_KEY` environment variable. Model, timeout, and
/// retry count come from the `[generation]` config section. The key is
/// read per request, so a missing credential surfaces as an ordinary
/// generation failure for the orchestrator to absorb.
pub struct GeminiClient {
    model: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            max_retries: config.max_retries,
            client,
        })
    }

    fn url(&self, api_key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            API_BASE_URL, self.model, api_key
        )
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationReply> {
        let api_key = std::env::var(GEMINI_API_KEY_ENV)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", GEMINI_API_KEY_ENV))?;

        let body = build_wire_request(request);
        let url = self.url(&api_key);

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self.client.post(&url).json(&body).send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();

                    if status.is_success() {
                        return parse_wire_response(&text);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow::anyhow!("Gemini API error {}: {}", status, text));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    bail!("Gemini API error {}: {}", status, text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
    }
}

// ============ Wire format ============

#[derive(Debug, Serialize)]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(rename = "systemInstruction")]
    system_instruction: WireContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(rename = "generationConfig")]
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WirePart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: WireInlineData,
    },
}

#[derive(Debug, Serialize)]
struct WireInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "googleSearch")]
    google_search: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct WireGenerationConfig {
    #[serde(rename = "thinkingConfig")]
    thinking_config: WireThinkingConfig,
}

#[derive(Debug, Serialize)]
struct WireThinkingConfig {
    #[serde(rename = "thinkingBudget")]
    thinking_budget: u32,
}

fn build_wire_request(request: &GenerationRequest) -> WireRequest {
    let parts = request
        .parts
        .iter()
        .map(|p| match p {
            Part::Text(text) => WirePart::Text { text: text.clone() },
            Part::Inline { mime_type, data } => WirePart::Inline {
                inline_data: WireInlineData {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                },
            },
        })
        .collect();

    let tools = if request.web_search {
        Some(vec![WireTool {
            google_search: serde_json::json!({}),
        }])
    } else {
        None
    };

    WireRequest {
        contents: vec![WireContent {
            role: Some("user".to_string()),
            parts,
        }],
        system_instruction: WireContent {
            role: None,
            parts: vec![WirePart::Text {
                text: request.system_instruction.clone(),
            }],
        },
        tools,
        generation_config: WireGenerationConfig {
            thinking_config: WireThinkingConfig {
                thinking_budget: THINKING_BUDGET,
            },
        },
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    candidates: Option<Vec<WireCandidate>>,
    error: Option<WireApiError>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireResponseContent>,
    #[serde(rename = "groundingMetadata")]
    grounding_metadata: Option<WireGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireResponseContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

/// Response parts are matched loosely: anything without a `text` field
/// (function calls, thought parts) deserializes with `text = None` and is
/// skipped during assembly.
#[derive(Debug, Deserialize)]
struct WireResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireGroundingMetadata {
    #[serde(rename = "groundingChunks", default)]
    grounding_chunks: Vec<WireGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct WireGroundingChunk {
    web: Option<WireWebSource>,
}

#[derive(Debug, Deserialize)]
struct WireWebSource {
    uri: Option<String>,
    title: Option<String>,
}

fn parse_wire_response(body: &str) -> Result<GenerationReply> {
    let response: WireResponse = serde_json::from_str(body)
        .map_err(|e| anyhow::anyhow!("Failed to parse Gemini response: {}", e))?;

    if let Some(error) = response.error {
        bail!("Gemini API error: {}", error.message);
    }

    let candidate = response
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .ok_or_else(|| anyhow::anyhow!("Gemini response contains no candidates"))?;

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| {
            c.parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        bail!("Gemini returned an empty response");
    }

    let web_citations = candidate
        .grounding_metadata
        .as_ref()
        .map(|gm| {
            gm.grounding_chunks
                .iter()
                .filter_map(|chunk| chunk.web.as_ref())
                .map(|web| WebCitation {
                    title: web.title.clone(),
                    uri: web.uri.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(GenerationReply {
        text,
        web_citations,
    })
}

#[derive(Debug, Deserialize)]
struct WireApiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_attachment() -> GenerationRequest {
        GenerationRequest {
            parts: vec![
                Part::Text("question plus context".to_string()),
                Part::Inline {
                    mime_type: "application/pdf".to_string(),
                    data: "aGVsbG8=".to_string(),
                },
            ],
            system_instruction: "you are an ATC assistant".to_string(),
            web_search: true,
        }
    }

    #[test]
    fn wire_request_shape() {
        let wire = build_wire_request(&request_with_attachment());
        let json = serde_json::to_value(&wire).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "question plus context");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "application/pdf"
        );
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "you are an ATC assistant"
        );
        assert!(json["tools"][0]["googleSearch"].is_object());
        assert_eq!(
            json["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            THINKING_BUDGET
        );
    }

    #[test]
    fn wire_request_omits_tools_without_web_search() {
        let mut request = request_with_attachment();
        request.web_search = false;
        let json = serde_json::to_value(build_wire_request(&request)).unwrap();
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn parse_text_and_grounding() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Limite de "}, {"text": "35kt."}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://example.com/metar", "title": "METAR guide"}},
                        {"retrievedContext": {"title": "ignored"}}
                    ]
                }
            }]
        }"#;

        let reply = parse_wire_response(body).unwrap();
        assert_eq!(reply.text, "Limite de 35kt.");
        assert_eq!(reply.web_citations.len(), 1);
        assert_eq!(reply.web_citations[0].title.as_deref(), Some("METAR guide"));
    }

    #[test]
    fn parse_without_grounding_metadata() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "ok"}]}}]}"#;
        let reply = parse_wire_response(body).unwrap();
        assert_eq!(reply.text, "ok");
        assert!(reply.web_citations.is_empty());
    }

    #[test]
    fn empty_candidates_is_error() {
        assert!(parse_wire_response(r#"{"candidates": []}"#).is_err());
        assert!(parse_wire_response(r#"{}"#).is_err());
    }

    #[test]
    fn empty_text_is_error() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#;
        assert!(parse_wire_response(body).is_err());
    }

    #[test]
    fn api_error_field_is_error() {
        let body = r#"{"error": {"message": "API key not valid"}}"#;
        let err = parse_wire_response(body).unwrap_err();
        assert!(err.to_string().contains("API key not valid"));
    }

    #[test]
    fn disabled_client_from_config() {
        let config = GenerationConfig {
            provider: "disabled".to_string(),
            ..Default::default()
        };
        let client = create_client(&config).unwrap();
        assert_eq!(client.model_name(), "disabled");
    }
}
