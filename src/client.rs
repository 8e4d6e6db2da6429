use crate::error::{OrganizerError, Result};
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Client for the OpenAI-compatible inference backend.
///
/// Two operations, mirroring what the pipeline needs: a text-only completion
/// and a text + single-image completion. Images travel inline as
/// `data:image/jpeg;base64,...` payloads; the MIME type is fixed to JPEG
/// regardless of the actual source format. No retry; one configurable
/// per-request timeout.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl InferenceClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        }
    }

    /// Send a text-only prompt and return the raw response text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt},
            ],
        });
        self.send(body).await
    }

    /// Send a prompt with one attached image and return the raw response text.
    pub async fn complete_with_image(&self, prompt: &str, image: &[u8]) -> Result<String> {
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(image);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": [
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {
                        "url": format!("data:image/jpeg;base64,{}", image_b64),
                    }},
                ]},
            ],
        });
        self.send(body).await
    }

    async fn send(&self, body: Value) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                OrganizerError::Inference(format!("failed to reach backend at {}: {}", url, e))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(OrganizerError::Inference(format!(
                "backend returned {}: {}",
                status, text
            )));
        }

        let json_response: Value = resp.json().await?;
        let text = json_response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        Ok(text)
    }
}

/// Parse inference output text as `T`, with defensive JSON extraction.
///
/// Tries a direct parse, then a ```json``` code-block extraction, then a scan
/// from the first `{` or `[`, before declaring the response malformed.
pub fn parse_json_output<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(OrganizerError::EmptyResponse);
    }

    if let Ok(val) = serde_json::from_str::<T>(trimmed) {
        return Ok(val);
    }

    if let Some(json_str) = extract_json_block(trimmed) {
        if let Ok(val) = serde_json::from_str::<T>(&json_str) {
            return Ok(val);
        }
    }

    if let Some(idx) = trimmed.find('{').or_else(|| trimmed.find('[')) {
        let candidate = &trimmed[idx..];
        if let Ok(val) = serde_json::from_str::<T>(candidate) {
            return Ok(val);
        }
        let open = candidate.as_bytes()[0];
        let close = if open == b'{' { '}' } else { ']' };
        if let Some(end) = candidate.rfind(close) {
            if let Ok(val) = serde_json::from_str::<T>(&candidate[..=end]) {
                return Ok(val);
            }
        }
    }

    Err(OrganizerError::MalformedResponse(truncate_for_diagnostics(
        trimmed,
    )))
}

/// Cap diagnostic payloads at 200 bytes without splitting a multi-byte char.
fn truncate_for_diagnostics(text: &str) -> String {
    let mut end = text.len().min(200);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Extract JSON from ```json ... ``` code blocks.
fn extract_json_block(text: &str) -> Option<String> {
    let markers = ["```json", "```JSON", "```"];
    for marker in markers {
        if let Some(start) = text.find(marker) {
            let content_start = start + marker.len();
            if let Some(end) = text[content_start..].find("```") {
                return Some(text[content_start..content_start + end].trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Sample {
        value: String,
    }

    #[test]
    fn test_parse_direct_json() {
        let result: Sample = parse_json_output(r#"{"value": "hello"}"#).unwrap();
        assert_eq!(result.value, "hello");
    }

    #[test]
    fn test_parse_markdown_block() {
        let text = "Here is the result:\n```json\n{\"value\": \"x\"}\n```\nDone.";
        let result: Sample = parse_json_output(text).unwrap();
        assert_eq!(result.value, "x");
    }

    #[test]
    fn test_parse_embedded_json() {
        let text = "Sure! Here it is: {\"value\": \"test\"} hope that helps.";
        let result: Sample = parse_json_output(text).unwrap();
        assert_eq!(result.value, "test");
    }

    #[test]
    fn test_parse_embedded_array() {
        let text = "The order is [\"a\", \"b\"] as requested.";
        let result: Vec<String> = parse_json_output(text).unwrap();
        assert_eq!(result, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_empty_is_empty_response() {
        let result = parse_json_output::<Sample>("   ");
        assert!(matches!(result, Err(OrganizerError::EmptyResponse)));
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        let result = parse_json_output::<Sample>("not json at all");
        assert!(matches!(result, Err(OrganizerError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_long_accented_garbage_is_malformed() {
        // A multi-byte char straddling the 200-byte diagnostic cap must not
        // split the truncation
        let text = format!("{}éé", "a".repeat(199));
        let result = parse_json_output::<Sample>(&text);
        match result {
            Err(OrganizerError::MalformedResponse(raw)) => {
                assert!(raw.len() <= 200);
                assert!(raw.ends_with('a'));
            }
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_truncate_for_diagnostics_respects_boundaries() {
        let text = format!("{}é{}", "x".repeat(198), "y".repeat(10));
        let truncated = truncate_for_diagnostics(&text);
        assert!(truncated.len() <= 200);
        assert!(text.starts_with(&truncated));

        let short = truncate_for_diagnostics("éàü");
        assert_eq!(short, "éàü");
    }

    #[test]
    fn test_extract_json_block() {
        let text = "text\n```json\n{\"a\":1}\n```\nmore";
        assert_eq!(extract_json_block(text), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn test_extract_json_block_none() {
        assert_eq!(extract_json_block("no code block"), None);
    }
}
