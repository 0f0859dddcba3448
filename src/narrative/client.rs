use std::fmt::Write as _;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::MARKER_PREFIX;
use crate::error::NarrativeError;
use crate::render::{Artifact, ArtifactKind};

pub const DEFAULT_ENDPOINT: &str = "https://aiproxy.sanand.workers.dev/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    pub endpoint: String,
    pub model: String,
    /// Minimum story length requested per image, in words.
    pub min_words: usize,
    pub timeout_secs: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            min_words: 250,
            timeout_secs: 120,
        }
    }
}

/// Anything that can turn a batch of charts into one combined narrative.
pub trait NarrativeService {
    fn request_narratives(
        &self,
        artifacts: &[Artifact],
        context: &str,
    ) -> Result<String, NarrativeError>;
}

/// OpenAI-style chat-completions client.  One POST per call, no retries.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    api_key: String,
    config: NarrativeConfig,
}

impl ChatCompletionsClient {
    pub fn new(api_key: String, config: NarrativeConfig) -> Result<Self, NarrativeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NarrativeError::Transport(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            config,
        })
    }
}

impl NarrativeService for ChatCompletionsClient {
    fn request_narratives(
        &self,
        artifacts: &[Artifact],
        context: &str,
    ) -> Result<String, NarrativeError> {
        let images = artifacts
            .iter()
            .map(|a| {
                std::fs::read(&a.path).map_err(|source| NarrativeError::ReadImage {
                    path: a.path.display().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let kinds: Vec<&ArtifactKind> = artifacts.iter().map(|a| &a.kind).collect();
        let payload = build_payload(&self.config, &kinds, &images, context);

        log::info!(
            "Requesting narratives for {} images from {}",
            artifacts.len(),
            self.config.endpoint
        );
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .map_err(|e| NarrativeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(NarrativeError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let envelope: Value = response
            .json()
            .map_err(|e| NarrativeError::MalformedResponse(format!("invalid JSON: {e}")))?;
        extract_content(&envelope)
    }
}

/// Instruction text sent ahead of the images, ending with one line per
/// image saying what it shows.
pub fn build_prompt(min_words: usize, context: &str, kinds: &[&ArtifactKind]) -> String {
    let mut prompt = format!(
        "For each image, generate a concise and insightful story based on its content. \
         Label each story with the corresponding image identifier (e.g., Image 1, Image 2, etc.). \
         Always start each story with a line of the form `{MARKER_PREFIX} <n>` \
         (e.g. {MARKER_PREFIX} 1, {MARKER_PREFIX} 2), numbering the images in the order given. \
         Make each story at least {min_words} words long. \
         Focus on trends, patterns, and data structure. \
         Headers for context are provided, don't use these verbatim in your story: {context}.\n\
         The images, in order:"
    );
    for (idx, kind) in kinds.iter().enumerate() {
        let _ = write!(prompt, "\nImage {}: {kind}", idx + 1);
    }
    prompt
}

/// Chat-completions body: one user message mixing the prompt and every image
/// as a base64 data URL, in artifact order.
pub fn build_payload(
    config: &NarrativeConfig,
    kinds: &[&ArtifactKind],
    images: &[Vec<u8>],
    context: &str,
) -> Value {
    let mut content = vec![json!({
        "type": "text",
        "text": build_prompt(config.min_words, context, kinds),
    })];
    content.extend(images.iter().map(|bytes| {
        json!({
            "type": "image_url",
            "image_url": { "url": format!("data:image/png;base64,{}", STANDARD.encode(bytes)) },
        })
    }));
    json!({
        "model": config.model,
        "messages": [{ "role": "user", "content": content }],
    })
}

/// The one place that knows the response envelope: `choices[0].message.content`.
pub fn extract_content(envelope: &Value) -> Result<String, NarrativeError> {
    envelope["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            NarrativeError::MalformedResponse(
                "missing string at choices[0].message.content".to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_embeds_prompt_then_images_in_order() {
        let config = NarrativeConfig::default();
        let heatmap = ArtifactKind::CorrelationHeatmap;
        let pair = ArtifactKind::CorrelatedPair {
            x: "height".into(),
            y: "weight".into(),
        };
        let payload = build_payload(
            &config,
            &[&heatmap, &pair],
            &[b"one".to_vec(), b"two".to_vec()],
            r#"{"headers":["a"]}"#,
        );
        assert_eq!(payload["model"], DEFAULT_MODEL);
        let content = payload["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 3);
        assert_eq!(content[0]["type"], "text");
        let text = content[0]["text"].as_str().unwrap();
        assert!(text.contains("### Image 1"));
        assert!(text.contains("at least 250 words"));
        assert!(text.contains(r#"{"headers":["a"]}"#));
        assert!(text.ends_with(
            "\nImage 1: correlation heatmap\nImage 2: scatterplot of height vs weight"
        ));
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,b25l");
        assert_eq!(content[2]["image_url"]["url"], "data:image/png;base64,dHdv");
    }

    #[test]
    fn envelope_content_is_extracted() {
        let ok = json!({ "choices": [{ "message": { "content": "### Image 1\nhi" } }] });
        assert_eq!(extract_content(&ok).unwrap(), "### Image 1\nhi");
    }

    #[test]
    fn unexpected_envelopes_are_typed_failures() {
        for bad in [
            json!({}),
            json!({ "choices": [] }),
            json!({ "choices": [{ "message": { "content": null } }] }),
            json!({ "error": { "message": "quota" } }),
        ] {
            assert!(matches!(
                extract_content(&bad),
                Err(NarrativeError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn unreachable_endpoint_is_a_transport_failure() {
        let config = NarrativeConfig {
            endpoint: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            timeout_secs: 2,
            ..NarrativeConfig::default()
        };
        let client = ChatCompletionsClient::new("token".to_string(), config).unwrap();
        let result = client.request_narratives(&[], "{}");
        assert!(matches!(result, Err(NarrativeError::Transport(_))));
    }
}
