//! NVIDIA NIM oracle over the OpenAI-compatible chat completions API.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use listcart_core::{ImageData, LanguageOracle, OracleError};

use crate::ConnectError;

pub const DEFAULT_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "meta/llama-3.1-8b-instruct";
pub const DEFAULT_VISION_MODEL: &str = "meta/llama-3.2-11b-vision-instruct";

const MAX_TOKENS: u32 = 1024;
const TEMPERATURE: f32 = 0.2;
const TOP_P: f32 = 0.7;

/// Connection settings for the NIM endpoint.
#[derive(Debug, Clone)]
pub struct NimConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub vision_model: String,
    pub timeout: Duration,
}

impl NimConfig {
    /// Create a config with the given API key and default endpoint/models.
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Read the API key from `var`.
    pub fn from_env(var: &str) -> Result<Self, ConnectError> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key)),
            _ => Err(ConnectError::MissingCredential {
                var: var.to_string(),
            }),
        }
    }
}

pub struct NimOracle {
    config: NimConfig,
    agent: ureq::Agent,
}

impl NimOracle {
    pub fn new(config: NimConfig) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(config.timeout))
                .build(),
        );
        Self { config, agent }
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, OracleError> {
        let agent = self.agent.clone();
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let auth = format!("Bearer {}", self.config.api_key);
        let model = request.model.clone();

        // ureq is synchronous, so wrap in spawn_blocking
        let result = tokio::task::spawn_blocking(move || {
            let response = agent
                .post(&url)
                .header("Authorization", &auth)
                .header("Accept", "application/json")
                .send_json(&request)
                .map_err(upstream_error)?;
            let body: ChatResponse = response
                .into_body()
                .read_json()
                .map_err(|e| OracleError::Upstream(format!("unreadable response: {}", e)))?;
            Ok::<_, OracleError>(body)
        })
        .await
        .map_err(|e| OracleError::Upstream(format!("task join error: {}", e)))?;

        let body = match result {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(%model, error = %e, "oracle request failed");
                return Err(e);
            }
        };
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        tracing::debug!(%model, chars = content.len(), "oracle replied");
        Ok(content)
    }
}

#[async_trait]
impl LanguageOracle for NimOracle {
    async fn chat(&self, prompt: &str) -> Result<String, OracleError> {
        let request = ChatRequest::new(
            &self.config.chat_model,
            vec![ChatMessage {
                role: "user",
                content: MessageContent::Text(prompt.to_string()),
            }],
        );
        let content = self.complete(request).await?;
        if content.trim().is_empty() {
            return Err(OracleError::Blank);
        }
        Ok(content)
    }

    async fn vision_extract(&self, image: &ImageData) -> Result<String, OracleError> {
        let request = ChatRequest::new(
            &self.config.vision_model,
            vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: OCR_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url(image),
                        },
                    },
                ]),
            }],
        );
        // Blank vision output is an empty list, not a failure.
        self.complete(request).await
    }
}

/// Encode an image as a `data:` URL. Bare base64 is assumed to be JPEG.
pub fn data_url(image: &ImageData) -> String {
    match image {
        ImageData::DataUrl(url) if url.starts_with("data:") => url.clone(),
        ImageData::DataUrl(bare) => format!("data:image/jpeg;base64,{}", bare),
        ImageData::Raw { bytes, mime_type } => {
            format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
        }
    }
}

fn upstream_error(err: ureq::Error) -> OracleError {
    match err {
        ureq::Error::StatusCode(status) => OracleError::Upstream(status.to_string()),
        other => OracleError::Upstream(other.to_string()),
    }
}

// ── Prompt ───────────────────────────────────────────────────────────────────

const OCR_PROMPT: &str = r#"You are an OCR system. Read the handwritten or printed text in this image.

INSTRUCTIONS:
1. Look at the image carefully
2. Each LINE in the list is a SEPARATE item - do not combine lines
3. Read ONLY the text that is actually written/visible in the image
4. Do NOT add any words that are not in the image
5. Do NOT guess or infer - only report what you can actually see
6. If you cannot read a word clearly, skip it

IMPORTANT: If the list has items on separate lines, output them as separate items.
For example, if "pepper" is on one line and "hot sauce" is on another line, output:
pepper|1
hot sauce|1
NOT: pepper hot sauce|1

For each item, check if there's a number next to it:
- If a number is written (like "2" or "x3"), use that as quantity
- If no number is written, quantity is 1

OUTPUT FORMAT - one item per line:
item_name|quantity

CRITICAL: Only output items you can clearly see. Do not combine separate lines into one item."#;

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

impl ChatRequest {
    fn new(model: &str, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.to_string(),
            messages,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            stream: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_image_is_base64_encoded() {
        let image = ImageData::Raw {
            bytes: b"hello".to_vec(),
            mime_type: "image/png".to_string(),
        };
        assert_eq!(data_url(&image), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn data_urls_pass_through_and_bare_base64_is_jpeg() {
        let url = "data:image/webp;base64,AAAA".to_string();
        assert_eq!(data_url(&ImageData::DataUrl(url.clone())), url);
        assert_eq!(
            data_url(&ImageData::DataUrl("AAAA".to_string())),
            "data:image/jpeg;base64,AAAA"
        );
    }

    #[test]
    fn chat_request_shape() {
        let request = ChatRequest::new(
            DEFAULT_CHAT_MODEL,
            vec![ChatMessage {
                role: "user",
                content: MessageContent::Text("hi".to_string()),
            }],
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], DEFAULT_CHAT_MODEL);
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[test]
    fn vision_request_shape() {
        let request = ChatRequest::new(
            DEFAULT_VISION_MODEL,
            vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: "read".to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/jpeg;base64,AA".to_string(),
                        },
                    },
                ]),
            }],
        );
        let json = serde_json::to_value(&request).unwrap();
        let parts = &json["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,AA");
    }

    #[test]
    fn response_without_choices_is_empty() {
        let body: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(body.choices.is_empty());
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"milk|1"}}]}"#)
                .unwrap();
        assert_eq!(body.choices[0].message.content.as_deref(), Some("milk|1"));
    }

    #[test]
    fn status_errors_carry_the_code() {
        assert_eq!(
            upstream_error(ureq::Error::StatusCode(503)),
            OracleError::Upstream("503".to_string())
        );
    }

    #[test]
    fn missing_api_key_is_reported() {
        assert!(NimConfig::from_env("LISTCART_TEST_KEY_THAT_IS_NEVER_SET").is_err());
    }
}
