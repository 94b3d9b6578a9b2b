//! HTTP backends for the fraud scorer
//!
//! Groq and Perplexity speak the OpenAI chat-completions dialect; Gemini has
//! its own `generateContent` shape. All of them reduce to "system prompt and
//! user prompt in, text out".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use core_kernel::PortError;

pub const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";
pub const PERPLEXITY_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";
pub const PERPLEXITY_DEFAULT_MODEL: &str = "llama-3.1-sonar-small-128k-online";
pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-pro";

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.3;

/// A text-completion service
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, PortError>;

    fn name(&self) -> &'static str;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions backend
pub struct ChatCompletionsBackend {
    client: reqwest::Client,
    name: &'static str,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsBackend {
    pub fn new(
        name: &'static str,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            name,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn groq(api_key: impl Into<String>, model: Option<String>, timeout: Duration) -> Self {
        Self::new(
            "groq",
            GROQ_ENDPOINT,
            api_key,
            model.unwrap_or_else(|| GROQ_DEFAULT_MODEL.to_string()),
            timeout,
        )
    }

    pub fn perplexity(api_key: impl Into<String>, model: Option<String>, timeout: Duration) -> Self {
        Self::new(
            "perplexity",
            PERPLEXITY_ENDPOINT,
            api_key,
            model.unwrap_or_else(|| PERPLEXITY_DEFAULT_MODEL.to_string()),
            timeout,
        )
    }
}

#[async_trait]
impl AnalysisBackend for ChatCompletionsBackend {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, PortError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::connection(format!("{}: {e}", self.name)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::unavailable(format!("{} returned {status}", self.name)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PortError::transformation(format!("{} payload: {e}", self.name)))?;

        debug!(backend = self.name, choices = parsed.choices.len(), "Chat completion received");

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PortError::transformation(format!("{} returned no content", self.name)))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

/// Google Gemini `generateContent` backend
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: GEMINI_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string()),
        }
    }
}

#[async_trait]
impl AnalysisBackend for GeminiBackend {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, PortError> {
        // generateContent has no system role on gemini-pro
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Some(format!("{system}\n\n{prompt}")),
                }],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            // the URL carries the API key
            .map_err(|e| PortError::connection(format!("gemini: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::unavailable(format!("gemini returned {status}")));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| PortError::transformation(format!("gemini payload: {}", e.without_url())))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(PortError::transformation("gemini returned no content"));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
