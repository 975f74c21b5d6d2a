//! Streaming text generation.

use std::fmt;
use std::pin::Pin;

use futures_util::stream::{Stream, StreamExt};
use reqwest::Client as HttpClient;
use rig::{
    agent::MultiTurnStreamItem,
    client::CompletionClient,
    completion::Message,
    message::Text,
    providers::gemini,
    streaming::{StreamedAssistantContent, StreamingChat},
};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// The provider client could not be constructed.
    Client(String),
    /// The request failed or the provider reported an error mid-stream.
    Stream(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Client(msg) => write!(f, "client error: {msg}"),
            GenerationError::Stream(msg) => write!(f, "generation error: {msg}"),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Text chunks in arrival order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

/// A model that streams a completion for one prompt.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    fn model_name(&self) -> &str;

    async fn stream_text(&self, prompt: &str) -> Result<TextStream, GenerationError>;
}

/// Gemini through rig's provider client.
///
/// The API key is passed in by the caller; never log it.
#[derive(Clone)]
pub struct GeminiGenerator {
    base_url: String,
    model: String,
    api_key: String,
}

impl fmt::Debug for GeminiGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiGenerator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_base_url(api_key, model, DEFAULT_GEMINI_BASE_URL.to_string())
    }

    pub fn new_with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        }
    }

    /// Model id without the REST `models/` prefix; rig adds it.
    fn model_id(&self) -> &str {
        self.model.strip_prefix("models/").unwrap_or(&self.model)
    }

    fn client(&self) -> Result<gemini::Client<HttpClient>, GenerationError> {
        gemini::Client::<HttpClient>::builder()
            .api_key(&self.api_key)
            .base_url(&self.base_url)
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream_text(&self, prompt: &str) -> Result<TextStream, GenerationError> {
        let agent = self.client()?.agent(self.model_id()).build();
        let stream = agent.stream_chat(Message::user(prompt), Vec::new()).await;

        let text = stream.filter_map(|item| async move {
            match item {
                Ok(MultiTurnStreamItem::StreamAssistantItem(StreamedAssistantContent::Text(
                    Text { text },
                ))) => Some(Ok(text)),
                Ok(_) => None,
                Err(err) => Some(Err(GenerationError::Stream(err.to_string()))),
            }
        });
        Ok(Box::pin(text))
    }
}
