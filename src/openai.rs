//! OpenAI-compatible embedding and chat clients.
//!
//! Both clients POST JSON to `{api_base}/...` with a bearer token and run
//! every request under a [`RetryPolicy`]. HTTP failures are classified:
//!
//! | Status | Error |
//! |--------|-------|
//! | 429 | `RateLimited` (retried) |
//! | 5xx, timeouts, connection errors | `ServiceUnavailable` (retried) |
//! | 401, 403 | `Config` |
//! | other 4xx | `InvalidArgument` |
//! | 2xx with an unexpected body | `MalformedResponse` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ChatService, Embedding, EmbeddingService, Error, Message, RagConfig, Result, RetryPolicy,
};

#[derive(Debug, Clone)]
struct ApiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    retry: RetryPolicy,
}

impl ApiClient {
    fn new(api_base: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        self.retry.run(path, || self.post_once(path, body)).await
    }

    async fn post_once<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.api_base);
        debug!(%url, "POST");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| Error::MalformedResponse(format!("{url}: {e}")))
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| status.to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Config(format!("credential rejected: {detail}"))
        }
        s if s.is_server_error() => Error::ServiceUnavailable(detail),
        s => Error::InvalidArgument(format!("request rejected ({s}): {detail}")),
    }
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Embedding,
}

/// Hosted embeddings (`/embeddings`).
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    client: ApiClient,
    model: String,
    batch_size: usize,
}

impl OpenAiEmbeddings {
    /// Client for `model` at the default API base.
    pub fn new(api_key: &str, model: impl Into<String>) -> Result<Self> {
        let defaults = RagConfig::default();
        Ok(Self {
            client: ApiClient::new(&defaults.api_base, api_key, defaults.request_timeout())?,
            model: model.into(),
            batch_size: defaults.embedding_batch_size,
        })
    }

    /// Client configured from `config`; requires an API key.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;
        Ok(Self {
            client: ApiClient::new(&config.api_base, api_key, config.request_timeout())?,
            model: config.embedding_model.clone(),
            batch_size: config.embedding_batch_size.max(1),
        })
    }

    /// Point at another OpenAI-compatible server.
    #[must_use]
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.client.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Replace the retry schedule.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.client.retry = retry;
        self
    }

    /// Inputs per request.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Embedding>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: batch,
        };
        let response: EmbeddingResponse = self.client.post("embeddings", &request).await?;

        if response.data.len() != batch.len() {
            return Err(Error::MalformedResponse(format!(
                "sent {} inputs, received {} embeddings",
                batch.len(),
                response.data.len()
            )));
        }

        let mut slots: Vec<Option<Embedding>> = vec![None; batch.len()];
        for item in response.data {
            let Some(slot) = slots.get_mut(item.index).filter(|slot| slot.is_none()) else {
                return Err(Error::MalformedResponse(format!(
                    "unexpected embedding index {}",
                    item.index
                )));
            };
            *slot = Some(item.embedding);
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        debug!(model = %self.model, count = vectors.len(), "Embedded texts");
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Hosted chat completions (`/chat/completions`).
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: ApiClient,
    model: String,
}

impl OpenAiChat {
    /// Client for `model` at the default API base.
    pub fn new(api_key: &str, model: impl Into<String>) -> Result<Self> {
        let defaults = RagConfig::default();
        Ok(Self {
            client: ApiClient::new(&defaults.api_base, api_key, defaults.request_timeout())?,
            model: model.into(),
        })
    }

    /// Client configured from `config`; requires an API key.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;
        Ok(Self {
            client: ApiClient::new(&config.api_base, api_key, config.request_timeout())?,
            model: config.chat_model.clone(),
        })
    }

    /// Point at another OpenAI-compatible server.
    #[must_use]
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.client.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Replace the retry schedule.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.client.retry = retry;
        self
    }
}

#[async_trait]
impl ChatService for OpenAiChat {
    async fn complete(&self, messages: &[Message], temperature: f32) -> Result<String> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(Error::InvalidArgument(format!(
                "temperature {temperature} outside 0..=2"
            )));
        }
        if messages.is_empty() {
            return Err(Error::InvalidArgument("no messages to complete".into()));
        }

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature,
        };
        let response: ChatResponse = self.client.post("chat/completions", &request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::MalformedResponse("completion has no content".into()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
