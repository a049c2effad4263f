//! OpenAI-compatible probe client
//!
//! Works against any endpoint exposing `GET /v1/models` and
//! `POST /v1/chat/completions` (OpenAI, vLLM, SGLang and the like).

pub mod wire;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use probe_bench_core::{
    ChatRequest, ProbeClient, ProbeError, ProbeMode, ProbeOutput, ProbeTask, SamplingParams,
};
use reqwest::Response;

use crate::config::{ClientConfig, HttpClientPool};
use crate::streaming::{StreamAggregator, StreamState};

use self::wire::{error_message, parse_completion, Completion, ModelList};

/// Probe client for an OpenAI-compatible endpoint
///
/// One client is shared by every worker in a batch. Each probe is bounded by
/// the configured timeout; when it fires the request future is dropped,
/// which closes the connection.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: ClientConfig,
    pool: HttpClientPool,
    base_url: String,
    api_key: String,
    params: SamplingParams,
}

impl OpenAiClient {
    /// Create a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ProbeError> {
        config
            .validate()
            .map_err(|e| ProbeError::Config(e.to_string()))?;

        let pool = HttpClientPool::new(&config.http)
            .map_err(|e| ProbeError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.normalized_base_url(),
            api_key: config.api_key.clone().unwrap_or_default(),
            params: config.params(),
            pool,
            config,
        })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sampling parameters sent with every probe.
    pub fn params(&self) -> SamplingParams {
        self.params
    }

    /// List the model ids served by the endpoint, sorted.
    ///
    /// # Errors
    ///
    /// A body that is not `{"data": [{"id": ...}]}` is an
    /// [`ProbeError::InvalidResponse`].
    pub async fn list_models(&self) -> Result<Vec<String>, ProbeError> {
        let url = self.config.models_url();
        tracing::debug!(url = %url, "Listing models");

        let body = within(self.config.timeout, async {
            let response = self
                .pool
                .client()
                .get(&url)
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            Ok::<_, ProbeError>(check_status(response).await?.text().await?)
        })
        .await?;

        let list: ModelList = serde_json::from_str(&body).map_err(|e| {
            ProbeError::InvalidResponse(format!("expected a `data` array of models ({e}): {body}"))
        })?;

        let mut ids: Vec<String> = list.data.into_iter().map(|m| m.id).collect();
        ids.sort();
        tracing::debug!(count = ids.len(), "Models listed");
        Ok(ids)
    }

    async fn send(&self, task: &ProbeTask) -> Result<Response, ProbeError> {
        let body = ChatRequest::for_task(task, self.params, self.config.mode);
        let response = self
            .pool
            .client()
            .post(self.config.chat_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        check_status(response).await
    }

    /// The timer covers the whole exchange, body included.
    async fn probe_single_shot(&self, task: &ProbeTask) -> Result<ProbeOutput, ProbeError> {
        let body = within(self.config.timeout, async {
            Ok::<_, ProbeError>(self.send(task).await?.text().await?)
        })
        .await?;

        Ok(match parse_completion(&body) {
            Completion::Content(text) => ProbeOutput::text(text),
            Completion::Missing(text) => {
                tracing::warn!(model = %task.model, "Response carried no message content");
                ProbeOutput {
                    text,
                    missing_content: true,
                    malformed_chunks: 0,
                }
            }
        })
    }

    /// The timer covers the wait for headers, then each idle gap between chunks.
    async fn probe_streaming(&self, task: &ProbeTask) -> Result<ProbeOutput, ProbeError> {
        let limit = self.config.timeout;
        let response = within(limit, self.send(task)).await?;

        let mut aggregator =
            StreamAggregator::new().with_placeholders(self.config.mark_malformed);
        let mut stream = response.bytes_stream();

        loop {
            let next = tokio::time::timeout(limit, stream.next())
                .await
                .map_err(|_| ProbeError::Timeout(limit))?;
            let Some(chunk) = next else {
                break;
            };
            if aggregator.feed(&chunk?) == StreamState::Done {
                break;
            }
        }

        let output = aggregator.finish();
        if output.malformed_chunks > 0 {
            tracing::warn!(
                model = %task.model,
                malformed = output.malformed_chunks,
                "Stream contained unparsable chunks"
            );
        }
        Ok(output)
    }
}

#[async_trait]
impl ProbeClient for OpenAiClient {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    fn mode(&self) -> ProbeMode {
        self.config.mode
    }

    async fn probe(&self, task: &ProbeTask) -> Result<ProbeOutput, ProbeError> {
        match self.config.mode {
            ProbeMode::SingleShot => self.probe_single_shot(task).await,
            ProbeMode::Streaming => self.probe_streaming(task).await,
        }
    }
}

/// Race `fut` against `limit`; dropping the future on expiry aborts the request.
async fn within<T, F>(limit: Duration, fut: F) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ProbeError::Timeout(limit))?
}

/// Turn a non-2xx response into [`ProbeError::Http`].
async fn check_status(response: Response) -> Result<Response, ProbeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let mut message = error_message(&body);
    if message.is_empty() {
        message = status.canonical_reason().unwrap_or("no response body").to_string();
    }

    Err(ProbeError::Http {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests;
