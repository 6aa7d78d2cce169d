use crate::config::LlmConfig;
use crate::models::*;
use futures_util::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("LLM request timed out after {0:?}")]
    Timeout(Duration),
    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed LLM response: {0}")]
    MalformedResponse(String),
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct LlmService {
    client: Client,
    config: LlmConfig,
}

impl LlmService {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }

    fn request(&self, options: &CompletionOptions, prompt: &str, stream: bool) -> RequestBuilder {
        let body = ChatCompletionRequest {
            model: options.model.clone(),
            temperature: options.temperature,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: stream.then_some(true),
        };

        self.client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .json(&body)
    }

    /// One-shot completion; returns the first choice's message content.
    pub async fn complete(&self, options: &CompletionOptions, prompt: &str) -> Result<String, LlmError> {
        log::info!("Requesting completion from model {}", options.model);

        let timeout = self.config.timeout;
        let call = async {
            let response = self.request(options, prompt, false).send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, LlmError>((status, body))
        };
        let (status, body) = tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| LlmError::Timeout(timeout))??;

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("missing choices[0].message.content".to_string()))
    }

    /// Opens a streaming completion. Fails up front on connection errors and
    /// non-2xx statuses; later failures surface from `DeltaStream::next_delta`.
    pub async fn stream(&self, options: &CompletionOptions, prompt: &str) -> Result<DeltaStream, LlmError> {
        log::info!("Opening completion stream for model {}", options.model);

        let timeout = self.config.timeout;
        let response = tokio::time::timeout(timeout, self.request(options, prompt, true).send())
            .await
            .map_err(|_| LlmError::Timeout(timeout))??;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes_stream().map(|chunk| chunk.map(|bytes| bytes.to_vec()));
        Ok(DeltaStream::new(Box::pin(body), timeout))
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>;

/// Server-sent-event body of a streaming completion, decoded into text deltas.
pub struct DeltaStream {
    body: ByteStream,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    idle_timeout: Duration,
    finished: bool,
}

impl DeltaStream {
    fn new(body: ByteStream, idle_timeout: Duration) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            idle_timeout,
            finished: false,
        }
    }

    /// Next non-empty delta, `None` once the upstream body is exhausted.
    pub async fn next_delta(&mut self) -> Option<Result<String, LlmError>> {
        loop {
            if let Some(delta) = self.pending.pop_front() {
                return Some(Ok(delta));
            }
            if self.finished {
                return None;
            }

            match tokio::time::timeout(self.idle_timeout, self.body.next()).await {
                Err(_) => {
                    self.finished = true;
                    return Some(Err(LlmError::Timeout(self.idle_timeout)));
                }
                Ok(Some(Err(e))) => {
                    self.finished = true;
                    return Some(Err(LlmError::Request(e)));
                }
                Ok(Some(Ok(bytes))) => {
                    self.buffer.extend_from_slice(&bytes);
                    self.drain_lines();
                }
                Ok(None) => {
                    self.finished = true;
                    let rest = std::mem::take(&mut self.buffer);
                    self.push_line(&String::from_utf8_lossy(&rest));
                }
            }
        }
    }

    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.push_line(&String::from_utf8_lossy(&line));
        }
    }

    fn push_line(&mut self, line: &str) {
        if let Some(delta) = parse_delta_line(line) {
            self.pending.push_back(delta);
        }
    }
}

/// Extracts the content delta from one SSE line. Blank lines, `[DONE]`,
/// comments and undecodable payloads yield `None`.
pub fn parse_delta_line(line: &str) -> Option<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let payload = line.strip_prefix("data: ").unwrap_or(line);
    if payload == "[DONE]" || payload.trim().is_empty() {
        return None;
    }

    let chunk: ChatStreamChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(_) => {
            log::debug!("Skipping undecodable stream line: {}", payload);
            return None;
        }
    };

    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
}
