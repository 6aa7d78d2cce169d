use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-4";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// What to do with streamed text when the client goes away mid-answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialReplyPolicy {
    /// Record what was already delivered as the assistant message.
    Commit,
    /// Record nothing.
    Discard,
}

impl FromStr for PartialReplyPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "commit" => Ok(Self::Commit),
            "discard" => Ok(Self::Discard),
            other => Err(anyhow::anyhow!(
                "invalid partial reply policy '{}', expected 'commit' or 'discard'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub referer: String,
    pub title: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub top_k: usize,
    pub preview_chars: usize,
    pub stream_buffer: usize,
    pub partial_policy: PartialReplyPolicy,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            top_k: crate::context_selector::TOP_K,
            preview_chars: crate::context_selector::PREVIEW_CHARS,
            stream_buffer: 32,
            partial_policy: PartialReplyPolicy::Commit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub frontend_url: String,
    pub max_sessions: Option<usize>,
    pub llm: LlmConfig,
    pub chat: ChatSettings,
}

impl AppConfig {
    /// Reads configuration from the process environment (after `.env` has
    /// been loaded by the caller).
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENROUTER_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENROUTER_API_KEY environment variable not set"))?;

        let frontend_url = env_or("FRONTEND_URL", "http://localhost:3000");
        let timeout_secs: u64 = parse_env("LLM_TIMEOUT_SECS", 60)?;
        let max_sessions: usize = parse_env("MAX_SESSIONS", 1000)?;
        let partial_policy: PartialReplyPolicy =
            env_or("STREAM_PARTIAL_POLICY", "commit").parse()?;

        Ok(Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8000"),
            max_sessions: (max_sessions > 0).then_some(max_sessions),
            llm: LlmConfig {
                api_base: env_or("LLM_API_BASE", DEFAULT_API_BASE),
                api_key,
                referer: frontend_url.clone(),
                title: env_or("APP_TITLE", "AskAI Chat"),
                timeout: Duration::from_secs(timeout_secs),
            },
            frontend_url,
            chat: ChatSettings {
                partial_policy,
                ..ChatSettings::default()
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: '{}'", key, raw)),
        _ => Ok(default),
    }
}
