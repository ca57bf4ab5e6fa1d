use crate::quota::QuotaHints;
use crate::transport::{ChatExchange, CompletionService};
use crate::types::message::Prompt;
use crate::{Error, Result};
use async_trait::async_trait;
use keyring::Entry;
use reqwest::header::HeaderMap;
use reqwest::Proxy;
use std::env;
use std::time::Duration;

/// Rate-limit headers OpenAI-compatible providers attach to responses.
const REMAINING_REQUESTS: &str = "x-ratelimit-remaining-requests";
const REMAINING_TOKENS: &str = "x-ratelimit-remaining-tokens";
const RESET_REQUESTS: &str = "x-ratelimit-reset-requests";
const RESET_TOKENS: &str = "x-ratelimit-reset-tokens";

/// Reqwest-backed chat completion service for OpenAI-compatible endpoints.
///
/// Performs one `POST {base_url}/chat/completions` per call and captures the
/// `x-ratelimit-*` headers into [`QuotaHints`]. No deadline is applied here;
/// the dispatcher wraps the whole call in its own timeout.
#[derive(Debug)]
pub struct HttpChatService {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpChatService {
    /// Create a service for the given endpoint and model.
    ///
    /// Credentials are resolved for the `openai` provider id: OS keyring
    /// first, then the `OPENAI_API_KEY` environment variable. Use
    /// [`with_provider`](Self::with_provider) or
    /// [`with_api_key`](Self::with_api_key) to override.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)
            .map_err(|e| Error::config(format!("invalid base url {base_url:?}: {e}")))?;

        Ok(Self {
            client: Self::build_client()?,
            base_url,
            model: model.into(),
            api_key: Self::get_api_key("openai"),
        })
    }

    /// Re-resolve credentials for another provider id (keyring, then
    /// `{PROVIDER}_API_KEY`).
    pub fn with_provider(mut self, provider_id: &str) -> Self {
        self.api_key = Self::get_api_key(provider_id);
        self
    }

    /// Use an explicit API key instead of the lookup chain.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn build_client() -> Result<reqwest::Client> {
        // Pool/keepalive defaults are env-overridable; the per-call deadline
        // lives in the dispatcher, so no total timeout is set here.
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(
                env::var("SWEEP_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env::var("SWEEP_HTTP_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(90),
            )))
            .http2_adaptive_window(true)
            .http2_keep_alive_interval(Some(Duration::from_secs(30)))
            .http2_keep_alive_timeout(Duration::from_secs(10));

        if let Ok(proxy_url) = env::var("SWEEP_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))
    }

    fn get_api_key(provider_id: &str) -> Option<String> {
        // 1. Try Keyring
        let entry = Entry::new("paper-sweep", provider_id).ok();
        if let Some(entry) = entry {
            if let Ok(key) = entry.get_password() {
                return Some(key);
            }
        }

        // 2. Try Environment Variable (PROVIDER_API_KEY)
        let env_var = format!("{}_API_KEY", provider_id.to_uppercase());
        env::var(env_var).ok()
    }
}

#[async_trait]
impl CompletionService for HttpChatService {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatExchange> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "messages": prompt.messages(),
        });

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(TransportError::Http)?;

        let status = resp.status();
        let headers = resp.headers().clone();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), excerpt(&body_text)));
        }

        let quota = quota_hints(&headers);

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::parse(format!("completion response is not valid JSON: {e}")))?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::parse("completion response missing choices[0].message.content"))?
            .to_string();

        Ok(ChatExchange { content, quota })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let v = headers.get(name)?;
    let s = v.to_str().ok()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Lift the four rate-limit headers into [`QuotaHints`]. Missing or garbled
/// headers become `None`; the quota tracker decides what that means.
pub fn quota_hints(headers: &HeaderMap) -> QuotaHints {
    QuotaHints {
        remaining_requests: header_value(headers, REMAINING_REQUESTS).and_then(|s| s.parse().ok()),
        remaining_tokens: header_value(headers, REMAINING_TOKENS).and_then(|s| s.parse().ok()),
        reset_requests: header_value(headers, RESET_REQUESTS),
        reset_tokens: header_value(headers, RESET_TOKENS),
    }
}

fn excerpt(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    if trimmed.len() <= MAX {
        return trimmed.to_string();
    }
    let mut end = MAX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
