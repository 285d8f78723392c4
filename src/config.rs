//! Runtime configuration.

use crate::generation::credentials::{CredentialRotator, TOKENS_ENV_VAR};
use crate::generation::provider::RetryPolicy;
use crate::generation::providers::{
    INFERENCE_URL_ENV_VAR, MAX_REMOTE_SIDE, MIN_BODY_BYTES, NATIVE_URL_ENV_VAR,
};
use crate::generation::registry::{INFERENCE_BASE_URL, NATIVE_BASE_URL};
use crate::history::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Environment variable holding the request timeout in seconds.
pub const TIMEOUT_ENV_VAR: &str = "GENFRAME_TIMEOUT_SECS";

/// Settings shared by the pipeline components.
///
/// `Config::default()` targets the public services with no credentials;
/// [`Config::from_env`] overlays environment variables on top.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the native rasterizer.
    pub native_url: String,
    /// Base URL of the inference endpoints; the model path is appended.
    pub inference_url: String,
    /// Inference bearer tokens. Never serialized.
    #[serde(skip_serializing)]
    pub api_tokens: Vec<String>,
    /// Per-request HTTP timeout.
    #[serde(with = "secs")]
    pub timeout: Duration,
    /// Inference retry schedule.
    pub retry: RetryPolicy,
    /// Largest side sent to an inference endpoint.
    pub max_inference_side: u32,
    /// Smallest inference body accepted as an image.
    pub min_body_bytes: usize,
    /// Interval between progress estimate updates.
    #[serde(with = "millis")]
    pub progress_tick: Duration,
    /// Number of results kept in the history log.
    pub history_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            native_url: NATIVE_BASE_URL.to_string(),
            inference_url: INFERENCE_BASE_URL.to_string(),
            api_tokens: Vec::new(),
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            max_inference_side: MAX_REMOTE_SIDE,
            min_body_bytes: MIN_BODY_BYTES,
            progress_tick: Duration::from_millis(800),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl Config {
    /// Defaults overlaid with `GENFRAME_NATIVE_URL`, `GENFRAME_INFERENCE_URL`,
    /// `HF_API_TOKENS` and `GENFRAME_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup(NATIVE_URL_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            config.native_url = url.trim().to_string();
        }
        if let Some(url) = lookup(INFERENCE_URL_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            config.inference_url = url.trim().to_string();
        }
        if let Some(tokens) = lookup(TOKENS_ENV_VAR) {
            config.api_tokens = tokens
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = lookup(TIMEOUT_ENV_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %raw, "ignoring invalid {TIMEOUT_ENV_VAR}"),
            }
        }

        config
    }

    /// Builds a rotator over the configured tokens.
    pub fn rotator(&self) -> CredentialRotator {
        CredentialRotator::new(self.api_tokens.iter().cloned())
    }

    /// Builds the HTTP client shared by every adapter.
    pub fn http_client(&self) -> crate::Result<reqwest::Client> {
        Ok(reqwest::Client::builder().timeout(self.timeout).build()?)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("native_url", &self.native_url)
            .field("inference_url", &self.inference_url)
            .field("api_tokens", &format_args!("[{} redacted]", self.api_tokens.len()))
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("max_inference_side", &self.max_inference_side)
            .field("min_body_bytes", &self.min_body_bytes)
            .field("progress_tick", &self.progress_tick)
            .field("history_capacity", &self.history_capacity)
            .finish()
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
