//! Bearer token rotation over a shared pool.

use crate::error::{GenFrameError, Result};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Width of one rotation bucket.
pub const ROTATION_WINDOW_MS: u64 = 30_000;

/// Environment variable holding a comma-separated token pool.
pub const TOKENS_ENV_VAR: &str = "HF_API_TOKENS";

type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Picks a pool index from the current time bucket plus a random offset.
///
/// Pure: the same inputs always give the same index. `pool_len` must be
/// non-zero.
pub fn select_index(now_millis: u64, random_index: usize, pool_len: usize) -> usize {
    let bucket = (now_millis / ROTATION_WINDOW_MS) % pool_len as u64;
    (bucket as usize + random_index % pool_len) % pool_len
}

fn system_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Supplies one of several interchangeable tokens per call.
///
/// The pool is read-only, so concurrent callers need no locking. Any token
/// may be rejected by the remote; callers treat that as a per-call failure.
#[derive(Clone)]
pub struct CredentialRotator {
    pool: Arc<[String]>,
    clock: Clock,
}

impl CredentialRotator {
    /// Creates a rotator over the given tokens. Blank entries are dropped.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pool: Vec<String> = tokens
            .into_iter()
            .map(Into::into)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            pool: pool.into(),
            clock: Arc::new(system_millis),
        }
    }

    /// Reads the pool from `HF_API_TOKENS`.
    pub fn from_env() -> Self {
        let raw = std::env::var(TOKENS_ENV_VAR).unwrap_or_default();
        Self::new(raw.split(','))
    }

    /// Replaces the wall clock, in milliseconds since the epoch.
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Number of tokens in the pool.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Returns true if there is nothing to rotate over.
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Returns the token for this call.
    pub fn next_token(&self) -> Result<&str> {
        if self.pool.is_empty() {
            return Err(self.empty_pool());
        }
        let random_index = rand::thread_rng().gen_range(0..self.pool.len());
        self.next_token_with(random_index)
    }

    /// Returns the token for an explicit random draw.
    pub fn next_token_with(&self, random_index: usize) -> Result<&str> {
        if self.pool.is_empty() {
            return Err(self.empty_pool());
        }
        let index = select_index((self.clock)(), random_index, self.pool.len());
        Ok(&self.pool[index])
    }

    fn empty_pool(&self) -> GenFrameError {
        GenFrameError::Auth(format!(
            "{TOKENS_ENV_VAR} not set and no tokens provided"
        ))
    }
}

impl fmt::Debug for CredentialRotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRotator")
            .field("pool_size", &self.pool.len())
            .finish_non_exhaustive()
    }
}

impl Default for CredentialRotator {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}
