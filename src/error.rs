//! Error types for the generation pipeline.

use std::fmt;

/// Maximum prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize = 500;

/// A prompt rejected before any provider is contacted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The prompt is empty or whitespace only.
    #[error("prompt cannot be empty")]
    EmptyPrompt,

    /// The prompt exceeds [`MAX_PROMPT_CHARS`].
    #[error("prompt must be at most {max} characters (got {length})")]
    PromptTooLong {
        /// Characters submitted.
        length: usize,
        /// Characters allowed.
        max: usize,
    },
}

/// Why a single provider attempt chain gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The provider did not return a decodable raster.
    LoadFailed,
    /// Every retry was spent.
    Exhausted,
    /// No credential was available for an authenticated provider.
    Unauthorized,
    /// The requested provider id is not in the registry.
    UnknownProvider,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadFailed => write!(f, "load failed"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::UnknownProvider => write!(f, "unknown provider"),
        }
    }
}

/// Errors that can occur while generating an image.
#[derive(Debug, thiserror::Error)]
pub enum GenFrameError {
    /// Prompt failed validation. The only failure surfaced to end users.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Request parameters are out of range.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A provider adapter failed. Absorbed by the fallback chain.
    #[error("{provider} {kind} after {attempts} attempt(s): {message}")]
    Provider {
        /// Adapter or variant name.
        provider: String,
        /// Failure class.
        kind: FailureKind,
        /// Last underlying error.
        message: String,
        /// HTTP status of the last response, if any.
        status: Option<u16>,
        /// Remote attempts made.
        attempts: u32,
    },

    /// The destination raster could not be created or encoded.
    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    /// Every strategy, placeholder included, failed.
    #[error("image generation failed, please try again")]
    Exhausted,

    /// No usable credential.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Remote returned a non-success response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the remote.
        message: String,
    },

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body was not a decodable image.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenFrameError {
    /// Returns true if this error is likely transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Decode(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Validation(_)
            | Self::InvalidRequest(_)
            | Self::Provider { .. }
            | Self::EncodingFailed(_)
            | Self::Exhausted
            | Self::Auth(_)
            | Self::Io(_)
            | Self::Json(_) => false,
        }
    }

    /// Returns the HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Provider { status, .. } => *status,
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true when the model behind an inference endpoint is still loading.
    pub fn is_model_loading(&self) -> bool {
        self.status() == Some(503)
    }

    /// Number of remote attempts this error accounts for.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Provider { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    pub(crate) fn provider(
        provider: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            kind,
            message: message.into(),
            status: None,
            attempts: 1,
        }
    }
}

impl From<image::ImageError> for GenFrameError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Decoding(e) => Self::Decode(e.to_string()),
            image::ImageError::Unsupported(e) => Self::Decode(e.to_string()),
            other => Self::EncodingFailed(other.to_string()),
        }
    }
}

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenFrameError>;
