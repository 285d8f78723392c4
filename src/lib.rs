#![warn(missing_docs)]
//! GenFrame - prompt-to-image pipeline with provider fallback.
//!
//! A prompt and a target size go in; a raster of exactly that size comes
//! out. Providers are tried in a fixed order (the requested one, the free
//! native rasterizer, its alternate variants) and a locally rendered
//! placeholder closes the chain, so only an invalid request ever fails.
//!
//! # Quick Start
//!
//! ```no_run
//! use genframe::Studio;
//!
//! #[tokio::main]
//! async fn main() -> genframe::Result<()> {
//!     let studio = Studio::from_env()?;
//!     let result = studio
//!         .request_generation("A lighthouse at dusk", "pollinations-xl", 1920, 1080)
//!         .await?;
//!     result.image.save("lighthouse.png")?;
//!     Ok(())
//! }
//! ```
//!
//! # Using one adapter directly
//!
//! ```no_run
//! use genframe::{GenerationRequest, HuggingFaceProvider, ImageProvider};
//!
//! #[tokio::main]
//! async fn main() -> genframe::Result<()> {
//!     let provider = HuggingFaceProvider::builder().build()?;
//!     let request = GenerationRequest::new("A red fox", "stable-diffusion-v1-5")
//!         .with_size(2048, 2048);
//!     let output = provider.generate(&request).await?;
//!     assert_eq!(output.image.width(), 2048);
//!     Ok(())
//! }
//! ```
//!
//! # Environment
//!
//! - `HF_API_TOKENS`: comma-separated inference tokens
//! - `GENFRAME_NATIVE_URL`, `GENFRAME_INFERENCE_URL`: base URL overrides
//! - `GENFRAME_TIMEOUT_SECS`: per-request timeout

pub mod config;
mod error;
pub mod generation;
pub mod history;
mod studio;

pub use config::Config;
pub use error::{FailureKind, GenFrameError, Result, ValidationError, MAX_PROMPT_CHARS};
pub use history::HistoryLog;
pub use studio::Studio;

pub use generation::providers::{
    HuggingFaceProvider, HuggingFaceProviderBuilder, PollinationsProvider,
    PollinationsProviderBuilder, PollinationsVariant,
};
pub use generation::{
    presets, validate_prompt, AvailabilityProber, AvailabilityReport, CredentialRotator,
    Dimensions, FallbackOrchestrator, GeneratedImageResult, GenerationMetadata,
    GenerationRequest, ImageFormat, ImageHandle, ImageProvider, ProviderDescriptor,
    ProviderFamily, ProviderRegistry, RetryPolicy, Strategy, WeakImageHandle,
    DEFAULT_PROVIDER_ID,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{GenFrameError, Result};
    pub use crate::generation::providers::{HuggingFaceProvider, PollinationsProvider};
    pub use crate::generation::{
        Dimensions, GeneratedImageResult, GenerationRequest, ImageHandle, ImageProvider,
    };
    pub use crate::studio::Studio;
}
