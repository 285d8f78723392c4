//! Image generation pipeline.

pub mod credentials;
pub mod normalize;
pub(crate) mod orchestrator;
mod placeholder;
pub mod presets;
pub(crate) mod probe;
pub(crate) mod provider;
pub mod providers;
pub(crate) mod registry;
pub(crate) mod types;
mod validate;

pub use credentials::CredentialRotator;
pub use normalize::normalize;
pub use orchestrator::{FallbackOrchestrator, PROGRESS_CEILING};
pub use placeholder::render_placeholder;
pub use presets::{DimensionPreset, PresetCategory};
pub use probe::{AvailabilityProber, AvailabilityReport};
pub use provider::{ImageProvider, ProviderOutput, RetryPolicy};
pub use registry::{
    ProviderDescriptor, ProviderFamily, ProviderRegistry, DEFAULT_PROVIDER_ID,
    INFERENCE_BASE_URL, NATIVE_BASE_URL,
};
pub use types::{
    Dimensions, GeneratedImageResult, GenerationMetadata, GenerationRequest, ImageFormat,
    ImageHandle, Strategy, WeakImageHandle,
};
pub use validate::validate_prompt;
