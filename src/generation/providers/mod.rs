//! Image generation providers.

mod huggingface;
mod pollinations;

pub use huggingface::{
    HuggingFaceProvider, HuggingFaceProviderBuilder, INFERENCE_URL_ENV_VAR, MAX_REMOTE_SIDE,
    MIN_BODY_BYTES,
};
pub use pollinations::{
    PollinationsProvider, PollinationsProviderBuilder, PollinationsVariant, NATIVE_URL_ENV_VAR,
};
