//! Built-in provider catalog.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of the provider used when nothing else works.
pub const DEFAULT_PROVIDER_ID: &str = "pollinations-xl";

/// Default base URL of the native rasterizer.
pub const NATIVE_BASE_URL: &str = "https://image.pollinations.ai";

/// Default base URL of the inference endpoints.
pub const INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// How a provider is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderFamily {
    /// Free URL-templated rasterizer, no authentication.
    NativeRasterizer,
    /// Authenticated JSON POST to a model-specific endpoint.
    InferenceEndpoint,
}

impl ProviderFamily {
    /// Returns the kebab-case name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NativeRasterizer => "native-rasterizer",
            Self::InferenceEndpoint => "inference-endpoint",
        }
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of one selectable provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    /// Stable id used in requests.
    pub id: &'static str,
    /// Name shown to users.
    pub display_name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Provider family.
    pub family: ProviderFamily,
    /// Remote model path (inference) or variant name (native).
    pub model: &'static str,
}

impl ProviderDescriptor {
    /// Returns the default remote locator for this provider.
    pub fn endpoint(&self) -> String {
        match self.family {
            ProviderFamily::NativeRasterizer => format!("{NATIVE_BASE_URL}/prompt"),
            ProviderFamily::InferenceEndpoint => format!("{INFERENCE_BASE_URL}/{}", self.model),
        }
    }
}

static PROVIDERS: &[ProviderDescriptor] = &[
    ProviderDescriptor {
        id: DEFAULT_PROVIDER_ID,
        display_name: "Pollinations XL",
        description: "Completely free, no limits, supports all dimensions",
        family: ProviderFamily::NativeRasterizer,
        model: "flux",
    },
    ProviderDescriptor {
        id: "stable-diffusion-v1-5",
        display_name: "Stable Diffusion v1.5",
        description: "High-quality general purpose image generation",
        family: ProviderFamily::InferenceEndpoint,
        model: "runwayml/stable-diffusion-v1-5",
    },
    ProviderDescriptor {
        id: "stable-diffusion-xl",
        display_name: "Stable Diffusion XL",
        description: "Enhanced version with better quality and detail",
        family: ProviderFamily::InferenceEndpoint,
        model: "stabilityai/stable-diffusion-xl-base-1.0",
    },
    ProviderDescriptor {
        id: "dreamshaper",
        display_name: "DreamShaper v8",
        description: "Versatile model for artistic and photorealistic images",
        family: ProviderFamily::InferenceEndpoint,
        model: "Lykon/DreamShaper",
    },
    ProviderDescriptor {
        id: "anything-v5",
        display_name: "Anything V5 (Anime)",
        description: "Perfect for anime and illustration style images",
        family: ProviderFamily::InferenceEndpoint,
        model: "stablediffusionapi/anything-v5",
    },
    ProviderDescriptor {
        id: "realistic-vision",
        display_name: "Realistic Vision",
        description: "Ultra-realistic photographic style images",
        family: ProviderFamily::InferenceEndpoint,
        model: "SG161222/Realistic_Vision_V6.0_B1_noVAE",
    },
];

/// Read-only view over the built-in provider table.
pub struct ProviderRegistry;

impl ProviderRegistry {
    /// Returns every descriptor in display order.
    pub fn all() -> &'static [ProviderDescriptor] {
        PROVIDERS
    }

    /// Looks up a descriptor by id.
    pub fn get(id: &str) -> Option<&'static ProviderDescriptor> {
        PROVIDERS.iter().find(|p| p.id == id)
    }

    /// Returns the native rasterizer default.
    pub fn default_provider() -> &'static ProviderDescriptor {
        &PROVIDERS[0]
    }

    /// Returns all descriptors of one family.
    pub fn by_family(family: ProviderFamily) -> impl Iterator<Item = &'static ProviderDescriptor> {
        PROVIDERS.iter().filter(move |p| p.family == family)
    }
}
