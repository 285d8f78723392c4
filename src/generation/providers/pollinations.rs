//! Pollinations native rasterizer, addressed by URL templating.

use crate::error::{FailureKind, GenFrameError, Result};
use crate::generation::normalize::normalize;
use crate::generation::provider::{ImageProvider, ProviderOutput};
use crate::generation::registry::{ProviderFamily, DEFAULT_PROVIDER_ID, NATIVE_BASE_URL};
use crate::generation::types::{Dimensions, GenerationRequest};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Environment variable overriding the rasterizer base URL.
pub const NATIVE_URL_ENV_VAR: &str = "GENFRAME_NATIVE_URL";

/// Exclusive upper bound of generated seeds.
const SEED_RANGE: u64 = 1_000_000;

/// One way of phrasing a rasterizer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollinationsVariant {
    /// Name used in logs and metadata.
    pub name: &'static str,
    /// Appended to the prompt before encoding.
    pub suffix: &'static str,
    /// Remote model, if pinned.
    pub model: Option<&'static str>,
    /// Send a random seed with each request.
    pub seeded: bool,
    /// Ask for the watermark-free rendition.
    pub nologo: bool,
}

impl PollinationsVariant {
    /// The default flux request.
    pub const PRIMARY: Self = Self {
        name: DEFAULT_PROVIDER_ID,
        suffix: ", high quality, detailed, masterpiece, professional, ultra detailed",
        model: Some("flux"),
        seeded: true,
        nologo: true,
    };

    /// Photographic wording on the turbo model, unseeded.
    pub const PHOTOREALISTIC: Self = Self {
        name: "pollinations-turbo",
        suffix: ", photorealistic, high resolution, detailed, professional",
        model: Some("turbo"),
        seeded: false,
        nologo: false,
    };

    /// Artistic wording on the remote's default model.
    pub const ARTISTIC: Self = Self {
        name: "pollinations-artistic",
        suffix: ", artistic, beautiful, high quality, professional",
        model: None,
        seeded: true,
        nologo: false,
    };

    /// Variants tried after the primary request, in order.
    pub const ALTERNATES: [Self; 2] = [Self::PHOTOREALISTIC, Self::ARTISTIC];
}

impl Default for PollinationsVariant {
    fn default() -> Self {
        Self::PRIMARY
    }
}

/// Builder for PollinationsProvider.
#[derive(Debug, Clone)]
pub struct PollinationsProviderBuilder {
    base_url: Option<String>,
    variant: PollinationsVariant,
    client: Option<reqwest::Client>,
    timeout: Duration,
}

impl Default for PollinationsProviderBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            variant: PollinationsVariant::default(),
            client: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl PollinationsProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL. Falls back to `GENFRAME_NATIVE_URL`, then the public host.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the request variant.
    pub fn variant(mut self, variant: PollinationsVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Shares an existing HTTP client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the request timeout used when no client is shared.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider.
    pub fn build(self) -> Result<PollinationsProvider> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var(NATIVE_URL_ENV_VAR).ok())
            .unwrap_or_else(|| NATIVE_BASE_URL.to_string());

        let client = match self.client {
            Some(client) => client,
            None => reqwest::Client::builder().timeout(self.timeout).build()?,
        };

        Ok(PollinationsProvider {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            variant: self.variant,
        })
    }
}

/// Pollinations image provider.
#[derive(Debug, Clone)]
pub struct PollinationsProvider {
    client: reqwest::Client,
    base_url: String,
    variant: PollinationsVariant,
}

impl PollinationsProvider {
    /// Creates a new `PollinationsProviderBuilder`.
    pub fn builder() -> PollinationsProviderBuilder {
        PollinationsProviderBuilder::new()
    }

    /// Returns a provider sharing this one's client but using `variant`.
    pub fn with_variant(&self, variant: PollinationsVariant) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            variant,
        }
    }

    /// Returns the active variant.
    pub fn variant(&self) -> &PollinationsVariant {
        &self.variant
    }

    /// Builds the templated request URL.
    pub fn request_url(&self, prompt: &str, size: Dimensions, seed: Option<u64>) -> String {
        let enhanced = format!("{prompt}{}", self.variant.suffix);
        let mut url = format!(
            "{}/prompt/{}?width={}&height={}",
            self.base_url,
            urlencoding::encode(&enhanced),
            size.width,
            size.height
        );
        if let Some(seed) = seed {
            url.push_str(&format!("&seed={seed}"));
        }
        url.push_str("&enhance=true");
        if self.variant.nologo {
            url.push_str("&nologo=true");
        }
        if let Some(model) = self.variant.model {
            url.push_str(&format!("&model={model}"));
        }
        url
    }

    async fn load(&self, url: &str) -> Result<image::DynamicImage> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenFrameError::Api {
                status: status.as_u16(),
                message: "Failed to load image".into(),
            });
        }

        let data = response.bytes().await?;
        Ok(image::load_from_memory(&data)?)
    }
}

#[async_trait]
impl ImageProvider for PollinationsProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderOutput> {
        let size = request.dimensions();
        let seed = self
            .variant
            .seeded
            .then(|| rand::thread_rng().gen_range(0..SEED_RANGE));
        let url = self.request_url(&request.prompt, size, seed);
        tracing::debug!(provider = self.variant.name, %size, ?seed, "requesting raster");

        let source = self.load(&url).await.map_err(|e| GenFrameError::Provider {
            provider: self.variant.name.to_string(),
            kind: FailureKind::LoadFailed,
            status: e.status(),
            message: e.to_string(),
            attempts: 1,
        })?;

        // The remote treats width/height as a hint, so always reframe.
        let image = normalize(&source, size)?;

        Ok(ProviderOutput {
            image,
            attempts: 1,
            retry_delays: Vec::new(),
            model: self.variant.model.map(str::to_string),
            seed,
        })
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::NativeRasterizer
    }

    fn name(&self) -> &str {
        self.variant.name
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/prompt/test?width=64&height=64", self.base_url);
        let response = self.client.head(&url).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(GenFrameError::Api {
                status: status.as_u16(),
                message: "Health check failed".into(),
            })
        }
    }
}
