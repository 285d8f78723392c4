//! Hugging Face inference endpoints.
//!
//! Each model is a separate endpoint taking an authenticated JSON POST and
//! answering with raw image bytes. Requests rotate through a shared token
//! pool, are capped at 1024 px per side, and are retried on any remote
//! failure.

use crate::error::{FailureKind, GenFrameError, Result};
use crate::generation::credentials::CredentialRotator;
use crate::generation::normalize::normalize;
use crate::generation::provider::{with_retries, ImageProvider, ProviderOutput, RetryPolicy};
use crate::generation::registry::{ProviderDescriptor, ProviderFamily, INFERENCE_BASE_URL};
use crate::generation::types::{Dimensions, GenerationRequest, ImageFormat, ImageHandle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding the inference base URL.
pub const INFERENCE_URL_ENV_VAR: &str = "GENFRAME_INFERENCE_URL";

/// Largest side the remote accepts.
pub const MAX_REMOTE_SIDE: u32 = 1024;

/// Bodies smaller than this are error pages, not images.
pub const MIN_BODY_BYTES: usize = 1000;

const ENHANCE_SUFFIX: &str =
    ", high quality, detailed, masterpiece, best quality, ultra detailed, professional";
const NEGATIVE_PROMPT: &str =
    "blurry, bad quality, distorted, deformed, ugly, bad anatomy, low quality";
const INFERENCE_STEPS: u32 = 30;
const GUIDANCE_SCALE: f32 = 7.5;

const DEFAULT_ID: &str = "stable-diffusion-v1-5";
const DEFAULT_MODEL: &str = "runwayml/stable-diffusion-v1-5";

/// Builder for HuggingFaceProvider.
#[derive(Debug, Clone)]
pub struct HuggingFaceProviderBuilder {
    base_url: Option<String>,
    id: String,
    model: String,
    rotator: Option<CredentialRotator>,
    retry: RetryPolicy,
    max_side: u32,
    min_body_bytes: usize,
    client: Option<reqwest::Client>,
    timeout: Duration,
}

impl Default for HuggingFaceProviderBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            id: DEFAULT_ID.to_string(),
            model: DEFAULT_MODEL.to_string(),
            rotator: None,
            retry: RetryPolicy::default(),
            max_side: MAX_REMOTE_SIDE,
            min_body_bytes: MIN_BODY_BYTES,
            client: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl HuggingFaceProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL. Falls back to `GENFRAME_INFERENCE_URL`, then the public host.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Targets the model behind a registry descriptor.
    pub fn descriptor(mut self, descriptor: &ProviderDescriptor) -> Self {
        self.id = descriptor.id.to_string();
        self.model = descriptor.model.to_string();
        self
    }

    /// Sets the token pool. Falls back to `HF_API_TOKENS`.
    pub fn rotator(mut self, rotator: CredentialRotator) -> Self {
        self.rotator = Some(rotator);
        self
    }

    /// Sets the retry schedule.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the per-side cap applied to remote requests.
    pub fn max_side(mut self, max_side: u32) -> Self {
        self.max_side = max_side.max(1);
        self
    }

    /// Sets the smallest body accepted as an image.
    pub fn min_body_bytes(mut self, bytes: usize) -> Self {
        self.min_body_bytes = bytes;
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
    pub fn build(self) -> Result<HuggingFaceProvider> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var(INFERENCE_URL_ENV_VAR).ok())
            .unwrap_or_else(|| INFERENCE_BASE_URL.to_string());

        let client = match self.client {
            Some(client) => client,
            None => reqwest::Client::builder().timeout(self.timeout).build()?,
        };

        Ok(HuggingFaceProvider {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            id: self.id,
            model: self.model,
            rotator: self.rotator.unwrap_or_else(CredentialRotator::from_env),
            retry: self.retry,
            max_side: self.max_side,
            min_body_bytes: self.min_body_bytes,
        })
    }
}

/// Hugging Face inference provider for one model.
#[derive(Debug, Clone)]
pub struct HuggingFaceProvider {
    client: reqwest::Client,
    base_url: String,
    id: String,
    model: String,
    rotator: CredentialRotator,
    retry: RetryPolicy,
    max_side: u32,
    min_body_bytes: usize,
}

impl HuggingFaceProvider {
    /// Creates a new `HuggingFaceProviderBuilder`.
    pub fn builder() -> HuggingFaceProviderBuilder {
        HuggingFaceProviderBuilder::new()
    }

    /// Returns a provider for another model, sharing client, pool and policy.
    pub fn for_model(&self, descriptor: &ProviderDescriptor) -> Self {
        Self {
            id: descriptor.id.to_string(),
            model: descriptor.model.to_string(),
            ..self.clone()
        }
    }

    /// Returns the remote model path.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the model endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, self.model)
    }

    /// Size sent to the remote for a requested size.
    pub fn remote_size(&self, requested: Dimensions) -> Dimensions {
        requested.clamp_to(self.max_side)
    }

    async fn attempt(&self, prompt: &str, remote: Dimensions) -> Result<Fetched> {
        let token = self.rotator.next_token()?;
        let body = HuggingFaceRequest::new(prompt, remote);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenFrameError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let data = response.bytes().await?;
        if data.len() < self.min_body_bytes {
            return Err(GenFrameError::Decode(format!(
                "response body too small ({} bytes)",
                data.len()
            )));
        }

        let image = image::load_from_memory(&data)?;
        Ok(Fetched {
            data: data.to_vec(),
            image,
        })
    }
}

struct Fetched {
    data: Vec<u8>,
    image: image::DynamicImage,
}

#[async_trait]
impl ImageProvider for HuggingFaceProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderOutput> {
        let requested = request.dimensions();
        let remote = self.remote_size(requested);

        let retried = with_retries(&self.id, &self.retry, |attempt| {
            tracing::debug!(provider = %self.id, attempt, %remote, "posting inference request");
            self.attempt(&request.prompt, remote)
        })
        .await?;

        let fetched = retried.value;
        let received = Dimensions::new(fetched.image.width(), fetched.image.height());
        let format = image::guess_format(&fetched.data)
            .ok()
            .and_then(ImageFormat::from_image_format);

        // Pass through only an exact-size raster in a format handles can label.
        let image = match format {
            Some(format) if received == requested => {
                ImageHandle::new(fetched.data, format, received)
            }
            _ => {
                tracing::debug!(
                    provider = %self.id,
                    %received,
                    %requested,
                    ?format,
                    "reframing inference output"
                );
                normalize(&fetched.image, requested).map_err(|e| GenFrameError::Provider {
                    provider: self.id.clone(),
                    kind: FailureKind::LoadFailed,
                    message: e.to_string(),
                    status: None,
                    attempts: retried.attempts,
                })?
            }
        };

        Ok(ProviderOutput {
            image,
            attempts: retried.attempts,
            retry_delays: retried.delays,
            model: Some(self.model.clone()),
            seed: None,
        })
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::InferenceEndpoint
    }

    fn name(&self) -> &str {
        &self.id
    }

    /// 401 counts as reachable: the service answered, only the token was refused.
    async fn health_check(&self) -> Result<()> {
        let mut request = self
            .client
            .post(self.endpoint())
            .json(&serde_json::json!({ "inputs": "test" }));
        if let Ok(token) = self.rotator.next_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status().as_u16() {
            401 => Ok(()),
            s if (200..300).contains(&s) => Ok(()),
            s => Err(GenFrameError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
        }
    }
}

/// Extracts the `error` field of a JSON error body, else the trimmed text.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.trim().chars().take(200).collect(),
    }
}

#[derive(Debug, Serialize)]
struct HuggingFaceRequest {
    inputs: String,
    parameters: HuggingFaceParameters,
    options: HuggingFaceOptions,
}

#[derive(Debug, Serialize)]
struct HuggingFaceParameters {
    num_inference_steps: u32,
    guidance_scale: f32,
    width: u32,
    height: u32,
    negative_prompt: &'static str,
}

#[derive(Debug, Serialize)]
struct HuggingFaceOptions {
    wait_for_model: bool,
    use_cache: bool,
}

impl HuggingFaceRequest {
    fn new(prompt: &str, remote: Dimensions) -> Self {
        Self {
            inputs: format!("{prompt}{ENHANCE_SUFFIX}"),
            parameters: HuggingFaceParameters {
                num_inference_steps: INFERENCE_STEPS,
                guidance_scale: GUIDANCE_SCALE,
                width: remote.width,
                height: remote.height,
                negative_prompt: NEGATIVE_PROMPT,
            },
            options: HuggingFaceOptions {
                wait_for_model: true,
                use_cache: false,
            },
        }
    }
}
