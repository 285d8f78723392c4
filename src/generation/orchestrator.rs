//! The fallback chain.
//!
//! Strategies run strictly one after another until one yields an image:
//!
//! 1. the requested provider (native default or an inference endpoint),
//! 2. the native default again as a fallback,
//! 3. each alternate native variant,
//! 4. a locally rendered placeholder.
//!
//! Failures of steps 1 to 3 are logged and absorbed. Only prompt validation
//! and undrawable sizes reach the caller, plus [`GenFrameError::Exhausted`]
//! if even the placeholder cannot be encoded.

use crate::config::Config;
use crate::error::{FailureKind, GenFrameError, Result};
use crate::generation::placeholder::render_placeholder;
use crate::generation::provider::{ImageProvider, ProviderOutput};
use crate::generation::providers::{HuggingFaceProvider, PollinationsProvider, PollinationsVariant};
use crate::generation::registry::{ProviderFamily, ProviderRegistry, DEFAULT_PROVIDER_ID};
use crate::generation::types::{
    ensure_drawable, GeneratedImageResult, GenerationMetadata, GenerationRequest, Strategy,
};
use crate::generation::validate::validate_prompt;
use chrono::Utc;
use rand::Rng;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Ceiling of the progress estimate while the chain is still running.
pub const PROGRESS_CEILING: u8 = 95;

/// Largest random step added to the estimate per tick.
const PROGRESS_STEP: u8 = 15;

type Step = (Strategy, Box<dyn ImageProvider>);

/// Drives the adapters in priority order.
#[derive(Debug, Clone)]
pub struct FallbackOrchestrator {
    native: PollinationsProvider,
    inference: HuggingFaceProvider,
    progress_tick: Duration,
}

impl FallbackOrchestrator {
    /// Creates an orchestrator over a native adapter and an inference adapter.
    ///
    /// The inference adapter is re-targeted per request with
    /// [`HuggingFaceProvider::for_model`].
    pub fn new(native: PollinationsProvider, inference: HuggingFaceProvider) -> Self {
        Self {
            native,
            inference,
            progress_tick: Duration::from_millis(800),
        }
    }

    /// Builds both adapters from `config`, sharing one HTTP client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = config.http_client()?;
        let native = PollinationsProvider::builder()
            .base_url(&config.native_url)
            .client(client.clone())
            .build()?;
        let inference = HuggingFaceProvider::builder()
            .base_url(&config.inference_url)
            .client(client)
            .rotator(config.rotator())
            .retry(config.retry)
            .max_side(config.max_inference_side)
            .min_body_bytes(config.min_body_bytes)
            .build()?;

        Ok(Self::new(native, inference).with_progress_tick(config.progress_tick))
    }

    /// Sets the interval between progress updates.
    pub fn with_progress_tick(mut self, tick: Duration) -> Self {
        self.progress_tick = tick.max(Duration::from_millis(1));
        self
    }

    /// The native adapter.
    pub fn native(&self) -> &PollinationsProvider {
        &self.native
    }

    /// The inference adapter.
    pub fn inference(&self) -> &HuggingFaceProvider {
        &self.inference
    }

    /// Runs the chain for `request`.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImageResult> {
        validate_prompt(&request.prompt)?;
        let size = request.dimensions();
        ensure_drawable(size)?;

        let started = Instant::now();
        let mut attempts = 0u32;
        let mut requested_failed = false;

        let requested = self.requested_step(request);
        if requested.is_none() {
            requested_failed = true;
            let err = GenFrameError::provider(
                &request.provider_id,
                FailureKind::UnknownProvider,
                "not in the provider registry",
            );
            tracing::warn!(provider = %request.provider_id, "skipping requested provider: {err}");
        }

        for (strategy, provider) in requested.into_iter().chain(self.fallback_steps()) {
            match provider.generate(request).await {
                Ok(output) => {
                    attempts += output.attempts;
                    tracing::info!(
                        provider = provider.name(),
                        %strategy,
                        attempts,
                        size = %size,
                        "image generated"
                    );
                    let recommendation = self.recommendation(request, requested_failed);
                    return Ok(finish(request, strategy, output, attempts, started, recommendation));
                }
                Err(err) => {
                    attempts += err.attempts().max(1);
                    if strategy == Strategy::Requested {
                        requested_failed = true;
                    }
                    tracing::warn!(
                        provider = provider.name(),
                        %strategy,
                        status = err.status(),
                        "strategy failed: {err}"
                    );
                }
            }
        }

        match render_placeholder(&request.prompt, size) {
            Ok(image) => {
                tracing::warn!(size = %size, attempts, "every provider failed, using placeholder");
                let output = ProviderOutput {
                    image,
                    attempts: 0,
                    retry_delays: Vec::new(),
                    model: None,
                    seed: None,
                };
                let recommendation = self.recommendation(request, requested_failed);
                Ok(finish(
                    request,
                    Strategy::Placeholder,
                    output,
                    attempts,
                    started,
                    recommendation,
                ))
            }
            Err(err) => {
                tracing::error!(size = %size, "placeholder failed: {err}");
                Err(GenFrameError::Exhausted)
            }
        }
    }

    /// Runs the chain while publishing a cosmetic completion estimate.
    ///
    /// The estimate starts at 0, grows by a random 0 to 15 points per tick
    /// without passing 95, and is set to 100 once a result is ready. On error
    /// it is reset to 0.
    pub async fn generate_with_progress(
        &self,
        request: &GenerationRequest,
        progress: watch::Sender<u8>,
    ) -> Result<GeneratedImageResult> {
        progress.send_replace(0);

        let chain = self.generate(request);
        tokio::pin!(chain);

        let mut ticker = tokio::time::interval(self.progress_tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        let result = loop {
            tokio::select! {
                biased;
                result = &mut chain => break result,
                _ = ticker.tick() => {
                    let step = rand::thread_rng().gen_range(0..=PROGRESS_STEP);
                    progress.send_modify(|p| *p = advance(*p, step));
                }
            }
        };

        progress.send_replace(if result.is_ok() { 100 } else { 0 });
        result
    }

    fn requested_step(&self, request: &GenerationRequest) -> Option<Step> {
        let descriptor = ProviderRegistry::get(&request.provider_id)?;
        let provider: Box<dyn ImageProvider> = match descriptor.family {
            ProviderFamily::NativeRasterizer => {
                Box::new(self.native.with_variant(PollinationsVariant::PRIMARY))
            }
            ProviderFamily::InferenceEndpoint => Box::new(self.inference.for_model(descriptor)),
        };
        Some((Strategy::Requested, provider))
    }

    fn fallback_steps(&self) -> impl Iterator<Item = Step> + '_ {
        let primary: Box<dyn ImageProvider> =
            Box::new(self.native.with_variant(PollinationsVariant::PRIMARY));
        std::iter::once((Strategy::NativeFallback, primary)).chain(
            PollinationsVariant::ALTERNATES
                .iter()
                .enumerate()
                .map(move |(i, variant)| {
                    let provider: Box<dyn ImageProvider> =
                        Box::new(self.native.with_variant(*variant));
                    (Strategy::Alternate(i), provider)
                }),
        )
    }

    fn recommendation(
        &self,
        request: &GenerationRequest,
        requested_failed: bool,
    ) -> Option<String> {
        (requested_failed && request.provider_id != DEFAULT_PROVIDER_ID)
            .then(|| DEFAULT_PROVIDER_ID.to_string())
    }
}

fn advance(current: u8, step: u8) -> u8 {
    current.saturating_add(step).min(PROGRESS_CEILING)
}

fn finish(
    request: &GenerationRequest,
    strategy: Strategy,
    output: ProviderOutput,
    attempts: u32,
    started: Instant,
    recommendation: Option<String>,
) -> GeneratedImageResult {
    GeneratedImageResult {
        dimensions: output.image.dimensions(),
        image: output.image,
        prompt: request.prompt.clone(),
        provider_id: request.provider_id.clone(),
        created_at: Utc::now(),
        metadata: GenerationMetadata {
            strategy,
            attempts,
            retry_delays: output.retry_delays,
            model: output.model,
            seed: output.seed,
            duration_ms: started.elapsed().as_millis() as u64,
        },
        recommendation,
    }
}
