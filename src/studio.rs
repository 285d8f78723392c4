//! Entry point for front ends.

use crate::config::Config;
use crate::error::{Result, ValidationError};
use crate::generation::{
    validate_prompt, AvailabilityProber, AvailabilityReport, FallbackOrchestrator,
    GeneratedImageResult, GenerationRequest, ProviderDescriptor, ProviderRegistry,
};
use crate::history::HistoryLog;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Generation, probing and history behind one shareable value.
///
/// `Studio` is `Send + Sync`; wrap it in an `Arc` to share it between tasks.
/// The history lock is never held across an await.
#[derive(Debug)]
pub struct Studio {
    orchestrator: FallbackOrchestrator,
    prober: AvailabilityProber,
    history: Mutex<HistoryLog>,
}

impl Studio {
    /// Builds every component from `config`.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::from_parts(
            FallbackOrchestrator::from_config(config)?,
            AvailabilityProber::from_config(config)?,
            HistoryLog::with_capacity(config.history_capacity),
        ))
    }

    /// Builds from [`Config::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(&Config::from_env())
    }

    /// Assembles a studio from prebuilt parts.
    pub fn from_parts(
        orchestrator: FallbackOrchestrator,
        prober: AvailabilityProber,
        history: HistoryLog,
    ) -> Self {
        Self {
            orchestrator,
            prober,
            history: Mutex::new(history),
        }
    }

    /// Generates an image and records it in the history.
    ///
    /// Fails only on validation errors, non-positive sizes, or total
    /// exhaustion; provider failures surface as a placeholder result.
    pub async fn request_generation(
        &self,
        prompt: &str,
        provider_id: &str,
        width: u32,
        height: u32,
    ) -> Result<GeneratedImageResult> {
        let request = GenerationRequest::new(prompt, provider_id).with_size(width, height);
        let result = self.orchestrator.generate(&request).await?;
        self.record(&result);
        Ok(result)
    }

    /// Like [`Studio::request_generation`], publishing a progress estimate.
    pub async fn request_generation_with_progress(
        &self,
        request: &GenerationRequest,
        progress: watch::Sender<u8>,
    ) -> Result<GeneratedImageResult> {
        let result = self
            .orchestrator
            .generate_with_progress(request, progress)
            .await?;
        self.record(&result);
        Ok(result)
    }

    /// Probes each provider family.
    pub async fn probe_availability(&self) -> AvailabilityReport {
        self.prober.probe().await
    }

    /// Checks a prompt without generating anything.
    pub fn validate(&self, prompt: &str) -> std::result::Result<(), ValidationError> {
        validate_prompt(prompt)
    }

    /// Snapshot of the history, newest first.
    pub fn history(&self) -> Vec<GeneratedImageResult> {
        self.lock_history().iter().cloned().collect()
    }

    /// Drops every history entry.
    pub fn clear_history(&self) {
        let removed = self.lock_history().clear();
        tracing::debug!(removed = removed.len(), "history cleared");
    }

    /// The provider catalog.
    pub fn providers(&self) -> &'static [ProviderDescriptor] {
        ProviderRegistry::all()
    }

    fn record(&self, result: &GeneratedImageResult) {
        let evicted = self.lock_history().push(result.clone());
        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), "history trimmed");
        }
    }

    fn lock_history(&self) -> MutexGuard<'_, HistoryLog> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::DEFAULT_PROVIDER_ID;

    fn offline() -> Studio {
        let config = Config {
            native_url: "http://127.0.0.1:9".into(),
            inference_url: "http://127.0.0.1:9".into(),
            history_capacity: 2,
            ..Config::default()
        };
        Studio::new(&config).unwrap()
    }

    #[test]
    fn test_studio_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Studio>();
    }

    #[test]
    fn test_validate_and_providers() {
        let studio = offline();
        assert_eq!(studio.validate(""), Err(ValidationError::EmptyPrompt));
        assert!(studio.validate("a cat").is_ok());
        assert_eq!(studio.providers().len(), 6);
    }

    #[tokio::test]
    async fn test_history_is_bounded_and_releases_handles() {
        let studio = offline();
        let first = studio
            .request_generation("first", DEFAULT_PROVIDER_ID, 8, 8)
            .await
            .unwrap();
        let weak = first.image.downgrade();
        drop(first);

        for prompt in ["second", "third"] {
            studio
                .request_generation(prompt, DEFAULT_PROVIDER_ID, 8, 8)
                .await
                .unwrap();
        }

        let prompts: Vec<_> = studio.history().into_iter().map(|r| r.prompt).collect();
        assert_eq!(prompts, ["third", "second"]);
        assert!(weak.is_released());
    }

    #[tokio::test]
    async fn test_validation_failure_is_not_recorded() {
        let studio = offline();
        assert!(studio
            .request_generation("", DEFAULT_PROVIDER_ID, 8, 8)
            .await
            .is_err());
        assert!(studio.history().is_empty());
    }
}
