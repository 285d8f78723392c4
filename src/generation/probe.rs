//! Advisory reachability checks, one per provider family.

use crate::config::Config;
use crate::error::Result;
use crate::generation::provider::ImageProvider;
use crate::generation::providers::{HuggingFaceProvider, PollinationsProvider};
use crate::generation::registry::ProviderFamily;
use serde::Serialize;
use std::collections::BTreeMap;

/// Reachability per provider family. Recomputed on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AvailabilityReport {
    families: BTreeMap<ProviderFamily, bool>,
}

impl AvailabilityReport {
    /// Whether `family` answered. Unprobed families count as unavailable.
    pub fn is_available(&self, family: ProviderFamily) -> bool {
        self.families.get(&family).copied().unwrap_or(false)
    }

    /// True when every probed family answered.
    pub fn all_available(&self) -> bool {
        !self.families.is_empty() && self.families.values().all(|up| *up)
    }

    /// Iterates families in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (ProviderFamily, bool)> + '_ {
        self.families.iter().map(|(f, up)| (*f, *up))
    }

    fn record(&mut self, family: ProviderFamily, available: bool) {
        self.families.insert(family, available);
    }
}

/// Probes the native rasterizer and one inference endpoint.
///
/// Never retries and never affects generation; safe to run alongside it.
#[derive(Debug, Clone)]
pub struct AvailabilityProber {
    native: PollinationsProvider,
    inference: HuggingFaceProvider,
}

impl AvailabilityProber {
    /// Creates a prober over the given adapters.
    pub fn new(native: PollinationsProvider, inference: HuggingFaceProvider) -> Self {
        Self { native, inference }
    }

    /// Builds both adapters from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self::new(
            PollinationsProvider::builder()
                .base_url(&config.native_url)
                .client(client.clone())
                .build()?,
            HuggingFaceProvider::builder()
                .base_url(&config.inference_url)
                .client(client)
                .rotator(config.rotator())
                .build()?,
        ))
    }

    /// Runs both checks concurrently.
    pub async fn probe(&self) -> AvailabilityReport {
        let (native, inference) = tokio::join!(check(&self.native), check(&self.inference));

        let mut report = AvailabilityReport::default();
        report.record(ProviderFamily::NativeRasterizer, native);
        report.record(ProviderFamily::InferenceEndpoint, inference);
        tracing::debug!(native, inference, "availability probed");
        report
    }
}

async fn check(provider: &dyn ImageProvider) -> bool {
    match provider.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(provider = provider.name(), "unreachable: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_as_family_map() {
        let mut report = AvailabilityReport::default();
        report.record(ProviderFamily::InferenceEndpoint, false);
        report.record(ProviderFamily::NativeRasterizer, true);

        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"native-rasterizer":true,"inference-endpoint":false}"#
        );
        assert!(report.is_available(ProviderFamily::NativeRasterizer));
        assert!(!report.all_available());
    }

    #[test]
    fn test_empty_report_is_not_available() {
        let report = AvailabilityReport::default();
        assert!(!report.is_available(ProviderFamily::NativeRasterizer));
        assert!(!report.all_available());
    }

    #[tokio::test]
    async fn test_unreachable_hosts_report_false() {
        let native = PollinationsProvider::builder()
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let inference = HuggingFaceProvider::builder()
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();

        let report = AvailabilityProber::new(native, inference).probe().await;
        assert!(!report.is_available(ProviderFamily::NativeRasterizer));
        assert!(!report.is_available(ProviderFamily::InferenceEndpoint));
    }
}
