//! End-to-end tests of the fallback chain against mocked providers.
//!
//! Every provider is a wiremock server; no test reaches the network.

use genframe::{
    AvailabilityProber, CredentialRotator, Dimensions, FailureKind, FallbackOrchestrator,
    GenFrameError, GenerationRequest, HuggingFaceProvider, ImageFormat, ImageProvider,
    PollinationsProvider, ProviderFamily, RetryPolicy, Strategy, DEFAULT_PROVIDER_ID,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::time::Duration;
use tokio::sync::watch;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SD15_PATH: &str = "/models/runwayml/stable-diffusion-v1-5";

fn encoded(width: u32, height: u32, color: [u8; 4], format: image::ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
        .write_to(&mut buf, format)
        .unwrap();
    buf.into_inner()
}

fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    encoded(width, height, color, image::ImageFormat::Png)
}

fn image_response(width: u32, height: u32) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "image/png")
        .set_body_bytes(png(width, height, [200, 30, 30, 255]))
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        loading_backoff: Duration::from_millis(20),
        transport_backoff: Duration::from_millis(10),
    }
}

fn native(base: &str) -> PollinationsProvider {
    PollinationsProvider::builder().base_url(base).build().unwrap()
}

fn inference(base: &str, rotator: CredentialRotator) -> HuggingFaceProvider {
    HuggingFaceProvider::builder()
        .base_url(format!("{base}/models"))
        .rotator(rotator)
        .retry(fast_retry())
        .min_body_bytes(0)
        .build()
        .unwrap()
}

fn orchestrator(server: &MockServer) -> FallbackOrchestrator {
    FallbackOrchestrator::new(
        native(&server.uri()),
        inference(&server.uri(), CredentialRotator::new(["hf_test"])),
    )
    .with_progress_tick(Duration::from_millis(5))
}

mod native_tests {
    use super::*;

    #[tokio::test]
    async fn test_native_result_is_framed_to_exact_size() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/prompt/.+"))
            .and(query_param("width", "1920"))
            .and(query_param("height", "1080"))
            .and(query_param("model", "flux"))
            .respond_with(image_response(1024, 1024))
            .expect(1)
            .mount(&server)
            .await;

        let request =
            GenerationRequest::new("a red fox in snow", DEFAULT_PROVIDER_ID).with_size(1920, 1080);
        let result = orchestrator(&server).generate(&request).await.unwrap();

        assert_eq!(result.dimensions.to_string(), "1920x1080");
        assert_eq!(result.provider_id, DEFAULT_PROVIDER_ID);
        assert_eq!(result.metadata.strategy, Strategy::Requested);
        assert_eq!(result.metadata.attempts, 1);
        assert_eq!(result.recommendation, None);
        assert!(result.metadata.seed.is_some());

        let pixels = result.image.decode().unwrap().to_rgba8();
        assert_eq!(pixels.dimensions(), (1920, 1080));
        // 1024 square scaled to 1080 tall leaves 420 px bars either side.
        assert_eq!(*pixels.get_pixel(10, 540), Rgba([255, 255, 255, 255]));
        assert_eq!(*pixels.get_pixel(1909, 540), Rgba([255, 255, 255, 255]));
        assert_eq!(*pixels.get_pixel(960, 540), Rgba([200, 30, 30, 255]));

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("fox.png");
        result.image.save(&out).unwrap();
        let reloaded = image::open(&out).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (1920, 1080));
    }

    #[tokio::test]
    async fn test_alternate_variant_wins_after_primary_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("model", "turbo"))
            .respond_with(image_response(300, 200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let request = GenerationRequest::new("a castle", DEFAULT_PROVIDER_ID).with_size(300, 200);
        let result = orchestrator(&server).generate(&request).await.unwrap();

        assert_eq!(result.metadata.strategy, Strategy::Alternate(0));
        assert_eq!(result.metadata.model.as_deref(), Some("turbo"));
        assert_eq!(result.metadata.seed, None);
        // Requested, native fallback, first alternate.
        assert_eq!(result.metadata.attempts, 3);
        assert_eq!(result.image.dimensions(), Dimensions::new(300, 200));
    }

    #[tokio::test]
    async fn test_non_image_body_counts_as_load_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("model", "flux"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(image_response(64, 64))
            .mount(&server)
            .await;

        let request = GenerationRequest::new("a castle", DEFAULT_PROVIDER_ID).with_size(64, 64);
        let result = orchestrator(&server).generate(&request).await.unwrap();

        assert_eq!(result.metadata.strategy, Strategy::Alternate(0));
    }
}

mod inference_tests {
    use super::*;

    #[tokio::test]
    async fn test_oversized_request_is_clamped_then_reframed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SD15_PATH))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_partial_json(serde_json::json!({
                "parameters": { "width": 1024, "height": 1024 },
                "options": { "wait_for_model": true, "use_cache": false }
            })))
            .respond_with(image_response(1024, 1024))
            .expect(1)
            .mount(&server)
            .await;

        let request =
            GenerationRequest::new("a lighthouse", "stable-diffusion-v1-5").with_size(2048, 2048);
        let result = orchestrator(&server).generate(&request).await.unwrap();

        assert_eq!(result.metadata.strategy, Strategy::Requested);
        assert_eq!(result.dimensions, Dimensions::new(2048, 2048));
        assert_eq!(
            result.metadata.model.as_deref(),
            Some("runwayml/stable-diffusion-v1-5")
        );
        assert_eq!(result.recommendation, None);

        let decoded = result.image.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2048, 2048));
    }

    #[tokio::test]
    async fn test_model_loading_is_retried_with_growing_delays() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SD15_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string(
                r#"{"error":"Model is currently loading","estimated_time":20.0}"#,
            ))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SD15_PATH))
            .respond_with(image_response(512, 512))
            .mount(&server)
            .await;

        let request =
            GenerationRequest::new("a lighthouse", "stable-diffusion-v1-5").with_size(512, 512);
        let result = orchestrator(&server).generate(&request).await.unwrap();

        assert_eq!(result.metadata.strategy, Strategy::Requested);
        assert_eq!(result.metadata.attempts, 3);
        assert_eq!(
            result.metadata.retry_delays,
            vec![Duration::from_millis(20), Duration::from_millis(40)]
        );
        assert!(result.metadata.retry_delays[0] < result.metadata.retry_delays[1]);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_exact_size_output_is_kept_as_is() {
        let server = MockServer::start().await;
        let served = png(512, 384, [10, 20, 30, 255]);
        Mock::given(method("POST"))
            .and(path("/models/Lykon/DreamShaper"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(served.clone()))
            .mount(&server)
            .await;

        let request = GenerationRequest::new("a garden", "dreamshaper").with_size(512, 384);
        let result = orchestrator(&server).generate(&request).await.unwrap();

        assert_eq!(result.image.bytes(), served.as_slice());
    }

    #[tokio::test]
    async fn test_exact_size_gif_is_reencoded_as_png() {
        let server = MockServer::start().await;
        let served = encoded(320, 240, [10, 20, 30, 255], image::ImageFormat::Gif);
        Mock::given(method("POST"))
            .and(path("/models/Lykon/DreamShaper"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(served.clone()))
            .mount(&server)
            .await;

        let request = GenerationRequest::new("a garden", "dreamshaper").with_size(320, 240);
        let result = orchestrator(&server).generate(&request).await.unwrap();

        assert_eq!(result.image.format(), ImageFormat::Png);
        assert_ne!(result.image.bytes(), served.as_slice());
        assert!(result.image.to_data_url().starts_with("data:image/png;base64,"));

        let decoded = result.image.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 240));
    }

    #[tokio::test]
    async fn test_reframing_failure_keeps_attempt_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SD15_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SD15_PATH))
            .and(body_partial_json(serde_json::json!({
                "parameters": { "width": 1024, "height": 1024 }
            })))
            .respond_with(image_response(1024, 1024))
            .mount(&server)
            .await;

        let provider = inference(&server.uri(), CredentialRotator::new(["hf_test"]));
        let request = GenerationRequest::new("a lighthouse", "stable-diffusion-v1-5")
            .with_size(10_000, 10_000);
        let err = provider.generate(&request).await.unwrap_err();

        match err {
            GenFrameError::Provider { kind, attempts, status, .. } => {
                assert_eq!(kind, FailureKind::LoadFailed);
                assert_eq!(attempts, 3);
                assert_eq!(status, None);
            }
            other => panic!("expected a provider failure, got {other:?}"),
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_tokens_fall_back_to_native() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/prompt/.+"))
            .respond_with(image_response(640, 480))
            .mount(&server)
            .await;

        let orchestrator = FallbackOrchestrator::new(
            native(&server.uri()),
            inference(&server.uri(), CredentialRotator::new(Vec::<String>::new())),
        );
        let request = GenerationRequest::new("a garden", "anything-v5").with_size(640, 480);
        let result = orchestrator.generate(&request).await.unwrap();

        assert_eq!(result.metadata.strategy, Strategy::NativeFallback);
        assert_eq!(result.provider_id, "anything-v5");
        assert_eq!(result.recommendation.as_deref(), Some(DEFAULT_PROVIDER_ID));

        let posts = server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.method.as_str() == "POST")
            .count();
        assert_eq!(posts, 0);
    }

    #[tokio::test]
    async fn test_empty_token_pool_is_unauthorized_provider_failure() {
        let server = MockServer::start().await;
        let provider = inference(&server.uri(), CredentialRotator::new(Vec::<String>::new()));
        let request = GenerationRequest::new("a garden", "stable-diffusion-v1-5");

        match provider.generate(&request).await.unwrap_err() {
            GenFrameError::Provider { kind, attempts, .. } => {
                assert_eq!(kind, FailureKind::Unauthorized);
                assert_eq!(attempts, 1);
            }
            other => panic!("expected a provider failure, got {other:?}"),
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}

mod outage_tests {
    use super::*;

    #[tokio::test]
    async fn test_total_outage_yields_placeholder_at_requested_size() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let request =
            GenerationRequest::new("a ship in a bottle", "stable-diffusion-xl").with_size(800, 600);
        let result = orchestrator(&server).generate(&request).await.unwrap();

        assert!(result.is_placeholder());
        assert_eq!(result.dimensions, Dimensions::new(800, 600));
        assert_eq!(result.recommendation.as_deref(), Some(DEFAULT_PROVIDER_ID));
        // Three inference attempts, then three native requests.
        assert_eq!(result.metadata.attempts, 6);

        let decoded = result.image.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 600));
    }

    #[tokio::test]
    async fn test_progress_rises_then_completes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(image_response(32, 32).set_delay(Duration::from_millis(150)))
            .mount(&server)
            .await;

        let (tx, mut rx) = watch::channel(0u8);
        let observer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                seen.push(*rx.borrow_and_update());
            }
            seen
        });

        let request = GenerationRequest::new("a cat", DEFAULT_PROVIDER_ID).with_size(32, 32);
        orchestrator(&server)
            .generate_with_progress(&request, tx)
            .await
            .unwrap();

        let seen = observer.await.unwrap();
        assert_eq!(seen.last(), Some(&100));
        let running = &seen[..seen.len() - 1];
        assert!(running.iter().all(|p| *p <= 95));
        assert!(running.windows(2).all(|w| w[0] <= w[1]));
    }
}

mod availability_tests {
    use super::*;

    fn prober(server: &MockServer) -> AvailabilityProber {
        AvailabilityProber::new(
            native(&server.uri()),
            inference(&server.uri(), CredentialRotator::new(["hf_test"])),
        )
    }

    #[tokio::test]
    async fn test_unauthorized_inference_counts_as_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/prompt/test"))
            .and(query_param("width", "64"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SD15_PATH))
            .and(body_partial_json(serde_json::json!({ "inputs": "test" })))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let report = prober(&server).probe().await;

        assert!(report.is_available(ProviderFamily::NativeRasterizer));
        assert!(report.is_available(ProviderFamily::InferenceEndpoint));
        assert!(report.all_available());
    }

    #[tokio::test]
    async fn test_server_errors_count_as_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let report = prober(&server).probe().await;

        assert!(!report.is_available(ProviderFamily::NativeRasterizer));
        assert!(!report.is_available(ProviderFamily::InferenceEndpoint));
    }
}
