//! Core types for image generation.

use crate::error::{GenFrameError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }

    /// Maps a format detected by the `image` crate, if it is one of ours.
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }
}

/// Largest canvas the pipeline allocates, 8192x8192.
pub const MAX_CANVAS_PIXELS: u64 = 8192 * 8192;

/// Pixel dimensions of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Creates a new pair of dimensions.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Clamps each side to `max`.
    pub fn clamp_to(self, max: u32) -> Self {
        Self {
            width: self.width.min(max),
            height: self.height.min(max),
        }
    }

    /// Returns true when both sides are non-zero.
    pub fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Total pixel count, without overflow.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns true when a canvas of this size may be allocated.
    pub fn is_drawable(&self) -> bool {
        self.is_positive() && self.pixel_count() <= MAX_CANVAS_PIXELS
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A request to generate an image at an exact size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The text prompt describing the desired image.
    pub prompt: String,
    /// Registry id of the requested provider.
    pub provider_id: String,
    /// Desired width in pixels.
    pub width: u32,
    /// Desired height in pixels.
    pub height: u32,
}

impl GenerationRequest {
    /// Creates a 1024x1024 request for the given prompt and provider.
    pub fn new(prompt: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            provider_id: provider_id.into(),
            width: 1024,
            height: 1024,
        }
    }

    /// Sets the desired dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Returns the requested dimensions.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct EncodedRaster {
    data: Vec<u8>,
    format: ImageFormat,
    dimensions: Dimensions,
}

/// Process-local, reference-counted handle to an encoded raster.
///
/// Cloning is cheap. The underlying bytes are released once the last clone is
/// dropped; ids are only meaningful within the current process.
#[derive(Debug, Clone)]
#[must_use = "image handle should be saved or displayed"]
pub struct ImageHandle {
    id: u64,
    raster: Arc<EncodedRaster>,
}

impl ImageHandle {
    /// Wraps encoded image bytes of known size.
    pub fn new(data: Vec<u8>, format: ImageFormat, dimensions: Dimensions) -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            raster: Arc::new(EncodedRaster {
                data,
                format,
                dimensions,
            }),
        }
    }

    /// Returns the process-local id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.raster.data
    }

    /// Returns the encoding format.
    pub fn format(&self) -> ImageFormat {
        self.raster.format
    }

    /// Returns the raster dimensions.
    pub fn dimensions(&self) -> Dimensions {
        self.raster.dimensions
    }

    /// Returns the raster width.
    pub fn width(&self) -> u32 {
        self.raster.dimensions.width
    }

    /// Returns the raster height.
    pub fn height(&self) -> u32 {
        self.raster.dimensions.height
    }

    /// Returns the size of the encoded data in bytes.
    pub fn size(&self) -> usize {
        self.raster.data.len()
    }

    /// Decodes the raster back into pixels.
    pub fn decode(&self) -> Result<image::DynamicImage> {
        Ok(image::load_from_memory(&self.raster.data)?)
    }

    /// Saves the encoded bytes to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.raster.data)?;
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.raster.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.raster.format.mime_type(),
            self.to_base64()
        )
    }

    /// Returns a non-owning reference that can observe release.
    pub fn downgrade(&self) -> WeakImageHandle {
        WeakImageHandle {
            id: self.id,
            raster: Arc::downgrade(&self.raster),
        }
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ImageHandle {}

/// Weak counterpart of [`ImageHandle`].
#[derive(Debug, Clone)]
pub struct WeakImageHandle {
    id: u64,
    raster: Weak<EncodedRaster>,
}

impl WeakImageHandle {
    /// Returns the id of the handle this was created from.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns true once every strong handle has been dropped.
    pub fn is_released(&self) -> bool {
        self.raster.strong_count() == 0
    }

    /// Recovers a strong handle if the raster is still alive.
    pub fn upgrade(&self) -> Option<ImageHandle> {
        self.raster.upgrade().map(|raster| ImageHandle {
            id: self.id,
            raster,
        })
    }
}

/// Which step of the fallback chain produced an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum Strategy {
    /// The provider the caller asked for.
    Requested,
    /// The native rasterizer default, tried after the requested provider failed.
    NativeFallback,
    /// One of the alternate native request variants.
    Alternate(usize),
    /// Locally rendered placeholder.
    Placeholder,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::NativeFallback => write!(f, "native fallback"),
            Self::Alternate(i) => write!(f, "alternate #{}", i + 1),
            Self::Placeholder => write!(f, "placeholder"),
        }
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Chain step that produced the image.
    pub strategy: Strategy,
    /// Remote attempts made across the whole chain.
    pub attempts: u32,
    /// Delays slept between attempts of the winning adapter.
    #[serde(with = "duration_millis")]
    pub retry_delays: Vec<Duration>,
    /// Remote model or variant used.
    pub model: Option<String>,
    /// Seed sent to the provider, if any.
    pub seed: Option<u64>,
    /// Wall time of the whole chain in milliseconds.
    pub duration_ms: u64,
}

/// The outcome of a generation request.
///
/// Created once by the orchestrator and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct GeneratedImageResult {
    /// Final raster at the requested size.
    pub image: ImageHandle,
    /// Prompt as submitted.
    pub prompt: String,
    /// Provider id the caller asked for.
    pub provider_id: String,
    /// When the result was produced.
    pub created_at: DateTime<Utc>,
    /// Requested (and delivered) dimensions.
    pub dimensions: Dimensions,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
    /// Provider id to use next time, set when a non-default provider failed.
    pub recommendation: Option<String>,
}

impl GeneratedImageResult {
    /// Returns true if the image is the local placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.metadata.strategy == Strategy::Placeholder
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(delays: &[Duration], s: S) -> Result<S::Ok, S::Error> {
        let millis: Vec<u64> = delays.iter().map(|d| d.as_millis() as u64).collect();
        millis.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Duration>, D::Error> {
        let millis = Vec::<u64>::deserialize(d)?;
        Ok(millis.into_iter().map(Duration::from_millis).collect())
    }
}

/// Checks that both requested sides are positive and the canvas fits the budget.
pub(crate) fn ensure_drawable(dimensions: Dimensions) -> Result<()> {
    if !dimensions.is_positive() {
        return Err(GenFrameError::InvalidRequest(format!(
            "dimensions must be positive, got {dimensions}"
        )));
    }
    if !dimensions.is_drawable() {
        return Err(GenFrameError::InvalidRequest(format!(
            "{dimensions} exceeds the {MAX_CANVAS_PIXELS} pixel limit"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"short"), None);
    }

    #[test]
    fn test_dimensions_display_and_clamp() {
        let dims = Dimensions::new(2048, 900);
        assert_eq!(dims.to_string(), "2048x900");
        assert_eq!(dims.clamp_to(1024), Dimensions::new(1024, 900));
        assert!(!Dimensions::new(0, 10).is_positive());
    }

    #[test]
    fn test_handle_release_tracking() {
        let handle = ImageHandle::new(vec![1, 2, 3], ImageFormat::Png, Dimensions::new(1, 1));
        let weak = handle.downgrade();
        let clone = handle.clone();
        assert_eq!(clone, handle);
        assert!(!weak.is_released());

        drop(handle);
        assert!(weak.upgrade().is_some());
        drop(clone);
        assert!(weak.is_released());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_handle_ids_are_unique() {
        let a = ImageHandle::new(vec![], ImageFormat::Png, Dimensions::new(1, 1));
        let b = ImageHandle::new(vec![], ImageFormat::Png, Dimensions::new(1, 1));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_data_url_prefix() {
        let handle = ImageHandle::new(vec![1, 2, 3], ImageFormat::Png, Dimensions::new(1, 1));
        assert_eq!(handle.to_data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(Strategy::Alternate(0).to_string(), "alternate #1");
        assert_eq!(Strategy::NativeFallback.to_string(), "native fallback");
    }

    #[test]
    fn test_ensure_drawable() {
        assert!(ensure_drawable(Dimensions::new(1, 1)).is_ok());
        assert!(ensure_drawable(Dimensions::new(8192, 8192)).is_ok());
        assert!(ensure_drawable(Dimensions::new(7680, 4320)).is_ok());
        for dims in [
            Dimensions::new(0, 1),
            Dimensions::new(8193, 8192),
            Dimensions::new(u32::MAX, u32::MAX),
        ] {
            assert!(matches!(
                ensure_drawable(dims),
                Err(GenFrameError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn test_pixel_count_does_not_overflow() {
        let dims = Dimensions::new(u32::MAX, u32::MAX);
        assert_eq!(dims.pixel_count(), u64::from(u32::MAX) * u64::from(u32::MAX));
        assert!(!dims.is_drawable());
    }

    #[test]
    fn test_from_image_format() {
        assert_eq!(
            ImageFormat::from_image_format(image::ImageFormat::WebP),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_image_format(image::ImageFormat::Gif), None);
    }
}
