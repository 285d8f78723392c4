//! Exact-size framing of provider output.
//!
//! Providers often honor the requested size only approximately. Every raster
//! that leaves the pipeline goes through [`normalize`]: the source is scaled
//! uniformly to fit, centered, and the uncovered area filled with opaque
//! white. No cropping, no distortion.

use crate::error::{GenFrameError, Result};
use crate::generation::types::{Dimensions, ImageFormat, ImageHandle};
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

/// Fill color for letterbox and pillarbox bars.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Where a scaled source lands on the destination canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Uniform scale factor applied to the source.
    pub scale: f64,
    /// Scaled source width.
    pub width: u32,
    /// Scaled source height.
    pub height: u32,
    /// Left offset on the canvas.
    pub x: u32,
    /// Top offset on the canvas.
    pub y: u32,
}

/// Computes the scale-to-fit placement of `source` centered in `target`.
///
/// Both arguments must have positive sides.
pub fn fit(source: Dimensions, target: Dimensions) -> Placement {
    let scale = f64::min(
        f64::from(target.width) / f64::from(source.width),
        f64::from(target.height) / f64::from(source.height),
    );
    let width = scaled_side(source.width, scale, target.width);
    let height = scaled_side(source.height, scale, target.height);

    Placement {
        scale,
        width,
        height,
        x: (target.width - width) / 2,
        y: (target.height - height) / 2,
    }
}

fn scaled_side(side: u32, scale: f64, limit: u32) -> u32 {
    let scaled = (f64::from(side) * scale).round() as u32;
    scaled.clamp(1, limit)
}

/// Draws `source` onto a white canvas of exactly `target` size.
pub fn letterbox(source: &DynamicImage, target: Dimensions) -> Result<RgbaImage> {
    if !target.is_drawable() {
        return Err(GenFrameError::EncodingFailed(format!(
            "cannot allocate a {target} canvas"
        )));
    }
    let source_dims = Dimensions::new(source.width(), source.height());
    if !source_dims.is_positive() {
        return Err(GenFrameError::EncodingFailed(format!(
            "source raster is {source_dims}"
        )));
    }

    let placement = fit(source_dims, target);
    let mut canvas = RgbaImage::from_pixel(target.width, target.height, BACKGROUND);

    let rgba = source.to_rgba8();
    let scaled = if (placement.width, placement.height) == (source_dims.width, source_dims.height)
    {
        rgba
    } else {
        imageops::resize(&rgba, placement.width, placement.height, FilterType::Triangle)
    };
    for (dx, dy, pixel) in scaled.enumerate_pixels() {
        canvas.put_pixel(placement.x + dx, placement.y + dy, flatten(*pixel));
    }

    Ok(canvas)
}

/// Composites a pixel over [`BACKGROUND`]. Opaque pixels pass through unchanged.
fn flatten(pixel: Rgba<u8>) -> Rgba<u8> {
    let alpha = u32::from(pixel[3]);
    if alpha == 255 {
        return pixel;
    }
    let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
    Rgba([blend(pixel[0]), blend(pixel[1]), blend(pixel[2]), 255])
}

/// Encodes a canvas as PNG behind a fresh handle.
pub fn encode_png(canvas: &RgbaImage) -> Result<ImageHandle> {
    let mut data = Vec::new();
    PngEncoder::new(&mut data)
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| GenFrameError::EncodingFailed(e.to_string()))?;

    Ok(ImageHandle::new(
        data,
        ImageFormat::Png,
        Dimensions::new(canvas.width(), canvas.height()),
    ))
}

/// Letterboxes `source` to `target` and encodes the result as PNG.
pub fn normalize(source: &DynamicImage, target: Dimensions) -> Result<ImageHandle> {
    let canvas = letterbox(source, target)?;
    tracing::debug!(
        source = %Dimensions::new(source.width(), source.height()),
        target = %target,
        "normalized raster"
    );
    encode_png(&canvas)
}
