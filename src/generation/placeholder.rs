//! Locally rendered stand-in image, the last step of the fallback chain.
//!
//! Draws a blue diagonal gradient with a title, the first few words of the
//! prompt and the target size, using a built-in 5x7 bitmap font so no font
//! files are needed at runtime.

use crate::error::{GenFrameError, Result};
use crate::generation::normalize::encode_png;
use crate::generation::types::{Dimensions, ImageHandle};
use image::{Rgba, RgbaImage};

const GRADIENT_START: [u8; 3] = [0x1e, 0x40, 0xaf];
const GRADIENT_END: [u8; 3] = [0x37, 0x30, 0xa3];
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

const TITLE: &str = "AI IMAGE PLACEHOLDER";
const EXCERPT_WORDS: usize = 6;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// Renders the placeholder at exactly `target` size.
pub fn render_placeholder(prompt: &str, target: Dimensions) -> Result<ImageHandle> {
    if !target.is_drawable() {
        return Err(GenFrameError::EncodingFailed(format!(
            "cannot allocate a {target} canvas"
        )));
    }

    let mut canvas = gradient(target);
    let short_side = target.width.min(target.height);

    let excerpt = prompt_excerpt(prompt);
    let size_line = format!("{} \u{d7} {}", target.width, target.height);
    let lines = [
        (TITLE.to_string(), text_scale(short_side, 20)),
        (excerpt, text_scale(short_side, 30)),
        (size_line, text_scale(short_side, 35)),
    ];

    let gap = text_scale(short_side, 30) * GLYPH_HEIGHT;
    let block_height: u32 = lines.iter().map(|(_, s)| s * GLYPH_HEIGHT).sum::<u32>() + gap * 2;
    let mut y = i64::from(target.height / 2) - i64::from(block_height / 2);

    for (text, scale) in &lines {
        draw_centered(&mut canvas, text, *scale, y);
        y += i64::from(scale * GLYPH_HEIGHT + gap);
    }

    tracing::debug!(size = %target, "rendered placeholder");
    encode_png(&canvas)
}

/// First few words of the prompt.
fn prompt_excerpt(prompt: &str) -> String {
    prompt
        .split_whitespace()
        .take(EXCERPT_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Integer pixel scale for text about `short_side / divisor` pixels tall.
fn text_scale(short_side: u32, divisor: u32) -> u32 {
    (short_side / divisor / GLYPH_HEIGHT).max(1)
}

fn gradient(target: Dimensions) -> RgbaImage {
    let (w, h) = (f64::from(target.width), f64::from(target.height));
    let norm = w * w + h * h;
    RgbaImage::from_fn(target.width, target.height, |x, y| {
        let t = ((f64::from(x) * w + f64::from(y) * h) / norm).clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Rgba([
            mix(GRADIENT_START[0], GRADIENT_END[0]),
            mix(GRADIENT_START[1], GRADIENT_END[1]),
            mix(GRADIENT_START[2], GRADIENT_END[2]),
            255,
        ])
    })
}

/// Draws one line centered horizontally with its top at `top`. Clips at the edges.
fn draw_centered(canvas: &mut RgbaImage, text: &str, scale: u32, top: i64) {
    let advance = i64::from((GLYPH_WIDTH + 1) * scale);
    let chars: Vec<char> = text.chars().collect();
    let line_width = advance * chars.len() as i64 - i64::from(scale);
    let mut left = (i64::from(canvas.width()) - line_width) / 2;

    for c in chars {
        draw_glyph(canvas, glyph(c), scale, left, top);
        left += advance;
    }
}

fn draw_glyph(canvas: &mut RgbaImage, rows: [u8; 7], scale: u32, left: i64, top: i64) {
    let (cw, ch) = (i64::from(canvas.width()), i64::from(canvas.height()));
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if bits & (0x10 >> col) == 0 {
                continue;
            }
            let x0 = left + i64::from(col * scale);
            let y0 = top + row as i64 * i64::from(scale);
            for dy in 0..i64::from(scale) {
                for dx in 0..i64::from(scale) {
                    let (x, y) = (x0 + dx, y0 + dy);
                    if (0..cw).contains(&x) && (0..ch).contains(&y) {
                        canvas.put_pixel(x as u32, y as u32, TEXT_COLOR);
                    }
                }
            }
        }
    }
}

/// 5x7 glyph rows, most significant of the low five bits is the left column.
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        ' ' => [0x00; 7],
        '\u{d7}' => [0x00, 0x00, 0x11, 0x0A, 0x04, 0x0A, 0x11],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        _ => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
    }
}
