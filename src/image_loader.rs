//! # Logo Loading
//!
//! The engine itself never decodes anything: it takes an already-loaded
//! logo or none. This module is the caller-side helper that turns a logo
//! source (data URI, raw base64, or a file path) into a [`LoadedImage`].
//!
//! JPEG logos keep their original bytes and are embedded with DCTDecode.
//! PNG logos are decoded to RGB plus an alpha channel used as the soft mask.

use std::io::Cursor;

use base64::Engine;

use crate::error::SheetError;

/// A decoded logo, ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImagePixelData {
    /// Original JPEG bytes.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// RGB triplets, plus one alpha byte per pixel when any pixel is not
    /// fully opaque.
    Decoded { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

impl LoadedImage {
    /// Size in points when drawn `height` tall, at most `max_width` wide.
    /// A logo wider than the cap keeps its aspect ratio by getting shorter.
    pub fn fit(&self, height: f64, max_width: f64) -> (f64, f64) {
        if self.width_px == 0 || self.height_px == 0 {
            return (0.0, 0.0);
        }
        let aspect = self.width_px as f64 / self.height_px as f64;
        let width = height * aspect;
        if width <= max_width {
            (width, height)
        } else {
            (max_width, max_width / aspect)
        }
    }
}

/// Load a logo from a data URI, a file path, or raw base64.
pub fn load_image(src: &str) -> Result<LoadedImage, SheetError> {
    let bytes = read_source_bytes(src.trim())?;
    decode_image_bytes(&bytes)
}

fn read_source_bytes(src: &str) -> Result<Vec<u8>, SheetError> {
    if let Some(rest) = src.strip_prefix("data:image/") {
        let (_, payload) = rest
            .split_once(',')
            .ok_or_else(|| SheetError::Image("invalid data URI: missing comma".to_string()))?;
        return base64_decode(payload);
    }

    // Base64 can contain '/', so only explicit path prefixes count as paths.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return std::fs::read(src)
            .map_err(|e| SheetError::Image(format!("failed to read logo '{}': {}", src, e)));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, SheetError> {
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| SheetError::Image(format!("base64 decode error: {}", e)))
}

/// Dispatch on magic bytes.
pub fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, SheetError> {
    if data.len() < 4 {
        return Err(SheetError::Image("image data too short".to_string()));
    }
    if is_jpeg(data) {
        decode_jpeg(data)
    } else if is_png(data) {
        decode_png(data)
    } else {
        Err(SheetError::Image(
            "unsupported logo format (expected JPEG or PNG)".to_string(),
        ))
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(&[0xFF, 0xD8])
}

fn is_png(data: &[u8]) -> bool {
    data.starts_with(&[0x89, b'P', b'N', b'G'])
}

/// Only the dimensions are read; the pixels stay compressed.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, SheetError> {
    let (width, height) = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| SheetError::Image(format!("JPEG format detection error: {}", e)))?
        .into_dimensions()
        .map_err(|e| SheetError::Image(format!("failed to read JPEG dimensions: {}", e)))?;

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: jpeg_color_space(data),
        },
        width_px: width,
        height_px: height,
    })
}

/// Walk the marker segments to the start-of-frame and read its component
/// count. Unknown layouts are treated as RGB.
fn jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2;
    while i + 3 < data.len() && data[i] == 0xFF {
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            return match data[i + 9] {
                1 => JpegColorSpace::DeviceGray,
                _ => JpegColorSpace::DeviceRGB,
            };
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + len;
    }
    JpegColorSpace::DeviceRGB
}

fn decode_png(data: &[u8]) -> Result<LoadedImage, SheetError> {
    let rgba = image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .map_err(|e| SheetError::Image(format!("failed to decode PNG: {}", e)))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixels = (width as usize) * (height as usize);
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }
    let opaque = alpha.iter().all(|&a| a == 255);

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: if opaque { None } else { Some(alpha) },
        },
        width_px: width,
        height_px: height,
    })
}
