//! System clipboard access
//!
//! Text copy (the code block copy action) and clipboard image reads for
//! image paste, using the arboard crate. Clipboard pixels arrive as raw
//! RGBA and are encoded to PNG before they reach an image sink.

use crate::error::{Error, Result};
use arboard::Clipboard;
use image::{ImageFormat, RgbaImage};
use log::debug;
use std::io::Cursor;

/// Copy plain text to the system clipboard.
pub fn copy_text(text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new()?;
    clipboard.set_text(text)?;
    debug!("Copied {} chars to clipboard", text.chars().count());
    Ok(())
}

/// Read the clipboard image, if any, as PNG bytes.
pub fn read_image_png() -> Result<Vec<u8>> {
    let mut clipboard = Clipboard::new()?;
    let data = clipboard.get_image()?;
    rgba_to_png(data.width, data.height, data.bytes.into_owned())
}

/// Encode a raw RGBA8 buffer as PNG.
pub fn rgba_to_png(width: usize, height: usize, rgba: Vec<u8>) -> Result<Vec<u8>> {
    let (w, h) = match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(Error::ImageEncode(format!(
                "invalid image dimensions {}x{}",
                width, height
            )))
        }
    };
    let image = RgbaImage::from_raw(w, h, rgba).ok_or_else(|| {
        Error::ImageEncode(format!("pixel buffer does not match {}x{}", w, h))
    })?;

    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
