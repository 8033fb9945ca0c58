use std::path::Path;

use log::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("Failed to decode sprite image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Tightly packed RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl SpriteImage {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let image = image::open(path.as_ref())?.to_rgba8();
        let (width, height) = image.dimensions();
        info!(
            "Loaded sprite {} ({}x{})",
            path.as_ref().display(),
            width,
            height
        );
        Ok(Self {
            width,
            height,
            rgba: image.into_raw(),
        })
    }

    /// White disc whose alpha falls off quadratically from the centre.
    pub fn fallback(size: u32) -> Self {
        let size = size.max(2);
        let half = size as f32 * 0.5;
        let rgba = (0..size * size)
            .flat_map(|i| {
                let x = (i % size) as f32 + 0.5 - half;
                let y = (i / size) as f32 + 0.5 - half;
                let d = ((x * x + y * y).sqrt() / half).min(1.0);
                let alpha = ((1.0 - d * d) * 255.0).round() as u8;
                [255, 255, 255, alpha]
            })
            .collect();
        Self {
            width: size,
            height: size,
            rgba,
        }
    }

    pub fn load_or_fallback(path: impl AsRef<Path>) -> Self {
        Self::load(path.as_ref()).unwrap_or_else(|e| {
            warn!(
                "Using fallback sprite, {} could not be loaded: {}",
                path.as_ref().display(),
                e
            );
            Self::fallback(64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_at(sprite: &SpriteImage, x: u32, y: u32) -> u8 {
        sprite.rgba[((y * sprite.width + x) * 4 + 3) as usize]
    }

    #[test]
    fn fallback_is_opaque_in_the_middle_and_clear_at_the_corners() {
        let sprite = SpriteImage::fallback(64);

        assert_eq!(sprite.rgba.len(), 64 * 64 * 4);
        assert!(alpha_at(&sprite, 32, 32) > 250);
        assert_eq!(alpha_at(&sprite, 0, 0), 0);
        assert_eq!(alpha_at(&sprite, 63, 63), 0);
    }

    #[test]
    fn missing_file_falls_back() {
        let sprite = SpriteImage::load_or_fallback("does/not/exist.png");
        assert_eq!(sprite, SpriteImage::fallback(64));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(SpriteImage::load("does/not/exist.png").is_err());
    }
}
