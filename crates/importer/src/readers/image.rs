//! Receipt/screenshot reader: decode, optionally letterbox for multimodal
//! models, re-encode as PNG.

use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, GenericImageView, Rgb, RgbImage, imageops};

use crate::{
    error::ReaderError,
    source::{RawUnit, ReadOutcome},
};

/// Square edge multimodal vision models expect. Aspect ratio is preserved by
/// padding, never by stretching.
pub const MULTIMODAL_EDGE: u32 = 896;

pub struct ImageReader {
    path: PathBuf,
    letterbox: bool,
}

impl ImageReader {
    /// `letterbox` should be set when the selected provider consumes images
    /// directly; OCR-bound images pass through at native resolution.
    pub fn new(path: impl Into<PathBuf>, letterbox: bool) -> Self {
        Self {
            path: path.into(),
            letterbox,
        }
    }

    pub fn read(&self) -> Vec<ReadOutcome> {
        vec![self.read_one()]
    }

    fn read_one(&self) -> ReadOutcome {
        let origin = self.path.display().to_string();

        let decoded = image::open(&self.path)
            .map_err(|err| ReaderError::new(&origin, format!("failed to decode image: {err}")))?;

        let prepared = if self.letterbox {
            letterbox(&decoded, MULTIMODAL_EDGE)
        } else {
            decoded
        };

        let mut bytes = Vec::new();
        prepared
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|err| ReaderError::new(&origin, format!("failed to encode image: {err}")))?;

        tracing::debug!(path = %self.path.display(), letterboxed = self.letterbox, "read image");
        Ok(RawUnit::image(origin, bytes))
    }
}

/// Scales the image to fit a `edge`×`edge` square and centers it on white
/// padding.
fn letterbox(source: &DynamicImage, edge: u32) -> DynamicImage {
    let resized = source
        .resize(edge, edge, imageops::FilterType::Lanczos3)
        .to_rgb8();
    let (width, height) = resized.dimensions();

    let mut canvas = RgbImage::from_pixel(edge, edge, Rgb([255, 255, 255]));
    let offset_x = i64::from((edge - width) / 2);
    let offset_y = i64::from((edge - height) / 2);
    imageops::overlay(&mut canvas, &resized, offset_x, offset_y);

    DynamicImage::ImageRgb8(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letterbox_pads_to_a_square_preserving_aspect() {
        let tall = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 400, Rgb([0, 0, 0])));
        let boxed = letterbox(&tall, MULTIMODAL_EDGE);
        assert_eq!(boxed.dimensions(), (MULTIMODAL_EDGE, MULTIMODAL_EDGE));

        // The scaled content is 224x896; columns outside it stay white.
        let rgb = boxed.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 448), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(MULTIMODAL_EDGE / 2, 448), &Rgb([0, 0, 0]));
    }

    #[test]
    fn unreadable_image_is_a_failed_unit() {
        let outcomes = ImageReader::new("/nonexistent/receipt.jpg", true).read();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_err());
    }
}
