//! Image normalization: decode, flatten alpha onto an opaque background,
//! convert to 8-bit RGB and optionally downscale wide images.
//!
//! Every image that reaches an [`EmbeddingProvider`](crate::embedding::EmbeddingProvider)
//! goes through [`ImageNormalizer::normalize`] first, so providers only ever see
//! one pixel format.

pub mod error;


pub use error::{NormalizeError, NormalizeResult};

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tracing::debug;

/// Default maximum width before downscaling kicks in.
pub const DEFAULT_MAX_WIDTH: u32 = 800;

/// Default background used when flattening transparent pixels.
pub const DEFAULT_BACKGROUND: [u8; 3] = [255, 255, 255];

/// Canonical 3-channel RGB image handed to embedding providers.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pixels: RgbImage,
    source_width: u32,
    source_height: u32,
}

impl NormalizedImage {
    /// Wraps an already-canonical RGB buffer (no rescaling applied).
    pub fn from_rgb(pixels: RgbImage) -> Self {
        let (source_width, source_height) = pixels.dimensions();
        Self {
            pixels,
            source_width,
            source_height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Dimensions of the decoded image before any downscaling.
    #[inline]
    pub fn source_dimensions(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }

    /// Returns `true` if the image was downscaled during normalization.
    #[inline]
    pub fn was_rescaled(&self) -> bool {
        self.pixels.dimensions() != (self.source_width, self.source_height)
    }

    #[inline]
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Encodes the canonical pixels as a lossless PNG.
    pub fn encode_png(&self) -> NormalizeResult<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| NormalizeError::Encode {
                reason: e.to_string(),
            })?;
        Ok(buf.into_inner())
    }
}

/// Decodes and canonicalizes uploaded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageNormalizer {
    max_width: Option<u32>,
    background: [u8; 3],
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self {
            max_width: Some(DEFAULT_MAX_WIDTH),
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl ImageNormalizer {
    /// Creates a normalizer; `max_width` of `None` (or `Some(0)`) disables downscaling.
    pub fn new(max_width: Option<u32>) -> Self {
        Self {
            max_width: max_width.filter(|w| *w > 0),
            ..Self::default()
        }
    }

    /// Sets the colour transparent pixels are composited onto.
    pub fn with_background(mut self, background: [u8; 3]) -> Self {
        self.background = background;
        self
    }

    pub fn max_width(&self) -> Option<u32> {
        self.max_width
    }

    pub fn background(&self) -> [u8; 3] {
        self.background
    }

    /// Decodes `raw` (any supported format) into a [`NormalizedImage`].
    pub fn normalize(&self, raw: &[u8]) -> NormalizeResult<NormalizedImage> {
        if raw.is_empty() {
            return Err(NormalizeError::EmptyInput);
        }

        let decoded = image::load_from_memory(raw)?;
        let (source_width, source_height) = (decoded.width(), decoded.height());
        if source_width == 0 || source_height == 0 {
            return Err(NormalizeError::ZeroDimensions {
                width: source_width,
                height: source_height,
            });
        }

        let rgb = self.flatten(decoded);
        let pixels = match self.max_width {
            Some(max_width) => downscale_to_width(rgb, max_width),
            None => rgb,
        };

        debug!(
            source_width,
            source_height,
            width = pixels.width(),
            height = pixels.height(),
            "Normalized image"
        );

        Ok(NormalizedImage {
            pixels,
            source_width,
            source_height,
        })
    }

    fn flatten(&self, decoded: DynamicImage) -> RgbImage {
        if !decoded.color().has_alpha() {
            return decoded.into_rgb8();
        }

        let rgba = decoded.into_rgba8();
        let [bg_r, bg_g, bg_b] = self.background;
        RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            Rgb([
                composite(r, bg_r, a),
                composite(g, bg_g, a),
                composite(b, bg_b, a),
            ])
        })
    }
}

#[inline]
fn composite(fg: u8, bg: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    let value = u32::from(fg) * a + u32::from(bg) * (255 - a);
    ((value + 127) / 255) as u8
}

/// Shrinks `image` so its width is at most `max_width`, keeping the aspect ratio.
///
/// Target size is `floor(w * s) x floor(h * s)` with `s = max_width / w`; height
/// is clamped to at least one pixel. Narrower images are returned untouched.
pub fn downscale_to_width(image: RgbImage, max_width: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    if max_width == 0 || width <= max_width {
        return image;
    }

    let (new_width, new_height) = scaled_dimensions(width, height, max_width);
    imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}

pub(crate) fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    // Integer form of floor(h * max / w); avoids 799.999… style float truncation.
    let new_height = u64::from(height) * u64::from(max_width) / u64::from(width);
    (max_width.max(1), (new_height as u32).max(1))
}
