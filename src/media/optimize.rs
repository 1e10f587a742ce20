use image::{
    DynamicImage, ImageFormat,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
    imageops::FilterType,
};
use serde::Deserialize;

use super::MediaError;

/// Bounds for the resize/recompress step.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OptimizeOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality in `(0, 1]`.
    pub quality: f32,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            quality: 0.8,
        }
    }
}

impl OptimizeOptions {
    pub fn validate(&self) -> Result<(), MediaError> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(MediaError::InvalidOptions(
                "max_width and max_height must be positive".into(),
            ));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(MediaError::InvalidOptions(
                "quality must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }

    fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

#[derive(Debug)]
pub struct Optimized {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Scales `width` x `height` down so neither bound is exceeded, keeping the
/// aspect ratio. Width is clamped first, then height.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let (mut w, mut h) = (f64::from(width), f64::from(height));

    if w > f64::from(max_width) {
        h = h * f64::from(max_width) / w;
        w = f64::from(max_width);
    }

    if h > f64::from(max_height) {
        w = w * f64::from(max_height) / h;
        h = f64::from(max_height);
    }

    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

/// Decodes, bounds and re-encodes an image. PNG stays PNG, everything else
/// becomes JPEG. The result is not guaranteed to be smaller than the input.
pub fn optimize(bytes: &[u8], options: &OptimizeOptions) -> Result<Optimized, MediaError> {
    options.validate()?;

    let format = image::guess_format(bytes).map_err(MediaError::Decode)?;
    let img = image::load_from_memory_with_format(bytes, format).map_err(MediaError::Decode)?;

    let (width, height) = fit_within(
        img.width(),
        img.height(),
        options.max_width,
        options.max_height,
    );
    let img = if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Lanczos3)
    };

    let mut out = Vec::new();
    if format == ImageFormat::Png {
        img.write_with_encoder(PngEncoder::new(&mut out))
            .map_err(MediaError::Encode)?;
        Ok(Optimized {
            bytes: out,
            content_type: "image/png",
            extension: "png",
            width,
            height,
        })
    } else {
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        rgb.write_with_encoder(JpegEncoder::new_with_quality(
            &mut out,
            options.jpeg_quality(),
        ))
        .map_err(MediaError::Encode)?;
        Ok(Optimized {
            bytes: out,
            content_type: "image/jpeg",
            extension: "jpg",
            width,
            height,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    pub(crate) fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        match format {
            ImageFormat::Png => {
                let img = RgbaImage::from_fn(width, height, |x, y| {
                    Rgba([(x % 256) as u8, (y % 256) as u8, 128, 200])
                });
                img.write_to(&mut out, format).unwrap();
            }
            _ => {
                let img =
                    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 64]));
                img.write_to(&mut out, format).unwrap();
            }
        }
        out.into_inner()
    }

    fn small_bounds() -> OptimizeOptions {
        OptimizeOptions {
            max_width: 200,
            max_height: 100,
            quality: 0.8,
        }
    }

    #[test]
    fn fit_within_clamps_width_then_height() {
        assert_eq!(fit_within(4000, 2000, 1920, 1080), (1920, 960));
        assert_eq!(fit_within(1000, 3000, 1920, 1080), (360, 1080));
        assert_eq!(fit_within(3840, 2160, 1920, 1080), (1920, 1080));
        assert_eq!(fit_within(800, 600, 1920, 1080), (800, 600));
    }

    #[test]
    fn fit_within_never_collapses_to_zero() {
        assert_eq!(fit_within(10_000, 1, 100, 100), (100, 1));
    }

    #[test]
    fn oversized_jpeg_is_bounded_and_keeps_aspect_ratio() {
        let input = encoded(800, 300, ImageFormat::Jpeg);
        let out = optimize(&input, &small_bounds()).unwrap();

        assert!(out.width <= 200 && out.height <= 100);
        assert_eq!((out.width, out.height), (200, 75));
        assert_eq!(out.content_type, "image/jpeg");

        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 75));
        let ratio_in = 800.0 / 300.0;
        let expected_height = f64::from(decoded.width()) / ratio_in;
        assert!((f64::from(decoded.height()) - expected_height).abs() <= 1.0);
    }

    #[test]
    fn tall_image_is_bounded_by_height() {
        let input = encoded(150, 600, ImageFormat::Jpeg);
        let out = optimize(&input, &small_bounds()).unwrap();
        assert_eq!((out.width, out.height), (25, 100));
    }

    #[test]
    fn image_within_bounds_keeps_dimensions() {
        let input = encoded(120, 80, ImageFormat::Jpeg);
        let out = optimize(&input, &small_bounds()).unwrap();
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 80));
    }

    #[test]
    fn png_stays_png() {
        let input = encoded(400, 400, ImageFormat::Png);
        let out = optimize(&input, &small_bounds()).unwrap();
        assert_eq!(out.content_type, "image/png");
        assert_eq!(out.extension, "png");
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Png);
        assert_eq!((out.width, out.height), (100, 100));
    }

    #[test]
    fn non_png_becomes_jpeg() {
        for format in [ImageFormat::Bmp, ImageFormat::Jpeg] {
            let input = encoded(50, 40, format);
            let out = optimize(&input, &small_bounds()).unwrap();
            assert_eq!(out.content_type, "image/jpeg");
            assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Jpeg);
        }
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = optimize(b"definitely not an image", &small_bounds()).unwrap_err();
        assert!(matches!(err, MediaError::Decode(_)));
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let options = OptimizeOptions {
            quality: 1.5,
            ..OptimizeOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(MediaError::InvalidOptions(_))
        ));
        assert_eq!(OptimizeOptions::default().jpeg_quality(), 80);
    }
}
