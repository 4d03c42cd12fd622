use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use druid::Rect;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};

/// Encoding quality for region artifacts.
const JPEG_QUALITY: u8 = 90;

const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Integer crop rectangle in natural (source-resolution) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Rounds a natural-space rectangle to whole pixels and clips it to the
    /// page. `None` when nothing with positive area remains.
    pub fn from_natural(rect: Rect, page_width: u32, page_height: u32) -> Option<Self> {
        let r = rect.abs();
        let x0 = (r.x0.round().max(0.0) as u32).min(page_width);
        let y0 = (r.y0.round().max(0.0) as u32).min(page_height);
        let x1 = (r.x1.round().max(0.0) as u32).min(page_width);
        let y1 = (r.y1.round().max(0.0) as u32).min(page_height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(CropRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    /// Whether the crop has positive area and lies entirely within a page of
    /// the given dimensions.
    pub fn fits(&self, page_width: u32, page_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|x| x <= page_width)
            && self.y.checked_add(self.height).is_some_and(|y| y <= page_height)
    }
}

/// Copies the pixel block under `crop` out of the page at full source
/// resolution and encodes it as a standalone JPEG, returned as a `data:` URI
/// so the payload stays usable after the page itself is gone.
pub fn extract(page: &DynamicImage, crop: &CropRect) -> Result<String> {
    let (page_width, page_height) = page.dimensions();
    if !crop.fits(page_width, page_height) {
        bail!("crop {crop:?} does not fit a {page_width}x{page_height} page");
    }
    let clipped = page
        .crop_imm(crop.x, crop.y, crop.width, crop.height)
        .to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode_image(&clipped)
        .context("jpeg encoding failed")?;
    Ok(format!("{DATA_URI_PREFIX}{}", BASE64.encode(&bytes)))
}

/// Inverse of the wrapping done by [`extract`]: the raw encoded bytes of a
/// region artifact.
pub fn decode_artifact(uri: &str) -> Result<Vec<u8>> {
    let body = uri
        .strip_prefix(DATA_URI_PREFIX)
        .with_context(|| format!("not a jpeg data uri: {:.32}", uri))?;
    BASE64.decode(body).context("artifact body is not valid base64")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn test_page(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 64, 255])
        }))
    }

    #[test]
    fn extracted_artifact_decodes_standalone() {
        let page = test_page(1000, 1500);
        let crop = CropRect {
            x: 200,
            y: 200,
            width: 200,
            height: 200,
        };
        let uri = extract(&page, &crop).unwrap();
        assert!(uri.starts_with(DATA_URI_PREFIX));

        // The page is deliberately dropped before decoding.
        drop(page);
        let bytes = decode_artifact(&uri).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (200, 200));
    }

    #[test]
    fn degenerate_crop_is_rejected() {
        let page = test_page(100, 100);
        let crop = CropRect {
            x: 10,
            y: 10,
            width: 0,
            height: 50,
        };
        assert!(extract(&page, &crop).is_err());
    }

    #[test]
    fn out_of_bounds_crop_is_rejected() {
        let page = test_page(100, 100);
        let crop = CropRect {
            x: 90,
            y: 0,
            width: 20,
            height: 20,
        };
        assert!(extract(&page, &crop).is_err());
    }

    #[test]
    fn from_natural_rounds_and_clips() {
        let crop = CropRect::from_natural(Rect::new(-10.0, -10.0, 50.4, 60.6), 1000, 1500).unwrap();
        assert_eq!(
            crop,
            CropRect {
                x: 0,
                y: 0,
                width: 50,
                height: 61
            }
        );

        let crop = CropRect::from_natural(Rect::new(900.0, 1400.0, 1200.0, 1600.0), 1000, 1500).unwrap();
        assert_eq!(
            crop,
            CropRect {
                x: 900,
                y: 1400,
                width: 100,
                height: 100
            }
        );
    }

    #[test]
    fn from_natural_rejects_empty_remainder() {
        assert!(CropRect::from_natural(Rect::new(50.0, 50.0, 50.0, 80.0), 100, 100).is_none());
        assert!(CropRect::from_natural(Rect::new(200.0, 0.0, 300.0, 80.0), 100, 100).is_none());
    }

    #[test]
    fn decode_rejects_foreign_payloads() {
        assert!(decode_artifact("data:image/png;base64,AAAA").is_err());
        assert!(decode_artifact("data:image/jpeg;base64,!!!not-base64!!!").is_err());
    }
}
