//! The page rasterization capability.
//!
//! Turns a fetched document payload into PNG pages, one index at a time. The
//! engine keeps asking for the next page until [`RasterError::NoSuchPage`]
//! comes back, so implementations signal the page count implicitly.

pub mod error;

pub use error::RasterError;

use std::io::Cursor;

use bytes::Bytes;

/// One rasterized page, PNG-encoded.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub png: Vec<u8>,
}

#[async_trait::async_trait]
pub trait Rasterizer: Send + Sync {
    /// Extract page `page_index` (0-based) from the raw document bytes.
    ///
    /// Must fail with [`RasterError::NoSuchPage`] once `page_index` runs past
    /// the end of the document.
    async fn extract_page(&self, raw: Bytes, page_index: usize) -> Result<RasterImage, RasterError>;
}

/// Bundled rasterizer backed by the `image` crate.
///
/// Decodes one frame per payload (PNG, JPEG, single-page TIFF), so only page
/// 0 exists. Multi-page fax TIFFs need a `Rasterizer` backed by a real
/// renderer; this implementation keeps the daemon useful against gateways
/// that pre-split documents.
#[derive(Debug, Default)]
pub struct ImageRasterizer;

#[async_trait::async_trait]
impl Rasterizer for ImageRasterizer {
    async fn extract_page(&self, raw: Bytes, page_index: usize) -> Result<RasterImage, RasterError> {
        if page_index > 0 {
            return Err(RasterError::NoSuchPage { page: page_index });
        }
        // Decode + encode are CPU-bound; keep them off the async workers.
        tokio::task::spawn_blocking(move || {
            let decoded = image::load_from_memory(&raw).map_err(RasterError::Decode)?;
            let mut png = Vec::new();
            decoded
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(RasterError::Encode)?;
            Ok(RasterImage { png })
        })
        .await
        .map_err(|join| RasterError::Other(anyhow::Error::new(join)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_pixel_png() -> Bytes {
        let img = image::RgbImage::from_pixel(1, 1, image::Rgb([0u8, 0, 0]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(buf)
    }

    #[tokio::test]
    async fn extracts_page_zero() {
        let page = ImageRasterizer
            .extract_page(one_pixel_png(), 0)
            .await
            .unwrap();
        // PNG magic
        assert_eq!(&page.png[..4], b"\x89PNG");
    }

    #[tokio::test]
    async fn page_one_is_end_of_pages() {
        let err = ImageRasterizer
            .extract_page(one_pixel_png(), 1)
            .await
            .unwrap_err();
        assert!(err.is_end_of_pages());
    }

    #[tokio::test]
    async fn garbage_bytes_fail_to_decode() {
        let err = ImageRasterizer
            .extract_page(Bytes::from_static(b"not an image"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RasterError::Decode(_)));
    }
}
