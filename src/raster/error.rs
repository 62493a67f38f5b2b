//! Rasterizer errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    /// The document has no page at this index. This is the expected
    /// end-of-pages signal, not a failure.
    #[error("document has no page {page}")]
    NoSuchPage { page: usize },

    /// The raw bytes could not be decoded as a document image.
    #[error("failed to decode document: {0}")]
    Decode(#[source] image::ImageError),

    /// A decoded page could not be encoded as PNG.
    #[error("failed to encode page as png: {0}")]
    Encode(#[source] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RasterError {
    /// True when the page loop should stop cleanly.
    pub fn is_end_of_pages(&self) -> bool {
        matches!(self, RasterError::NoSuchPage { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_such_page_terminates_the_loop() {
        assert!(RasterError::NoSuchPage { page: 3 }.is_end_of_pages());
        assert!(!RasterError::Other(anyhow::anyhow!("boom")).is_end_of_pages());
    }
}
