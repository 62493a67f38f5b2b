//! Listing transport errors and their retry classification.

use thiserror::Error;

/// Errors surfaced by a [`ListingSource`](super::ListingSource).
///
/// `is_retryable()` separates transient transport failures (worth a bounded
/// in-place retry when fetching document bytes) from errors that only the
/// next scheduled poll should revisit.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The source rejected our credentials or session.
    #[error("listing source rejected authentication: {0}")]
    Auth(String),

    /// The source answered with a non-success HTTP status.
    #[error("listing request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    /// The request never completed (connect, timeout, TLS, ...).
    #[error("listing request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not match the expected wire shape.
    #[error("malformed listing response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A rename was not applied remotely.
    #[error("rename of {bucket_id}/{sequence_id} failed: {reason}")]
    Rename {
        bucket_id: u32,
        sequence_id: u64,
        reason: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ListingError {
    /// Whether an immediate bounded retry is worthwhile.
    pub fn is_retryable(&self) -> bool {
        match self {
            ListingError::Status { status, .. } => *status == 429 || *status >= 500,
            ListingError::Http(_) => true,
            ListingError::Auth(_)
            | ListingError::Decode(_)
            | ListingError::Rename { .. }
            | ListingError::Other(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable() {
        for status in [429u16, 500, 502, 503] {
            let e = ListingError::Status {
                status,
                url: "http://gw/inbox".into(),
            };
            assert!(e.is_retryable(), "status {status} should be retryable");
        }
    }

    #[test]
    fn client_errors_are_not_retryable() {
        for status in [400u16, 401, 403, 404] {
            let e = ListingError::Status {
                status,
                url: "http://gw/inbox".into(),
            };
            assert!(!e.is_retryable(), "status {status} should not be retryable");
        }
    }

    #[test]
    fn auth_and_decode_are_not_retryable() {
        assert!(!ListingError::Auth("bad password".into()).is_retryable());
        let decode: ListingError = serde_json::from_str::<Vec<u8>>("{")
            .map_err(ListingError::from)
            .unwrap_err();
        assert!(!decode.is_retryable());
    }
}
