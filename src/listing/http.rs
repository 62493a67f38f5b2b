//! Reference transport: a JSON gateway in front of the fax server.
//!
//! The gateway dialect is deliberately small: `POST /login` exchanges
//! credentials for a bearer token, `GET /inbox` pages through the listing,
//! `POST /rename` renames an entry, and `source_ref` is an absolute URL that
//! serves the raw document bytes. Expired tokens are refreshed with one
//! re-login per request.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::entry::Entry;
use super::error::ListingError;
use super::ListingSource;

const USER_AGENT: &str = concat!("faxmirror/", env!("CARGO_PKG_VERSION"));

/// How many entries to request per page. The engine re-fetches the full
/// window every poll, so pages just bound single-response size.
const PAGE_SIZE: usize = 50;

pub struct HttpListingSource {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    token: RwLock<Option<String>>,
}

impl std::fmt::Debug for HttpListingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpListingSource")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Listing row as the gateway serializes it. Sequence ids travel as decimal
/// strings because the upstream values exceed 2^53 and must survive JSON
/// parsers that read numbers as f64; a plain number is accepted too.
#[derive(Debug, Deserialize)]
struct WireEntry {
    bucket: u32,
    #[serde(deserialize_with = "sequence_id")]
    seq: u64,
    name: String,
    href: String,
    #[serde(default)]
    received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    acknowledged_at: Option<DateTime<Utc>>,
}

fn sequence_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }
    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

impl From<WireEntry> for Entry {
    fn from(wire: WireEntry) -> Self {
        Entry {
            bucket_id: wire.bucket,
            sequence_id: wire.seq,
            display_name: wire.name,
            source_ref: wire.href,
            received_at: wire.received_at,
            acknowledged_at: wire.acknowledged_at,
            local_images: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RenameRequest<'a> {
    bucket: u32,
    seq: String,
    name: &'a str,
}

impl HttpListingSource {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ListingError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            token: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Exchange credentials for a bearer token. `Ok(false)` on rejection.
    async fn login(&self) -> Result<bool, ListingError> {
        let url = self.endpoint("login");
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(ListingError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let login: LoginResponse = resp.json().await?;
        *self.token.write().await = Some(login.token);
        Ok(true)
    }

    async fn bearer(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Send a GET, re-logging-in once if the session token has expired.
    async fn get_authed(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, ListingError> {
        for attempt in 0..2 {
            let mut req = self.client.get(url).query(query);
            if let Some(token) = self.bearer().await {
                req = req.bearer_auth(token);
            }
            let resp = req.send().await?;
            let status = resp.status();

            if status == reqwest::StatusCode::UNAUTHORIZED && attempt == 0 {
                tracing::debug!(url, "session expired, re-authenticating");
                if !self.login().await? {
                    return Err(ListingError::Auth(
                        "re-authentication rejected by the listing source".into(),
                    ));
                }
                continue;
            }
            if !status.is_success() {
                return Err(ListingError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
            return Ok(resp);
        }
        unreachable!("second attempt always returns")
    }
}

#[async_trait::async_trait]
impl ListingSource for HttpListingSource {
    async fn authenticate(&self) -> Result<bool, ListingError> {
        self.login().await
    }

    async fn fetch_all(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Entry>, ListingError> {
        let url = self.endpoint("inbox");
        let from = start.format("%Y%m%d").to_string();
        let to = end.format("%Y%m%d").to_string();

        let mut entries = Vec::new();
        for page in 1u32.. {
            let query = [
                ("from", from.clone()),
                ("to", to.clone()),
                ("page", page.to_string()),
                ("count", PAGE_SIZE.to_string()),
            ];
            let resp = self.get_authed(&url, &query).await?;
            let rows: Vec<WireEntry> = resp.json().await?;
            let short_page = rows.len() < PAGE_SIZE;
            entries.extend(rows.into_iter().map(Entry::from));
            if short_page {
                break;
            }
        }
        tracing::debug!(count = entries.len(), %from, %to, "fetched inbox listing");
        Ok(entries)
    }

    async fn rename(&self, entry: &Entry, new_name: &str) -> Result<(), ListingError> {
        let url = self.endpoint("rename");
        let body = RenameRequest {
            bucket: entry.bucket_id,
            seq: entry.sequence_id.to_string(),
            name: new_name,
        };
        let mut req = self.client.post(&url).json(&body);
        if let Some(token) = self.bearer().await {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ListingError::Rename {
                bucket_id: entry.bucket_id,
                sequence_id: entry.sequence_id,
                reason: format!("gateway answered {status}"),
            });
        }
        Ok(())
    }

    async fn fetch_raw(&self, source_ref: &str) -> Result<Bytes, ListingError> {
        let resp = self.get_authed(source_ref, &[]).await?;
        Ok(resp.bytes().await?)
    }
}
