//! Upstream memo source (§6): a paginated provider of memos to ingest or re-index.
//!
//! Pages are iterated until the server returns an empty `nextPageToken`; the `creator` filter is
//! applied client-side, matching the upstream API's own lack of a server-side creator parameter.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::model::Memo;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("memo source request failed: {0}")]
    Request(String),
    #[error("memo source returned a response that could not be parsed: {0}")]
    MalformedResponse(String),
}

/// One page of the upstream `GET {memos, nextPageToken}` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemosPage {
    memos: Vec<Memo>,
    #[serde(default)]
    next_page_token: String,
}

/// A source of memos to (re-)ingest. The HTTP implementation is [`HttpMemoSource`]; tests
/// substitute an in-process fake.
#[async_trait]
pub trait MemoSource: Send + Sync {
    /// Fetches every memo authored by `creator`, following pagination to exhaustion.
    async fn list_by_creator(&self, creator: &str) -> Result<Vec<Memo>, ProviderError>;

    /// Fetches the raw bytes of one attachment by its server-relative `<base>/file/<name>/<filename>` path.
    async fn fetch_attachment(&self, attachment_name: &str, filename: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Fetches memos from a memos-style REST API over HTTP, with bearer/cookie auth (§6).
pub struct HttpMemoSource {
    base_url: String,
    session_cookie: Option<String>,
    client: reqwest::Client,
}

impl HttpMemoSource {
    pub fn new(base_url: impl Into<String>, session_cookie: Option<String>, client: reqwest::Client) -> Self {
        Self { base_url: base_url.into(), session_cookie, client }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.get(url);
        if let Some(cookie) = &self.session_cookie {
            req = req.header(reqwest::header::COOKIE, cookie.clone());
        }
        req
    }

    async fn fetch_page(&self, page_token: &str) -> Result<MemosPage, ProviderError> {
        let mut url = format!("{}/memos", self.base_url);
        if !page_token.is_empty() {
            url.push_str(&format!("?pageToken={page_token}"));
        }
        let response = self.request(&url).send().await.map_err(|e| ProviderError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ProviderError::Request(format!("memo source returned status {}", response.status())));
        }
        response.json::<MemosPage>().await.map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl MemoSource for HttpMemoSource {
    async fn list_by_creator(&self, creator: &str) -> Result<Vec<Memo>, ProviderError> {
        let mut matched = Vec::new();
        let mut page_token = String::new();
        loop {
            let page = self.fetch_page(&page_token).await?;
            matched.extend(page.memos.into_iter().filter(|m| m.creator == creator));
            if page.next_page_token.is_empty() {
                break;
            }
            page_token = page.next_page_token;
        }
        Ok(matched)
    }

    async fn fetch_attachment(&self, attachment_name: &str, filename: &str) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}/file/{attachment_name}/{filename}", self.base_url);
        let response = self.request(&url).send().await.map_err(|e| ProviderError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ProviderError::Request(format!("attachment fetch returned status {}", response.status())));
        }
        let bytes = response.bytes().await.map_err(|e| ProviderError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
