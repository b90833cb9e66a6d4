//! Headless CMS access
//!
//! The site reads everything it renders from a Prismic-style content
//! repository: a JSON search API returning pages of documents, where each
//! page carries an opaque `next_page` URL. [`ContentSource`] is the seam the
//! rest of the crate depends on; [`PrismicClient`] is the HTTP implementation.

#[cfg(test)]
pub(crate) mod memory;
mod prismic;
pub mod richtext;

pub use prismic::PrismicClient;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Query parameter carrying the repository's access token
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Errors talking to the content repository
#[derive(Error, Debug)]
pub enum CmsError {
    #[error("{doc_type} document not found: {uid}")]
    NotFound { doc_type: String, uid: String },

    #[error("content endpoint is not configured (set prismic.endpoint or PRISMIC_API_ENDPOINT)")]
    NotConfigured,

    #[error("invalid URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no master ref advertised by {0}")]
    MissingRef(String),
}

impl CmsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CmsError::NotFound { .. })
    }
}

/// A structured content record, keyed by type and uid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub uid: Option<String>,

    #[serde(rename = "type")]
    pub doc_type: String,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub last_publication_date: Option<String>,

    /// Custom fields, shaped by the repository's content model
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub page: u32,

    #[serde(default)]
    pub results_per_page: u32,

    #[serde(default)]
    pub total_results_size: u32,

    #[serde(default)]
    pub total_pages: u32,

    /// Opaque URL of the following page, `None` on the last page
    #[serde(default)]
    pub next_page: Option<String>,

    #[serde(default)]
    pub prev_page: Option<String>,

    pub results: Vec<Document>,
}

/// Read access to a content repository
pub trait ContentSource: Send + Sync {
    /// First page of documents of a type
    fn get_by_type(
        &self,
        doc_type: &str,
        page_size: usize,
    ) -> impl Future<Output = Result<SearchResponse, CmsError>> + Send;

    /// A single document by its uid
    fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
    ) -> impl Future<Output = Result<Document, CmsError>> + Send;

    /// Follow a `next_page` cursor
    fn fetch_page(&self, url: &str)
        -> impl Future<Output = Result<SearchResponse, CmsError>> + Send;

    /// Whether a cursor handed back by a client points at this source
    fn owns_cursor(&self, url: &str) -> bool;
}

/// The cursor as it may be published: same URL, no access token
///
/// Cursors end up in generated HTML and API responses. The token is put
/// back by the client when the cursor is followed.
pub fn public_cursor(cursor: &str) -> String {
    match Url::parse(cursor) {
        Ok(url) => without_token(&url),
        Err(_) => cursor.to_string(),
    }
}

/// `url` with every access token parameter removed
pub(crate) fn without_token(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == ACCESS_TOKEN_PARAM) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != ACCESS_TOKEN_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut clean = url.clone();
    if pairs.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(pairs);
    }
    clean.to_string()
}
