//! HTTP client for a Prismic-style content API

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{
    public_cursor, without_token, CmsError, ContentSource, Document, SearchResponse,
    ACCESS_TOKEN_PARAM,
};
use crate::config::PrismicConfig;

/// API root description; only the refs matter to us
#[derive(Debug, Deserialize)]
struct ApiInfo {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// Content repository client backed by reqwest
#[derive(Debug, Clone)]
pub struct PrismicClient {
    client: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl PrismicClient {
    /// Create a client from the `prismic` config section
    pub fn new(config: &PrismicConfig) -> Result<Self, CmsError> {
        if config.endpoint.trim().is_empty() {
            return Err(CmsError::NotConfigured);
        }

        let endpoint = parse_url(config.endpoint.trim())?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("prismic-blog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| CmsError::Http {
                url: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            endpoint,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Whether `url` points at this repository (same scheme, host and port)
    pub fn owns_url(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|u| u.origin() == self.endpoint.origin())
            .unwrap_or(false)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CmsError> {
        let url_str = without_token(&url);
        tracing::debug!("GET {}", url_str);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| CmsError::Http {
                url: url_str.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status {
                url: url_str,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| CmsError::Http {
            url: url_str.clone(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(|source| CmsError::Decode {
            url: url_str,
            source,
        })
    }

    /// Resolve the current master ref; it changes on every publish
    async fn master_ref(&self) -> Result<String, CmsError> {
        let mut url = self.endpoint.clone();
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair(ACCESS_TOKEN_PARAM, token);
        }

        let api: ApiInfo = self.get_json(url).await?;
        api.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or_else(|| CmsError::MissingRef(self.endpoint.to_string()))
    }

    /// Build a `documents/search` URL
    fn search_url(&self, reference: &str, query: &str, page_size: usize) -> Result<Url, CmsError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| CmsError::InvalidUrl {
                url: self.endpoint.to_string(),
                message: "endpoint cannot be a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(["documents", "search"]);

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", reference);
            pairs.append_pair("q", query);
            pairs.append_pair("pageSize", &page_size.max(1).to_string());
            if let Some(token) = &self.access_token {
                pairs.append_pair(ACCESS_TOKEN_PARAM, token);
            }
        }

        Ok(url)
    }

    async fn search(&self, query: &str, page_size: usize) -> Result<SearchResponse, CmsError> {
        let reference = self.master_ref().await?;
        let url = self.search_url(&reference, query, page_size)?;
        self.get_page(url).await
    }

    /// Fetch a page and drop the token the API echoes back into its cursors
    async fn get_page(&self, url: Url) -> Result<SearchResponse, CmsError> {
        let mut response: SearchResponse = self.get_json(url).await?;
        response.next_page = response.next_page.as_deref().map(public_cursor);
        response.prev_page = response.prev_page.as_deref().map(public_cursor);
        Ok(response)
    }

    /// The URL to request for a published cursor, with the token restored
    fn cursor_url(&self, cursor: &str) -> Result<Url, CmsError> {
        let mut url = parse_url(cursor)?;
        if let Some(token) = &self.access_token {
            let has_token = url.query_pairs().any(|(k, _)| k == ACCESS_TOKEN_PARAM);
            if self.owns_url(cursor) && !has_token {
                url.query_pairs_mut().append_pair(ACCESS_TOKEN_PARAM, token);
            }
        }
        Ok(url)
    }
}

impl ContentSource for PrismicClient {
    async fn get_by_type(
        &self,
        doc_type: &str,
        page_size: usize,
    ) -> Result<SearchResponse, CmsError> {
        let response = self.search(&type_predicate(doc_type), page_size).await?;
        tracing::debug!(
            "Fetched {} {} (page {} of {})",
            response.results.len(),
            doc_type,
            response.page,
            response.total_pages
        );
        Ok(response)
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Document, CmsError> {
        let response = self.search(&uid_predicate(doc_type, uid), 1).await?;
        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| CmsError::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }

    async fn fetch_page(&self, url: &str) -> Result<SearchResponse, CmsError> {
        let url = self.cursor_url(url)?;
        self.get_page(url).await
    }

    fn owns_cursor(&self, url: &str) -> bool {
        self.owns_url(url)
    }
}

fn parse_url(url: &str) -> Result<Url, CmsError> {
    Url::parse(url).map_err(|e| CmsError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// `[[at(document.type,"posts")]]`
fn type_predicate(doc_type: &str) -> String {
    format!(r#"[[at(document.type,"{}")]]"#, escape_quotes(doc_type))
}

/// `[[at(my.posts.uid,"slug")]]`
fn uid_predicate(doc_type: &str, uid: &str) -> String {
    format!(
        r#"[[at(my.{}.uid,"{}")]]"#,
        doc_type,
        escape_quotes(uid)
    )
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
