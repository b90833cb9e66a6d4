//! In-memory content source for tests

use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use super::{CmsError, ContentSource, Document, SearchResponse};

/// Serves documents from a vector, paginated through `memory://` cursors
#[derive(Default)]
pub struct MemorySource {
    pub documents: Vec<Document>,
    /// Fail every `fetch_page` call while set
    pub fail_pages: AtomicBool,
    /// When set, `fetch_page` waits for a notification before answering
    pub gate: Option<Arc<Notify>>,
    pub started: AtomicBool,
    pub page_fetches: AtomicUsize,
    /// Echoed into cursors as `access_token`, like the real API does
    pub token: Option<String>,
}

impl MemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            ..Self::default()
        }
    }

    fn page(&self, doc_type: &str, page: usize, size: usize) -> SearchResponse {
        let size = size.max(1);
        let matching: Vec<&Document> = self
            .documents
            .iter()
            .filter(|d| d.doc_type == doc_type)
            .collect();
        let total_pages = matching.len().div_ceil(size);
        let cursor = |page: usize| {
            let mut url = format!("memory://{}/{}/{}", doc_type, page, size);
            if let Some(token) = &self.token {
                url.push_str("?access_token=");
                url.push_str(token);
            }
            url
        };
        let results: Vec<Document> = matching
            .iter()
            .skip((page - 1) * size)
            .take(size)
            .map(|d| (*d).clone())
            .collect();

        SearchResponse {
            page: page as u32,
            results_per_page: size as u32,
            total_results_size: matching.len() as u32,
            total_pages: total_pages as u32,
            next_page: (page < total_pages).then(|| cursor(page + 1)),
            prev_page: (page > 1).then(|| cursor(page - 1)),
            results,
        }
    }
}

impl ContentSource for MemorySource {
    async fn get_by_type(
        &self,
        doc_type: &str,
        page_size: usize,
    ) -> Result<SearchResponse, CmsError> {
        Ok(self.page(doc_type, 1, page_size))
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Document, CmsError> {
        self.documents
            .iter()
            .find(|d| d.doc_type == doc_type && d.uid.as_deref() == Some(uid))
            .cloned()
            .ok_or_else(|| CmsError::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }

    async fn fetch_page(&self, url: &str) -> Result<SearchResponse, CmsError> {
        self.started.store(true, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.page_fetches.fetch_add(1, Ordering::SeqCst);

        if self.fail_pages.load(Ordering::SeqCst) {
            return Err(CmsError::Status {
                url: url.to_string(),
                status: 503,
            });
        }

        let invalid = || CmsError::InvalidUrl {
            url: url.to_string(),
            message: "not a memory cursor".to_string(),
        };
        let rest = url.strip_prefix("memory://").ok_or_else(invalid)?;
        let path = rest.split('?').next().unwrap_or_default();
        let parts: Vec<&str> = path.split('/').collect();
        let [doc_type, page, size] = parts[..] else {
            return Err(invalid());
        };
        let page: usize = page.parse().map_err(|_| invalid())?;
        let size: usize = size.parse().map_err(|_| invalid())?;
        Ok(self.page(doc_type, page.max(1), size))
    }

    fn owns_cursor(&self, url: &str) -> bool {
        url.starts_with("memory://")
    }
}

/// A well-formed post document
pub fn post(uid: &str, title: &str, date: Option<&str>) -> Document {
    Document {
        id: format!("id-{}", uid),
        uid: Some(uid.to_string()),
        doc_type: "posts".to_string(),
        first_publication_date: date.map(str::to_string),
        last_publication_date: None,
        data: json!({
            "title": title,
            "subtitle": format!("Sobre {}\nsegunda linha", title),
            "author": "Joseph Oliveira",
            "banner": { "url": format!("https://images.prismic.io/blog/{}.png", uid) },
            "content": [
                {
                    "heading": "Proin et varius",
                    "body": [
                        { "type": "paragraph", "text": "Lorem ipsum dolor sit amet", "spans": [] }
                    ]
                }
            ]
        }),
    }
}
