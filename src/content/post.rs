//! Post models

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{readtime, ContentError, TrustedHtml};
use crate::cms::{public_cursor, richtext, Document, SearchResponse};
use crate::helpers::{first_line, DateFormatter};

/// A post as listed on the home page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,
    /// Display date, empty when the post was never published
    pub first_publication_date: String,
    pub title: String,
    /// First line of the subtitle only
    pub subtitle: String,
    pub author: String,
}

/// One section of a post body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: TrustedHtml,
}

/// A post as shown on its own page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub first_publication_date: String,
    pub content: Vec<ContentBlock>,
    /// Estimated once, when the page is generated
    pub read_minutes: usize,
}

/// A page of summaries plus the cursor to the next one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPagination {
    pub next_page: Option<String>,
    pub results: Vec<PostSummary>,
}

impl PostPagination {
    /// Format a raw search response
    ///
    /// The cursor is published, so it never keeps an access token.
    pub fn from_response(
        response: SearchResponse,
        formatter: &DateFormatter,
    ) -> Result<Self, ContentError> {
        let results = format_results(&response, formatter)?;
        Ok(Self {
            next_page: response.next_page.as_deref().map(public_cursor),
            results,
        })
    }
}

/// Map every result of a response to a summary, in order
pub fn format_results(
    response: &SearchResponse,
    formatter: &DateFormatter,
) -> Result<Vec<PostSummary>, ContentError> {
    response
        .results
        .iter()
        .map(|doc| PostSummary::from_document(doc, formatter))
        .collect()
}

impl PostSummary {
    pub fn from_document(doc: &Document, formatter: &DateFormatter) -> Result<Self, ContentError> {
        let fields = Fields::new(doc)?;
        Ok(Self {
            first_publication_date: fields.date(formatter)?,
            title: fields.required_str("title")?.to_string(),
            subtitle: first_line(fields.required_str("subtitle")?).to_string(),
            author: fields.required_str("author")?.to_string(),
            uid: fields.uid,
        })
    }
}

impl PostDetail {
    pub fn from_document(
        doc: &Document,
        formatter: &DateFormatter,
        words_per_minute: usize,
    ) -> Result<Self, ContentError> {
        let fields = Fields::new(doc)?;

        let banner_url = fields
            .data
            .get("banner")
            .and_then(|b| b.get("url"))
            .and_then(Value::as_str)
            .ok_or_else(|| fields.missing("banner.url"))?
            .to_string();

        let content = fields
            .data
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| fields.missing("content"))?
            .iter()
            .enumerate()
            .map(|(i, item)| fields.content_block(i, item))
            .collect::<Result<Vec<_>, _>>()?;

        let read_minutes = readtime::estimate_read_minutes(&content, words_per_minute);

        Ok(Self {
            first_publication_date: fields.date(formatter)?,
            title: fields.required_str("title")?.to_string(),
            subtitle: fields.optional_str("subtitle").to_string(),
            author: fields.required_str("author")?.to_string(),
            banner_url,
            content,
            read_minutes,
            uid: fields.uid,
        })
    }
}

/// Field access on a document, reporting which field is missing
struct Fields<'a> {
    uid: String,
    doc: &'a Document,
    data: &'a Value,
}

impl<'a> Fields<'a> {
    fn new(doc: &'a Document) -> Result<Self, ContentError> {
        let uid = doc
            .uid
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ContentError::MissingField {
                uid: doc.id.clone(),
                field: "uid".to_string(),
            })?;
        Ok(Self {
            uid,
            doc,
            data: &doc.data,
        })
    }

    fn missing(&self, field: &str) -> ContentError {
        ContentError::MissingField {
            uid: self.uid.clone(),
            field: field.to_string(),
        }
    }

    fn required_str(&self, field: &str) -> Result<&'a str, ContentError> {
        self.data
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing(field))
    }

    fn optional_str(&self, field: &str) -> &'a str {
        self.data.get(field).and_then(Value::as_str).unwrap_or_default()
    }

    fn date(&self, formatter: &DateFormatter) -> Result<String, ContentError> {
        formatter
            .format(self.doc.first_publication_date.as_deref())
            .map_err(|source| ContentError::InvalidDate {
                uid: self.uid.clone(),
                source,
            })
    }

    fn rich_text(
        &self,
        field: String,
        value: &Value,
    ) -> Result<Vec<richtext::Block>, ContentError> {
        richtext::parse(value).map_err(|source| ContentError::RichText {
            uid: self.uid.clone(),
            field,
            source,
        })
    }

    /// Headings are key-text strings, but a title-style rich-text field works too
    fn content_block(&self, index: usize, item: &Value) -> Result<ContentBlock, ContentError> {
        let heading = match item.get("heading") {
            Some(Value::String(s)) => s.clone(),
            Some(value @ Value::Array(_)) => {
                richtext::as_text(&self.rich_text(format!("content[{}].heading", index), value)?)
            }
            _ => return Err(self.missing(&format!("content[{}].heading", index))),
        };

        let body = match item.get("body") {
            Some(value) if !value.is_null() => {
                richtext::as_html(&self.rich_text(format!("content[{}].body", index), value)?)
            }
            _ => return Err(self.missing(&format!("content[{}].body", index))),
        };

        Ok(ContentBlock { heading, body })
    }
}
