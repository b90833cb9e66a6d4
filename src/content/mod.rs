//! Content module - turns repository documents into the posts we render

mod post;
pub mod readtime;

pub use crate::cms::richtext::TrustedHtml;
pub use post::{format_results, ContentBlock, PostDetail, PostPagination, PostSummary};
pub use readtime::{count_words, estimate_read_minutes, DEFAULT_WORDS_PER_MINUTE};

use thiserror::Error;

use crate::helpers::DateError;

/// A document that does not have the shape a post needs
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("document {uid:?} is missing field `{field}`")]
    MissingField { uid: String, field: String },

    #[error("document {uid:?} has a malformed rich-text field `{field}`: {source}")]
    RichText {
        uid: String,
        field: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("document {uid:?}: {source}")]
    InvalidDate {
        uid: String,
        #[source]
        source: DateError,
    },
}
