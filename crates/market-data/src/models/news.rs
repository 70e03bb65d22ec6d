use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listing-phase handle to one article, returned by `list_news`.
///
/// Ephemeral: consumed by the per-item fetch phase and discarded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsArticleRef {
    /// Headline as listed by the provider.
    pub title: String,

    /// Canonical article URL; also the per-item fetch target.
    pub link: String,

    /// Publisher name if the listing carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    /// Publication time if the listing carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Normalized news article, one per successfully fetched item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub link: String,
    pub publisher: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    /// Scraped body text, capped by the normalizer. `None` when the body
    /// fetch failed or the page had no extractable text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}
