//! Response models for the Naver Open API news search endpoint.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct NaverNewsResponse {
    #[serde(default)]
    pub items: Vec<NaverNewsItem>,
}

#[derive(Debug, Deserialize)]
pub struct NaverNewsItem {
    /// Title with `<b>` highlight markup and HTML entities.
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub link: Option<String>,

    /// RFC 2822, e.g. `Tue, 26 Aug 2025 10:00:00 +0900`.
    #[serde(default, rename = "pubDate")]
    pub pub_date: Option<String>,
}
