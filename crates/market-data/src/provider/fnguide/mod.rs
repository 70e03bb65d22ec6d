//! FnGuide source adapter (Korean market, financial statements only).
//!
//! Scrapes the annual statement tables from the `comp.fnguide.com`
//! company snapshot. Tables are identified by their Korean captions and
//! handed to the normalizer as labeled sections, so caption mapping onto
//! the canonical schema stays in one place.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::FetchError;
use crate::models::{Market, RawFinancials, Symbol};
use crate::normalize::cell_to_json;
use crate::provider::{AdapterCapabilities, RateLimit, SourceAdapter};

const PROVIDER: &str = "fnguide";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Korean captions of the three statement tables, as the snapshot page
/// prints them. The normalizer maps these onto the canonical sections.
const SECTION_CAPTIONS: [&str; 4] = ["포괄손익계산서", "손익계산서", "재무상태표", "현금흐름표"];

/// FnGuide source adapter.
pub struct FnGuideAdapter {
    client: reqwest::Client,
}

impl FnGuideAdapter {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        Ok(Self { client })
    }

    fn statement_url(code: &str) -> String {
        format!(
            "https://comp.fnguide.com/SVO2/ASP/SVD_Finance.asp?pGB=1&gicode=A{}&cID=&MenuYn=Y&ReportGB=&NewMenuID=103&stkGb=701",
            code
        )
    }

    /// Extract labeled statement sections from the snapshot page.
    ///
    /// The page repeats each statement as an annual and a quarterly
    /// table under the same caption; the annual table comes first and
    /// wins.
    fn parse_sections(html: &str) -> Vec<(String, Value)> {
        let document = Html::parse_document(html);
        let tables = Selector::parse("table").expect("static selector");
        let captions = Selector::parse("caption").expect("static selector");

        let mut sections: Vec<(String, Value)> = Vec::new();
        for table in document.select(&tables) {
            let Some(caption) = table.select(&captions).next() else {
                continue;
            };
            let caption_text = caption.text().collect::<String>();
            let Some(label) = SECTION_CAPTIONS
                .iter()
                .find(|c| caption_text.contains(**c))
            else {
                continue;
            };
            if sections.iter().any(|(l, _)| l == *label) {
                continue;
            }

            match Self::parse_statement_table(table) {
                Some(tree) => sections.push((label.to_string(), tree)),
                None => debug!("Statement table under '{}' had no usable rows", label),
            }
        }
        sections
    }

    /// Parse one statement table into `{ period -> { row label -> value } }`.
    ///
    /// Header cells past the first are period labels (`2023/12` style);
    /// body rows carry the account caption followed by one cell per
    /// period. Unparseable cells become explicit null.
    fn parse_statement_table(table: ElementRef<'_>) -> Option<Value> {
        let header_cells = Selector::parse("thead th").expect("static selector");
        let rows = Selector::parse("tbody tr").expect("static selector");
        let cells = Selector::parse("th, td").expect("static selector");

        let periods: Vec<String> = table
            .select(&header_cells)
            .skip(1)
            .map(|th| th.text().collect::<String>().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if periods.is_empty() {
            return None;
        }

        let mut by_period: Vec<Map<String, Value>> = vec![Map::new(); periods.len()];
        for row in table.select(&rows) {
            let texts: Vec<String> = row
                .select(&cells)
                .map(|c| c.text().collect::<String>().trim().to_string())
                .collect();
            let Some((account, values)) = texts.split_first() else {
                continue;
            };
            if account.is_empty() {
                continue;
            }

            for (i, raw) in values.iter().take(periods.len()).enumerate() {
                by_period[i].insert(account.clone(), cell_to_json(raw));
            }
        }

        let mut tree = Map::new();
        for (period, fields) in periods.into_iter().zip(by_period) {
            if !fields.is_empty() {
                tree.insert(period, Value::Object(fields));
            }
        }

        if tree.is_empty() {
            None
        } else {
            Some(Value::Object(tree))
        }
    }
}

#[async_trait]
impl SourceAdapter for FnGuideAdapter {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn market(&self) -> Market {
        Market::Kr
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            price_history: false,
            news: false,
            financials: true,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 20,
            min_delay: Duration::from_millis(500),
        }
    }

    async fn fetch_financials(&self, symbol: &Symbol) -> Result<RawFinancials, FetchError> {
        self.check_symbol(symbol)?;

        let response = self
            .client
            .get(Self::statement_url(symbol.code()))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(FetchError::from_status(PROVIDER, response.status()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;

        let sections = Self::parse_sections(&html);
        if sections.is_empty() {
            return Err(FetchError::SymbolNotFound {
                symbol: symbol.code().to_string(),
                provider: PROVIDER.to_string(),
            });
        }

        Ok(RawFinancials {
            ticker: symbol.code().to_string(),
            country: symbol.market().country().to_string(),
            sections,
        })
    }
}
