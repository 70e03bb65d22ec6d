//! Yahoo Finance source adapter (US market).
//!
//! Covers three capabilities:
//! - price history through the `yahoo_finance_api` connector
//! - news listing through the search endpoint, with generic body scraping
//! - financial statements through the quoteSummary endpoint, which needs
//!   crumb/cookie authentication
//!
//! Market cap rides on the same quoteSummary auth, via the `price`
//! module.

mod models;

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use lazy_static::lazy_static;
use reqwest::header;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{debug, warn};
use urlencoding::encode;
use yahoo_finance_api as yahoo;

use crate::errors::FetchError;
use crate::models::{Market, NewsArticleRef, PriceBar, RawFinancials, Symbol};
use crate::provider::{AdapterCapabilities, RateLimit, SourceAdapter};

use models::{YahooQuoteSummaryResponse, YahooSearchResponse};

const PROVIDER: &str = "yahoo";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// quoteSummary modules that carry the three annual statements.
const STATEMENT_MODULES: &str =
    "balanceSheetHistory,incomeStatementHistory,cashflowStatementHistory";

// ============================================================================
// Crumb/Cookie Authentication
// ============================================================================

/// Cached Yahoo authentication data.
#[derive(Debug, Clone)]
struct CrumbData {
    cookie: String,
    crumb: String,
}

lazy_static! {
    /// Global cache for the Yahoo authentication crumb.
    static ref YAHOO_CRUMB: RwLock<Option<CrumbData>> = RwLock::default();
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Yahoo Finance source adapter.
pub struct YahooAdapter {
    connector: yahoo::YahooConnector,
    client: reqwest::Client,
}

impl YahooAdapter {
    pub fn new() -> Result<Self, FetchError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| FetchError::Provider {
            provider: PROVIDER.to_string(),
            message: format!("Failed to initialize Yahoo connector: {}", e),
        })?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        Ok(Self { connector, client })
    }

    // ========================================================================
    // Crumb/Cookie Authentication
    // ========================================================================

    /// Ensure we have a valid Yahoo authentication crumb.
    async fn ensure_crumb(&self) -> Result<CrumbData, FetchError> {
        {
            let guard = YAHOO_CRUMB.read().unwrap();
            if let Some(crumb) = guard.as_ref() {
                return Ok(crumb.clone());
            }
        }

        self.fetch_crumb().await
    }

    /// Fetch a new Yahoo authentication crumb.
    async fn fetch_crumb(&self) -> Result<CrumbData, FetchError> {
        // Step 1: Get cookie from fc.yahoo.com
        let response = self
            .client
            .get("https://fc.yahoo.com")
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
            .ok_or_else(|| FetchError::Provider {
                provider: PROVIDER.to_string(),
                message: "Failed to parse Yahoo cookie".to_string(),
            })?;

        // Step 2: Get crumb using cookie
        let crumb = self
            .client
            .get("https://query1.finance.yahoo.com/v1/test/getcrumb")
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;

        let crumb_data = CrumbData { cookie, crumb };

        let mut guard = YAHOO_CRUMB.write().unwrap();
        *guard = Some(crumb_data.clone());

        Ok(crumb_data)
    }

    /// Clear the cached crumb (used when authentication expires).
    fn clear_crumb(&self) {
        let mut guard = YAHOO_CRUMB.write().unwrap();
        *guard = None;
    }

    // ========================================================================
    // Conversion helpers
    // ========================================================================

    fn date_to_offset(date: NaiveDate, end_of_day: bool) -> OffsetDateTime {
        let time = if end_of_day {
            date.and_hms_opt(23, 59, 59)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        let timestamp = time
            .map(|t| t.and_utc().timestamp())
            .unwrap_or_default();
        OffsetDateTime::from_unix_timestamp(timestamp)
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
    }

    fn quote_to_bar(&self, quote: yahoo::Quote) -> Result<PriceBar, FetchError> {
        let timestamp: DateTime<Utc> = Utc
            .timestamp_opt(quote.timestamp as i64, 0)
            .single()
            .ok_or_else(|| FetchError::UnexpectedShape {
                provider: PROVIDER.to_string(),
                message: format!("Invalid quote timestamp: {}", quote.timestamp),
            })?;

        let price =
            Decimal::from_f64_retain(quote.close).ok_or_else(|| FetchError::UnexpectedShape {
                provider: PROVIDER.to_string(),
                message: format!("Failed to convert close price {} to Decimal", quote.close),
            })?;

        Ok(PriceBar {
            date: timestamp.date_naive(),
            price: price.round_dp(4),
            volume: quote.volume,
        })
    }

    /// Market cap from the quoteSummary `price` module, if present.
    fn market_cap_from_summary(data: &Value) -> Option<Decimal> {
        data.pointer("/quoteSummary/result/0/price/marketCap/raw")
            .and_then(Value::as_f64)
            .and_then(Decimal::from_f64_retain)
    }

    /// Flatten one quoteSummary statement module into
    /// `{ period end date -> { field -> raw number } }`.
    ///
    /// Yahoo wraps every numeric cell in `{raw, fmt}`; downstream wants
    /// plain JSON numbers.
    fn flatten_statements(module: &Value, array_field: &str) -> Option<Value> {
        let statements = module.get(array_field)?.as_array()?;
        let mut by_period = Map::new();

        for statement in statements {
            let fields = statement.as_object()?;
            let period = fields
                .get("endDate")
                .and_then(|d| d.get("fmt"))
                .and_then(|f| f.as_str())
                .unwrap_or("unknown");

            let mut flat = Map::new();
            for (name, cell) in fields {
                if name == "endDate" || name == "maxAge" {
                    continue;
                }
                let value = cell.get("raw").cloned().unwrap_or(Value::Null);
                flat.insert(name.clone(), value);
            }
            by_period.insert(period.to_string(), Value::Object(flat));
        }

        if by_period.is_empty() {
            None
        } else {
            Some(Value::Object(by_period))
        }
    }
}

#[async_trait]
impl SourceAdapter for YahooAdapter {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn market(&self) -> Market {
        Market::Us
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            price_history: true,
            news: true,
            financials: true,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 60,
            min_delay: Duration::from_millis(200),
        }
    }

    async fn fetch_price_history(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, FetchError> {
        self.check_symbol(symbol)?;

        let response = self
            .connector
            .get_quote_history(
                symbol.code(),
                Self::date_to_offset(start, false),
                Self::date_to_offset(end, true),
            )
            .await
            .map_err(|e| match e {
                yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult => {
                    FetchError::SymbolNotFound {
                        symbol: symbol.code().to_string(),
                        provider: PROVIDER.to_string(),
                    }
                }
                other => FetchError::Provider {
                    provider: PROVIDER.to_string(),
                    message: other.to_string(),
                },
            })?;

        let quotes = response.quotes().map_err(|e| {
            warn!("No quotes returned for {}: {}", symbol.code(), e);
            FetchError::SymbolNotFound {
                symbol: symbol.code().to_string(),
                provider: PROVIDER.to_string(),
            }
        })?;

        quotes
            .into_iter()
            .map(|quote| self.quote_to_bar(quote))
            .collect()
    }

    async fn fetch_market_cap(&self, symbol: &Symbol) -> Result<Option<Decimal>, FetchError> {
        self.check_symbol(symbol)?;

        let crumb = self.ensure_crumb().await?;
        let url = format!(
            "https://query1.finance.yahoo.com/v10/finance/quoteSummary/{}?modules=price&crumb={}",
            encode(symbol.code()),
            encode(&crumb.crumb)
        );

        let response = self
            .client
            .get(&url)
            .header(header::COOKIE, &crumb.cookie)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.clear_crumb();
            return Err(FetchError::Provider {
                provider: PROVIDER.to_string(),
                message: "Yahoo authentication expired".to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(FetchError::from_status(PROVIDER, response.status()));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| FetchError::UnexpectedShape {
                provider: PROVIDER.to_string(),
                message: format!("Failed to parse quoteSummary response: {}", e),
            })?;

        Ok(Self::market_cap_from_summary(&data))
    }

    async fn list_news(
        &self,
        symbol: &Symbol,
        limit: usize,
    ) -> Result<Vec<NewsArticleRef>, FetchError> {
        self.check_symbol(symbol)?;

        let url = format!(
            "https://query1.finance.yahoo.com/v1/finance/search?q={}&newsCount={}&quotesCount=0",
            encode(symbol.code()),
            limit
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(FetchError::from_status(PROVIDER, response.status()));
        }

        let data: YahooSearchResponse = response
            .json()
            .await
            .map_err(|e| FetchError::UnexpectedShape {
                provider: PROVIDER.to_string(),
                message: format!("Failed to parse search response: {}", e),
            })?;

        let refs = data
            .news
            .into_iter()
            .filter_map(|item| {
                let link = item.link?;
                Some(NewsArticleRef {
                    title: item.title,
                    link,
                    publisher: item.publisher,
                    published_at: item
                        .provider_publish_time
                        .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
                })
            })
            .take(limit)
            .collect();

        Ok(refs)
    }

    async fn fetch_article_body(
        &self,
        article: &NewsArticleRef,
    ) -> Result<Option<String>, FetchError> {
        let response = self
            .client
            .get(&article.link)
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

        Ok(extract_paragraph_text(&html))
    }

    async fn fetch_financials(&self, symbol: &Symbol) -> Result<RawFinancials, FetchError> {
        self.check_symbol(symbol)?;

        let crumb = self.ensure_crumb().await?;
        let url = format!(
            "https://query1.finance.yahoo.com/v10/finance/quoteSummary/{}?modules={}&crumb={}",
            encode(symbol.code()),
            STATEMENT_MODULES,
            encode(&crumb.crumb)
        );

        let response = self
            .client
            .get(&url)
            .header(header::COOKIE, &crumb.cookie)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.clear_crumb();
            return Err(FetchError::Provider {
                provider: PROVIDER.to_string(),
                message: "Yahoo authentication expired".to_string(),
            });
        }
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::SymbolNotFound {
                symbol: symbol.code().to_string(),
                provider: PROVIDER.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(FetchError::from_status(PROVIDER, response.status()));
        }

        let data: YahooQuoteSummaryResponse =
            response
                .json()
                .await
                .map_err(|e| FetchError::UnexpectedShape {
                    provider: PROVIDER.to_string(),
                    message: format!("Failed to parse quoteSummary response: {}", e),
                })?;

        let result = data.quote_summary.result.first().ok_or_else(|| {
            FetchError::SymbolNotFound {
                symbol: symbol.code().to_string(),
                provider: PROVIDER.to_string(),
            }
        })?;

        let mut sections = Vec::new();
        for (module, array_field) in [
            ("balanceSheetHistory", "balanceSheetStatements"),
            ("incomeStatementHistory", "incomeStatementHistory"),
            ("cashflowStatementHistory", "cashflowStatements"),
        ] {
            match result
                .get(module)
                .and_then(|m| Self::flatten_statements(m, array_field))
            {
                Some(tree) => sections.push((module.to_string(), tree)),
                None => debug!("quoteSummary module '{}' empty for {}", module, symbol.code()),
            }
        }

        Ok(RawFinancials {
            ticker: symbol.code().to_string(),
            country: symbol.market().country().to_string(),
            sections,
        })
    }
}

/// Pull readable text out of an arbitrary article page: paragraph elements
/// only, so scripts, styles and navigation chrome drop out.
fn extract_paragraph_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let paragraphs = Selector::parse("p").expect("static selector");

    let mut lines: Vec<String> = Vec::new();
    for node in document.select(&paragraphs) {
        let text: String = node.text().collect::<Vec<_>>().join(" ");
        let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !trimmed.is_empty() {
            lines.push(trimmed);
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
