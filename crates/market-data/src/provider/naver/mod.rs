//! Naver source adapter (Korean market).
//!
//! Price history comes from the `finance.naver.com` daily price pages
//! (HTML scrape with pagination), market cap from the stock main page,
//! news listings from the Naver Open API, and article bodies from
//! `news.naver.com` article pages.

mod models;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use urlencoding::encode;

use crate::errors::FetchError;
use crate::models::{Market, NewsArticleRef, PriceBar, Symbol};
use crate::normalize::{parse_date_loose, parse_decimal_loose};
use crate::provider::{AdapterCapabilities, RateLimit, SourceAdapter};

use models::NaverNewsResponse;

const PROVIDER: &str = "naver";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Pause between daily-price page fetches inside one history call.
const PAGE_DELAY: Duration = Duration::from_millis(150);

/// Hard ceiling on daily-price pages per history call. Each page carries
/// ten trading days, so 40 pages comfortably covers a 180 day range.
const MAX_PRICE_PAGES: usize = 40;

lazy_static! {
    static ref PAGE_PARAM: Regex = Regex::new(r"page=(\d+)").expect("static regex");
}

/// Credentials for the Naver Open API news search.
#[derive(Clone, Debug)]
pub struct NaverApiKeys {
    pub client_id: String,
    pub client_secret: String,
}

/// Naver source adapter.
pub struct NaverAdapter {
    client: reqwest::Client,
    news_keys: Option<NaverApiKeys>,
}

impl NaverAdapter {
    pub fn new(news_keys: Option<NaverApiKeys>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        Ok(Self { client, news_keys })
    }

    fn daily_price_url(code: &str, page: usize) -> String {
        format!(
            "https://finance.naver.com/item/sise_day.nhn?code={}&page={}",
            code, page
        )
    }

    async fn get_html(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(FetchError::from_status(PROVIDER, response.status()));
        }
        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))
    }

    /// Read the last page number from the `.pgRR` pagination link.
    /// Missing pagination means a single page.
    fn last_page_number(html: &str) -> usize {
        let document = Html::parse_document(html);
        let selector = Selector::parse(".pgRR a").expect("static selector");

        document
            .select(&selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| PAGE_PARAM.captures(href))
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(1)
    }

    /// Parse one daily-price page into bars.
    ///
    /// Rows are `날짜, 종가, 전일비, 시가, 고가, 저가, 거래량`; the daily
    /// close and volume are all the canonical bar keeps. Spacer rows and
    /// rows with unparseable cells are skipped.
    fn parse_price_page(html: &str) -> Vec<PriceBar> {
        let document = Html::parse_document(html);
        let rows = Selector::parse("table.type2 tr").expect("static selector");
        let cells = Selector::parse("td").expect("static selector");

        let mut bars = Vec::new();
        for row in document.select(&rows) {
            let texts: Vec<String> = row
                .select(&cells)
                .map(|td| td.text().collect::<String>().trim().to_string())
                .collect();
            if texts.len() < 7 {
                continue;
            }

            let Some(date) = parse_date_loose(&texts[0]) else {
                continue;
            };
            let Some(price) = parse_decimal_loose(&texts[1]) else {
                continue;
            };
            let volume = parse_decimal_loose(&texts[6])
                .and_then(|d| num_traits::ToPrimitive::to_u64(&d))
                .unwrap_or(0);

            bars.push(PriceBar {
                date,
                price,
                volume,
            });
        }
        bars
    }

    /// Market cap from the stock main page (`#_market_sum`), displayed
    /// in units of 조/억 won.
    fn extract_market_cap(html: &str) -> Option<Decimal> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("#_market_sum").expect("static selector");
        let text = document
            .select(&selector)
            .next()?
            .text()
            .collect::<String>();
        parse_market_cap_text(&text)
    }
}

#[async_trait]
impl SourceAdapter for NaverAdapter {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn market(&self) -> Market {
        Market::Kr
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            price_history: true,
            news: true,
            financials: false,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 30,
            min_delay: Duration::from_millis(250),
        }
    }

    async fn fetch_price_history(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, FetchError> {
        self.check_symbol(symbol)?;

        let first = self
            .get_html(&Self::daily_price_url(symbol.code(), 1))
            .await?;
        let last_page = Self::last_page_number(&first).min(MAX_PRICE_PAGES);

        let mut bars = Self::parse_price_page(&first);
        if bars.is_empty() {
            return Err(FetchError::SymbolNotFound {
                symbol: symbol.code().to_string(),
                provider: PROVIDER.to_string(),
            });
        }

        // Pages run newest to oldest; stop once a page ends before the
        // requested range.
        let mut page = 2;
        while page <= last_page && bars.last().map(|b| b.date >= start).unwrap_or(false) {
            tokio::time::sleep(PAGE_DELAY).await;
            match self
                .get_html(&Self::daily_price_url(symbol.code(), page))
                .await
            {
                Ok(html) => {
                    let page_bars = Self::parse_price_page(&html);
                    if page_bars.is_empty() {
                        break;
                    }
                    bars.extend(page_bars);
                }
                Err(e) => {
                    warn!("Daily price page {} failed for {}: {}", page, symbol.code(), e);
                    break;
                }
            }
            page += 1;
        }

        bars.retain(|bar| bar.date >= start && bar.date <= end);
        Ok(bars)
    }

    async fn fetch_market_cap(&self, symbol: &Symbol) -> Result<Option<Decimal>, FetchError> {
        self.check_symbol(symbol)?;

        let url = format!(
            "https://finance.naver.com/item/main.naver?code={}",
            symbol.code()
        );
        let html = self.get_html(&url).await?;
        Ok(Self::extract_market_cap(&html))
    }

    async fn list_news(
        &self,
        symbol: &Symbol,
        limit: usize,
    ) -> Result<Vec<NewsArticleRef>, FetchError> {
        self.check_symbol(symbol)?;

        let keys = self.news_keys.as_ref().ok_or_else(|| FetchError::Provider {
            provider: PROVIDER.to_string(),
            message: "Naver Open API credentials not configured".to_string(),
        })?;

        let url = format!(
            "https://openapi.naver.com/v1/search/news.json?query={}&display={}",
            encode(symbol.code()),
            limit.min(100)
        );

        let response = self
            .client
            .get(&url)
            .header("X-Naver-Client-Id", &keys.client_id)
            .header("X-Naver-Client-Secret", &keys.client_secret)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(FetchError::from_status(PROVIDER, response.status()));
        }

        let data: NaverNewsResponse =
            response
                .json()
                .await
                .map_err(|e| FetchError::UnexpectedShape {
                    provider: PROVIDER.to_string(),
                    message: format!("Failed to parse news search response: {}", e),
                })?;

        let refs = data
            .items
            .into_iter()
            .filter_map(|item| {
                let link = item.link?;
                Some(NewsArticleRef {
                    title: strip_markup(&item.title),
                    link,
                    publisher: None,
                    published_at: item.pub_date.as_deref().and_then(parse_rfc2822),
                })
            })
            .take(limit)
            .collect();

        Ok(refs)
    }

    /// Articles hosted outside `news.naver.com` have no stable body
    /// markup; those return `Ok(None)` and stay listed with a null body.
    async fn fetch_article_body(
        &self,
        article: &NewsArticleRef,
    ) -> Result<Option<String>, FetchError> {
        if !article.link.contains("news.naver.com") {
            debug!("Skipping body fetch for off-host article: {}", article.link);
            return Ok(None);
        }

        let html = self.get_html(&article.link).await?;
        Ok(extract_article_body(&html))
    }
}

fn parse_rfc2822(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Strip the `<b>` highlight markup and common entities the Open API
/// embeds in titles.
fn strip_markup(raw: &str) -> String {
    lazy_static! {
        static ref TAG: Regex = Regex::new(r"<[^>]+>").expect("static regex");
    }
    TAG.replace_all(raw, "")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Convert the displayed market cap ("412조 2,639", units of 조 and 억
/// won) into won. A value below one 조 shows as a bare 억 figure.
fn parse_market_cap_text(raw: &str) -> Option<Decimal> {
    const TRILLION: i64 = 1_000_000_000_000;
    const HUNDRED_MILLION: i64 = 100_000_000;

    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let (trillions, rest) = match cleaned.split_once('조') {
        Some((lead, tail)) => (parse_decimal_loose(lead)?, tail.trim()),
        None => (Decimal::ZERO, cleaned.as_str()),
    };
    let hundred_millions = if rest.is_empty() {
        Decimal::ZERO
    } else {
        parse_decimal_loose(rest)?
    };

    Some(trillions * Decimal::from(TRILLION) + hundred_millions * Decimal::from(HUNDRED_MILLION))
}

/// Pull the body text out of a `news.naver.com` article page.
fn extract_article_body(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let body = Selector::parse("div#newsct_article").expect("static selector");

    let node = document.select(&body).next()?;
    let text = node
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn rejects_us_ticker() {
        let adapter = NaverAdapter::new(None).unwrap();
        let symbol = Symbol::parse("AAPL").unwrap();
        let err = adapter.check_symbol(&symbol).unwrap_err();
        assert!(matches!(err, FetchError::InvalidSymbol(_)));
    }

    #[test]
    fn reads_last_page_from_pagination() {
        let html = r#"
            <table class="Nnavi"><tr>
              <td class="pgRR"><a href="/item/sise_day.nhn?code=005930&amp;page=689">last</a></td>
            </tr></table>
        "#;
        assert_eq!(NaverAdapter::last_page_number(html), 689);
        assert_eq!(NaverAdapter::last_page_number("<html></html>"), 1);
    }

    #[test]
    fn parses_daily_price_rows() {
        let html = r#"
            <table class="type2">
              <tr><th>날짜</th><th>종가</th><th>전일비</th><th>시가</th><th>고가</th><th>저가</th><th>거래량</th></tr>
              <tr>
                <td>2025.08.26</td><td>71,200</td><td>600</td>
                <td>70,800</td><td>71,500</td><td>70,600</td><td>12,345,678</td>
              </tr>
              <tr><td></td></tr>
            </table>
        "#;
        let bars = NaverAdapter::parse_price_page(html);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2025, 8, 26).unwrap());
        assert_eq!(bars[0].price, Decimal::from(71_200));
        assert_eq!(bars[0].volume, 12_345_678);
    }

    #[test]
    fn strips_api_title_markup() {
        assert_eq!(
            strip_markup("<b>삼성전자</b> &quot;실적&quot; 발표"),
            "삼성전자 \"실적\" 발표"
        );
    }

    #[test]
    fn extracts_article_body_text() {
        let html = r#"
            <html><body>
              <h2 id="title_area">제목</h2>
              <div id="newsct_article">  첫 문단.  <span>둘째 문단.</span></div>
            </body></html>
        "#;
        assert_eq!(
            extract_article_body(html).unwrap(),
            "첫 문단.\n둘째 문단."
        );
        assert!(extract_article_body("<html></html>").is_none());
    }

    #[test]
    fn parses_market_cap_display_units() {
        assert_eq!(
            parse_market_cap_text("412조 2,639").unwrap(),
            Decimal::from(412_263_900_000_000i64)
        );
        assert_eq!(
            parse_market_cap_text("2,639").unwrap(),
            Decimal::from(263_900_000_000i64)
        );
        assert!(parse_market_cap_text("N/A").is_none());
    }

    #[test]
    fn extracts_market_cap_from_main_page() {
        let html = r#"<em id="_market_sum">412조&nbsp;
            2,639</em>"#;
        assert_eq!(
            NaverAdapter::extract_market_cap(html).unwrap(),
            Decimal::from(412_263_900_000_000i64)
        );
        assert!(NaverAdapter::extract_market_cap("<html></html>").is_none());
    }

    #[test]
    fn parses_open_api_pub_date() {
        let dt = parse_rfc2822("Tue, 26 Aug 2025 10:00:00 +0900").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-08-26T01:00:00+00:00");
    }
}
