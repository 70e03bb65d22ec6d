//! Scripted adapter and collaborator doubles shared by the integration
//! tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use stockscope_analysis::{AnalysisError, AnalysisService, AnalysisTask};
use stockscope_market_data::{
    FetchError, Market, NewsArticleRef, PriceBar, RawFinancials, Symbol,
    provider::{AdapterCapabilities, RateLimit, SourceAdapter},
};

pub struct MockAdapter {
    pub price_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub body_calls: AtomicUsize,
    pub financial_calls: AtomicUsize,
    bars: Vec<PriceBar>,
    articles: Vec<NewsArticleRef>,
    failing_links: Vec<String>,
    listing_error: Option<fn() -> FetchError>,
    price_delay: Duration,
    financials_delay: Duration,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            price_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            body_calls: AtomicUsize::new(0),
            financial_calls: AtomicUsize::new(0),
            bars: Vec::new(),
            articles: Vec::new(),
            failing_links: Vec::new(),
            listing_error: None,
            price_delay: Duration::ZERO,
            financials_delay: Duration::ZERO,
        }
    }

    pub fn with_bars(mut self, count: u32) -> Self {
        self.bars = (0..count)
            .map(|i| PriceBar {
                date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap() + chrono::Days::new(i as u64),
                price: Decimal::from(70_000 + i as i64 * 100),
                volume: 1_000 + i as u64,
            })
            .collect();
        self
    }

    pub fn with_articles(mut self, count: usize) -> Self {
        self.articles = (0..count)
            .map(|i| NewsArticleRef {
                title: format!("Article {}", i),
                link: format!("https://news.example/{}", i),
                publisher: Some("MockWire".to_string()),
                published_at: None,
            })
            .collect();
        self
    }

    /// Every body fetch for this link fails with a transient error.
    pub fn failing_body(mut self, link: &str) -> Self {
        self.failing_links.push(link.to_string());
        self
    }

    pub fn listing_fails(mut self, error: fn() -> FetchError) -> Self {
        self.listing_error = Some(error);
        self
    }

    pub fn slow_prices(mut self, delay: Duration) -> Self {
        self.price_delay = delay;
        self
    }

    pub fn slow_financials(mut self, delay: Duration) -> Self {
        self.financials_delay = delay;
        self
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn id(&self) -> &'static str {
        "mock"
    }

    fn market(&self) -> Market {
        Market::Kr
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
            requests_per_minute: 6000,
            min_delay: Duration::from_millis(1),
        }
    }

    async fn fetch_price_history(
        &self,
        symbol: &Symbol,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<PriceBar>, FetchError> {
        self.check_symbol(symbol)?;
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        if !self.price_delay.is_zero() {
            tokio::time::sleep(self.price_delay).await;
        }
        Ok(self.bars.clone())
    }

    async fn fetch_market_cap(&self, symbol: &Symbol) -> Result<Option<Decimal>, FetchError> {
        self.check_symbol(symbol)?;
        Ok(Some(Decimal::from(42)))
    }

    async fn list_news(
        &self,
        symbol: &Symbol,
        limit: usize,
    ) -> Result<Vec<NewsArticleRef>, FetchError> {
        self.check_symbol(symbol)?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.listing_error {
            return Err(error());
        }
        Ok(self.articles.iter().take(limit).cloned().collect())
    }

    async fn fetch_article_body(
        &self,
        article: &NewsArticleRef,
    ) -> Result<Option<String>, FetchError> {
        self.body_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_links.contains(&article.link) {
            return Err(FetchError::Timeout {
                provider: "mock".to_string(),
            });
        }
        Ok(Some(format!("Body of {}", article.link)))
    }

    async fn fetch_financials(&self, symbol: &Symbol) -> Result<RawFinancials, FetchError> {
        self.check_symbol(symbol)?;
        self.financial_calls.fetch_add(1, Ordering::SeqCst);
        if !self.financials_delay.is_zero() {
            tokio::time::sleep(self.financials_delay).await;
        }
        Ok(RawFinancials {
            ticker: symbol.code().to_string(),
            country: "KR".to_string(),
            sections: vec![
                ("재무상태표".to_string(), json!({"2024/12": {"자산": 100.0}})),
                ("손익계산서".to_string(), json!({"2024/12": {"매출액": 50.0}})),
            ],
        })
    }
}

pub struct MockAnalysis {
    pub calls: AtomicUsize,
    fail: bool,
}

impl MockAnalysis {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }
}

#[async_trait]
impl AnalysisService for MockAnalysis {
    async fn analyze(&self, _task: AnalysisTask, _payload: &Value) -> Result<Value, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AnalysisError::EmptyResponse);
        }
        Ok(json!({"sentiment": "positive", "summary": "mock analysis"}))
    }
}

pub fn kr_symbol() -> Symbol {
    Symbol::parse("005930").unwrap()
}

pub fn date_range() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 8, 26).unwrap(),
    )
}
