//! Schema normalizer: pure mapping from provider-native payloads onto the
//! canonical schema.
//!
//! Every adapter funnels its output through this module, so numeric
//! coercion (locale separators, currency symbols) and label mapping
//! (including Korean statement captions) happen once, consistently,
//! independent of the source. A field that cannot be coerced becomes
//! explicit `null` and processing continues; normalization failures are
//! never fatal to a run.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{
    FinancialStatement, NewsArticle, NewsArticleRef, PriceBar, PriceSeries, RawFinancials,
};

/// Cap applied to scraped article bodies.
pub const MAX_BODY_CHARS: usize = 2000;

/// Fallback publisher when a listing or article page names none.
const UNKNOWN_PUBLISHER: &str = "unknown";

// ============================================================================
// Numeric / date coercion
// ============================================================================

/// Parse a number the way providers actually print them: thousands
/// separators, currency symbols, surrounding whitespace, parenthesized
/// negatives and dash placeholders.
///
/// Returns `None` for placeholders and garbage - callers map that to an
/// explicit null or skip the row.
pub fn parse_decimal_loose(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed == "N/A" {
        return None;
    }

    let (body, negative) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (&trimmed[1..trimmed.len() - 1], true)
    } else {
        (trimmed, false)
    };

    let cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-' || *c == '+')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let value: Decimal = cleaned.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Parse a provider date: ISO (`2026-08-26`) or dotted Korean form
/// (`2026.08.26`).
pub fn parse_date_loose(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y.%m.%d"))
        .ok()
}

// ============================================================================
// Price series
// ============================================================================

/// Normalize raw bars into an ordered series.
///
/// Sorts ascending by date and deduplicates (last bar per date wins), so
/// the §PriceSeries ordering invariant holds regardless of how the
/// provider paginates.
pub fn price_series(source: &str, symbol: &str, bars: Vec<PriceBar>) -> PriceSeries {
    let mut by_date: BTreeMap<NaiveDate, PriceBar> = BTreeMap::new();
    for bar in bars {
        by_date.insert(bar.date, bar);
    }

    PriceSeries {
        symbol: symbol.to_string(),
        source: source.to_string(),
        bars: by_date.into_values().collect(),
    }
}

// ============================================================================
// News
// ============================================================================

/// Combine listing refs with their fetched bodies into normalized articles.
///
/// `bodies` is positionally aligned with `refs`; items whose body fetch
/// failed carry `None` and still produce an article (body null).
pub fn news_batch(refs: Vec<NewsArticleRef>, bodies: Vec<Option<String>>) -> Vec<NewsArticle> {
    refs.into_iter()
        .zip(bodies)
        .map(|(item, body)| NewsArticle {
            publisher: item
                .publisher
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_PUBLISHER.to_string()),
            title: item.title.trim().to_string(),
            link: item.link,
            published_at: item.published_at,
            body: body.map(|text| cap_body(&text)),
        })
        .collect()
}

fn cap_body(text: &str) -> String {
    let trimmed = text.trim();
    trimmed.chars().take(MAX_BODY_CHARS).collect()
}

// ============================================================================
// Financial statements
// ============================================================================

/// Canonical statement sections.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum StatementSection {
    BalanceSheet,
    IncomeStatement,
    CashFlow,
}

/// Map a provider-native section label to the canonical section.
///
/// Covers FnGuide's Korean captions and Yahoo's module names; unknown
/// labels are dropped with a debug log.
fn section_kind(label: &str) -> Option<StatementSection> {
    match label.trim() {
        "재무상태표" | "balanceSheetHistory" | "balance_sheet" => {
            Some(StatementSection::BalanceSheet)
        }
        "포괄손익계산서" | "손익계산서" | "incomeStatementHistory" | "income_statement" => {
            Some(StatementSection::IncomeStatement)
        }
        "현금흐름표" | "cashflowStatementHistory" | "cash_flow" => {
            Some(StatementSection::CashFlow)
        }
        _ => None,
    }
}

/// Normalize a provider-native financials payload.
///
/// The output key set is identical across providers; sections the provider
/// did not supply stay explicit `null`.
pub fn financials(raw: RawFinancials) -> FinancialStatement {
    let mut statement = FinancialStatement::empty(raw.ticker, raw.country);

    for (label, tree) in raw.sections {
        match section_kind(&label) {
            Some(StatementSection::BalanceSheet) => statement.balance_sheet = tree,
            Some(StatementSection::IncomeStatement) => statement.income_statement = tree,
            Some(StatementSection::CashFlow) => statement.cash_flow = tree,
            None => {
                debug!("Dropping unrecognized statement section '{}'", label);
            }
        }
    }

    statement
}

/// Coerce a raw cell into a JSON number, or explicit null when the cell is
/// a placeholder or unparseable.
pub fn cell_to_json(raw: &str) -> Value {
    match parse_decimal_loose(raw).and_then(|d| serde_json::Number::from_f64(dec_to_f64(d))) {
        Some(n) => Value::Number(n),
        None => Value::Null,
    }
}

fn dec_to_f64(d: Decimal) -> f64 {
    use num_traits::ToPrimitive;
    d.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawFinancials;
    use serde_json::json;

    #[test]
    fn parses_comma_separated_numbers() {
        assert_eq!(
            parse_decimal_loose("1,234,567"),
            Some(Decimal::from(1_234_567))
        );
        assert_eq!(parse_decimal_loose(" 71,200 "), Some(Decimal::from(71_200)));
    }

    #[test]
    fn parses_currency_symbols_and_negatives() {
        assert_eq!(parse_decimal_loose("$150.25"), "150.25".parse().ok());
        assert_eq!(parse_decimal_loose("₩71,200"), Some(Decimal::from(71_200)));
        assert_eq!(parse_decimal_loose("(1,500)"), Some(Decimal::from(-1_500)));
    }

    #[test]
    fn placeholders_become_none() {
        assert_eq!(parse_decimal_loose("-"), None);
        assert_eq!(parse_decimal_loose(""), None);
        assert_eq!(parse_decimal_loose("N/A"), None);
    }

    #[test]
    fn parses_both_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        assert_eq!(parse_date_loose("2026-08-26"), Some(expected));
        assert_eq!(parse_date_loose("2026.08.26"), Some(expected));
        assert_eq!(parse_date_loose("tomorrow"), None);
    }

    #[test]
    fn price_series_sorts_and_dedupes() {
        let day = |d: u32| NaiveDate::from_ymd_opt(2026, 8, d).unwrap();
        let bar = |d: u32, p: i64| PriceBar {
            date: day(d),
            price: Decimal::from(p),
            volume: 10,
        };
        let series = price_series("naver", "005930", vec![bar(3, 3), bar(1, 1), bar(3, 30), bar(2, 2)]);

        let dates: Vec<NaiveDate> = series.bars.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);
        // Last write per date wins.
        assert_eq!(series.bars[2].price, Decimal::from(30));
    }

    #[test]
    fn news_batch_fills_publisher_and_caps_body() {
        let refs = vec![
            NewsArticleRef {
                title: "  Samsung beats estimates  ".to_string(),
                link: "https://news.example/1".to_string(),
                publisher: None,
                published_at: None,
            },
            NewsArticleRef {
                title: "Chips rally".to_string(),
                link: "https://news.example/2".to_string(),
                publisher: Some("Reuters".to_string()),
                published_at: None,
            },
        ];
        let long_body = "x".repeat(MAX_BODY_CHARS + 500);
        let articles = news_batch(refs, vec![Some(long_body), None]);

        assert_eq!(articles[0].title, "Samsung beats estimates");
        assert_eq!(articles[0].publisher, UNKNOWN_PUBLISHER);
        assert_eq!(articles[0].body.as_ref().unwrap().len(), MAX_BODY_CHARS);
        assert_eq!(articles[1].publisher, "Reuters");
        assert!(articles[1].body.is_none());
    }

    #[test]
    fn korean_and_yahoo_financials_normalize_to_identical_key_sets() {
        let fnguide = financials(RawFinancials {
            ticker: "005930".to_string(),
            country: "KR".to_string(),
            sections: vec![
                ("재무상태표".to_string(), json!({"자산": 100})),
                ("포괄손익계산서".to_string(), json!({"매출액": 50})),
                ("현금흐름표".to_string(), json!({"영업활동": 20})),
            ],
        });
        let yahoo = financials(RawFinancials {
            ticker: "AAPL".to_string(),
            country: "US".to_string(),
            sections: vec![
                ("balanceSheetHistory".to_string(), json!({"totalAssets": 1})),
                ("incomeStatementHistory".to_string(), json!({"totalRevenue": 2})),
            ],
        });

        let keyset = |s: &FinancialStatement| {
            let v = serde_json::to_value(s).unwrap();
            let mut keys: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(keyset(&fnguide), keyset(&yahoo));
        assert!(!fnguide.cash_flow.is_null());
        // Yahoo payload had no cash flow: explicit null, never omitted.
        assert!(yahoo.cash_flow.is_null());
    }

    #[test]
    fn unknown_section_labels_are_dropped() {
        let statement = financials(RawFinancials {
            ticker: "005930".to_string(),
            country: "KR".to_string(),
            sections: vec![("주주현황".to_string(), json!({}))],
        });
        assert!(statement.balance_sheet.is_null());
        assert!(statement.income_statement.is_null());
        assert!(statement.cash_flow.is_null());
    }

    #[test]
    fn cell_to_json_nulls_unparseable_values() {
        assert_eq!(cell_to_json("1,234"), json!(1234.0));
        assert_eq!(cell_to_json("-"), Value::Null);
    }
}
