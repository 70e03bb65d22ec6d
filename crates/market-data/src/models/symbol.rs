use serde::{Deserialize, Serialize};

use crate::errors::FetchError;

/// Market/locale convention a symbol belongs to.
///
/// The market decides which adapters are eligible for a symbol and which
/// numeric/date conventions apply to its providers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    /// Korean market: six-digit numeric instrument codes (e.g., "005930").
    Kr,
    /// US market: short alphabetic tickers (e.g., "AAPL", "BRK.B").
    Us,
}

impl Market {
    /// ISO country code used in normalized payloads.
    pub fn country(&self) -> &'static str {
        match self {
            Market::Kr => "KR",
            Market::Us => "US",
        }
    }
}

/// Instrument code plus the market convention it follows.
///
/// Request-scoped: symbols are parsed from the request path and never
/// persisted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Symbol {
    code: String,
    market: Market,
}

impl Symbol {
    /// Parse a raw instrument code, inferring the market from its format.
    ///
    /// Exactly six ASCII digits is a Korean instrument code; one to six
    /// ASCII letters (optionally followed by a `.` or `-` suffix such as
    /// "BRK.B") is a US ticker. Anything else is a format error.
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let trimmed = raw.trim();

        if trimmed.len() == 6 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Self {
                code: trimmed.to_string(),
                market: Market::Kr,
            });
        }

        let mut parts = trimmed.splitn(2, ['.', '-']);
        let head = parts.next().unwrap_or_default();
        let tail = parts.next();
        let head_ok = !head.is_empty()
            && head.len() <= 6
            && head.bytes().all(|b| b.is_ascii_alphabetic());
        let tail_ok = match tail {
            None => true,
            Some(s) => !s.is_empty() && s.len() <= 2 && s.bytes().all(|b| b.is_ascii_alphabetic()),
        };
        if head_ok && tail_ok {
            return Ok(Self {
                code: trimmed.to_ascii_uppercase(),
                market: Market::Us,
            });
        }

        Err(FetchError::InvalidSymbol(trimmed.to_string()))
    }

    /// The instrument code as the provider expects it.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn market(&self) -> Market {
        self.market
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code)
    }
}
