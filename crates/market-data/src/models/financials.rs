use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider-native financial statement payload.
///
/// Sections keep the provider's own labels (including non-English captions
/// such as "재무상태표"); the normalizer maps them onto the canonical
/// three-section shape. Ephemeral: owned by one adapter invocation.
#[derive(Clone, Debug)]
pub struct RawFinancials {
    pub ticker: String,
    pub country: String,

    /// (provider-native section label, JSON tree) pairs in page order.
    pub sections: Vec<(String, Value)>,
}

/// Canonical financial statement payload.
///
/// Invariant: the key set is identical for every provider. Sections the
/// provider did not supply are explicit `null`, never omitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatement {
    pub ticker: String,
    pub country: String,
    pub balance_sheet: Value,
    pub income_statement: Value,
    pub cash_flow: Value,
}

impl FinancialStatement {
    /// An all-null statement for the given identity, filled in section by
    /// section by the normalizer.
    pub fn empty(ticker: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            country: country.into(),
            balance_sheet: Value::Null,
            income_statement: Value::Null,
            cash_flow: Value::Null,
        }
    }
}
