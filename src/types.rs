use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const HISTORY_CAP: usize = 5;
pub const HISTORY_KEY: &str = "btc_converter_history";
pub const THEME_KEY: &str = "theme";

/// BRL per 1 BTC. Always strictly positive and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate(f64);

impl Rate {
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value > 0.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRecord {
    #[serde(alias = "btc")]
    pub amount_btc: f64,
    #[serde(alias = "brl")]
    pub amount_fiat: f64,
    pub timestamp: DateTime<Utc>,
}

impl ConversionRecord {
    pub fn is_valid(&self) -> bool {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        positive(self.amount_btc) && positive(self.amount_fiat)
    }
}

/// Where the rate display stands after the latest fetch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateStatus {
    Loading,
    Live,
    /// Last fetch failed but an older rate is still usable.
    Stale,
    /// No rate has ever loaded.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    ConfirmClearHistory,
}
