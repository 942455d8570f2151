use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("CoinGecko API error {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("enter an amount")]
    Empty,
    #[error("not a number")]
    NotNumeric,
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount too large")]
    TooLarge,
    #[error("rate not loaded")]
    RateNotLoaded,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored history is corrupt: {0}")]
    Corrupt(String),
}
