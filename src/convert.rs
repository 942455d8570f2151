use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::types::{ConversionRecord, Rate};

/// Trims and accepts a comma as the decimal separator.
pub fn normalize(raw: &str) -> String {
    raw.trim().replacen(',', ".", 1)
}

pub fn parse_amount(raw: &str) -> Result<f64, ValidationError> {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return Err(ValidationError::Empty);
    }
    let amount: f64 = normalized
        .parse()
        .map_err(|_| ValidationError::NotNumeric)?;
    if !amount.is_finite() {
        return Err(ValidationError::NotNumeric);
    }
    if amount <= 0.0 {
        return Err(ValidationError::NotPositive);
    }
    Ok(amount)
}

/// Input is validated before the rate, so a bad amount is reported even
/// while the rate is still loading.
pub fn convert(
    raw: &str,
    rate: Option<Rate>,
    now: DateTime<Utc>,
) -> Result<ConversionRecord, ValidationError> {
    let amount_btc = parse_amount(raw)?;
    let rate = rate.ok_or(ValidationError::RateNotLoaded)?;
    let amount_fiat = amount_btc * rate.value();
    if !amount_fiat.is_finite() {
        return Err(ValidationError::TooLarge);
    }
    Ok(ConversionRecord {
        amount_btc,
        amount_fiat,
        timestamp: now,
    })
}
