//! Maps raw daily series payloads onto [`PriceBar`] rows.
//!
//! All three series share one shape:
//!
//! ```text
//! { "Meta Data": {..}, "<series key>": { "2024-01-02": { "1. open": "100.0", .. }, .. } }
//! ```
//!
//! The series key contains "Time Series" or "Digital Currency". Field names
//! differ per function and are mapped through fixed tables below.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::errors::MarketDataError;
use crate::models::{ClassifiedSymbol, PriceBar, SeriesFunction};

use super::RawPayload;

const SERIES_KEY_MARKERS: [&str; 2] = ["Time Series", "Digital Currency"];
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Open,
    High,
    Low,
    Close,
    AdjustedClose,
    Volume,
}

const EQUITY_FIELDS: &[(&str, Field)] = &[
    ("1. open", Field::Open),
    ("2. high", Field::High),
    ("3. low", Field::Low),
    ("4. close", Field::Close),
    ("5. adjusted close", Field::AdjustedClose),
    ("6. volume", Field::Volume),
    // Unadjusted TIME_SERIES_DAILY numbering
    ("5. volume", Field::Volume),
];

// Crypto names carry the market currency, e.g. "1a. open (USD)". The suffix
// is stripped before lookup and must match the requested market.
const CRYPTO_FIELDS: &[(&str, Field)] = &[
    ("1a. open", Field::Open),
    ("2a. high", Field::High),
    ("3a. low", Field::Low),
    ("4a. close", Field::Close),
    ("1. open", Field::Open),
    ("2. high", Field::High),
    ("3. low", Field::Low),
    ("4. close", Field::Close),
    ("5. volume", Field::Volume),
];

const FX_FIELDS: &[(&str, Field)] = &[
    ("1. open", Field::Open),
    ("2. high", Field::High),
    ("3. low", Field::Low),
    ("4. close", Field::Close),
];

/// Normalize a success payload into bars for `symbol`, sorted by date.
///
/// Fails as a whole if the series key is missing or any row cannot be
/// coerced; no partial result is returned.
pub fn normalize(
    payload: &RawPayload,
    symbol: &ClassifiedSymbol,
) -> Result<Vec<PriceBar>, MarketDataError> {
    let fail = |message: String| MarketDataError::Normalization {
        symbol: symbol.symbol.clone(),
        message,
    };

    let series = find_series(payload).map_err(&fail)?;
    let function = symbol.function();
    let market = symbol.quote_currency.as_deref();

    let mut bars = Vec::with_capacity(series.len());
    for (date_str, row) in series {
        let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT)
            .map_err(|e| fail(format!("invalid date '{}': {}", date_str, e)))?;
        let fields = row
            .as_object()
            .ok_or_else(|| fail(format!("row {} is not an object", date_str)))?;
        let bar = normalize_row(&symbol.symbol, date, fields, function, market)
            .map_err(|m| fail(format!("row {}: {}", date_str, m)))?;
        bars.push(bar);
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

fn find_series(payload: &RawPayload) -> Result<&Map<String, Value>, String> {
    let mut matches = payload
        .iter()
        .filter(|(key, _)| SERIES_KEY_MARKERS.iter().any(|m| key.contains(m)));

    let (key, value) = matches.next().ok_or_else(|| {
        let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
        format!("no time series key in payload (keys: {:?})", keys)
    })?;

    if let Some((other, _)) = matches.next() {
        return Err(format!(
            "ambiguous payload: both '{}' and '{}' look like series",
            key, other
        ));
    }

    value
        .as_object()
        .ok_or_else(|| format!("'{}' is not an object", key))
}

fn field_for(function: SeriesFunction, key: &str, market: Option<&str>) -> Option<Field> {
    let (table, name) = match function {
        SeriesFunction::EquityDailyAdjusted => (EQUITY_FIELDS, key),
        SeriesFunction::FxDaily => (FX_FIELDS, key),
        SeriesFunction::CryptoDaily => (CRYPTO_FIELDS, strip_market(key, market)?),
    };
    table
        .iter()
        .find(|(field_name, _)| *field_name == name)
        .map(|(_, field)| *field)
}

/// "1a. open (USD)" → "1a. open" when the market matches; keys without a
/// currency suffix pass through.
fn strip_market<'a>(key: &'a str, market: Option<&str>) -> Option<&'a str> {
    match key.rsplit_once(" (") {
        Some((name, rest)) => {
            let currency = rest.strip_suffix(')')?;
            (Some(currency) == market).then_some(name)
        }
        None => Some(key),
    }
}

fn normalize_row(
    symbol: &str,
    date: NaiveDate,
    fields: &Map<String, Value>,
    function: SeriesFunction,
    market: Option<&str>,
) -> Result<PriceBar, String> {
    let mut open = None;
    let mut high = None;
    let mut low = None;
    let mut close = None;
    let mut adjusted_close = None;
    let mut volume = None;

    for (key, value) in fields {
        let Some(field) = field_for(function, key, market) else {
            continue;
        };
        match field {
            Field::Open => open = Some(parse_price(key, value)?),
            Field::High => high = Some(parse_price(key, value)?),
            Field::Low => low = Some(parse_price(key, value)?),
            Field::Close => close = Some(parse_price(key, value)?),
            Field::AdjustedClose => adjusted_close = Some(parse_price(key, value)?),
            Field::Volume => volume = Some(parse_volume(key, value)?),
        }
    }

    let volume = match function {
        // FX series carry no volume.
        SeriesFunction::FxDaily => 0,
        _ => volume.ok_or("missing volume")?,
    };

    Ok(PriceBar {
        symbol: symbol.to_string(),
        date,
        open: open.ok_or("missing open")?,
        high: high.ok_or("missing high")?,
        low: low.ok_or("missing low")?,
        close: close.ok_or("missing close")?,
        volume,
        adjusted_close,
    })
}

fn parse_number(key: &str, value: &Value) -> Result<f64, String> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(format!("'{}' has non-numeric value {}", key, value)),
    }
}

fn parse_price(key: &str, value: &Value) -> Result<f64, String> {
    parse_number(key, value)
}

/// Volumes are whole shares for equities but fractional coins for crypto;
/// fractional values are rounded to the nearest unit.
fn parse_volume(key: &str, value: &Value) -> Result<u64, String> {
    if let Some(v) = value.as_str().and_then(|s| s.trim().parse::<u64>().ok()) {
        return Ok(v);
    }
    if let Some(v) = value.as_u64() {
        return Ok(v);
    }
    let v = parse_number(key, value)?;
    if v < 0.0 {
        return Err(format!("'{}' is negative ({})", key, v));
    }
    Ok(v.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::classify;
    use serde_json::json;

    fn payload(value: Value) -> RawPayload {
        value.as_object().cloned().unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_equity_adjusted_payload() {
        let raw = payload(json!({
            "Meta Data": { "2. Symbol": "AAPL" },
            "Time Series (Daily)": {
                "2024-01-03": {
                    "1. open": "101.5", "2. high": "103.0", "3. low": "100.5",
                    "4. close": "102.0", "5. adjusted close": "101.9",
                    "6. volume": "1200000", "7. dividend amount": "0.0000",
                    "8. split coefficient": "1.0"
                },
                "2024-01-02": {
                    "1. open": "100.0", "2. high": "102.0", "3. low": "99.0",
                    "4. close": "101.5", "5. adjusted close": "101.4",
                    "6. volume": "1000000", "7. dividend amount": "0.0000",
                    "8. split coefficient": "1.0"
                }
            }
        }));

        let bars = normalize(&raw, &classify("AAPL")).unwrap();
        assert_eq!(bars.len(), 2);

        let first = &bars[0];
        assert_eq!(first.symbol, "AAPL");
        assert_eq!(first.date, d(2024, 1, 2));
        assert_eq!(first.open, 100.0);
        assert_eq!(first.high, 102.0);
        assert_eq!(first.low, 99.0);
        assert_eq!(first.close, 101.5);
        assert_eq!(first.adjusted_close, Some(101.4));
        assert_eq!(first.volume, 1_000_000);
        assert_eq!(bars[1].date, d(2024, 1, 3));
    }

    #[test]
    fn test_unadjusted_equity_volume_numbering() {
        let raw = payload(json!({
            "Time Series (Daily)": {
                "2024-01-02": {
                    "1. open": "1", "2. high": "2", "3. low": "0.5",
                    "4. close": "1.5", "5. volume": "42"
                }
            }
        }));
        let bars = normalize(&raw, &classify("IBM")).unwrap();
        assert_eq!(bars[0].volume, 42);
        assert_eq!(bars[0].adjusted_close, None);
    }

    #[test]
    fn test_crypto_market_suffixed_fields() {
        let raw = payload(json!({
            "Meta Data": {},
            "Time Series (Digital Currency Daily)": {
                "2024-01-02": {
                    "1a. open (USD)": "45000.00", "1b. open (USD)": "45000.00",
                    "2a. high (USD)": "46000.00", "2b. high (USD)": "46000.00",
                    "3a. low (USD)": "44000.00", "3b. low (USD)": "44000.00",
                    "4a. close (USD)": "45500.00", "4b. close (USD)": "45500.00",
                    "5. volume": "1234.56",
                    "6. market cap (USD)": "1234.56"
                }
            }
        }));

        let bars = normalize(&raw, &classify("BTC-USD")).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].symbol, "BTC-USD");
        assert_eq!(bars[0].open, 45000.0);
        assert_eq!(bars[0].close, 45500.0);
        assert_eq!(bars[0].volume, 1235);
        assert_eq!(bars[0].adjusted_close, None);
    }

    #[test]
    fn test_crypto_plain_numbering() {
        let raw = payload(json!({
            "Time Series (Digital Currency Daily)": {
                "2024-01-02": {
                    "1. open": "2300.1", "2. high": "2350.0", "3. low": "2280.0",
                    "4. close": "2333.3", "5. volume": "98765"
                }
            }
        }));
        let bars = normalize(&raw, &classify("ETH-USD")).unwrap();
        assert_eq!(bars[0].high, 2350.0);
        assert_eq!(bars[0].volume, 98765);
    }

    #[test]
    fn test_fx_payload_has_zero_volume() {
        let raw = payload(json!({
            "Meta Data": {},
            "Time Series FX (Daily)": {
                "2024-01-02": {
                    "1. open": "1.1570", "2. high": "1.1600",
                    "3. low": "1.1500", "4. close": "1.1550"
                }
            }
        }));
        let bars = normalize(&raw, &classify("GBP-EUR")).unwrap();
        assert_eq!(bars[0].volume, 0);
        assert_eq!(bars[0].close, 1.1550);
    }

    #[test]
    fn test_missing_series_key_fails() {
        let raw = payload(json!({ "Meta Data": {} }));
        let err = normalize(&raw, &classify("AAPL")).unwrap_err();
        match err {
            MarketDataError::Normalization { symbol, message } => {
                assert_eq!(symbol, "AAPL");
                assert!(message.contains("no time series key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_one_bad_value_fails_whole_payload() {
        let raw = payload(json!({
            "Time Series (Daily)": {
                "2024-01-02": {
                    "1. open": "100.0", "2. high": "102.0", "3. low": "99.0",
                    "4. close": "101.5", "5. adjusted close": "101.4", "6. volume": "1000"
                },
                "2024-01-03": {
                    "1. open": "n/a", "2. high": "102.0", "3. low": "99.0",
                    "4. close": "101.5", "5. adjusted close": "101.4", "6. volume": "1000"
                }
            }
        }));
        let err = normalize(&raw, &classify("AAPL")).unwrap_err();
        assert!(matches!(err, MarketDataError::Normalization { .. }));
    }

    #[test]
    fn test_invalid_date_fails() {
        let raw = payload(json!({
            "Time Series (Daily)": {
                "01/02/2024": {
                    "1. open": "1", "2. high": "1", "3. low": "1",
                    "4. close": "1", "6. volume": "1"
                }
            }
        }));
        assert!(normalize(&raw, &classify("AAPL")).is_err());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let raw = payload(json!({
            "Time Series (Daily)": {
                "2024-01-02": { "1. open": "1", "2. high": "1", "3. low": "1", "6. volume": "1" }
            }
        }));
        let err = normalize(&raw, &classify("AAPL")).unwrap_err();
        assert!(err.to_string().contains("missing close"));
    }

    #[test]
    fn test_negative_volume_fails() {
        let raw = payload(json!({
            "Time Series (Daily)": {
                "2024-01-02": {
                    "1. open": "1", "2. high": "1", "3. low": "1",
                    "4. close": "1", "6. volume": "-5"
                }
            }
        }));
        assert!(normalize(&raw, &classify("AAPL")).is_err());
    }

    #[test]
    fn test_crypto_other_market_fields_ignored() {
        assert_eq!(
            field_for(SeriesFunction::CryptoDaily, "1a. open (CNY)", Some("USD")),
            None
        );
        assert_eq!(
            field_for(SeriesFunction::CryptoDaily, "1a. open (USD)", Some("USD")),
            Some(Field::Open)
        );
    }
}
