//! Database model for cached price bars.

use chrono::NaiveDate;
use diesel::prelude::*;

use crate::errors::StorageError;
use tickerscope_core::market_data::PriceBar;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database model for price bars
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::price_bars)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PriceBarDB {
    pub symbol: String,
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub adjusted_close: Option<f64>,
    pub updated_at: String,
}

impl PriceBarDB {
    /// Row for `bar`. Volumes beyond SQLite's signed 64-bit range are rejected.
    pub fn from_bar(bar: &PriceBar, updated_at: &str) -> Result<Self, StorageError> {
        let volume = i64::try_from(bar.volume).map_err(|_| {
            StorageError::InvalidValue(format!(
                "volume {} out of range for {} on {}",
                bar.volume, bar.symbol, bar.date
            ))
        })?;

        Ok(Self {
            symbol: bar.symbol.clone(),
            date: format_date(bar.date),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume,
            adjusted_close: bar.adjusted_close,
            updated_at: updated_at.to_string(),
        })
    }
}

impl TryFrom<PriceBarDB> for PriceBar {
    type Error = StorageError;

    fn try_from(db: PriceBarDB) -> Result<Self, Self::Error> {
        let date = parse_date(&db.date)?;
        let volume = u64::try_from(db.volume).map_err(|_| {
            StorageError::InvalidValue(format!(
                "negative volume {} for {} on {}",
                db.volume, db.symbol, db.date
            ))
        })?;

        Ok(PriceBar {
            symbol: db.symbol,
            date,
            open: db.open,
            high: db.high,
            low: db.low,
            close: db.close,
            volume,
            adjusted_close: db.adjusted_close,
        })
    }
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| StorageError::InvalidValue(format!("bad date '{}': {}", value, e)))
}
