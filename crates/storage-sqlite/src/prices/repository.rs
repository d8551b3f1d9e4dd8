use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::dsl::{count_star, max, min};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::model::{format_date, parse_date, PriceBarDB};
use crate::db::{self, get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::price_bars::dsl as price_bars_dsl;
use crate::utils::chunk_for_sqlite;
use tickerscope_core::market_data::{DateRange, PriceBar};
use tickerscope_core::prices::{ensure_single_symbol, CacheSummary, PriceStore};
use tickerscope_core::Result;

/// SQLite-backed price cache.
///
/// Reads use pooled connections; writes go through the single writer actor.
pub struct SqlitePriceStore {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqlitePriceStore {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// Initializes the database at `db_path`, applies migrations and starts
    /// the writer actor. Must be called from within a Tokio runtime.
    pub fn open(db_path: &str) -> Result<Self> {
        let db_path = db::init(db_path)?;
        let pool = db::create_pool(&db_path)?;
        db::run_migrations(&pool)?;
        let writer = db::spawn_writer(&pool)?;
        Ok(Self::new(pool, writer))
    }

    pub fn pool(&self) -> &Arc<DbPool> {
        &self.pool
    }

    /// Flushes the WAL into the main database file.
    pub fn checkpoint(&self) -> Result<()> {
        db::checkpoint(&self.pool)
    }
}

// =============================================================================
// PriceStore Implementation
// =============================================================================

#[async_trait]
impl PriceStore for SqlitePriceStore {
    fn cached_dates(&self, symbol: &str, range: &DateRange) -> Result<BTreeSet<NaiveDate>> {
        let mut conn = get_connection(&self.pool)?;

        let dates = price_bars_dsl::price_bars
            .filter(price_bars_dsl::symbol.eq(symbol))
            .filter(price_bars_dsl::date.ge(format_date(range.start())))
            .filter(price_bars_dsl::date.le(format_date(range.end())))
            .select(price_bars_dsl::date)
            .load::<String>(&mut conn)
            .into_core()?;

        dates
            .iter()
            .map(|d| parse_date(d).map_err(Into::into))
            .collect()
    }

    fn read_range(&self, symbol: &str, range: &DateRange) -> Result<Vec<PriceBar>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = price_bars_dsl::price_bars
            .filter(price_bars_dsl::symbol.eq(symbol))
            .filter(price_bars_dsl::date.ge(format_date(range.start())))
            .filter(price_bars_dsl::date.le(format_date(range.end())))
            .order(price_bars_dsl::date.asc())
            .select(PriceBarDB::as_select())
            .load::<PriceBarDB>(&mut conn)
            .into_core()?;

        rows.into_iter()
            .map(|row| PriceBar::try_from(row).map_err(Into::into))
            .collect()
    }

    async fn upsert(&self, symbol: &str, bars: &[PriceBar]) -> Result<usize> {
        ensure_single_symbol(symbol, bars)?;
        if bars.is_empty() {
            return Ok(0);
        }

        let updated_at = Utc::now().to_rfc3339();
        let db_rows = bars
            .iter()
            .map(|bar| PriceBarDB::from_bar(bar, &updated_at))
            .collect::<std::result::Result<Vec<_>, StorageError>>()?;
        let symbol = symbol.to_string();

        let written = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut total_upserted = 0;
                for chunk in chunk_for_sqlite(&db_rows) {
                    total_upserted += diesel::replace_into(price_bars_dsl::price_bars)
                        .values(chunk)
                        .execute(conn)
                        .map_err(StorageError::QueryFailed)?;
                }
                Ok(total_upserted)
            })
            .await?;

        debug!("Upserted {} price bar(s) for {}", written, symbol);
        Ok(written)
    }

    fn summaries(&self) -> Result<Vec<CacheSummary>> {
        let mut conn = get_connection(&self.pool)?;

        let rows: Vec<(String, Option<String>, Option<String>, i64)> = price_bars_dsl::price_bars
            .group_by(price_bars_dsl::symbol)
            .select((
                price_bars_dsl::symbol,
                min(price_bars_dsl::date),
                max(price_bars_dsl::date),
                count_star(),
            ))
            .order(price_bars_dsl::symbol.asc())
            .load(&mut conn)
            .into_core()?;

        let mut summaries = Vec::with_capacity(rows.len());
        for (symbol, first, last, count) in rows {
            if let (Some(first), Some(last)) = (first, last) {
                summaries.push(CacheSummary {
                    symbol,
                    first_date: parse_date(&first)?,
                    last_date: parse_date(&last)?,
                    rows: usize::try_from(count).unwrap_or(0),
                });
            }
        }
        Ok(summaries)
    }
}
