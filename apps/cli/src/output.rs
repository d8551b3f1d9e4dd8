//! Rendering of fetch results and cache status.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;

use tickerscope_core::prices::{AggregateResult, CacheSummary, FetchFailure, PriceTable};
use tickerscope_market_data::{DateRange, PriceBar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

const CSV_HEADER: [&str; 8] = [
    "symbol",
    "date",
    "open",
    "high",
    "low",
    "close",
    "adjusted_close",
    "volume",
];

#[derive(Serialize)]
struct FetchReport<'a> {
    range: Option<DateRange>,
    rows: &'a PriceTable,
    failures: Vec<&'a FetchFailure>,
}

pub fn write_result(out: &mut dyn Write, result: &AggregateResult, format: OutputFormat) -> Result<()> {
    let table = result.combined();
    match format {
        OutputFormat::Table => write_table(out, table.rows())?,
        OutputFormat::Csv => write_csv(out, table.rows())?,
        OutputFormat::Json => {
            let report = FetchReport {
                range: result.range(),
                rows: &table,
                failures: result.failures().collect(),
            };
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_table(out: &mut dyn Write, rows: &[PriceBar]) -> Result<()> {
    writeln!(
        out,
        "{:<10} {:<10} {:>12} {:>12} {:>12} {:>12} {:>12} {:>14}",
        "SYMBOL", "DATE", "OPEN", "HIGH", "LOW", "CLOSE", "ADJ CLOSE", "VOLUME"
    )?;
    for bar in rows {
        let adjusted = bar
            .adjusted_close
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:<10} {:<10} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12} {:>14}",
            bar.symbol, bar.date, bar.open, bar.high, bar.low, bar.close, adjusted, bar.volume
        )?;
    }
    Ok(())
}

fn write_csv(out: &mut dyn Write, rows: &[PriceBar]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADER)?;
    for bar in rows {
        writer.write_record([
            bar.symbol.clone(),
            bar.date.to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.adjusted_close.map(|v| v.to_string()).unwrap_or_default(),
            bar.volume.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_summaries(
    out: &mut dyn Write,
    summaries: &[CacheSummary],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, summaries)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["symbol", "first_date", "last_date", "rows"])?;
            for s in summaries {
                writer.write_record([
                    s.symbol.clone(),
                    s.first_date.to_string(),
                    s.last_date.to_string(),
                    s.rows.to_string(),
                ])?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => {
            if summaries.is_empty() {
                writeln!(out, "Cache is empty.")?;
                return Ok(());
            }
            writeln!(out, "{:<12} {:<10} {:<10} {:>8}", "SYMBOL", "FIRST", "LAST", "ROWS")?;
            for s in summaries {
                writeln!(
                    out,
                    "{:<12} {:<10} {:<10} {:>8}",
                    s.symbol, s.first_date, s.last_date, s.rows
                )?;
            }
        }
    }
    Ok(())
}
