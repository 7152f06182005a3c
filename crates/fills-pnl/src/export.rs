//! Writers for computed series: per-row CSV breakdown and JSON documents.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{PnlSeries, TimestampMap};

pub const CSV_HEADER: &[&str] = &[
    "timestamp",
    "side",
    "fill_price",
    "fill_quantity",
    "prior_price_sum",
    "pnl",
    "cumulative_pnl",
];

#[derive(Serialize)]
struct CsvRow<'a> {
    timestamp: String,
    side: &'a str,
    fill_price: f64,
    fill_quantity: f64,
    prior_price_sum: f64,
    pnl: f64,
    cumulative_pnl: f64,
}

/// Write the per-row breakdown as CSV (header always present).
pub fn write_csv<W: Write>(series: &PnlSeries, w: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(w);
    wtr.write_record(CSV_HEADER).context("write csv header")?;
    for r in series.rows() {
        wtr.serialize(CsvRow {
            timestamp: r.timestamp.to_string(),
            side: r.side.as_str(),
            fill_price: r.fill_price,
            fill_quantity: r.fill_quantity,
            prior_price_sum: r.prior_price_sum,
            pnl: r.pnl,
            cumulative_pnl: r.cumulative_pnl,
        })
        .context("write csv row")?;
    }
    wtr.flush().context("flush csv")?;
    Ok(())
}

pub fn write_csv_path(series: &PnlSeries, path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("create csv export failed: {}", path.display()))?;
    write_csv(series, file)
}

#[derive(Serialize)]
struct JsonSeries<'a> {
    points: &'a [fills_schemas::PnlPoint],
    final_pnl: Option<f64>,
}

/// Full ordered list: `{"points": [...], "final_pnl": x}`.
pub fn to_json_list(series: &PnlSeries) -> Result<String> {
    let points = series.points();
    serde_json::to_string_pretty(&JsonSeries {
        points: &points,
        final_pnl: series.final_pnl(),
    })
    .context("serialize pnl series failed")
}

/// Timestamp-keyed object, one key per distinct timestamp.
pub fn to_json_object(series: &PnlSeries) -> Result<String> {
    let points = series.last_per_timestamp();
    serde_json::to_string(&TimestampMap(&points)).context("serialize pnl map failed")
}
