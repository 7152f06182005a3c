//! CSV fixtures -> `FillRecord`s (used by `fills seed` and tests).
//!
//! Expected header: `timestamp,symbol,exchange,side,fill_price,fill_quantity`.
//! Rows with a negative price or quantity are rejected.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use fills_schemas::FillRecord;

pub fn read_fills_csv<R: Read>(reader: R) -> Result<Vec<FillRecord>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();
    for (i, rec) in rdr.deserialize::<FillRecord>().enumerate() {
        // header is line 1
        let line = i + 2;
        let fill = rec.with_context(|| format!("fills csv line {line}"))?;
        if fill.fill_price < 0.0 || fill.fill_quantity < 0.0 {
            bail!("fills csv line {line}: price and quantity must be non-negative");
        }
        out.push(fill);
    }
    Ok(out)
}

pub fn load_fills_csv(path: &Path) -> Result<Vec<FillRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("open fills csv: {}", path.display()))?;
    read_fills_csv(file)
}
