//! CSV price history loader.
//!
//! Expects a header row with `timestamp` and `close` columns; any extra
//! columns are ignored.

use crate::domain::market::{MarketBar, MarketWindow};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

pub fn read_bars<R: Read>(reader: R) -> Result<MarketWindow> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut bars = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let bar: MarketBar = result.with_context(|| format!("Invalid bar record {}", line + 1))?;
        bars.push(bar);
    }
    MarketWindow::new(bars).context("Invalid price history")
}

pub fn load_bars(path: &Path) -> Result<MarketWindow> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let window = read_bars(BufReader::new(file))
        .with_context(|| format!("Failed to load bars from {}", path.display()))?;
    info!("Loaded {} bars from {}", window.len(), path.display());
    Ok(window)
}
