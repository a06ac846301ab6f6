//! Write the current filtered row set to a CSV file.

use std::fs::File;
use std::path::Path;

use color_eyre::Result;
use polars::prelude::*;

/// Write `df` to `path` as UTF-8, comma-separated CSV with a header row.
/// All of the frame's (normalized) columns are written as-is.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    CsvWriter::new(file)
        .with_separator(b',')
        .include_header(true)
        .finish(df)?;
    Ok(())
}
