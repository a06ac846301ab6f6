//! Load an Excel workbook of refuel records into a normalized Polars table.
//!
//! Column names are lowercased and trimmed once here so everything downstream
//! can rely on fixed keys. `fecha` becomes `Datetime(Microseconds)`, the
//! numeric columns become `Float64`, `vehiculo` becomes `String`; cells that
//! fail to parse become null instead of failing the load.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use polars::datatypes::TimeUnit;
use polars::prelude::*;

/// Grouping key column (typically a license plate).
pub const VEHICLE: &str = "vehiculo";
/// Refuel timestamp column.
pub const DATE: &str = "fecha";
pub const FUEL_TYPE: &str = "tipo_combustible";
pub const VEHICLE_TYPE: &str = "tipo_vehiculo";
pub const ADDRESS: &str = "direccion";
pub const REFUELED: &str = "repostado";
pub const DISTANCE: &str = "distancia";
pub const CONSUMPTION: &str = "consumo";
pub const PRICE_PER_LITER: &str = "precio_litro";

/// Columns coerced to `Float64` when present.
pub const NUMERIC_COLUMNS: [&str; 4] = [REFUELED, DISTANCE, CONSUMPTION, PRICE_PER_LITER];

/// A failed load is fatal to the current session's data; per-cell parse
/// failures are not errors and become nulls instead.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The path does not resolve to a readable file.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The bytes are not a workbook this loader understands, or the sheet
    /// is missing a required header.
    #[error("malformed workbook: {0}")]
    Malformed(String),
}

/// The loaded record set. Immutable once constructed; filtering produces
/// derived frames and never touches this one.
///
/// Optional-column presence and the value domains the filter controls need
/// (distinct categories, date span, numeric bounds) are computed once here
/// rather than re-checked throughout the filtering logic.
#[derive(Debug)]
pub struct RefuelTable {
    df: DataFrame,
    fuel_types: Vec<String>,
    vehicle_types: Vec<String>,
    date_span: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl RefuelTable {
    /// Read a workbook from disk. The first worksheet is used unless `sheet`
    /// selects another by name or 0-based index.
    pub fn load(path: &Path, sheet: Option<&str>) -> Result<RefuelTable, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let mut workbook =
            open_workbook_auto(path).map_err(|e| LoadError::Malformed(e.to_string()))?;
        let range = match sheet {
            Some(sel) => {
                if let Ok(idx) = sel.parse::<usize>() {
                    workbook
                        .worksheet_range_at(idx)
                        .ok_or_else(|| LoadError::Malformed(format!("no sheet at index {}", idx)))?
                        .map_err(|e| LoadError::Malformed(e.to_string()))?
                } else {
                    workbook
                        .worksheet_range(sel)
                        .map_err(|e| LoadError::Malformed(e.to_string()))?
                }
            }
            None => workbook
                .worksheet_range_at(0)
                .ok_or_else(|| LoadError::Malformed("workbook has no worksheets".to_string()))?
                .map_err(|e| LoadError::Malformed(e.to_string()))?,
        };

        let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        if rows.is_empty() {
            return Err(LoadError::Malformed("worksheet is empty".to_string()));
        }

        let headers: Vec<String> = rows[0]
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let name = calamine::DataType::as_string(c).unwrap_or_default();
                let name = name.trim().to_lowercase();
                if name.is_empty() {
                    format!("column_{}", i + 1)
                } else {
                    name
                }
            })
            .collect();

        let mut columns = Vec::with_capacity(headers.len());
        for (col_idx, header) in headers.iter().enumerate() {
            let cells: Vec<Option<&Data>> = rows[1..].iter().map(|row| row.get(col_idx)).collect();
            let series = match header.as_str() {
                DATE => date_series_from_cells(header, &cells)
                    .map_err(|e| LoadError::Malformed(e.to_string()))?,
                VEHICLE => vehicle_series_from_cells(header, &cells),
                name if NUMERIC_COLUMNS.contains(&name) => {
                    numeric_series_from_cells(header, &cells)
                }
                _ => string_series_from_cells(header, &cells),
            };
            columns.push(series.into());
        }

        let df = DataFrame::new(columns).map_err(|e| LoadError::Malformed(e.to_string()))?;
        Self::from_dataframe(df)
    }

    /// Normalize an already-parsed frame into a `RefuelTable`: lowercase and
    /// trim column names, require `vehiculo` and `fecha`, coerce dtypes.
    /// This is the single cleaning path; the Excel reader funnels through it.
    pub fn from_dataframe(mut df: DataFrame) -> Result<RefuelTable, LoadError> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        for name in &names {
            let normalized = name.trim().to_lowercase();
            if normalized != *name {
                df.rename(name, normalized.into())
                    .map_err(|e| LoadError::Malformed(e.to_string()))?;
            }
        }

        for required in [VEHICLE, DATE] {
            if !has_column(&df, required) {
                return Err(LoadError::Malformed(format!(
                    "missing required column '{}'",
                    required
                )));
            }
        }

        coerce_date(&mut df).map_err(|e| LoadError::Malformed(e.to_string()))?;
        coerce_vehicle(&mut df).map_err(|e| LoadError::Malformed(e.to_string()))?;
        for name in NUMERIC_COLUMNS {
            if has_column(&df, name) {
                coerce_numeric(&mut df, name).map_err(|e| LoadError::Malformed(e.to_string()))?;
            }
        }

        let fuel_types =
            distinct_strings(&df, FUEL_TYPE).map_err(|e| LoadError::Malformed(e.to_string()))?;
        let vehicle_types =
            distinct_strings(&df, VEHICLE_TYPE).map_err(|e| LoadError::Malformed(e.to_string()))?;
        let date_span = date_span(&df).map_err(|e| LoadError::Malformed(e.to_string()))?;

        Ok(RefuelTable {
            df,
            fuel_types,
            vehicle_types,
            date_span,
        })
    }

    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        has_column(&self.df, name)
    }

    /// Distinct non-null fuel types, sorted. Empty when the column is absent.
    pub fn fuel_types(&self) -> &[String] {
        &self.fuel_types
    }

    /// Distinct non-null vehicle types, sorted. Empty when the column is absent.
    pub fn vehicle_types(&self) -> &[String] {
        &self.vehicle_types
    }

    /// Min and max of the non-null dates, if any row has one.
    pub fn date_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.date_span
    }

    /// Observed min/max of a numeric column, skipping nulls. `None` when the
    /// column is absent or all-null.
    pub fn numeric_bounds(&self, column: &str) -> Option<(f64, f64)> {
        let values = self.df.column(column).ok()?.f64().ok()?;
        match (values.min(), values.max()) {
            (Some(lo), Some(hi)) => Some((lo, hi)),
            _ => None,
        }
    }
}

pub(crate) fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Epoch microseconds for a naive timestamp, matching the table's
/// `Datetime(Microseconds)` representation.
pub fn timestamp_micros(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_micros()
}

/// Parses an ISO or day-first date/datetime string; tries FORMATS in order.
fn parse_naive_datetime_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_hms_opt(0, 0, 0).expect("midnight"));
        }
    }
    None
}

/// Converts a calamine cell to NaiveDateTime (Excel serial, DateTimeIso, or
/// parseable string).
fn excel_cell_to_naive_datetime(cell: &Data) -> Option<NaiveDateTime> {
    use calamine::DataType;
    if let Some(dt) = cell.as_datetime() {
        return Some(dt);
    }
    let s = cell.get_datetime_iso().or_else(|| cell.get_string())?;
    parse_naive_datetime_str(s)
}

fn date_series_from_cells(name: &str, cells: &[Option<&Data>]) -> PolarsResult<Series> {
    let v: Vec<Option<i64>> = cells
        .iter()
        .map(|c| {
            c.and_then(excel_cell_to_naive_datetime)
                .map(timestamp_micros)
        })
        .collect();
    Series::new(name.into(), v).cast(&DataType::Datetime(TimeUnit::Microseconds, None))
}

fn numeric_series_from_cells(name: &str, cells: &[Option<&Data>]) -> Series {
    use calamine::DataType;
    let v: Vec<Option<f64>> = cells
        .iter()
        .map(|c| {
            c.and_then(|cell| {
                cell.as_f64()
                    .or_else(|| cell.get_string().and_then(|s| s.trim().parse().ok()))
            })
        })
        .collect();
    Series::new(name.into(), v)
}

/// Vehicle ids render to their string form: plates typed as numbers in the
/// sheet must group and display identically to string plates.
fn vehicle_series_from_cells(name: &str, cells: &[Option<&Data>]) -> Series {
    use calamine::DataType;
    let v: Vec<Option<String>> = cells
        .iter()
        .map(|c| {
            c.and_then(|cell| match cell {
                Data::Int(i) => Some(i.to_string()),
                Data::Float(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
                _ => cell.as_string().map(|s| s.trim().to_string()),
            })
            .filter(|s| !s.is_empty())
        })
        .collect();
    Series::new(name.into(), v)
}

fn string_series_from_cells(name: &str, cells: &[Option<&Data>]) -> Series {
    use calamine::DataType;
    let v: Vec<Option<String>> = cells
        .iter()
        .map(|c| c.and_then(|cell| cell.as_string()))
        .collect();
    Series::new(name.into(), v)
}

fn coerce_date(df: &mut DataFrame) -> PolarsResult<()> {
    let col = df.column(DATE)?;
    let target = DataType::Datetime(TimeUnit::Microseconds, None);
    let series = match col.dtype() {
        DataType::Datetime(_, _) | DataType::Date => col.cast(&target)?,
        DataType::String => {
            let strings = col.str()?;
            let v: Vec<Option<i64>> = strings
                .iter()
                .map(|s| s.and_then(parse_naive_datetime_str).map(timestamp_micros))
                .collect();
            Series::new(DATE.into(), v).cast(&target)?.into()
        }
        // Anything else cannot carry a timestamp; coerce to all-null.
        _ => {
            let v: Vec<Option<i64>> = vec![None; df.height()];
            Series::new(DATE.into(), v).cast(&target)?.into()
        }
    };
    df.with_column(series.as_materialized_series().clone())?;
    Ok(())
}

fn coerce_vehicle(df: &mut DataFrame) -> PolarsResult<()> {
    let col = df.column(VEHICLE)?;
    if col.dtype() != &DataType::String {
        let series = col.cast(&DataType::String)?;
        df.with_column(series.as_materialized_series().clone())?;
    }
    Ok(())
}

fn coerce_numeric(df: &mut DataFrame, name: &str) -> PolarsResult<()> {
    let col = df.column(name)?;
    if col.dtype() != &DataType::Float64 {
        // Non-strict cast: unparsable strings become null, like the rest of
        // the per-cell coercion.
        let series = col.cast(&DataType::Float64)?;
        df.with_column(series.as_materialized_series().clone())?;
    }
    Ok(())
}

fn distinct_strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<String>> {
    if !has_column(df, name) {
        return Ok(Vec::new());
    }
    let values = df.column(name)?.str()?;
    let distinct: Vec<String> = values
        .iter()
        .flatten()
        .map(str::to_string)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    Ok(distinct)
}

fn date_span(df: &DataFrame) -> PolarsResult<Option<(NaiveDateTime, NaiveDateTime)>> {
    let micros = df.column(DATE)?.cast(&DataType::Int64)?;
    let micros = micros.i64()?;
    let span = match (micros.min(), micros.max()) {
        (Some(lo), Some(hi)) => {
            let lo = chrono::DateTime::from_timestamp_micros(lo).map(|dt| dt.naive_utc());
            let hi = chrono::DateTime::from_timestamp_micros(hi).map(|dt| dt.naive_utc());
            lo.zip(hi)
        }
        _ => None,
    };
    Ok(span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_df() -> DataFrame {
        df!(
            " Vehiculo " => &["A1", "A1", "B2"],
            "FECHA" => &["2024-01-01", "not a date", "2024-01-15 08:30:00"],
            "Tipo_Combustible" => &["diesel", "diesel", "petrol"],
            "Repostado" => &["40.5", "x", "30"],
            "distancia" => &[Some(500.0_f64), Some(480.0), None],
        )
        .unwrap()
    }

    #[test]
    fn normalizes_column_names() {
        let table = RefuelTable::from_dataframe(sample_df()).unwrap();
        let names: Vec<&str> = table
            .df()
            .get_column_names()
            .iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(
            names,
            vec![VEHICLE, DATE, FUEL_TYPE, REFUELED, DISTANCE]
        );
    }

    #[test]
    fn coerces_dates_with_bad_cells_to_null() {
        let table = RefuelTable::from_dataframe(sample_df()).unwrap();
        let dates = table.df().column(DATE).unwrap();
        assert_eq!(
            dates.dtype(),
            &DataType::Datetime(TimeUnit::Microseconds, None)
        );
        assert_eq!(dates.null_count(), 1);
        let span = table.date_span().unwrap();
        assert_eq!(span.0.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(span.1.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn coerces_numeric_strings_with_bad_cells_to_null() {
        let table = RefuelTable::from_dataframe(sample_df()).unwrap();
        let refueled = table.df().column(REFUELED).unwrap();
        assert_eq!(refueled.dtype(), &DataType::Float64);
        let values = refueled.f64().unwrap();
        assert_eq!(values.get(0), Some(40.5));
        assert_eq!(values.get(1), None);
        assert_eq!(values.get(2), Some(30.0));
    }

    #[test]
    fn day_first_dates_parse() {
        assert_eq!(
            parse_naive_datetime_str("31/01/2024"),
            NaiveDate::from_ymd_opt(2024, 1, 31)
                .unwrap()
                .and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_naive_datetime_str("never"), None);
    }

    #[test]
    fn distinct_categories_are_sorted() {
        let table = RefuelTable::from_dataframe(sample_df()).unwrap();
        assert_eq!(table.fuel_types(), &["diesel", "petrol"]);
        assert!(table.vehicle_types().is_empty());
    }

    #[test]
    fn numeric_bounds_skip_nulls() {
        let table = RefuelTable::from_dataframe(sample_df()).unwrap();
        assert_eq!(table.numeric_bounds(DISTANCE), Some((480.0, 500.0)));
        assert_eq!(table.numeric_bounds(CONSUMPTION), None);
    }

    #[test]
    fn missing_required_column_is_malformed() {
        let df = df!("fecha" => &["2024-01-01"]).unwrap();
        let err = RefuelTable::from_dataframe(df).unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = RefuelTable::load(Path::new("/no/such/refuels.xlsx"), None).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.xlsx");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"this is not a workbook").unwrap();
        let err = RefuelTable::load(&path, None).unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }

    #[test]
    fn vehicle_ids_become_strings() {
        let df = df!(
            "vehiculo" => &[1234_i64, 1234, 9876],
            "fecha" => &["2024-01-01", "2024-01-02", "2024-01-03"],
        )
        .unwrap();
        let table = RefuelTable::from_dataframe(df).unwrap();
        let vehicles = table.df().column(VEHICLE).unwrap();
        assert_eq!(vehicles.dtype(), &DataType::String);
        assert_eq!(vehicles.str().unwrap().get(0), Some("1234"));
    }
}
