use std::sync::Arc;

use fueltui::export::write_csv;
use fueltui::filter::{self, FilterCriteria};
use fueltui::loader::RefuelTable;
use polars::prelude::*;

fn read_csv(path: &std::path::Path) -> DataFrame {
    let pl_path = PlPath::Local(Arc::from(path));
    LazyCsvReader::new(pl_path).finish().unwrap().collect().unwrap()
}

#[test]
fn exported_filtered_set_round_trips() {
    let df = df!(
        "vehiculo" => &["A1", "A1", "B2"],
        "fecha" => &["2024-01-01", "2024-02-01", "2024-01-15"],
        "tipo_combustible" => &["diesel", "diesel", "petrol"],
        "repostado" => &[40.0_f64, 38.0, 30.0],
        "direccion" => &["Calle Mayor 1", "Calle Mayor 1", "Av. Sol 9"],
    )
    .unwrap();
    let table = RefuelTable::from_dataframe(df).unwrap();
    let criteria = FilterCriteria {
        fuel_types: vec!["diesel".to_string()],
        ..Default::default()
    };
    let outcome = filter::apply(&table, &criteria).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("filtered.csv");
    let mut filtered = outcome.filtered.clone();
    write_csv(&mut filtered, &path).unwrap();

    let read_back = read_csv(&path);
    assert_eq!(read_back.height(), outcome.filtered.height());

    // All normalized column names survive the export.
    let names: Vec<String> = read_back
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(
        names,
        vec!["vehiculo", "fecha", "tipo_combustible", "repostado", "direccion"]
    );

    let vehicles = read_back.column("vehiculo").unwrap();
    let vehicles = vehicles.str().unwrap();
    assert_eq!(vehicles.get(0), Some("A1"));
    assert_eq!(vehicles.get(1), Some("A1"));

    let refueled = read_back.column("repostado").unwrap();
    let refueled = refueled.cast(&DataType::Float64).unwrap();
    let refueled = refueled.f64().unwrap();
    assert_eq!(refueled.get(0), Some(40.0));
    assert_eq!(refueled.get(1), Some(38.0));
}

#[test]
fn reloading_the_export_preserves_row_count_and_values() {
    let df = df!(
        "vehiculo" => &["A1", "B2"],
        "fecha" => &["2024-01-01", "2024-01-15"],
        "repostado" => &[40.0_f64, 30.0],
    )
    .unwrap();
    let table = RefuelTable::from_dataframe(df).unwrap();
    let outcome = filter::apply(&table, &FilterCriteria::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all.csv");
    let mut filtered = outcome.filtered.clone();
    write_csv(&mut filtered, &path).unwrap();

    // Re-ingest through the same cleaning path the loader applies.
    let reloaded = RefuelTable::from_dataframe(read_csv(&path)).unwrap();
    assert_eq!(reloaded.height(), table.height());
    let reread = filter::apply(&reloaded, &FilterCriteria::default()).unwrap();
    assert_eq!(reread.summary.len(), outcome.summary.len());
    for (a, b) in reread.summary.iter().zip(&outcome.summary) {
        assert_eq!(a.vehicle, b.vehicle);
        assert_eq!(a.refuel_count, b.refuel_count);
    }
}
