//! Filter engine: compose the active criteria into one Polars filter pass and
//! summarize the surviving rows per vehicle.

use std::collections::HashMap;

use chrono::NaiveDate;
use color_eyre::Result;
use polars::prelude::*;

use crate::loader::{
    has_column, timestamp_micros, RefuelTable, ADDRESS, CONSUMPTION, DATE, DISTANCE, FUEL_TYPE,
    REFUELED, VEHICLE, VEHICLE_TYPE,
};

/// Numeric column selectable for range filtering and distribution charting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeParameter {
    Refueled,
    Distance,
    Consumption,
}

impl RangeParameter {
    pub const ALL: [Self; 3] = [Self::Refueled, Self::Distance, Self::Consumption];

    pub fn column(self) -> &'static str {
        match self {
            Self::Refueled => REFUELED,
            Self::Distance => DISTANCE,
            Self::Consumption => CONSUMPTION,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Refueled => "Refueled",
            Self::Distance => "Distance",
            Self::Consumption => "Consumption",
        }
    }
}

/// A complete description of one filter-apply action. Built fresh from the
/// UI state on every apply; empty/absent fields impose no restriction.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub fuel_types: Vec<String>,
    pub vehicle_types: Vec<String>,
    pub location_substring: Option<String>,
    pub parameter: Option<RangeParameter>,
    pub value_range: Option<(f64, f64)>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
}

/// One row of the grouped summary. A null vehicle id forms its own group.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSummary {
    pub vehicle: Option<String>,
    pub vehicle_type: Option<String>,
    pub fuel_type: Option<String>,
    pub refuel_count: usize,
}

/// The two derived views of one apply action.
pub struct FilterOutcome {
    pub filtered: DataFrame,
    pub summary: Vec<VehicleSummary>,
}

/// Apply `criteria` to the table: AND of all supplied predicates, then a
/// per-vehicle summary of the surviving rows. Pure function of its inputs.
pub fn apply(table: &RefuelTable, criteria: &FilterCriteria) -> Result<FilterOutcome> {
    let filtered = match criteria_expr(table.df(), criteria) {
        Some(predicate) => table.df().clone().lazy().filter(predicate).collect()?,
        None => table.df().clone(),
    };
    let summary = summarize(&filtered)?;
    Ok(FilterOutcome { filtered, summary })
}

/// Rows of one vehicle group from the filtered set, sorted ascending by date
/// (the order the chart builder expects). `None` selects the null-id group.
pub fn vehicle_detail(filtered: &DataFrame, vehicle: Option<&str>) -> Result<DataFrame> {
    let predicate = match vehicle {
        Some(id) => col(VEHICLE).eq(lit(id)),
        None => col(VEHICLE).is_null(),
    };
    let detail = filtered
        .clone()
        .lazy()
        .filter(predicate)
        .sort_by_exprs([col(DATE)], Default::default())
        .collect()?;
    Ok(detail)
}

/// The combined predicate, or `None` when no criterion restricts anything.
/// Reference order: fuel types, vehicle types, location, date bounds, range.
fn criteria_expr(df: &DataFrame, criteria: &FilterCriteria) -> Option<Expr> {
    let mut combined: Option<Expr> = None;

    if has_column(df, FUEL_TYPE) {
        if let Some(e) = membership_expr(FUEL_TYPE, &criteria.fuel_types) {
            combined = and_with(combined, e);
        }
    }
    if has_column(df, VEHICLE_TYPE) {
        if let Some(e) = membership_expr(VEHICLE_TYPE, &criteria.vehicle_types) {
            combined = and_with(combined, e);
        }
    }

    let needle = criteria
        .location_substring
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(needle) = needle {
        if has_column(df, ADDRESS) {
            // Null addresses compare to null and drop out of the filter,
            // which is the required "never passes" behavior.
            let e = col(ADDRESS)
                .str()
                .to_lowercase()
                .str()
                .contains_literal(lit(needle.to_lowercase()));
            combined = and_with(combined, e);
        }
    }

    if let Some(start) = criteria.date_start {
        let micros = timestamp_micros(start.and_hms_opt(0, 0, 0).expect("midnight"));
        combined = and_with(combined, date_micros_expr().gt_eq(lit(micros)));
    }
    if let Some(end) = criteria.date_end {
        let micros = timestamp_micros(end.and_hms_opt(0, 0, 0).expect("midnight"));
        combined = and_with(combined, date_micros_expr().lt_eq(lit(micros)));
    }

    if let (Some(parameter), Some((low, high))) = (criteria.parameter, criteria.value_range) {
        // Selecting a parameter whose column is absent is a documented no-op.
        if has_column(df, parameter.column()) {
            let value = col(parameter.column());
            let e = value.clone().gt_eq(lit(low)).and(value.lt_eq(lit(high)));
            combined = and_with(combined, e);
        }
    }

    combined
}

fn and_with(acc: Option<Expr>, e: Expr) -> Option<Expr> {
    Some(match acc {
        Some(current) => current.and(e),
        None => e,
    })
}

/// OR-fold of equality against each allowed value; empty set means no
/// restriction (`None`), not "match nothing".
fn membership_expr(column: &str, values: &[String]) -> Option<Expr> {
    values
        .iter()
        .map(|v| col(column).eq(lit(v.as_str())))
        .reduce(|a, b| a.or(b))
}

fn date_micros_expr() -> Expr {
    col(DATE).cast(DataType::Int64)
}

/// Group the filtered rows by vehicle in one pass over the frame's current
/// row order: first-seen vehicle/fuel type per group, then a stable sort by
/// count descending so ties keep first-seen order.
fn summarize(df: &DataFrame) -> Result<Vec<VehicleSummary>> {
    let vehicles = df.column(VEHICLE)?.str()?;
    let vehicle_types = match has_column(df, VEHICLE_TYPE) {
        true => Some(df.column(VEHICLE_TYPE)?.str()?),
        false => None,
    };
    let fuel_types = match has_column(df, FUEL_TYPE) {
        true => Some(df.column(FUEL_TYPE)?.str()?),
        false => None,
    };

    let mut groups: Vec<VehicleSummary> = Vec::new();
    let mut index: HashMap<Option<String>, usize> = HashMap::new();
    for i in 0..df.height() {
        let key = vehicles.get(i).map(str::to_string);
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = groups.len();
                groups.push(VehicleSummary {
                    vehicle: key.clone(),
                    vehicle_type: vehicle_types.and_then(|c| c.get(i)).map(str::to_string),
                    fuel_type: fuel_types.and_then(|c| c.get(i)).map(str::to_string),
                    refuel_count: 0,
                });
                index.insert(key, slot);
                slot
            }
        };
        groups[slot].refuel_count += 1;
    }

    groups.sort_by_key(|g| std::cmp::Reverse(g.refuel_count));
    Ok(groups)
}
