use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CleaningError, Result};

pub const PRICE_COLUMN: &str = "price";
pub const LONGITUDE_COLUMN: &str = "longitude";
pub const LATITUDE_COLUMN: &str = "latitude";

pub const REQUIRED_COLUMNS: [&str; 3] = [PRICE_COLUMN, LONGITUDE_COLUMN, LATITUDE_COLUMN];

/// Bounding box around New York City. Listings outside it are geocoding errors.
pub const NYC_BOUNDS: GeoBounds = GeoBounds {
    min_longitude: -74.25,
    max_longitude: -73.50,
    min_latitude: 40.5,
    max_latitude: 41.2,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn predicate(&self) -> Expr {
        between(PRICE_COLUMN, self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
}

impl GeoBounds {
    pub fn predicate(&self) -> Expr {
        between(LONGITUDE_COLUMN, self.min_longitude, self.max_longitude)
            .and(between(LATITUDE_COLUMN, self.min_latitude, self.max_latitude))
    }
}

/// Row counts before and after each filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub after_price_filter: usize,
    pub after_geo_filter: usize,
    pub dropped_price: usize,
    pub dropped_geo: usize,
}

impl CleaningReport {
    pub fn kept_rows(&self) -> usize {
        self.after_geo_filter
    }
}

// Inclusive on both ends. Nulls compare as null and the row is dropped; a value
// that is not a number fails the strict cast.
fn between(column: &str, min: f64, max: f64) -> Expr {
    let value = col(column).strict_cast(DataType::Float64);
    value.clone().gt_eq(lit(min)).and(value.lt_eq(lit(max)))
}

pub fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    match columns
        .iter()
        .find(|name| df.get_column_index(name).is_none())
    {
        Some(missing) => Err(CleaningError::MissingColumn(missing.to_string())),
        None => Ok(()),
    }
}

/// Fails if any non-empty cell in `columns` is not a number, whichever filter
/// would have dropped its row.
pub fn require_numeric(df: &DataFrame, columns: &[&str]) -> Result<()> {
    let casts: Vec<Expr> = columns
        .iter()
        .map(|name| col(*name).strict_cast(DataType::Float64))
        .collect();
    df.clone().lazy().select(casts).collect()?;
    Ok(())
}

/// Drops price outliers, then rows outside `geo`. Surviving rows keep their order
/// and their values; no column is added or removed.
pub fn apply_outlier_filters(
    df: DataFrame,
    price: PriceRange,
    geo: GeoBounds,
) -> Result<(DataFrame, CleaningReport)> {
    require_columns(&df, &REQUIRED_COLUMNS)?;
    require_numeric(&df, &REQUIRED_COLUMNS)?;
    let input_rows = df.height();

    let priced = df.lazy().filter(price.predicate()).collect()?;
    let after_price_filter = priced.height();

    let located = priced.lazy().filter(geo.predicate()).collect()?;
    let after_geo_filter = located.height();

    let report = CleaningReport {
        input_rows,
        after_price_filter,
        after_geo_filter,
        dropped_price: input_rows - after_price_filter,
        dropped_geo: after_price_filter - after_geo_filter,
    };

    Ok((located, report))
}
