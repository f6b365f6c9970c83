use crate::error::{CarbonError, Result};
use std::path::Path;

/// Column holding the point forecast in the forecasting collaborator's output.
pub const FORECAST_COLUMN: &str = "yhat";

/// Read a forecast table and return its last `yhat` value, the furthest
/// projected year, as the baseline emissions.
pub fn load_forecast_baseline(path: &Path) -> Result<f64> {
    let file = std::fs::File::open(path)?;
    forecast_baseline_from_reader(file)
}

pub fn forecast_baseline_from_reader<R: std::io::Read>(reader: R) -> Result<f64> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let column = rdr
        .headers()?
        .iter()
        .position(|h| h == FORECAST_COLUMN)
        .ok_or_else(|| CarbonError::MissingColumn(FORECAST_COLUMN.to_string()))?;

    let mut last = None;
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        last = Some((i + 1, record.get(column).unwrap_or("").to_string()));
    }
    let (row, raw) = last.ok_or(CarbonError::EmptyForecast)?;

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(CarbonError::InvalidField {
            row,
            column: FORECAST_COLUMN.to_string(),
            value: raw,
        }),
    }
}
