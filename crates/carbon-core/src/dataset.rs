//! Cleaning of raw supply-chain emission-factor tables.
//!
//! Source columns are renamed to the canonical schema, values are coerced to
//! their types, exact duplicates are dropped (first occurrence wins), and rows
//! with a negative emission factor are removed.

use crate::error::{CarbonError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Year assigned when the source table has no `year` column.
pub const DEFAULT_YEAR: i32 = 2022;

const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("2017 NAICS Code", "naics_code"),
    ("2017 NAICS Title", "industry"),
    ("Supply Chain Emission Factors with Margins", "emission_factor"),
    ("Unit", "unit"),
    ("Reference USEEIO Code", "reference_code"),
];

const NAICS_CODE: &str = "naics_code";
const INDUSTRY: &str = "industry";
const EMISSION_FACTOR: &str = "emission_factor";
const UNIT: &str = "unit";
const YEAR: &str = "year";
const REFERENCE_CODE: &str = "reference_code";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub naics_code: String,
    pub industry: String,
    /// kg CO2e per unit.
    pub emission_factor: f64,
    pub unit: String,
    pub year: i32,
    pub reference_code: String,
}

impl EmissionRecord {
    fn dedup_key(&self) -> (&str, &str, u64, &str, i32, &str) {
        (
            &self.naics_code,
            &self.industry,
            self.emission_factor.to_bits(),
            &self.unit,
            self.year,
            &self.reference_code,
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    pub records: Vec<EmissionRecord>,
    pub rows_read: usize,
    pub duplicates_dropped: usize,
    pub negatives_dropped: usize,
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

fn canonical_name(header: &str) -> &str {
    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == header)
        .map(|(_, name)| *name)
        .unwrap_or(header)
}

struct Columns {
    naics_code: usize,
    industry: usize,
    emission_factor: usize,
    unit: usize,
    year: Option<usize>,
    reference_code: usize,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            index.entry(canonical_name(header)).or_insert(i);
        }
        let require = |name: &str| {
            index
                .get(name)
                .copied()
                .ok_or_else(|| CarbonError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            naics_code: require(NAICS_CODE)?,
            industry: require(INDUSTRY)?,
            emission_factor: require(EMISSION_FACTOR)?,
            unit: require(UNIT)?,
            year: index.get(YEAR).copied(),
            reference_code: require(REFERENCE_CODE)?,
        })
    }

    /// Fields of source columns that do not map onto an [`EmissionRecord`].
    fn extras<'r>(&self, record: &'r csv::StringRecord) -> Vec<&'r str> {
        let mapped = [
            Some(self.naics_code),
            Some(self.industry),
            Some(self.emission_factor),
            Some(self.unit),
            self.year,
            Some(self.reference_code),
        ];
        record
            .iter()
            .enumerate()
            .filter(|(i, _)| !mapped.contains(&Some(*i)))
            .map(|(_, field)| field)
            .collect()
    }

    fn parse(&self, row: usize, record: &csv::StringRecord) -> Result<EmissionRecord> {
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let invalid = |column: &str, value: &str| CarbonError::InvalidField {
            row,
            column: column.to_string(),
            value: value.to_string(),
        };

        let raw_factor = field(self.emission_factor);
        let emission_factor = raw_factor
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(EMISSION_FACTOR, raw_factor))?;

        let year = match self.year {
            Some(idx) => {
                let raw_year = field(idx);
                raw_year
                    .parse::<i32>()
                    .map_err(|_| invalid(YEAR, raw_year))?
            }
            None => DEFAULT_YEAR,
        };

        Ok(EmissionRecord {
            naics_code: field(self.naics_code).to_string(),
            industry: field(self.industry).to_string(),
            emission_factor,
            unit: field(self.unit).to_string(),
            year,
            reference_code: field(self.reference_code).to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

pub fn clean_reader<R: std::io::Read>(reader: R) -> Result<CleanReport> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let columns = Columns::resolve(rdr.headers()?)?;

    let mut report = CleanReport::default();
    let mut parsed = Vec::new();
    for (i, raw) in rdr.records().enumerate() {
        let raw = raw?;
        let record = columns.parse(i + 1, &raw)?;
        parsed.push((record, raw));
        report.rows_read += 1;
    }

    // Whole rows are compared, including source columns the output drops.
    let mut seen = HashSet::with_capacity(parsed.len());
    let mut unique = Vec::with_capacity(parsed.len());
    for (record, raw) in &parsed {
        if seen.insert((record.dedup_key(), columns.extras(raw))) {
            unique.push(record);
        } else {
            report.duplicates_dropped += 1;
        }
    }

    for record in unique {
        if record.emission_factor < 0.0 {
            report.negatives_dropped += 1;
        } else {
            report.records.push(record.clone());
        }
    }

    tracing::info!(
        rows = report.rows_read,
        kept = report.records.len(),
        duplicates = report.duplicates_dropped,
        negatives = report.negatives_dropped,
        "cleaned emission factor table"
    );
    Ok(report)
}

pub fn clean_file(path: &Path) -> Result<CleanReport> {
    let file = std::fs::File::open(path)?;
    clean_reader(file)
}

pub fn write_records(path: &Path, records: &[EmissionRecord]) -> Result<()> {
    crate::io::write_csv(path, records)
}

pub fn load_records(path: &Path) -> Result<Vec<EmissionRecord>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in rdr.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RAW: &str = "\
2017 NAICS Code,2017 NAICS Title,GHG,Unit,Supply Chain Emission Factors with Margins,Reference USEEIO Code
111110,Soybean Farming,All GHGs,kg CO2e/2022 USD,0.9,1111A0
221100,Electric Power Generation,All GHGs,kg CO2e/2022 USD,3.2,221100
221100,Electric Power Generation,All GHGs,kg CO2e/2022 USD,3.2,221100
325110,Petrochemical Manufacturing,All GHGs,kg CO2e/2022 USD,-0.4,325110
";

    #[test]
    fn renames_dedups_and_drops_negatives() {
        let report = clean_reader(RAW.as_bytes()).unwrap();
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.duplicates_dropped, 1);
        assert_eq!(report.negatives_dropped, 1);
        assert_eq!(report.records.len(), 2);
        let first = &report.records[0];
        assert_eq!(first.naics_code, "111110");
        assert_eq!(first.industry, "Soybean Farming");
        assert_eq!(first.emission_factor, 0.9);
        assert_eq!(first.reference_code, "1111A0");
        assert_eq!(first.year, DEFAULT_YEAR);
    }

    #[test]
    fn rows_differing_only_in_unmapped_columns_are_kept() {
        let csv = "\
2017 NAICS Code,2017 NAICS Title,GHG,Unit,Supply Chain Emission Factors with Margins,Reference USEEIO Code
221100,Electric Power Generation,CO2,kg CO2e/2022 USD,3.2,221100
221100,Electric Power Generation,CH4,kg CO2e/2022 USD,3.2,221100
221100,Electric Power Generation,CH4,kg CO2e/2022 USD,3.2,221100
";
        let report = clean_reader(csv.as_bytes()).unwrap();
        assert_eq!(report.duplicates_dropped, 1);
        assert_eq!(report.records.len(), 2);
    }

    #[test]
    fn canonical_headers_accepted_with_year() {
        let csv = "naics_code,industry,emission_factor,unit,year,reference_code\n\
                   111110,Soybean Farming,0.5,kg,2019,X\n";
        let report = clean_reader(csv.as_bytes()).unwrap();
        assert_eq!(report.records[0].year, 2019);
    }

    #[test]
    fn missing_column_reported() {
        let csv = "naics_code,industry,unit,reference_code\n1,a,kg,r\n";
        let err = clean_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CarbonError::MissingColumn(ref c) if c == "emission_factor"));
    }

    #[test]
    fn unparsable_factor_reported_with_row() {
        let csv = "naics_code,industry,emission_factor,unit,reference_code\n\
                   1,a,0.1,kg,r\n\
                   2,b,lots,kg,r\n";
        let err = clean_reader(csv.as_bytes()).unwrap_err();
        match err {
            CarbonError::InvalidField { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "emission_factor");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_factor_rejected() {
        let csv = "naics_code,industry,emission_factor,unit,reference_code\n1,a,NaN,kg,r\n";
        assert!(matches!(
            clean_reader(csv.as_bytes()).unwrap_err(),
            CarbonError::InvalidField { .. }
        ));
    }

    #[test]
    fn write_then_load_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data/processed/cleaned.csv");
        let report = clean_reader(RAW.as_bytes()).unwrap();
        write_records(&path, &report.records).unwrap();
        let loaded = load_records(&path).unwrap();
        assert_eq!(loaded, report.records);
    }
}
