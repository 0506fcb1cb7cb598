use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{InsightsError, Result};
use crate::models::{RawMerchant, RawTransaction};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn file_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Header positions of the columns a loader needs, resolved by name.
struct Columns<'a> {
    table: &'a str,
    index: Vec<usize>,
}

impl<'a> Columns<'a> {
    fn resolve(table: &'a str, headers: &StringRecord, names: &[&str]) -> Result<Self> {
        let mut index = Vec::with_capacity(names.len());
        for name in names {
            let pos = headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| InsightsError::MissingColumn {
                    table: table.to_string(),
                    column: name.to_string(),
                })?;
            index.push(pos);
        }
        Ok(Self { table, index })
    }

    fn cell<'r>(&self, record: &'r StringRecord, i: usize) -> Option<&'r str> {
        record
            .get(self.index[i])
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn invalid(&self, record: &StringRecord, column: &str, i: usize) -> InsightsError {
        InsightsError::InvalidValue {
            table: self.table.to_string(),
            line: record.position().map(|p| p.line()).unwrap_or(0),
            column: column.to_string(),
            value: record.get(self.index[i]).unwrap_or("").to_string(),
        }
    }

    fn required_text(&self, record: &StringRecord, column: &str, i: usize) -> Result<String> {
        self.cell(record, i)
            .map(str::to_string)
            .ok_or_else(|| self.invalid(record, column, i))
    }

    fn optional_int(&self, record: &StringRecord, column: &str, i: usize) -> Result<Option<i64>> {
        match self.cell(record, i) {
            None => Ok(None),
            Some(s) => parse_int(s)
                .map(Some)
                .ok_or_else(|| self.invalid(record, column, i)),
        }
    }
}

/// Integers may arrive as "3" or "3.0" depending on the exporter.
fn parse_int(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    let in_range = (i64::MIN as f64..i64::MAX as f64).contains(&f);
    (in_range && f.fract() == 0.0).then_some(f as i64)
}

fn open_reader(file_path: &Path) -> Result<csv::Reader<std::io::BufReader<std::fs::File>>> {
    let file = std::fs::File::open(file_path)?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file)))
}

fn source_label(file_path: &Path) -> String {
    file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("input")
        .to_string()
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

pub fn load_transactions(file_path: &Path) -> Result<Vec<RawTransaction>> {
    let label = source_label(file_path);
    let mut rdr = open_reader(file_path)?;
    let cols = Columns::resolve(&label, rdr.headers()?, crate::db::RAW_TRANSACTION_COLUMNS)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let merchant_id = cols.required_text(&record, "merchant_id", 0)?;
        let purchase_amount = cols
            .cell(&record, 1)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .ok_or_else(|| cols.invalid(&record, "purchase_amount", 1))?;
        let purchase_date = cols
            .cell(&record, 2)
            .and_then(parse_timestamp)
            .ok_or_else(|| cols.invalid(&record, "purchase_date", 2))?;
        let category = cols.cell(&record, 3).map(str::to_string);
        let installments = cols.optional_int(&record, "installments", 4)?;
        rows.push(RawTransaction {
            merchant_id,
            purchase_amount,
            purchase_date,
            category,
            installments,
        });
    }
    info!(file = %file_path.display(), rows = rows.len(), "loaded transactions");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Merchants
// ---------------------------------------------------------------------------

pub fn load_merchants(file_path: &Path) -> Result<Vec<RawMerchant>> {
    let label = source_label(file_path);
    let mut rdr = open_reader(file_path)?;
    let cols = Columns::resolve(&label, rdr.headers()?, crate::db::RAW_MERCHANT_COLUMNS)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(RawMerchant {
            merchant_id: cols.required_text(&record, "merchant_id", 0)?,
            merchant_name: cols.cell(&record, 1).map(str::to_string),
            city_id: cols.optional_int(&record, "city_id", 2)?,
            state_id: cols.optional_int(&record, "state_id", 3)?,
        });
    }
    info!(file = %file_path.display(), rows = rows.len(), "loaded merchants");
    Ok(rows)
}
