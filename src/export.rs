use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;

/// Write result rows to a CSV file with a header row. Fields serialize under
/// their result column names and `None` becomes an empty cell. An empty
/// result still gets a header when `headers` is provided.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T], headers: &[&str]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!rows.is_empty())
        .from_path(path)?;
    if rows.is_empty() {
        wtr.write_record(headers)?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = rows.len(), "wrote results");
    Ok(())
}

pub const TOP_MERCHANT_HEADERS: &[&str] =
    &["month", "city_id", "merchant_name", "purchase_total", "no_of_sales"];
pub const AVERAGE_SALE_HEADERS: &[&str] = &["merchant_name", "state_id", "average_amount"];
pub const PEAK_HOUR_HEADERS: &[&str] = &["category", "hour"];
pub const POPULAR_MERCHANT_HEADERS: &[&str] =
    &["merchant_name", "city_id", "transaction_count", "rank"];
pub const DOMINANT_CATEGORY_HEADERS: &[&str] =
    &["city_id", "dominant_category", "category_transactions"];
pub const CITY_PERFORMANCE_HEADERS: &[&str] =
    &["city_id", "total_sales", "transaction_count", "avg_transaction_value"];
pub const CATEGORY_PERFORMANCE_HEADERS: &[&str] =
    &["category", "total_sales", "transaction_count", "avg_transaction_value"];
pub const MONTHLY_TREND_HEADERS: &[&str] = &["year", "month", "total_sales", "transaction_count"];
pub const HOURLY_PATTERN_HEADERS: &[&str] = &["hour", "total_sales", "transaction_count"];
pub const INSTALLMENT_HEADERS: &[&str] = &[
    "installments",
    "avg_purchase_amount",
    "transaction_count",
    "gross_profit",
    "expected_default_loss",
    "net_profit",
    "profit_margin_pct",
];
