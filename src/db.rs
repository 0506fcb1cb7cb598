use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::error::{InsightsError, Result};
use crate::models::{RawMerchant, RawTransaction, TIMESTAMP_FORMAT};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS raw_merchants (
    id INTEGER PRIMARY KEY,
    merchant_id TEXT NOT NULL,
    merchant_name TEXT,
    city_id INTEGER,
    state_id INTEGER
);

CREATE TABLE IF NOT EXISTS raw_transactions (
    id INTEGER PRIMARY KEY,
    merchant_id TEXT NOT NULL,
    purchase_amount REAL NOT NULL,
    purchase_date TEXT NOT NULL,
    category TEXT,
    installments INTEGER
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    merchant_id TEXT NOT NULL,
    merchant_name TEXT NOT NULL,
    city_id INTEGER,
    state_id INTEGER,
    category TEXT NOT NULL,
    purchase_date TEXT NOT NULL,
    purchase_amount REAL NOT NULL,
    installments INTEGER
);

CREATE INDEX IF NOT EXISTS idx_raw_merchants_merchant_id ON raw_merchants(merchant_id);
";

/// Columns every analysis reads from the canonical table.
pub const CANONICAL_COLUMNS: &[&str] = &[
    "merchant_id",
    "merchant_name",
    "city_id",
    "state_id",
    "category",
    "purchase_date",
    "purchase_amount",
    "installments",
];

pub const RAW_TRANSACTION_COLUMNS: &[&str] = &[
    "merchant_id",
    "purchase_amount",
    "purchase_date",
    "category",
    "installments",
];

pub const RAW_MERCHANT_COLUMNS: &[&str] = &["merchant_id", "merchant_name", "city_id", "state_id"];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    Ok(Connection::open_in_memory()?)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Drop all loaded and cleaned rows so the next clean starts from scratch.
pub fn reset_raw(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM transactions; DELETE FROM raw_transactions; DELETE FROM raw_merchants;",
    )?;
    Ok(())
}

pub fn insert_transactions(conn: &Connection, rows: &[RawTransaction]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO raw_transactions (merchant_id, purchase_amount, purchase_date, category, installments) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for row in rows {
            stmt.execute(rusqlite::params![
                row.merchant_id,
                row.purchase_amount,
                row.purchase_date.format(TIMESTAMP_FORMAT).to_string(),
                row.category,
                row.installments,
            ])?;
        }
    }
    tx.commit()?;
    debug!(rows = rows.len(), "inserted raw transactions");
    Ok(rows.len())
}

pub fn insert_merchants(conn: &Connection, rows: &[RawMerchant]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO raw_merchants (merchant_id, merchant_name, city_id, state_id) \
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for row in rows {
            stmt.execute(rusqlite::params![
                row.merchant_id,
                row.merchant_name,
                row.city_id,
                row.state_id,
            ])?;
        }
    }
    tx.commit()?;
    debug!(rows = rows.len(), "inserted raw merchants");
    Ok(rows.len())
}

/// Fail with `MissingColumn` unless `table` exists and has every column in `required`.
pub fn verify_columns(conn: &Connection, table: &str, required: &[&str]) -> Result<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let columns: Vec<String> = stmt
        .query_map([table], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if columns.is_empty() {
        return Err(InsightsError::Other(format!("table '{table}' does not exist")));
    }
    for col in required {
        if !columns.iter().any(|c| c == col) {
            return Err(InsightsError::MissingColumn {
                table: table.to_string(),
                column: col.to_string(),
            });
        }
    }
    Ok(())
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let n = conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |row| row.get(0))?;
    Ok(n)
}
