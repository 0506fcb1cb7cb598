use rusqlite::Connection;
use tracing::info;

use crate::error::{InsightsError, Result};
use crate::models::{CanonicalTransaction, TIMESTAMP_FORMAT, UNKNOWN_CATEGORY};

#[derive(Debug, Clone, PartialEq)]
pub struct CleanSummary {
    pub raw_transactions: i64,
    pub cleaned: i64,
    pub unmatched_merchants: i64,
}

/// Rebuild the canonical `transactions` table from the raw tables.
///
/// Transactions drive a left join against merchants; each merchant_id resolves
/// to its first loaded merchant record so duplicated merchant ids never
/// multiply transactions. A missing or blank merchant name falls back to the
/// merchant_id and a missing or blank category to `"Unknown category"`.
/// Nothing else is validated or dropped.
pub fn clean(conn: &Connection) -> Result<CleanSummary> {
    crate::db::verify_columns(conn, "raw_transactions", crate::db::RAW_TRANSACTION_COLUMNS)?;
    crate::db::verify_columns(conn, "raw_merchants", crate::db::RAW_MERCHANT_COLUMNS)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM transactions", [])?;
    let cleaned = tx.execute(
        "INSERT INTO transactions \
         (id, merchant_id, merchant_name, city_id, state_id, category, purchase_date, purchase_amount, installments) \
         SELECT t.id, t.merchant_id, COALESCE(NULLIF(TRIM(m.merchant_name), ''), t.merchant_id), m.city_id, m.state_id, \
                COALESCE(NULLIF(TRIM(t.category), ''), ?1), t.purchase_date, t.purchase_amount, t.installments \
         FROM raw_transactions t \
         LEFT JOIN raw_merchants m ON m.id = ( \
             SELECT MIN(rm.id) FROM raw_merchants rm WHERE rm.merchant_id = t.merchant_id \
         ) \
         ORDER BY t.id",
        [UNKNOWN_CATEGORY],
    )?;
    let unmatched: i64 = tx.query_row(
        "SELECT count(*) FROM raw_transactions t \
         WHERE NOT EXISTS (SELECT 1 FROM raw_merchants m WHERE m.merchant_id = t.merchant_id)",
        [],
        |row| row.get(0),
    )?;
    tx.commit()?;

    let raw = crate::db::count_rows(conn, "raw_transactions")?;
    info!(rows = cleaned, unmatched_merchants = unmatched, "cleaned transactions");
    Ok(CleanSummary {
        raw_transactions: raw,
        cleaned: cleaned as i64,
        unmatched_merchants: unmatched,
    })
}

pub fn canonical_rows(conn: &Connection) -> Result<Vec<CanonicalTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT merchant_id, merchant_name, city_id, state_id, category, purchase_date, \
         purchase_amount, installments FROM transactions ORDER BY id",
    )?;
    let raw: Vec<(String, String, Option<i64>, Option<i64>, String, String, f64, Option<i64>)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(merchant_id, merchant_name, city_id, state_id, category, date, amount, installments)| {
            let purchase_date = chrono::NaiveDateTime::parse_from_str(&date, TIMESTAMP_FORMAT)
                .map_err(|_| InsightsError::InvalidValue {
                    table: "transactions".into(),
                    line: 0,
                    column: "purchase_date".into(),
                    value: date.clone(),
                })?;
            Ok(CanonicalTransaction {
                merchant_id,
                merchant_name,
                city_id,
                state_id,
                category,
                purchase_date,
                purchase_amount: amount,
                installments,
            })
        })
        .collect()
}

pub struct CleanedStats {
    pub total_records: i64,
    pub unique_merchants: i64,
    pub unique_cities: i64,
    pub unique_states: i64,
    pub unique_categories: i64,
}

/// Distinct counts over the canonical table. NULL city/state ids count as one value.
pub fn summarize(conn: &Connection) -> Result<CleanedStats> {
    let stats = conn.query_row(
        "SELECT count(*), \
         count(DISTINCT merchant_id), \
         (SELECT count(*) FROM (SELECT DISTINCT city_id FROM transactions)), \
         (SELECT count(*) FROM (SELECT DISTINCT state_id FROM transactions)), \
         count(DISTINCT category) \
         FROM transactions",
        [],
        |row| {
            Ok(CleanedStats {
                total_records: row.get(0)?,
                unique_merchants: row.get(1)?,
                unique_cities: row.get(2)?,
                unique_states: row.get(3)?,
                unique_categories: row.get(4)?,
            })
        },
    )?;
    Ok(stats)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::{init_db, insert_merchants, insert_transactions, open_in_memory};
    use crate::models::{RawMerchant, RawTransaction};
    use chrono::{NaiveDate, NaiveDateTime};

    pub(crate) fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    pub(crate) fn txn(
        merchant_id: &str,
        amount: f64,
        date: NaiveDateTime,
        category: Option<&str>,
        installments: Option<i64>,
    ) -> RawTransaction {
        RawTransaction {
            merchant_id: merchant_id.into(),
            purchase_amount: amount,
            purchase_date: date,
            category: category.map(String::from),
            installments,
        }
    }

    pub(crate) fn merchant(id: &str, name: Option<&str>, city: i64, state: i64) -> RawMerchant {
        RawMerchant {
            merchant_id: id.into(),
            merchant_name: name.map(String::from),
            city_id: Some(city),
            state_id: Some(state),
        }
    }

    /// Clean the given rows in a fresh in-memory engine.
    pub(crate) fn cleaned_db(txns: &[RawTransaction], merchants: &[RawMerchant]) -> Connection {
        let conn = open_in_memory().unwrap();
        init_db(&conn).unwrap();
        insert_transactions(&conn, txns).unwrap();
        insert_merchants(&conn, merchants).unwrap();
        clean(&conn).unwrap();
        conn
    }

    pub(crate) fn sample_merchants() -> Vec<RawMerchant> {
        vec![
            merchant("M001", Some("Merchant A"), 1, 10),
            merchant("M002", Some("Merchant B"), 2, 20),
            merchant("M003", Some("Merchant C"), 1, 10),
            merchant("M004", None, 3, 30),
        ]
    }

    pub(crate) fn sample_transactions() -> Vec<RawTransaction> {
        vec![
            txn("M001", 1000.0, at(2023, 1, 15, 14, 30), Some("Electronics"), Some(1)),
            txn("M001", 2000.0, at(2023, 1, 20, 15, 45), Some("Electronics"), Some(2)),
            txn("M002", 500.0, at(2023, 2, 10, 10, 15), None, Some(1)),
            txn("M003", 1500.0, at(2023, 1, 25, 16, 20), Some("Fashion"), Some(3)),
            txn("M004", 3000.0, at(2023, 2, 5, 14, 0), Some("Home"), Some(1)),
            txn("M005", 750.0, at(2023, 1, 30, 11, 30), Some("Sports"), Some(1)),
        ]
    }

    #[test]
    fn test_clean_single_match() {
        let conn = cleaned_db(
            &[txn("M001", 100.0, at(2023, 1, 15, 10, 0), Some("Electronics"), Some(1))],
            &[merchant("M001", Some("Acme"), 1, 10)],
        );
        let rows = canonical_rows(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].merchant_name, "Acme");
        assert_eq!(rows[0].category, "Electronics");
        assert_eq!(rows[0].city_id, Some(1));
        assert_eq!(rows[0].state_id, Some(10));
        assert_eq!(rows[0].purchase_date, at(2023, 1, 15, 10, 0));
    }

    #[test]
    fn test_clean_unmatched_merchant_and_null_category() {
        let conn = cleaned_db(&[txn("M999", 50.0, at(2023, 3, 1, 9, 0), None, Some(1))], &[]);
        let rows = canonical_rows(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].merchant_name, "M999");
        assert_eq!(rows[0].category, "Unknown category");
        assert!(rows[0].city_id.is_none());
        assert!(rows[0].state_id.is_none());
    }

    #[test]
    fn test_clean_merchant_name_fallbacks() {
        let conn = cleaned_db(&sample_transactions(), &sample_merchants());
        let rows = canonical_rows(&conn).unwrap();
        assert_eq!(rows.len(), 6);
        let m004: Vec<_> = rows.iter().filter(|r| r.merchant_id == "M004").collect();
        assert_eq!(m004.len(), 1);
        assert_eq!(m004[0].merchant_name, "M004");
        assert_eq!(m004[0].city_id, Some(3));
        let m005: Vec<_> = rows.iter().filter(|r| r.merchant_id == "M005").collect();
        assert_eq!(m005.len(), 1);
        assert_eq!(m005[0].merchant_name, "M005");
        for r in &rows {
            assert!(!r.merchant_name.is_empty());
            assert!(!r.category.is_empty());
        }
    }

    #[test]
    fn test_clean_blank_name_and_category_fall_back() {
        let conn = cleaned_db(
            &[
                txn("M1", 10.0, at(2023, 1, 1, 9, 0), Some(""), Some(1)),
                txn("M2", 20.0, at(2023, 1, 1, 9, 0), Some("  "), Some(1)),
            ],
            &[merchant("M1", Some(""), 1, 10), merchant("M2", Some(" "), 2, 20)],
        );
        let rows = canonical_rows(&conn).unwrap();
        assert_eq!(rows[0].merchant_name, "M1");
        assert_eq!(rows[0].category, UNKNOWN_CATEGORY);
        assert_eq!(rows[1].merchant_name, "M2");
        assert_eq!(rows[1].category, UNKNOWN_CATEGORY);
    }

    #[test]
    fn test_clean_category_fallback_keeps_known_values() {
        let conn = cleaned_db(&sample_transactions(), &sample_merchants());
        let rows = canonical_rows(&conn).unwrap();
        let m002 = rows.iter().find(|r| r.merchant_id == "M002").unwrap();
        assert_eq!(m002.category, UNKNOWN_CATEGORY);
        let electronics = rows.iter().filter(|r| r.category == "Electronics").count();
        assert_eq!(electronics, 2);
    }

    #[test]
    fn test_duplicate_merchant_ids_do_not_multiply_rows() {
        let conn = cleaned_db(
            &[
                txn("M001", 10.0, at(2023, 1, 1, 1, 0), None, None),
                txn("M001", 20.0, at(2023, 1, 2, 1, 0), None, None),
            ],
            &[
                merchant("M001", Some("First"), 1, 10),
                merchant("M001", Some("Second"), 2, 20),
            ],
        );
        let rows = canonical_rows(&conn).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.merchant_name == "First" && r.city_id == Some(1)));
    }

    #[test]
    fn test_clean_keeps_negative_amounts_and_nulls() {
        let conn = cleaned_db(
            &[txn("M001", -25.0, at(2023, 1, 1, 1, 0), Some("Refunds"), None)],
            &[merchant("M001", Some("Acme"), 1, 10)],
        );
        let rows = canonical_rows(&conn).unwrap();
        assert_eq!(rows[0].purchase_amount, -25.0);
        assert!(rows[0].installments.is_none());
    }

    #[test]
    fn test_clean_is_repeatable() {
        let conn = cleaned_db(&sample_transactions(), &sample_merchants());
        let first = canonical_rows(&conn).unwrap();
        let summary = clean(&conn).unwrap();
        assert_eq!(summary.cleaned, 6);
        assert_eq!(summary.raw_transactions, 6);
        assert_eq!(summary.unmatched_merchants, 1);
        assert_eq!(first, canonical_rows(&conn).unwrap());
    }

    #[test]
    fn test_summarize() {
        let conn = cleaned_db(&sample_transactions(), &sample_merchants());
        let stats = summarize(&conn).unwrap();
        assert_eq!(stats.total_records, 6);
        assert_eq!(stats.unique_merchants, 5);
        // cities 1, 2, 3 and NULL for the unmatched merchant
        assert_eq!(stats.unique_cities, 4);
        assert_eq!(stats.unique_states, 4);
        assert_eq!(stats.unique_categories, 5);
    }
}
