//! The five merchant analyses. Every function reads the canonical
//! `transactions` table produced by [`crate::cleaner::clean`] and returns new
//! rows; none of them writes to the engine or depends on another's output.

use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::fmt::{month_label, round2};

/// Assumed gross margin on every sale.
pub const GROSS_MARGIN: f64 = 0.25;
/// Share of installment purchases that end in default.
pub const DEFAULT_RATE: f64 = 0.229;
/// Share of the purchase lost on default; defaulters pay half first.
pub const DEFAULT_LOSS_SHARE: f64 = 0.5;

const YEAR: &str = "CAST(strftime('%Y', purchase_date) AS INTEGER)";
const MONTH: &str = "CAST(strftime('%m', purchase_date) AS INTEGER)";
const HOUR: &str = "CAST(strftime('%H', purchase_date) AS INTEGER)";

// ---------------------------------------------------------------------------
// Task 1: top merchants per city and month
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopMerchant {
    pub month: String,
    pub city_id: Option<i64>,
    pub merchant_name: String,
    pub purchase_total: f64,
    pub no_of_sales: i64,
}

/// Top five merchants by purchase total (sales count breaks ties) in every
/// city for every month, dense-ranked.
pub fn top_merchants_by_city_month(conn: &Connection) -> Result<Vec<TopMerchant>> {
    let sql = format!(
        "WITH monthly AS ( \
             SELECT {YEAR} AS year, {MONTH} AS month, city_id, merchant_name, \
                    SUM(purchase_amount) AS purchase_total, COUNT(*) AS no_of_sales \
             FROM transactions \
             GROUP BY {YEAR}, {MONTH}, city_id, merchant_name \
         ), ranked AS ( \
             SELECT *, DENSE_RANK() OVER ( \
                 PARTITION BY year, month, city_id \
                 ORDER BY purchase_total DESC, no_of_sales DESC \
             ) AS rnk \
             FROM monthly \
         ) \
         SELECT year, month, city_id, merchant_name, ROUND(purchase_total, 2), no_of_sales \
         FROM ranked WHERE rnk <= 5 \
         ORDER BY year, month, city_id, rnk, merchant_name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<TopMerchant> = stmt
        .query_map([], |row| {
            let year: i32 = row.get(0)?;
            let month: u32 = row.get(1)?;
            Ok(TopMerchant {
                month: month_label(year, month),
                city_id: row.get(2)?,
                merchant_name: row.get(3)?,
                purchase_total: row.get(4)?,
                no_of_sales: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(rows = rows.len(), "task 1 complete");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Task 2: average sale per merchant and state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageSale {
    pub merchant_name: String,
    pub state_id: Option<i64>,
    pub average_amount: f64,
}

pub fn average_sale_by_merchant_state(conn: &Connection) -> Result<Vec<AverageSale>> {
    let mut stmt = conn.prepare(
        "SELECT merchant_name, state_id, ROUND(AVG(purchase_amount), 2) AS average_amount \
         FROM transactions \
         GROUP BY merchant_name, state_id \
         ORDER BY average_amount DESC, merchant_name, state_id",
    )?;
    let rows: Vec<AverageSale> = stmt
        .query_map([], |row| {
            Ok(AverageSale {
                merchant_name: row.get(0)?,
                state_id: row.get(1)?,
                average_amount: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(rows = rows.len(), "task 2 complete");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Task 3: peak hours per category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakHour {
    pub category: String,
    pub hour: String,
}

/// The three best hours of the day by total sales in each category. Hours
/// with equal totals share a rank, so a category can list more than three.
pub fn top_hours_by_category(conn: &Connection) -> Result<Vec<PeakHour>> {
    let sql = format!(
        "WITH hourly AS ( \
             SELECT category, {HOUR} AS hour, SUM(purchase_amount) AS total_sales \
             FROM transactions \
             GROUP BY category, {HOUR} \
         ), ranked AS ( \
             SELECT *, DENSE_RANK() OVER (PARTITION BY category ORDER BY total_sales DESC) AS rnk \
             FROM hourly \
         ) \
         SELECT category, hour FROM ranked WHERE rnk <= 3 \
         ORDER BY category, rnk, hour"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<PeakHour> = stmt
        .query_map([], |row| {
            let hour: i64 = row.get(1)?;
            Ok(PeakHour {
                category: row.get(0)?,
                hour: hour.to_string(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(rows = rows.len(), "task 3 complete");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Task 4: merchant popularity and dominant categories per city
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularMerchant {
    pub merchant_name: String,
    pub city_id: Option<i64>,
    pub transaction_count: i64,
    pub rank: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DominantCategory {
    pub city_id: Option<i64>,
    pub dominant_category: String,
    pub category_transactions: i64,
}

pub struct LocationAnalysis {
    pub top_merchants_by_city: Vec<PopularMerchant>,
    pub city_dominant_categories: Vec<DominantCategory>,
}

pub fn popular_merchants_location_analysis(conn: &Connection) -> Result<LocationAnalysis> {
    Ok(LocationAnalysis {
        top_merchants_by_city: top_merchants_by_city(conn)?,
        city_dominant_categories: city_dominant_categories(conn)?,
    })
}

/// Up to ten dense ranks of merchants per city by transaction count.
pub fn top_merchants_by_city(conn: &Connection) -> Result<Vec<PopularMerchant>> {
    let mut stmt = conn.prepare(
        "WITH popularity AS ( \
             SELECT merchant_name, city_id, COUNT(*) AS transaction_count \
             FROM transactions \
             GROUP BY merchant_name, city_id \
         ), ranked AS ( \
             SELECT *, DENSE_RANK() OVER (PARTITION BY city_id ORDER BY transaction_count DESC) AS rnk \
             FROM popularity \
         ) \
         SELECT merchant_name, city_id, transaction_count, rnk FROM ranked WHERE rnk <= 10 \
         ORDER BY city_id, rnk, merchant_name",
    )?;
    let rows: Vec<PopularMerchant> = stmt
        .query_map([], |row| {
            Ok(PopularMerchant {
                merchant_name: row.get(0)?,
                city_id: row.get(1)?,
                transaction_count: row.get(2)?,
                rank: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(rows = rows.len(), "task 4a complete");
    Ok(rows)
}

/// The category with the most transactions in each city. On a tie the
/// lexicographically largest category name wins.
pub fn city_dominant_categories(conn: &Connection) -> Result<Vec<DominantCategory>> {
    let mut stmt = conn.prepare(
        "WITH city_category AS ( \
             SELECT city_id, category, COUNT(*) AS transaction_count, \
                    SUM(purchase_amount) AS total_sales \
             FROM transactions \
             GROUP BY city_id, category \
         ), ranked AS ( \
             SELECT *, ROW_NUMBER() OVER ( \
                 PARTITION BY city_id ORDER BY transaction_count DESC, category DESC \
             ) AS pick \
             FROM city_category \
         ) \
         SELECT city_id, category, transaction_count FROM ranked WHERE pick = 1 \
         ORDER BY city_id",
    )?;
    let rows: Vec<DominantCategory> = stmt
        .query_map([], |row| {
            Ok(DominantCategory {
                city_id: row.get(0)?,
                dominant_category: row.get(1)?,
                category_transactions: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(rows = rows.len(), "task 4b complete");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Task 5: business recommendations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityPerformance {
    pub city_id: Option<i64>,
    pub total_sales: f64,
    pub transaction_count: i64,
    pub avg_transaction_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPerformance {
    pub category: String,
    pub total_sales: f64,
    pub transaction_count: i64,
    pub avg_transaction_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    pub year: i32,
    pub month: u32,
    pub total_sales: f64,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyPattern {
    pub hour: i64,
    pub total_sales: f64,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallmentProfitability {
    pub installments: Option<i64>,
    pub avg_purchase_amount: f64,
    pub transaction_count: i64,
    pub gross_profit: f64,
    pub expected_default_loss: f64,
    pub net_profit: f64,
    /// `None` when the bucket's total sales are zero.
    pub profit_margin_pct: Option<f64>,
}

pub struct Recommendations {
    pub top_cities: Vec<CityPerformance>,
    pub top_categories: Vec<CategoryPerformance>,
    pub monthly_trends: Vec<MonthlyTrend>,
    pub hourly_patterns: Vec<HourlyPattern>,
    pub installment_recommendation: Vec<InstallmentProfitability>,
}

pub fn business_recommendations(conn: &Connection) -> Result<Recommendations> {
    Ok(Recommendations {
        top_cities: top_cities(conn)?,
        top_categories: top_categories(conn)?,
        monthly_trends: monthly_trends(conn)?,
        hourly_patterns: hourly_patterns(conn)?,
        installment_recommendation: installment_recommendation(conn)?,
    })
}

pub fn top_cities(conn: &Connection) -> Result<Vec<CityPerformance>> {
    let mut stmt = conn.prepare(
        "SELECT city_id, SUM(purchase_amount) AS total_sales, COUNT(*), AVG(purchase_amount) \
         FROM transactions GROUP BY city_id \
         ORDER BY total_sales DESC, city_id LIMIT 5",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CityPerformance {
                city_id: row.get(0)?,
                total_sales: row.get(1)?,
                transaction_count: row.get(2)?,
                avg_transaction_value: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn top_categories(conn: &Connection) -> Result<Vec<CategoryPerformance>> {
    let mut stmt = conn.prepare(
        "SELECT category, SUM(purchase_amount) AS total_sales, COUNT(*), AVG(purchase_amount) \
         FROM transactions GROUP BY category \
         ORDER BY total_sales DESC, category LIMIT 5",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CategoryPerformance {
                category: row.get(0)?,
                total_sales: row.get(1)?,
                transaction_count: row.get(2)?,
                avg_transaction_value: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn monthly_trends(conn: &Connection) -> Result<Vec<MonthlyTrend>> {
    let sql = format!(
        "SELECT {YEAR} AS year, {MONTH} AS month, SUM(purchase_amount), COUNT(*) \
         FROM transactions GROUP BY {YEAR}, {MONTH} \
         ORDER BY year, month"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(MonthlyTrend {
                year: row.get(0)?,
                month: row.get(1)?,
                total_sales: row.get(2)?,
                transaction_count: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn hourly_patterns(conn: &Connection) -> Result<Vec<HourlyPattern>> {
    let sql = format!(
        "SELECT {HOUR} AS hour, SUM(purchase_amount), COUNT(*) \
         FROM transactions GROUP BY {HOUR} \
         ORDER BY hour"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(HourlyPattern {
                hour: row.get(0)?,
                total_sales: row.get(1)?,
                transaction_count: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn installment_recommendation(conn: &Connection) -> Result<Vec<InstallmentProfitability>> {
    let mut stmt = conn.prepare(
        "SELECT installments, AVG(purchase_amount), COUNT(*), SUM(purchase_amount) \
         FROM transactions GROUP BY installments \
         ORDER BY installments",
    )?;
    let raw: Vec<(Option<i64>, f64, i64, f64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let rows = raw
        .into_iter()
        .map(|(installments, avg, count, total)| {
            installment_profitability(installments, avg, count, total)
        })
        .collect();
    Ok(rows)
}

/// Profitability of one installments bucket.
///
/// Gross profit is [`GROSS_MARGIN`] of total sales. Buckets paid in more than
/// one installment lose `total × DEFAULT_RATE × DEFAULT_LOSS_SHARE` to
/// defaults; single payments (and an unknown installments count) lose
/// nothing. Rounding to cents happens after the arithmetic.
pub fn installment_profitability(
    installments: Option<i64>,
    avg_purchase_amount: f64,
    transaction_count: i64,
    total_sales: f64,
) -> InstallmentProfitability {
    let gross_profit = total_sales * GROSS_MARGIN;
    let expected_default_loss = match installments {
        Some(n) if n > 1 => total_sales * DEFAULT_RATE * DEFAULT_LOSS_SHARE,
        _ => 0.0,
    };
    let net_profit = gross_profit - expected_default_loss;
    let profit_margin_pct = if total_sales == 0.0 {
        None
    } else {
        Some(round2(net_profit / total_sales * 100.0))
    };

    InstallmentProfitability {
        installments,
        avg_purchase_amount: round2(avg_purchase_amount),
        transaction_count,
        gross_profit: round2(gross_profit),
        expected_default_loss: round2(expected_default_loss),
        net_profit: round2(net_profit),
        profit_margin_pct,
    }
}
