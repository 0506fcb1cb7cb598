use colored::Colorize;
use comfy_table::{Cell, Table};

use merchant_insights::analysis::{
    AverageSale, DominantCategory, InstallmentProfitability, LocationAnalysis, PeakHour,
    PopularMerchant, Recommendations, TopMerchant,
};
use merchant_insights::cleaner::{CleanSummary, CleanedStats};
use merchant_insights::fmt::{amount, opt_id};
use merchant_insights::models::{CanonicalTransaction, TIMESTAMP_FORMAT};

/// Footer noting how many rows were left out of a truncated table.
fn with_footer(title: &str, table: Table, shown: usize, total: usize) -> String {
    let mut out = format!("{}\n{table}", title.bold());
    if total > shown {
        out.push_str(&format!("\n... showing {shown} of {total} rows"));
    }
    out
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

pub fn format_clean(
    summary: &CleanSummary,
    stats: &CleanedStats,
    sample: &[CanonicalTransaction],
) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Cleaned Data".bold()));
    out.push_str(&format!("Total records:       {}\n", stats.total_records));
    out.push_str(&format!("Unique merchants:    {}\n", stats.unique_merchants));
    out.push_str(&format!("Unique cities:       {}\n", stats.unique_cities));
    out.push_str(&format!("Unique states:       {}\n", stats.unique_states));
    out.push_str(&format!("Unique categories:   {}\n", stats.unique_categories));
    if summary.unmatched_merchants > 0 {
        out.push_str(&format!(
            "{}\n",
            format!(
                "{} transactions have no merchant record",
                summary.unmatched_merchants
            )
            .yellow()
        ));
    }

    let mut table = Table::new();
    table.set_header(vec![
        "merchant_id",
        "merchant_name",
        "city_id",
        "state_id",
        "category",
        "purchase_date",
        "purchase_amount",
        "installments",
    ]);
    for r in sample {
        table.add_row(vec![
            Cell::new(&r.merchant_id),
            Cell::new(&r.merchant_name),
            Cell::new(opt_id(r.city_id)),
            Cell::new(opt_id(r.state_id)),
            Cell::new(&r.category),
            Cell::new(r.purchase_date.format(TIMESTAMP_FORMAT)),
            Cell::new(amount(r.purchase_amount)),
            Cell::new(opt_id(r.installments)),
        ]);
    }
    out.push_str(&format!("\nSample ({} rows)\n{table}", sample.len()));
    out
}

// ---------------------------------------------------------------------------
// Tasks 1-3
// ---------------------------------------------------------------------------

pub fn format_top_merchants(rows: &[TopMerchant], limit: usize) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Month", "City", "Merchant", "Purchase Total", "Sales"]);
    for r in rows.iter().take(limit) {
        table.add_row(vec![
            Cell::new(&r.month),
            Cell::new(opt_id(r.city_id)),
            Cell::new(&r.merchant_name),
            Cell::new(amount(r.purchase_total)),
            Cell::new(r.no_of_sales),
        ]);
    }
    with_footer(
        "Top 5 Merchants by City and Month",
        table,
        rows.len().min(limit),
        rows.len(),
    )
}

pub fn format_average_sales(rows: &[AverageSale], limit: usize) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Merchant", "State", "Average Amount"]);
    for r in rows.iter().take(limit) {
        table.add_row(vec![
            Cell::new(&r.merchant_name),
            Cell::new(opt_id(r.state_id)),
            Cell::new(amount(r.average_amount)),
        ]);
    }
    with_footer(
        "Average Sale by Merchant and State",
        table,
        rows.len().min(limit),
        rows.len(),
    )
}

pub fn format_peak_hours(rows: &[PeakHour], limit: usize) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Category", "Hour"]);
    for r in rows.iter().take(limit) {
        table.add_row(vec![Cell::new(&r.category), Cell::new(&r.hour)]);
    }
    with_footer(
        "Top 3 Hours by Category",
        table,
        rows.len().min(limit),
        rows.len(),
    )
}

// ---------------------------------------------------------------------------
// Task 4
// ---------------------------------------------------------------------------

fn format_popular(rows: &[PopularMerchant], limit: usize) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Rank", "City", "Merchant", "Transactions"]);
    for r in rows.iter().take(limit) {
        table.add_row(vec![
            Cell::new(r.rank),
            Cell::new(opt_id(r.city_id)),
            Cell::new(&r.merchant_name),
            Cell::new(r.transaction_count),
        ]);
    }
    with_footer(
        "Most Popular Merchants by City",
        table,
        rows.len().min(limit),
        rows.len(),
    )
}

fn format_dominant(rows: &[DominantCategory], limit: usize) -> String {
    let mut table = Table::new();
    table.set_header(vec!["City", "Dominant Category", "Transactions"]);
    for r in rows.iter().take(limit) {
        table.add_row(vec![
            Cell::new(opt_id(r.city_id)),
            Cell::new(&r.dominant_category),
            Cell::new(r.category_transactions),
        ]);
    }
    with_footer(
        "Dominant Category by City",
        table,
        rows.len().min(limit),
        rows.len(),
    )
}

pub fn format_location(data: &LocationAnalysis, limit: usize) -> String {
    format!(
        "{}\n\n{}",
        format_popular(&data.top_merchants_by_city, limit),
        format_dominant(&data.city_dominant_categories, limit)
    )
}

// ---------------------------------------------------------------------------
// Task 5
// ---------------------------------------------------------------------------

fn format_installments(rows: &[InstallmentProfitability]) -> String {
    let mut table = Table::new();
    table.set_header(vec![
        "Installments",
        "Avg Purchase",
        "Transactions",
        "Gross Profit",
        "Default Loss",
        "Net Profit",
        "Margin",
    ]);
    for r in rows {
        let margin = match r.profit_margin_pct {
            Some(pct) if pct >= 0.0 => format!("{pct:.2}%").green().to_string(),
            Some(pct) => format!("{pct:.2}%").red().to_string(),
            None => "n/a".to_string(),
        };
        table.add_row(vec![
            Cell::new(opt_id(r.installments)),
            Cell::new(amount(r.avg_purchase_amount)),
            Cell::new(r.transaction_count),
            Cell::new(amount(r.gross_profit)),
            Cell::new(amount(r.expected_default_loss)),
            Cell::new(amount(r.net_profit)),
            Cell::new(margin),
        ]);
    }
    format!("{}\n{table}", "Installment Profitability".bold())
}

pub fn format_recommendations(data: &Recommendations) -> String {
    let mut cities = Table::new();
    cities.set_header(vec!["City", "Total Sales", "Transactions", "Avg Value"]);
    for r in &data.top_cities {
        cities.add_row(vec![
            Cell::new(opt_id(r.city_id)),
            Cell::new(amount(r.total_sales)),
            Cell::new(r.transaction_count),
            Cell::new(amount(r.avg_transaction_value)),
        ]);
    }

    let mut categories = Table::new();
    categories.set_header(vec!["Category", "Total Sales", "Transactions", "Avg Value"]);
    for r in &data.top_categories {
        categories.add_row(vec![
            Cell::new(&r.category),
            Cell::new(amount(r.total_sales)),
            Cell::new(r.transaction_count),
            Cell::new(amount(r.avg_transaction_value)),
        ]);
    }

    let mut months = Table::new();
    months.set_header(vec!["Month", "Total Sales", "Transactions"]);
    for r in &data.monthly_trends {
        months.add_row(vec![
            Cell::new(format!("{:04}-{:02}", r.year, r.month)),
            Cell::new(amount(r.total_sales)),
            Cell::new(r.transaction_count),
        ]);
    }

    let mut hours = Table::new();
    hours.set_header(vec!["Hour", "Total Sales", "Transactions"]);
    for r in &data.hourly_patterns {
        hours.add_row(vec![
            Cell::new(format!("{:02}:00", r.hour)),
            Cell::new(amount(r.total_sales)),
            Cell::new(r.transaction_count),
        ]);
    }

    format!(
        "{}\n{cities}\n\n{}\n{categories}\n\n{}\n{months}\n\n{}\n{hours}\n\n{}",
        "Top Cities".bold(),
        "Top Categories".bold(),
        "Monthly Trends".bold(),
        "Hourly Patterns".bold(),
        format_installments(&data.installment_recommendation),
    )
}
