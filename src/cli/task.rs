use std::path::Path;

use merchant_insights::analysis::{
    average_sale_by_merchant_state, business_recommendations, popular_merchants_location_analysis,
    top_hours_by_category, top_merchants_by_city_month, Recommendations,
};
use merchant_insights::cleaner::{canonical_rows, summarize};
use merchant_insights::error::Result;
use merchant_insights::export::{
    write_csv, AVERAGE_SALE_HEADERS, CATEGORY_PERFORMANCE_HEADERS, CITY_PERFORMANCE_HEADERS,
    DOMINANT_CATEGORY_HEADERS, HOURLY_PATTERN_HEADERS, INSTALLMENT_HEADERS, MONTHLY_TREND_HEADERS,
    PEAK_HOUR_HEADERS, POPULAR_MERCHANT_HEADERS, TOP_MERCHANT_HEADERS,
};
use merchant_insights::pipeline::Job;

use crate::cli::text;

pub const TASK1_FILE: &str = "task1_top_merchants.csv";
pub const TASK2_FILE: &str = "task2_avg_sales_by_state.csv";
pub const TASK3_FILE: &str = "task3_top_hours_by_category.csv";
pub const TASK4_MERCHANTS_FILE: &str = "task4_popular_merchants.csv";
pub const TASK4_CATEGORIES_FILE: &str = "task4_city_categories.csv";
pub const TASK5_DIR: &str = "task5_recommendations";

const SAMPLE_ROWS: usize = 5;

fn wrote(path: &Path) {
    println!("Wrote {}", path.display());
}

pub fn clean(job: &mut Job, limit: usize) -> Result<()> {
    let summary = job.cleaned()?.clone();
    let stats = summarize(job.conn())?;
    let sample: Vec<_> = canonical_rows(job.conn())?
        .into_iter()
        .take(SAMPLE_ROWS.min(limit))
        .collect();
    println!("{}", text::format_clean(&summary, &stats, &sample));
    Ok(())
}

pub fn task1(job: &Job, output: &Path, limit: usize) -> Result<()> {
    let rows = top_merchants_by_city_month(job.conn())?;
    println!("{}", text::format_top_merchants(&rows, limit));
    write_csv(output, &rows, TOP_MERCHANT_HEADERS)?;
    wrote(output);
    Ok(())
}

pub fn task2(job: &Job, output: &Path, limit: usize) -> Result<()> {
    let rows = average_sale_by_merchant_state(job.conn())?;
    println!("{}", text::format_average_sales(&rows, limit));
    write_csv(output, &rows, AVERAGE_SALE_HEADERS)?;
    wrote(output);
    Ok(())
}

pub fn task3(job: &Job, output: &Path, limit: usize) -> Result<()> {
    let rows = top_hours_by_category(job.conn())?;
    println!("{}", text::format_peak_hours(&rows, limit));
    write_csv(output, &rows, PEAK_HOUR_HEADERS)?;
    wrote(output);
    Ok(())
}

pub fn task4(job: &Job, merchants: &Path, categories: &Path, limit: usize) -> Result<()> {
    let data = popular_merchants_location_analysis(job.conn())?;
    println!("{}", text::format_location(&data, limit));

    write_csv(merchants, &data.top_merchants_by_city, POPULAR_MERCHANT_HEADERS)?;
    wrote(merchants);
    write_csv(categories, &data.city_dominant_categories, DOMINANT_CATEGORY_HEADERS)?;
    wrote(categories);
    Ok(())
}

pub fn task5(job: &Job, dir: &Path) -> Result<()> {
    let data = business_recommendations(job.conn())?;
    println!("{}", text::format_recommendations(&data));
    write_recommendations(&data, dir)
}

fn write_recommendations(data: &Recommendations, dir: &Path) -> Result<()> {
    let path = dir.join("top_cities.csv");
    write_csv(&path, &data.top_cities, CITY_PERFORMANCE_HEADERS)?;
    wrote(&path);
    let path = dir.join("top_categories.csv");
    write_csv(&path, &data.top_categories, CATEGORY_PERFORMANCE_HEADERS)?;
    wrote(&path);
    let path = dir.join("monthly_trends.csv");
    write_csv(&path, &data.monthly_trends, MONTHLY_TREND_HEADERS)?;
    wrote(&path);
    let path = dir.join("hourly_patterns.csv");
    write_csv(&path, &data.hourly_patterns, HOURLY_PATTERN_HEADERS)?;
    wrote(&path);
    let path = dir.join("installment_analysis.csv");
    write_csv(&path, &data.installment_recommendation, INSTALLMENT_HEADERS)?;
    wrote(&path);
    Ok(())
}

/// Run every task against the same cleaned table, without printing tables.
pub fn all(job: &Job, dir: &Path) -> Result<()> {
    let conn = job.conn();

    let path = dir.join(TASK1_FILE);
    write_csv(&path, &top_merchants_by_city_month(conn)?, TOP_MERCHANT_HEADERS)?;
    wrote(&path);

    let path = dir.join(TASK2_FILE);
    write_csv(&path, &average_sale_by_merchant_state(conn)?, AVERAGE_SALE_HEADERS)?;
    wrote(&path);

    let path = dir.join(TASK3_FILE);
    write_csv(&path, &top_hours_by_category(conn)?, PEAK_HOUR_HEADERS)?;
    wrote(&path);

    let location = popular_merchants_location_analysis(conn)?;
    let path = dir.join(TASK4_MERCHANTS_FILE);
    write_csv(&path, &location.top_merchants_by_city, POPULAR_MERCHANT_HEADERS)?;
    wrote(&path);
    let path = dir.join(TASK4_CATEGORIES_FILE);
    write_csv(&path, &location.city_dominant_categories, DOMINANT_CATEGORY_HEADERS)?;
    wrote(&path);

    write_recommendations(&business_recommendations(conn)?, &dir.join(TASK5_DIR))
}
