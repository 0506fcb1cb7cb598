/// Round half away from zero to two decimal places.
pub fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

/// Format a float as an amount with thousands separators: 1,234.56
pub fn amount(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative && abs >= 0.005 {
        format!("-{with_commas}.{dec_part}")
    } else {
        format!("{with_commas}.{dec_part}")
    }
}

/// Render an optional id column; the null group shows as "-".
pub fn opt_id(val: Option<i64>) -> String {
    val.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// "Jan 2023" style label for a calendar month.
pub fn month_label(year: i32, month: u32) -> String {
    chrono::NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_else(|| format!("{year:04}-{month:02}"))
}
