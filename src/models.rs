use chrono::NaiveDateTime;

/// Storage format for timestamps in the engine tables.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Display name used when a transaction carries no category.
pub const UNKNOWN_CATEGORY: &str = "Unknown category";

/// A transaction as delivered by the loader, before the merchant join.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    pub merchant_id: String,
    pub purchase_amount: f64,
    pub purchase_date: NaiveDateTime,
    pub category: Option<String>,
    pub installments: Option<i64>,
}

/// A merchant record. `merchant_id` is not unique in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMerchant {
    pub merchant_id: String,
    pub merchant_name: Option<String>,
    pub city_id: Option<i64>,
    pub state_id: Option<i64>,
}

/// A transaction after the merchant join and null substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTransaction {
    pub merchant_id: String,
    pub merchant_name: String,
    pub city_id: Option<i64>,
    pub state_id: Option<i64>,
    pub category: String,
    pub purchase_date: NaiveDateTime,
    pub purchase_amount: f64,
    pub installments: Option<i64>,
}
