use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{table}: missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("{table} line {line}: invalid value {value:?} for column '{column}'")]
    InvalidValue {
        table: String,
        line: u64,
        column: String,
        value: String,
    },

    #[error("No {0} input given (pass it on the command line or set it with `config`)")]
    MissingInput(&'static str),

    #[error("Input file not found: {0}")]
    InputNotFound(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, InsightsError>;
