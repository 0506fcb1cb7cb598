pub mod analysis;
pub mod cleaner;
pub mod db;
pub mod error;
pub mod export;
pub mod fmt;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod settings;
