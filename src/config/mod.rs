//! Configuration module - database connection and application settings.

pub mod database;
pub mod settings;

pub use settings::AppConfig;
