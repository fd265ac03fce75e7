//! Database configuration module.
//!
//! Handles `SQLite` connection setup and table creation using `SeaORM`. Table
//! creation uses `Schema::create_table_from_entity` so the database schema is
//! generated from the entity definitions without manual SQL.

use crate::entities::{
    Contribution, ContributionSchedule, Group, Membership, Payout, PayoutSchedule, Wallet,
    WalletTransaction, WithdrawalRequest,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from environment variable or returns default `SQLite` path.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/susu_engine.sqlite".to_string())
}

/// Establishes a connection to the database using the `DATABASE_URL` environment
/// variable, falling back to a default local `SQLite` file.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(get_database_url()).await.map_err(Into::into)
}

/// Creates all engine tables using `SeaORM`'s schema generation from entity definitions.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let statements = [
        schema.create_table_from_entity(Group),
        schema.create_table_from_entity(Membership),
        schema.create_table_from_entity(ContributionSchedule),
        schema.create_table_from_entity(Contribution),
        schema.create_table_from_entity(PayoutSchedule),
        schema.create_table_from_entity(Payout),
        schema.create_table_from_entity(Wallet),
        schema.create_table_from_entity(WalletTransaction),
        schema.create_table_from_entity(WithdrawalRequest),
    ];

    for statement in &statements {
        db.execute(builder.build(statement)).await?;
    }

    Ok(())
}
