pub mod entities;

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use time::OffsetDateTime;
use tracing::{info, instrument};

use self::entities::Slot;

/// A SQLite database holding named slots of serialized application state.
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        let pool = SqlitePoolOptions::new()
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .foreign_keys(true)
                    .journal_mode(SqliteJournalMode::Delete)
                    .create_if_missing(true),
            )
            .await
            .with_context(|| anyhow!("could not open a SQLite database `{}`", db_path.display()))?;
        info!("Using an SQLite database `{}`", db_path.display());
        sqlx::migrate!()
            .run(&pool)
            .await
            .with_context(|| anyhow!("could not prepare a database schema"))?;

        Ok(Self { pool })
    }

    pub async fn begin(&self) -> Result<Tx> {
        self.pool
            .begin()
            .await
            .context("could not begin a new DB transaction")
            .map(Tx)
    }
}

pub struct Tx(Transaction<'static, Sqlite>);

impl Tx {
    pub async fn commit(self) -> Result<()> {
        self.0
            .commit()
            .await
            .context("could not commit a DB transaction")
    }

    #[instrument(level = "TRACE", skip(self))]
    pub async fn load_slot(&mut self, name: &str) -> Result<Option<Slot>> {
        sqlx::query_as(
            "SELECT value, updated
            FROM slots
            WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(self.0.as_mut())
        .await
        .with_context(|| anyhow!("could not read the slot `{name}`"))
    }

    #[instrument(level = "TRACE", skip(self, value), fields(len = value.len()))]
    pub async fn store_slot(&mut self, name: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT
            INTO slots (name, value, updated)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (name) DO UPDATE SET
              value = excluded.value,
              updated = excluded.updated",
        )
        .bind(name)
        .bind(value)
        .bind(OffsetDateTime::now_utc())
        .execute(self.0.as_mut())
        .await
        .with_context(|| anyhow!("could not write the slot `{name}`"))?;

        Ok(())
    }
}
