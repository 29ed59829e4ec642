//! Postgres-backed account store and event sink.

use crate::models::{Address, EventEnvelope};
use crate::services::error::{PairUpdateError, SinkError, StoreError};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::{AccountStore, EventSink};
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "balance-ledger"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Provisioning (outside the ledger core)
    // -------------------------------------------------------------------------

    /// Create an address with opening balances.
    #[instrument(skip(self, address), fields(address_id = %address.address_id))]
    pub async fn provision(&self, address: &Address) -> Result<Address, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["provision"])
            .start_timer();

        let created = sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses (address_id, available_balance, lock_balance)
            VALUES ($1, $2, $3)
            RETURNING address_id, available_balance, lock_balance, updated_utc
            "#,
        )
        .bind(&address.address_id)
        .bind(address.available_balance)
        .bind(address.lock_balance)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Address '{}' already exists",
                    address.address_id
                ))
            }
            sqlx::Error::Database(ref db_err) if db_err.is_check_violation() => {
                AppError::BadRequest(anyhow::anyhow!("Opening balances must be non-negative"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to provision address: {}", e)),
        })?;

        timer.observe_duration();

        info!(address_id = %created.address_id, "Address provisioned");

        Ok(created)
    }

    // -------------------------------------------------------------------------
    // Address Operations
    // -------------------------------------------------------------------------

    async fn write_address<'e, E>(executor: E, address: &Address) -> Result<(), StoreError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE addresses
            SET available_balance = $2, lock_balance = $3, updated_utc = $4
            WHERE address_id = $1
            "#,
        )
        .bind(&address.address_id)
        .bind(address.available_balance)
        .bind(address.lock_balance)
        .bind(address.updated_utc)
        .execute(executor)
        .await
        .map_err(|e| StoreError::Database(anyhow::anyhow!("Failed to update address: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(address.address_id.clone()));
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(anyhow::anyhow!("Failed to begin transaction: {}", e)))
    }
}

#[async_trait]
impl AccountStore for Database {
    #[instrument(skip(self))]
    async fn get(&self, address_id: &str) -> Result<Address, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_address"])
            .start_timer();

        let address = sqlx::query_as::<_, Address>(
            r#"
            SELECT address_id, available_balance, lock_balance, updated_utc
            FROM addresses
            WHERE address_id = $1
            "#,
        )
        .bind(address_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(anyhow::anyhow!("Failed to get address: {}", e)))?;

        timer.observe_duration();

        address.ok_or_else(|| StoreError::NotFound(address_id.to_string()))
    }

    #[instrument(skip(self, address), fields(address_id = %address.address_id))]
    async fn update(&self, address: &Address) -> Result<(), StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_address"])
            .start_timer();

        Self::write_address(&self.pool, address).await?;

        timer.observe_duration();
        Ok(())
    }

    /// Both writes commit together or not at all, so a Postgres-backed
    /// transfer never reports `PairUpdateError::Second`.
    #[instrument(skip(self, first, second), fields(first_id = %first.address_id, second_id = %second.address_id))]
    async fn update_pair(&self, first: &Address, second: &Address) -> Result<(), PairUpdateError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_address_pair"])
            .start_timer();

        let mut tx = self.begin().await.map_err(PairUpdateError::First)?;

        Self::write_address(&mut *tx, first)
            .await
            .map_err(PairUpdateError::First)?;
        Self::write_address(&mut *tx, second)
            .await
            .map_err(PairUpdateError::First)?;

        tx.commit().await.map_err(|e| {
            PairUpdateError::First(StoreError::Database(anyhow::anyhow!(
                "Failed to commit transaction: {}",
                e
            )))
        })?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl EventSink for Database {
    #[instrument(skip(self, event), fields(event_id = %event.event_id, kind = %event.kind()))]
    async fn emit(&self, event: &EventEnvelope) -> Result<(), SinkError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_event"])
            .start_timer();

        let payload = serde_json::to_value(&event.event)?;

        sqlx::query(
            r#"
            INSERT INTO ledger_events (event_id, kind, payload, emitted_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(event.event_id)
        .bind(event.kind().as_str())
        .bind(payload)
        .bind(event.emitted_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| SinkError::Database(anyhow::anyhow!("Failed to insert event: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }
}
