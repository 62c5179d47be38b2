//! Postgres adapter for the credential store.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE users (
//!     user_code     TEXT PRIMARY KEY,
//!     display_name  TEXT NOT NULL,
//!     role          TEXT,
//!     company_code  BIGINT NOT NULL,
//!     active        BOOLEAN NOT NULL DEFAULT TRUE,
//!     secret        TEXT NOT NULL,
//!     last_access   TIMESTAMPTZ
//! );
//! CREATE TABLE companies (
//!     company_code  BIGINT PRIMARY KEY,
//!     company_name  TEXT NOT NULL
//! );
//! CREATE TABLE access_log (
//!     id            BIGSERIAL PRIMARY KEY,
//!     user_code     TEXT NOT NULL,
//!     company_code  BIGINT NOT NULL,
//!     ip_address    TEXT NOT NULL,
//!     user_agent    TEXT NOT NULL,
//!     logged_at     TIMESTAMPTZ NOT NULL
//! );
//! ```

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::config::DatabaseConfig;
use crate::models::{AccessLogEntry, CredentialRecord};

use super::{CredentialStore, StoreError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        tracing::info!(max_connections = config.max_connections, "credential store connected");
        Ok(Self { pool })
    }
}

/// Canonical row-to-record mapping. Every column is fetched by name with an
/// explicit type; a missing or retyped column surfaces as `StoreError::Shape`
/// rather than a silently misread record.
fn record_from_row(row: &PgRow) -> Result<CredentialRecord, StoreError> {
    fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get(column)
            .map_err(|e| StoreError::Shape(format!("column {column}: {e}")))
    }

    Ok(CredentialRecord {
        user_code: get(row, "user_code")?,
        display_name: get(row, "display_name")?,
        role: get(row, "role")?,
        company_code: get(row, "company_code")?,
        active: get(row, "active")?,
        secret: get(row, "secret")?,
        last_access: get(row, "last_access")?,
    })
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_code(
        &self,
        user_code: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT user_code, display_name, role, company_code, active, secret, last_access \
             FROM users WHERE upper(user_code) = upper($1)",
        )
        .bind(user_code)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn company_name(&self, company_code: i64) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT company_name FROM companies WHERE company_code = $1")
            .bind(company_code)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| {
            r.try_get("company_name")
                .map_err(|e| StoreError::Shape(format!("column company_name: {e}")))
        })
        .transpose()
    }

    async fn list_by_company(
        &self,
        company_code: i64,
    ) -> Result<Vec<CredentialRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT user_code, display_name, role, company_code, active, secret, last_access \
             FROM users WHERE company_code = $1 ORDER BY user_code",
        )
        .bind(company_code)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn touch_last_access(&self, user_code: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_access = now() WHERE upper(user_code) = upper($1)")
            .bind(user_code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_access(&self, entry: &AccessLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO access_log (user_code, company_code, ip_address, user_agent, logged_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&entry.user_code)
        .bind(entry.company_code)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.logged_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
