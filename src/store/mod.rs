//! Credential store seam.
//!
//! The user table lives in an external system this service does not own.
//! Everything the core needs from it goes through [`CredentialStore`]; the
//! production adapter is [`postgres::PgStore`], while [`MemoryStore`] backs
//! tests and local development.

pub mod postgres;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AccessLogEntry, CredentialRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The row did not match the canonical user-table shape. Raised instead
    /// of guessing field order when the backing schema drifts.
    #[error("unexpected row shape: {0}")]
    Shape(String),
}

/// Synchronous-looking lookup capability over the external user table.
///
/// `touch_last_access` and `record_access` are best-effort from the caller's
/// point of view: the verifier spawns them and logs failures without ever
/// failing the login itself.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Case-insensitive lookup by user code.
    async fn find_by_code(&self, user_code: &str)
        -> Result<Option<CredentialRecord>, StoreError>;

    /// Display name for a company code, when the store knows it.
    async fn company_name(&self, company_code: i64) -> Result<Option<String>, StoreError>;

    /// Users belonging to one company, secrets excluded from any response.
    async fn list_by_company(&self, company_code: i64)
        -> Result<Vec<CredentialRecord>, StoreError>;

    async fn touch_last_access(&self, user_code: &str) -> Result<(), StoreError>;

    async fn record_access(&self, entry: &AccessLogEntry) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// In-memory store used by tests and local development.
///
/// Records are keyed by upper-cased user code so lookups stay
/// case-insensitive like the production adapter. The lookup counter lets
/// tests assert that input validation short-circuits before any store call.
#[derive(Default, Clone)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, CredentialRecord>>>,
    companies: Arc<Mutex<HashMap<i64, String>>>,
    access_log: Arc<Mutex<Vec<AccessLogEntry>>>,
    lookups: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: CredentialRecord) {
        let key = record.user_code.to_uppercase();
        self.records.lock().unwrap().insert(key, record);
    }

    pub fn insert_company(&self, company_code: i64, name: impl Into<String>) {
        self.companies.lock().unwrap().insert(company_code, name.into());
    }

    /// Number of `find_by_code` calls seen so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn access_log(&self) -> Vec<AccessLogEntry> {
        self.access_log.lock().unwrap().clone()
    }

    pub fn last_access_of(&self, user_code: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        self.records
            .lock()
            .unwrap()
            .get(&user_code.to_uppercase())
            .and_then(|r| r.last_access)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_code(
        &self,
        user_code: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&user_code.to_uppercase())
            .cloned())
    }

    async fn company_name(&self, company_code: i64) -> Result<Option<String>, StoreError> {
        Ok(self.companies.lock().unwrap().get(&company_code).cloned())
    }

    async fn list_by_company(
        &self,
        company_code: i64,
    ) -> Result<Vec<CredentialRecord>, StoreError> {
        let mut users: Vec<CredentialRecord> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.company_code == company_code)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.user_code.cmp(&b.user_code));
        Ok(users)
    }

    async fn touch_last_access(&self, user_code: &str) -> Result<(), StoreError> {
        if let Some(record) = self
            .records
            .lock()
            .unwrap()
            .get_mut(&user_code.to_uppercase())
        {
            record.last_access = Some(chrono::Utc::now());
        }
        Ok(())
    }

    async fn record_access(&self, entry: &AccessLogEntry) -> Result<(), StoreError> {
        self.access_log.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
