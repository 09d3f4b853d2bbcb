//! Client-scoped string key/value storage.
//!
//! Mirrors browser local storage: one profile, string keys, string values.
//! [`SqliteStorage`] persists across restarts, [`MemoryStorage`] lives only as
//! long as the process.

mod sqlite;

pub use sqlite::SqliteStorage;

use crate::error::AppError;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;

pub trait ClientStorage: Send + Sync + 'static {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, AppError>>;

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), AppError>>;

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), AppError>>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage
            .entries
            .lock()
            .insert(key.to_string(), value.to_string());
        storage
    }

    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

impl ClientStorage for MemoryStorage {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, AppError>> {
        let value = self.entries.lock().get(key).cloned();
        Box::pin(async move { Ok(value) })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), AppError>> {
        self.entries.lock().insert(key.to_string(), value);
        Box::pin(async { Ok(()) })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), AppError>> {
        self.entries.lock().remove(key);
        Box::pin(async { Ok(()) })
    }
}
