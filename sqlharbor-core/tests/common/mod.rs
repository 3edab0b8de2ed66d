//! Shared fixtures for store integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use sqlharbor_core::{
    Connection, Engine, HarborError, MetadataFetcher, ResponseObject, Result, Schema,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Fetcher with scripted answers that counts its calls.
#[derive(Default)]
pub struct ScriptedFetcher {
    databases: Mutex<Vec<String>>,
    schema: Mutex<Option<ResponseObject<Vec<Schema>>>>,
    fail_databases: AtomicBool,
    pub database_calls: AtomicUsize,
    pub schema_calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn with_databases(names: &[&str]) -> Self {
        let fetcher = Self::default();
        fetcher.set_databases(names);
        fetcher
    }

    pub fn set_databases(&self, names: &[&str]) {
        *self.databases.lock().unwrap() = names.iter().map(|n| (*n).to_string()).collect();
    }

    pub fn set_schema(&self, response: ResponseObject<Vec<Schema>>) {
        *self.schema.lock().unwrap() = Some(response);
    }

    pub fn fail_databases(&self, fail: bool) {
        self.fail_databases.store(fail, Ordering::SeqCst);
    }

    pub fn database_calls(&self) -> usize {
        self.database_calls.load(Ordering::SeqCst)
    }

    pub fn schema_calls(&self) -> usize {
        self.schema_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataFetcher for ScriptedFetcher {
    async fn fetch_databases(&self, _connection: &Connection) -> Result<Vec<String>> {
        self.database_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_databases.load(Ordering::SeqCst) {
            return Err(HarborError::remote("Access denied for user"));
        }
        Ok(self.databases.lock().unwrap().clone())
    }

    async fn fetch_schema(
        &self,
        _connection: &Connection,
        _database: &str,
    ) -> Result<ResponseObject<Vec<Schema>>> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self
            .schema
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| ResponseObject::ok(Vec::new())))
    }
}

pub fn profile(title: &str) -> Connection {
    Connection::new(title, Engine::MySQL, "db.internal", 3306, "app", "secret")
}

pub fn table(name: &str) -> Schema {
    Schema {
        name: name.to_string(),
        structure: format!("CREATE TABLE {} (\n  id int\n);", name),
    }
}
