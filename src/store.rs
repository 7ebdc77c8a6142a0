// src/store.rs

//! Read-side view of the evidence store.
//!
//! The engine never owns the store; executors and plugins reach records
//! through [`Store::select`]. [`MemoryStore`] backs tests and small tools.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::cmdline::Filter;
use crate::errors::Result;

/// Field name → scalar value.
pub type Record = BTreeMap<String, Value>;

/// Field that carries a record's type.
pub const TYPE_FIELD: &str = "type";

pub trait Store: Send + Sync {
    /// All records of `record_type` accepted by `filter`.
    fn select(&self, record_type: &str, filter: &Filter) -> Result<Vec<Record>>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<Record> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl Store for MemoryStore {
    fn select(&self, record_type: &str, filter: &Filter) -> Result<Vec<Record>> {
        Ok(self
            .records
            .iter()
            .filter(|r| {
                r.get(TYPE_FIELD)
                    .and_then(Value::as_str)
                    .is_some_and(|t| t == record_type)
            })
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}
