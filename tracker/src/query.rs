//! Query service: read-only lookups against the latest-value store.
//!
//! Synchronous and independent of the write path; the only point of
//! contention is the store's read lock. Keeps answering after ingestion
//! has stopped.

use std::sync::Arc;

use corelib::StoreEntry;

use crate::error::QueryError;
use crate::store::LatestValueStore;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Found(StoreEntry),
    /// Symbol never seen. A normal answer, not a failure.
    NotFound,
}

#[derive(Clone)]
pub struct QueryService {
    store: Arc<LatestValueStore>,
}

impl QueryService {
    pub fn new(store: Arc<LatestValueStore>) -> Self {
        Self { store }
    }

    pub fn latest_price(&self, symbol: &str) -> Result<QueryOutcome, QueryError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(QueryError::MissingSymbol);
        }

        Ok(match self.store.get(symbol) {
            Some(entry) => QueryOutcome::Found(entry),
            None => QueryOutcome::NotFound,
        })
    }

    pub fn tracked_symbols(&self) -> usize {
        self.store.len()
    }
}
