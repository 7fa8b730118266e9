//! Usage accounting sinks.
//!
//! Every accepted request produces one [`UsageRecord`]. Sinks persist or
//! log records; a sink failure is logged and never fails the request.

use crate::error::CadenceResult;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// Billable usage of one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    /// Request the usage belongs to
    pub request_id: Uuid,
    /// Name of the API key that made the request
    pub api_key_name: String,
    /// Input characters
    pub character_count: usize,
    /// Charged amount
    pub cost: f64,
    /// When the request was accepted
    pub recorded_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Price a request at `price_per_million_chars`
    #[must_use]
    pub fn priced(
        request_id: Uuid,
        api_key_name: &str,
        character_count: usize,
        price_per_million_chars: f64,
    ) -> Self {
        Self {
            request_id,
            api_key_name: api_key_name.to_string(),
            character_count,
            cost: character_count as f64 / 1_000_000.0 * price_per_million_chars,
            recorded_at: Utc::now(),
        }
    }
}

/// Destination for usage records
#[cfg_attr(test, mockall::automock)]
pub trait UsageSink: Send + Sync {
    /// Store one record
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be stored.
    fn record(&self, record: &UsageRecord) -> CadenceResult<()>;
}

/// Writes the billing line to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingUsageSink;

impl UsageSink for TracingUsageSink {
    fn record(&self, record: &UsageRecord) -> CadenceResult<()> {
        info!(
            request_id = %record.request_id,
            "Billing {}: {} chars, ${:.6}",
            record.api_key_name,
            record.character_count,
            record.cost
        );
        Ok(())
    }
}

/// Per-key totals
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageTotals {
    /// Requests recorded
    pub requests: usize,
    /// Characters recorded
    pub characters: usize,
    /// Summed cost
    pub cost: f64,
}

/// Keeps records and per-key totals in memory
#[derive(Debug, Default)]
pub struct InMemoryUsageLedger {
    records: Mutex<Vec<UsageRecord>>,
    totals: Mutex<HashMap<String, UsageTotals>>,
}

impl InMemoryUsageLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in arrival order
    #[must_use]
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().clone()
    }

    /// Totals for one key
    #[must_use]
    pub fn totals(&self, api_key_name: &str) -> UsageTotals {
        self.totals
            .lock()
            .get(api_key_name)
            .copied()
            .unwrap_or_default()
    }
}

impl UsageSink for InMemoryUsageLedger {
    fn record(&self, record: &UsageRecord) -> CadenceResult<()> {
        {
            let mut totals = self.totals.lock();
            let entry = totals.entry(record.api_key_name.clone()).or_default();
            entry.requests += 1;
            entry.characters += record.character_count;
            entry.cost += record.cost;
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}
