// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! Counter store implementations.
//!
//! ## Table Layout (redb)
//!
//! - `rate_limit_counters`: `"{subject}:{window}"` → 16 bytes
//!   (count u64 BE ++ expires_at_millis u64 BE)

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{CounterStore, CounterStoreError};

/// Counter table: key → (count, expiry) encoded big-endian.
const COUNTERS: TableDefinition<&str, &[u8]> = TableDefinition::new("rate_limit_counters");

fn encode_entry(count: u64, expires_at_millis: i64) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&count.to_be_bytes());
    bytes[8..].copy_from_slice(&(expires_at_millis as u64).to_be_bytes());
    bytes
}

fn decode_entry(bytes: &[u8]) -> Option<(u64, i64)> {
    let count = u64::from_be_bytes(bytes.get(..8)?.try_into().ok()?);
    let expires = u64::from_be_bytes(bytes.get(8..16)?.try_into().ok()?);
    Some((count, expires as i64))
}

/// Durable counter store backed by redb (pure Rust, ACID).
///
/// redb serializes write transactions, so the read-modify-write inside
/// [`CounterStore::try_increment`] has exactly one writer at a time --
/// the single-logical-owner-per-key property the limiter depends on.
pub struct RedbCounterStore {
    db: Database,
}

impl RedbCounterStore {
    /// Open (or create) the counter database at the given path.
    pub fn open(path: &Path) -> Result<Self, CounterStoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(COUNTERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

impl CounterStore for RedbCounterStore {
    fn try_increment(
        &self,
        key: &str,
        cap: u64,
        expires_at_millis: i64,
        now_millis: i64,
    ) -> Result<Option<u64>, CounterStoreError> {
        let write_txn = self.db.begin_write()?;
        let admitted = {
            let mut table = write_txn.open_table(COUNTERS)?;

            let current = table
                .get(key)?
                .and_then(|guard| decode_entry(guard.value()))
                .filter(|(_, expires)| *expires > now_millis)
                .map(|(count, _)| count)
                .unwrap_or(0);

            if current >= cap {
                None
            } else {
                let next = current + 1;
                table.insert(key, encode_entry(next, expires_at_millis).as_slice())?;
                Some(next)
            }
        };
        write_txn.commit()?;
        Ok(admitted)
    }

    fn purge_expired(&self, now_millis: i64) -> Result<u64, CounterStoreError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(COUNTERS)?;

            let mut dead_keys = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let expired = decode_entry(value.value())
                    .map(|(_, expires)| expires <= now_millis)
                    .unwrap_or(true);
                if expired {
                    dead_keys.push(key.value().to_string());
                }
            }

            for key in &dead_keys {
                table.remove(key.as_str())?;
            }
            dead_keys.len() as u64
        };
        write_txn.commit()?;
        Ok(removed)
    }
}

/// In-memory counter store for tests and local tooling.
#[derive(Default)]
pub struct InMemoryCounterStore {
    entries: Mutex<HashMap<String, (u64, i64)>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the live count for a key without incrementing.
    #[cfg(test)]
    pub(crate) fn peek(&self, key: &str, now_millis: i64) -> Option<u64> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|(_, expires)| *expires > now_millis)
            .map(|(count, _)| *count)
    }
}

impl CounterStore for InMemoryCounterStore {
    fn try_increment(
        &self,
        key: &str,
        cap: u64,
        expires_at_millis: i64,
        now_millis: i64,
    ) -> Result<Option<u64>, CounterStoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CounterStoreError::LockPoisoned)?;

        let current = entries
            .get(key)
            .filter(|(_, expires)| *expires > now_millis)
            .map(|(count, _)| *count)
            .unwrap_or(0);

        if current >= cap {
            return Ok(None);
        }

        let next = current + 1;
        entries.insert(key.to_string(), (next, expires_at_millis));
        Ok(Some(next))
    }

    fn purge_expired(&self, now_millis: i64) -> Result<u64, CounterStoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CounterStoreError::LockPoisoned)?;
        let before = entries.len();
        entries.retain(|_, (_, expires)| *expires > now_millis);
        Ok((before - entries.len()) as u64)
    }
}

/// Default interval between purge sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Background task that drops expired counter entries.
///
/// Expiry is already enforced lazily on every read; the sweeper only
/// keeps the table from accumulating dead windows.
pub struct CounterSweeper {
    store: Arc<dyn CounterStore>,
    interval: Duration,
}

impl CounterSweeper {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "counter sweeper started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("counter sweeper stopping");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {
                    match self.store.purge_expired(Utc::now().timestamp_millis()) {
                        Ok(0) => {}
                        Ok(removed) => debug!(removed, "purged expired rate limit counters"),
                        Err(err) => warn!(error = %err, "counter purge failed"),
                    }
                }
            }
        }
    }
}
