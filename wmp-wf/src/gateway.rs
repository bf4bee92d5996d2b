//! Persistence gateway
//!
//! Every workflow operation runs inside exactly one [`UnitOfWork`]: a
//! transaction plus an outbox of events that become visible only after the
//! transaction commits. Dropping a unit of work without committing rolls
//! the transaction back and discards the outbox, so early returns through
//! `?` never leave partial writes behind.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;
use wmp_common::events::WmpEvent;
use wmp_common::{Error, Result};

/// Transactions held longer than this are logged as warnings
const LONG_TRANSACTION_MS: u128 = 2000;

/// Connection acquisition slower than this is logged as a warning
const SLOW_ACQUIRE_MS: u128 = 1000;

/// Take the write lock up front so a unit of work that reads then writes
/// waits on the busy timeout instead of failing on a stale snapshot
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// Injected handle to the relational store
#[derive(Clone)]
pub struct Gateway {
    pool: SqlitePool,
}

impl Gateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Pool for read-only queries outside a unit of work
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a unit of work holding the database write lock
    ///
    /// Concurrent units of work are serialized: the second caller blocks
    /// (up to the busy timeout) and then reads the state the first one
    /// committed.
    pub async fn begin(&self, caller: &'static str) -> Result<UnitOfWork> {
        let start = Instant::now();
        tracing::debug!(caller = caller, "Connection acquisition requested");

        let tx = self.pool.begin_with(BEGIN_WRITE).await?;

        let wait_ms = start.elapsed().as_millis();
        if wait_ms > SLOW_ACQUIRE_MS {
            tracing::warn!(
                caller = caller,
                wait_ms = wait_ms,
                "Slow connection acquisition, pool may be saturated"
            );
        } else {
            tracing::debug!(caller = caller, wait_ms = wait_ms, "Connection acquired");
        }

        Ok(UnitOfWork {
            tx: Some(tx),
            caller,
            acquired_at: Instant::now(),
            outbox: Vec::new(),
        })
    }
}

/// Scoped transaction with a post-commit event outbox
pub struct UnitOfWork {
    tx: Option<Transaction<'static, Sqlite>>,
    caller: &'static str,
    acquired_at: Instant,
    outbox: Vec<WmpEvent>,
}

impl UnitOfWork {
    /// Connection to run statements on
    pub fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| Error::Internal("Unit of work already finished".to_string()))
    }

    /// Queue an event for publication after commit
    pub fn record(&mut self, event: WmpEvent) {
        self.outbox.push(event);
    }

    /// Events queued so far
    pub fn pending_events(&self) -> &[WmpEvent] {
        &self.outbox
    }

    pub fn caller(&self) -> &'static str {
        self.caller
    }

    /// Commit and hand back the events that are now safe to publish
    pub async fn commit(mut self) -> Result<Vec<WmpEvent>> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::Internal("Unit of work already finished".to_string()))?;

        tx.commit().await?;

        let held_ms = self.acquired_at.elapsed().as_millis();
        if held_ms > LONG_TRANSACTION_MS {
            tracing::warn!(
                caller = self.caller,
                held_ms = held_ms,
                "Long transaction committed"
            );
        } else {
            tracing::debug!(caller = self.caller, held_ms = held_ms, "Connection released (commit)");
        }

        Ok(std::mem::take(&mut self.outbox))
    }

    /// Roll back explicitly, discarding queued events
    pub async fn rollback(mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::Internal("Unit of work already finished".to_string()))?;

        tx.rollback().await?;
        self.outbox.clear();

        tracing::debug!(
            caller = self.caller,
            held_ms = self.acquired_at.elapsed().as_millis(),
            "Connection released (rollback)"
        );

        Ok(())
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        // sqlx rolls the transaction back when it is dropped unfinished
        if self.tx.is_some() {
            tracing::debug!(
                caller = self.caller,
                held_ms = self.acquired_at.elapsed().as_millis(),
                discarded_events = self.outbox.len(),
                "Unit of work dropped without commit, rolling back"
            );
        }
    }
}
