//! Buffered fact-row inserts
//!
//! Fact rows are accumulated in memory and written in one transaction per
//! flush. Rows whose natural key is already in the store (per the preload)
//! or already waiting in the buffer are skipped, which is what makes a
//! repeated import of the same template write nothing.

#![allow(clippy::result_large_err)]

use std::collections::HashSet;

use germbank_core_types::schema::EVENT_FLUSH;
use rusqlite::{CachedStatement, Connection, Params, Row};

use crate::cache::{KeyCache, NaturalKey};
use crate::config::DEFAULT_BATCH_SIZE;
use crate::errors::{from_rusqlite, Result};
use crate::resolver::fill_cache;
use crate::table::Table;

/// A fact row with all foreign keys resolved to ids
pub trait BatchRow {
    type Key: NaturalKey;

    const TABLE: Table;

    /// Single-row insert; bound once per row through a cached statement
    const INSERT_SQL: &'static str;

    fn key(&self) -> Self::Key;

    /// Bind this row's values and execute the insert
    ///
    /// # Errors
    ///
    /// Any statement failure.
    fn insert(&self, stmt: &mut CachedStatement<'_>) -> rusqlite::Result<usize>;
}

/// Outcome of one [`BatchWriter::write`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Row added to the buffer
    Buffered,
    /// Row's key already exists or is already buffered
    Skipped,
    /// Row filled the buffer, which was flushed; holds the new ids
    Flushed(Vec<i64>),
}

/// Buffers rows of one fact table and flushes them at a threshold
#[derive(Debug)]
pub struct BatchWriter<R: BatchRow> {
    threshold: usize,
    buffer: Vec<R>,
    pending: HashSet<R::Key>,
    cache: KeyCache<R::Key>,
    flush_sizes: Vec<usize>,
}

impl<R: BatchRow> Default for BatchWriter<R> {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl<R: BatchRow> BatchWriter<R> {
    /// A writer flushing every `threshold` rows; zero is treated as one
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            buffer: Vec::new(),
            pending: HashSet::new(),
            cache: KeyCache::new(),
            flush_sizes: Vec::new(),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Rows waiting for the next flush
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Sizes of every non-empty flush so far, in order
    pub fn flush_sizes(&self) -> &[usize] {
        &self.flush_sizes
    }

    pub fn cache(&self) -> &KeyCache<R::Key> {
        &self.cache
    }

    /// Load the keys of rows already in the store
    ///
    /// # Errors
    ///
    /// `ERR_PERSISTENCE` when the query fails.
    pub fn preload<P, F>(&mut self, conn: &Connection, sql: &str, params: P, map: F) -> Result<usize>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<(R::Key, i64)>,
    {
        fill_cache(&mut self.cache, R::TABLE, conn, sql, params, map)
    }

    /// Buffer a row, flushing when the threshold is reached
    ///
    /// # Errors
    ///
    /// As [`BatchWriter::flush`].
    pub fn write(&mut self, conn: &mut Connection, row: R) -> Result<WriteOutcome> {
        let key = row.key();
        if self.cache.contains(&key) || self.pending.contains(&key) {
            return Ok(WriteOutcome::Skipped);
        }

        self.pending.insert(key);
        self.buffer.push(row);

        if self.buffer.len() >= self.threshold {
            return self.flush(conn).map(WriteOutcome::Flushed);
        }
        Ok(WriteOutcome::Buffered)
    }

    /// Insert every buffered row in one transaction
    ///
    /// Returns the ids assigned, in buffer order. An empty buffer is a
    /// no-op. The buffer is emptied whether or not the flush succeeds; on
    /// failure the transaction is rolled back and earlier flushes remain.
    ///
    /// # Errors
    ///
    /// `ERR_PERSISTENCE` naming the table and the key of the failing row.
    pub fn flush(&mut self, conn: &mut Connection) -> Result<Vec<i64>> {
        if self.buffer.is_empty() {
            return Ok(Vec::new());
        }

        let rows = std::mem::take(&mut self.buffer);
        self.pending.clear();

        let ids = insert_all(conn, &rows)?;

        for (row, id) in rows.iter().zip(&ids) {
            self.cache.insert(row.key(), *id);
        }
        self.flush_sizes.push(ids.len());

        tracing::info!(
            component = module_path!(),
            op = "flush",
            event = EVENT_FLUSH,
            table = R::TABLE.name(),
            flush_size = ids.len(),
        );

        Ok(ids)
    }
}

fn insert_all<R: BatchRow>(conn: &mut Connection, rows: &[R]) -> Result<Vec<i64>> {
    let tx = conn.transaction().map_err(from_rusqlite)?;
    let mut ids = Vec::with_capacity(rows.len());
    {
        let mut stmt = tx.prepare_cached(R::INSERT_SQL).map_err(from_rusqlite)?;
        for row in rows {
            row.insert(&mut stmt).map_err(|e| {
                from_rusqlite(e)
                    .with_op("flush")
                    .with_table(R::TABLE.name())
                    .with_natural_key(row.key().describe())
            })?;
            ids.push(tx.last_insert_rowid());
        }
    }
    tx.commit().map_err(from_rusqlite)?;
    Ok(ids)
}
