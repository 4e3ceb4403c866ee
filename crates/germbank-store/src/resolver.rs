//! Natural-key resolution against the store
//!
//! A resolver is filled once per run from the store and then answers from
//! memory. Reference entities missing from the store are created on
//! demand; subject entities must already exist.

#![allow(clippy::result_large_err)]

use rusqlite::{Connection, Params, Row};

use crate::cache::{KeyCache, NaturalKey};
use crate::errors::{from_rusqlite, unresolved, Result};
use crate::table::Table;

/// Outcome of [`Resolver::resolve_or_create`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The key was already known; nothing was written
    Found(i64),
    /// A row was inserted for the key
    Created(i64),
}

impl Resolution {
    pub fn id(self) -> i64 {
        match self {
            Resolution::Found(id) | Resolution::Created(id) => id,
        }
    }

    pub fn is_created(self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

/// Run a `(key, id)` query into a cache
pub(crate) fn fill_cache<K, P, F>(
    cache: &mut KeyCache<K>,
    table: Table,
    conn: &Connection,
    sql: &str,
    params: P,
    map: F,
) -> Result<usize>
where
    K: NaturalKey,
    P: Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<(K, i64)>,
{
    let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
    let rows = stmt.query_map(params, map).map_err(from_rusqlite)?;

    let mut count = 0;
    for row in rows {
        let (key, id) = row.map_err(from_rusqlite)?;
        cache.insert(key, id);
        count += 1;
    }

    tracing::debug!(table = %table, rows = count, "Preloaded natural keys");
    Ok(count)
}

/// Resolves natural keys of one table to ids
#[derive(Debug)]
pub struct Resolver<K> {
    table: Table,
    cache: KeyCache<K>,
}

impl<K: NaturalKey> Resolver<K> {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            cache: KeyCache::new(),
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn cache(&self) -> &KeyCache<K> {
        &self.cache
    }

    /// Fill the cache from a query returning one row per existing entity
    ///
    /// Returns the number of rows read.
    ///
    /// # Errors
    ///
    /// `ERR_PERSISTENCE` when the query fails.
    pub fn preload<P, F>(&mut self, conn: &Connection, sql: &str, params: P, map: F) -> Result<usize>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<(K, i64)>,
    {
        fill_cache(&mut self.cache, self.table, conn, sql, params, map)
    }

    pub fn lookup(&self, key: &K) -> Option<i64> {
        self.cache.get(key)
    }

    /// Id of a reference entity, inserting it through `create` when unknown
    ///
    /// `create` runs at most once per distinct key per run.
    ///
    /// # Errors
    ///
    /// Whatever `create` returns.
    pub fn resolve_or_create<F>(&mut self, key: K, create: F) -> Result<Resolution>
    where
        F: FnOnce(&K) -> Result<i64>,
    {
        if let Some(id) = self.cache.get(&key) {
            return Ok(Resolution::Found(id));
        }

        let id = create(&key)?;
        self.cache.insert(key, id);
        Ok(Resolution::Created(id))
    }

    /// Id of a subject entity that must already exist
    ///
    /// # Errors
    ///
    /// `ERR_UNRESOLVED_REFERENCE` naming the table and key.
    pub fn require(&self, key: &K) -> Result<i64> {
        self.cache
            .get(key)
            .ok_or_else(|| unresolved(self.table.name(), key.describe()))
    }

    /// Record an id assigned outside [`Resolver::resolve_or_create`]
    pub fn remember(&mut self, key: K, id: i64) {
        self.cache.insert(key, id);
    }
}
