//! Per-run natural key → id maps

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// A value identifying a row by content rather than by id
///
/// Optional parts are `Option<_>`, so two absent parts compare equal, the
/// same way SQLite's `IS` matches two NULLs.
pub trait NaturalKey: Clone + Eq + Hash + Debug {
    /// Human-readable rendering used in error messages
    fn describe(&self) -> String {
        format!("{:?}", self)
    }
}

impl NaturalKey for String {
    fn describe(&self) -> String {
        self.clone()
    }
}

/// A float usable as a key part, compared by bit pattern
///
/// `-0.0` and `0.0` are distinct keys, as are differently encoded NaNs;
/// values read from the same template always encode identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyF64(u64);

impl KeyF64 {
    pub fn new(value: f64) -> Self {
        KeyF64(value.to_bits())
    }

    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl From<f64> for KeyF64 {
    fn from(value: f64) -> Self {
        KeyF64::new(value)
    }
}

/// Map from natural key to assigned id
///
/// One cache lives for one importer run. Nothing evicts entries: the cache
/// only grows with what the run preloads and creates.
#[derive(Debug, Clone)]
pub struct KeyCache<K> {
    ids: HashMap<K, i64>,
}

impl<K: NaturalKey> Default for KeyCache<K> {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
        }
    }
}

impl<K: NaturalKey> KeyCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<i64> {
        self.ids.get(key).copied()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.ids.contains_key(key)
    }

    /// Record an id; an existing entry for the key keeps its first id
    pub fn insert(&mut self, key: K, id: i64) {
        self.ids.entry(key).or_insert(id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
