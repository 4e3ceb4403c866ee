//! Undo of everything an importer run created

#![allow(clippy::result_large_err)]

use std::collections::BTreeMap;
use std::time::Instant;

use germbank_core::ExError;
use germbank_core_types::schema::EVENT_ROLLBACK;
use rusqlite::Connection;

use crate::errors::rollback_error;
use crate::table::Table;

/// Ids bound into one `DELETE ... WHERE id IN (...)`
const DELETE_CHUNK: usize = 500;

/// What [`RollbackTracker::delete_created`] managed to remove
#[derive(Debug, Default)]
pub struct RollbackReport {
    pub deleted: BTreeMap<Table, usize>,
    pub failures: Vec<ExError>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_deleted(&self) -> usize {
        self.deleted.values().sum()
    }

    pub fn merge(&mut self, other: RollbackReport) {
        for (table, n) in other.deleted {
            *self.deleted.entry(table).or_insert(0) += n;
        }
        self.failures.extend(other.failures);
    }
}

/// Ids created per table, in creation order
#[derive(Debug, Default, Clone)]
pub struct RollbackTracker {
    created: BTreeMap<Table, Vec<i64>>,
}

impl RollbackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, table: Table, id: i64) {
        self.created.entry(table).or_default().push(id);
    }

    pub fn track_all(&mut self, table: Table, ids: impl IntoIterator<Item = i64>) {
        self.created.entry(table).or_default().extend(ids);
    }

    /// Take over everything another tracker recorded
    pub fn merge(&mut self, other: RollbackTracker) {
        for (table, ids) in other.created {
            self.track_all(table, ids);
        }
    }

    pub fn ids(&self, table: Table) -> &[i64] {
        self.created.get(&table).map_or(&[], Vec::as_slice)
    }

    /// Number of rows created per table
    pub fn counts(&self) -> BTreeMap<Table, usize> {
        self.created
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(table, ids)| (*table, ids.len()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.created.values().all(Vec::is_empty)
    }

    pub fn reset(&mut self) {
        self.created.clear();
    }

    /// Delete every tracked row, facts first
    ///
    /// Tables go in descending dependency rank; within a table the newest
    /// ids go first, so plot accessions disappear before their parents.
    /// A failing delete is recorded in the report and the remaining
    /// deletes still run. Successfully deleted ids are forgotten; ids whose
    /// delete failed stay tracked.
    pub fn delete_created(&mut self, conn: &Connection) -> RollbackReport {
        let started = Instant::now();
        let mut report = RollbackReport::default();

        let mut tables: Vec<Table> = self.created.keys().copied().collect();
        tables.sort_by_key(|t| std::cmp::Reverse(t.dependency_rank()));

        for table in tables {
            let Some(mut ids) = self.created.remove(&table) else {
                continue;
            };
            ids.reverse();

            let mut failed = Vec::new();
            let mut deleted = 0;
            for chunk in ids.chunks(DELETE_CHUNK) {
                match delete_chunk(conn, table, chunk) {
                    Ok(n) => deleted += n,
                    Err(e) => {
                        tracing::warn!(table = table.name(), error = %e, "Rollback delete failed");
                        report.failures.push(rollback_error(table.name(), e));
                        failed.extend_from_slice(chunk);
                    }
                }
            }

            if deleted > 0 {
                report.deleted.insert(table, deleted);
            }
            if !failed.is_empty() {
                failed.reverse();
                self.created.insert(table, failed);
            }
        }

        tracing::info!(
            component = module_path!(),
            op = "delete_created",
            event = EVENT_ROLLBACK,
            deleted = report.total_deleted(),
            failures = report.failures.len(),
            duration_ms = started.elapsed().as_millis() as u64,
        );

        report
    }
}

fn delete_chunk(conn: &Connection, table: Table, ids: &[i64]) -> rusqlite::Result<usize> {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("DELETE FROM {} WHERE id IN ({})", table.name(), placeholders);
    conn.execute(&sql, rusqlite::params_from_iter(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::migrations::apply_migrations;

    fn setup_test_db() -> Connection {
        let mut conn = open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        conn
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_deletes_facts_before_references() {
        let conn = setup_test_db();
        let mut tracker = RollbackTracker::new();

        conn.execute("INSERT INTO units (unit_name) VALUES ('mg')", [])
            .unwrap();
        let unit = conn.last_insert_rowid();
        conn.execute("INSERT INTO compounds (name, unit_id) VALUES ('caffeine', ?1)", [unit])
            .unwrap();
        let compound = conn.last_insert_rowid();

        // tracked in creation order; foreign keys would reject unit-first deletes
        tracker.track(Table::Units, unit);
        tracker.track(Table::Compounds, compound);

        let report = tracker.delete_created(&conn);
        assert!(report.is_clean(), "{:?}", report.failures);
        assert_eq!(report.total_deleted(), 2);
        assert_eq!(count(&conn, "units"), 0);
        assert_eq!(count(&conn, "compounds"), 0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_child_accessions_deleted_before_parents() {
        let conn = setup_test_db();
        let mut tracker = RollbackTracker::new();

        conn.execute(
            "INSERT INTO accessions (general_identifier, name) VALUES ('P', 'P')",
            [],
        )
        .unwrap();
        let parent = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO accessions (general_identifier, name, entity_type, entity_parent_id)
             VALUES ('P-1-1', 'P-1-1', 'plant_plot', ?1)",
            [parent],
        )
        .unwrap();
        let plot = conn.last_insert_rowid();
        tracker.track_all(Table::Accessions, [parent, plot]);

        let report = tracker.delete_created(&conn);
        assert!(report.is_clean(), "{:?}", report.failures);
        assert_eq!(count(&conn, "accessions"), 0);
    }

    #[test]
    fn test_failure_does_not_stop_other_tables() {
        let conn = setup_test_db();
        let mut tracker = RollbackTracker::new();

        conn.execute("INSERT INTO treatments (name) VALUES ('dry')", [])
            .unwrap();
        let treatment = conn.last_insert_rowid();
        conn.execute("INSERT INTO units (unit_name) VALUES ('kg')", [])
            .unwrap();
        let unit = conn.last_insert_rowid();
        // a phenotype created by someone else still points at the unit
        conn.execute("INSERT INTO phenotypes (name, unit_id) VALUES ('yield', ?1)", [unit])
            .unwrap();

        tracker.track(Table::Units, unit);
        tracker.track(Table::Treatments, treatment);

        let report = tracker.delete_created(&conn);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].table(), Some("units"));
        assert_eq!(count(&conn, "treatments"), 0);
        assert_eq!(tracker.ids(Table::Units), &[unit]);
    }

    #[test]
    fn test_large_batches_are_chunked() {
        let conn = setup_test_db();
        let mut tracker = RollbackTracker::new();
        for i in 0..(DELETE_CHUNK * 2 + 3) {
            conn.execute("INSERT INTO treatments (name) VALUES (?1)", [format!("t{}", i)])
                .unwrap();
            tracker.track(Table::Treatments, conn.last_insert_rowid());
        }

        let report = tracker.delete_created(&conn);
        assert_eq!(report.deleted.get(&Table::Treatments), Some(&(DELETE_CHUNK * 2 + 3)));
        assert_eq!(count(&conn, "treatments"), 0);
    }

    #[test]
    fn test_merge_and_reset() {
        let mut a = RollbackTracker::new();
        a.track(Table::Units, 1);
        let mut b = RollbackTracker::new();
        b.track_all(Table::Units, [2, 3]);
        b.track(Table::Compounds, 9);

        a.merge(b);
        assert_eq!(a.ids(Table::Units), &[1, 2, 3]);
        assert_eq!(a.counts().get(&Table::Compounds), Some(&1));

        a.reset();
        assert!(a.is_empty());
    }
}
