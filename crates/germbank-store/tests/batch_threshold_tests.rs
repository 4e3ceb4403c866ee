// Batch writer flush behaviour over arbitrary row counts and thresholds

#![allow(clippy::unwrap_used, clippy::expect_used)]

use germbank_store::repo::AttributeDataRow;
use germbank_store::{db, migrations, BatchWriter};
use proptest::prelude::*;
use rusqlite::Connection;

fn setup_test_db() -> (Connection, i64, i64) {
    let mut conn = db::open_in_memory().unwrap();
    migrations::apply_migrations(&mut conn).unwrap();
    conn.execute_batch(
        "INSERT INTO attributes (name) VALUES ('Remarks');
         INSERT INTO accessions (general_identifier, name) VALUES ('ACC-1', 'ACC-1');",
    )
    .unwrap();
    (conn, 1, 1)
}

fn row(attribute_id: i64, accession_id: i64, i: usize) -> AttributeDataRow {
    AttributeDataRow {
        attribute_id,
        accession_id,
        value: format!("value {}", i),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_flush_count_and_sizes(n in 0usize..120, threshold in 1usize..25) {
        let (mut conn, attribute_id, accession_id) = setup_test_db();
        let mut writer = BatchWriter::new(threshold);

        for i in 0..n {
            writer.write(&mut conn, row(attribute_id, accession_id, i)).unwrap();
        }
        writer.flush(&mut conn).unwrap();

        let sizes = writer.flush_sizes().to_vec();
        prop_assert_eq!(sizes.len(), n.div_ceil(threshold));
        prop_assert_eq!(sizes.iter().sum::<usize>(), n);
        if let Some((last, full)) = sizes.split_last() {
            prop_assert!(full.iter().all(|s| *s == threshold));
            let remainder = if n % threshold == 0 { threshold } else { n % threshold };
            prop_assert_eq!(*last, remainder);
        }

        let stored: i64 = conn
            .query_row("SELECT COUNT(*) FROM attribute_data", [], |r| r.get(0))
            .unwrap();
        prop_assert_eq!(stored as usize, n);
    }

    #[test]
    fn prop_second_pass_writes_nothing(n in 1usize..60, threshold in 1usize..10) {
        let (mut conn, attribute_id, accession_id) = setup_test_db();

        let mut first = BatchWriter::new(threshold);
        for i in 0..n {
            first.write(&mut conn, row(attribute_id, accession_id, i)).unwrap();
        }
        first.flush(&mut conn).unwrap();

        let mut second: BatchWriter<AttributeDataRow> = BatchWriter::new(threshold);
        germbank_store::repo::facts::preload_attribute_data(&mut second, &conn).unwrap();
        for i in 0..n {
            second.write(&mut conn, row(attribute_id, accession_id, i)).unwrap();
        }
        second.flush(&mut conn).unwrap();

        prop_assert!(second.flush_sizes().is_empty());
        let stored: i64 = conn
            .query_row("SELECT COUNT(*) FROM attribute_data", [], |r| r.get(0))
            .unwrap();
        prop_assert_eq!(stored as usize, n);
    }
}

#[test]
fn test_empty_flush_is_not_counted() {
    let (mut conn, _, _) = setup_test_db();
    let mut writer: BatchWriter<AttributeDataRow> = BatchWriter::new(5);
    assert!(writer.flush(&mut conn).unwrap().is_empty());
    assert!(writer.flush_sizes().is_empty());
}
