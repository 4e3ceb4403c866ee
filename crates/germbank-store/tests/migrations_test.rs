// Integration tests for the migration framework

use rusqlite::Connection;

fn setup_test_db() -> Connection {
    Connection::open_in_memory().expect("Failed to create in-memory database")
}

fn get_table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn test_apply_migrations_on_empty_db() {
    // Given: An empty SQLite database
    let mut conn = setup_test_db();

    // When: Migrations are applied
    let result = germbank_store::migrations::apply_migrations(&mut conn);

    // Then: All migrations succeed and every import table exists
    assert!(
        result.is_ok(),
        "Migrations should succeed: {:?}",
        result.err()
    );

    let tables = get_table_names(&conn);
    assert!(tables.contains(&"schema_version".to_string()));
    for table in germbank_store::Table::ALL {
        assert!(
            tables.contains(&table.name().to_string()),
            "Missing table: {}",
            table
        );
    }
}

#[test]
fn test_migrations_recorded_in_order() {
    let mut conn = setup_test_db();
    germbank_store::migrations::apply_migrations(&mut conn).unwrap();

    let applied = germbank_store::migrations::applied_migrations(&conn).unwrap();
    let expected: Vec<String> = germbank_store::migrations::migration_ids()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(applied, expected);
}

#[test]
fn test_country_reference_data_seeded() {
    let mut conn = setup_test_db();
    germbank_store::migrations::apply_migrations(&mut conn).unwrap();

    let (unknown2, unknown3): (String, String) = conn
        .query_row(
            "SELECT country_code2, country_code3 FROM countries WHERE country_name = 'Unknown country'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(unknown2, "UN");
    assert_eq!(unknown3, "UNK");

    let gbr: String = conn
        .query_row(
            "SELECT country_code3 FROM countries WHERE country_code2 = 'GB'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(gbr, "GBR");
}

#[test]
fn test_reapplying_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("germbank.db");

    {
        let mut conn = Connection::open(&path).unwrap();
        germbank_store::migrations::apply_migrations(&mut conn).unwrap();
        conn.execute("INSERT INTO treatments (name) VALUES ('drought')", [])
            .unwrap();
    }

    let mut conn = Connection::open(&path).unwrap();
    germbank_store::migrations::apply_migrations(&mut conn).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM treatments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}
