//! Embedded SQL migrations

pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All embedded migrations in application order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_reference_schema",
            sql: include_str!("../../migrations/001_reference_schema.sql"),
        },
        Migration {
            id: "002_fact_schema",
            sql: include_str!("../../migrations/002_fact_schema.sql"),
        },
        Migration {
            id: "003_countries",
            sql: include_str!("../../migrations/003_countries.sql"),
        },
        Migration {
            id: "004_marker_schema",
            sql: include_str!("../../migrations/004_marker_schema.sql"),
        },
    ]
}

pub fn migration_ids() -> Vec<&'static str> {
    get_migrations().into_iter().map(|m| m.id).collect()
}
