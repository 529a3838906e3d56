use specrepo_core::db::migrations::latest_version;
use specrepo_core::db::{open_db, open_db_in_memory, DbError, Migration};
use specrepo_core::model::CUSTOMER_MIGRATIONS;
use rusqlite::Connection;

const TWO_STEPS: &[Migration] = &[
    Migration {
        version: 1,
        sql: "CREATE TABLE widgets (id INTEGER PRIMARY KEY, label TEXT NOT NULL);",
    },
    Migration {
        version: 2,
        sql: "ALTER TABLE widgets ADD COLUMN weight INTEGER;",
    },
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory(CUSTOMER_MIGRATIONS).unwrap();

    assert_eq!(schema_version(&conn), latest_version(CUSTOMER_MIGRATIONS));
    assert_table_exists(&conn, "customers");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("customers.db");

    let conn_first = open_db(&path, CUSTOMER_MIGRATIONS).unwrap();
    assert_eq!(schema_version(&conn_first), 1);
    drop(conn_first);

    let conn_second = open_db(&path, CUSTOMER_MIGRATIONS).unwrap();
    assert_eq!(schema_version(&conn_second), 1);
    assert_table_exists(&conn_second, "customers");
}

#[test]
fn only_pending_migrations_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("widgets.db");

    drop(open_db(&path, &TWO_STEPS[..1]).unwrap());
    let conn = open_db(&path, TWO_STEPS).unwrap();

    assert_eq!(schema_version(&conn), 2);
    conn.execute(
        "INSERT INTO widgets (id, label, weight) VALUES (1, 'bolt', 3);",
        [],
    )
    .unwrap();
}

#[test]
fn out_of_order_migrations_are_rejected() {
    let reversed = [TWO_STEPS[1], TWO_STEPS[0]];

    match open_db_in_memory(&reversed).unwrap_err() {
        DbError::InvalidMigrationOrder { previous, next } => {
            assert_eq!((previous, next), (2, 1));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, CUSTOMER_MIGRATIONS).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version(CUSTOMER_MIGRATIONS));
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
