//! Schema setup.
//!
//! The schema version lives in `PRAGMA user_version`. A fresh database
//! gets the whole schema, the precompute bookkeeping rows and its version
//! in one transaction. A database written by a newer build is refused.

use std::cmp::Ordering;

use rusqlite::Connection;

use crate::queries::settings;
use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// Bring the database to [`SCHEMA_VERSION`].
pub fn run(conn: &Connection) -> Result<()> {
    let found: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    match found.cmp(&SCHEMA_VERSION) {
        Ordering::Equal => Ok(()),
        Ordering::Greater => Err(DbError::Migration(format!(
            "database schema v{found} is newer than this build (v{SCHEMA_VERSION})"
        ))),
        Ordering::Less if found == 0 => initialize(conn),
        Ordering::Less => Err(DbError::Migration(format!(
            "no upgrade path from schema v{found} to v{SCHEMA_VERSION}"
        ))),
    }
}

fn initialize(conn: &Connection) -> Result<()> {
    tracing::info!(version = SCHEMA_VERSION, "creating payout ledger schema");
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(schema::SCHEMA_V1)?;
    settings::set(&tx, settings::LAST_PRECOMPUTED_CYCLE, "")?;
    settings::set(&tx, settings::LAST_PRECOMPUTED_AT, "0")?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch("PRAGMA foreign_keys = ON;").expect("pragma");
        conn
    }

    fn version(conn: &Connection) -> u32 {
        conn.pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("version")
    }

    #[test]
    fn test_fresh_database_gets_schema_and_settings() {
        let conn = fresh();
        run(&conn).expect("migrate");
        assert_eq!(version(&conn), SCHEMA_VERSION);
        assert_eq!(settings::last_precompute(&conn).expect("settings"), None);

        for table in ["merchants", "orders", "order_items", "payouts", "settings"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .expect("sqlite_master");
            assert_eq!(count, 1, "table '{table}' missing");
        }
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let conn = fresh();
        run(&conn).expect("first run");
        settings::set(&conn, settings::LAST_PRECOMPUTED_AT, "42").expect("set");
        run(&conn).expect("second run");
        assert_eq!(settings::get(&conn, settings::LAST_PRECOMPUTED_AT).expect("get"), "42");
    }

    #[test]
    fn test_newer_database_is_rejected() {
        let conn = fresh();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .expect("bump version");
        assert!(matches!(run(&conn), Err(DbError::Migration(_))));
    }
}
