//! Daemon settings: a small key/value table.

use rusqlite::Connection;

use messpay_types::{SettlementCycle, Timestamp};

use crate::{DbError, Result};

/// Cycle of the last scheduled report run, empty before the first.
pub const LAST_PRECOMPUTED_CYCLE: &str = "last_precomputed_cycle";
/// Unix time of the last scheduled report run.
pub const LAST_PRECOMPUTED_AT: &str = "last_precomputed_at";

/// Get a setting value by key.
pub fn get(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("setting '{key}'")),
        other => DbError::Sqlite(other),
    })
}

pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// Record a completed scheduled report run.
pub fn record_precompute(conn: &Connection, cycle: &SettlementCycle, at: Timestamp) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    set(&tx, LAST_PRECOMPUTED_CYCLE, &cycle.to_string())?;
    set(&tx, LAST_PRECOMPUTED_AT, &at.to_string())?;
    tx.commit()?;
    Ok(())
}

/// The last scheduled report run, if any.
pub fn last_precompute(conn: &Connection) -> Result<Option<(SettlementCycle, Timestamp)>> {
    let cycle = match get(conn, LAST_PRECOMPUTED_CYCLE) {
        Ok(v) if v.is_empty() => return Ok(None),
        Ok(v) => v
            .parse::<SettlementCycle>()
            .map_err(|e| DbError::Serialization(e.to_string()))?,
        Err(DbError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e),
    };
    let at = get(conn, LAST_PRECOMPUTED_AT)?
        .parse::<Timestamp>()
        .map_err(|e| DbError::Serialization(e.to_string()))?;
    Ok(Some((cycle, at)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_defaults_present() {
        let conn = test_db();
        assert_eq!(get(&conn, LAST_PRECOMPUTED_AT).expect("get"), "0");
        assert_eq!(last_precompute(&conn).expect("last"), None);
    }

    #[test]
    fn test_get_nonexistent() {
        let conn = test_db();
        assert!(matches!(get(&conn, "nonexistent"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_record_precompute() {
        let conn = test_db();
        let cycle: SettlementCycle = "2025-03-C2".parse().expect("cycle");
        record_precompute(&conn, &cycle, 1_741_700_000).expect("record");
        assert_eq!(last_precompute(&conn).expect("last"), Some((cycle, 1_741_700_000)));
    }

    #[test]
    fn test_corrupt_cycle_is_serialization_error() {
        let conn = test_db();
        set(&conn, LAST_PRECOMPUTED_CYCLE, "march").expect("set");
        assert!(matches!(last_precompute(&conn), Err(DbError::Serialization(_))));
    }
}
