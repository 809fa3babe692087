//! Merchant directory queries.

use rusqlite::{Connection, OptionalExtension, Row};

use messpay_types::{LegacyId, Merchant, MerchantId, PayoutStatus};

use crate::{constraint_error, parse_column, Result};

const COLUMNS: &str = "id, legacy_id, name, location, owner_name, owner_email, payout_status";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Merchant> {
    Ok(Merchant {
        id: parse_column(row, 0)?,
        legacy_id: row.get::<_, Option<i64>>(1)?.map(|v| LegacyId(v as u64)),
        name: row.get(2)?,
        location: row.get(3)?,
        owner_name: row.get(4)?,
        owner_email: row.get(5)?,
        payout_status: parse_column(row, 6)?,
    })
}

/// Insert a merchant. Duplicate ids or legacy ids are constraint errors.
pub fn insert(conn: &Connection, merchant: &Merchant) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO merchants ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        rusqlite::params![
            merchant.id.as_str(),
            merchant.legacy_id.map(|l| l.0 as i64),
            merchant.name,
            merchant.location,
            merchant.owner_name,
            merchant.owner_email,
            merchant.payout_status.as_str(),
        ],
    )
    .map_err(|e| constraint_error(e, &format!("merchant {}", merchant.id)))?;
    Ok(())
}

/// Every merchant, ordered by id.
pub fn all(conn: &Connection) -> Result<Vec<Merchant>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM merchants ORDER BY id"))?;
    let rows = stmt
        .query_map([], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn by_id(conn: &Connection, id: &MerchantId) -> Result<Option<Merchant>> {
    let merchant = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM merchants WHERE id = ?1"),
            [id.as_str()],
            from_row,
        )
        .optional()?;
    Ok(merchant)
}

pub fn by_legacy_id(conn: &Connection, legacy_id: LegacyId) -> Result<Option<Merchant>> {
    let merchant = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM merchants WHERE legacy_id = ?1"),
            [legacy_id.0 as i64],
            from_row,
        )
        .optional()?;
    Ok(merchant)
}

/// Exact, case-sensitive name match. Names are not unique; the lowest id
/// wins.
pub fn by_name(conn: &Connection, name: &str) -> Result<Option<Merchant>> {
    let merchant = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM merchants WHERE name = ?1 ORDER BY id LIMIT 1"),
            [name],
            from_row,
        )
        .optional()?;
    Ok(merchant)
}

/// Mirror a payout status onto the merchant record. Returns `false` when
/// no merchant has that id.
pub fn set_payout_status(conn: &Connection, id: &MerchantId, status: PayoutStatus) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE merchants SET payout_status = ?1 WHERE id = ?2",
        rusqlite::params![status.as_str(), id.as_str()],
    )?;
    Ok(updated == 1)
}
