//! Order snapshot queries.
//!
//! Orders belong to the order subsystem. The settlement engine only reads
//! them; `insert` exists for seeding and tests.

use std::collections::HashMap;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use messpay_types::{Order, OrderItem, OrderStatus, Timestamp};

use crate::{constraint_error, Result};

/// Insert an order with its items.
pub fn insert(conn: &Connection, order: &Order) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO orders (id, merchant_ref, merchant_name, total_amount, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            order.id,
            order.merchant_ref,
            order.merchant_name,
            order.total_amount,
            order.status.as_str(),
            order.created_at as i64,
        ],
    )
    .map_err(|e| constraint_error(e, &format!("order {}", order.id)))?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO order_items (order_id, position, name, unit_price, quantity)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (position, item) in order.items.iter().enumerate() {
            stmt.execute(rusqlite::params![
                order.id,
                position as i64,
                item.name,
                item.unit_price,
                item.quantity,
            ])?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// Orders whose status is in `statuses` and whose timestamp is in
/// `[start, end)`, with their items, ordered by timestamp.
///
/// Statuses are compared case-insensitively, and `cash-pending` also
/// matches the order subsystem's `Pending (COD)` spelling.
pub fn eligible_in_range(
    conn: &Connection,
    statuses: &[&str],
    start: Timestamp,
    end: Timestamp,
) -> Result<Vec<Order>> {
    if statuses.is_empty() || start >= end {
        return Ok(Vec::new());
    }

    let spellings: Vec<String> = statuses.iter().flat_map(|s| spellings(s)).collect();
    let placeholders = vec!["?"; spellings.len()].join(", ");
    let filter = format!(
        "lower(trim(status)) IN ({placeholders}) AND created_at >= ? AND created_at < ?"
    );
    let params: Vec<Value> = spellings
        .into_iter()
        .map(Value::Text)
        .chain([Value::Integer(start as i64), Value::Integer(end as i64)])
        .collect();

    let mut items = items_matching(conn, &filter, &params)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT id, merchant_ref, merchant_name, total_amount, status, created_at
         FROM orders WHERE {filter} ORDER BY created_at, id"
    ))?;
    let orders = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            let id: String = row.get(0)?;
            Ok(Order {
                items: items.remove(&id).unwrap_or_default(),
                id,
                merchant_ref: row.get(1)?,
                merchant_name: row.get(2)?,
                total_amount: row.get(3)?,
                status: OrderStatus::parse(&row.get::<_, String>(4)?),
                created_at: row.get::<_, i64>(5)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(orders)
}

fn spellings(status: &str) -> Vec<String> {
    let status = status.trim().to_ascii_lowercase();
    if OrderStatus::parse(&status) == OrderStatus::CashPending {
        ["cash-pending", "cash_pending", "pending (cod)"]
            .map(String::from)
            .to_vec()
    } else {
        vec![status]
    }
}

fn items_matching(
    conn: &Connection,
    filter: &str,
    params: &[Value],
) -> Result<HashMap<String, Vec<OrderItem>>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT order_id, name, unit_price, quantity FROM order_items
         WHERE order_id IN (SELECT id FROM orders WHERE {filter})
         ORDER BY order_id, position"
    ))?;
    let mut rows = stmt.query(params_from_iter(params.iter()))?;

    let mut items: HashMap<String, Vec<OrderItem>> = HashMap::new();
    while let Some(row) = rows.next()? {
        items.entry(row.get(0)?).or_default().push(OrderItem {
            name: row.get(1)?,
            unit_price: row.get(2)?,
            quantity: row.get(3)?,
        });
    }
    Ok(items)
}
