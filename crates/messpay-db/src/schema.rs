//! SQL schema definitions.

/// Complete schema for messpay v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Merchant directory
-- ============================================================

CREATE TABLE IF NOT EXISTS merchants (
    id TEXT PRIMARY KEY,
    legacy_id INTEGER UNIQUE,
    name TEXT NOT NULL,
    location TEXT NOT NULL DEFAULT '',
    owner_name TEXT,
    owner_email TEXT,
    payout_status TEXT NOT NULL DEFAULT 'Pending'
);

CREATE INDEX IF NOT EXISTS idx_merchants_name ON merchants(name);

-- ============================================================
-- Order snapshot (written by the order subsystem, read-only here)
-- ============================================================

CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    merchant_ref TEXT,
    merchant_name TEXT,
    total_amount INTEGER,
    status TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_status_created ON orders(status, created_at);

CREATE TABLE IF NOT EXISTS order_items (
    order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    unit_price INTEGER NOT NULL,
    quantity INTEGER NOT NULL,
    PRIMARY KEY (order_id, position)
);

-- ============================================================
-- Payout ledger. Rows are never deleted.
-- ============================================================

CREATE TABLE IF NOT EXISTS payouts (
    merchant_key TEXT NOT NULL,
    settlement_cycle TEXT NOT NULL,
    merchant_id TEXT,
    merchant_name TEXT NOT NULL,
    resolved INTEGER NOT NULL,
    total_orders INTEGER NOT NULL,
    total_revenue INTEGER NOT NULL,
    commission_rate_bps INTEGER NOT NULL,
    commission INTEGER NOT NULL,
    payable INTEGER NOT NULL,
    payout_status TEXT NOT NULL DEFAULT 'Pending'
        CHECK (payout_status IN ('Pending', 'Paid')),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (merchant_key, settlement_cycle),
    CHECK (commission + payable = total_revenue)
);

CREATE INDEX IF NOT EXISTS idx_payouts_cycle ON payouts(settlement_cycle);

CREATE TRIGGER IF NOT EXISTS payouts_no_delete
BEFORE DELETE ON payouts
BEGIN
    SELECT RAISE(ABORT, 'payout rows are append-only');
END;

-- ============================================================
-- Settings
-- ============================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
