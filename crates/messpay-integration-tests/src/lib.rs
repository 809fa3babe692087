//! Integration test crate for the settlement engine.
//!
//! This crate has no library code. Its tests run the seed, report, ledger
//! and status flow through `messpay-ledger` against an in-memory database.
//!
//! ```sh
//! cargo test -p messpay-integration-tests
//! ```
