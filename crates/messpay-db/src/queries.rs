//! Database query functions organized by table.

pub mod merchants;
pub mod orders;
pub mod payouts;
pub mod settings;
