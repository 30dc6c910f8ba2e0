//! itemflow - item migration and CSV import for hierarchical record stores
//!
//! Moves a filtered, de-duplicated subset of items from one app of a remote
//! record store into another, attaching a derived follow-up task to each
//! migrated item, and alternatively seeds an app from a CSV export.

pub mod config;
pub mod error;
pub mod gateway;
pub mod import;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod session;
