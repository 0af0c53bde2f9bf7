//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, month and plan resolution)
//! - `dashboard` - Monthly dashboard summary
//! - `report` - Premium AI report
//! - `serve` - Web server command
//! - `transactions` - Transaction commands (list, add, delete)
//! - `webhook` - Billing webhook signing and verification

pub mod core;
pub mod dashboard;
pub mod report;
pub mod serve;
pub mod transactions;
pub mod webhook;

// Re-export command functions for main.rs
pub use self::core::*;
pub use dashboard::*;
pub use report::*;
pub use serve::*;
pub use transactions::*;
pub use webhook::*;
