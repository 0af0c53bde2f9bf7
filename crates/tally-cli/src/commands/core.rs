//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `resolve_month` / `lookup_plan` - Argument helpers shared by commands

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use tally_core::db::Database;
use tally_core::identity::{ClerkClient, IdentityStore, SubscriptionPlan};
use tally_core::models::MonthPeriod;
use tracing::debug;

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path)?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Record a transaction: tally transactions add --name Rent --kind expense --amount 1200 --category housing");
    println!("  2. Start web UI: tally serve");

    Ok(())
}

/// Resolve `--month` / `--year` into a period (default: current month)
pub fn resolve_month(month: Option<&str>, year: Option<i32>) -> Result<MonthPeriod> {
    let today = Utc::now().date_naive();
    let period = match (month, year) {
        (Some(month), year) => MonthPeriod::parse(month, year.unwrap_or(today.year()))?,
        (None, Some(year)) => MonthPeriod::new(year, today.month())?,
        (None, None) => MonthPeriod::containing(today),
    };
    Ok(period)
}

/// The user's plan from Clerk, or the free plan when Clerk is not configured
pub async fn lookup_plan(user_id: &str) -> Result<Option<SubscriptionPlan>> {
    let Some(clerk) = ClerkClient::from_env() else {
        debug!("CLERK_SECRET_KEY not set; assuming free plan");
        return Ok(None);
    };

    let entitlement = clerk
        .get_user_entitlement(user_id)
        .await
        .context("Failed to look up user plan")?;
    Ok(entitlement.and_then(|e| e.subscription_plan))
}

/// Truncate a string to max length with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
