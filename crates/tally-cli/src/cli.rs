//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Personal finance dashboard with premium AI reports
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Personal finance dashboard with subscription-gated AI reports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    ///
    /// Requires STRIPE_WEBHOOK_SECRET and STRIPE_SECRET_KEY. The identity
    /// provider is Clerk (CLERK_SECRET_KEY) unless --dev-identity is given.
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires an API key (TALLY_API_KEYS) and a user id header.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Keep entitlements in memory instead of Clerk (lost on restart)
        #[arg(long)]
        dev_identity: bool,
    },

    /// Manage transactions (list, add, delete)
    Transactions {
        /// User the transactions belong to
        #[arg(short, long, default_value = "local-dev", global = true)]
        user: String,

        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// Show the monthly dashboard
    Dashboard {
        /// User to summarize
        #[arg(short, long, default_value = "local-dev")]
        user: String,

        /// Month as MM or YYYY-MM (default: current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Year for a bare MM month (default: current year)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Generate a premium AI report (requires CLERK_SECRET_KEY and OPENAI_API_KEY)
    Report {
        /// User to report on
        #[arg(short, long)]
        user: String,

        /// Month as MM or YYYY-MM (default: current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Year for a bare MM month (default: current year)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Billing webhook tools for local testing
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List recent transactions
    List {
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Number of transactions to skip
        #[arg(long, default_value = "0")]
        offset: i64,
    },
    /// Record a transaction
    Add {
        /// Description
        #[arg(short, long)]
        name: String,

        /// deposit, expense, or investment
        #[arg(short, long)]
        kind: String,

        /// Positive amount
        #[arg(short, long)]
        amount: f64,

        /// housing, transportation, food, entertainment, health, utility, salary, education, other
        #[arg(short, long, default_value = "other")]
        category: String,

        /// credit_card, debit_card, bank_transfer, bank_slip, cash, pix, other
        #[arg(long, default_value = "other")]
        payment_method: String,

        /// Date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Delete a transaction by ID
    Delete {
        /// Transaction ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum WebhookAction {
    /// Print a signature header for a payload file
    Sign {
        /// JSON payload file
        file: PathBuf,

        /// Signing timestamp (Unix seconds, default: now)
        #[arg(long)]
        timestamp: Option<i64>,

        /// Signing secret (default: STRIPE_WEBHOOK_SECRET)
        #[arg(long)]
        secret: Option<String>,
    },
    /// Check a payload file against a signature header and show the parsed event
    Verify {
        /// JSON payload file
        file: PathBuf,

        /// Signature header value (t=...,v1=...)
        #[arg(long)]
        header: String,

        /// Signing secret (default: STRIPE_WEBHOOK_SECRET)
        #[arg(long)]
        secret: Option<String>,

        /// Timestamp tolerance in seconds (0 disables the check)
        #[arg(long, default_value = "300")]
        tolerance: i64,
    },
}
