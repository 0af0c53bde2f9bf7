//! Tally CLI - Personal finance dashboard
//!
//! Usage:
//!   tally init                        Initialize database
//!   tally transactions add ...        Record a transaction
//!   tally dashboard --month 03        Show a monthly summary
//!   tally serve --port 3000           Start web server
//!   tally webhook sign payload.json   Sign a test billing event

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
            dev_identity,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                static_dir.as_deref(),
                dev_identity,
            )
            .await
        }
        Commands::Transactions { user, action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_transactions_list(&db, &user, 20, 0),
                Some(TransactionsAction::List { limit, offset }) => {
                    commands::cmd_transactions_list(&db, &user, limit, offset)
                }
                Some(TransactionsAction::Add {
                    name,
                    kind,
                    amount,
                    category,
                    payment_method,
                    date,
                }) => {
                    let tx = commands::parse_new_transaction(
                        &name,
                        &kind,
                        amount,
                        &category,
                        &payment_method,
                        date.as_deref(),
                    )?;
                    let plan = commands::lookup_plan(&user).await?;
                    commands::cmd_transactions_add(&db, &user, plan, &tx)?;
                    Ok(())
                }
                Some(TransactionsAction::Delete { id }) => {
                    commands::cmd_transactions_delete(&db, &user, id)
                }
            }
        }
        Commands::Dashboard { user, month, year } => {
            let db = commands::open_db(&cli.db)?;
            let period = commands::resolve_month(month.as_deref(), year)?;
            commands::cmd_dashboard(&db, &user, period)?;
            Ok(())
        }
        Commands::Report { user, month, year } => {
            let db = commands::open_db(&cli.db)?;
            let period = commands::resolve_month(month.as_deref(), year)?;
            commands::cmd_report(db, &user, period).await
        }
        Commands::Webhook { action } => match action {
            WebhookAction::Sign {
                file,
                timestamp,
                secret,
            } => {
                let secret = commands::webhook_secret(secret)?;
                let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());
                let header = commands::cmd_webhook_sign(&file, &secret, timestamp)?;
                println!("{}", header);
                Ok(())
            }
            WebhookAction::Verify {
                file,
                header,
                secret,
                tolerance,
            } => {
                let secret = commands::webhook_secret(secret)?;
                commands::cmd_webhook_verify(&file, &header, &secret, tolerance)?;
                Ok(())
            }
        },
    }
}
