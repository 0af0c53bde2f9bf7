//! Transaction command implementations

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use tally_core::db::Database;
use tally_core::identity::SubscriptionPlan;
use tally_core::models::{NewTransaction, PaymentMethod, TransactionCategory, TransactionKind};
use tally_core::Error;

use super::truncate;

/// Build a transaction from command-line strings
pub fn parse_new_transaction(
    name: &str,
    kind: &str,
    amount: f64,
    category: &str,
    payment_method: &str,
    date: Option<&str>,
) -> Result<NewTransaction> {
    let kind: TransactionKind = kind.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let category: TransactionCategory = category
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let payment_method: PaymentMethod = payment_method
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let date = match date {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}' (use YYYY-MM-DD)", d))?,
        None => Utc::now().date_naive(),
    };

    let tx = NewTransaction {
        name: name.to_string(),
        kind,
        amount,
        category,
        payment_method,
        date,
    };
    tx.validate()?;
    Ok(tx)
}

pub fn cmd_transactions_list(db: &Database, user_id: &str, limit: i64, offset: i64) -> Result<()> {
    let transactions = db.list_transactions(user_id, limit, offset)?;

    if transactions.is_empty() {
        println!("No transactions found. Record one with:");
        println!("  tally transactions add --name Rent --kind expense --amount 1200");
        return Ok(());
    }

    println!();
    println!("📝 Recent Transactions ({})", user_id);
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let amount_str = match tx.kind {
            TransactionKind::Expense => format!("\x1b[31m-{:.2}\x1b[0m", tx.amount), // Red
            TransactionKind::Deposit => format!("\x1b[32m+{:.2}\x1b[0m", tx.amount), // Green
            TransactionKind::Investment => format!("\x1b[34m~{:.2}\x1b[0m", tx.amount),
        };

        println!(
            "   [{}] {} │ {:>10} │ {:<14} │ {}",
            tx.id,
            tx.date,
            amount_str,
            tx.category,
            truncate(&tx.name, 32)
        );
    }

    Ok(())
}

/// Record a transaction, enforcing the free-plan monthly limit
pub fn cmd_transactions_add(
    db: &Database,
    user_id: &str,
    plan: Option<SubscriptionPlan>,
    tx: &NewTransaction,
) -> Result<i64> {
    let id = match db.insert_transaction_for_plan(user_id, plan, Utc::now().date_naive(), tx) {
        Err(err @ Error::PlanLimitReached(_)) => {
            bail!("{}; upgrade to premium for unlimited transactions", err)
        }
        other => other?,
    };
    println!("✅ Recorded transaction {} ({} {:.2})", id, tx.kind, tx.amount);
    Ok(id)
}

pub fn cmd_transactions_delete(db: &Database, user_id: &str, id: i64) -> Result<()> {
    if !db.delete_transaction(user_id, id)? {
        bail!("Transaction {} not found", id);
    }

    println!("🗑️  Deleted transaction {}", id);
    Ok(())
}
