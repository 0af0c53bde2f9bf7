//! Dashboard command implementation

use anyhow::Result;
use tally_core::db::Database;
use tally_core::models::{Dashboard, MonthPeriod};

use super::truncate;

pub fn cmd_dashboard(db: &Database, user_id: &str, period: MonthPeriod) -> Result<Dashboard> {
    let dashboard = db.get_dashboard(user_id, period)?;

    println!();
    println!("📊 Dashboard {} ({})", period, user_id);
    println!("   ─────────────────────────────────────────");
    println!("   Balance:      {:>12.2}", dashboard.balance);
    println!(
        "   Deposits:     {:>12.2}  ({}%)",
        dashboard.deposits_total, dashboard.kind_percentages.deposit
    );
    println!(
        "   Expenses:     {:>12.2}  ({}%)",
        dashboard.expenses_total, dashboard.kind_percentages.expense
    );
    println!(
        "   Investments:  {:>12.2}  ({}%)",
        dashboard.investments_total, dashboard.kind_percentages.investment
    );

    if !dashboard.expenses_per_category.is_empty() {
        println!();
        println!("   Expenses by category");
        for entry in &dashboard.expenses_per_category {
            println!(
                "   {:<16} {:>10.2}  {:>3}%",
                entry.category.as_str(),
                entry.total_amount,
                entry.percentage_of_total
            );
        }
    }

    if !dashboard.last_transactions.is_empty() {
        println!();
        println!("   Latest transactions");
        for tx in &dashboard.last_transactions {
            println!(
                "   {} │ {:<10} │ {:>10.2} │ {}",
                tx.date,
                tx.kind.as_str(),
                tx.amount,
                truncate(&tx.name, 30)
            );
        }
    }

    Ok(dashboard)
}
