//! Monthly dashboard aggregates

use rusqlite::params;

use super::transactions::{row_to_transaction, TRANSACTION_COLUMNS};
use super::{parse_enum_column, Database};
use crate::error::Result;
use crate::models::{
    percentage_of, CategoryExpense, Dashboard, KindPercentages, MonthPeriod, TransactionCategory,
    TransactionKind,
};

/// Number of recent transactions shown on the dashboard
pub const LAST_TRANSACTIONS_LIMIT: i64 = 15;

impl Database {
    /// Build the dashboard summary for a user's month
    pub fn get_dashboard(&self, user_id: &str, period: MonthPeriod) -> Result<Dashboard> {
        let conn = self.conn()?;
        let start = period.start().to_string();
        let end = period.end_exclusive().to_string();

        let mut deposits_total = 0.0;
        let mut expenses_total = 0.0;
        let mut investments_total = 0.0;

        {
            let mut stmt = conn.prepare(
                r#"
                SELECT kind, COALESCE(SUM(amount), 0)
                FROM transactions
                WHERE user_id = ? AND date >= ? AND date < ?
                GROUP BY kind
                "#,
            )?;
            let totals = stmt.query_map(params![user_id, start, end], |row| {
                let kind: String = row.get(0)?;
                Ok((parse_enum_column::<TransactionKind>(0, &kind)?, row.get::<_, f64>(1)?))
            })?;

            for total in totals {
                let (kind, amount) = total?;
                match kind {
                    TransactionKind::Deposit => deposits_total = amount,
                    TransactionKind::Expense => expenses_total = amount,
                    TransactionKind::Investment => investments_total = amount,
                }
            }
        }

        let volume = deposits_total + expenses_total + investments_total;
        let kind_percentages = KindPercentages {
            deposit: percentage_of(deposits_total, volume),
            expense: percentage_of(expenses_total, volume),
            investment: percentage_of(investments_total, volume),
        };

        let expenses_per_category = {
            let mut stmt = conn.prepare(
                r#"
                SELECT category, SUM(amount) AS total
                FROM transactions
                WHERE user_id = ? AND kind = 'expense' AND date >= ? AND date < ?
                GROUP BY category
                ORDER BY total DESC, category ASC
                "#,
            )?;
            let rows = stmt.query_map(params![user_id, start, end], |row| {
                let category: String = row.get(0)?;
                Ok((
                    parse_enum_column::<TransactionCategory>(0, &category)?,
                    row.get::<_, f64>(1)?,
                ))
            })?;

            let categories = rows
                .map(|r| {
                    r.map(|(category, total_amount)| CategoryExpense {
                        category,
                        total_amount,
                        percentage_of_total: percentage_of(total_amount, expenses_total),
                    })
                })
                .collect::<rusqlite::Result<Vec<_>>>()?;
            categories
        };

        let last_transactions = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM transactions WHERE user_id = ? AND date >= ? AND date < ? ORDER BY date DESC, id DESC LIMIT ?",
                TRANSACTION_COLUMNS
            ))?;
            let rows = stmt
                .query_map(
                    params![user_id, start, end, LAST_TRANSACTIONS_LIMIT],
                    row_to_transaction,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        Ok(Dashboard {
            period,
            deposits_total,
            investments_total,
            expenses_total,
            balance: deposits_total - investments_total - expenses_total,
            kind_percentages,
            expenses_per_category,
            last_transactions,
        })
    }
}
