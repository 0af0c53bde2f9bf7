//! Transaction operations
//!
//! Every query is scoped by `user_id`; a user can never read or modify
//! another user's rows.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::{parse_date_column, parse_datetime, parse_enum_column, Database};
use crate::error::{Error, Result};
use crate::identity::SubscriptionPlan;
use crate::models::{MonthPeriod, NewTransaction, Transaction, FREE_PLAN_MONTHLY_TRANSACTION_LIMIT};

pub(super) const TRANSACTION_COLUMNS: &str =
    "id, user_id, name, kind, amount, category, payment_method, date, created_at";

pub(super) fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let kind: String = row.get(3)?;
    let category: String = row.get(5)?;
    let payment_method: String = row.get(6)?;
    let date: String = row.get(7)?;
    let created_at: String = row.get(8)?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind: parse_enum_column(3, &kind)?,
        amount: row.get(4)?,
        category: parse_enum_column(5, &category)?,
        payment_method: parse_enum_column(6, &payment_method)?,
        date: parse_date_column(7, &date)?,
        created_at: parse_datetime(&created_at),
    })
}

fn insert_row(conn: &Connection, user_id: &str, tx: &NewTransaction) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO transactions (user_id, name, kind, amount, category, payment_method, date)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            user_id,
            tx.name.trim(),
            tx.kind.as_str(),
            tx.amount,
            tx.category.as_str(),
            tx.payment_method.as_str(),
            tx.date.to_string(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

fn count_created_in_month(conn: &Connection, user_id: &str, period: MonthPeriod) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE user_id = ? AND created_at >= ? AND created_at < ?",
        params![
            user_id,
            period.start().to_string(),
            period.end_exclusive().to_string()
        ],
        |row| row.get(0),
    )?;

    Ok(count)
}

impl Database {
    /// Insert a transaction for a user, returning its id
    ///
    /// No plan limit is applied; see `insert_transaction_for_plan`.
    pub fn insert_transaction(&self, user_id: &str, tx: &NewTransaction) -> Result<i64> {
        tx.validate()?;
        let conn = self.conn()?;
        insert_row(&conn, user_id, tx)
    }

    /// Insert a transaction if the user's plan allows another one this month
    ///
    /// The count and the insert run in one `IMMEDIATE` transaction, so
    /// concurrent requests cannot push a free user past the monthly limit.
    /// Fails with `Error::PlanLimitReached` when the limit is hit.
    pub fn insert_transaction_for_plan(
        &self,
        user_id: &str,
        plan: Option<SubscriptionPlan>,
        today: NaiveDate,
        tx: &NewTransaction,
    ) -> Result<i64> {
        tx.validate()?;
        let mut conn = self.conn()?;
        let db_tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if plan != Some(SubscriptionPlan::Premium) {
            let count = count_created_in_month(&db_tx, user_id, MonthPeriod::containing(today))?;
            if count >= FREE_PLAN_MONTHLY_TRANSACTION_LIMIT {
                return Err(Error::PlanLimitReached(FREE_PLAN_MONTHLY_TRANSACTION_LIMIT));
            }
        }

        let id = insert_row(&db_tx, user_id, tx)?;
        db_tx.commit()?;
        Ok(id)
    }

    /// Get a single transaction owned by the user
    pub fn get_transaction(&self, user_id: &str, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;

        let tx = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transactions WHERE id = ? AND user_id = ?",
                    TRANSACTION_COLUMNS
                ),
                params![id, user_id],
                row_to_transaction,
            )
            .optional()?;

        Ok(tx)
    }

    /// Replace every editable field of a transaction
    ///
    /// Returns false if the transaction does not exist for this user.
    pub fn update_transaction(&self, user_id: &str, id: i64, tx: &NewTransaction) -> Result<bool> {
        tx.validate()?;
        let conn = self.conn()?;

        let changed = conn.execute(
            r#"
            UPDATE transactions
            SET name = ?, kind = ?, amount = ?, category = ?, payment_method = ?, date = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND user_id = ?
            "#,
            params![
                tx.name.trim(),
                tx.kind.as_str(),
                tx.amount,
                tx.category.as_str(),
                tx.payment_method.as_str(),
                tx.date.to_string(),
                id,
                user_id,
            ],
        )?;

        Ok(changed > 0)
    }

    /// Delete a transaction; returns false if it did not exist for this user
    pub fn delete_transaction(&self, user_id: &str, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM transactions WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// List a user's transactions, newest first
    pub fn list_transactions(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
            TRANSACTION_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(params![user_id, limit, offset], row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(transactions)
    }

    /// All of a user's transactions dated within a month, oldest first
    pub fn list_transactions_for_month(
        &self,
        user_id: &str,
        period: MonthPeriod,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? AND date >= ? AND date < ? ORDER BY date ASC, id ASC",
            TRANSACTION_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(
                params![
                    user_id,
                    period.start().to_string(),
                    period.end_exclusive().to_string()
                ],
                row_to_transaction,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(transactions)
    }

    /// Number of transactions the user recorded (created) during a month
    pub fn count_transactions_created_in_month(
        &self,
        user_id: &str,
        period: MonthPeriod,
    ) -> Result<i64> {
        let conn = self.conn()?;
        count_created_in_month(&conn, user_id, period)
    }

    /// Whether the user may record another transaction today
    ///
    /// Premium users are unlimited; everyone else gets
    /// `FREE_PLAN_MONTHLY_TRANSACTION_LIMIT` per calendar month.
    pub fn can_user_add_transaction(
        &self,
        user_id: &str,
        plan: Option<SubscriptionPlan>,
        today: NaiveDate,
    ) -> Result<bool> {
        if plan == Some(SubscriptionPlan::Premium) {
            return Ok(true);
        }

        let count = self.count_transactions_created_in_month(user_id, MonthPeriod::containing(today))?;
        Ok(count < FREE_PLAN_MONTHLY_TRANSACTION_LIMIT)
    }
}
