//! Premium monthly financial report
//!
//! The report is a single chat completion over the user's transactions for a
//! month. Only premium users may request one.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::identity::IdentityStore;
use crate::models::{MonthPeriod, Transaction};

use super::AIBackend;

const SYSTEM_PROMPT: &str = "You are an expert in personal finance management and organization. \
You help people organize their finances better.";

const REPORT_INSTRUCTIONS: &str = "Act as a personal finance expert and write a report with \
insights about my finances, including tips and guidance on how to improve my financial life. \
The transactions are separated by semicolons. Each one is structured as \
{DATE}-{KIND}-{AMOUNT}-{CATEGORY}. Keep monetary values formatted with decimal and thousands \
separators. Here they are:";

/// A generated report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiReport {
    pub period: MonthPeriod,
    pub model: String,
    pub transaction_count: usize,
    pub report: String,
}

/// Builds premium reports from stored transactions
#[derive(Clone)]
pub struct ReportGenerator {
    db: Database,
    identity: Arc<dyn IdentityStore>,
    backend: Arc<dyn AIBackend>,
}

impl ReportGenerator {
    pub fn new(db: Database, identity: Arc<dyn IdentityStore>, backend: Arc<dyn AIBackend>) -> Self {
        Self {
            db,
            identity,
            backend,
        }
    }

    /// Model used by the underlying backend
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Generate the report for one month
    ///
    /// Returns `Error::PremiumRequired` unless the identity store marks the
    /// user as premium. Users unknown to the store are treated as free.
    #[instrument(skip(self), fields(period = %period))]
    pub async fn generate(&self, user_id: &str, period: MonthPeriod) -> Result<AiReport> {
        let premium = self
            .identity
            .get_user_entitlement(user_id)
            .await?
            .is_some_and(|e| e.is_premium());
        if !premium {
            return Err(Error::PremiumRequired);
        }

        let transactions = self.db.list_transactions_for_month(user_id, period)?;
        let user_prompt = build_user_prompt(&transactions);

        let report = self.backend.complete(SYSTEM_PROMPT, &user_prompt).await?;

        info!(
            transactions = transactions.len(),
            model = self.backend.model(),
            "AI report generated"
        );

        Ok(AiReport {
            period,
            model: self.backend.model().to_string(),
            transaction_count: transactions.len(),
            report,
        })
    }
}

/// One `{date}-{kind}-{amount}-{category}` entry per transaction, `;`-separated
pub fn build_user_prompt(transactions: &[Transaction]) -> String {
    let entries: Vec<String> = transactions
        .iter()
        .map(|tx| {
            format!(
                "{}-{}-{:.2}-{}",
                tx.date.format("%Y/%m/%d"),
                tx.kind,
                tx.amount,
                tx.category
            )
        })
        .collect();

    format!("{}\n{}", REPORT_INSTRUCTIONS, entries.join(";"))
}
