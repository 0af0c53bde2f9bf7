//! AI report command implementation

use std::sync::Arc;

use anyhow::{Context, Result};
use tally_core::ai::{AIBackend, AiReport, OpenAICompatibleBackend, ReportGenerator};
use tally_core::db::Database;
use tally_core::identity::{ClerkClient, IdentityStore};
use tally_core::models::MonthPeriod;

pub async fn cmd_report(db: Database, user_id: &str, period: MonthPeriod) -> Result<()> {
    let identity = ClerkClient::from_env()
        .context("CLERK_SECRET_KEY must be set to check the user's plan")?;
    let backend = OpenAICompatibleBackend::from_env()
        .context("OPENAI_API_KEY must be set to generate AI reports")?;

    println!("🤖 Generating AI report for {} ({})...", user_id, period);
    println!("   Model: {} @ {}", backend.model(), backend.host());

    let report = generate_report(db, Arc::new(identity), Arc::new(backend), user_id, period).await?;

    println!();
    println!("{}", report.report);
    println!();
    println!("   Based on {} transaction(s)", report.transaction_count);

    Ok(())
}

/// Run the premium-gated report with explicit providers
pub async fn generate_report(
    db: Database,
    identity: Arc<dyn IdentityStore>,
    backend: Arc<dyn AIBackend>,
    user_id: &str,
    period: MonthPeriod,
) -> Result<AiReport> {
    let generator = ReportGenerator::new(db, identity, backend);
    let report = generator
        .generate(user_id, period)
        .await
        .context("Failed to generate AI report")?;
    Ok(report)
}
