//! Server command implementation

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tally_core::ai::{AIBackend, OpenAICompatibleBackend, ReportGenerator};
use tally_core::identity::{ClerkClient, IdentityStore, InMemoryIdentityStore};
use tally_core::EntitlementReconciler;
use tracing::info;

use super::{load_billing_config, open_db};

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    static_dir: Option<&Path>,
    dev_identity: bool,
) -> Result<()> {
    // Billing secrets are required; without them the webhook endpoint cannot exist
    let billing = load_billing_config()?;

    let identity: Arc<dyn IdentityStore> = if dev_identity {
        Arc::new(InMemoryIdentityStore::new())
    } else {
        Arc::new(
            ClerkClient::from_env()
                .context("CLERK_SECRET_KEY must be set (or pass --dev-identity)")?,
        )
    };

    println!("🚀 Starting Tally web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    if dev_identity {
        println!("   ⚠️  Identity: in-memory (entitlements are lost on restart)");
    } else {
        println!("   👤 Identity: Clerk");
    }
    println!(
        "   💳 Billing webhook: /api/webhooks/stripe (tolerance {}s)",
        billing.tolerance_secs
    );

    // Parse API keys from environment (comma-separated)
    let api_keys = tally_server::parse_api_keys(&std::env::var("TALLY_API_KEYS").unwrap_or_default());

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!(
            "   🔑 API keys: {} configured (TALLY_API_KEYS)",
            api_keys.len()
        );
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path)?;

    let reconciler = EntitlementReconciler::new(&billing, identity.clone())
        .context("Failed to configure billing webhook")?;

    let config = tally_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins: vec![],
        api_keys,
    };

    let mut state = tally_server::AppState::new(db.clone(), config, identity.clone())
        .with_reconciler(reconciler);

    if let Some(backend) = OpenAICompatibleBackend::from_env() {
        info!(host = backend.host(), model = backend.model(), "AI reports enabled");
        state = state.with_reports(ReportGenerator::new(db, identity, Arc::new(backend)));
    }

    let static_dir = static_dir
        .map(|d| d.to_str().context("Static directory must be valid UTF-8"))
        .transpose()?;

    tally_server::serve(state, host, port, static_dir).await
}
