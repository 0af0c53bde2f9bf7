//! Integration tests for tally-core
//!
//! These tests exercise the full webhook → entitlement → premium feature
//! workflow against real storage and the in-memory identity store.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tally_core::{
    db::Database,
    models::{MonthPeriod, NewTransaction, PaymentMethod, TransactionCategory, TransactionKind},
    Acknowledgement, BillingConfig, EntitlementReconciler, Error, IdentityStore,
    InMemoryIdentityStore, MockBackend, ReportGenerator, SignatureVerifier, UserEntitlement,
    WebhookError,
};

const WEBHOOK_SECRET: &str = "whsec_integration";

fn billing_config() -> BillingConfig {
    BillingConfig::new(WEBHOOK_SECRET, "sk_test_integration").expect("valid config")
}

fn signed(body: &serde_json::Value) -> (Vec<u8>, String) {
    let bytes = body.to_string().into_bytes();
    let header = SignatureVerifier::from_config(&billing_config())
        .expect("verifier")
        .sign(&bytes, Utc::now().timestamp());
    (bytes, header)
}

fn payment_succeeded(user_id: &str) -> serde_json::Value {
    json!({
        "id": "evt_1",
        "type": "invoice.payment_succeeded",
        "created": Utc::now().timestamp(),
        "data": {"object": {
            "object": "invoice",
            "customer": {"id": "cus_1", "object": "customer"},
            "parent": {"subscription_details": {
                "subscription": "sub_1",
                "metadata": {"clerk_user_id": user_id}
            }}
        }}
    })
}

fn subscription_deleted(user_id: &str) -> serde_json::Value {
    json!({
        "id": "evt_2",
        "type": "customer.subscription.deleted",
        "created": Utc::now().timestamp(),
        "data": {"object": {
            "id": "sub_1",
            "object": "subscription",
            "customer": "cus_1",
            "metadata": {"clerk_user_id": user_id}
        }}
    })
}

fn expense(name: &str, amount: f64, date: NaiveDate) -> NewTransaction {
    NewTransaction {
        name: name.to_string(),
        kind: TransactionKind::Expense,
        amount,
        category: TransactionCategory::Food,
        payment_method: PaymentMethod::CreditCard,
        date,
    }
}

// =============================================================================
// Subscription Lifecycle
// =============================================================================

#[tokio::test]
async fn test_subscription_lifecycle_controls_premium_features() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let store = Arc::new(InMemoryIdentityStore::new().with_user(UserEntitlement::free("user_42")));
    let reconciler =
        EntitlementReconciler::new(&billing_config(), store.clone()).expect("reconciler");
    let backend = Arc::new(MockBackend::new("You spend a lot on food."));
    let reports = ReportGenerator::new(db.clone(), store.clone(), backend.clone());

    let today = Utc::now().date_naive();
    let period = MonthPeriod::containing(today);

    // Fill the free allowance
    for i in 0..10 {
        db.insert_transaction("user_42", &expense(&format!("Meal {}", i), 20.0, today))
            .expect("insert");
    }
    assert!(!db.can_user_add_transaction("user_42", None, today).unwrap());
    assert!(matches!(
        reports.generate("user_42", period).await,
        Err(Error::PremiumRequired)
    ));

    // Payment arrives
    let (body, header) = signed(&payment_succeeded("user_42"));
    let ack = reconciler
        .handle_billing_event(&body, Some(&header))
        .await
        .expect("payment handled");
    assert!(matches!(ack, Acknowledgement::Applied { .. }));

    let entitlement = store
        .get_user_entitlement("user_42")
        .await
        .unwrap()
        .expect("user exists");
    assert!(entitlement.is_premium());
    assert_eq!(entitlement.billing_customer_id.as_deref(), Some("cus_1"));
    assert!(db
        .can_user_add_transaction("user_42", entitlement.subscription_plan, today)
        .unwrap());

    let report = reports.generate("user_42", period).await.expect("report");
    assert_eq!(report.transaction_count, 10);
    assert_eq!(backend.prompts().len(), 1);

    // Subscription ends
    let (body, header) = signed(&subscription_deleted("user_42"));
    reconciler
        .handle_billing_event(&body, Some(&header))
        .await
        .expect("deletion handled");

    let entitlement = store.get_user_entitlement("user_42").await.unwrap().unwrap();
    assert_eq!(entitlement, UserEntitlement::free("user_42"));
    assert!(matches!(
        reports.generate("user_42", period).await,
        Err(Error::PremiumRequired)
    ));
    assert_eq!(store.update_count(), 2);
}

#[tokio::test]
async fn test_forged_webhook_cannot_grant_premium() {
    let store = Arc::new(InMemoryIdentityStore::new());
    let reconciler = EntitlementReconciler::new(&billing_config(), store.clone()).unwrap();

    let body = payment_succeeded("user_42").to_string().into_bytes();
    let forged = SignatureVerifier::new("whsec_attacker", 300)
        .unwrap()
        .sign(&body, Utc::now().timestamp());

    let result = reconciler.handle_billing_event(&body, Some(&forged)).await;
    assert!(matches!(result, Err(WebhookError::Authentication(_))));
    assert_eq!(store.get_user_entitlement("user_42").await.unwrap(), None);
}

#[tokio::test]
async fn test_out_of_order_delivery_is_last_write_wins() {
    let store = Arc::new(InMemoryIdentityStore::new());
    let reconciler = EntitlementReconciler::new(&billing_config(), store.clone()).unwrap();

    // Cancellation processed before a late payment redelivery
    let (deleted, deleted_header) = signed(&subscription_deleted("user_42"));
    let (paid, paid_header) = signed(&payment_succeeded("user_42"));

    reconciler.handle_billing_event(&deleted, Some(&deleted_header)).await.unwrap();
    reconciler.handle_billing_event(&paid, Some(&paid_header)).await.unwrap();

    let entitlement = store.get_user_entitlement("user_42").await.unwrap().unwrap();
    assert!(entitlement.is_premium());
}

// =============================================================================
// Dashboard
// =============================================================================

#[test]
fn test_dashboard_reflects_recorded_transactions() {
    let db = Database::in_memory().unwrap();
    let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();

    db.insert_transaction(
        "user_1",
        &NewTransaction {
            name: "Paycheck".into(),
            kind: TransactionKind::Deposit,
            amount: 1000.0,
            category: TransactionCategory::Salary,
            payment_method: PaymentMethod::BankTransfer,
            date,
        },
    )
    .unwrap();
    db.insert_transaction("user_1", &expense("Groceries", 250.0, date)).unwrap();

    let dashboard = db
        .get_dashboard("user_1", MonthPeriod::new(2025, 6).unwrap())
        .unwrap();

    assert_eq!(dashboard.deposits_total, 1000.0);
    assert_eq!(dashboard.expenses_total, 250.0);
    assert_eq!(dashboard.balance, 750.0);
    assert_eq!(dashboard.kind_percentages.deposit, 80);
    assert_eq!(dashboard.kind_percentages.expense, 20);
    assert_eq!(dashboard.expenses_per_category.len(), 1);
    assert_eq!(dashboard.last_transactions.len(), 2);
}
