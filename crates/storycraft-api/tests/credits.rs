//! Credit ledger and admin grant integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};

#[tokio::test]
async fn welcome_grant_appears_in_ledger() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;

    let items = harness.transactions(&token).await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["type"], "grant");
    assert_eq!(items[0]["amount"], 100);
    assert_eq!(items[0]["ref"], "welcome");
    assert_eq!(items[0]["status"], "settled");
}

#[tokio::test]
async fn transactions_require_auth() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/credits/transactions").await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn grant_requires_admin() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;
    let target = harness.register("bob@example.com").await;
    let target_id = harness.user_id(&target).await;

    let response = harness
        .server
        .post("/credits/grant")
        .add_header("authorization", TestHarness::bearer(&token))
        .json(&json!({ "user_id": target_id, "amount": 50 }))
        .await;

    response.assert_status_forbidden();
    let body: Value = response.json();
    assert_eq!(body["detail"], "Admin only");
}

#[tokio::test]
async fn admin_grant_increases_balance_and_ledger() {
    let harness = TestHarness::new().await;
    let admin = harness.register("admin@example.com").await;
    harness.make_admin("admin@example.com").await;
    let target = harness.register("bob@example.com").await;
    let target_id = harness.user_id(&target).await;

    let response = harness
        .server
        .post("/credits/grant")
        .add_header("authorization", TestHarness::bearer(&admin))
        .json(&json!({ "user_id": target_id, "amount": 50 }))
        .await;

    response.assert_status_ok();
    let entry: Value = response.json();
    assert_eq!(entry["type"], "grant");
    assert_eq!(entry["amount"], 50);
    assert_eq!(entry["ref"], "admin_grant");
    assert_eq!(entry["status"], "settled");

    assert_eq!(harness.credits(&target).await, 150);

    let items = harness.transactions(&target).await;
    assert_eq!(items.len(), 2);
    assert!(items
        .iter()
        .any(|t| t["ref"] == "admin_grant" && t["amount"] == 50));
}

#[tokio::test]
async fn grant_to_unknown_user_not_found() {
    let harness = TestHarness::new().await;
    let admin = harness.register("admin@example.com").await;
    harness.make_admin("admin@example.com").await;

    let response = harness
        .server
        .post("/credits/grant")
        .add_header("authorization", TestHarness::bearer(&admin))
        .json(&json!({
            "user_id": "7f2c1f6e-58af-4cbb-9f7b-1df52a9b0f6e",
            "amount": 50
        }))
        .await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["detail"], "User not found");
}

#[tokio::test]
async fn grant_rejects_non_positive_amount() {
    let harness = TestHarness::new().await;
    let admin = harness.register("admin@example.com").await;
    harness.make_admin("admin@example.com").await;
    let target_id = harness.user_id(&admin).await;

    let response = harness
        .server
        .post("/credits/grant")
        .add_header("authorization", TestHarness::bearer(&admin))
        .json(&json!({ "user_id": target_id, "amount": 0 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
