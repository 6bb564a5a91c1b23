mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use common::{str_at, TestApp};

#[tokio::test]
async fn invoice_defaults_and_number() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let entity_id = app.entity(&session.token).await?;
    let project = app
        .create(
            "/project",
            &session.token,
            json!({ "entity_id": entity_id, "name": "Retainer", "actual_value": 4200 }),
        )
        .await?;

    let invoice = app
        .create("/invoice", &session.token, json!({ "project_id": project["id"] }))
        .await?;
    let id = str_at(&invoice, "/id")?;
    let number = str_at(&invoice, "/invoice_number")?;

    assert_eq!(invoice["status"], "draft");
    assert_eq!(invoice["amount"], 4200.0);
    assert_eq!(invoice["currency"], "KES");
    assert_eq!(number, format!("INV-FF-{}", id.replace('-', "")[..8].to_uppercase()));

    let (_, body) = app.get("/invoice/u", &session.token).await?;
    assert_eq!(body["data"][0]["invoice_number"], number);

    let (status, body) = app
        .put(&format!("/invoice/{}", id), &session.token, json!({ "status": "paid" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["paid_date"].is_string());
    Ok(())
}

#[tokio::test]
async fn confirmed_payments_settle_invoice() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let project_id = app.project(&session.token, 0).await?;
    let invoice = app
        .create("/invoice", &session.token, json!({ "project_id": project_id, "amount": 5000 }))
        .await?;
    let invoice_id = str_at(&invoice, "/id")?;
    let invoice_uri = format!("/invoice/{}", invoice_id);

    let first = app
        .create(
            "/payment",
            &session.token,
            json!({ "invoice_id": invoice_id, "amount": 3000, "status": "confirmed", "method": "bank" }),
        )
        .await?;
    assert_eq!(first["currency"], "KES");
    assert!(first["paid_date"].is_string());

    let (_, body) = app.get(&invoice_uri, &session.token).await?;
    assert_eq!(body["data"]["status"], "draft");

    // A pending payment does not count until it is confirmed
    let second = app
        .create("/payment", &session.token, json!({ "invoice_id": invoice_id, "amount": 2000 }))
        .await?;
    assert_eq!(second["status"], "pending");
    let (_, body) = app.get(&invoice_uri, &session.token).await?;
    assert_eq!(body["data"]["status"], "draft");

    let (status, _) = app
        .put(
            &format!("/payment/{}", str_at(&second, "/id")?),
            &session.token,
            json!({ "status": "confirmed" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get(&invoice_uri, &session.token).await?;
    assert_eq!(body["data"]["status"], "paid");
    assert!(body["data"]["paid_date"].is_string());

    let (_, body) = app.get("/payment", &session.token).await?;
    let payments = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(payments.len(), 2);
    assert!(payments.iter().all(|p| p["invoice_number"] == invoice["invoice_number"]));
    Ok(())
}

#[tokio::test]
async fn payment_needs_owned_invoice() -> Result<()> {
    let app = TestApp::new();
    let owner = app.signup("owner@example.com").await?;
    let other = app.signup("other@example.com").await?;
    let project_id = app.project(&owner.token, 0).await?;
    let invoice = app
        .create("/invoice", &owner.token, json!({ "project_id": project_id, "amount": 100 }))
        .await?;

    let (status, body) = app
        .post("/payment", &other.token, json!({ "invoice_id": invoice["id"], "amount": 100 }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invoice not found");
    Ok(())
}

#[tokio::test]
async fn finances_split_receivables_and_net_profit() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let project_id = app.project(&session.token, 0).await?;

    let paid = app
        .create("/invoice", &session.token, json!({ "project_id": project_id, "amount": 5000 }))
        .await?;
    app.create(
        "/payment",
        &session.token,
        json!({ "invoice_id": paid["id"], "amount": 5000, "status": "confirmed" }),
    )
    .await?;
    app.create("/invoice", &session.token, json!({ "project_id": project_id, "amount": 800 }))
        .await?;
    app.create(
        "/invoice",
        &session.token,
        json!({ "project_id": project_id, "amount": 400, "due_date": Utc::now() - Duration::days(3) }),
    )
    .await?;
    let expense = app
        .create(
            "/expense",
            &session.token,
            json!({ "project_id": project_id, "amount": 1200, "vendor": "Figma" }),
        )
        .await?;
    assert_eq!(expense["category"], "other");

    let (status, body) = app.get("/stats/finances", &session.token).await?;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"];
    assert_eq!(stats["total_revenue"], 5000.0);
    assert_eq!(stats["monthly_revenue"], 5000.0);
    assert_eq!(stats["revenue_change"], 100.0);
    assert_eq!(stats["total_expenses"], 1200.0);
    assert_eq!(stats["monthly_expenses"], 1200.0);
    assert_eq!(stats["net_profit"], 3800.0);
    assert_eq!(stats["pending_payments"], 800.0);
    assert_eq!(stats["overdue_payments"], 400.0);
    Ok(())
}

#[tokio::test]
async fn expense_crud() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let project_id = app.project(&session.token, 0).await?;
    let expense = app
        .create(
            "/expense",
            &session.token,
            json!({ "project_id": project_id, "amount": 99.5, "category": "software" }),
        )
        .await?;
    let uri = format!("/expense/{}", str_at(&expense, "/id")?);

    let (_, body) = app.put(&uri, &session.token, json!({ "vendor": "JetBrains" })).await?;
    assert_eq!(body["data"]["vendor"], "JetBrains");
    assert_eq!(body["data"]["category"], "software");

    let (status, body) = app.put(&uri, &session.token, json!({ "category": "snacks" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    app.delete(&uri, &session.token).await?;
    let (_, body) = app.get("/expense", &session.token).await?;
    assert_eq!(body["data"], json!([]));
    Ok(())
}
