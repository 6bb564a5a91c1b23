mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;

use common::{str_at, TestApp};

#[tokio::test]
async fn empty_dashboard_is_all_zero() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;

    let (status, body) = app.get("/stats/dashboard", &session.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["dashboard_stats"],
        json!({
            "total_projects": 0,
            "projects_change": 0.0,
            "total_clients": 0,
            "clients_this_month": 0,
            "revenue_this_month": 0.0,
            "revenue_last_month": 0.0,
            "revenue_change": 0.0
        })
    );
    Ok(())
}

#[tokio::test]
async fn dashboard_counts_this_month() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let project_id = app.project(&session.token, 0).await?;
    let entity_id = app.entity(&session.token).await?;
    app.create("/project", &session.token, json!({ "entity_id": entity_id, "name": "Misc" }))
        .await?;
    let invoice = app
        .create("/invoice", &session.token, json!({ "project_id": project_id, "amount": 1500 }))
        .await?;
    app.create(
        "/payment",
        &session.token,
        json!({ "invoice_id": invoice["id"], "amount": 1500, "status": "confirmed" }),
    )
    .await?;

    let (_, body) = app.get("/stats/dashboard", &session.token).await?;
    let stats = &body["data"]["dashboard_stats"];
    assert_eq!(stats["total_projects"], 2);
    assert_eq!(stats["projects_change"], 100.0);
    assert_eq!(stats["total_clients"], 2);
    assert_eq!(stats["clients_this_month"], 2);
    assert_eq!(stats["revenue_this_month"], 1500.0);
    assert_eq!(stats["revenue_change"], 100.0);

    let (_, body) = app.get("/stats/dashboard/revenue", &session.token).await?;
    let months = body["data"]["revenue_stats"].as_array().cloned().unwrap_or_default();
    assert_eq!(months.len(), 6);
    let current = &months[5];
    assert_eq!(current["month"], Utc::now().format("%b").to_string());
    assert_eq!(current["revenue"], 1500.0);
    assert_eq!(current["projects"], 2);
    assert_eq!(months[0]["revenue"], 0.0);

    let (_, body) = app.get("/stats/dashboard/projects", &session.token).await?;
    let mut categories: Vec<(String, u64)> = body["data"]["project_stats"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|c| (c["category"].as_str().unwrap_or_default().to_string(), c["count"].as_u64().unwrap_or(0)))
        .collect();
    categories.sort();
    assert_eq!(categories, vec![("uncategorized".to_string(), 1), ("web".to_string(), 1)]);
    Ok(())
}

#[tokio::test]
async fn associate_stats_from_assigned_tasks() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let project_id = app.project(&session.token, 20).await?;
    let (associate_id, _) = app.associate(&session.token, "jane@example.com").await?;
    app.associate(&session.token, "idle@example.com").await?;

    app.task(
        &session.token,
        json!({
            "project_id": project_id,
            "title": "Done",
            "status": "done",
            "estimated_hours": 4.0,
            "actual_hours": 2.0,
            "task_value": 1000,
            "assigned_to_associate": associate_id
        }),
    )
    .await?;
    app.task(
        &session.token,
        json!({
            "project_id": project_id,
            "title": "Open",
            "estimated_hours": 2.0,
            "assigned_to_associate": associate_id
        }),
    )
    .await?;

    let (status, body) = app.get("/stats/associates", &session.token).await?;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"];
    assert_eq!(stats["total_associates"], 2);
    assert_eq!(stats["active_associates"], 1);
    assert_eq!(stats["total_associate_projects"], 1);
    assert_eq!(stats["active_associate_projects"], 1);
    assert_eq!(stats["total_completed_tasks"], 1);
    assert_eq!(stats["monthly_completed_tasks"], 1);
    assert_eq!(stats["total_associate_earnings"], 0.0);
    assert_eq!(stats["associate_earnings_percent"], 0.0);
    assert_eq!(stats["average_performance"], 2.5);
    assert_eq!(stats["rating_deviation"], 0.0);
    assert_eq!(stats["efficiency_rate_percent"], 200.0);
    assert_eq!(stats["efficiency_deviation_percent"], 0.0);

    // Paying out the settlement shows up as earnings
    let (_, recent) = app.get("/settlements/recent", &session.token).await?;
    let settlement_id = str_at(&recent, "/data/0/projects/0/tasks/0/settlement_id")?;
    app.put(
        &format!("/settlements/{}/payment", settlement_id),
        &session.token,
        json!({ "settled_amount": 400, "transaction_ref": "TXN9" }),
    )
    .await?;

    let (_, body) = app.get("/stats/associates", &session.token).await?;
    assert_eq!(body["data"]["total_associate_earnings"], 400.0);
    assert_eq!(body["data"]["associate_earnings_percent"], 50.0);
    Ok(())
}
