mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{str_at, TestApp};

#[tokio::test]
async fn entity_lifecycle() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;

    let entity = app
        .create(
            "/entity",
            &session.token,
            json!({ "companyName": "Acme Ltd", "contact": "Wile", "email": "Ops@Acme.io" }),
        )
        .await?;
    let id = str_at(&entity, "/id")?;
    assert_eq!(entity["email"], "ops@acme.io");

    let (status, body) = app.put(&format!("/entity/{}", id), &session.token, json!({ "contact": "Road Runner" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["contact"], "Road Runner");
    assert_eq!(body["data"]["company_name"], "Acme Ltd");

    let (status, body) = app.delete(&format!("/entity/{}", id), &session.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "id": id, "deleted": true }));

    let (status, _) = app.get(&format!("/entity/{}", id), &session.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/entity", &session.token).await?;
    assert_eq!(body["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn other_users_rows_look_missing() -> Result<()> {
    let app = TestApp::new();
    let owner = app.signup("owner@example.com").await?;
    let other = app.signup("other@example.com").await?;
    let project_id = app.project(&owner.token, 30).await?;

    let (status, body) = app.get(&format!("/project/{}", project_id), &other.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Project not found");

    let (_, body) = app.get("/project", &other.token).await?;
    assert_eq!(body["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn invalid_path_id_is_bad_request() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;

    let (status, body) = app.get("/project/not-a-uuid", &session.token).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid id");
    Ok(())
}

#[tokio::test]
async fn project_requires_owned_entity() -> Result<()> {
    let app = TestApp::new();
    let owner = app.signup("owner@example.com").await?;
    let other = app.signup("other@example.com").await?;
    let entity_id = app.entity(&owner.token).await?;

    let (status, _) = app
        .post("/project", &other.token, json!({ "entity_id": entity_id, "name": "Poach" }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn project_cut_is_validated_and_sets_outsourced() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let entity_id = app.entity(&session.token).await?;

    let (status, body) = app
        .post(
            "/project",
            &session.token,
            json!({ "entity_id": entity_id, "name": "Too greedy", "your_cut_percent": 120 }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["your_cut_percent"].is_string());

    let project = app
        .create("/project", &session.token, json!({ "entity_id": entity_id, "name": "In house" }))
        .await?;
    assert_eq!(project["is_outsourced"], false);
    assert_eq!(project["status"], "inquiry");
    assert_eq!(project["currency"], "KES");
    let id = str_at(&project, "/id")?;

    let (status, body) = app
        .put(
            &format!("/project/{}", id),
            &session.token,
            json!({ "your_cut_percent": 25, "status": "active" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_outsourced"], true);
    assert!(body["data"]["start_date"].is_string());

    let (_, body) = app
        .put(&format!("/project/{}", id), &session.token, json!({ "status": "completed" }))
        .await?;
    assert!(body["data"]["completed_at"].is_string());
    Ok(())
}

#[tokio::test]
async fn project_lists_by_entity_and_shows_tasks() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let project_id = app.project(&session.token, 0).await?;
    app.task(&session.token, json!({ "project_id": project_id, "title": "Wireframes" })).await?;

    let (_, body) = app.get(&format!("/project/{}", project_id), &session.token).await?;
    assert_eq!(body["data"]["name"], "Website rebuild");
    assert_eq!(body["data"]["tasks"][0]["title"], "Wireframes");

    let entity_id = str_at(&body, "/data/entity_id")?;
    let (_, body) = app.get(&format!("/project/e/{}", entity_id), &session.token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (_, body) = app.get("/project/u", &session.token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn task_writes_recompute_progress() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let project_id = app.project(&session.token, 0).await?;
    let milestone = app
        .create("/milestone", &session.token, json!({ "project_id": project_id, "title": "Phase 1" }))
        .await?;
    let milestone_id = str_at(&milestone, "/id")?;

    let first = app
        .task(
            &session.token,
            json!({ "project_id": project_id, "milestone_id": milestone_id, "title": "One" }),
        )
        .await?;
    app.task(
        &session.token,
        json!({ "project_id": project_id, "milestone_id": milestone_id, "title": "Two" }),
    )
    .await?;
    let first_id = str_at(&first, "/id")?;

    let (status, body) = app
        .put(&format!("/task/{}", first_id), &session.token, json!({ "status": "done" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["completed_at"].is_string());

    let (_, project) = app.get(&format!("/project/{}", project_id), &session.token).await?;
    assert_eq!(project["data"]["progress_percent"], 50);

    let (_, body) = app.get(&format!("/milestone/{}", milestone_id), &session.token).await?;
    assert_eq!(body["data"]["progress"], 50);
    assert_eq!(body["data"]["tasks_count"], 2);
    assert_eq!(body["data"]["completed_tasks"], 1);
    assert_eq!(body["data"]["tasks"].as_array().map(Vec::len), Some(2));

    // Leaving done clears the completion stamp
    let (_, body) = app
        .put(&format!("/task/{}", first_id), &session.token, json!({ "status": "review" }))
        .await?;
    assert!(body["data"]["completed_at"].is_null());

    let (status, _) = app.delete(&format!("/task/{}", first_id), &session.token).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get(&format!("/milestone/{}", milestone_id), &session.token).await?;
    assert_eq!(body["data"]["tasks_count"], 1);
    assert_eq!(body["data"]["progress"], 0);
    Ok(())
}

#[tokio::test]
async fn task_rejects_foreign_milestone_and_associate() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let other = app.signup("other@example.com").await?;
    let project_id = app.project(&session.token, 0).await?;
    let other_project = app.project(&session.token, 0).await?;
    let milestone = app
        .create("/milestone", &session.token, json!({ "project_id": other_project, "title": "Elsewhere" }))
        .await?;
    let (foreign_associate, _) = app.associate(&other.token, "jane@example.com").await?;

    let (status, body) = app
        .post(
            "/task",
            &session.token,
            json!({ "project_id": project_id, "title": "T", "milestone_id": milestone["id"] }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["milestone_id"].is_string());

    let (status, body) = app
        .post(
            "/task",
            &session.token,
            json!({ "project_id": project_id, "title": "T", "assigned_to_associate": foreign_associate }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["assigned_to_associate"].is_string());

    let (status, _) = app
        .post(
            "/task",
            &session.token,
            json!({ "project_id": project_id, "title": "T", "task_value": -5 }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn contract_follows_its_task() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let project_id = app.project(&session.token, 0).await?;
    let task = app.task(&session.token, json!({ "project_id": project_id, "title": "Logo" })).await?;
    let task_id = str_at(&task, "/id")?;

    let (_, body) = app.get(&format!("/contract/t/{}", task_id), &session.token).await?;
    assert!(body["data"].is_null());

    let contract = app
        .create(
            "/contract",
            &session.token,
            json!({ "task_id": task_id, "role": "Designer", "deliverables": ["logo.svg"] }),
        )
        .await?;
    assert_eq!(str_at(&contract, "/project_id")?, project_id);

    let (_, body) = app.get(&format!("/contract/t/{}", task_id), &session.token).await?;
    assert_eq!(body["data"]["role"], "Designer");

    let (_, body) = app.get(&format!("/contract/p/{}", project_id), &session.token).await?;
    assert_eq!(body["data"][0]["deliverables"], json!(["logo.svg"]));
    Ok(())
}
