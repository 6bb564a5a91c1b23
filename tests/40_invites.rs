mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{str_at, Session, TestApp};
use freeflow_api::database::models::{Settlement, Task};
use freeflow_api::database::Repository;
use freeflow_api::filter::Filter;

struct Invited {
    session: Session,
    associate_id: String,
    task_id: String,
    token: String,
}

/// Project cut 30, an unassigned task worth 1000 and a pending invite for it
async fn invited(app: &TestApp) -> Result<Invited> {
    let session = app.signup("ada@example.com").await?;
    let project_id = app.project(&session.token, 30).await?;
    let (associate_id, _) = app.associate(&session.token, "jane@example.com").await?;
    let task = app
        .task(
            &session.token,
            json!({ "project_id": project_id, "title": "Landing page", "task_value": 1000 }),
        )
        .await?;
    let task_id = str_at(&task, "/id")?;
    let created = app
        .create(
            &format!("/task/{}/invite", task_id),
            &session.token,
            json!({ "associate_id": associate_id }),
        )
        .await?;
    assert_eq!(created["invite"]["status"], "pending");

    Ok(Invited {
        session,
        associate_id,
        task_id,
        token: str_at(&created, "/token")?,
    })
}

async fn respond(app: &TestApp, token: &str, response: &str) -> Result<(StatusCode, Value)> {
    app.request(
        Method::POST,
        &format!("/associate/invite/response/{}", token),
        None,
        Some(json!({ "response": response })),
    )
    .await
}

#[tokio::test]
async fn invite_link_shows_offer() -> Result<()> {
    let app = TestApp::new();
    let invited = invited(&app).await?;

    let (status, body) = app
        .request(Method::GET, &format!("/associate/invite/{}", invited.token), None, None)
        .await?;

    assert_eq!(status, StatusCode::OK);
    let view = &body["data"];
    assert_eq!(view["status"], "pending");
    assert_eq!(view["associate"]["name"], "Jane Doe");
    assert_eq!(view["project"]["name"], "Website rebuild");
    assert_eq!(view["task"]["title"], "Landing page");
    assert!(view["contract"].is_null());
    Ok(())
}

#[tokio::test]
async fn accepting_assigns_task_and_creates_settlement() -> Result<()> {
    let app = TestApp::new();
    let invited = invited(&app).await?;
    assert!(Repository::<Settlement>::new(app.store.clone())
        .select_any(Filter::new())
        .await?
        .is_empty());

    let (status, body) = respond(&app, &invited.token, "accepted").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["invite"]["status"], "accepted");
    assert!(body["data"]["invite"]["responded_at"].is_string());
    assert_eq!(body["data"]["settlement"]["expected_amount"], 700);
    assert_eq!(body["data"]["settlement"]["status"], "pending");

    let task = Repository::<Task>::new(app.store.clone())
        .select_404(Filter::by_id(invited.task_id.parse()?))
        .await?;
    assert_eq!(task.assigned_to_associate.map(|id| id.to_string()), Some(invited.associate_id));

    let settlements = Repository::<Settlement>::new(app.store.clone())
        .select_any(Filter::new())
        .await?;
    assert_eq!(settlements.len(), 1);
    assert_eq!(settlements[0].task_id, task.id);
    Ok(())
}

#[tokio::test]
async fn second_response_conflicts() -> Result<()> {
    let app = TestApp::new();
    let invited = invited(&app).await?;

    let (status, _) = respond(&app, &invited.token, "declined").await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = respond(&app, &invited.token, "accepted").await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    // The late accept left nothing behind
    let task = Repository::<Task>::new(app.store.clone())
        .select_404(Filter::by_id(invited.task_id.parse()?))
        .await?;
    assert!(task.assigned_to_associate.is_none());
    assert!(Repository::<Settlement>::new(app.store.clone())
        .select_any(Filter::new())
        .await?
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_response_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let invited = invited(&app).await?;

    let (status, _) = respond(&app, &invited.token, "maybe").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn tampered_invite_token_is_unauthorized() -> Result<()> {
    let app = TestApp::new();
    let invited = invited(&app).await?;

    let (status, body) = respond(&app, &format!("{}x", invited.token), "accepted").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");

    // A session token is not an invite token
    let (status, _) = respond(&app, &invited.session.token, "accepted").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn invite_requires_owned_associate() -> Result<()> {
    let app = TestApp::new();
    let invited = invited(&app).await?;
    let other = app.signup("other@example.com").await?;
    let (foreign, _) = app.associate(&other.token, "bob@example.com").await?;

    let (status, body) = app
        .post(
            &format!("/task/{}/invite", invited.task_id),
            &invited.session.token,
            json!({ "associate_id": foreign }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Associate not found");
    Ok(())
}

#[tokio::test]
async fn onboarding_enables_associate_login() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let (associate_id, onboarding_token) = app.associate(&session.token, "jane@example.com").await?;
    let login = json!({ "email": "jane@example.com", "password": "jane-secret" });

    let (status, _) = app
        .request(Method::POST, "/user/associate/login", None, Some(login.clone()))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/associate/onboarding/{}", onboarding_token),
            None,
            Some(json!({ "password": "jane-secret", "bio": "Designer", "skills": ["figma"] })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["associate"]["status"], "onboarded");
    assert!(body["data"]["token"].is_string());

    let (status, body) = app
        .request(Method::POST, "/user/associate/login", None, Some(login))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(str_at(&body, "/data/associate/id")?, associate_id);

    let token = str_at(&body, "/data/token")?;
    let (status, _) = app.get("/associate/tasks", &token).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
