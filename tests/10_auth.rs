mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;

use common::{str_at, TestApp};
use freeflow_api::auth::{generate_jwt, Claims, Role};

#[tokio::test]
async fn health_reports_store_ok() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/health", None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn signup_then_login_returns_session() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("Ada@Example.com").await?;

    let (status, body) = app
        .request(
            Method::POST,
            "/user/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "correct-horse" })),
        )
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(str_at(&body, "/data/user/id")?, session.id);
    assert_eq!(body["data"]["user"]["email"], "ada@example.com");
    assert!(body["data"]["user"].get("password_hash").is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_signup_conflicts() -> Result<()> {
    let app = TestApp::new();
    app.signup("ada@example.com").await?;

    let (status, body) = app
        .request(
            Method::POST,
            "/user/signup",
            None,
            Some(json!({
                "firstname": "Ada",
                "lastname": "Again",
                "email": "ADA@example.com",
                "password": "another-password"
            })),
        )
        .await?;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Email is already registered");
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_unauthorized() -> Result<()> {
    let app = TestApp::new();
    app.signup("ada@example.com").await?;

    let (status, body) = app
        .request(
            Method::POST,
            "/user/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
        )
        .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
    Ok(())
}

#[tokio::test]
async fn short_password_fails_validation() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::POST,
            "/user/signup",
            None,
            Some(json!({ "firstname": "A", "lastname": "B", "email": "a@b.co", "password": "short" })),
        )
        .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["field_errors"]["password"].is_string());
    Ok(())
}

#[tokio::test]
async fn missing_authorization_header() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/protected", None, None).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "success": false, "error": "Missing Authorization header" }));
    Ok(())
}

#[tokio::test]
async fn non_bearer_authorization_header() -> Result<()> {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/protected")
        .header("authorization", "Basic dXNlcjpwYXNz")
        .body(Body::empty())?;
    let (status, body) = app.send(request).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization header must use Bearer token format");
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app.get("/protected", "not-a-jwt").await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
    Ok(())
}

#[tokio::test]
async fn whoami_echoes_user() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;

    let (status, body) = app.get("/protected", &session.token).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(str_at(&body, "/data/user_id")?, session.id);
    Ok(())
}

#[tokio::test]
async fn token_for_unknown_user_is_forbidden() -> Result<()> {
    let app = TestApp::new();
    let token = generate_jwt(&Claims::new(uuid::Uuid::new_v4(), Role::User))?;

    let (status, body) = app.get("/entity", &token).await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn associate_token_cannot_use_user_routes() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;
    let (associate_id, _) = app.associate(&session.token, "jane@example.com").await?;
    let token = generate_jwt(&Claims::new(associate_id.parse()?, Role::Associate))?;

    let (status, _) = app.get("/project", &token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/associate/tasks", &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn user_token_cannot_use_associate_routes() -> Result<()> {
    let app = TestApp::new();
    let session = app.signup("ada@example.com").await?;

    let (status, _) = app.get("/associate/settlements", &session.token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_bad_request() -> Result<()> {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/user/login")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let (status, body) = app.send(request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    Ok(())
}
