#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use freeflow_api::database::{MemoryStore, Store};
use freeflow_api::routes::app;
use freeflow_api::state::AppState;

/// The full router over a fresh in-memory store
pub struct TestApp {
    pub store: Arc<dyn Store>,
    router: Router,
}

/// A signed-up user and their session token
pub struct Session {
    pub id: String,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let router = app(AppState::new(store.clone()));
        Self { store, router }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        self.send(request).await
    }

    /// Send a hand-built request through the router
    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body: {:?}", bytes))?
        };
        Ok((status, json))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn signup(&self, email: &str) -> Result<Session> {
        let (status, body) = self
            .request(
                Method::POST,
                "/user/signup",
                None,
                Some(json!({
                    "firstname": "Ada",
                    "lastname": "Lovelace",
                    "email": email,
                    "password": "correct-horse"
                })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "signup failed: {} {}", status, body);
        Ok(Session {
            id: str_at(&body, "/data/user/id")?,
            token: str_at(&body, "/data/token")?,
        })
    }

    /// Create a resource and return its `data`
    pub async fn create(&self, uri: &str, token: &str, body: Value) -> Result<Value> {
        let (status, body) = self.post(uri, token, body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "POST {} failed: {} {}", uri, status, body);
        Ok(body["data"].clone())
    }

    pub async fn entity(&self, token: &str) -> Result<String> {
        let entity = self.create("/entity", token, json!({ "company_name": "Acme Ltd" })).await?;
        str_at(&entity, "/id")
    }

    pub async fn project(&self, token: &str, cut: u32) -> Result<String> {
        let entity_id = self.entity(token).await?;
        let project = self
            .create(
                "/project",
                token,
                json!({
                    "entity_id": entity_id,
                    "name": "Website rebuild",
                    "category": "web",
                    "your_cut_percent": cut
                }),
            )
            .await?;
        str_at(&project, "/id")
    }

    /// Associate id and onboarding token
    pub async fn associate(&self, token: &str, email: &str) -> Result<(String, String)> {
        let created = self
            .create("/associate", token, json!({ "name": "Jane Doe", "email": email }))
            .await?;
        Ok((str_at(&created, "/associate/id")?, str_at(&created, "/onboarding_token")?))
    }

    pub async fn task(&self, token: &str, body: Value) -> Result<Value> {
        self.create("/task", token, body).await
    }
}

pub fn str_at(value: &Value, pointer: &str) -> Result<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("missing string at {} in {}", pointer, value))
}
