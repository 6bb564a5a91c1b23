// routes.rs - Router assembly. Each group carries its own auth layers.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::config;
use crate::handlers::{protected, public};
use crate::middleware::{
    invite_token_middleware, jwt_auth_middleware, onboarding_token_middleware, validate_associate_middleware,
    validate_user_middleware,
};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let config = config();

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(user_public_routes())
        .merge(invite_routes(state.clone()))
        .merge(onboarding_routes(state.clone()))
        // Session token, user role
        .merge(user_routes(state.clone()))
        // Session token, associate role
        .merge(associate_routes(state.clone()))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    layer.allow_origin(origins)
}

fn user_public_routes() -> Router<AppState> {
    use public::user;

    Router::new()
        .route("/user/signup", post(user::signup))
        .route("/user/login", post(user::login))
        .route("/user/associate/login", post(user::associate_login))
}

fn invite_routes(state: AppState) -> Router<AppState> {
    use public::invite;

    Router::new()
        .route("/associate/invite/:token", get(invite::view))
        .route("/associate/invite/response/:token", post(invite::respond))
        .route_layer(middleware::from_fn_with_state(state, invite_token_middleware))
}

fn onboarding_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/associate/onboarding/:token", post(public::onboarding::complete))
        .route_layer(middleware::from_fn_with_state(state, onboarding_token_middleware))
}

fn user_routes(state: AppState) -> Router<AppState> {
    use protected::{associate, contract, entity, expense, invoice, milestone, payment, project, settlement, stats, task};

    Router::new()
        .route("/protected", get(protected::whoami))
        // Clients
        .route("/entity", post(entity::create).get(entity::list))
        .route("/entity/:id", get(entity::get).put(entity::update).delete(entity::delete))
        // Associates
        .route("/associate", post(associate::create).get(associate::list))
        .route("/associate/:id", get(associate::get).delete(associate::delete))
        // Projects
        .route("/project", post(project::create).get(project::list))
        .route("/project/u", get(project::list))
        .route("/project/e/:id", get(project::list_by_entity))
        .route("/project/:id", get(project::get).put(project::update).delete(project::delete))
        // Tasks
        .route("/task", post(task::create).get(task::list))
        .route("/task/p/:id", get(task::list_by_project))
        .route("/task/:id", get(task::get).put(task::update).delete(task::delete))
        .route("/task/:id/invite", post(task::invite))
        // Milestones
        .route("/milestone", post(milestone::create).get(milestone::list))
        .route("/milestone/p/:id", get(milestone::list_by_project))
        .route("/milestone/:id", get(milestone::get).put(milestone::update).delete(milestone::delete))
        // Contracts
        .route("/contract", post(contract::create).get(contract::list))
        .route("/contract/t/:id", get(contract::for_task))
        .route("/contract/p/:id", get(contract::list_by_project))
        .route("/contract/:id", get(contract::get).put(contract::update).delete(contract::delete))
        // Finance
        .route("/invoice", post(invoice::create).get(invoice::list))
        .route("/invoice/u", get(invoice::list))
        .route("/invoice/:id", get(invoice::get).put(invoice::update).delete(invoice::delete))
        .route("/payment", post(payment::create).get(payment::list))
        .route("/payment/:id", get(payment::get).put(payment::update).delete(payment::delete))
        .route("/expense", post(expense::create).get(expense::list))
        .route("/expense/:id", get(expense::get).put(expense::update).delete(expense::delete))
        // Settlements
        .route("/settlements/recent", get(settlement::recent))
        .route("/settlements/history", get(settlement::history))
        .route("/settlements/:id/payment", put(settlement::record_payment))
        // Stats
        .route("/stats/dashboard", get(stats::dashboard))
        .route("/stats/dashboard/revenue", get(stats::revenue))
        .route("/stats/dashboard/projects", get(stats::projects))
        .route("/stats/settlements", get(stats::settlements))
        .route("/stats/associates", get(stats::associates))
        .route("/stats/finances", get(stats::finances))
        // Layers run bottom-up: token first, then the user lookup
        .route_layer(middleware::from_fn_with_state(state, validate_user_middleware))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

fn associate_routes(state: AppState) -> Router<AppState> {
    use protected::associate_portal;

    Router::new()
        .route("/associate/tasks", get(associate_portal::tasks))
        .route("/associate/settlements", get(associate_portal::settlements))
        .route_layer(middleware::from_fn_with_state(state, validate_associate_middleware))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "FreeFlow API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Clients, projects, tasks, invoices and associate settlements",
            "endpoints": {
                "public": "/user/signup, /user/login, /user/associate/login",
                "links": "/associate/invite/:token, /associate/onboarding/:token",
                "crm": "/entity, /associate, /project, /task, /milestone, /contract (user token)",
                "finance": "/invoice, /payment, /expense, /settlements/* (user token)",
                "stats": "/stats/* (user token)",
                "associate": "/associate/tasks, /associate/settlements (associate token)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "Database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
