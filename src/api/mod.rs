// HTTP API routes (meal catalog, combatants, battles, leaderboard).

use std::time::Instant;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Json, Path, Query, Request, State,
    },
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::MealMaxError;
use crate::kitchen::Kitchen;
use crate::leaderboard::SortKey;
use crate::meal::{BattleResult, NewMeal};
use crate::metrics;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SessionParams {
    pub session: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct PrepCombatantRequest {
    pub id: Option<i64>,
    pub meal: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateMealStatsRequest {
    pub result: String,
}

#[derive(Deserialize)]
pub struct BattleScoreRequest {
    pub id: Option<i64>,
    pub cuisine: Option<String>,
    pub price: Option<f64>,
    pub difficulty: Option<String>,
}

#[derive(Deserialize)]
pub struct LeaderboardParams {
    pub sort: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub kitchen: Kitchen,
}

// ── Extractor rejections ──────────────────────────────────────────────

// Rejections become `Validation` errors so every failure carries the JSON
// error body.

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, MealMaxError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| MealMaxError::Validation(format!("Invalid request body: {}", e.body_text())))
}

fn path_param<T>(path: Result<Path<T>, PathRejection>) -> Result<T, MealMaxError> {
    path.map(|Path(value)| value)
        .map_err(|e| MealMaxError::Validation(format!("Invalid path: {}", e.body_text())))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, MealMaxError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| MealMaxError::Validation(format!("Invalid query: {}", e.body_text())))
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(kitchen: Kitchen) -> Router {
    let state = AppState { kitchen };

    Router::new()
        // Health
        .route("/api/health", get(health_check))
        .route("/api/db-check", get(db_check))
        // Meals
        .route("/api/create-meal", post(create_meal))
        .route("/api/meals", get(list_meals))
        .route("/api/delete-meal/{id}", delete(delete_meal))
        .route("/api/get-meal-by-id/{id}", get(get_meal_by_id))
        .route("/api/get-meal-by-name/{name}", get(get_meal_by_name))
        .route("/api/clear-meals", delete(clear_meals))
        .route("/api/update-meal-stats/{id}", post(update_meal_stats))
        // Combatants
        .route("/api/clear-combatants", post(clear_combatants))
        .route("/api/prep-combatant", post(prep_combatant))
        .route("/api/get-combatants", get(get_combatants))
        // Battle
        .route("/api/get-battle-score", post(get_battle_score))
        .route("/api/battle", get(battle).post(battle))
        .route("/api/sessions", post(open_session))
        .route("/api/sessions/{id}", delete(close_session))
        // Leaderboard
        .route("/api/leaderboard", get(leaderboard))
        // Metrics
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

/// Record request count and latency per normalized path.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = metrics::normalize_path(req.uri().path());
    let started = Instant::now();

    let response = next.run(req).await;

    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[&endpoint])
        .observe(started.elapsed().as_secs_f64());
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[&method, &endpoint, response.status().as_str()])
        .inc();
    response
}

// ── Health handlers ───────────────────────────────────────────────────

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "success", "service": "meal-max-backend" }))
}

async fn db_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.kitchen.check_db().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "database_status": "healthy" })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

// ── Meal handlers ─────────────────────────────────────────────────────

async fn create_meal(
    State(state): State<AppState>,
    payload: Result<Json<NewMeal>, JsonRejection>,
) -> impl IntoResponse {
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };
    match state.kitchen.create_meal(req).await {
        Ok(meal) => (
            StatusCode::CREATED,
            Json(json!({ "status": "success", "meal": meal })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn list_meals(State(state): State<AppState>) -> impl IntoResponse {
    match state.kitchen.list_meals().await {
        Ok(meals) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "meals": meals })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn delete_meal(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> impl IntoResponse {
    let id = match path_param(id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    match state.kitchen.delete_meal(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "deleted": id })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_meal_by_id(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> impl IntoResponse {
    let id = match path_param(id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    match state.kitchen.get_meal(id).await {
        Ok(meal) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "meal": meal })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_meal_by_name(
    State(state): State<AppState>,
    name: Result<Path<String>, PathRejection>,
) -> impl IntoResponse {
    let name = match path_param(name) {
        Ok(name) => name,
        Err(e) => return e.into_response(),
    };
    match state.kitchen.get_meal_by_name(&name).await {
        Ok(meal) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "meal": meal })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn clear_meals(State(state): State<AppState>) -> impl IntoResponse {
    match state.kitchen.clear_meals().await {
        Ok(removed) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "removed": removed })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn update_meal_stats(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateMealStatsRequest>, JsonRejection>,
) -> impl IntoResponse {
    let id = match path_param(id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    let result = match json_body(payload).and_then(|req| req.result.parse::<BattleResult>()) {
        Ok(result) => result,
        Err(e) => return e.into_response(),
    };
    match state.kitchen.update_meal_stats(id, result).await {
        Ok(meal) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "meal": meal })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

// ── Combatant handlers ────────────────────────────────────────────────

async fn clear_combatants(
    State(state): State<AppState>,
    params: Result<Query<SessionParams>, QueryRejection>,
) -> impl IntoResponse {
    let session = match query_params(params) {
        Ok(params) => params.session,
        Err(e) => return e.into_response(),
    };
    match state.kitchen.clear_combatants(session).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "success" }))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn prep_combatant(
    State(state): State<AppState>,
    params: Result<Query<SessionParams>, QueryRejection>,
    payload: Result<Json<PrepCombatantRequest>, JsonRejection>,
) -> impl IntoResponse {
    let session = match query_params(params) {
        Ok(params) => params.session,
        Err(e) => return e.into_response(),
    };
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };
    let result = match (req.id, req.meal) {
        (Some(id), None) => state.kitchen.prep_combatant(session, id).await,
        (None, Some(name)) => {
            state
                .kitchen
                .prep_combatant_by_name(session, &name)
                .await
        }
        _ => Err(MealMaxError::Validation(
            "Provide exactly one of 'id' or 'meal'".into(),
        )),
    };
    match result {
        Ok(combatants) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "combatants": combatants })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_combatants(
    State(state): State<AppState>,
    params: Result<Query<SessionParams>, QueryRejection>,
) -> impl IntoResponse {
    let session = match query_params(params) {
        Ok(params) => params.session,
        Err(e) => return e.into_response(),
    };
    match state.kitchen.combatants(session).await {
        Ok(combatants) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "combatants": combatants })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

// ── Battle handlers ───────────────────────────────────────────────────

async fn get_battle_score(
    State(state): State<AppState>,
    payload: Result<Json<BattleScoreRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };
    let score = match req {
        BattleScoreRequest { id: Some(id), .. } => state.kitchen.score_meal(id).await,
        BattleScoreRequest {
            id: None,
            cuisine: Some(cuisine),
            price: Some(price),
            difficulty: Some(difficulty),
        } => state.kitchen.preview_score(&cuisine, price, &difficulty),
        _ => Err(MealMaxError::Validation(
            "Provide a meal 'id' or 'cuisine', 'price' and 'difficulty'".into(),
        )),
    };
    match score {
        Ok(score) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "score": score })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn battle(
    State(state): State<AppState>,
    params: Result<Query<SessionParams>, QueryRejection>,
) -> impl IntoResponse {
    let session = match query_params(params) {
        Ok(params) => params.session,
        Err(e) => return e.into_response(),
    };
    match state.kitchen.battle(session).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "winner": outcome.winner.meal,
                "outcome": outcome,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn open_session(State(state): State<AppState>) -> impl IntoResponse {
    match state.kitchen.open_session() {
        Ok(id) => (
            StatusCode::CREATED,
            Json(json!({ "status": "success", "session": id })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn close_session(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> impl IntoResponse {
    let id = match path_param(id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    match state.kitchen.close_session(id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "success" }))).into_response(),
        Err(e) => e.into_response(),
    }
}

// ── Leaderboard handler ───────────────────────────────────────────────

async fn leaderboard(
    State(state): State<AppState>,
    params: Result<Query<LeaderboardParams>, QueryRejection>,
) -> impl IntoResponse {
    let params = match query_params(params) {
        Ok(params) => params,
        Err(e) => return e.into_response(),
    };
    let key = match params.sort.as_deref().map(str::parse::<SortKey>).transpose() {
        Ok(key) => key.unwrap_or_default(),
        Err(e) => return e.into_response(),
    };
    let limit = params.limit.unwrap_or(50).min(100);
    let offset = params.offset.unwrap_or(0);
    match state.kitchen.leaderboard(key).await {
        Ok(entries) => {
            let page: Vec<_> = entries.into_iter().skip(offset).take(limit).collect();
            (
                StatusCode::OK,
                Json(json!({ "status": "success", "leaderboard": page })),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

// ── Metrics handler ───────────────────────────────────────────────────

async fn get_metrics() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => MealMaxError::Internal(e).into_response(),
    }
}
