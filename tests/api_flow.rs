// End-to-end tests driving the HTTP router in-process: catalog CRUD, combatant
// staging, battle resolution and the leaderboard.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use meal_max_backend::api;
use meal_max_backend::db::Database;
use meal_max_backend::kitchen::Kitchen;
use meal_max_backend::random::FixedRandom;

async fn test_app(draws: Vec<f64>) -> Router {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let kitchen = Kitchen::new(Arc::new(db), Arc::new(FixedRandom::new(draws)));
    api::router(kitchen)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create(app: &Router, meal: &str, cuisine: &str, price: f64, difficulty: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/create-meal",
        Some(json!({ "meal": meal, "cuisine": cuisine, "price": price, "difficulty": difficulty })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body["meal"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app(vec![]).await;

    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (status, body) = send(&app, "GET", "/api/db-check", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database_status"], "healthy");
}

#[tokio::test]
async fn test_create_and_fetch_meal() {
    let app = test_app(vec![]).await;
    let id = create(&app, "Spaghetti", "Italian", 12.99, "MED").await;

    let (status, body) = send(&app, "GET", &format!("/api/get-meal-by-id/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meal"]["meal"], "Spaghetti");
    assert_eq!(body["meal"]["difficulty"], "MED");
    assert_eq!(body["meal"]["wins"], 0);

    let (status, body) = send(&app, "GET", "/api/get-meal-by-name/spaghetti", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meal"]["id"], id);

    let (status, body) = send(&app, "GET", "/api/meals", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meals"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_meal_validation_errors() {
    let app = test_app(vec![]).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/create-meal",
        Some(json!({ "meal": "Spaghetti", "cuisine": "Italian", "price": -12.99, "difficulty": "MED" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["kind"], "validation");

    let (status, body) = send(
        &app,
        "POST",
        "/api/create-meal",
        Some(json!({ "meal": "Spaghetti", "cuisine": "Italian", "price": 12.99, "difficulty": "EASY" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid difficulty level: EASY. Must be 'LOW', 'MED', or 'HIGH'."
    );

    let (status, body) = send(
        &app,
        "POST",
        "/api/create-meal",
        Some(json!({ "meal": "Spaghetti", "cuisine": "Italian", "price": "invalid", "difficulty": "MED" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (_, body) = send(&app, "GET", "/api/meals", None).await;
    assert!(body["meals"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_meal_conflict() {
    let app = test_app(vec![]).await;
    create(&app, "Spaghetti", "Italian", 12.99, "MED").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/create-meal",
        Some(json!({ "meal": "Spaghetti", "cuisine": "Italian", "price": 12.99, "difficulty": "MED" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Meal with name 'Spaghetti' already exists");
}

#[tokio::test]
async fn test_soft_delete_hides_meal_everywhere() {
    let app = test_app(vec![]).await;
    let id = create(&app, "Sushi", "Japanese", 15.99, "HIGH").await;

    let (status, _) = send(&app, "DELETE", &format!("/api/delete-meal/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", &format!("/api/get-meal-by-id/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = send(&app, "GET", "/api/get-meal-by-name/Sushi", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &format!("/api/delete-meal/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/api/prep-combatant", Some(json!({ "id": id }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/leaderboard", None).await;
    assert!(body["leaderboard"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_meal_stats() {
    let app = test_app(vec![]).await;
    let id = create(&app, "Burger", "American", 8.99, "LOW").await;

    let uri = format!("/api/update-meal-stats/{id}");
    let (status, body) = send(&app, "POST", &uri, Some(json!({ "result": "win" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meal"]["wins"], 1);
    assert_eq!(body["meal"]["battles"], 1);

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "result": "invalid" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid result: invalid. Expected 'win' or 'loss'.");

    let (status, _) = send(
        &app,
        "POST",
        "/api/update-meal-stats/999",
        Some(json!({ "result": "loss" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_battle_end_to_end() {
    let app = test_app(vec![0.1]).await;
    let bolognese = create(&app, "Bolognese", "Italian", 12.99, "MED").await;
    let burger = create(&app, "Burger", "American", 5.99, "LOW").await;

    let (status, body) = send(&app, "POST", "/api/prep-combatant", Some(json!({ "id": bolognese }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["combatants"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "POST", "/api/prep-combatant", Some(json!({ "meal": "Burger" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["combatants"][1]["id"], burger);

    let (status, body) = send(&app, "GET", "/api/battle", None).await;
    assert_eq!(status, StatusCode::OK, "battle failed: {body}");
    assert_eq!(body["status"], "success");
    // 88.93 vs 44.92, d ≈ 0.33 > 0.1
    assert_eq!(body["winner"], "Bolognese");
    assert_eq!(body["outcome"]["random_draw"], 0.1);
    assert_eq!(body["outcome"]["upset"], false);

    let (_, body) = send(&app, "GET", "/api/get-combatants", None).await;
    assert!(body["combatants"].as_array().unwrap().is_empty());

    let (_, winner) = send(&app, "GET", &format!("/api/get-meal-by-id/{bolognese}"), None).await;
    let (_, loser) = send(&app, "GET", &format!("/api/get-meal-by-id/{burger}"), None).await;
    assert_eq!(winner["meal"]["wins"], 1);
    assert_eq!(winner["meal"]["losses"], 0);
    assert_eq!(loser["meal"]["wins"], 0);
    assert_eq!(loser["meal"]["losses"], 1);

    let (status, body) = send(&app, "GET", "/api/battle", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "insufficient_combatants");
}

#[tokio::test]
async fn test_third_combatant_rejected() {
    let app = test_app(vec![]).await;
    let a = create(&app, "Pizza", "Italian", 10.0, "LOW").await;
    let b = create(&app, "Ramen", "Japanese", 15.0, "HIGH").await;
    let c = create(&app, "Tacos", "Mexican", 7.0, "MED").await;

    for id in [a, b] {
        let (status, _) = send(&app, "POST", "/api/prep-combatant", Some(json!({ "id": id }))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&app, "POST", "/api/prep-combatant", Some(json!({ "id": c }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "roster_full");

    let (_, body) = send(&app, "GET", "/api/get-combatants", None).await;
    let ids: Vec<i64> = body["combatants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![a, b]);

    let (status, _) = send(&app, "POST", "/api/clear-combatants", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", "/api/get-combatants", None).await;
    assert!(body["combatants"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_battle_score_preview() {
    let app = test_app(vec![]).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/get-battle-score",
        Some(json!({ "cuisine": "Italian", "price": 10.0, "difficulty": "LOW" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 67.0);

    let id = create(&app, "Ramen", "Japanese", 15.0, "HIGH").await;
    let (status, body) = send(&app, "POST", "/api/get-battle-score", Some(json!({ "id": id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 119.0);

    let (status, _) = send(
        &app,
        "POST",
        "/api/get-battle-score",
        Some(json!({ "cuisine": "Italian", "price": 0.0, "difficulty": "LOW" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, "GET", "/api/get-combatants", None).await;
    assert!(body["combatants"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_leaderboard_sorting() {
    let app = test_app(vec![]).await;
    let a = create(&app, "A", "Italian", 10.0, "LOW").await;
    let b = create(&app, "B", "Italian", 10.0, "LOW").await;
    let c = create(&app, "C", "Italian", 10.0, "LOW").await;

    // A: 3 wins / 4 battles, B: 3 / 3, C: 1 / 10
    let results: [(i64, &[&str]); 3] = [
        (a, &["win", "win", "win", "loss"]),
        (b, &["win", "win", "win"]),
        (c, &["win", "loss", "loss", "loss", "loss", "loss", "loss", "loss", "loss", "loss"]),
    ];
    for (id, outcomes) in results {
        for result in outcomes {
            let (status, _) = send(
                &app,
                "POST",
                &format!("/api/update-meal-stats/{id}"),
                Some(json!({ "result": result })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    let ids = |body: &Value| -> Vec<i64> {
        body["leaderboard"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_i64().unwrap())
            .collect()
    };

    let (status, body) = send(&app, "GET", "/api/leaderboard?sort=win_pct", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![b, a, c]);
    assert_eq!(body["leaderboard"][0]["win_pct"], 1.0);
    assert_eq!(body["leaderboard"][1]["win_pct"], 0.75);
    assert_eq!(body["leaderboard"][2]["win_pct"], 0.1);

    let (_, body) = send(&app, "GET", "/api/leaderboard?sort=wins", None).await;
    assert_eq!(ids(&body), vec![a, b, c]);

    let (_, body) = send(&app, "GET", "/api/leaderboard?sort=wins&limit=1&offset=1", None).await;
    assert_eq!(ids(&body), vec![b]);

    let (status, body) = send(&app, "GET", "/api/leaderboard?sort=invalid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid sort_by parameter: invalid");
}

#[tokio::test]
async fn test_session_rosters() {
    let app = test_app(vec![0.9]).await;
    let a = create(&app, "Pizza", "Italian", 10.0, "LOW").await;
    let b = create(&app, "Ramen", "Japanese", 15.0, "HIGH").await;

    let (status, body) = send(&app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let session = body["session"].as_str().unwrap().to_string();

    for id in [a, b] {
        let uri = format!("/api/prep-combatant?session={session}");
        let (status, _) = send(&app, "POST", &uri, Some(json!({ "id": id }))).await;
        assert_eq!(status, StatusCode::OK);
    }

    // The legacy roster is untouched.
    let (status, _) = send(&app, "GET", "/api/battle", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", &format!("/api/battle?session={session}"), None).await;
    assert_eq!(status, StatusCode::OK);
    // 0.9 >= d: the lower score (Pizza) wins.
    assert_eq!(body["winner"], "Pizza");
    assert_eq!(body["outcome"]["upset"], true);

    let (status, _) = send(&app, "DELETE", &format!("/api/sessions/{session}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &format!("/api/get-combatants?session={session}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_meals() {
    let app = test_app(vec![]).await;
    let id = create(&app, "Curry", "Indian", 9.0, "MED").await;
    send(&app, "POST", "/api/prep-combatant", Some(json!({ "id": id }))).await;

    let (status, body) = send(&app, "DELETE", "/api/clear-meals", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);

    let (_, body) = send(&app, "GET", "/api/meals", None).await;
    assert!(body["meals"].as_array().unwrap().is_empty());
    let (_, body) = send(&app, "GET", "/api/get-combatants", None).await;
    assert!(body["combatants"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_path_and_query_use_error_body() {
    let app = test_app(vec![]).await;

    for (method, uri) in [
        ("GET", "/api/get-meal-by-id/abc"),
        ("DELETE", "/api/delete-meal/abc"),
        ("GET", "/api/get-combatants?session=not-a-uuid"),
        ("POST", "/api/battle?session=not-a-uuid"),
        ("DELETE", "/api/sessions/not-a-uuid"),
        ("GET", "/api/leaderboard?limit=-1"),
    ] {
        let (status, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
        assert_eq!(body["status"], "error", "{method} {uri}");
        assert_eq!(body["kind"], "validation", "{method} {uri}");
    }
}

#[tokio::test]
async fn test_session_limit_returns_service_unavailable() {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let kitchen =
        Kitchen::new(Arc::new(db), Arc::new(FixedRandom::new(vec![]))).with_session_limit(1);
    let app = api::router(kitchen);

    let (status, _) = send(&app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "too_many_sessions");
}
