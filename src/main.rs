use std::sync::Arc;

use meal_max_backend::config::{Config, RandomSourceKind};
use meal_max_backend::db::Database;
use meal_max_backend::kitchen::Kitchen;
use meal_max_backend::random::{RandomOrg, RandomSource, ThreadRandom};
use meal_max_backend::{api, logging, metrics};
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    let config = Config::load();
    logging::init_logger(config.log_format);
    metrics::register_metrics();

    let db = Database::new(&config.database_url)
        .await
        .expect("Failed to initialize database");

    let random: Arc<dyn RandomSource> = match config.random_source {
        RandomSourceKind::Local => Arc::new(ThreadRandom),
        RandomSourceKind::RandomOrg => Arc::new(
            RandomOrg::new(config.random_org_url.clone(), config.random_org_timeout)
                .expect("Failed to build random.org client"),
        ),
    };
    tracing::info!(source = ?config.random_source, "Battle randomness configured");

    let kitchen = Kitchen::new(Arc::new(db), random).with_session_limit(config.max_sessions);

    let app = api::router(kitchen)
        .layer(axum::middleware::from_fn(api::track_metrics))
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!("Meal Max backend listening on {addr}");
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
