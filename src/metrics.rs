// Prometheus metrics definitions for the meal battle service.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use uuid::Uuid;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Combatants currently staged in the legacy roster.
    pub static ref LEGACY_ROSTER_SIZE: IntGauge =
        IntGauge::new("meal_max_legacy_roster_size", "Combatants staged in the legacy roster").unwrap();

    /// Open session-scoped rosters.
    pub static ref BATTLE_SESSIONS_OPEN: IntGauge =
        IntGauge::new("meal_max_battle_sessions_open", "Open battle sessions").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    pub static ref MEALS_CREATED_TOTAL: IntCounter =
        IntCounter::new("meal_max_meals_created_total", "Meals added to the catalog").unwrap();

    pub static ref MEALS_DELETED_TOTAL: IntCounter =
        IntCounter::new("meal_max_meals_deleted_total", "Meals soft-deleted").unwrap();

    pub static ref BATTLES_RESOLVED_TOTAL: IntCounter =
        IntCounter::new("meal_max_battles_resolved_total", "Battles resolved").unwrap();

    /// Battles won by the lower-scoring combatant.
    pub static ref BATTLE_UPSETS_TOTAL: IntCounter =
        IntCounter::new("meal_max_battle_upsets_total", "Battles won by the lower score").unwrap();

    /// Failed battle attempts, by error kind.
    pub static ref BATTLES_FAILED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("meal_max_battles_failed_total", "Failed battle attempts"),
        &["kind"],
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("meal_max_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    pub static ref BATTLE_SCORE: Histogram = Histogram::with_opts(
        HistogramOpts::new("meal_max_battle_score", "Battle scores of resolved combatants")
            .buckets(vec![0.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]),
    )
    .unwrap();

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "meal_max_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(LEGACY_ROSTER_SIZE.clone()),
        Box::new(BATTLE_SESSIONS_OPEN.clone()),
        Box::new(MEALS_CREATED_TOTAL.clone()),
        Box::new(MEALS_DELETED_TOTAL.clone()),
        Box::new(BATTLES_RESOLVED_TOTAL.clone()),
        Box::new(BATTLE_UPSETS_TOTAL.clone()),
        Box::new(BATTLES_FAILED_TOTAL.clone()),
        Box::new(API_REQUESTS_TOTAL.clone()),
        Box::new(BATTLE_SCORE.clone()),
        Box::new(API_REQUEST_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            tracing::debug!("metric already registered: {e}");
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {e}"))?;
    String::from_utf8(buffer).map_err(|e| format!("Metrics were not UTF-8: {e}"))
}

/// Normalize a URL path for metric labels: replace numeric and UUID path segments
/// with `:id` to prevent cardinality explosion.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.parse::<i64>().is_ok() || Uuid::parse_str(segment).is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
