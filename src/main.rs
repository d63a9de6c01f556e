use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use config::Config;
use db::postgres::PgStreakStore;
use db::store::StreakStore;
use services::changes::ChangeFeed;
use services::refresher::spawn_streak_refresher;
use services::StreakService;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StreakStore>,
    pub streaks: StreakService,
    pub changes: ChangeFeed,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn StreakStore>, config: Arc<Config>) -> Self {
        let changes = ChangeFeed::new(config.change_feed_capacity);
        let streaks = StreakService::new(store.clone(), changes.clone());
        Self {
            store,
            streaks,
            changes,
            config,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/ws", get(handlers::ws::ws_handler));

    let protected_routes = Router::new()
        // Profile
        .route("/api/profile", get(handlers::profile::get_profile))
        .route("/api/profile", put(handlers::profile::update_profile))
        // Workouts
        .route("/api/workouts", get(handlers::workouts::list_workouts))
        .route("/api/workouts", post(handlers::workouts::create_workout))
        .route(
            "/api/workouts/:id",
            delete(handlers::workouts::delete_workout),
        )
        // Streak & calendar
        .route("/api/streak", get(handlers::streak::get_streak))
        .route("/api/streak/refresh", post(handlers::streak::refresh_streak))
        .route("/api/calendar", get(handlers::calendar::get_calendar))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn allowed_origins(config: &Config) -> Vec<HeaderValue> {
    let mut origins = Vec::new();
    match config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => origins.push(origin),
        Err(_) => tracing::warn!(url = %config.frontend_url, "FRONTEND_URL is not a valid origin"),
    }
    // In dev, also allow LAN access (e.g. testing from another device)
    if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
        for o in extra.split(',') {
            if let Ok(hv) = o.trim().parse::<HeaderValue>() {
                origins.push(hv);
            }
        }
    }
    origins
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streakfit_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    let db = db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations applied");

    let store: Arc<dyn StreakStore> = Arc::new(PgStreakStore::new(db, config.default_weekly_goal));
    let state = AppState::new(store, config.clone());

    // Recompute streaks in the background after logs or settings change
    spawn_streak_refresher(
        state.streaks.clone(),
        state.changes.subscribe_all(),
        config.refresh_debounce(),
    );

    let app = build_router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
