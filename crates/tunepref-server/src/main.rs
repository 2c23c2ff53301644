use axum::{
    http::HeaderValue,
    routing::{get, put},
    Json, Router,
};
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod api;
mod config;
mod spotify;
mod state;

use state::AppState;

#[derive(Serialize)]
struct ApiStatus {
    status: &'static str,
    version: &'static str,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Database connection
    let db_config = tunepref_db::DatabaseConfig::from_env();
    tracing::info!("connecting to database...");
    let db = tunepref_db::connect(&db_config)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("running database migrations...");
    tunepref_migration::Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");
    tracing::info!("migrations complete");

    // Spotify integration
    let spotify_config = config::SpotifyConfig::from_env();
    if spotify_config.client_id.is_empty() || spotify_config.client_secret.is_empty() {
        tracing::warn!(
            "SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET not set — \
             the Spotify endpoints will return 501 until they are configured"
        );
    }
    tracing::info!(redirect_uri = %spotify_config.redirect_uri, "spotify redirect URI");

    let state = Arc::new(AppState {
        db,
        spotify: spotify::SpotifyClient::new(spotify_config),
        tokens: spotify::TokenStore::new(),
    });

    // Rate limiter for the authorization endpoints: they open the consent
    // round trip and hit the accounts service
    let connect_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(6)
            .burst_size(10)
            .finish()
            .expect("failed to build rate limiter config"),
    );

    let connect_routes = Router::new()
        .route("/authorize", get(api::connect::authorize))
        .route("/callback", get(api::connect::callback))
        .layer(GovernorLayer::new(connect_governor_conf));

    let api_routes = Router::new()
        .route(
            "/users",
            get(api::users::list_users).post(api::users::create_user),
        )
        // Static segments must be declared alongside the {id} routes;
        // axum matches them with higher priority.
        .route("/users/get-user-info", get(api::listening::get_user_info))
        .route(
            "/users/add-preferences/{user_id}/{track}/{artist}",
            put(api::preferences::add_preferences),
        )
        .route(
            "/users/{id}",
            get(api::users::get_user)
                .put(api::users::update_user)
                .delete(api::users::delete_user),
        )
        .merge(connect_routes);

    // CORS configuration — restrict to configured origins
    let cors = {
        let allowed_origins_str = std::env::var("CORS_ORIGINS").unwrap_or_default();
        if allowed_origins_str.is_empty() {
            tracing::warn!(
                "CORS_ORIGINS not set — defaulting to restrictive CORS. \
                 Set CORS_ORIGINS=http://localhost:3000 for dev."
            );
            CorsLayer::new()
        } else {
            let origins: Vec<HeaderValue> = allowed_origins_str
                .split(',')
                .filter_map(|s| HeaderValue::from_str(s.trim()).ok())
                .collect();
            tracing::info!("CORS allowed origins: {:?}", origins);
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(tower_http::cors::Any)
        }
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "server started");

    axum::serve(
        tokio::net::TcpListener::bind(addr).await.unwrap(),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

async fn healthz() -> Json<ApiStatus> {
    Json(ApiStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
