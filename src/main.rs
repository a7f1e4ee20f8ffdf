use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};

use http::{header, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_cookies::CookieManagerLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod state;
mod storage;

mod models {
    pub mod comment;
    pub mod like;
    pub mod playlist;
    pub mod subscription;
    pub mod tweet;
    pub mod user;
    pub mod video;
}

mod repositories {
    pub mod comment;
    pub mod like;
    pub mod playlist;
    pub mod subscription;
    pub mod tweet;
    pub mod user;
    pub mod video;
}

mod services {
    pub mod assets;
    pub mod auth;
    pub mod ownership;
    pub mod tokens;
}

mod handlers {
    pub mod auth;
    pub mod comments;
    pub mod health;
    pub mod likes;
    pub mod playlists;
    pub mod subscriptions;
    pub mod tweets;
    pub mod videos;
}

mod middleware_layer {
    pub mod auth;
    pub mod rate_limit;
}

mod validation {
    pub mod auth;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    db::init_schema(&state.db).await?;
    tracing::info!("✅ Database schema ready");

    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().unwrap(),
            "http://127.0.0.1:3000".parse().unwrap(),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::COOKIE,
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400));

    let protected_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10_000)
            .burst_size(50_000)
            .use_headers()
            .finish()
            .unwrap(),
    );

    let register_routes = Router::new()
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::rate_limit::rate_limit_register,
        ))
        .with_state(state.clone());

    let login_routes = Router::new()
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::rate_limit::rate_limit_login,
        ))
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/api/v1/health", get(handlers::health::health))
        .route("/api/v1/auth/refresh", post(handlers::auth::refresh))
        .route("/api/v1/videos", get(handlers::videos::list))
        .route("/api/v1/videos/{video_id}", get(handlers::videos::get))
        .route(
            "/api/v1/videos/{video_id}/comments",
            get(handlers::comments::list_for_video),
        )
        .route(
            "/api/v1/users/{user_id}/tweets",
            get(handlers::tweets::list_for_user),
        )
        .route(
            "/api/v1/users/{user_id}/playlists",
            get(handlers::playlists::list_for_user),
        )
        .route(
            "/api/v1/playlists/{playlist_id}",
            get(handlers::playlists::get),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/v1/auth/change-password",
            post(handlers::auth::change_password),
        )
        .route("/api/v1/users/me", get(handlers::auth::me))
        .route("/api/v1/users/me", patch(handlers::auth::update_account))
        .route(
            "/api/v1/users/me/avatar",
            patch(handlers::auth::update_avatar),
        )
        .route(
            "/api/v1/users/me/cover-image",
            patch(handlers::auth::update_cover_image),
        )
        .route("/api/v1/videos", post(handlers::videos::publish))
        .route(
            "/api/v1/videos/{video_id}",
            patch(handlers::videos::update),
        )
        .route(
            "/api/v1/videos/{video_id}",
            delete(handlers::videos::delete),
        )
        .route(
            "/api/v1/videos/{video_id}/toggle-publish",
            patch(handlers::videos::toggle_publish),
        )
        .route(
            "/api/v1/videos/{video_id}/comments",
            post(handlers::comments::create),
        )
        .route(
            "/api/v1/comments/{comment_id}",
            patch(handlers::comments::update),
        )
        .route(
            "/api/v1/comments/{comment_id}",
            delete(handlers::comments::delete),
        )
        .route("/api/v1/tweets", post(handlers::tweets::create))
        .route("/api/v1/tweets/{tweet_id}", patch(handlers::tweets::update))
        .route(
            "/api/v1/tweets/{tweet_id}",
            delete(handlers::tweets::delete),
        )
        .route("/api/v1/playlists", post(handlers::playlists::create))
        .route(
            "/api/v1/playlists/{playlist_id}",
            patch(handlers::playlists::update),
        )
        .route(
            "/api/v1/playlists/{playlist_id}",
            delete(handlers::playlists::delete),
        )
        .route(
            "/api/v1/playlists/{playlist_id}/videos/{video_id}",
            post(handlers::playlists::add_video),
        )
        .route(
            "/api/v1/playlists/{playlist_id}/videos/{video_id}",
            delete(handlers::playlists::remove_video),
        )
        .route(
            "/api/v1/likes/videos/{video_id}",
            post(handlers::likes::toggle_video),
        )
        .route(
            "/api/v1/likes/comments/{comment_id}",
            post(handlers::likes::toggle_comment),
        )
        .route(
            "/api/v1/likes/tweets/{tweet_id}",
            post(handlers::likes::toggle_tweet),
        )
        .route(
            "/api/v1/subscriptions/{channel_id}",
            post(handlers::subscriptions::toggle),
        )
        .layer(tower_governor::GovernorLayer::new(
            protected_governor_conf.clone(),
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let app = Router::new()
        .merge(register_routes)
        .merge(login_routes)
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
        .layer(DefaultBodyLimit::max(1024 * 1024 * 1024))
        .layer(cors);

    let sweep_dir = state.config.temp_dir.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            tracing::info!("🧹 Running scheduled cleanup of stale staged uploads...");
            match services::assets::sweep_stale(&sweep_dir, Duration::from_secs(3600)).await {
                Ok(removed) => {
                    tracing::info!("✅ Cleanup job completed ({} removed)", removed);
                }
                Err(e) => {
                    tracing::error!("❌ Cleanup job failed: {}", e);
                }
            }
        }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], 8000));
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("✅ Background cleanup job started (runs every hour)");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
