mod config;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::get,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use board_api::{AppState, AppStateInner};
use board_db::Database;

use crate::config::Config;

const ROUTES: &[(&str, &str, &str)] = &[
    ("POST", "/api/database/create", "create database"),
    ("POST", "/api/database/connect", "connect database"),
    ("GET", "/api/database/status", "database status"),
    ("POST", "/api/users", "create user"),
    ("GET", "/api/users", "list users"),
    ("GET", "/api/users/{id}", "get user"),
    ("PUT", "/api/users/{id}", "update user"),
    ("DELETE", "/api/users/{id}", "delete user"),
    ("POST", "/api/addContent", "post message"),
    ("GET", "/api/getAllContent", "list messages"),
    ("DELETE", "/api/removeContent/{msg_id}", "delete message"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "board=debug,board_api=debug,board_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // No database yet: it is created and connected through the admin API.
    let state: AppState = Arc::new(AppStateInner {
        db: Database::new(&config.data_dir, config.pool_size),
    });

    let app = app(state, &config.web_dir);

    info!("Project root: {}", config.project_root.display());
    info!("Web directory: {}", config.web_dir.display());
    info!("Data directory: {}", config.data_dir.display());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Board server listening on http://{}", addr);
    for (method, path, what) in ROUTES {
        info!("  {:<6} {:<30} {}", method, path, what);
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

fn app(state: AppState, web_dir: &Path) -> Router {
    board_api::router(state)
        .nest_service("/static", ServeDir::new(web_dir))
        .route("/", get(index))
        .layer(middleware::from_fn(board_api::middleware::cors))
        .layer(TraceLayer::new_for_http())
}

async fn index() -> impl IntoResponse {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/static/index.html")])
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::warn!("Cannot install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(dir: &tempfile::TempDir) -> Router {
        let web_dir = dir.path().join("web");
        std::fs::create_dir_all(&web_dir).unwrap();
        std::fs::write(web_dir.join("index.html"), "<h1>board</h1>").unwrap();

        let state = Arc::new(AppStateInner {
            db: Database::new(dir.path().join("data"), 2),
        });
        app(state, &web_dir)
    }

    #[tokio::test]
    async fn root_redirects_to_index() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/static/index.html");
    }

    #[tokio::test]
    async fn static_assets_are_served() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(Request::get("/static/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"<h1>board</h1>");
    }

    #[tokio::test]
    async fn api_is_mounted() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(Request::get("/api/database/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
