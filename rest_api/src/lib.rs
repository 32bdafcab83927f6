// rest_api/src/lib.rs

//! JSON API of the prescription lifecycle service, served under `/api/v1`.

pub mod auth;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod state;

use std::time::Duration;

use anyhow::{Context, Error as AnyhowError};
use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use lib::config::{HmsConfig, RestConfig};

use crate::handlers::{lab_reports, medicines, prescriptions, students, system};

pub use crate::errors::RestApiError;
pub use crate::state::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(system::health_check_handler))
        .route("/version", get(system::version_handler))
        .route("/dashboard/stats", get(system::dashboard_stats))
        .route(
            "/prescriptions",
            get(prescriptions::list_prescriptions).post(prescriptions::create_prescription),
        )
        .route(
            "/prescriptions/:id",
            get(prescriptions::get_prescription)
                .put(prescriptions::update_prescription)
                .delete(prescriptions::delete_prescription),
        )
        .route("/prescriptions/:id/history", get(prescriptions::prescription_history))
        .route("/prescriptions/:id/issue", post(prescriptions::issue_medicines))
        .route("/prescription-medicines", post(prescriptions::attach_medicine))
        .route("/lab-reports", get(lab_reports::list_lab_reports).post(lab_reports::request_lab_test))
        .route("/lab-reports/:id", put(lab_reports::upload_result))
        .route("/medicines", get(medicines::list_medicines).post(medicines::add_medicine))
        .route("/medicines/bulk", post(medicines::bulk_import))
        .route(
            "/medicines/:id",
            get(medicines::get_medicine).put(medicines::edit_medicine).delete(medicines::delete_medicine),
        )
        .route("/students/:id", get(students::get_student))
}

/// The full application: routes plus CORS, request timeout and tracing layers.
pub fn build_router(state: AppState, rest: &RestConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(prescriptions::IDEMPOTENCY_KEY_HEADER),
        ]);
    let cors = if rest.cors_allow_any { cors.allow_origin(Any) } else { cors };

    Router::new()
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(rest.request_timeout_secs)))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serves `router` on an already bound listener until `shutdown_rx` fires.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<(), AnyhowError> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("REST API server listening on {}", addr);
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
            info!("Received shutdown signal.");
        })
        .await
        .context("REST API server failed to start or run")?;
    info!("REST API server stopped.");
    Ok(())
}

// Main function to start the REST API server
pub async fn start_server(config: HmsConfig, shutdown_rx: oneshot::Receiver<()>) -> Result<(), AnyhowError> {
    let state = AppState::from_config(&config)?;
    let store = state.services.store.clone();
    let router = build_router(state, &config.rest);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;
    let result = serve(listener, router, shutdown_rx).await;
    store.flush().await.context("Failed to flush the record store")?;
    result
}
