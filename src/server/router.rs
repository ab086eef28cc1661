use std::any::Any as PanicPayload;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderName, Method, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};

use super::api::api_router;
use super::response::ApiError;
use crate::auth::{SessionManager, require_tenant};
use crate::config::ServiceConfig;
use crate::events::EventManager;
use crate::license::LicenseEngine;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: ServiceConfig,
    pub sessions: SessionManager,
    pub licenses: LicenseEngine,
    pub events: EventManager,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        Self {
            sessions: SessionManager::new(store.clone(), &config),
            licenses: LicenseEngine::new(store.clone(), config.clone()),
            events: EventManager::new(store.clone()),
            store,
            config,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn handle_panic(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {detail}");
    ApiError::internal("Internal Server Error").into_response()
}

/// Browsers may call from any origin; the tenant headers must survive preflight.
fn cors_layer(config: &ServiceConfig) -> CorsLayer {
    let mut headers = vec![header::CONTENT_TYPE, header::AUTHORIZATION];
    headers.extend(
        [&config.tenant_header, &config.identity_header]
            .into_iter()
            .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok()),
    );

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(headers)
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = api_router().layer(middleware::from_fn_with_state(
        state.clone(),
        require_tenant,
    ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(middleware::from_fn(log_request))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors_layer(&state.config))
        .with_state(state)
}
