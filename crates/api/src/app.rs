//! Application assembly: route table, middleware pipeline and documentation.
//!
//! [`build_app`] is the single place the request pipeline is ordered. See
//! [`crate::middleware`] for the order, outermost first.

use std::time::Duration;

use axum::{
    Router,
    http::{Request, Response},
    middleware::{from_fn, from_fn_with_state},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::SessionStore;
use tracing::Span;

use crate::error::AppError;
use crate::middleware::{
    AllowedHosts, cors_layer, create_session_layer, developer_exception_middleware,
    error_handler_middleware, identity_middleware, panic_layer, request_id_middleware,
    service_scope_middleware,
};
use crate::openapi;
use crate::routes::route_table;
use crate::state::AppState;

async fn not_found() -> AppError {
    AppError::NotFound("Not Found".to_string())
}

/// Build the complete application.
///
/// The session store is a parameter so tests can run without a database.
pub fn build_app<Store>(state: AppState, session_store: Store) -> Router
where
    Store: SessionStore + Clone,
{
    let config = state.config();
    let environment = config.environment;
    let hosts = AllowedHosts::new(&config.allowed_hosts);
    let session_layer = create_session_layer(session_store, config);

    let table = route_table();
    let doc = openapi::document(&table);
    tracing::debug!(endpoints = table.len(), "Route table built");

    let api = table
        .into_router(&hosts)
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), identity_middleware))
        .layer(from_fn_with_state(state.clone(), service_scope_middleware))
        .layer(panic_layer())
        .layer(from_fn_with_state(environment, error_handler_middleware))
        .layer(cors_layer());

    let app = openapi::router(doc)
        .merge(api)
        .with_state(state)
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    if environment.is_development() {
        app.layer(from_fn(developer_exception_middleware))
    } else {
        app
    }
}
