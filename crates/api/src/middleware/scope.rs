//! Request service scope.
//!
//! Opens a fresh [`ServiceScope`] for every request and drops it with the
//! request, so scoped services never leak between requests.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::services::ServiceScope;
use crate::state::AppState;

/// Insert a new `Arc<ServiceScope>` into the request extensions.
pub async fn service_scope_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let scope = Arc::new(ServiceScope::new(state));
    request.extensions_mut().insert(Arc::clone(&scope));

    let response = next.run(request).await;
    tracing::trace!(scope = ?scope, "Request scope closed");
    response
}
