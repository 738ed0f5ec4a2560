//! Host header filtering.
//!
//! Rejects requests whose `Host` is not in `ALLOWEDHOSTS` with 400. An empty
//! list disables the check. Entries of the form `*.example.com` match any
//! subdomain of `example.com`.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// Hosts the API answers for.
#[derive(Debug, Clone, Default)]
pub struct AllowedHosts(Arc<[String]>);

impl AllowedHosts {
    #[must_use]
    pub fn new(hosts: &[String]) -> Self {
        Self(hosts.iter().map(|h| h.to_ascii_lowercase()).collect())
    }

    /// Whether filtering is switched off.
    #[must_use]
    pub fn allows_any(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a host (without port) is allowed.
    #[must_use]
    pub fn allows(&self, host: &str) -> bool {
        if self.allows_any() {
            return true;
        }
        let host = host.to_ascii_lowercase();
        self.0.iter().any(|allowed| match allowed.strip_prefix("*.") {
            Some(parent) => host
                .strip_suffix(parent)
                .is_some_and(|prefix| prefix.ends_with('.') && prefix.len() > 1),
            None => *allowed == host,
        })
    }
}

/// Strip the port from a `Host` value, keeping IPv6 brackets.
fn host_without_port(value: &str) -> &str {
    if value.starts_with('[') {
        return value
            .find(']')
            .and_then(|end| value.get(..=end))
            .unwrap_or(value);
    }
    value.rsplit_once(':').map_or(value, |(host, _)| host)
}

/// Reject requests for hosts not in the allow list.
pub async fn host_filter_middleware(
    State(allowed): State<AllowedHosts>,
    request: Request,
    next: Next,
) -> Response {
    if allowed.allows_any() {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().host().map(str::to_string));

    match host {
        Some(host) if allowed.allows(host_without_port(&host)) => next.run(request).await,
        other => {
            tracing::debug!(host = ?other, "Rejected request for unknown host");
            AppError::BadRequest("Invalid host".to_string()).into_response()
        }
    }
}
