//! Global error handling.
//!
//! Every failure leaves the API as `{"message": "..."}` JSON:
//! - [`AppError`](crate::error::AppError) responses already have that shape
//! - extractor rejections, unmatched routes and wrong methods produce plain
//!   text, which is rewritten here
//! - panics are caught by [`panic_layer`] and become a 500
//!
//! In development the internal error text is added as `detail`.

use std::any::Any;

use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

use crate::config::Environment;
use crate::error::{ErrorBody, ErrorDetail};

/// Largest error body that is parsed and rewritten.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Rewrite error responses into the JSON error shape.
pub async fn error_handler_middleware(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let detail = response
        .extensions()
        .get::<ErrorDetail>()
        .filter(|_| environment.is_development())
        .map(|detail| detail.0.clone());

    if is_json(&response) && detail.is_none() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = to_bytes(body, MAX_ERROR_BODY).await.unwrap_or_default();

    let mut error = serde_json::from_slice::<ErrorBody>(&bytes).unwrap_or_else(|_| {
        let text = String::from_utf8_lossy(&bytes).trim().to_string();
        ErrorBody::new(fallback_message(status, text))
    });
    if detail.is_some() {
        error.detail = detail;
    }

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.remove(header::CONTENT_TYPE);
    let rewritten = Json(error).into_response();
    let (json_parts, json_body) = rewritten.into_parts();
    parts.headers.extend(json_parts.headers);
    Response::from_parts(parts, json_body)
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// Message for a non-JSON error body. Server errors never echo their body.
fn fallback_message(status: StatusCode, text: String) -> String {
    if status.is_server_error() || text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        text
    }
}

/// Turns a caught panic into a 500 JSON response.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicToJson;

impl ResponseForPanic for PanicToJson {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let message = panic_message(err.as_ref());
        tracing::error!(panic = %message, "Handler panicked");

        let mut response = (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new("Internal server error")),
        )
            .into_response();
        response
            .extensions_mut()
            .insert(ErrorDetail(format!("panic: {message}")));
        response
    }
}

/// Layer catching handler panics.
#[must_use]
pub fn panic_layer() -> CatchPanicLayer<PanicToJson> {
    CatchPanicLayer::custom(PanicToJson)
}

pub(crate) fn panic_message(err: &(dyn Any + Send)) -> String {
    err.downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| (*s).to_string()))
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        extract::Path,
        middleware::from_fn_with_state,
        routing::{get, post},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::error::AppError;

    async fn broken() -> Result<(), AppError> {
        Err(AppError::Internal("pool exhausted".to_string()))
    }

    async fn explode() -> &'static str {
        panic!("kaboom")
    }

    fn app(environment: Environment) -> Router {
        Router::new()
            .route("/items/{id}", get(|Path(id): Path<i32>| async move { id.to_string() }))
            .route("/items", post(|Json(v): Json<serde_json::Value>| async move { Json(v) }))
            .route("/broken", get(broken))
            .route("/panic", get(explode))
            .layer(panic_layer())
            .layer(from_fn_with_state(environment, error_handler_middleware))
    }

    async fn send(app: Router, request: Request) -> (StatusCode, ErrorBody) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        assert!(is_json(&response));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_route_is_json() {
        let (status, body) = send(app(Environment::Production), get_request("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "Not Found");
    }

    #[tokio::test]
    async fn test_path_rejection_is_json() {
        let (status, body) = send(app(Environment::Production), get_request("/items/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.message.is_empty());
    }

    #[tokio::test]
    async fn test_json_rejection_is_json() {
        let request = Request::builder()
            .method("POST")
            .uri("/items")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(app(Environment::Production), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_detail_only_in_development() {
        let (status, body) = send(app(Environment::Production), get_request("/broken")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Internal server error");
        assert!(body.detail.is_none());

        let (_, body) = send(app(Environment::Development), get_request("/broken")).await;
        assert!(body.detail.unwrap().contains("pool exhausted"));
    }

    #[tokio::test]
    async fn test_panic_becomes_500_json() {
        let (status, body) = send(app(Environment::Development), get_request("/panic")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Internal server error");
        assert_eq!(body.detail.as_deref(), Some("panic: kaboom"));
    }
}
