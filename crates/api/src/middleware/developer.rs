//! Developer exception page.
//!
//! Development only. When a browser (`Accept: text/html`) hits a server
//! error, the JSON error is replaced by an HTML page showing the internal
//! error text. API clients keep receiving JSON.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::Request,
    http::header::ACCEPT,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::request_id::REQUEST_ID_HEADER;
use crate::error::ErrorDetail;

#[derive(Template, WebTemplate)]
#[template(path = "developer_exception.html")]
struct DeveloperExceptionTemplate {
    status: u16,
    reason: String,
    method: String,
    path: String,
    request_id: Option<String>,
    detail: String,
}

/// Render server errors as an HTML page for browsers.
pub async fn developer_exception_middleware(request: Request, next: Next) -> Response {
    let wants_html = request
        .headers()
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("text/html"));
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();
    if !wants_html || !status.is_server_error() {
        return response;
    }
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let page = DeveloperExceptionTemplate {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
        method,
        path,
        request_id: response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(String::from),
        detail,
    };

    (status, page).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, middleware::from_fn, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::error::AppError;

    async fn failing() -> Result<(), AppError> {
        Err(AppError::Internal("<script>pool</script> exhausted".to_string()))
    }

    fn app() -> Router {
        Router::new()
            .route("/fail", get(failing))
            .layer(from_fn(developer_exception_middleware))
    }

    #[tokio::test]
    async fn test_browser_gets_html_page() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/fail")
                    .header(ACCEPT, "text/html,application/xhtml+xml")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("GET /fail"));
        assert!(html.contains("exhausted"));
        assert!(!html.contains("<script>pool"));
    }

    #[tokio::test]
    async fn test_api_client_keeps_json() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/fail")
                    .header(ACCEPT, "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(
            response
                .headers()
                .get("content-type")
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("application/json")
        );
    }
}
