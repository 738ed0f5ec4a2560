//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Developer exception page (development only)
//! 2. Sentry layers
//! 3. `TraceLayer` (request tracing)
//! 4. Request ID (recorded on the trace span)
//! 5. Session layer (tower-sessions)
//! 6. Swagger document and UI (answered here, outside CORS)
//! 7. CORS (mirror origin, method and headers; credentials allowed)
//! 8. Error handling (JSON error body, panic capture)
//! 9. Service scope
//! 10. Bearer identity
//! 11. Routing, then per endpoint: access guard, host filter, handler

pub mod auth;
pub mod cors;
pub mod developer;
pub mod error_handler;
pub mod host_filter;
pub mod request_id;
pub mod scope;
pub mod session;

pub use auth::{
    CurrentIdentity, RequireAdmin, RequireAuth, SessionAccount, access_guard, check_access,
    clear_current_account, identity_middleware, set_current_account,
};
pub use cors::cors_layer;
pub use developer::developer_exception_middleware;
pub use error_handler::{error_handler_middleware, panic_layer};
pub use host_filter::{AllowedHosts, host_filter_middleware};
pub use request_id::{RequestId, request_id_middleware};
pub use scope::service_scope_middleware;
pub use session::{create_session_layer, postgres_store};
