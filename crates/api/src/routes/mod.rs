//! Explicit route table.
//!
//! Every endpoint is declared once as an [`Endpoint`]: method, path, access
//! level, handler and the schemas it documents. The same table builds the
//! axum router and the OpenAPI document, so the two cannot drift.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Readiness (database reachable)
//!
//! # Entities (one block per entity, e.g. /api/products)
//! GET    {prefix}                   - List (paged)
//! POST   {prefix}                   - Create
//! GET    {prefix}/{id}              - Get
//! PUT    {prefix}/{id}              - Replace
//! DELETE {prefix}/{id}              - Delete
//!
//! # Accounts
//! POST   /api/accounts/register     - Register a password account
//! GET    /api/accounts/verify-email - Confirm an email address
//! POST   /api/accounts/authenticate - Exchange credentials for a bearer token
//! GET    /api/accounts              - List (admin)
//! GET    /api/accounts/{id}         - Get (self or admin)
//! PUT    /api/accounts/{id}         - Update (self or admin)
//! DELETE /api/accounts/{id}         - Delete (admin)
//!
//! # Sign-in
//! GET  /auth/{provider}/login       - Redirect to Facebook / Google
//! GET  /signin-facebook             - Facebook callback
//! GET  /signin-google               - Google callback
//! GET  /auth/session                - Cookie identity plus a fresh bearer token
//! POST /auth/logout                 - Clear the cookie session
//! GET  /api/identity                - Bearer identity of the caller
//! ```

pub mod accounts;
pub mod auth;
pub mod entities;
pub mod health;

use axum::{
    Router,
    handler::Handler,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{MethodRouter, delete, get, post, put},
};
use utoipa::openapi::path::{HttpMethod, Parameter};
use utoipa::openapi::{RefOr, schema::Schema};
use utoipa::{IntoParams, ToSchema};

use crate::middleware::{AllowedHosts, access_guard, host_filter_middleware};
use crate::models::{Access, catalog, device, location, order, store};
use crate::state::AppState;

/// A documented schema, collected for the OpenAPI components.
pub type NamedSchema = (String, RefOr<Schema>);

/// HTTP method of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    /// The OpenAPI operation type.
    #[must_use]
    pub const fn http_method(self) -> HttpMethod {
        match self {
            Self::Get => HttpMethod::Get,
            Self::Post => HttpMethod::Post,
            Self::Put => HttpMethod::Put,
            Self::Delete => HttpMethod::Delete,
        }
    }

    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// A JSON body reference: a named schema, optionally as an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyDoc {
    pub schema: String,
    pub array: bool,
}

/// One routed, documented endpoint.
pub struct Endpoint {
    pub verb: Verb,
    pub path: String,
    pub tag: &'static str,
    pub summary: String,
    pub access: Access,
    pub status: StatusCode,
    pub request: Option<BodyDoc>,
    pub response: Option<BodyDoc>,
    pub query: Vec<Parameter>,
    pub schemas: Vec<NamedSchema>,
    handler: MethodRouter<AppState>,
}

fn schema_of<T: ToSchema>(schemas: &mut Vec<NamedSchema>) -> String {
    let name = T::name().into_owned();
    schemas.push((name.clone(), T::schema()));
    T::schemas(schemas);
    name
}

impl Endpoint {
    fn new(verb: Verb, path: impl Into<String>, handler: MethodRouter<AppState>) -> Self {
        Self {
            verb,
            path: path.into(),
            tag: "Default",
            summary: String::new(),
            access: Access::Public,
            status: StatusCode::OK,
            request: None,
            response: None,
            query: Vec::new(),
            schemas: Vec::new(),
            handler,
        }
    }

    pub fn get<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::new(Verb::Get, path, get(handler))
    }

    pub fn post<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::new(Verb::Post, path, post(handler))
    }

    pub fn put<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::new(Verb::Put, path, put(handler))
    }

    pub fn delete<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::new(Verb::Delete, path, delete(handler))
    }

    #[must_use]
    pub const fn tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    #[must_use]
    pub const fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Success status other than 200.
    #[must_use]
    pub const fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// JSON request body.
    #[must_use]
    pub fn accepts<T: ToSchema>(mut self) -> Self {
        let schema = schema_of::<T>(&mut self.schemas);
        self.request = Some(BodyDoc {
            schema,
            array: false,
        });
        self
    }

    /// JSON response body.
    #[must_use]
    pub fn returns<T: ToSchema>(mut self) -> Self {
        let schema = schema_of::<T>(&mut self.schemas);
        self.response = Some(BodyDoc {
            schema,
            array: false,
        });
        self
    }

    /// JSON array response body.
    #[must_use]
    pub fn returns_list<T: ToSchema>(mut self) -> Self {
        let schema = schema_of::<T>(&mut self.schemas);
        self.response = Some(BodyDoc {
            schema,
            array: true,
        });
        self
    }

    /// Query string parameters.
    #[must_use]
    pub fn query<P: IntoParams>(mut self) -> Self {
        self.query.extend(P::into_params(|| None));
        self
    }

    /// Names of the `{param}` segments of the path.
    #[must_use]
    pub fn path_params(&self) -> Vec<&str> {
        self.path
            .split('/')
            .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
            .collect()
    }

    /// The handler wrapped in its host filter and access guard.
    fn into_method_router(self, hosts: &AllowedHosts) -> (String, MethodRouter<AppState>) {
        let handler = self
            .handler
            .route_layer(from_fn_with_state(hosts.clone(), host_filter_middleware))
            .route_layer(from_fn_with_state(self.access, access_guard));
        (self.path, handler)
    }
}

/// Every endpoint of the API.
#[derive(Default)]
pub struct RouteTable {
    endpoints: Vec<Endpoint>,
}

impl RouteTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            endpoints: Vec::new(),
        }
    }

    /// Add one endpoint.
    #[must_use]
    pub fn with(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Add several endpoints.
    #[must_use]
    pub fn with_all(mut self, endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        self.endpoints.extend(endpoints);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Build the router. Endpoints sharing a path are merged by method.
    #[must_use]
    pub fn into_router(self, hosts: &AllowedHosts) -> Router<AppState> {
        self.endpoints
            .into_iter()
            .fold(Router::new(), |router, endpoint| {
                let (path, handler) = endpoint.into_method_router(hosts);
                router.route(&path, handler)
            })
    }
}

/// The complete route table.
#[must_use]
pub fn route_table() -> RouteTable {
    RouteTable::new()
        .with_all(health::endpoints())
        .with_all(accounts::endpoints())
        .with_all(auth::endpoints())
        .with_all(entities::endpoints::<device::AppVersion>())
        .with_all(entities::endpoints::<catalog::Brand>())
        .with_all(entities::endpoints::<catalog::Category>())
        .with_all(entities::endpoints::<catalog::SubCategory>())
        .with_all(entities::endpoints::<catalog::ChildCategory>())
        .with_all(entities::endpoints::<location::Country>())
        .with_all(entities::endpoints::<location::State>())
        .with_all(entities::endpoints::<location::City>())
        .with_all(entities::endpoints::<location::Zone>())
        .with_all(entities::endpoints::<location::ZipCode>())
        .with_all(entities::endpoints::<device::Device>())
        .with_all(entities::endpoints::<catalog::FilterType>())
        .with_all(entities::endpoints::<catalog::FilterRange>())
        .with_all(entities::endpoints::<catalog::Unit>())
        .with_all(entities::endpoints::<catalog::VegType>())
        .with_all(entities::endpoints::<store::Store>())
        .with_all(entities::endpoints::<store::StoreDetail>())
        .with_all(entities::endpoints::<store::FavoriteStoreDetail>())
        .with_all(entities::endpoints::<catalog::Product>())
        .with_all(entities::endpoints::<catalog::ProductDetail>())
        .with_all(entities::endpoints::<catalog::ProductImage>())
        .with_all(entities::endpoints::<order::Order>())
        .with_all(entities::endpoints::<order::OrderItem>())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_every_entity_has_five_endpoints() {
        let table = route_table();
        let products: Vec<_> = table
            .iter()
            .filter(|e| e.path.starts_with("/api/products"))
            .map(|e| (e.verb, e.path.as_str()))
            .collect();

        assert_eq!(
            products,
            vec![
                (Verb::Get, "/api/products"),
                (Verb::Post, "/api/products"),
                (Verb::Get, "/api/products/{id}"),
                (Verb::Put, "/api/products/{id}"),
                (Verb::Delete, "/api/products/{id}"),
            ]
        );
    }

    #[test]
    fn test_no_duplicate_method_and_path() {
        let table = route_table();
        let mut seen = HashSet::new();
        for endpoint in table.iter() {
            assert!(
                seen.insert((endpoint.verb, endpoint.path.clone())),
                "{} {} declared twice",
                endpoint.verb.as_str(),
                endpoint.path
            );
        }
        // 23 entities, 7 account endpoints, 6 sign-in endpoints, 2 health checks.
        assert_eq!(table.len(), 23 * 5 + 7 + 6 + 2);
    }

    #[test]
    fn test_path_params() {
        let table = route_table();
        let login = table
            .iter()
            .find(|e| e.path == "/auth/{provider}/login")
            .unwrap();
        assert_eq!(login.path_params(), vec!["provider"]);

        let health = table.iter().find(|e| e.path == "/health").unwrap();
        assert!(health.path_params().is_empty());
    }

    #[test]
    fn test_catalog_reads_are_public_and_writes_admin() {
        let table = route_table();
        for endpoint in table.iter().filter(|e| e.path.starts_with("/api/brands")) {
            let expected = if endpoint.verb == Verb::Get {
                Access::Public
            } else {
                Access::Admin
            };
            assert_eq!(endpoint.access, expected, "{}", endpoint.path);
        }
    }
}
