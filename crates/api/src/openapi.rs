//! OpenAPI document and Swagger UI.
//!
//! The document is generated from the [`RouteTable`], so every routed
//! endpoint is documented with its access level. It declares a `Bearer`
//! API key scheme (the `Authorization` header) and requires it globally,
//! which lets Swagger UI send the token on every call.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, Router, extract::State, routing::get};
use utoipa::openapi::path::{Operation, OperationBuilder, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::schema::{ArrayBuilder, Object, Schema, Type};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityRequirement, SecurityScheme};
use utoipa::openapi::{
    Components, Content, ContentBuilder, Ref, RefOr, Required, Response, ResponseBuilder,
};
use utoipa::{Modify, OpenApi};

use crate::error::ErrorBody;
use crate::models::Access;
use crate::routes::{BodyDoc, Endpoint, RouteTable};

/// Path of the JSON document.
pub const SWAGGER_JSON: &str = "/swagger/v1/swagger.json";
/// Path of the interactive UI.
pub const SWAGGER_UI: &str = "/swagger";
/// Name of the bearer security scheme.
pub const BEARER_SCHEME: &str = "Bearer";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chef API",
        version = "v1",
        description = "Catalog, store, order and account services for the Chef grocery platform"
    ),
    components(schemas(ErrorBody)),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the `Bearer` scheme and a global requirement on it.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Components::new);
        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "Authorization",
                "JWT Authorization Header using the bearer scheme",
            ))),
        );
        openapi.security = Some(vec![SecurityRequirement::new(
            BEARER_SCHEME,
            Vec::<String>::new(),
        )]);
    }
}

/// Build the document for a route table.
#[must_use]
pub fn document(table: &RouteTable) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let components = doc.components.get_or_insert_with(Components::new);

    for endpoint in table.iter() {
        for (name, schema) in &endpoint.schemas {
            components
                .schemas
                .entry(name.clone())
                .or_insert_with(|| schema.clone());
        }
        doc.paths.add_path_operation(
            &endpoint.path,
            vec![endpoint.verb.http_method()],
            operation(endpoint),
        );
    }

    doc
}

fn json_content(body: &BodyDoc) -> Content {
    let reference = Ref::from_schema_name(body.schema.clone());
    let schema: RefOr<Schema> = if body.array {
        RefOr::T(Schema::Array(ArrayBuilder::new().items(reference).build()))
    } else {
        reference.into()
    };
    ContentBuilder::new().schema(Some(schema)).build()
}

fn error_response(description: &str) -> Response {
    ResponseBuilder::new()
        .description(description)
        .content(
            "application/json",
            ContentBuilder::new()
                .schema(Some(Ref::from_schema_name("ErrorBody")))
                .build(),
        )
        .build()
}

fn operation_id(endpoint: &Endpoint) -> String {
    let path: String = endpoint
        .path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.trim_matches(|c| c == '{' || c == '}').replace('-', "_"))
        .collect::<Vec<_>>()
        .join("_");
    format!("{}_{path}", endpoint.verb.as_str().to_ascii_lowercase())
}

fn operation(endpoint: &Endpoint) -> Operation {
    let mut builder = OperationBuilder::new()
        .tag(endpoint.tag)
        .summary(Some(endpoint.summary.clone()))
        .operation_id(Some(operation_id(endpoint)));

    for name in endpoint.path_params() {
        let schema_type = if name == "id" {
            Type::Integer
        } else {
            Type::String
        };
        builder = builder.parameter(
            ParameterBuilder::new()
                .name(name)
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .schema(Some(RefOr::T(Schema::Object(Object::with_type(schema_type))))),
        );
    }
    for parameter in &endpoint.query {
        builder = builder.parameter(parameter.clone());
    }

    if let Some(body) = &endpoint.request {
        builder = builder.request_body(Some(
            RequestBodyBuilder::new()
                .content("application/json", json_content(body))
                .required(Some(Required::True))
                .build(),
        ));
    }

    let mut success = ResponseBuilder::new()
        .description(endpoint.status.canonical_reason().unwrap_or("Success"));
    if let Some(body) = &endpoint.response {
        success = success.content("application/json", json_content(body));
    }
    builder = builder.response(endpoint.status.as_str(), success.build());

    if endpoint.access != Access::Public {
        builder = builder.response("401", error_response("Missing or invalid bearer token"));
    }
    if endpoint.access == Access::Admin {
        builder = builder.response("403", error_response("Administrator role required"));
    }

    builder.response("default", error_response("Error")).build()
}

#[derive(Template, WebTemplate)]
#[template(path = "swagger.html")]
struct SwaggerUiTemplate {
    title: &'static str,
    spec_url: &'static str,
}

async fn swagger_json(
    State(doc): State<Arc<utoipa::openapi::OpenApi>>,
) -> Json<utoipa::openapi::OpenApi> {
    Json(doc.as_ref().clone())
}

async fn swagger_ui() -> SwaggerUiTemplate {
    SwaggerUiTemplate {
        title: "Chef API v1",
        spec_url: SWAGGER_JSON,
    }
}

/// Router serving the document and the UI.
pub fn router<S>(doc: utoipa::openapi::OpenApi) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(SWAGGER_JSON, get(swagger_json))
        .route(SWAGGER_UI, get(swagger_ui))
        .with_state(Arc::new(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::route_table;

    #[test]
    fn test_bearer_scheme_declared() {
        let doc = document(&route_table());
        let json = serde_json::to_value(&doc).unwrap();

        let scheme = &json["components"]["securitySchemes"]["Bearer"];
        assert_eq!(scheme["type"], "apiKey");
        assert_eq!(scheme["in"], "header");
        assert_eq!(scheme["name"], "Authorization");
        assert_eq!(
            scheme["description"],
            "JWT Authorization Header using the bearer scheme"
        );
        assert_eq!(json["security"][0]["Bearer"], serde_json::json!([]));
    }

    #[test]
    fn test_paths_follow_route_table() {
        let doc = document(&route_table());
        assert!(doc.paths.paths.contains_key("/api/products"));
        assert!(doc.paths.paths.contains_key("/api/products/{id}"));
        assert!(doc.paths.paths.contains_key("/api/accounts/authenticate"));
        assert!(doc.paths.paths.contains_key("/signin-google"));
        assert!(!doc.paths.paths.contains_key(SWAGGER_JSON));
    }

    #[test]
    fn test_entity_schemas_registered() {
        let doc = document(&route_table());
        let schemas = &doc.components.unwrap().schemas;
        for name in ["Product", "ProductInput", "Order", "AccountView", "ErrorBody"] {
            assert!(schemas.contains_key(name), "missing schema {name}");
        }
    }

    #[test]
    fn test_guarded_operations_document_rejections() {
        let doc = document(&route_table());
        let json = serde_json::to_value(&doc).unwrap();
        let delete = &json["paths"]["/api/brands/{id}"]["delete"];
        assert!(delete["responses"].get("204").is_some());
        assert!(delete["responses"].get("401").is_some());
        assert!(delete["responses"].get("403").is_some());

        let list = &json["paths"]["/api/brands"]["get"];
        assert!(list["responses"].get("401").is_none());
        assert_eq!(list["operationId"], "get_api_brands");
    }

    #[test]
    fn test_openapi_version() {
        let json = serde_json::to_value(document(&route_table())).unwrap();
        assert!(json["openapi"].as_str().unwrap().starts_with("3.1"));
    }
}
