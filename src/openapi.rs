use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Classpix API",
        version = "1.0.0",
        description = r#"
# Classpix School Photography API

Backend for institutions, class photo galleries, photo products and packages,
checkout through a third-party payment gateway, and per-photo download
entitlements.

## Authentication

Parent and staff endpoints authenticate with the signed `cx_session` cookie
issued by the identity service. The gateway callback endpoint is
unauthenticated; the gateway verifies the exchange through the request
signature instead.

## Error Handling

Errors use a consistent response format:

```json
{
  "error": "Bad Request",
  "message": "Invalid Album",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#,
        contact(
            name = "Classpix Engineering",
            email = "engineering@classpix.io"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Checkout", description = "Cart submission and gateway redirect"),
        (name = "Payments", description = "Gateway callback reconciliation"),
        (name = "Orders", description = "Staff order console"),
        (name = "Gallery", description = "Parent-facing course galleries"),
        (name = "Users", description = "Accounts and download entitlements"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::checkout::submit_checkout,
        crate::handlers::payments::gateway_callback,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::courses::open_gallery,
        crate::handlers::users::my_downloads,
        crate::handlers::health::health,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::models::cart::CartUnit,
        crate::models::cart::ProductUnit,
        crate::models::cart::PackageUnit,
        crate::models::cart::PackageItem,
        crate::models::cart::VariationChoice,
        crate::models::cart::PhotoRef,
        crate::models::cart::Entitlement,
        crate::services::orders::CreateOrderRequest,
    ))
)]
pub struct ApiDoc;

/// Swagger UI router serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_includes_core_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/checkout"));
        assert!(paths
            .iter()
            .any(|p| p.as_str() == "/api/v1/payments/gateway/callback"));
        assert!(paths
            .iter()
            .any(|p| p.as_str() == "/api/v1/users/me/downloads"));
    }
}
