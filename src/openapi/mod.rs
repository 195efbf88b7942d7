use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cart API",
        version = "0.1.0",
        description = r#"
# Cart API

Per-user shopping carts. Each user owns at most one cart, created on the
first add. A cart holds at most one line per product; adding a product that
is already present increases its quantity.

## Authentication

Cart endpoints require a bearer token:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Failures share one body shape:

```json
{
  "error": "Not Found",
  "message": "Cart not found for this user",
  "request_id": "0b7c3c1e-...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Cart", description = "Shopping cart endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::commerce::carts::add_to_cart,
        crate::handlers::commerce::carts::get_cart,
        crate::handlers::commerce::carts::remove_from_cart,
        crate::handlers::commerce::carts::update_cart_item,
        crate::api_status,
    ),
    components(
        schemas(
            // Cart types
            crate::handlers::commerce::carts::AddToCartRequest,
            crate::handlers::commerce::carts::RemoveFromCartRequest,
            crate::handlers::commerce::carts::UpdateCartItemRequest,
            crate::handlers::commerce::carts::CartMutationResponse,
            crate::services::commerce::CartDocument,
            crate::services::commerce::CartLineDocument,
            crate::services::commerce::CartContents,
            crate::services::commerce::CartItemView,
            crate::repositories::ProductProjection,
            crate::ApiStatus,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_cart_routes_and_bearer_scheme() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Cart API"));
        assert!(json.contains("/api/v1/cart"));
        assert!(json.contains("/api/v1/cart/{user_id}"));
        assert!(json.contains("\"Bearer\""));
        assert!(json.contains("ErrorResponse"));
    }
}
