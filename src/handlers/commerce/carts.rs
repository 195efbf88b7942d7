use crate::handlers::common::{
    map_service_error, success_response, validate_not_nil, RequestBody, ValidatedJson,
};
use crate::{
    errors::{ApiError, ServiceError},
    services::commerce::{CartContents, CartDocument},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const ADDED_MESSAGE: &str = "Product added to cart successfully";
pub const REMOVED_MESSAGE: &str = "Product removed from cart successfully";
pub const UPDATED_MESSAGE: &str = "Product quantity updated successfully";

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            post(add_to_cart)
                .put(update_cart_item)
                .delete(remove_from_cart),
        )
        .route("/:user_id", get(get_cart))
}

/// Add a product to the user's cart
#[utoipa::path(
    post,
    path = "/api/v1/cart",
    summary = "Add to cart",
    description = "Adds a product to the user's cart, creating the cart on first use. Adding a product already in the cart increases its quantity.",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Product added", body = CartMutationResponse),
        (status = 400, description = "Malformed request body", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<AddToCartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .add(payload.user_id, payload.product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CartMutationResponse::new(ADDED_MESSAGE, cart)))
}

/// Fetch a user's cart
#[utoipa::path(
    get,
    path = "/api/v1/cart/{user_id}",
    summary = "Get cart",
    description = "Returns the user's cart lines with each product reduced to id, image and price.",
    params(("user_id" = Uuid, Path, description = "Owning user")),
    responses(
        (status = 200, description = "Cart contents", body = CartContents),
        (status = 400, description = "Malformed user id", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found for this user", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|_| ServiceError::ValidationError("Invalid user ID".to_string()))?;

    let contents = state
        .services
        .cart
        .get_by_user(user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(contents))
}

/// Remove a product from the user's cart
#[utoipa::path(
    delete,
    path = "/api/v1/cart",
    summary = "Remove from cart",
    description = "Removes the product's line from the cart. Removing a product that is not in the cart succeeds without changes.",
    request_body = RemoveFromCartRequest,
    responses(
        (status = 200, description = "Product removed", body = CartMutationResponse),
        (status = 400, description = "Missing fields", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found for this user", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<RemoveFromCartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .remove(payload.user_id, payload.product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CartMutationResponse::new(
        REMOVED_MESSAGE,
        cart,
    )))
}

/// Overwrite the quantity of a product already in the cart
#[utoipa::path(
    put,
    path = "/api/v1/cart",
    summary = "Update quantity",
    description = "Sets the quantity of a product already in the cart.",
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity updated", body = CartMutationResponse),
        (status = 400, description = "Missing or invalid fields", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found, or product not in the cart", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<UpdateCartItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .update_quantity(payload.user_id, payload.product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CartMutationResponse::new(
        UPDATED_MESSAGE,
        cart,
    )))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    #[validate(custom = "validate_not_nil")]
    pub user_id: Uuid,
    #[validate(custom = "validate_not_nil")]
    pub product_id: Uuid,
    /// Amount to add; merged into an existing line
    pub quantity: i32,
}

impl RequestBody for AddToCartRequest {
    const REJECTION: &'static str = "User ID, Product ID, and Quantity are required";
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartRequest {
    #[validate(custom = "validate_not_nil")]
    pub user_id: Uuid,
    #[validate(custom = "validate_not_nil")]
    pub product_id: Uuid,
}

impl RequestBody for RemoveFromCartRequest {
    const REJECTION: &'static str = "User ID and Product ID are required";
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    #[validate(custom = "validate_not_nil")]
    pub user_id: Uuid,
    #[validate(custom = "validate_not_nil")]
    pub product_id: Uuid,
    /// New quantity; stored as given
    pub quantity: i32,
}

impl RequestBody for UpdateCartItemRequest {
    const REJECTION: &'static str = "User ID, Product ID, and Quantity are required";
}

// Response DTOs

/// Body returned by add, remove and update
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartMutationResponse {
    #[schema(example = "Product added to cart successfully")]
    pub message: String,
    pub cart: CartDocument,
}

impl CartMutationResponse {
    fn new(message: &str, cart: CartDocument) -> Self {
        Self {
            message: message.to_string(),
            cart,
        }
    }
}
