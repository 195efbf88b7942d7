use crate::{
    entities::commerce::{cart, cart_line, Cart, CartLine},
    errors::ServiceError,
    repositories::{ProductCatalog, ProductProjection},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::{Expr, OnConflict, SimpleExpr},
    ActiveValue::NotSet,
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const PRODUCT_NOT_FOUND: &str = "Product not found";
const CART_NOT_FOUND: &str = "Cart not found for this user";
const LINE_NOT_FOUND: &str = "Product not found in the cart";
const QUANTITY_OUT_OF_RANGE: &str = "Resulting quantity is out of range";

/// Shopping cart service.
///
/// One cart per user, created lazily by the first `add`. Every mutation runs
/// as a small set of single-statement writes inside a transaction, so two
/// concurrent adds for the same product both land:
///
/// - `add` upserts the cart header, then upserts the line with
///   `quantity = quantity + n` on conflict
/// - `update_quantity` is a single `UPDATE`, zero rows meaning the line is absent
/// - `remove` is a single `DELETE`, a no-op when the line is absent
///
/// The product catalog is injected so existence checks and projections can
/// come from anywhere that implements [`ProductCatalog`].
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    catalog: Arc<dyn ProductCatalog>,
}

/// A cart as stored, with lines in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartDocument {
    /// Owning user
    pub user: Uuid,
    pub products: Vec<CartLineDocument>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartLineDocument {
    /// Product reference
    pub product: Uuid,
    pub quantity: i32,
}

impl CartDocument {
    /// Quantity held for a product, if the cart has a line for it
    pub fn quantity_of(&self, product_id: Uuid) -> Option<i32> {
        self.products
            .iter()
            .find(|line| line.product == product_id)
            .map(|line| line.quantity)
    }
}

/// A cart line with its product resolved to the public projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItemView {
    pub product: ProductProjection,
    pub quantity: i32,
}

/// Read view of a user's cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartContents {
    pub products: Vec<CartItemView>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { db, catalog }
    }

    /// Adds `quantity` of a product to the user's cart.
    ///
    /// Creates the cart if the user has none. If the product already has a
    /// line its quantity is incremented, otherwise a new line is appended.
    ///
    /// # Errors
    ///
    /// * `ServiceError::NotFound` - the product does not exist
    /// * `ServiceError::ValidationError` - the merged quantity overflows i32
    /// * `ServiceError::DatabaseError` - any store failure
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartDocument, ServiceError> {
        if !self.catalog.exists(product_id).await? {
            return Err(ServiceError::NotFound(PRODUCT_NOT_FOUND.to_string()));
        }

        let now = Utc::now();
        let txn = self.db.begin().await?;

        Cart::insert(cart::ActiveModel {
            user_id: Set(user_id),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::column(cart::Column::UserId)
                .update_column(cart::Column::UpdatedAt)
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

        let current = Expr::col((cart_line::Entity, cart_line::Column::Quantity));
        let written = CartLine::insert(cart_line::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::columns([cart_line::Column::UserId, cart_line::Column::ProductId])
                .value(cart_line::Column::Quantity, current.clone().add(quantity))
                .update_column(cart_line::Column::UpdatedAt)
                .action_and_where(increment_fits(current, quantity))
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

        // Zero rows: the merged quantity would leave the i32 range.
        if written == 0 {
            return Err(ServiceError::ValidationError(QUANTITY_OUT_OF_RANGE.to_string()));
        }

        let document = load_document(&txn, user_id)
            .await?
            .ok_or_else(|| ServiceError::InternalError("cart vanished after upsert".to_string()))?;

        txn.commit().await?;

        info!(
            user_id = %user_id,
            product_id = %product_id,
            quantity,
            lines = document.products.len(),
            "Added product to cart"
        );
        Ok(document)
    }

    /// Returns the user's cart with each product projected to id, image and price.
    ///
    /// Lines whose product no longer resolves are left out.
    #[instrument(skip(self))]
    pub async fn get_by_user(&self, user_id: Uuid) -> Result<CartContents, ServiceError> {
        let document = load_document(&*self.db, user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(CART_NOT_FOUND.to_string()))?;

        let ids = document.products.iter().map(|line| line.product).collect();
        let mut projections: HashMap<Uuid, ProductProjection> = self
            .catalog
            .projections(ids)
            .await?
            .into_iter()
            .map(|projection| (projection.id, projection))
            .collect();

        let mut products = Vec::with_capacity(document.products.len());
        for line in document.products {
            match projections.remove(&line.product) {
                Some(product) => products.push(CartItemView {
                    product,
                    quantity: line.quantity,
                }),
                None => warn!(
                    user_id = %user_id,
                    product_id = %line.product,
                    "Cart line references a product that no longer exists"
                ),
            }
        }

        Ok(CartContents { products })
    }

    /// Removes the line for a product. Removing an absent line succeeds.
    ///
    /// # Errors
    ///
    /// * `ServiceError::NotFound` - the user has no cart
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartDocument, ServiceError> {
        let txn = self.db.begin().await?;

        ensure_cart_exists(&txn, user_id).await?;

        let deleted = CartLine::delete_many()
            .filter(cart_line::Column::UserId.eq(user_id))
            .filter(cart_line::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;

        if deleted.rows_affected > 0 {
            touch_cart(&txn, user_id).await?;
        }

        let document = load_document(&txn, user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(CART_NOT_FOUND.to_string()))?;

        txn.commit().await?;

        info!(
            user_id = %user_id,
            product_id = %product_id,
            removed = deleted.rows_affected,
            "Removed product from cart"
        );
        Ok(document)
    }

    /// Overwrites the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// * `ServiceError::NotFound` - the user has no cart, or the cart has no
    ///   line for the product (distinct messages)
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartDocument, ServiceError> {
        let txn = self.db.begin().await?;

        ensure_cart_exists(&txn, user_id).await?;

        let updated = CartLine::update_many()
            .col_expr(cart_line::Column::Quantity, Expr::value(quantity))
            .col_expr(cart_line::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(cart_line::Column::UserId.eq(user_id))
            .filter(cart_line::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;

        if updated.rows_affected == 0 {
            return Err(ServiceError::NotFound(LINE_NOT_FOUND.to_string()));
        }

        touch_cart(&txn, user_id).await?;

        let document = load_document(&txn, user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(CART_NOT_FOUND.to_string()))?;

        txn.commit().await?;

        info!(
            user_id = %user_id,
            product_id = %product_id,
            quantity,
            "Updated cart line quantity"
        );
        Ok(document)
    }
}

async fn ensure_cart_exists<C>(conn: &C, user_id: Uuid) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    Cart::find_by_id(user_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(CART_NOT_FOUND.to_string()))
}

async fn touch_cart<C>(conn: &C, user_id: Uuid) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    Cart::update_many()
        .col_expr(cart::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(cart::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Guard for the upsert's update branch: `current + delta` stays within i32
fn increment_fits(current: Expr, delta: i32) -> SimpleExpr {
    if delta >= 0 {
        current.lte(i32::MAX - delta)
    } else {
        current.gte(i32::MIN - delta)
    }
}

async fn load_document<C>(conn: &C, user_id: Uuid) -> Result<Option<CartDocument>, ServiceError>
where
    C: ConnectionTrait,
{
    let Some(header) = Cart::find_by_id(user_id).one(conn).await? else {
        return Ok(None);
    };

    let lines = CartLine::find()
        .filter(cart_line::Column::UserId.eq(user_id))
        .order_by_asc(cart_line::Column::Id)
        .all(conn)
        .await?;

    Ok(Some(CartDocument {
        user: header.user_id,
        products: lines
            .into_iter()
            .map(|line| CartLineDocument {
                product: line.product_id,
                quantity: line.quantity,
            })
            .collect(),
        created_at: header.created_at,
        updated_at: header.updated_at,
    }))
}
