use super::{BaseRepository, Repository};
use crate::entities::product::{self, Entity as Product};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// The only product fields a cart exposes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct ProductProjection {
    pub id: Uuid,
    pub image: Option<String>,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
}

/// Read-only view of the product catalog used by the cart
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Whether a product with this id exists
    async fn exists(&self, id: Uuid) -> Result<bool, DbErr>;

    /// Projections for every id that still resolves; unknown ids are skipped
    async fn projections(&self, ids: Vec<Uuid>) -> Result<Vec<ProductProjection>, DbErr>;
}

#[derive(Debug, Clone)]
pub struct DbProductCatalog {
    base: BaseRepository,
}

impl DbProductCatalog {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl ProductCatalog for DbProductCatalog {
    #[instrument(skip(self))]
    async fn exists(&self, id: Uuid) -> Result<bool, DbErr> {
        let count = Product::find_by_id(id).count(self.base.get_db()).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn projections(&self, ids: Vec<Uuid>) -> Result<Vec<ProductProjection>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = Product::find()
            .select_only()
            .column(product::Column::Id)
            .column(product::Column::Image)
            .column(product::Column::Price)
            .filter(product::Column::Id.is_in(ids))
            .into_model::<ProductProjection>()
            .all(self.base.get_db())
            .await?;

        debug!(resolved = rows.len(), "resolved product projections");
        Ok(rows)
    }
}
