use std::sync::Arc;

use crate::repositories::ProductCatalog;
use crate::services::commerce::CartService;
use sea_orm::DatabaseConnection;

pub mod commerce;
pub mod common;
pub mod health;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub cart: Arc<CartService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self {
            cart: Arc::new(CartService::new(db, catalog)),
        }
    }
}
