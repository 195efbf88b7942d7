/// Commerce services module - cart business logic
pub mod cart_service;

// Re-export services for convenience
pub use cart_service::{CartContents, CartDocument, CartItemView, CartLineDocument, CartService};
