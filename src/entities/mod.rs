pub mod commerce;
pub mod product;

pub use product::{Entity as Product, Model as ProductModel};
