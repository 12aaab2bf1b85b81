//! Product catalog: products, reviews and stock.

mod model;
mod service;

pub use model::{NewProduct, Product, ProductSearch, ProductUpdate, Review};
pub use service::CatalogService;
