pub(crate) mod catalog_errors;
pub(crate) mod catalog_model;
pub(crate) mod catalog_repository;
pub(crate) mod catalog_service;

pub use catalog_errors::{CatalogError, Result};
pub use catalog_model::{Product, ProductDB, ProductInput, SkuMapDB, SkuMapping, SkuMappingInput};
pub use catalog_repository::CatalogRepository;
pub use catalog_service::CatalogService;
