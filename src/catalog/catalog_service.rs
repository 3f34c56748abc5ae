use std::collections::HashMap;
use std::sync::Arc;

use log::info;

use crate::catalog::catalog_model::*;
use crate::catalog::CatalogRepository;
use crate::db::DbPool;
use crate::errors::Result;
use crate::settings::SettingsService;

/// Service for catalog master data: products, categories and kit mappings.
pub struct CatalogService {
    repo: CatalogRepository,
    settings: Arc<SettingsService>,
}

impl CatalogService {
    pub fn new(pool: Arc<DbPool>, settings: Arc<SettingsService>) -> Self {
        Self {
            repo: CatalogRepository::new(pool),
            settings,
        }
    }

    pub fn get_products(&self) -> Result<Vec<Product>> {
        self.repo.get_products()
    }

    pub fn get_product(&self, sku: &str) -> Result<Option<Product>> {
        self.repo.get_product(sku)
    }

    pub fn upsert_products(&self, inputs: Vec<ProductInput>) -> Result<usize> {
        for input in &inputs {
            input.validate()?;
        }
        let count = self.repo.upsert_products(inputs)?;
        info!("Upserted {} products", count);
        Ok(count)
    }

    pub fn upsert_sku_mappings(&self, inputs: Vec<SkuMappingInput>) -> Result<usize> {
        let allow_fractional = self.settings.get_settings()?.allow_fractional_kits;
        for input in &inputs {
            input.validate(allow_fractional)?;
        }
        let count = self.repo.upsert_sku_mappings(inputs)?;
        info!("Upserted {} sku mappings", count);
        Ok(count)
    }

    pub fn get_active_mappings(&self, marketplace: Option<&str>) -> Result<Vec<SkuMapping>> {
        self.repo.get_active_mappings(marketplace)
    }

    /// Kit expansion table keyed by (marketplace, amazon_sku).
    ///
    /// Component order inside each entry is the repository's deterministic
    /// ordering, which the normalizer relies on.
    pub fn mapping_table(
        &self,
        marketplace: Option<&str>,
    ) -> Result<HashMap<(String, String), Vec<SkuMapping>>> {
        let mut table: HashMap<(String, String), Vec<SkuMapping>> = HashMap::new();
        for mapping in self.repo.get_active_mappings(marketplace)? {
            table
                .entry((mapping.marketplace.clone(), mapping.amazon_sku.clone()))
                .or_default()
                .push(mapping);
        }
        Ok(table)
    }
}
