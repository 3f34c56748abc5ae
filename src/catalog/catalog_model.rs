use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::decimal_utils::{decimal_to_storage, parse_decimal_tolerant};

/// Domain model for an internal product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub internal_sku: String,
    pub category: Option<String>,
    pub cbm_per_unit: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database model for products
#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::products)]
#[diesel(primary_key(internal_sku))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductDB {
    pub internal_sku: String,
    pub category: Option<String>,
    pub cbm_per_unit: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<ProductDB> for Product {
    fn from(db: ProductDB) -> Self {
        Self {
            internal_sku: db.internal_sku,
            category: db.category,
            cbm_per_unit: parse_decimal_tolerant(&db.cbm_per_unit, "cbm_per_unit"),
            created_at: DateTime::from_naive_utc_and_offset(db.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(db.updated_at, Utc),
        }
    }
}

/// Input model for upserting a product
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub internal_sku: String,
    pub category: Option<String>,
    pub cbm_per_unit: Decimal,
}

impl ProductInput {
    pub fn validate(&self) -> crate::catalog::Result<()> {
        if self.internal_sku.trim().is_empty() {
            return Err(crate::catalog::CatalogError::InvalidData(
                "internal_sku cannot be empty".to_string(),
            ));
        }
        if self.cbm_per_unit < Decimal::ZERO {
            return Err(crate::catalog::CatalogError::InvalidData(format!(
                "cbm_per_unit for '{}' cannot be negative",
                self.internal_sku
            )));
        }
        Ok(())
    }

    pub fn into_db(self, now: NaiveDateTime) -> ProductDB {
        ProductDB {
            internal_sku: self.internal_sku,
            category: self.category,
            cbm_per_unit: decimal_to_storage(self.cbm_per_unit),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Domain model mapping one marketplace SKU onto one internal SKU.
///
/// Several active rows for the same (marketplace, amazon_sku) form a kit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkuMapping {
    pub marketplace: String,
    pub amazon_sku: String,
    pub internal_sku: String,
    pub unit_multiplier: Decimal,
    pub is_active: bool,
}

/// Database model for sku_maps
#[derive(Queryable, Selectable, Insertable, AsChangeset, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::sku_maps)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SkuMapDB {
    pub marketplace: String,
    pub amazon_sku: String,
    pub internal_sku: String,
    pub unit_multiplier: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<SkuMapDB> for SkuMapping {
    fn from(db: SkuMapDB) -> Self {
        Self {
            marketplace: db.marketplace,
            amazon_sku: db.amazon_sku,
            internal_sku: db.internal_sku,
            unit_multiplier: parse_decimal_tolerant(&db.unit_multiplier, "unit_multiplier"),
            is_active: db.is_active,
        }
    }
}

/// Input model for upserting a marketplace SKU mapping
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SkuMappingInput {
    pub marketplace: String,
    pub amazon_sku: String,
    pub internal_sku: String,
    pub unit_multiplier: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl SkuMappingInput {
    pub fn validate(&self, allow_fractional: bool) -> crate::catalog::Result<()> {
        if self.marketplace.trim().is_empty()
            || self.amazon_sku.trim().is_empty()
            || self.internal_sku.trim().is_empty()
        {
            return Err(crate::catalog::CatalogError::InvalidData(
                "marketplace, amazon_sku and internal_sku are all required".to_string(),
            ));
        }
        if self.unit_multiplier <= Decimal::ZERO {
            return Err(crate::catalog::CatalogError::InvalidData(format!(
                "unit_multiplier for {}/{} must be positive",
                self.marketplace, self.amazon_sku
            )));
        }
        if !allow_fractional && self.unit_multiplier.fract() != Decimal::ZERO {
            return Err(crate::catalog::CatalogError::InvalidData(format!(
                "unit_multiplier for {}/{} must be an integer (fractional kits are disabled)",
                self.marketplace, self.amazon_sku
            )));
        }
        Ok(())
    }

    pub fn into_db(self, now: NaiveDateTime) -> SkuMapDB {
        SkuMapDB {
            marketplace: self.marketplace,
            amazon_sku: self.amazon_sku,
            internal_sku: self.internal_sku,
            unit_multiplier: decimal_to_storage(self.unit_multiplier),
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}
