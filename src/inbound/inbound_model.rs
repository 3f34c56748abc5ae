use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::InboundError;
use crate::utils::decimal_utils::{decimal_to_storage, parse_decimal_tolerant};

/// Domain model for an inbound batch (one container arrival).
///
/// Freight and clearance totals are container-level pools prorated across the
/// batch's items by CBM volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub batch_id: String,
    pub inbound_date: NaiveDate,
    pub freight_total: Decimal,
    pub clearance_total: Decimal,
    pub dest_marketplace: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database model for batches
#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::batches)]
#[diesel(primary_key(batch_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BatchDB {
    pub batch_id: String,
    pub inbound_date: NaiveDate,
    pub freight_total: String,
    pub clearance_total: String,
    pub dest_marketplace: Option<String>,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<BatchDB> for Batch {
    fn from(db: BatchDB) -> Self {
        Self {
            batch_id: db.batch_id,
            inbound_date: db.inbound_date,
            freight_total: parse_decimal_tolerant(&db.freight_total, "freight_total"),
            clearance_total: parse_decimal_tolerant(&db.clearance_total, "clearance_total"),
            dest_marketplace: db.dest_marketplace,
            note: db.note,
            created_at: DateTime::from_naive_utc_and_offset(db.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(db.updated_at, Utc),
        }
    }
}

/// Domain model for one SKU line inside a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundItem {
    pub batch_id: String,
    pub internal_sku: String,
    pub category: Option<String>,
    pub qty_in: i64,
    pub fob_unit: Decimal,
    pub cbm_per_unit: Decimal,
}

/// Database model for inbound_items
#[derive(Queryable, Selectable, Insertable, AsChangeset, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::inbound_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InboundItemDB {
    pub batch_id: String,
    pub internal_sku: String,
    pub category: Option<String>,
    pub qty_in: i64,
    pub fob_unit: String,
    pub cbm_per_unit: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<InboundItemDB> for InboundItem {
    fn from(db: InboundItemDB) -> Self {
        Self {
            batch_id: db.batch_id,
            internal_sku: db.internal_sku,
            category: db.category,
            qty_in: db.qty_in,
            fob_unit: parse_decimal_tolerant(&db.fob_unit, "fob_unit"),
            cbm_per_unit: parse_decimal_tolerant(&db.cbm_per_unit, "cbm_per_unit"),
        }
    }
}

/// Domain model for a per-(batch, category) customs duty pool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DutyPool {
    pub batch_id: String,
    pub category: String,
    pub duty_total: Decimal,
}

/// Database model for duty_pools
#[derive(Queryable, Selectable, Insertable, AsChangeset, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::duty_pools)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DutyPoolDB {
    pub batch_id: String,
    pub category: String,
    pub duty_total: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<DutyPoolDB> for DutyPool {
    fn from(db: DutyPoolDB) -> Self {
        Self {
            batch_id: db.batch_id,
            category: db.category,
            duty_total: parse_decimal_tolerant(&db.duty_total, "duty_total"),
        }
    }
}

/// Input model for the batch header
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BatchInput {
    pub batch_id: String,
    pub inbound_date: NaiveDate,
    pub freight_total: Decimal,
    pub clearance_total: Decimal,
    pub dest_marketplace: Option<String>,
    pub note: Option<String>,
}

/// Input model for one item line
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InboundItemInput {
    pub internal_sku: String,
    pub category: Option<String>,
    pub qty_in: i64,
    pub fob_unit: Decimal,
    pub cbm_per_unit: Decimal,
}

/// Input model for one duty pool line
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DutyPoolInput {
    pub category: String,
    pub duty_total: Decimal,
}

/// One inbound upload: a batch header with its items and duty pools.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InboundImport {
    pub batch: BatchInput,
    pub items: Vec<InboundItemInput>,
    #[serde(default)]
    pub duty_pools: Vec<DutyPoolInput>,
}

impl InboundImport {
    pub fn validate(&self) -> std::result::Result<(), InboundError> {
        let b = &self.batch;
        if b.batch_id.trim().is_empty() {
            return Err(InboundError::InvalidInbound(
                "batch_id cannot be empty".to_string(),
            ));
        }
        if b.freight_total < Decimal::ZERO || b.clearance_total < Decimal::ZERO {
            return Err(InboundError::InvalidInbound(format!(
                "batch '{}': freight_total and clearance_total must be non-negative",
                b.batch_id
            )));
        }

        for item in &self.items {
            if item.internal_sku.trim().is_empty() {
                return Err(InboundError::InvalidInbound(format!(
                    "batch '{}': item internal_sku cannot be empty",
                    b.batch_id
                )));
            }
            if item.qty_in <= 0 {
                return Err(InboundError::InvalidInbound(format!(
                    "batch '{}' item '{}': qty_in must be positive",
                    b.batch_id, item.internal_sku
                )));
            }
            if item.fob_unit < Decimal::ZERO {
                return Err(InboundError::InvalidInbound(format!(
                    "batch '{}' item '{}': fob_unit cannot be negative",
                    b.batch_id, item.internal_sku
                )));
            }
            if item.cbm_per_unit < Decimal::ZERO {
                return Err(InboundError::InvalidInbound(format!(
                    "batch '{}' item '{}': cbm_per_unit cannot be negative",
                    b.batch_id, item.internal_sku
                )));
            }
        }

        for pool in &self.duty_pools {
            if pool.category.trim().is_empty() {
                return Err(InboundError::InvalidInbound(format!(
                    "batch '{}': duty pool category cannot be empty",
                    b.batch_id
                )));
            }
            if pool.duty_total < Decimal::ZERO {
                return Err(InboundError::InvalidInbound(format!(
                    "batch '{}' category '{}': duty_total cannot be negative",
                    b.batch_id, pool.category
                )));
            }
        }

        Ok(())
    }
}

impl BatchInput {
    pub fn into_db(self, now: NaiveDateTime) -> BatchDB {
        BatchDB {
            batch_id: self.batch_id,
            inbound_date: self.inbound_date,
            freight_total: decimal_to_storage(self.freight_total),
            clearance_total: decimal_to_storage(self.clearance_total),
            dest_marketplace: self.dest_marketplace,
            note: self.note,
            created_at: now,
            updated_at: now,
        }
    }
}

impl InboundItemInput {
    pub fn into_db(self, batch_id: &str, now: NaiveDateTime) -> InboundItemDB {
        InboundItemDB {
            batch_id: batch_id.to_string(),
            internal_sku: self.internal_sku,
            category: self.category,
            qty_in: self.qty_in,
            fob_unit: decimal_to_storage(self.fob_unit),
            cbm_per_unit: decimal_to_storage(self.cbm_per_unit),
            created_at: now,
            updated_at: now,
        }
    }
}

impl DutyPoolInput {
    pub fn into_db(self, batch_id: &str, now: NaiveDateTime) -> DutyPoolDB {
        DutyPoolDB {
            batch_id: batch_id.to_string(),
            category: self.category,
            duty_total: decimal_to_storage(self.duty_total),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Row counts reported by `import_inbound`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportCounts {
    pub batches: usize,
    pub items: usize,
    pub duty_pools: usize,
}
