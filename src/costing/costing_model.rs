use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::decimal_utils::{decimal_to_storage, parse_decimal_tolerant};

/// Per-unit landed cost of one lot: the inbound item's FOB price plus its
/// prorated shares of the batch-level freight, clearance and duty pools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LotCost {
    pub batch_id: String,
    pub internal_sku: String,
    pub fob_unit: Decimal,
    pub freight_unit: Decimal,
    pub clearance_unit: Decimal,
    pub duty_unit: Decimal,
}

impl LotCost {
    /// Total landed cost per unit.
    pub fn landed_unit(&self) -> Decimal {
        self.fob_unit + self.freight_unit + self.clearance_unit + self.duty_unit
    }
}

/// Database model for lot_costs
#[derive(Queryable, Selectable, Insertable, AsChangeset, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::lot_costs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LotCostDB {
    pub batch_id: String,
    pub internal_sku: String,
    pub fob_unit: String,
    pub freight_unit: String,
    pub clearance_unit: String,
    pub duty_unit: String,
    pub updated_at: NaiveDateTime,
}

impl From<LotCostDB> for LotCost {
    fn from(db: LotCostDB) -> Self {
        Self {
            batch_id: db.batch_id,
            internal_sku: db.internal_sku,
            fob_unit: parse_decimal_tolerant(&db.fob_unit, "fob_unit"),
            freight_unit: parse_decimal_tolerant(&db.freight_unit, "freight_unit"),
            clearance_unit: parse_decimal_tolerant(&db.clearance_unit, "clearance_unit"),
            duty_unit: parse_decimal_tolerant(&db.duty_unit, "duty_unit"),
        }
    }
}

impl LotCost {
    pub fn into_db(self, now: NaiveDateTime) -> LotCostDB {
        LotCostDB {
            batch_id: self.batch_id,
            internal_sku: self.internal_sku,
            fob_unit: decimal_to_storage(self.fob_unit),
            freight_unit: decimal_to_storage(self.freight_unit),
            clearance_unit: decimal_to_storage(self.clearance_unit),
            duty_unit: decimal_to_storage(self.duty_unit),
            updated_at: now,
        }
    }
}

/// Current stock of one lot, read by `get_inventory`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRow {
    pub batch_id: String,
    pub internal_sku: String,
    pub inbound_date: chrono::NaiveDate,
    pub qty_in: i64,
    pub qty_sold: i64,
    pub qty_remaining: i64,
    pub landed_unit: Decimal,
    pub updated_at: DateTime<Utc>,
}
