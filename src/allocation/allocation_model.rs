use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Warning;
use crate::sales::UnmappedSku;
use crate::utils::decimal_utils::{decimal_to_storage, parse_decimal_tolerant};

/// In-memory snapshot of one lot for a FIFO run: balance plus the frozen
/// per-unit cost components that allocations will carry.
#[derive(Debug, Clone, PartialEq)]
pub struct LotState {
    pub batch_id: String,
    pub internal_sku: String,
    pub inbound_date: NaiveDate,
    pub qty_in: i64,
    pub qty_sold: i64,
    pub fob_unit: Decimal,
    pub freight_unit: Decimal,
    pub clearance_unit: Decimal,
    pub duty_unit: Decimal,
}

impl LotState {
    pub fn available(&self) -> i64 {
        self.qty_in - self.qty_sold
    }
}

/// One allocation decided by the engine, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAllocation {
    pub happened_at: DateTime<Utc>,
    pub order_id: String,
    pub marketplace: String,
    pub internal_sku: String,
    pub batch_id: String,
    pub qty: i64,
    pub fob_unit: Decimal,
    pub freight_unit: Decimal,
    pub clearance_unit: Decimal,
    pub duty_unit: Decimal,
}

/// Demand the engine could not fill from inventory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShortfallEvent {
    pub order_id: String,
    pub internal_sku: String,
    pub happened_at: DateTime<Utc>,
    pub marketplace: String,
    pub requested: i64,
    pub shortfall: i64,
}

/// Engine output for one run
#[derive(Debug, Clone, Default)]
pub struct FifoOutcome {
    pub allocations: Vec<PlannedAllocation>,
    pub shortfalls: Vec<ShortfallEvent>,
}

/// Domain model for one immutable allocation ledger row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDetail {
    pub id: String,
    pub happened_at: DateTime<Utc>,
    pub order_id: String,
    pub marketplace: String,
    pub internal_sku: String,
    pub batch_id: String,
    pub qty: i64,
    pub fob_unit: Decimal,
    pub freight_unit: Decimal,
    pub clearance_unit: Decimal,
    pub duty_unit: Decimal,
    pub reversed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Database model for allocation_details
#[derive(Queryable, Selectable, Identifiable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::allocation_details)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AllocationDetailDB {
    pub id: String,
    pub happened_at: NaiveDateTime,
    pub order_id: String,
    pub marketplace: String,
    pub internal_sku: String,
    pub batch_id: String,
    pub qty: i64,
    pub fob_unit: String,
    pub freight_unit: String,
    pub clearance_unit: String,
    pub duty_unit: String,
    pub reversed_by: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<AllocationDetailDB> for AllocationDetail {
    fn from(db: AllocationDetailDB) -> Self {
        Self {
            id: db.id,
            happened_at: DateTime::from_naive_utc_and_offset(db.happened_at, Utc),
            order_id: db.order_id,
            marketplace: db.marketplace,
            internal_sku: db.internal_sku,
            batch_id: db.batch_id,
            qty: db.qty,
            fob_unit: parse_decimal_tolerant(&db.fob_unit, "fob_unit"),
            freight_unit: parse_decimal_tolerant(&db.freight_unit, "freight_unit"),
            clearance_unit: parse_decimal_tolerant(&db.clearance_unit, "clearance_unit"),
            duty_unit: parse_decimal_tolerant(&db.duty_unit, "duty_unit"),
            reversed_by: db.reversed_by,
            created_at: DateTime::from_naive_utc_and_offset(db.created_at, Utc),
        }
    }
}

impl PlannedAllocation {
    pub fn into_db(self, id: String, now: NaiveDateTime) -> AllocationDetailDB {
        AllocationDetailDB {
            id,
            happened_at: self.happened_at.naive_utc(),
            order_id: self.order_id,
            marketplace: self.marketplace,
            internal_sku: self.internal_sku,
            batch_id: self.batch_id,
            qty: self.qty,
            fob_unit: decimal_to_storage(self.fob_unit),
            freight_unit: decimal_to_storage(self.freight_unit),
            clearance_unit: decimal_to_storage(self.clearance_unit),
            duty_unit: decimal_to_storage(self.duty_unit),
            reversed_by: None,
            created_at: now,
        }
    }
}

/// Result of `fifo_rebuild_month`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RebuildReport {
    pub ym: String,
    pub reversed_rows: usize,
    pub allocation_rows: usize,
    pub allocated_units: i64,
    pub shortfalls: Vec<ShortfallEvent>,
    pub unmapped: Vec<UnmappedSku>,
    pub warnings: Vec<Warning>,
}

/// Result of `reverse_order`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReversalReport {
    pub order_id: String,
    /// None when there was nothing live to reverse
    pub reversal_id: Option<String>,
    pub reversed_rows: usize,
    pub restored_units: i64,
    pub affected_lots: Vec<(String, String)>,
}
