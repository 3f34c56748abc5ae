use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::Warning;

/// Domain model for one raw imported sales transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesRaw {
    pub id: String,
    pub happened_at: DateTime<Utc>,
    pub txn_type: String,
    pub order_id: String,
    pub marketplace: String,
    pub amazon_sku: String,
    pub qty: i64,
    pub payload: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Database model for sales_raw
#[derive(Queryable, Selectable, Identifiable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::sales_raw)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SalesRawDB {
    pub id: String,
    pub happened_at: NaiveDateTime,
    pub txn_type: String,
    pub order_id: String,
    pub marketplace: String,
    pub amazon_sku: String,
    pub qty: i64,
    pub payload: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<SalesRawDB> for SalesRaw {
    fn from(db: SalesRawDB) -> Self {
        Self {
            id: db.id,
            happened_at: DateTime::from_naive_utc_and_offset(db.happened_at, Utc),
            txn_type: db.txn_type,
            order_id: db.order_id,
            marketplace: db.marketplace,
            amazon_sku: db.amazon_sku,
            qty: db.qty,
            payload: db.payload,
            created_at: DateTime::from_naive_utc_and_offset(db.created_at, Utc),
        }
    }
}

/// Pre-insert form of a sales row, before an id is assigned
#[derive(Debug, Clone, PartialEq)]
pub struct NewSalesRow {
    pub happened_at: DateTime<Utc>,
    pub txn_type: String,
    pub order_id: String,
    pub marketplace: String,
    pub amazon_sku: String,
    pub qty: i64,
    pub payload: Option<String>,
}

/// One internal-SKU demand derived from a sales row.
///
/// Demands are plain records independent of their origin; the FIFO engine
/// consumes them from the order stream or from fixtures alike.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Demand {
    pub order_id: String,
    pub happened_at: DateTime<Utc>,
    pub marketplace: String,
    pub internal_sku: String,
    pub qty: i64,
    pub source_amazon_sku: String,
}

/// Marketplace SKU seen in sales with no active mapping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnmappedSku {
    pub marketplace: String,
    pub amazon_sku: String,
    pub orders: usize,
    pub units: i64,
}

/// Result of `import_sales_raw`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SalesImportReport {
    pub rows_imported: usize,
    pub duplicates_skipped: usize,
    pub rows_skipped: usize,
    /// Refund-labelled rows kept in the log; the normalizer never consumes
    /// them (returns flow through order reversal instead)
    pub refund_rows: usize,
    pub unmapped: Vec<UnmappedSku>,
    pub warnings: Vec<Warning>,
}
