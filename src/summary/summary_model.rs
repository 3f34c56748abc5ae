use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::decimal_utils::{decimal_to_storage, parse_decimal_tolerant};

/// Month cost summary for one marketplace (or the synthetic "ALL" row)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    pub ym: String,
    pub marketplace: String,
    pub orders: i64,
    pub units: i64,
    pub fob: Decimal,
    pub freight: Decimal,
    pub clearance: Decimal,
    pub duty: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Database model for month_summaries
#[derive(Queryable, Selectable, Insertable, AsChangeset, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::month_summaries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MonthSummaryDB {
    pub ym: String,
    pub marketplace: String,
    pub orders: i64,
    pub units: i64,
    pub fob: String,
    pub freight: String,
    pub clearance: String,
    pub duty: String,
    pub updated_at: NaiveDateTime,
}

impl From<MonthSummaryDB> for MonthSummary {
    fn from(db: MonthSummaryDB) -> Self {
        Self {
            ym: db.ym,
            marketplace: db.marketplace,
            orders: db.orders,
            units: db.units,
            fob: parse_decimal_tolerant(&db.fob, "fob"),
            freight: parse_decimal_tolerant(&db.freight, "freight"),
            clearance: parse_decimal_tolerant(&db.clearance, "clearance"),
            duty: parse_decimal_tolerant(&db.duty, "duty"),
            updated_at: DateTime::from_naive_utc_and_offset(db.updated_at, Utc),
        }
    }
}

impl MonthSummary {
    pub fn into_db(self) -> MonthSummaryDB {
        MonthSummaryDB {
            ym: self.ym,
            marketplace: self.marketplace,
            orders: self.orders,
            units: self.units,
            fob: decimal_to_storage(self.fob),
            freight: decimal_to_storage(self.freight),
            clearance: decimal_to_storage(self.clearance),
            duty: decimal_to_storage(self.duty),
            updated_at: self.updated_at.naive_utc(),
        }
    }
}
