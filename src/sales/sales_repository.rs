use std::sync::Arc;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::sales::sales_model::{NewSalesRow, SalesRaw, SalesRawDB};
use crate::schema::sales_raw;

/// Repository for the raw sales import log
pub struct SalesRepository {
    pool: Arc<DbPool>,
}

impl SalesRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Appends rows in one transaction, skipping duplicates on the
    /// (marketplace, order_id, amazon_sku, happened_at) key.
    ///
    /// Returns (inserted, duplicates_skipped).
    pub fn insert_rows(&self, rows: Vec<NewSalesRow>) -> Result<(usize, usize)> {
        let mut conn = get_connection(&self.pool)?;
        let now = Utc::now().naive_utc();

        conn.transaction::<(usize, usize), Error, _>(|conn| {
            let mut inserted = 0;
            let mut duplicates = 0;

            for row in rows {
                let db_row = SalesRawDB {
                    id: Uuid::new_v4().to_string(),
                    happened_at: row.happened_at.naive_utc(),
                    txn_type: row.txn_type,
                    order_id: row.order_id,
                    marketplace: row.marketplace,
                    amazon_sku: row.amazon_sku,
                    qty: row.qty,
                    payload: row.payload,
                    created_at: now,
                };

                // The unique dedup index absorbs re-uploads of the same file
                let affected = diesel::insert_into(sales_raw::table)
                    .values(&db_row)
                    .on_conflict_do_nothing()
                    .execute(conn)?;

                if affected == 0 {
                    duplicates += 1;
                } else {
                    inserted += 1;
                }
            }

            Ok((inserted, duplicates))
        })
    }

    /// Rows inside the UTC window, optionally narrowed to one marketplace,
    /// in import-independent deterministic order.
    pub fn get_rows_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        marketplace: Option<&str>,
    ) -> Result<Vec<SalesRaw>> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = sales_raw::table
            .filter(sales_raw::happened_at.ge(start.naive_utc()))
            .filter(sales_raw::happened_at.lt(end.naive_utc()))
            .into_boxed();

        if let Some(mp) = marketplace {
            query = query.filter(sales_raw::marketplace.eq(mp));
        }

        let rows = query
            .order((
                sales_raw::happened_at.asc(),
                sales_raw::order_id.asc(),
                sales_raw::amazon_sku.asc(),
            ))
            .load::<SalesRawDB>(&mut conn)?;

        Ok(rows.into_iter().map(SalesRaw::from).collect())
    }
}
