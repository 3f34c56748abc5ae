use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;

use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::inbound::inbound_model::*;
use crate::schema::{batches, duty_pools, inbound_items};

/// Repository for the inbound ledger (batches, items, duty pools)
pub struct InboundRepository {
    pool: Arc<DbPool>,
}

impl InboundRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Upserts one batch with its items and duty pools in a single transaction.
    ///
    /// Item and duty-pool lines replace the batch's previous lines wholesale,
    /// so re-importing an edited batch never leaves stale rows behind.
    pub fn upsert_import(&self, import: InboundImport) -> Result<ImportCounts> {
        let mut conn = get_connection(&self.pool)?;
        let now = Utc::now().naive_utc();

        conn.transaction::<ImportCounts, Error, _>(|conn| {
            let batch_id = import.batch.batch_id.clone();
            let batch_db = import.batch.into_db(now);

            diesel::insert_into(batches::table)
                .values(&batch_db)
                .on_conflict(batches::batch_id)
                .do_update()
                .set((
                    batches::inbound_date.eq(batch_db.inbound_date),
                    batches::freight_total.eq(batch_db.freight_total.clone()),
                    batches::clearance_total.eq(batch_db.clearance_total.clone()),
                    batches::dest_marketplace.eq(batch_db.dest_marketplace.clone()),
                    batches::note.eq(batch_db.note.clone()),
                    batches::updated_at.eq(batch_db.updated_at),
                ))
                .execute(conn)?;

            diesel::delete(inbound_items::table.filter(inbound_items::batch_id.eq(&batch_id)))
                .execute(conn)?;
            diesel::delete(duty_pools::table.filter(duty_pools::batch_id.eq(&batch_id)))
                .execute(conn)?;

            let item_rows: Vec<InboundItemDB> = import
                .items
                .into_iter()
                .map(|item| item.into_db(&batch_id, now))
                .collect();
            let n_items = item_rows.len();
            diesel::insert_into(inbound_items::table)
                .values(&item_rows)
                .execute(conn)?;

            let pool_rows: Vec<DutyPoolDB> = import
                .duty_pools
                .into_iter()
                .map(|pool| pool.into_db(&batch_id, now))
                .collect();
            let n_pools = pool_rows.len();
            diesel::insert_into(duty_pools::table)
                .values(&pool_rows)
                .execute(conn)?;

            Ok(ImportCounts {
                batches: 1,
                items: n_items,
                duty_pools: n_pools,
            })
        })
    }

    pub fn get_batches(&self) -> Result<Vec<Batch>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = batches::table
            .order((batches::inbound_date.asc(), batches::batch_id.asc()))
            .load::<BatchDB>(&mut conn)?;

        Ok(rows.into_iter().map(Batch::from).collect())
    }

    pub fn get_items(&self) -> Result<Vec<InboundItem>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = inbound_items::table
            .order((
                inbound_items::batch_id.asc(),
                inbound_items::internal_sku.asc(),
            ))
            .load::<InboundItemDB>(&mut conn)?;

        Ok(rows.into_iter().map(InboundItem::from).collect())
    }

    pub fn get_items_for_batch(&self, batch_id: &str) -> Result<Vec<InboundItem>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = inbound_items::table
            .filter(inbound_items::batch_id.eq(batch_id))
            .order(inbound_items::internal_sku.asc())
            .load::<InboundItemDB>(&mut conn)?;

        Ok(rows.into_iter().map(InboundItem::from).collect())
    }

    pub fn get_duty_pools(&self) -> Result<Vec<DutyPool>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = duty_pools::table
            .order((duty_pools::batch_id.asc(), duty_pools::category.asc()))
            .load::<DutyPoolDB>(&mut conn)?;

        Ok(rows.into_iter().map(DutyPool::from).collect())
    }
}
