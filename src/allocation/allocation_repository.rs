use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::allocation::allocation_model::*;
use crate::db::{get_connection, DbConnection, DbPool};
use crate::errors::{AllocationError, Result};
use crate::schema::{allocation_details, batches, lot_balances, lot_costs, reversals};
use crate::utils::decimal_utils::parse_decimal_tolerant;

/// Repository for the allocation ledger, reversals and lot balances.
///
/// Mutating methods take the caller's connection: a month rebuild and an
/// order reversal are each one transaction, composed by their services.
pub struct AllocationRepository {
    pool: Arc<DbPool>,
}

impl AllocationRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Snapshot of every lot with a cost row, in storage order.
    ///
    /// The FIFO engine sorts for itself; this only has to be complete. Lots
    /// whose balance predates a cost rebuild (no lot_costs row) are excluded,
    /// matching the rule that allocations always carry allocator output.
    pub fn load_lot_states_tx(&self, conn: &mut DbConnection) -> Result<Vec<LotState>> {
        let rows = lot_balances::table
            .inner_join(batches::table.on(batches::batch_id.eq(lot_balances::batch_id)))
            .inner_join(
                lot_costs::table.on(lot_costs::batch_id
                    .eq(lot_balances::batch_id)
                    .and(lot_costs::internal_sku.eq(lot_balances::internal_sku))),
            )
            .select((
                lot_balances::batch_id,
                lot_balances::internal_sku,
                batches::inbound_date,
                lot_balances::qty_in,
                lot_balances::qty_sold,
                lot_costs::fob_unit,
                lot_costs::freight_unit,
                lot_costs::clearance_unit,
                lot_costs::duty_unit,
            ))
            .load::<(
                String,
                String,
                chrono::NaiveDate,
                i64,
                i64,
                String,
                String,
                String,
                String,
            )>(conn)?;

        Ok(rows
            .into_iter()
            .map(
                |(batch_id, internal_sku, inbound_date, qty_in, qty_sold, fob, freight, clearance, duty)| {
                    LotState {
                        batch_id,
                        internal_sku,
                        inbound_date,
                        qty_in,
                        qty_sold,
                        fob_unit: parse_decimal_tolerant(&fob, "fob_unit"),
                        freight_unit: parse_decimal_tolerant(&freight, "freight_unit"),
                        clearance_unit: parse_decimal_tolerant(&clearance, "clearance_unit"),
                        duty_unit: parse_decimal_tolerant(&duty, "duty_unit"),
                    }
                },
            )
            .collect())
    }

    pub fn live_allocations_in_window_tx(
        &self,
        conn: &mut DbConnection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        marketplace: Option<&str>,
    ) -> Result<Vec<AllocationDetail>> {
        let mut query = allocation_details::table
            .filter(allocation_details::reversed_by.is_null())
            .filter(allocation_details::happened_at.ge(start.naive_utc()))
            .filter(allocation_details::happened_at.lt(end.naive_utc()))
            .into_boxed();

        if let Some(mp) = marketplace {
            query = query.filter(allocation_details::marketplace.eq(mp));
        }

        let rows = query
            .order(allocation_details::id.asc())
            .load::<AllocationDetailDB>(conn)?;

        Ok(rows.into_iter().map(AllocationDetail::from).collect())
    }

    pub fn live_allocations_by_order_tx(
        &self,
        conn: &mut DbConnection,
        order_id: &str,
    ) -> Result<Vec<AllocationDetail>> {
        let rows = allocation_details::table
            .filter(allocation_details::order_id.eq(order_id))
            .filter(allocation_details::reversed_by.is_null())
            .order(allocation_details::id.asc())
            .load::<AllocationDetailDB>(conn)?;

        Ok(rows.into_iter().map(AllocationDetail::from).collect())
    }

    /// Orders with a manual reversal on record. A manual reversal marks the
    /// order refunded, so rebuilds must not re-allocate it.
    pub fn manually_reversed_orders_tx(
        &self,
        conn: &mut DbConnection,
    ) -> Result<std::collections::HashSet<String>> {
        let rows: Vec<Option<String>> = reversals::table
            .filter(reversals::kind.eq("manual"))
            .select(reversals::order_id)
            .load(conn)?;
        Ok(rows.into_iter().flatten().collect())
    }

    /// Creates the audit row a `reversed_by` mark points at.
    pub fn create_reversal_tx(
        &self,
        conn: &mut DbConnection,
        kind: &str,
        order_id: Option<&str>,
        ym: Option<&str>,
        note: Option<&str>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        diesel::insert_into(reversals::table)
            .values((
                reversals::id.eq(&id),
                reversals::kind.eq(kind),
                reversals::order_id.eq(order_id),
                reversals::ym.eq(ym),
                reversals::note.eq(note),
                reversals::created_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;
        Ok(id)
    }

    /// Marks live rows reversed. `reversed_by` is only ever set on rows where
    /// it is still null, so a mark can never be overwritten.
    pub fn mark_reversed_tx(
        &self,
        conn: &mut DbConnection,
        ids: &[String],
        reversal_id: &str,
    ) -> Result<usize> {
        let mut marked = 0;
        for chunk in ids.chunks(500) {
            marked += diesel::update(
                allocation_details::table
                    .filter(allocation_details::id.eq_any(chunk))
                    .filter(allocation_details::reversed_by.is_null()),
            )
            .set(allocation_details::reversed_by.eq(reversal_id))
            .execute(conn)?;
        }
        Ok(marked)
    }

    /// Returns units to their lots after a reversal. Quantities are grouped
    /// per lot before the update so each balance row is touched once.
    pub fn restore_balances_tx(
        &self,
        conn: &mut DbConnection,
        rows: &[AllocationDetail],
    ) -> Result<Vec<(String, String)>> {
        let mut restore: HashMap<(String, String), i64> = HashMap::new();
        for row in rows {
            if row.batch_id == crate::constants::PENDING_BATCH_ID {
                continue; // synthetic lot has no balance row
            }
            *restore
                .entry((row.batch_id.clone(), row.internal_sku.clone()))
                .or_insert(0) += row.qty;
        }

        let mut affected: Vec<(String, String)> = restore.keys().cloned().collect();
        affected.sort();

        let now = Utc::now().naive_utc();
        for ((batch_id, internal_sku), qty) in &restore {
            let current: i64 = lot_balances::table
                .filter(lot_balances::batch_id.eq(batch_id))
                .filter(lot_balances::internal_sku.eq(internal_sku))
                .select(lot_balances::qty_sold)
                .first(conn)?;

            if current < *qty {
                return Err(AllocationError::BalanceUnderflow(
                    batch_id.clone(),
                    internal_sku.clone(),
                )
                .into());
            }

            diesel::update(
                lot_balances::table
                    .filter(lot_balances::batch_id.eq(batch_id))
                    .filter(lot_balances::internal_sku.eq(internal_sku)),
            )
            .set((
                lot_balances::qty_sold.eq(current - qty),
                lot_balances::updated_at.eq(now),
            ))
            .execute(conn)?;
        }

        Ok(affected)
    }

    /// Writes the engine's final `qty_sold` back for the touched lots.
    pub fn store_lot_states_tx(
        &self,
        conn: &mut DbConnection,
        lots: &[LotState],
    ) -> Result<()> {
        let now = Utc::now().naive_utc();
        for lot in lots {
            diesel::update(
                lot_balances::table
                    .filter(lot_balances::batch_id.eq(&lot.batch_id))
                    .filter(lot_balances::internal_sku.eq(&lot.internal_sku)),
            )
            .set((
                lot_balances::qty_sold.eq(lot.qty_sold),
                lot_balances::updated_at.eq(now),
            ))
            .execute(conn)?;
        }
        Ok(())
    }

    pub fn insert_allocations_tx(
        &self,
        conn: &mut DbConnection,
        planned: Vec<PlannedAllocation>,
    ) -> Result<usize> {
        let now = Utc::now().naive_utc();

        let rows: Vec<AllocationDetailDB> = planned
            .into_iter()
            .map(|p| p.into_db(Uuid::new_v4().to_string(), now))
            .collect();

        let mut inserted = 0;
        for chunk in rows.chunks(500) {
            inserted += diesel::insert_into(allocation_details::table)
                .values(chunk)
                .execute(conn)?;
        }
        Ok(inserted)
    }

    /// Live allocations inside a window, read outside any transaction.
    pub fn get_live_allocations_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        marketplace: Option<&str>,
    ) -> Result<Vec<AllocationDetail>> {
        let mut conn = get_connection(&self.pool)?;
        self.live_allocations_in_window_tx(&mut conn, start, end, marketplace)
    }

    pub fn get_allocations_for_order(&self, order_id: &str) -> Result<Vec<AllocationDetail>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = allocation_details::table
            .filter(allocation_details::order_id.eq(order_id))
            .order(allocation_details::created_at.asc())
            .load::<AllocationDetailDB>(&mut conn)?;

        Ok(rows.into_iter().map(AllocationDetail::from).collect())
    }
}
