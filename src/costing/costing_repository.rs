use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use log::warn;

use crate::costing::costing_model::{InventoryRow, LotCost, LotCostDB};
use crate::db::{get_connection, DbConnection, DbPool};
use crate::errors::Result;
use crate::inbound::InboundItem;
use crate::schema::{batches, lot_balances, lot_costs};

/// Repository for lot costs and lot balances.
///
/// Mutating methods take the caller's connection so `rebuild_costs` can put
/// the cost overwrite and the balance refresh in one transaction.
pub struct CostingRepository {
    pool: Arc<DbPool>,
}

impl CostingRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    pub fn get_lot_costs(&self) -> Result<Vec<LotCost>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = lot_costs::table
            .order((lot_costs::batch_id.asc(), lot_costs::internal_sku.asc()))
            .load::<LotCostDB>(&mut conn)?;

        Ok(rows.into_iter().map(LotCost::from).collect())
    }

    /// Cost lookup keyed by (batch_id, internal_sku).
    pub fn get_cost_map(&self) -> Result<HashMap<(String, String), LotCost>> {
        Ok(self
            .get_lot_costs()?
            .into_iter()
            .map(|c| ((c.batch_id.clone(), c.internal_sku.clone()), c))
            .collect())
    }

    /// Overwrites the whole lot_costs table with the allocator's output.
    pub fn replace_lot_costs_in_tx(
        &self,
        conn: &mut DbConnection,
        costs: Vec<LotCost>,
    ) -> Result<usize> {
        let now = Utc::now().naive_utc();

        diesel::delete(lot_costs::table).execute(conn)?;

        let rows: Vec<LotCostDB> = costs.into_iter().map(|c| c.into_db(now)).collect();
        let count = rows.len();
        diesel::insert_into(lot_costs::table)
            .values(&rows)
            .execute(conn)?;

        Ok(count)
    }

    /// Refreshes `lot_balance.qty_in` from the inbound items without touching
    /// `qty_sold`. Balances for lots that vanished from the ledger are removed
    /// only when nothing has been sold against them.
    pub fn refresh_balances_in_tx(
        &self,
        conn: &mut DbConnection,
        items: &[InboundItem],
    ) -> Result<()> {
        let now = Utc::now().naive_utc();

        for item in items {
            diesel::insert_into(lot_balances::table)
                .values((
                    lot_balances::batch_id.eq(&item.batch_id),
                    lot_balances::internal_sku.eq(&item.internal_sku),
                    lot_balances::qty_in.eq(item.qty_in),
                    lot_balances::qty_sold.eq(0_i64),
                    lot_balances::updated_at.eq(now),
                ))
                .on_conflict((lot_balances::batch_id, lot_balances::internal_sku))
                .do_update()
                .set((
                    lot_balances::qty_in.eq(item.qty_in),
                    lot_balances::updated_at.eq(now),
                ))
                .execute(conn)?;
        }

        let live_keys: BTreeSet<(String, String)> = items
            .iter()
            .map(|i| (i.batch_id.clone(), i.internal_sku.clone()))
            .collect();

        let existing = lot_balances::table
            .select((
                lot_balances::batch_id,
                lot_balances::internal_sku,
                lot_balances::qty_sold,
            ))
            .load::<(String, String, i64)>(conn)?;

        for (batch_id, internal_sku, qty_sold) in existing {
            if live_keys.contains(&(batch_id.clone(), internal_sku.clone())) {
                continue;
            }
            if qty_sold == 0 {
                diesel::delete(
                    lot_balances::table
                        .filter(lot_balances::batch_id.eq(&batch_id))
                        .filter(lot_balances::internal_sku.eq(&internal_sku)),
                )
                .execute(conn)?;
            } else {
                warn!(
                    "Lot ({}, {}) left the inbound ledger but has {} units sold; keeping its balance row",
                    batch_id, internal_sku, qty_sold
                );
            }
        }

        Ok(())
    }

    /// Current stock per lot with landed unit cost, FIFO-ordered.
    pub fn get_inventory(&self, sku_filter: Option<&str>) -> Result<Vec<InventoryRow>> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = lot_balances::table
            .inner_join(batches::table.on(batches::batch_id.eq(lot_balances::batch_id)))
            .into_boxed();

        if let Some(sku) = sku_filter {
            query = query.filter(lot_balances::internal_sku.eq(sku));
        }

        let rows = query
            .select((
                lot_balances::batch_id,
                lot_balances::internal_sku,
                batches::inbound_date,
                lot_balances::qty_in,
                lot_balances::qty_sold,
                lot_balances::updated_at,
            ))
            .order((
                batches::inbound_date.asc(),
                lot_balances::batch_id.asc(),
                lot_balances::internal_sku.asc(),
            ))
            .load::<(String, String, chrono::NaiveDate, i64, i64, chrono::NaiveDateTime)>(
                &mut conn,
            )?;

        let costs = self.get_cost_map()?;

        Ok(rows
            .into_iter()
            .map(
                |(batch_id, internal_sku, inbound_date, qty_in, qty_sold, updated_at)| {
                    let landed_unit = costs
                        .get(&(batch_id.clone(), internal_sku.clone()))
                        .map(LotCost::landed_unit)
                        .unwrap_or_default();
                    InventoryRow {
                        batch_id,
                        internal_sku,
                        inbound_date,
                        qty_in,
                        qty_sold,
                        qty_remaining: qty_in - qty_sold,
                        landed_unit,
                        updated_at: chrono::DateTime::from_naive_utc_and_offset(
                            updated_at,
                            chrono::Utc,
                        ),
                    }
                },
            )
            .collect())
    }
}
