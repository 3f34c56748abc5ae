use std::sync::Arc;

use log::info;

use crate::costing::allocator::allocate_costs;
use crate::costing::costing_model::{InventoryRow, LotCost};
use crate::costing::CostingRepository;
use crate::db::{DbPool, DbTransactionExecutor};
use crate::errors::Result;
use crate::inbound::InboundRepository;
use crate::models::Warning;

/// Service owning the `lot_cost` table.
///
/// `rebuild_costs` is a pure recomputation from the inbound ledger: it never
/// reads its own previous output and never touches `qty_sold`.
pub struct CostingService {
    pool: Arc<DbPool>,
    repo: CostingRepository,
    inbound_repo: InboundRepository,
}

impl CostingService {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self {
            repo: CostingRepository::new(pool.clone()),
            inbound_repo: InboundRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn rebuild_costs(&self) -> Result<Vec<Warning>> {
        let batches = self.inbound_repo.get_batches()?;
        let items = self.inbound_repo.get_items()?;
        let duty_pools = self.inbound_repo.get_duty_pools()?;

        let (costs, warnings) = allocate_costs(&batches, &items, &duty_pools)?;

        let n_costs = costs.len();
        self.pool.execute(|conn| {
            self.repo.replace_lot_costs_in_tx(conn, costs)?;
            self.repo.refresh_balances_in_tx(conn, &items)?;
            Ok(())
        })?;

        info!(
            "Rebuilt lot costs: {} lots across {} batches, {} warnings",
            n_costs,
            batches.len(),
            warnings.len()
        );
        Ok(warnings)
    }

    pub fn get_lot_costs(&self) -> Result<Vec<LotCost>> {
        self.repo.get_lot_costs()
    }

    pub fn get_inventory(&self, sku_filter: Option<&str>) -> Result<Vec<InventoryRow>> {
        self.repo.get_inventory(sku_filter)
    }
}
