use std::sync::Arc;

use log::info;

use crate::allocation::allocation_model::{AllocationDetail, ReversalReport};
use crate::allocation::AllocationRepository;
use crate::db::{DbPool, DbTransactionExecutor};
use crate::errors::Result;

/// Service reversing the live allocations of one order.
///
/// Reversal never deletes ledger rows and never rebuilds the month; callers
/// re-run `fifo_rebuild_month` / `summarize_month` when they want the units
/// re-sold or the summary refreshed.
pub struct ReversalService {
    pool: Arc<DbPool>,
    repo: AllocationRepository,
}

impl ReversalService {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self {
            repo: AllocationRepository::new(pool.clone()),
            pool,
        }
    }

    /// Idempotent: a second call finds no live rows and is a no-op.
    pub fn reverse_order(&self, order_id: &str, note: Option<&str>) -> Result<ReversalReport> {
        let repo = &self.repo;
        let report = self.pool.execute(|conn| {
            let live = repo.live_allocations_by_order_tx(conn, order_id)?;
            if live.is_empty() {
                return Ok(ReversalReport {
                    order_id: order_id.to_string(),
                    ..ReversalReport::default()
                });
            }

            let reversal_id =
                repo.create_reversal_tx(conn, "manual", Some(order_id), None, note)?;
            let ids: Vec<String> = live.iter().map(|row| row.id.clone()).collect();
            let reversed_rows = repo.mark_reversed_tx(conn, &ids, &reversal_id)?;
            let affected_lots = repo.restore_balances_tx(conn, &live)?;

            Ok(ReversalReport {
                order_id: order_id.to_string(),
                reversal_id: Some(reversal_id),
                reversed_rows,
                restored_units: live.iter().map(|row| row.qty).sum(),
                affected_lots,
            })
        })?;

        if report.reversal_id.is_some() {
            info!(
                "Reversed order {}: {} rows, {} units returned to {} lots",
                order_id,
                report.reversed_rows,
                report.restored_units,
                report.affected_lots.len()
            );
        } else {
            info!("Order {} has no live allocations; nothing to reverse", order_id);
        }

        Ok(report)
    }

    /// Full ledger history of one order, reversed rows included.
    pub fn get_order_allocations(&self, order_id: &str) -> Result<Vec<AllocationDetail>> {
        self.repo.get_allocations_for_order(order_id)
    }
}
