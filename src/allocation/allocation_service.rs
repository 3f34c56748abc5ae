use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::allocation::allocation_model::{LotState, RebuildReport};
use crate::allocation::fifo_engine::allocate_fifo;
use crate::allocation::AllocationRepository;
use crate::db::{CancelFlag, DbPool, DbTransactionExecutor, RunBudget};
use crate::errors::Result;
use crate::models::{Warning, WarningKind};
use crate::sales::SalesService;
use crate::settings::SettingsService;
use crate::utils::time_utils::Ym;

/// Demands processed between cancellation/deadline checkpoints
const REBUILD_CHUNK: usize = 500;

/// Service running the month allocation rebuild.
///
/// A rebuild is one transaction: reverse the month's live allocations,
/// restore balances, replay the canonical demand stream through the FIFO
/// engine, persist the new ledger rows and balances. Any failure rolls the
/// whole month back.
pub struct AllocationService {
    pool: Arc<DbPool>,
    repo: AllocationRepository,
    sales: Arc<SalesService>,
    settings: Arc<SettingsService>,
}

impl AllocationService {
    pub fn new(
        pool: Arc<DbPool>,
        sales: Arc<SalesService>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            repo: AllocationRepository::new(pool.clone()),
            pool,
            sales,
            settings,
        }
    }

    pub fn fifo_rebuild_month(
        &self,
        ym_str: &str,
        marketplace: Option<&str>,
        cancel: CancelFlag,
    ) -> Result<RebuildReport> {
        let ym = Ym::parse(ym_str)?;
        let settings = self.settings.get_settings()?;
        let tz = settings.reporting_tz()?;
        let (start, end) = ym.utc_window(tz)?;

        let budget = RunBudget::new(
            format!("fifo_rebuild_month {}", ym),
            cancel,
            Duration::from_secs(settings.rebuild_timeout_secs),
        );

        let (demands, unmapped, mut warnings) = self.sales.month_demands(ym, marketplace)?;
        let allow_negative = settings.allow_negative_lots;

        let repo = &self.repo;
        let ym_label = ym.to_string();
        let (reversed_rows, allocation_rows, allocated_units, shortfalls) =
            self.pool.execute(|conn| {
                budget.checkpoint()?;

                // Reverse what a previous run of this month left behind
                let live = repo.live_allocations_in_window_tx(conn, start, end, marketplace)?;
                let reversed_rows = if live.is_empty() {
                    0
                } else {
                    let reversal_id = repo.create_reversal_tx(
                        conn,
                        "rebuild",
                        None,
                        Some(&ym_label),
                        None,
                    )?;
                    let ids: Vec<String> = live.iter().map(|row| row.id.clone()).collect();
                    let marked = repo.mark_reversed_tx(conn, &ids, &reversal_id)?;
                    repo.restore_balances_tx(conn, &live)?;
                    marked
                };

                budget.checkpoint()?;

                // Manually reversed orders were refunded; replay skips them
                let refunded = repo.manually_reversed_orders_tx(conn)?;
                let demands: Vec<_> = demands
                    .iter()
                    .filter(|d| !refunded.contains(&d.order_id))
                    .cloned()
                    .collect();

                // Replay against a fresh lot snapshot with costs frozen now
                let mut lots = repo.load_lot_states_tx(conn)?;
                let mut allocations = Vec::new();
                let mut shortfalls = Vec::new();
                for chunk in demands.chunks(REBUILD_CHUNK) {
                    budget.checkpoint()?;
                    let outcome = allocate_fifo(chunk, &mut lots, allow_negative);
                    allocations.extend(outcome.allocations);
                    shortfalls.extend(outcome.shortfalls);
                }

                let touched: HashSet<(String, String)> = allocations
                    .iter()
                    .filter(|a| a.batch_id != crate::constants::PENDING_BATCH_ID)
                    .map(|a| (a.batch_id.clone(), a.internal_sku.clone()))
                    .collect();
                let touched_lots: Vec<LotState> = lots
                    .into_iter()
                    .filter(|l| touched.contains(&(l.batch_id.clone(), l.internal_sku.clone())))
                    .collect();
                repo.store_lot_states_tx(conn, &touched_lots)?;

                let allocated_units: i64 = allocations.iter().map(|a| a.qty).sum();
                let allocation_rows = repo.insert_allocations_tx(conn, allocations)?;

                Ok((reversed_rows, allocation_rows, allocated_units, shortfalls))
            })?;

        for shortfall in &shortfalls {
            warnings.push(Warning::new(
                WarningKind::Shortfall,
                format!(
                    "order {} sku {}: {} of {} units unfilled",
                    shortfall.order_id,
                    shortfall.internal_sku,
                    shortfall.shortfall,
                    shortfall.requested
                ),
            ));
        }

        info!(
            "Rebuilt {}: reversed {} rows, wrote {} rows / {} units, {} shortfalls, {} unmapped SKUs",
            ym,
            reversed_rows,
            allocation_rows,
            allocated_units,
            shortfalls.len(),
            unmapped.len()
        );

        Ok(RebuildReport {
            ym: ym_label,
            reversed_rows,
            allocation_rows,
            allocated_units,
            shortfalls,
            unmapped,
            warnings,
        })
    }
}
