use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::allocation::{AllocationService, RebuildReport, ReversalReport, ReversalService};
use crate::catalog::{CatalogService, ProductInput, SkuMappingInput};
use crate::commands::commands_model::CommandOutcome;
use crate::costing::{CostingService, InventoryRow};
use crate::db::{CancelFlag, DbPool, WriterLock};
use crate::errors::Result;
use crate::inbound::{ImportCounts, InboundImport, InboundService};
use crate::models::Warning;
use crate::sales::{SalesImportReport, SalesService};
use crate::settings::{CoreSettings, SettingsService, SettingsUpdate};
use crate::summary::{MonthSummary, SummaryService};

/// Result of the composite `close_month` command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseMonthReport {
    pub rebuild: RebuildReport,
    pub summaries: Vec<MonthSummary>,
}

/// The typed command surface of the core.
///
/// Every mutating command runs under the single writer lock; a concurrent
/// writer gets `BusyWriter` instead of queueing. Reads go straight to the
/// store and see the last committed state.
pub struct LedgerCommands {
    writer: WriterLock,
    settings: Arc<SettingsService>,
    catalog: Arc<CatalogService>,
    inbound: InboundService,
    costing: CostingService,
    sales: Arc<SalesService>,
    allocation: AllocationService,
    reversal: ReversalService,
    summary: SummaryService,
}

impl LedgerCommands {
    pub fn new(pool: Arc<DbPool>) -> Self {
        let settings = Arc::new(SettingsService::new(pool.clone()));
        let catalog = Arc::new(CatalogService::new(pool.clone(), settings.clone()));
        let sales = Arc::new(SalesService::new(
            pool.clone(),
            catalog.clone(),
            settings.clone(),
        ));

        Self {
            writer: WriterLock::new(),
            inbound: InboundService::new(pool.clone()),
            costing: CostingService::new(pool.clone()),
            allocation: AllocationService::new(pool.clone(), sales.clone(), settings.clone()),
            reversal: ReversalService::new(pool.clone()),
            summary: SummaryService::new(pool, settings.clone()),
            settings,
            catalog,
            sales,
        }
    }

    fn mutating<T>(
        &self,
        op: &str,
        f: impl FnOnce() -> Result<(T, Vec<Warning>)>,
    ) -> CommandOutcome<T> {
        let _guard = match self.writer.acquire(op) {
            Ok(guard) => guard,
            Err(err) => return CommandOutcome::failure(err),
        };
        CommandOutcome::from_result(f())
    }

    /// Upserts one inbound batch and recomputes lot costs.
    pub fn import_inbound(&self, import: InboundImport) -> CommandOutcome<ImportCounts> {
        self.mutating("import_inbound", || {
            let counts = self.inbound.import_inbound(import)?;
            let warnings = self.costing.rebuild_costs()?;
            Ok((counts, warnings))
        })
    }

    /// Recomputes `lot_cost` for all batches and refreshes `qty_in` balances.
    pub fn rebuild_costs(&self) -> CommandOutcome<()> {
        self.mutating("rebuild_costs", || {
            let warnings = self.costing.rebuild_costs()?;
            Ok(((), warnings))
        })
    }

    /// Appends one sales CSV to the raw log, deduplicated.
    pub fn import_sales_raw(
        &self,
        csv_bytes: &[u8],
        ym: &str,
        marketplace: &str,
        timezone: Option<&str>,
    ) -> CommandOutcome<SalesImportReport> {
        self.mutating("import_sales_raw", || {
            let mut report = self
                .sales
                .import_sales_raw(csv_bytes, ym, marketplace, timezone)?;
            let warnings = std::mem::take(&mut report.warnings);
            Ok((report, warnings))
        })
    }

    /// Reverses the month's live allocations and replays FIFO.
    pub fn fifo_rebuild_month(
        &self,
        ym: &str,
        marketplace: Option<&str>,
    ) -> CommandOutcome<RebuildReport> {
        self.fifo_rebuild_month_cancellable(ym, marketplace, CancelFlag::new())
    }

    pub fn fifo_rebuild_month_cancellable(
        &self,
        ym: &str,
        marketplace: Option<&str>,
        cancel: CancelFlag,
    ) -> CommandOutcome<RebuildReport> {
        self.mutating("fifo_rebuild_month", || {
            let mut report = self.allocation.fifo_rebuild_month(ym, marketplace, cancel)?;
            let warnings = std::mem::take(&mut report.warnings);
            Ok((report, warnings))
        })
    }

    /// Folds the live ledger into `month_summary` rows.
    pub fn summarize_month(&self, ym: &str) -> CommandOutcome<Vec<MonthSummary>> {
        self.mutating("summarize_month", || {
            Ok((self.summary.summarize_month(ym)?, Vec::new()))
        })
    }

    /// Reverses all live allocations of one order. Does not rebuild.
    pub fn reverse_order(&self, order_id: &str, note: Option<&str>) -> CommandOutcome<ReversalReport> {
        self.mutating("reverse_order", || {
            Ok((self.reversal.reverse_order(order_id, note)?, Vec::new()))
        })
    }

    /// Costs → FIFO → summary in sequence, one writer hold.
    pub fn close_month(
        &self,
        ym: &str,
        marketplace: Option<&str>,
    ) -> CommandOutcome<CloseMonthReport> {
        self.mutating("close_month", || {
            let mut warnings = self.costing.rebuild_costs()?;
            let mut rebuild =
                self.allocation
                    .fifo_rebuild_month(ym, marketplace, CancelFlag::new())?;
            warnings.append(&mut rebuild.warnings);
            let summaries = self.summary.summarize_month(ym)?;
            Ok((CloseMonthReport { rebuild, summaries }, warnings))
        })
    }

    /// Current lot balances with landed unit costs, FIFO-ordered.
    pub fn get_inventory(&self, sku_filter: Option<&str>) -> CommandOutcome<Vec<InventoryRow>> {
        CommandOutcome::from_result(
            self.costing
                .get_inventory(sku_filter)
                .map(|rows| (rows, Vec::new())),
        )
    }

    /// Latest month summaries, most recently updated first.
    pub fn recent_summaries(&self, limit: i64) -> CommandOutcome<Vec<MonthSummary>> {
        CommandOutcome::from_result(
            self.summary
                .recent_summaries(limit)
                .map(|rows| (rows, Vec::new())),
        )
    }

    // Master data maintenance

    pub fn upsert_products(&self, inputs: Vec<ProductInput>) -> CommandOutcome<usize> {
        self.mutating("upsert_products", || {
            Ok((self.catalog.upsert_products(inputs)?, Vec::new()))
        })
    }

    pub fn upsert_sku_mappings(&self, inputs: Vec<SkuMappingInput>) -> CommandOutcome<usize> {
        self.mutating("upsert_sku_mappings", || {
            Ok((self.catalog.upsert_sku_mappings(inputs)?, Vec::new()))
        })
    }

    pub fn get_settings(&self) -> CommandOutcome<CoreSettings> {
        CommandOutcome::from_result(self.settings.get_settings().map(|s| (s, Vec::new())))
    }

    pub fn update_settings(&self, update: SettingsUpdate) -> CommandOutcome<CoreSettings> {
        self.mutating("update_settings", || {
            Ok((self.settings.update_settings(&update)?, Vec::new()))
        })
    }
}
