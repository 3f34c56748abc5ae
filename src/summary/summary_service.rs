use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use log::info;
use rust_decimal::Decimal;

use crate::allocation::{AllocationDetail, AllocationRepository};
use crate::constants::{ALL_MARKETPLACES, REPORT_DECIMAL_PRECISION};
use crate::db::DbPool;
use crate::errors::Result;
use crate::settings::SettingsService;
use crate::summary::summary_model::MonthSummary;
use crate::summary::SummaryRepository;
use crate::utils::time_utils::Ym;

/// Service folding the live allocation ledger into month summaries.
///
/// Pure over allocation_detail; re-running replaces the month's rows, so it
/// is idempotent and is how a stale summary is refreshed after reversals.
pub struct SummaryService {
    repo: SummaryRepository,
    allocation_repo: AllocationRepository,
    settings: Arc<SettingsService>,
}

#[derive(Default)]
struct Accumulator {
    orders: HashSet<String>,
    units: i64,
    fob: Decimal,
    freight: Decimal,
    clearance: Decimal,
    duty: Decimal,
}

impl Accumulator {
    fn add(&mut self, row: &AllocationDetail) {
        let qty = Decimal::from(row.qty);
        self.orders.insert(row.order_id.clone());
        self.units += row.qty;
        self.fob += qty * row.fob_unit;
        self.freight += qty * row.freight_unit;
        self.clearance += qty * row.clearance_unit;
        self.duty += qty * row.duty_unit;
    }

    fn into_summary(self, ym: &str, marketplace: &str) -> MonthSummary {
        // Report boundary: money rounds to cents here and nowhere earlier
        MonthSummary {
            ym: ym.to_string(),
            marketplace: marketplace.to_string(),
            orders: self.orders.len() as i64,
            units: self.units,
            fob: self.fob.round_dp(REPORT_DECIMAL_PRECISION),
            freight: self.freight.round_dp(REPORT_DECIMAL_PRECISION),
            clearance: self.clearance.round_dp(REPORT_DECIMAL_PRECISION),
            duty: self.duty.round_dp(REPORT_DECIMAL_PRECISION),
            updated_at: Utc::now(),
        }
    }
}

impl SummaryService {
    pub fn new(pool: Arc<DbPool>, settings: Arc<SettingsService>) -> Self {
        Self {
            repo: SummaryRepository::new(pool.clone()),
            allocation_repo: AllocationRepository::new(pool),
            settings,
        }
    }

    pub fn summarize_month(&self, ym_str: &str) -> Result<Vec<MonthSummary>> {
        let ym = Ym::parse(ym_str)?;
        let tz = self.settings.get_settings()?.reporting_tz()?;
        let (start, end) = ym.utc_window(tz)?;

        let live = self
            .allocation_repo
            .get_live_allocations_in_window(start, end, None)?;

        let mut per_marketplace: BTreeMap<String, Accumulator> = BTreeMap::new();
        let mut all = Accumulator::default();
        for row in &live {
            per_marketplace
                .entry(row.marketplace.clone())
                .or_default()
                .add(row);
            all.add(row);
        }

        let ym_label = ym.to_string();
        let mut rows: Vec<MonthSummary> = per_marketplace
            .into_iter()
            .map(|(marketplace, acc)| acc.into_summary(&ym_label, &marketplace))
            .collect();
        if !live.is_empty() {
            rows.push(all.into_summary(&ym_label, ALL_MARKETPLACES));
        }

        self.repo.replace_month(&ym_label, rows.clone())?;
        info!(
            "Summarized {}: {} marketplace rows from {} live allocations",
            ym_label,
            rows.len(),
            live.len()
        );

        Ok(rows)
    }

    pub fn get_for_month(&self, ym: &str) -> Result<Vec<MonthSummary>> {
        self.repo.get_for_month(ym)
    }

    pub fn recent_summaries(&self, limit: i64) -> Result<Vec<MonthSummary>> {
        self.repo.recent(limit)
    }
}
