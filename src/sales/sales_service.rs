use std::collections::HashMap;
use std::sync::Arc;

use chrono_tz::Tz;
use log::{info, warn};
use serde_json::json;

use crate::catalog::{CatalogService, SkuMapping};
use crate::db::DbPool;
use crate::errors::Result;
use crate::models::{Warning, WarningKind};
use crate::sales::csv_parser::parse_sales_csv;
use crate::sales::normalizer::normalize_demands;
use crate::sales::sales_model::*;
use crate::sales::SalesRepository;
use crate::settings::SettingsService;
use crate::utils::time_utils::{parse_timestamp, Ym};

/// Service for sales ingest and month demand projection.
pub struct SalesService {
    repo: SalesRepository,
    catalog: Arc<CatalogService>,
    settings: Arc<SettingsService>,
}

impl SalesService {
    pub fn new(
        pool: Arc<DbPool>,
        catalog: Arc<CatalogService>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            repo: SalesRepository::new(pool),
            catalog,
            settings,
        }
    }

    /// Imports one sales CSV file into the raw log.
    ///
    /// The whole file is appended (dedup key aside): rows outside the declared
    /// month and rows of other transaction types stay in the log for later
    /// months and for the audit trail; only the normalizer filters.
    pub fn import_sales_raw(
        &self,
        csv_bytes: &[u8],
        ym: &str,
        default_marketplace: &str,
        timezone: Option<&str>,
    ) -> Result<SalesImportReport> {
        let settings = self.settings.get_settings()?;
        let ym = Ym::parse(ym)?;

        let file_tz: Tz = match timezone {
            Some(name) => name.parse::<Tz>().map_err(|_| {
                crate::errors::Error::Config(crate::errors::ConfigError::InvalidValue(format!(
                    "unknown timezone '{}'",
                    name
                )))
            })?,
            None => settings.reporting_tz()?,
        };
        let (month_start, month_end) = ym.utc_window(file_tz)?;

        let parsed = parse_sales_csv(csv_bytes)?;
        let mut warnings = parsed.warnings;
        let mut rows_skipped = 0usize;
        let mut refund_rows = 0usize;

        let mut new_rows: Vec<NewSalesRow> = Vec::new();
        for row in &parsed.rows {
            let happened_at = match parse_timestamp(&row.happened_at_raw, file_tz) {
                Some(ts) => ts,
                None => {
                    rows_skipped += 1;
                    warnings.push(Warning::new(
                        WarningKind::SkippedRow,
                        format!(
                            "line {}: unparseable date/time '{}'",
                            row.line_number, row.happened_at_raw
                        ),
                    ));
                    continue;
                }
            };

            let qty: i64 = match row.quantity_raw.parse() {
                Ok(q) => q,
                Err(_) => {
                    rows_skipped += 1;
                    warnings.push(Warning::new(
                        WarningKind::SkippedRow,
                        format!(
                            "line {}: non-numeric quantity '{}'",
                            row.line_number, row.quantity_raw
                        ),
                    ));
                    continue;
                }
            };

            if happened_at < month_start || happened_at >= month_end {
                warnings.push(Warning::new(
                    WarningKind::OutsideMonth,
                    format!(
                        "line {}: {} falls outside {}",
                        row.line_number, happened_at, ym
                    ),
                ));
            }

            if row.txn_type.eq_ignore_ascii_case(&settings.refund_label) {
                refund_rows += 1;
            }

            let marketplace = row
                .marketplace
                .clone()
                .unwrap_or_else(|| default_marketplace.to_string());

            new_rows.push(NewSalesRow {
                happened_at,
                txn_type: row.txn_type.clone(),
                order_id: row.order_id.clone(),
                marketplace,
                amazon_sku: row.sku.clone(),
                qty,
                payload: Some(
                    json!({
                        "line": row.line_number,
                        "dateTime": row.happened_at_raw,
                        "quantity": row.quantity_raw,
                    })
                    .to_string(),
                ),
            });
        }

        let unmapped = self.collect_unmapped(&new_rows, &settings.order_label)?;
        let (rows_imported, duplicates_skipped) = self.repo.insert_rows(new_rows)?;

        if rows_skipped > 0 {
            warn!("Sales import skipped {} unparseable rows", rows_skipped);
        }
        info!(
            "Imported sales for {}: {} rows, {} duplicates, {} unmapped SKUs",
            ym,
            rows_imported,
            duplicates_skipped,
            unmapped.len()
        );

        Ok(SalesImportReport {
            rows_imported,
            duplicates_skipped,
            rows_skipped,
            refund_rows,
            unmapped,
            warnings,
        })
    }

    /// Distinct order-type SKUs in this upload with no active mapping.
    fn collect_unmapped(
        &self,
        rows: &[NewSalesRow],
        order_label: &str,
    ) -> Result<Vec<UnmappedSku>> {
        let mappings = self.catalog.mapping_table(None)?;

        let mut unmapped: HashMap<(String, String), UnmappedSku> = HashMap::new();
        for row in rows {
            if !row.txn_type.eq_ignore_ascii_case(order_label) || row.qty <= 0 {
                continue;
            }
            let key = (row.marketplace.clone(), row.amazon_sku.clone());
            if mappings.contains_key(&key) {
                continue;
            }
            let entry = unmapped.entry(key).or_insert_with(|| UnmappedSku {
                marketplace: row.marketplace.clone(),
                amazon_sku: row.amazon_sku.clone(),
                orders: 0,
                units: 0,
            });
            entry.orders += 1;
            entry.units += row.qty;
        }

        let mut unmapped: Vec<UnmappedSku> = unmapped.into_values().collect();
        unmapped.sort_by(|a, b| {
            (a.marketplace.as_str(), a.amazon_sku.as_str())
                .cmp(&(b.marketplace.as_str(), b.amazon_sku.as_str()))
        });
        Ok(unmapped)
    }

    /// The canonical demand stream for one month, plus the per-run reports.
    pub fn month_demands(
        &self,
        ym: Ym,
        marketplace: Option<&str>,
    ) -> Result<(Vec<Demand>, Vec<UnmappedSku>, Vec<Warning>)> {
        let settings = self.settings.get_settings()?;
        let tz = settings.reporting_tz()?;
        let (start, end) = ym.utc_window(tz)?;

        let rows = self.repo.get_rows_in_window(start, end, marketplace)?;
        let mappings: HashMap<(String, String), Vec<SkuMapping>> =
            self.catalog.mapping_table(marketplace)?;

        Ok(normalize_demands(&rows, &mappings, &settings.order_label))
    }
}
