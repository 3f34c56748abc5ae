mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::UTC;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use lotledger_core::allocation::AllocationRepository;
use lotledger_core::catalog::{ProductInput, SkuMappingInput};
use lotledger_core::commands::LedgerCommands;
use lotledger_core::costing::CostingService;
use lotledger_core::inbound::{BatchInput, DutyPoolInput, InboundImport, InboundItemInput};
use lotledger_core::models::WarningKind;
use lotledger_core::utils::time_utils::Ym;

use common::DbPool;

struct TestCore {
    commands: LedgerCommands,
    pool: Arc<DbPool>,
    _dir: TempDir,
}

fn new_core() -> TestCore {
    let (pool, dir) = common::new_test_pool();
    TestCore {
        commands: LedgerCommands::new(pool.clone()),
        pool,
        _dir: dir,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn product(sku: &str, category: Option<&str>, cbm: rust_decimal::Decimal) -> ProductInput {
    ProductInput {
        internal_sku: sku.to_string(),
        category: category.map(str::to_string),
        cbm_per_unit: cbm,
    }
}

fn identity_mapping(marketplace: &str, sku: &str) -> SkuMappingInput {
    SkuMappingInput {
        marketplace: marketplace.to_string(),
        amazon_sku: sku.to_string(),
        internal_sku: sku.to_string(),
        unit_multiplier: dec!(1),
        is_active: true,
    }
}

fn item(sku: &str, category: Option<&str>, qty: i64, fob: rust_decimal::Decimal, cbm: rust_decimal::Decimal) -> InboundItemInput {
    InboundItemInput {
        internal_sku: sku.to_string(),
        category: category.map(str::to_string),
        qty_in: qty,
        fob_unit: fob,
        cbm_per_unit: cbm,
    }
}

fn sales_csv(rows: &[(&str, &str, &str, &str, i64, &str)]) -> Vec<u8> {
    let mut out = String::from("date/time,type,order id,sku,quantity,marketplace\n");
    for (ts, txn_type, order_id, sku, qty, marketplace) in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            ts, txn_type, order_id, sku, qty, marketplace
        ));
    }
    out.into_bytes()
}

/// Scenario-1 fixture: batch B1 of 10×A at FOB 3.00, freight 20,
/// clearance 5, duty pool X = 10.
fn seed_single_batch(core: &TestCore) {
    let outcome = core
        .commands
        .upsert_products(vec![product("A", Some("X"), dec!(0.1))]);
    assert!(outcome.ok);
    let outcome = core
        .commands
        .upsert_sku_mappings(vec![identity_mapping("US", "A")]);
    assert!(outcome.ok);

    let outcome = core.commands.import_inbound(InboundImport {
        batch: BatchInput {
            batch_id: "B1".to_string(),
            inbound_date: date(2025, 1, 5),
            freight_total: dec!(20),
            clearance_total: dec!(5),
            dest_marketplace: Some("US".to_string()),
            note: None,
        },
        items: vec![item("A", Some("X"), 10, dec!(3.00), dec!(0.1))],
        duty_pools: vec![DutyPoolInput {
            category: "X".to_string(),
            duty_total: dec!(10),
        }],
    });
    assert!(outcome.ok, "import_inbound failed: {:?}", outcome.error);
}

#[test]
fn test_single_batch_full_consumption() {
    let core = new_core();
    seed_single_batch(&core);

    // Per-unit landed cost from the allocator
    let costing = CostingService::new(core.pool.clone());
    let costs = costing.get_lot_costs().unwrap();
    assert_eq!(costs.len(), 1);
    let c = &costs[0];
    assert_eq!(c.fob_unit, dec!(3.00));
    assert_eq!(c.freight_unit, dec!(2));
    assert_eq!(c.clearance_unit, dec!(0.5));
    assert_eq!(c.duty_unit, dec!(1));

    let csv = sales_csv(&[("2025-01-10 12:00:00", "Order", "O1", "A", 10, "US")]);
    let outcome = core.commands.import_sales_raw(&csv, "2025-01", "US", None);
    assert!(outcome.ok);
    assert_eq!(outcome.value.unwrap().rows_imported, 1);

    let outcome = core.commands.fifo_rebuild_month("2025-01", None);
    assert!(outcome.ok);
    let report = outcome.value.unwrap();
    assert_eq!(report.allocation_rows, 1);
    assert_eq!(report.allocated_units, 10);
    assert!(report.shortfalls.is_empty());

    let inventory = core.commands.get_inventory(None).value.unwrap();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].qty_sold, 10);
    assert_eq!(inventory[0].qty_remaining, 0);

    let summaries = core.commands.summarize_month("2025-01").value.unwrap();
    assert_eq!(summaries.len(), 2); // US + ALL
    let us = summaries.iter().find(|s| s.marketplace == "US").unwrap();
    assert_eq!(us.orders, 1);
    assert_eq!(us.units, 10);
    assert_eq!(us.fob, dec!(30));
    assert_eq!(us.freight, dec!(20));
    assert_eq!(us.clearance, dec!(5));
    assert_eq!(us.duty, dec!(10));
    let all = summaries.iter().find(|s| s.marketplace == "ALL").unwrap();
    assert_eq!(all.units, 10);
    assert_eq!(all.fob, dec!(30));
}

#[test]
fn test_cross_lot_fifo() {
    let core = new_core();
    core.commands
        .upsert_products(vec![product("A", None, dec!(0))]);
    core.commands
        .upsert_sku_mappings(vec![identity_mapping("US", "A")]);

    for (batch_id, inbound, qty) in [("B1", date(2025, 1, 5), 6_i64), ("B2", date(2025, 2, 1), 5)] {
        let outcome = core.commands.import_inbound(InboundImport {
            batch: BatchInput {
                batch_id: batch_id.to_string(),
                inbound_date: inbound,
                freight_total: dec!(0),
                clearance_total: dec!(0),
                dest_marketplace: None,
                note: None,
            },
            items: vec![item("A", None, qty, dec!(1), dec!(0))],
            duty_pools: vec![],
        });
        assert!(outcome.ok);
    }

    let csv = sales_csv(&[("2025-02-10 09:00:00", "Order", "O1", "A", 8, "US")]);
    assert!(core.commands.import_sales_raw(&csv, "2025-02", "US", None).ok);

    let report = core
        .commands
        .fifo_rebuild_month("2025-02", None)
        .value
        .unwrap();
    assert_eq!(report.allocation_rows, 2);
    assert_eq!(report.allocated_units, 8);

    let repo = AllocationRepository::new(core.pool.clone());
    let (start, end) = Ym::parse("2025-02").unwrap().utc_window(UTC).unwrap();
    let rows = repo.get_live_allocations_in_window(start, end, None).unwrap();
    let mut by_batch: Vec<(&str, i64)> = rows
        .iter()
        .map(|r| (r.batch_id.as_str(), r.qty))
        .collect();
    by_batch.sort();
    assert_eq!(by_batch, vec![("B1", 6), ("B2", 2)]);
}

#[test]
fn test_kit_expansion_allocates_components() {
    let core = new_core();
    core.commands.upsert_products(vec![
        product("A", None, dec!(0)),
        product("B", None, dec!(0)),
    ]);
    core.commands.upsert_sku_mappings(vec![
        SkuMappingInput {
            marketplace: "US".to_string(),
            amazon_sku: "K".to_string(),
            internal_sku: "A".to_string(),
            unit_multiplier: dec!(1),
            is_active: true,
        },
        SkuMappingInput {
            marketplace: "US".to_string(),
            amazon_sku: "K".to_string(),
            internal_sku: "B".to_string(),
            unit_multiplier: dec!(2),
            is_active: true,
        },
    ]);

    let outcome = core.commands.import_inbound(InboundImport {
        batch: BatchInput {
            batch_id: "B1".to_string(),
            inbound_date: date(2025, 1, 5),
            freight_total: dec!(0),
            clearance_total: dec!(0),
            dest_marketplace: None,
            note: None,
        },
        items: vec![item("A", None, 10, dec!(1), dec!(0)), item("B", None, 10, dec!(1), dec!(0))],
        duty_pools: vec![],
    });
    assert!(outcome.ok);

    let csv = sales_csv(&[("2025-01-10 12:00:00", "Order", "O1", "K", 3, "US")]);
    assert!(core.commands.import_sales_raw(&csv, "2025-01", "US", None).ok);

    let report = core
        .commands
        .fifo_rebuild_month("2025-01", None)
        .value
        .unwrap();
    assert_eq!(report.allocated_units, 9); // A×3 + B×6

    let inventory = core.commands.get_inventory(None).value.unwrap();
    let a = inventory.iter().find(|r| r.internal_sku == "A").unwrap();
    let b = inventory.iter().find(|r| r.internal_sku == "B").unwrap();
    assert_eq!(a.qty_sold, 3);
    assert_eq!(b.qty_sold, 6);
}

#[test]
fn test_shortfall_reported_without_negative_balance() {
    let core = new_core();
    core.commands
        .upsert_products(vec![product("A", None, dec!(0))]);
    core.commands
        .upsert_sku_mappings(vec![identity_mapping("US", "A")]);

    let outcome = core.commands.import_inbound(InboundImport {
        batch: BatchInput {
            batch_id: "B1".to_string(),
            inbound_date: date(2025, 1, 5),
            freight_total: dec!(0),
            clearance_total: dec!(0),
            dest_marketplace: None,
            note: None,
        },
        items: vec![item("A", None, 5, dec!(1), dec!(0))],
        duty_pools: vec![],
    });
    assert!(outcome.ok);

    let csv = sales_csv(&[("2025-01-10 12:00:00", "Order", "O1", "A", 8, "US")]);
    assert!(core.commands.import_sales_raw(&csv, "2025-01", "US", None).ok);

    let outcome = core.commands.fifo_rebuild_month("2025-01", None);
    assert!(outcome.ok); // shortfalls are warnings, not failures
    let report = outcome.value.unwrap();
    assert_eq!(report.allocated_units, 5);
    assert_eq!(report.shortfalls.len(), 1);
    assert_eq!(report.shortfalls[0].shortfall, 3);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::Shortfall));

    let inventory = core.commands.get_inventory(Some("A")).value.unwrap();
    assert_eq!(inventory[0].qty_sold, 5);
    assert!(inventory[0].qty_remaining >= 0);
}

#[test]
fn test_reversal_then_resell_uses_original_costs() {
    let core = new_core();
    seed_single_batch(&core);

    let csv = sales_csv(&[("2025-01-10 12:00:00", "Order", "O1", "A", 10, "US")]);
    assert!(core.commands.import_sales_raw(&csv, "2025-01", "US", None).ok);
    assert!(core.commands.fifo_rebuild_month("2025-01", None).ok);

    let outcome = core.commands.reverse_order("O1", Some("customer refund"));
    assert!(outcome.ok);
    let report = outcome.value.unwrap();
    assert_eq!(report.reversed_rows, 1);
    assert_eq!(report.restored_units, 10);
    assert_eq!(
        report.affected_lots,
        vec![("B1".to_string(), "A".to_string())]
    );

    let inventory = core.commands.get_inventory(Some("A")).value.unwrap();
    assert_eq!(inventory[0].qty_sold, 0);

    // A later sale consumes the restored units; the refunded order stays out
    let csv = sales_csv(&[("2025-01-20 12:00:00", "Order", "O2", "A", 4, "US")]);
    assert!(core.commands.import_sales_raw(&csv, "2025-01", "US", None).ok);
    let report = core
        .commands
        .fifo_rebuild_month("2025-01", None)
        .value
        .unwrap();
    assert_eq!(report.allocated_units, 4);

    let repo = AllocationRepository::new(core.pool.clone());
    let (start, end) = Ym::parse("2025-01").unwrap().utc_window(UTC).unwrap();
    let rows = repo.get_live_allocations_in_window(start, end, None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].order_id, "O2");
    assert_eq!(rows[0].batch_id, "B1");
    assert_eq!(rows[0].qty, 4);
    // Original lot_cost values frozen into the new allocation
    assert_eq!(rows[0].fob_unit, dec!(3.00));
    assert_eq!(rows[0].freight_unit, dec!(2));
    assert_eq!(rows[0].clearance_unit, dec!(0.5));
    assert_eq!(rows[0].duty_unit, dec!(1));

    let inventory = core.commands.get_inventory(Some("A")).value.unwrap();
    assert_eq!(inventory[0].qty_sold, 4);
}

#[test]
fn test_reversal_is_idempotent() {
    let core = new_core();
    seed_single_batch(&core);

    let csv = sales_csv(&[("2025-01-10 12:00:00", "Order", "O1", "A", 10, "US")]);
    assert!(core.commands.import_sales_raw(&csv, "2025-01", "US", None).ok);
    assert!(core.commands.fifo_rebuild_month("2025-01", None).ok);

    let first = core.commands.reverse_order("O1", None).value.unwrap();
    assert_eq!(first.reversed_rows, 1);

    let second = core.commands.reverse_order("O1", None).value.unwrap();
    assert_eq!(second.reversed_rows, 0);
    assert!(second.reversal_id.is_none());

    let inventory = core.commands.get_inventory(Some("A")).value.unwrap();
    assert_eq!(inventory[0].qty_sold, 0);
}

#[test]
fn test_zero_denominator_warning() {
    let core = new_core();
    core.commands
        .upsert_products(vec![product("A", None, dec!(0))]);

    let outcome = core.commands.import_inbound(InboundImport {
        batch: BatchInput {
            batch_id: "B1".to_string(),
            inbound_date: date(2025, 1, 5),
            freight_total: dec!(100),
            clearance_total: dec!(0),
            dest_marketplace: None,
            note: None,
        },
        items: vec![item("A", None, 10, dec!(1), dec!(0))],
        duty_pools: vec![],
    });

    assert!(outcome.ok);
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::ZeroDenominator));

    let costing = CostingService::new(core.pool.clone());
    let costs = costing.get_lot_costs().unwrap();
    assert!(costs.iter().all(|c| c.freight_unit == dec!(0)));
}

#[test]
fn test_rebuild_is_deterministic_and_conserves_inventory() {
    let core = new_core();
    core.commands
        .upsert_products(vec![product("A", None, dec!(0))]);
    core.commands
        .upsert_sku_mappings(vec![identity_mapping("US", "A")]);

    for (batch_id, inbound, qty) in [
        ("B1", date(2025, 1, 5), 4_i64),
        ("B2", date(2025, 1, 20), 4),
        ("B3", date(2025, 2, 2), 4),
    ] {
        assert!(core
            .commands
            .import_inbound(InboundImport {
                batch: BatchInput {
                    batch_id: batch_id.to_string(),
                    inbound_date: inbound,
                    freight_total: dec!(0),
                    clearance_total: dec!(0),
                    dest_marketplace: None,
                    note: None,
                },
                items: vec![item("A", None, qty, dec!(1), dec!(0))],
                duty_pools: vec![],
            })
            .ok);
    }

    let csv = sales_csv(&[
        ("2025-02-10 09:00:00", "Order", "O1", "A", 7, "US"),
        ("2025-02-11 09:00:00", "Order", "O2", "A", 3, "US"),
    ]);
    assert!(core.commands.import_sales_raw(&csv, "2025-02", "US", None).ok);

    let first = core
        .commands
        .fifo_rebuild_month("2025-02", None)
        .value
        .unwrap();
    let repo = AllocationRepository::new(core.pool.clone());
    let (start, end) = Ym::parse("2025-02").unwrap().utc_window(UTC).unwrap();
    let snapshot = |rows: Vec<lotledger_core::allocation::AllocationDetail>| {
        let mut keys: Vec<(String, String, String, i64)> = rows
            .into_iter()
            .map(|r| (r.order_id, r.batch_id, r.internal_sku, r.qty))
            .collect();
        keys.sort();
        keys
    };
    let first_rows = snapshot(repo.get_live_allocations_in_window(start, end, None).unwrap());

    let second = core
        .commands
        .fifo_rebuild_month("2025-02", None)
        .value
        .unwrap();
    let second_rows = snapshot(repo.get_live_allocations_in_window(start, end, None).unwrap());

    // Identical allocations modulo surrogate ids
    assert_eq!(first.allocated_units, second.allocated_units);
    assert_eq!(first_rows, second_rows);
    // The second run reversed exactly what the first wrote
    assert_eq!(second.reversed_rows, first.allocation_rows);

    // Conservation: on-hand inventory equals inbound minus sold
    let inventory = core.commands.get_inventory(None).value.unwrap();
    let qty_in: i64 = inventory.iter().map(|r| r.qty_in).sum();
    let qty_sold: i64 = inventory.iter().map(|r| r.qty_sold).sum();
    assert_eq!(qty_in, 12);
    assert_eq!(qty_sold, 10);
    assert_eq!(qty_in - qty_sold, 2);
    assert!(inventory
        .iter()
        .all(|r| r.qty_sold >= 0 && r.qty_sold <= r.qty_in));
}

#[test]
fn test_sales_import_dedup_and_unmapped_report() {
    let core = new_core();
    core.commands
        .upsert_products(vec![product("A", None, dec!(0))]);
    core.commands
        .upsert_sku_mappings(vec![identity_mapping("US", "A")]);
    let outcome = core.commands.import_inbound(InboundImport {
        batch: BatchInput {
            batch_id: "B1".to_string(),
            inbound_date: date(2025, 1, 5),
            freight_total: dec!(0),
            clearance_total: dec!(0),
            dest_marketplace: None,
            note: None,
        },
        items: vec![item("A", None, 10, dec!(1), dec!(0))],
        duty_pools: vec![],
    });
    assert!(outcome.ok);

    let csv = sales_csv(&[
        ("2025-01-10 12:00:00", "Order", "O1", "A", 2, "US"),
        ("2025-01-11 12:00:00", "Order", "O2", "GHOST", 3, "US"),
        ("2025-01-12 12:00:00", "Refund", "O1", "A", 1, "US"),
    ]);

    let first = core
        .commands
        .import_sales_raw(&csv, "2025-01", "US", None)
        .value
        .unwrap();
    assert_eq!(first.rows_imported, 3);
    assert_eq!(first.duplicates_skipped, 0);
    assert_eq!(first.refund_rows, 1);
    assert_eq!(first.unmapped.len(), 1);
    assert_eq!(first.unmapped[0].amazon_sku, "GHOST");
    assert_eq!(first.unmapped[0].units, 3);

    // Re-uploading the same file is a no-op
    let second = core
        .commands
        .import_sales_raw(&csv, "2025-01", "US", None)
        .value
        .unwrap();
    assert_eq!(second.rows_imported, 0);
    assert_eq!(second.duplicates_skipped, 3);

    // The unmapped order is reported by the rebuild too, and not allocated
    let report = core
        .commands
        .fifo_rebuild_month("2025-01", None)
        .value
        .unwrap();
    assert_eq!(report.unmapped.len(), 1);
    assert_eq!(report.allocated_units, 2);
}

#[test]
fn test_close_month_composes_costs_fifo_summary() {
    let core = new_core();
    seed_single_batch(&core);

    let csv = sales_csv(&[("2025-01-10 12:00:00", "Order", "O1", "A", 4, "US")]);
    assert!(core.commands.import_sales_raw(&csv, "2025-01", "US", None).ok);

    let outcome = core.commands.close_month("2025-01", None);
    assert!(outcome.ok);
    let report = outcome.value.unwrap();
    assert_eq!(report.rebuild.allocated_units, 4);
    let us = report
        .summaries
        .iter()
        .find(|s| s.marketplace == "US")
        .unwrap();
    assert_eq!(us.units, 4);
    assert_eq!(us.fob, dec!(12));
    assert_eq!(us.freight, dec!(8));

    let recent = core.commands.recent_summaries(10).value.unwrap();
    assert!(!recent.is_empty());
}

#[test]
fn test_invalid_inbound_rejected_without_state_change() {
    let core = new_core();

    let outcome = core.commands.import_inbound(InboundImport {
        batch: BatchInput {
            batch_id: "B1".to_string(),
            inbound_date: date(2025, 1, 5),
            freight_total: dec!(10),
            clearance_total: dec!(0),
            dest_marketplace: None,
            note: None,
        },
        items: vec![item("A", None, 10, dec!(-3), dec!(0.1))],
        duty_pools: vec![],
    });

    assert!(!outcome.ok);
    assert_eq!(outcome.error.as_ref().unwrap().kind, "InvalidInbound");

    let inventory = core.commands.get_inventory(None).value.unwrap();
    assert!(inventory.is_empty());
}

#[test]
fn test_summary_refresh_after_reversal() {
    let core = new_core();
    seed_single_batch(&core);

    let csv = sales_csv(&[("2025-01-10 12:00:00", "Order", "O1", "A", 10, "US")]);
    assert!(core.commands.import_sales_raw(&csv, "2025-01", "US", None).ok);
    assert!(core.commands.fifo_rebuild_month("2025-01", None).ok);
    assert!(core.commands.summarize_month("2025-01").ok);

    assert!(core.commands.reverse_order("O1", None).ok);

    // Reversal leaves the summary stale; re-summarizing clears the month
    let summaries = core.commands.summarize_month("2025-01").value.unwrap();
    assert!(summaries.is_empty());
}
