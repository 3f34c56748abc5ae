use rust_decimal::Decimal;

use crate::allocation::allocation_model::{
    FifoOutcome, LotState, PlannedAllocation, ShortfallEvent,
};
use crate::constants::PENDING_BATCH_ID;
use crate::sales::Demand;

/// Consumes demands against lot balances in strict FIFO order.
///
/// Pure over its inputs: lots are mutated in place (`qty_sold`), allocations
/// and shortfalls are returned. FIFO order is ascending `inbound_date` with
/// lexicographic `batch_id` tie-break, stable across runs and machines.
/// Demands must already be in canonical order; the engine consumes them as
/// given.
pub fn allocate_fifo(
    demands: &[Demand],
    lots: &mut [LotState],
    allow_negative_lots: bool,
) -> FifoOutcome {
    // Stable lot visiting order, independent of load order
    let mut order: Vec<usize> = (0..lots.len()).collect();
    order.sort_by(|&a, &b| {
        (lots[a].inbound_date, lots[a].batch_id.as_str())
            .cmp(&(lots[b].inbound_date, lots[b].batch_id.as_str()))
    });

    let mut outcome = FifoOutcome::default();

    for demand in demands {
        if demand.qty <= 0 {
            continue;
        }
        let mut remaining = demand.qty;

        for &lot_idx in &order {
            if remaining == 0 {
                break;
            }
            let lot = &mut lots[lot_idx];
            if lot.internal_sku != demand.internal_sku || lot.available() <= 0 {
                continue;
            }

            let take = remaining.min(lot.available());
            outcome.allocations.push(PlannedAllocation {
                happened_at: demand.happened_at,
                order_id: demand.order_id.clone(),
                marketplace: demand.marketplace.clone(),
                internal_sku: demand.internal_sku.clone(),
                batch_id: lot.batch_id.clone(),
                qty: take,
                fob_unit: lot.fob_unit,
                freight_unit: lot.freight_unit,
                clearance_unit: lot.clearance_unit,
                duty_unit: lot.duty_unit,
            });
            lot.qty_sold += take;
            remaining -= take;
        }

        if remaining > 0 {
            if allow_negative_lots {
                // Synthetic pending lot: zero cost components, no balance row
                outcome.allocations.push(PlannedAllocation {
                    happened_at: demand.happened_at,
                    order_id: demand.order_id.clone(),
                    marketplace: demand.marketplace.clone(),
                    internal_sku: demand.internal_sku.clone(),
                    batch_id: PENDING_BATCH_ID.to_string(),
                    qty: remaining,
                    fob_unit: Decimal::ZERO,
                    freight_unit: Decimal::ZERO,
                    clearance_unit: Decimal::ZERO,
                    duty_unit: Decimal::ZERO,
                });
            }
            outcome.shortfalls.push(ShortfallEvent {
                order_id: demand.order_id.clone(),
                internal_sku: demand.internal_sku.clone(),
                happened_at: demand.happened_at,
                marketplace: demand.marketplace.clone(),
                requested: demand.qty,
                shortfall: remaining,
            });
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn lot(batch_id: &str, date: (i32, u32, u32), sku: &str, qty_in: i64) -> LotState {
        LotState {
            batch_id: batch_id.to_string(),
            internal_sku: sku.to_string(),
            inbound_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            qty_in,
            qty_sold: 0,
            fob_unit: dec!(3),
            freight_unit: dec!(2),
            clearance_unit: dec!(0.5),
            duty_unit: dec!(1),
        }
    }

    fn demand(order_id: &str, ts: &str, sku: &str, qty: i64) -> Demand {
        Demand {
            order_id: order_id.to_string(),
            happened_at: Utc.datetime_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(),
            marketplace: "US".to_string(),
            internal_sku: sku.to_string(),
            qty,
            source_amazon_sku: sku.to_string(),
        }
    }

    #[test]
    fn test_single_lot_full_consumption() {
        let mut lots = vec![lot("B1", (2025, 1, 5), "A", 10)];
        let demands = vec![demand("O1", "2025-01-10 00:00:00", "A", 10)];

        let outcome = allocate_fifo(&demands, &mut lots, false);

        assert!(outcome.shortfalls.is_empty());
        assert_eq!(outcome.allocations.len(), 1);
        assert_eq!(outcome.allocations[0].qty, 10);
        assert_eq!(outcome.allocations[0].fob_unit, dec!(3));
        assert_eq!(lots[0].qty_sold, 10);
        assert_eq!(lots[0].available(), 0);
    }

    #[test]
    fn test_cross_lot_fifo_partial_fill() {
        let mut lots = vec![
            lot("B2", (2025, 2, 1), "A", 5),
            lot("B1", (2025, 1, 5), "A", 6),
        ];
        let demands = vec![demand("O1", "2025-02-10 00:00:00", "A", 8)];

        let outcome = allocate_fifo(&demands, &mut lots, false);

        assert_eq!(outcome.allocations.len(), 2);
        assert_eq!(outcome.allocations[0].batch_id, "B1");
        assert_eq!(outcome.allocations[0].qty, 6);
        assert_eq!(outcome.allocations[1].batch_id, "B2");
        assert_eq!(outcome.allocations[1].qty, 2);
        assert!(outcome.shortfalls.is_empty());
    }

    #[test]
    fn test_same_date_tie_breaks_by_batch_id() {
        let mut lots = vec![
            lot("B9", (2025, 1, 5), "A", 5),
            lot("B2", (2025, 1, 5), "A", 5),
        ];
        let demands = vec![demand("O1", "2025-01-10 00:00:00", "A", 6)];

        let outcome = allocate_fifo(&demands, &mut lots, false);

        assert_eq!(outcome.allocations[0].batch_id, "B2");
        assert_eq!(outcome.allocations[0].qty, 5);
        assert_eq!(outcome.allocations[1].batch_id, "B9");
        assert_eq!(outcome.allocations[1].qty, 1);
    }

    #[test]
    fn test_shortfall_without_negative_balance() {
        let mut lots = vec![lot("B1", (2025, 1, 5), "A", 5)];
        let demands = vec![demand("O1", "2025-01-10 00:00:00", "A", 8)];

        let outcome = allocate_fifo(&demands, &mut lots, false);

        assert_eq!(outcome.allocations.len(), 1);
        assert_eq!(outcome.allocations[0].qty, 5);
        assert_eq!(outcome.shortfalls.len(), 1);
        assert_eq!(outcome.shortfalls[0].requested, 8);
        assert_eq!(outcome.shortfalls[0].shortfall, 3);
        assert_eq!(lots[0].qty_sold, 5);
        assert!(lots[0].available() >= 0);
    }

    #[test]
    fn test_pending_lot_when_negative_allowed() {
        let mut lots = vec![lot("B1", (2025, 1, 5), "A", 5)];
        let demands = vec![demand("O1", "2025-01-10 00:00:00", "A", 8)];

        let outcome = allocate_fifo(&demands, &mut lots, true);

        assert_eq!(outcome.allocations.len(), 2);
        let pending = &outcome.allocations[1];
        assert_eq!(pending.batch_id, PENDING_BATCH_ID);
        assert_eq!(pending.qty, 3);
        assert_eq!(pending.fob_unit, Decimal::ZERO);
        // Shortfall is still reported for visibility
        assert_eq!(outcome.shortfalls.len(), 1);
        assert_eq!(lots[0].qty_sold, 5);
    }

    #[test]
    fn test_demands_consume_in_given_order() {
        let mut lots = vec![lot("B1", (2025, 1, 5), "A", 5)];
        let demands = vec![
            demand("O1", "2025-01-10 00:00:00", "A", 3),
            demand("O2", "2025-01-11 00:00:00", "A", 3),
        ];

        let outcome = allocate_fifo(&demands, &mut lots, false);

        // O1 fills first; O2 gets the remainder and a shortfall
        assert_eq!(outcome.allocations[0].order_id, "O1");
        assert_eq!(outcome.allocations[0].qty, 3);
        assert_eq!(outcome.allocations[1].order_id, "O2");
        assert_eq!(outcome.allocations[1].qty, 2);
        assert_eq!(outcome.shortfalls[0].order_id, "O2");
        assert_eq!(outcome.shortfalls[0].shortfall, 1);
    }

    #[test]
    fn test_other_sku_lots_untouched() {
        let mut lots = vec![
            lot("B1", (2025, 1, 5), "A", 5),
            lot("B1", (2025, 1, 5), "B", 5),
        ];
        let demands = vec![demand("O1", "2025-01-10 00:00:00", "A", 5)];

        allocate_fifo(&demands, &mut lots, false);

        assert_eq!(lots[1].qty_sold, 0);
    }

    #[test]
    fn test_allocation_sums_match_demand() {
        let mut lots = vec![
            lot("B1", (2025, 1, 5), "A", 4),
            lot("B2", (2025, 1, 20), "A", 4),
            lot("B3", (2025, 2, 2), "A", 4),
        ];
        let demands = vec![demand("O1", "2025-02-10 00:00:00", "A", 11)];

        let outcome = allocate_fifo(&demands, &mut lots, false);

        let total: i64 = outcome.allocations.iter().map(|a| a.qty).sum();
        assert_eq!(total, 11);
        let sold: i64 = lots.iter().map(|l| l.qty_sold).sum();
        assert_eq!(sold, 11);
    }
}
