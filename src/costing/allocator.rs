use std::collections::BTreeMap;

use log::warn;
use num_traits::Zero;
use rust_decimal::Decimal;

use crate::costing::costing_model::LotCost;
use crate::errors::{InboundError, Result};
use crate::inbound::{Batch, DutyPool, InboundItem};
use crate::models::{Warning, WarningKind};

/// Distributes batch-level cost pools down to per-unit lot costs.
///
/// Pure over its inputs: identical inbound tables produce identical output,
/// in (batch_id, internal_sku) order. Freight and clearance are prorated by
/// CBM volume share, duty by FOB value share within each (batch, category).
pub fn allocate_costs(
    batches: &[Batch],
    items: &[InboundItem],
    duty_pools: &[DutyPool],
) -> Result<(Vec<LotCost>, Vec<Warning>)> {
    let mut warnings = Vec::new();

    let batch_index: BTreeMap<&str, &Batch> =
        batches.iter().map(|b| (b.batch_id.as_str(), b)).collect();

    let mut items_by_batch: BTreeMap<&str, Vec<&InboundItem>> = BTreeMap::new();
    for item in items {
        if item.fob_unit < Decimal::ZERO || item.cbm_per_unit < Decimal::ZERO {
            return Err(InboundError::InvalidInbound(format!(
                "item ({}, {}) carries a negative fob_unit or cbm_per_unit",
                item.batch_id, item.internal_sku
            ))
            .into());
        }
        if !batch_index.contains_key(item.batch_id.as_str()) {
            return Err(InboundError::InvalidInbound(format!(
                "item ({}, {}) references a batch with no header",
                item.batch_id, item.internal_sku
            ))
            .into());
        }
        items_by_batch
            .entry(item.batch_id.as_str())
            .or_default()
            .push(item);
    }

    let mut pools_by_batch: BTreeMap<&str, Vec<&DutyPool>> = BTreeMap::new();
    for pool in duty_pools {
        pools_by_batch
            .entry(pool.batch_id.as_str())
            .or_default()
            .push(pool);
    }

    let mut costs = Vec::new();
    for (batch_id, batch_items) in &items_by_batch {
        let batch = batch_index[batch_id];
        let pools = pools_by_batch
            .get(batch_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        allocate_batch(batch, batch_items, pools, &mut costs, &mut warnings);
    }

    costs.sort_by(|a, b| {
        (a.batch_id.as_str(), a.internal_sku.as_str())
            .cmp(&(b.batch_id.as_str(), b.internal_sku.as_str()))
    });

    Ok((costs, warnings))
}

fn allocate_batch(
    batch: &Batch,
    items: &[&InboundItem],
    pools: &[&DutyPool],
    out: &mut Vec<LotCost>,
    warnings: &mut Vec<Warning>,
) {
    let total_cbm: Decimal = items
        .iter()
        .map(|i| Decimal::from(i.qty_in) * i.cbm_per_unit)
        .sum();

    if total_cbm.is_zero() {
        if !batch.freight_total.is_zero() {
            warnings.push(Warning::new(
                WarningKind::ZeroDenominator,
                format!(
                    "batch '{}': freight pool {} with zero total CBM; freight shares set to 0",
                    batch.batch_id, batch.freight_total
                ),
            ));
        }
        if !batch.clearance_total.is_zero() {
            warnings.push(Warning::new(
                WarningKind::ZeroDenominator,
                format!(
                    "batch '{}': clearance pool {} with zero total CBM; clearance shares set to 0",
                    batch.batch_id, batch.clearance_total
                ),
            ));
        }
    }

    // FOB value per category, the duty proration denominator
    let mut fob_by_category: BTreeMap<&str, Decimal> = BTreeMap::new();
    for item in items {
        if let Some(ref cat) = item.category {
            *fob_by_category
                .entry(cat.as_str())
                .or_insert_with(Decimal::zero) += Decimal::from(item.qty_in) * item.fob_unit;
        }
    }

    let mut pool_by_category: BTreeMap<&str, Decimal> = BTreeMap::new();
    for pool in pools {
        pool_by_category.insert(pool.category.as_str(), pool.duty_total);
        match fob_by_category.get(pool.category.as_str()) {
            Some(fob) if !fob.is_zero() => {}
            _ if pool.duty_total.is_zero() => {}
            _ => warnings.push(Warning::new(
                WarningKind::ZeroDenominator,
                format!(
                    "batch '{}' category '{}': duty pool {} with zero category FOB; duty shares set to 0",
                    batch.batch_id, pool.category, pool.duty_total
                ),
            )),
        }
    }

    for cat in fob_by_category.keys() {
        if !pool_by_category.contains_key(cat) {
            warnings.push(Warning::new(
                WarningKind::MissingDutyPool,
                format!(
                    "batch '{}' category '{}': items present but no duty pool; duty treated as 0",
                    batch.batch_id, cat
                ),
            ));
        }
    }

    for item in items {
        let qty = Decimal::from(item.qty_in);
        let volume = qty * item.cbm_per_unit;

        let freight_unit = prorated_unit(batch.freight_total, volume, total_cbm, qty);
        let clearance_unit = prorated_unit(batch.clearance_total, volume, total_cbm, qty);

        let duty_unit = match item.category {
            Some(ref cat) => {
                let pool = pool_by_category
                    .get(cat.as_str())
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                let fob_cat = fob_by_category
                    .get(cat.as_str())
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                prorated_unit(pool, qty * item.fob_unit, fob_cat, qty)
            }
            None => {
                if !pools.is_empty() {
                    warnings.push(Warning::new(
                        WarningKind::UncategorizedItem,
                        format!(
                            "batch '{}' item '{}': no category while the batch carries duty pools; duty_unit set to 0",
                            batch.batch_id, item.internal_sku
                        ),
                    ));
                    warn!(
                        "Uncategorized item ({}, {}) receives no duty share",
                        batch.batch_id, item.internal_sku
                    );
                }
                Decimal::ZERO
            }
        };

        out.push(LotCost {
            batch_id: item.batch_id.clone(),
            internal_sku: item.internal_sku.clone(),
            fob_unit: item.fob_unit,
            freight_unit,
            clearance_unit,
            duty_unit,
        });
    }
}

/// `pool × share / denominator / qty`, or zero when the denominator is zero.
fn prorated_unit(pool: Decimal, share: Decimal, denominator: Decimal, qty: Decimal) -> Decimal {
    if denominator.is_zero() || pool.is_zero() {
        return Decimal::ZERO;
    }
    pool * share / denominator / qty
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn batch(id: &str, date: (i32, u32, u32), freight: Decimal, clearance: Decimal) -> Batch {
        Batch {
            batch_id: id.to_string(),
            inbound_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            freight_total: freight,
            clearance_total: clearance,
            dest_marketplace: None,
            note: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn item(
        batch_id: &str,
        sku: &str,
        category: Option<&str>,
        qty: i64,
        fob: Decimal,
        cbm: Decimal,
    ) -> InboundItem {
        InboundItem {
            batch_id: batch_id.to_string(),
            internal_sku: sku.to_string(),
            category: category.map(str::to_string),
            qty_in: qty,
            fob_unit: fob,
            cbm_per_unit: cbm,
        }
    }

    fn pool(batch_id: &str, category: &str, total: Decimal) -> DutyPool {
        DutyPool {
            batch_id: batch_id.to_string(),
            category: category.to_string(),
            duty_total: total,
        }
    }

    #[test]
    fn test_single_item_batch() {
        let batches = vec![batch("B1", (2025, 1, 5), dec!(20), dec!(5))];
        let items = vec![item("B1", "A", Some("X"), 10, dec!(3.00), dec!(0.1))];
        let pools = vec![pool("B1", "X", dec!(10))];

        let (costs, warnings) = allocate_costs(&batches, &items, &pools).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(costs.len(), 1);
        let c = &costs[0];
        assert_eq!(c.fob_unit, dec!(3.00));
        assert_eq!(c.freight_unit, dec!(2));
        assert_eq!(c.clearance_unit, dec!(0.5));
        assert_eq!(c.duty_unit, dec!(1));
        assert_eq!(c.landed_unit(), dec!(6.5));
    }

    #[test]
    fn test_freight_split_by_cbm_share() {
        let batches = vec![batch("B1", (2025, 1, 5), dec!(90), dec!(0))];
        // A occupies 2/3 of the volume, B 1/3
        let items = vec![
            item("B1", "A", None, 10, dec!(1), dec!(0.2)),
            item("B1", "B", None, 10, dec!(1), dec!(0.1)),
        ];

        let (costs, warnings) = allocate_costs(&batches, &items, &[]).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(costs[0].freight_unit, dec!(6)); // 60 / 10
        assert_eq!(costs[1].freight_unit, dec!(3)); // 30 / 10
    }

    #[test]
    fn test_duty_split_by_fob_share_within_category() {
        let batches = vec![batch("B1", (2025, 1, 5), dec!(0), dec!(0))];
        let items = vec![
            item("B1", "A", Some("X"), 10, dec!(4), dec!(0)),
            item("B1", "B", Some("X"), 10, dec!(1), dec!(0)),
            item("B1", "C", Some("Y"), 5, dec!(2), dec!(0)),
        ];
        let pools = vec![pool("B1", "X", dec!(50)), pool("B1", "Y", dec!(7))];

        let (costs, warnings) = allocate_costs(&batches, &items, &pools).unwrap();

        assert!(warnings.is_empty());
        // X FOB = 40 + 10; A takes 40/50 of the 50 pool
        assert_eq!(costs[0].duty_unit, dec!(4));
        assert_eq!(costs[1].duty_unit, dec!(1));
        assert_eq!(costs[2].duty_unit, dec!(1.4));
    }

    #[test]
    fn test_pool_conservation_with_uneven_shares() {
        let batches = vec![batch("B1", (2025, 1, 5), dec!(100), dec!(33.33))];
        let items = vec![
            item("B1", "A", None, 3, dec!(1), dec!(0.07)),
            item("B1", "B", None, 7, dec!(1), dec!(0.013)),
            item("B1", "C", None, 11, dec!(1), dec!(0.29)),
        ];

        let (costs, _) = allocate_costs(&batches, &items, &[]).unwrap();

        let consumed: Decimal = costs
            .iter()
            .zip(&items)
            .map(|(c, i)| c.freight_unit * Decimal::from(i.qty_in))
            .sum();
        assert!((consumed - dec!(100)).abs() <= dec!(0.01));

        let clearance: Decimal = costs
            .iter()
            .zip(&items)
            .map(|(c, i)| c.clearance_unit * Decimal::from(i.qty_in))
            .sum();
        assert!((clearance - dec!(33.33)).abs() <= dec!(0.01));
    }

    #[test]
    fn test_zero_cbm_with_nonzero_freight_warns() {
        let batches = vec![batch("B1", (2025, 1, 5), dec!(100), dec!(0))];
        let items = vec![
            item("B1", "A", None, 5, dec!(2), dec!(0)),
            item("B1", "B", None, 5, dec!(2), dec!(0)),
        ];

        let (costs, warnings) = allocate_costs(&batches, &items, &[]).unwrap();

        assert!(costs.iter().all(|c| c.freight_unit.is_zero()));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::ZeroDenominator);
    }

    #[test]
    fn test_missing_duty_pool_warns() {
        let batches = vec![batch("B1", (2025, 1, 5), dec!(0), dec!(0))];
        let items = vec![item("B1", "A", Some("X"), 10, dec!(3), dec!(0.1))];

        let (costs, warnings) = allocate_costs(&batches, &items, &[]).unwrap();

        assert!(costs[0].duty_unit.is_zero());
        assert!(warnings
            .iter()
            .any(|w| w.kind == WarningKind::MissingDutyPool));
    }

    #[test]
    fn test_uncategorized_item_with_duty_pools_warns() {
        let batches = vec![batch("B1", (2025, 1, 5), dec!(0), dec!(0))];
        let items = vec![
            item("B1", "A", Some("X"), 10, dec!(3), dec!(0.1)),
            item("B1", "B", None, 4, dec!(2), dec!(0.1)),
        ];
        let pools = vec![pool("B1", "X", dec!(10))];

        let (costs, warnings) = allocate_costs(&batches, &items, &pools).unwrap();

        let b = costs.iter().find(|c| c.internal_sku == "B").unwrap();
        assert!(b.duty_unit.is_zero());
        assert!(warnings
            .iter()
            .any(|w| w.kind == WarningKind::UncategorizedItem));
    }

    #[test]
    fn test_negative_fob_is_invalid() {
        let batches = vec![batch("B1", (2025, 1, 5), dec!(0), dec!(0))];
        let items = vec![item("B1", "A", None, 10, dec!(-1), dec!(0.1))];

        assert!(allocate_costs(&batches, &items, &[]).is_err());
    }

    #[test]
    fn test_orphan_item_is_invalid() {
        let items = vec![item("B9", "A", None, 10, dec!(1), dec!(0.1))];
        assert!(allocate_costs(&[], &items, &[]).is_err());
    }

    #[test]
    fn test_deterministic_output() {
        let batches = vec![
            batch("B2", (2025, 2, 1), dec!(10), dec!(1)),
            batch("B1", (2025, 1, 5), dec!(20), dec!(2)),
        ];
        let items = vec![
            item("B2", "B", Some("X"), 5, dec!(2), dec!(0.2)),
            item("B1", "A", Some("X"), 10, dec!(3), dec!(0.1)),
            item("B2", "A", Some("X"), 3, dec!(3), dec!(0.1)),
        ];
        let pools = vec![pool("B1", "X", dec!(5)), pool("B2", "X", dec!(4))];

        let (first, _) = allocate_costs(&batches, &items, &pools).unwrap();
        let (second, _) = allocate_costs(&batches, &items, &pools).unwrap();

        assert_eq!(first, second);
        let keys: Vec<(String, String)> = first
            .iter()
            .map(|c| (c.batch_id.clone(), c.internal_sku.clone()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
