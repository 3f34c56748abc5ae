use std::collections::HashMap;

use log::debug;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::catalog::SkuMapping;
use crate::models::{Warning, WarningKind};
use crate::sales::sales_model::{Demand, SalesRaw, UnmappedSku};

/// Projects raw sales rows into an ordered internal-SKU demand stream.
///
/// Only rows whose type matches `order_label` (case-insensitively) with a
/// positive quantity are considered; kit mappings fan each row out into one
/// demand per component. Ordering is canonical: (happened_at, order_id,
/// internal_sku, source_amazon_sku).
pub fn normalize_demands(
    rows: &[SalesRaw],
    mappings: &HashMap<(String, String), Vec<SkuMapping>>,
    order_label: &str,
) -> (Vec<Demand>, Vec<UnmappedSku>, Vec<Warning>) {
    let mut demands = Vec::new();
    let mut warnings = Vec::new();
    let mut unmapped: HashMap<(String, String), UnmappedSku> = HashMap::new();

    for row in rows {
        if !row.txn_type.eq_ignore_ascii_case(order_label) {
            debug!(
                "Skipping sales row {} with type '{}'",
                row.order_id, row.txn_type
            );
            continue;
        }
        if row.qty <= 0 {
            continue;
        }

        let key = (row.marketplace.clone(), row.amazon_sku.clone());
        let components = match mappings.get(&key) {
            Some(components) if !components.is_empty() => components,
            _ => {
                let entry = unmapped.entry(key).or_insert_with(|| UnmappedSku {
                    marketplace: row.marketplace.clone(),
                    amazon_sku: row.amazon_sku.clone(),
                    orders: 0,
                    units: 0,
                });
                entry.orders += 1;
                entry.units += row.qty;
                warnings.push(Warning::new(
                    WarningKind::UnmappedSku,
                    format!(
                        "order {}: no active mapping for {}/{} (qty {})",
                        row.order_id, row.marketplace, row.amazon_sku, row.qty
                    ),
                ));
                continue;
            }
        };

        for component in components {
            demands.push(Demand {
                order_id: row.order_id.clone(),
                happened_at: row.happened_at,
                marketplace: row.marketplace.clone(),
                internal_sku: component.internal_sku.clone(),
                qty: component_qty(row.qty, component.unit_multiplier),
                source_amazon_sku: row.amazon_sku.clone(),
            });
        }
    }

    demands.sort_by(|a, b| {
        (
            a.happened_at,
            a.order_id.as_str(),
            a.internal_sku.as_str(),
            a.source_amazon_sku.as_str(),
        )
            .cmp(&(
                b.happened_at,
                b.order_id.as_str(),
                b.internal_sku.as_str(),
                b.source_amazon_sku.as_str(),
            ))
    });

    let mut unmapped: Vec<UnmappedSku> = unmapped.into_values().collect();
    unmapped.sort_by(|a, b| {
        (a.marketplace.as_str(), a.amazon_sku.as_str())
            .cmp(&(b.marketplace.as_str(), b.amazon_sku.as_str()))
    });

    (demands, unmapped, warnings)
}

/// Units demanded for one kit component. Multipliers are integers unless the
/// catalog allows fractional accounting; a fractional product rounds to the
/// nearest whole unit.
fn component_qty(row_qty: i64, multiplier: Decimal) -> i64 {
    (Decimal::from(row_qty) * multiplier)
        .round()
        .to_i64()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn sale(order_id: &str, ts: &str, marketplace: &str, sku: &str, qty: i64) -> SalesRaw {
        sale_typed(order_id, ts, marketplace, sku, qty, "Order")
    }

    fn sale_typed(
        order_id: &str,
        ts: &str,
        marketplace: &str,
        sku: &str,
        qty: i64,
        txn_type: &str,
    ) -> SalesRaw {
        SalesRaw {
            id: format!("{}-{}", order_id, sku),
            happened_at: Utc
                .datetime_from_str(ts, "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            txn_type: txn_type.to_string(),
            order_id: order_id.to_string(),
            marketplace: marketplace.to_string(),
            amazon_sku: sku.to_string(),
            qty,
            payload: None,
            created_at: Utc::now(),
        }
    }

    fn mapping(marketplace: &str, amazon_sku: &str, internal_sku: &str, mult: Decimal) -> SkuMapping {
        SkuMapping {
            marketplace: marketplace.to_string(),
            amazon_sku: amazon_sku.to_string(),
            internal_sku: internal_sku.to_string(),
            unit_multiplier: mult,
            is_active: true,
        }
    }

    fn table(entries: Vec<SkuMapping>) -> HashMap<(String, String), Vec<SkuMapping>> {
        let mut map: HashMap<(String, String), Vec<SkuMapping>> = HashMap::new();
        for m in entries {
            map.entry((m.marketplace.clone(), m.amazon_sku.clone()))
                .or_default()
                .push(m);
        }
        map
    }

    #[test]
    fn test_kit_expansion() {
        let mappings = table(vec![
            mapping("US", "K", "A", dec!(1)),
            mapping("US", "K", "B", dec!(2)),
        ]);
        let rows = vec![sale("O1", "2025-01-10 08:00:00", "US", "K", 3)];

        let (demands, unmapped, warnings) = normalize_demands(&rows, &mappings, "Order");

        assert!(unmapped.is_empty());
        assert!(warnings.is_empty());
        assert_eq!(demands.len(), 2);
        assert_eq!(demands[0].internal_sku, "A");
        assert_eq!(demands[0].qty, 3);
        assert_eq!(demands[1].internal_sku, "B");
        assert_eq!(demands[1].qty, 6);
    }

    #[test]
    fn test_unmapped_sku_reported_not_allocated() {
        let mappings = table(vec![]);
        let rows = vec![
            sale("O1", "2025-01-10 08:00:00", "US", "GHOST", 2),
            sale("O2", "2025-01-11 08:00:00", "US", "GHOST", 3),
        ];

        let (demands, unmapped, warnings) = normalize_demands(&rows, &mappings, "Order");

        assert!(demands.is_empty());
        assert_eq!(unmapped.len(), 1);
        assert_eq!(unmapped[0].orders, 2);
        assert_eq!(unmapped[0].units, 5);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.kind == WarningKind::UnmappedSku));
    }

    #[test]
    fn test_refund_rows_ignored() {
        let mappings = table(vec![mapping("US", "A", "A", dec!(1))]);
        let rows = vec![
            sale("O1", "2025-01-10 08:00:00", "US", "A", 2),
            sale_typed("O2", "2025-01-11 08:00:00", "US", "A", 1, "Refund"),
        ];

        let (demands, _, _) = normalize_demands(&rows, &mappings, "Order");

        assert_eq!(demands.len(), 1);
        assert_eq!(demands[0].order_id, "O1");
    }

    #[test]
    fn test_order_label_case_insensitive() {
        let mappings = table(vec![mapping("US", "A", "A", dec!(1))]);
        let rows = vec![sale_typed("O1", "2025-01-10 08:00:00", "US", "A", 1, "ORDER")];

        let (demands, _, _) = normalize_demands(&rows, &mappings, "Order");
        assert_eq!(demands.len(), 1);
    }

    #[test]
    fn test_zero_and_negative_qty_skipped() {
        let mappings = table(vec![mapping("US", "A", "A", dec!(1))]);
        let rows = vec![
            sale("O1", "2025-01-10 08:00:00", "US", "A", 0),
            sale("O2", "2025-01-10 08:00:00", "US", "A", -3),
        ];

        let (demands, _, _) = normalize_demands(&rows, &mappings, "Order");
        assert!(demands.is_empty());
    }

    #[test]
    fn test_canonical_ordering() {
        let mappings = table(vec![
            mapping("US", "A", "A", dec!(1)),
            mapping("US", "K", "A", dec!(1)),
            mapping("US", "K", "B", dec!(2)),
        ]);
        // Same timestamp: order by order_id, then internal_sku
        let rows = vec![
            sale("O2", "2025-01-10 08:00:00", "US", "A", 1),
            sale("O1", "2025-01-10 08:00:00", "US", "K", 1),
            sale("O3", "2025-01-09 08:00:00", "US", "A", 1),
        ];

        let (demands, _, _) = normalize_demands(&rows, &mappings, "Order");

        let keys: Vec<(&str, &str)> = demands
            .iter()
            .map(|d| (d.order_id.as_str(), d.internal_sku.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("O3", "A"), ("O1", "A"), ("O1", "B"), ("O2", "A")]
        );
    }
}
