use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::{BTreeSet, HashSet};

use crate::inventory::NormalizedInventory;
use crate::reconciliation::models::Discrepancy;

pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// `|difference|` as a percentage of the source B quantity, one decimal.
/// Defined as 100 when source B has nothing.
pub fn percentage_difference(difference: i64, source_b_quantity: i64) -> Decimal {
    if source_b_quantity <= 0 {
        return dec!(100);
    }

    let pct = Decimal::from(difference.unsigned_abs()) / Decimal::from(source_b_quantity) * dec!(100);
    pct.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Compare two inventories SKU by SKU.
///
/// Every SKU in either source is considered; a SKU missing from one side
/// counts as 0 there. Matching SKUs and `ignored` SKUs are left out. The
/// result is ordered by `|difference|` descending, then SKU ascending.
pub fn compute_discrepancies(
    source_a: &NormalizedInventory,
    source_b: &NormalizedInventory,
    ignored: &HashSet<String>,
) -> Vec<Discrepancy> {
    let all_skus: BTreeSet<&String> = source_a
        .skus()
        .chain(source_b.skus())
        .filter(|sku| !ignored.contains(sku.as_str()))
        .collect();

    let mut discrepancies: Vec<Discrepancy> = all_skus
        .into_iter()
        .filter_map(|sku| {
            let a = source_a.get(sku);
            let b = source_b.get(sku);
            let source_a_quantity = a.map(|r| r.quantity).unwrap_or(0);
            let source_b_quantity = b.map(|r| r.quantity).unwrap_or(0);

            let difference = source_a_quantity - source_b_quantity;
            if difference == 0 {
                return None;
            }

            let product_name = a
                .and_then(|r| r.name())
                .or_else(|| b.and_then(|r| r.name()))
                .unwrap_or(UNKNOWN_PRODUCT)
                .to_string();

            Some(Discrepancy {
                sku: sku.clone(),
                product_name,
                source_a_quantity,
                source_b_quantity,
                difference,
                percentage_difference: percentage_difference(difference, source_b_quantity),
            })
        })
        .collect();

    // stable: equal magnitudes keep SKU order from the BTreeSet
    discrepancies.sort_by_key(|d| std::cmp::Reverse(d.abs_difference()));
    discrepancies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::SourceId;

    fn inventory(source: SourceId, items: &[(&str, Option<&str>, i64)]) -> NormalizedInventory {
        let mut inventory = NormalizedInventory::new(source);
        for (sku, name, quantity) in items {
            inventory.insert_raw(Some(*sku), *name, *quantity);
        }
        inventory
    }

    fn diff(a: &[(&str, Option<&str>, i64)], b: &[(&str, Option<&str>, i64)]) -> Vec<Discrepancy> {
        compute_discrepancies(
            &inventory(SourceId::Oms, a),
            &inventory(SourceId::Wms, b),
            &HashSet::new(),
        )
    }

    #[test]
    fn test_matching_quantities_produce_nothing() {
        assert!(diff(&[("T1", None, 10)], &[("T1", None, 10)]).is_empty());
    }

    #[test]
    fn test_quantity_mismatch() {
        let result = diff(&[("T1", Some("Towel"), 10)], &[("T1", None, 8)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].difference, 2);
        assert_eq!(result[0].percentage_difference, dec!(25.0));
        assert_eq!(result[0].product_name, "Towel");
    }

    #[test]
    fn test_missing_from_source_b() {
        let result = diff(&[("T1", None, 5)], &[]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].difference, 5);
        assert_eq!(result[0].source_b_quantity, 0);
        assert_eq!(result[0].percentage_difference, dec!(100));
    }

    #[test]
    fn test_missing_from_source_a() {
        let result = diff(&[], &[("T2", Some("Rack"), 20)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].difference, -20);
        assert_eq!(result[0].source_a_quantity, 0);
        assert_eq!(result[0].percentage_difference, dec!(100));
        assert_eq!(result[0].product_name, "Rack");
    }

    #[test]
    fn test_zero_on_one_side_only_is_not_reported() {
        assert!(diff(&[("Z", None, 0)], &[]).is_empty());
    }

    #[test]
    fn test_sorted_by_magnitude_then_sku() {
        let result = diff(
            &[("B", None, 1), ("A", None, 9), ("C", None, 0), ("D", None, 4)],
            &[("A", None, 4), ("C", None, 5), ("D", None, 3), ("E", None, 5)],
        );

        let order: Vec<(&str, i64)> = result.iter().map(|d| (d.sku.as_str(), d.difference)).collect();
        assert_eq!(order, vec![("A", 5), ("C", -5), ("E", -5), ("B", 1), ("D", 1)]);

        for pair in result.windows(2) {
            assert!(pair[0].abs_difference() >= pair[1].abs_difference());
        }
        for d in &result {
            assert_eq!(d.difference, d.source_a_quantity - d.source_b_quantity);
        }
    }

    #[test]
    fn test_product_name_fallbacks() {
        let result = diff(&[("X", Some(""), 1), ("Y", None, 2)], &[("X", Some("From B"), 0)]);
        let x = result.iter().find(|d| d.sku == "X").unwrap();
        let y = result.iter().find(|d| d.sku == "Y").unwrap();
        assert_eq!(x.product_name, "From B");
        assert_eq!(y.product_name, UNKNOWN_PRODUCT);
    }

    #[test]
    fn test_ignored_skus_are_skipped() {
        let ignored: HashSet<String> = ["SHIPPING".to_string()].into_iter().collect();
        let result = compute_discrepancies(
            &inventory(SourceId::Oms, &[("SHIPPING", None, 3), ("T1", None, 1)]),
            &inventory(SourceId::Wms, &[]),
            &ignored,
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].sku, "T1");
    }

    #[test]
    fn test_skus_are_case_sensitive() {
        let result = diff(&[("abc", None, 1)], &[("ABC", None, 1)]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage_difference(1, 3), dec!(33.3));
        assert_eq!(percentage_difference(-2, 3), dec!(66.7));
        assert_eq!(percentage_difference(1, 8), dec!(12.5));
        assert_eq!(percentage_difference(1, 16), dec!(6.3));
        assert_eq!(percentage_difference(30, 10), dec!(300));
    }
}
