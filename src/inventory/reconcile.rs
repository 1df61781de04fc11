//! Reconciliation of stock transactions against a material's storage layout.
//!
//! A transaction carries its own storage delta (which locations and which
//! container sizes it touched). [`apply`] folds that delta into a copy of
//! the material's layout and returns the layout plus the recomputed running
//! quantity; [`reverse`] undoes a previously applied delta when a
//! transaction is deleted.
//!
//! Matching is forgiving: locations compare equal after trimming, and an
//! aliquot matches when its size and unit agree. A consumption aimed at a
//! location or aliquot that no longer exists is silently ignored, which
//! keeps old transactions deletable after a layout has been reorganized.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use super::storage::{aggregate, Aliquot, StorageEntry};
use super::units::Unit;

/// What a stock transaction did to the material.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransactionKind {
    /// Material handed out; counts go down.
    Consumption,
    /// Material received or returned; counts go up.
    Addition,
    /// Manual correction: the running quantity is set directly and the
    /// layout is left untouched.
    Adjustment,
}

/// The result of folding a transaction into a storage layout.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcileOutcome {
    pub entries: Vec<StorageEntry>,
    pub current_quantity: f64,
}

/// Applies a transaction's storage delta to a layout.
///
/// The input layout is not modified. Consumptions clamp counts at zero and
/// never create locations or aliquots; additions increment a matching
/// aliquot or append a fresh one (with newly minted ids, never the ids from
/// the delta). An adjustment changes no counts and takes `quantity` as the
/// new running total. Totals are floored at zero.
pub fn apply(
    entries: &[StorageEntry],
    delta: &[StorageEntry],
    kind: TransactionKind,
    quantity: f64,
    material_unit: Unit,
) -> ReconcileOutcome {
    let mut updated = entries.to_vec();

    for delta_entry in delta {
        let wanted = delta_entry.location.trim();
        if let Some(target) = updated.iter_mut().find(|e| e.location.trim() == wanted) {
            merge_aliquots(target, &delta_entry.aliquots, kind);
        } else if kind == TransactionKind::Addition {
            updated.push(materialize_entry(delta_entry));
        }
    }

    let current_quantity = match kind {
        TransactionKind::Adjustment => quantity.max(0.0),
        _ => aggregate(&updated, material_unit).max(0.0),
    };

    ReconcileOutcome {
        entries: updated,
        current_quantity,
    }
}

/// Undoes a previously applied transaction delta.
///
/// Consumptions are handed back, additions are taken away (clamped at
/// zero). Reversal never creates entries or aliquots: an addition that
/// introduced a location leaves it behind with zeroed counts. The running
/// quantity is always recomputed from the resulting layout, so an
/// adjustment's direct total does not survive its deletion.
pub fn reverse(
    entries: &[StorageEntry],
    delta: &[StorageEntry],
    kind: TransactionKind,
    material_unit: Unit,
) -> ReconcileOutcome {
    let mut updated = entries.to_vec();

    for delta_entry in delta {
        let wanted = delta_entry.location.trim();
        if let Some(target) = updated.iter_mut().find(|e| e.location.trim() == wanted) {
            unmerge_aliquots(target, &delta_entry.aliquots, kind);
        }
    }

    let current_quantity = aggregate(&updated, material_unit).max(0.0);

    ReconcileOutcome {
        entries: updated,
        current_quantity,
    }
}

// An aliquot matches when its container size and unit agree; counts are
// what the transaction changes.
fn find_aliquot<'a>(target: &'a mut StorageEntry, delta: &Aliquot) -> Option<&'a mut Aliquot> {
    target
        .aliquots
        .iter_mut()
        .find(|a| a.size == delta.size && a.unit == delta.unit)
}

fn merge_aliquots(target: &mut StorageEntry, deltas: &[Aliquot], kind: TransactionKind) {
    for delta in deltas {
        if let Some(existing) = find_aliquot(target, delta) {
            match kind {
                TransactionKind::Consumption => {
                    existing.count = (existing.count - delta.count).max(0.0);
                }
                TransactionKind::Addition => {
                    existing.count += delta.count;
                }
                TransactionKind::Adjustment => {}
            }
        } else if kind == TransactionKind::Addition {
            target
                .aliquots
                .push(Aliquot::new(delta.count, delta.size, delta.unit));
        }
    }
}

fn unmerge_aliquots(target: &mut StorageEntry, deltas: &[Aliquot], kind: TransactionKind) {
    for delta in deltas {
        if let Some(existing) = find_aliquot(target, delta) {
            match kind {
                TransactionKind::Consumption => {
                    existing.count += delta.count;
                }
                TransactionKind::Addition => {
                    existing.count = (existing.count - delta.count).max(0.0);
                }
                TransactionKind::Adjustment => {}
            }
        }
    }
}

fn materialize_entry(delta_entry: &StorageEntry) -> StorageEntry {
    let aliquots = delta_entry
        .aliquots
        .iter()
        .map(|a| Aliquot::new(a.count, a.size, a.unit))
        .collect();
    StorageEntry::new(delta_entry.location.clone(), aliquots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shelf(location: &str, count: f64, size: f64) -> StorageEntry {
        StorageEntry::new(location, vec![Aliquot::new(count, size, Unit::Milliliters)])
    }

    #[test]
    fn consumption_decrements_matching_aliquot() {
        let layout = vec![shelf("F81", 10.0, 5.0)];
        let delta = vec![shelf("F81", 4.0, 5.0)];
        let outcome = apply(
            &layout,
            &delta,
            TransactionKind::Consumption,
            20.0,
            Unit::Milliliters,
        );
        assert_eq!(outcome.entries[0].aliquots[0].count, 6.0);
        assert_eq!(outcome.current_quantity, 30.0);
        // input layout untouched
        assert_eq!(layout[0].aliquots[0].count, 10.0);
    }

    #[test]
    fn consumption_clamps_count_at_zero() {
        let layout = vec![shelf("F81", 5.0, 5.0)];
        let delta = vec![shelf("F81", 8.0, 5.0)];
        let outcome = apply(
            &layout,
            &delta,
            TransactionKind::Consumption,
            40.0,
            Unit::Milliliters,
        );
        assert_eq!(outcome.entries[0].aliquots[0].count, 0.0);
        assert_eq!(outcome.current_quantity, 0.0);
    }

    #[test]
    fn consumption_at_unknown_location_is_a_no_op() {
        let layout = vec![shelf("F81", 10.0, 5.0)];
        let delta = vec![shelf("Basement", 4.0, 5.0)];
        let outcome = apply(
            &layout,
            &delta,
            TransactionKind::Consumption,
            20.0,
            Unit::Milliliters,
        );
        assert_eq!(outcome.entries, layout);
        assert_eq!(outcome.current_quantity, 50.0);
    }

    #[test]
    fn locations_match_after_trimming() {
        let layout = vec![shelf("F81", 10.0, 5.0)];
        let delta = vec![shelf("  F81  ", 4.0, 5.0)];
        let outcome = apply(
            &layout,
            &delta,
            TransactionKind::Consumption,
            20.0,
            Unit::Milliliters,
        );
        assert_eq!(outcome.entries[0].aliquots[0].count, 6.0);
    }

    #[test]
    fn duplicate_locations_first_match_wins() {
        let layout = vec![shelf("F81", 10.0, 5.0), shelf("F81", 3.0, 5.0)];
        let delta = vec![shelf("F81", 2.0, 5.0)];
        let outcome = apply(
            &layout,
            &delta,
            TransactionKind::Consumption,
            10.0,
            Unit::Milliliters,
        );
        assert_eq!(outcome.entries[0].aliquots[0].count, 8.0);
        assert_eq!(outcome.entries[1].aliquots[0].count, 3.0);
    }

    #[test]
    fn addition_increments_existing_aliquot() {
        let layout = vec![shelf("F81", 10.0, 5.0)];
        let delta = vec![shelf("F81", 2.0, 5.0)];
        let outcome = apply(
            &layout,
            &delta,
            TransactionKind::Addition,
            10.0,
            Unit::Milliliters,
        );
        assert_eq!(outcome.entries[0].aliquots[0].count, 12.0);
        assert_eq!(outcome.current_quantity, 60.0);
    }

    #[test]
    fn addition_appends_aliquot_for_new_container_size() {
        let layout = vec![shelf("F81", 10.0, 5.0)];
        let delta = vec![shelf("F81", 3.0, 10.0)];
        let outcome = apply(
            &layout,
            &delta,
            TransactionKind::Addition,
            30.0,
            Unit::Milliliters,
        );
        assert_eq!(outcome.entries[0].aliquots.len(), 2);
        assert_eq!(outcome.entries[0].aliquots[1].count, 3.0);
        assert_eq!(outcome.current_quantity, 80.0);
    }

    #[test]
    fn addition_creates_entry_with_fresh_ids() {
        let layout = vec![shelf("F81", 10.0, 5.0)];
        let delta = vec![shelf("Shelf 2", 3.0, 10.0)];
        let outcome = apply(
            &layout,
            &delta,
            TransactionKind::Addition,
            30.0,
            Unit::Milliliters,
        );
        assert_eq!(outcome.entries.len(), 2);
        let created = &outcome.entries[1];
        assert_eq!(created.location, "Shelf 2");
        assert_ne!(created.id, delta[0].id);
        assert_ne!(created.aliquots[0].id, delta[0].aliquots[0].id);
        assert_eq!(outcome.current_quantity, 80.0);
    }

    #[test]
    fn adjustment_sets_total_without_touching_counts() {
        let layout = vec![shelf("F81", 10.0, 5.0)];
        let outcome = apply(
            &layout,
            &[],
            TransactionKind::Adjustment,
            42.0,
            Unit::Milliliters,
        );
        assert_eq!(outcome.entries, layout);
        assert_eq!(outcome.current_quantity, 42.0);
    }

    #[test]
    fn negative_adjustment_floors_at_zero() {
        let layout = vec![shelf("F81", 10.0, 5.0)];
        let outcome = apply(
            &layout,
            &[],
            TransactionKind::Adjustment,
            -7.0,
            Unit::Milliliters,
        );
        assert_eq!(outcome.current_quantity, 0.0);
    }

    #[test]
    fn reverse_hands_a_consumption_back() {
        let layout = vec![shelf("F81", 10.0, 5.0)];
        let delta = vec![shelf("F81", 4.0, 5.0)];
        let consumed = apply(
            &layout,
            &delta,
            TransactionKind::Consumption,
            20.0,
            Unit::Milliliters,
        );
        let restored = reverse(
            &consumed.entries,
            &delta,
            TransactionKind::Consumption,
            Unit::Milliliters,
        );
        assert_eq!(restored.entries[0].aliquots[0].count, 10.0);
        assert_eq!(restored.current_quantity, 50.0);
    }

    #[test]
    fn reverse_of_addition_keeps_the_emptied_structures() {
        let layout = vec![shelf("F81", 10.0, 5.0)];
        let delta = vec![shelf("Shelf 2", 3.0, 10.0)];
        let added = apply(
            &layout,
            &delta,
            TransactionKind::Addition,
            30.0,
            Unit::Milliliters,
        );
        let restored = reverse(
            &added.entries,
            &delta,
            TransactionKind::Addition,
            Unit::Milliliters,
        );
        assert_eq!(restored.entries.len(), 2);
        assert_eq!(restored.entries[1].aliquots[0].count, 0.0);
        assert_eq!(restored.current_quantity, 50.0);
    }

    #[test]
    fn reverse_never_creates_locations() {
        let layout = vec![shelf("F81", 10.0, 5.0)];
        let delta = vec![shelf("Vanished", 4.0, 5.0)];
        let outcome = reverse(
            &layout,
            &delta,
            TransactionKind::Consumption,
            Unit::Milliliters,
        );
        assert_eq!(outcome.entries, layout);
        assert_eq!(outcome.current_quantity, 50.0);
    }

    #[test]
    fn reverse_of_adjustment_reaggregates_the_layout() {
        let layout = vec![shelf("F81", 10.0, 5.0)];
        let adjusted = apply(
            &layout,
            &[],
            TransactionKind::Adjustment,
            42.0,
            Unit::Milliliters,
        );
        assert_eq!(adjusted.current_quantity, 42.0);
        let restored = reverse(
            &adjusted.entries,
            &[],
            TransactionKind::Adjustment,
            Unit::Milliliters,
        );
        assert_eq!(restored.current_quantity, 50.0);
    }

    #[test]
    fn kind_symbols_round_trip() {
        assert_eq!(TransactionKind::Consumption.to_string(), "consumption");
        assert_eq!(
            "addition".parse::<TransactionKind>(),
            Ok(TransactionKind::Addition)
        );
        assert!("refund".parse::<TransactionKind>().is_err());
    }
}
