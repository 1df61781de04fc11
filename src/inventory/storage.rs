//! Storage layout of a material: where it lives and how it is portioned.
//!
//! A material's stock is recorded as storage entries (one per physical
//! location) holding aliquots (a count of containers of a given size and
//! unit). The layout is persisted as a JSON column, and historical rows
//! predate strict validation, so decoding is deliberately forgiving:
//! malformed documents become an empty layout, missing fields take
//! defaults, and numeric strings are parsed.

use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use super::units::{convert, lenient_f64, Unit};

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// A batch of identical containers: `count` containers of `size` `unit` each.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Aliquot {
    #[serde(default = "fresh_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub count: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub size: f64,
    #[serde(default)]
    pub unit: Unit,
}

impl Aliquot {
    pub fn new(count: f64, size: f64, unit: Unit) -> Self {
        Self {
            id: fresh_id(),
            count,
            size,
            unit,
        }
    }

    /// Total quantity held by this aliquot, in its own unit.
    pub fn raw_quantity(&self) -> f64 {
        self.count * self.size
    }
}

/// Everything stored at one physical location (freezer shelf, cabinet, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StorageEntry {
    #[serde(default = "fresh_id")]
    pub id: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub aliquots: Vec<Aliquot>,
}

impl StorageEntry {
    pub fn new(location: impl Into<String>, aliquots: Vec<Aliquot>) -> Self {
        Self {
            id: fresh_id(),
            location: location.into(),
            aliquots,
        }
    }
}

/// Sums every aliquot across every entry, converted into `target`.
///
/// An empty layout sums to zero. The result does not depend on entry or
/// aliquot order.
pub fn aggregate(entries: &[StorageEntry], target: Unit) -> f64 {
    entries
        .iter()
        .flat_map(|entry| entry.aliquots.iter())
        .map(|aliquot| convert(aliquot.raw_quantity(), aliquot.unit, target))
        .sum()
}

/// Decodes a persisted storage layout.
///
/// Blank text is an empty layout. A document that fails to parse is logged
/// and treated as empty rather than failing the surrounding request.
pub fn decode_entries(raw: &str) -> Vec<StorageEntry> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str(trimmed) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Discarding unreadable storage layout");
            Vec::new()
        }
    }
}

/// Encodes a storage layout for persistence.
pub fn encode_entries(entries: &[StorageEntry]) -> String {
    serde_json::to_string(entries).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_layout() -> Vec<StorageEntry> {
        vec![
            StorageEntry::new(
                "Freezer A, Shelf 2",
                vec![
                    Aliquot::new(21.0, 1.0, Unit::Milliliters),
                    Aliquot::new(1.0, 40.0, Unit::Milliliters),
                ],
            ),
            StorageEntry::new("Bench", vec![Aliquot::new(8.0, 0.5, Unit::Milliliters)]),
        ]
    }

    #[test]
    fn aggregate_sums_across_entries_and_aliquots() {
        assert_eq!(aggregate(&sample_layout(), Unit::Milliliters), 65.0);
    }

    #[test]
    fn aggregate_of_empty_layout_is_zero() {
        assert_eq!(aggregate(&[], Unit::Grams), 0.0);
    }

    #[test]
    fn aggregate_converts_mixed_units() {
        let entries = vec![StorageEntry::new(
            "Cold room",
            vec![
                Aliquot::new(1.0, 2.0, Unit::Liters),
                Aliquot::new(1.0, 500.0, Unit::Milliliters),
            ],
        )];
        assert_eq!(aggregate(&entries, Unit::Milliliters), 2500.0);
        assert_eq!(aggregate(&entries, Unit::Liters), 2.5);
    }

    #[test]
    fn aggregate_ignores_ordering() {
        let mut layout = sample_layout();
        let forward = aggregate(&layout, Unit::Milliliters);
        layout.reverse();
        for entry in &mut layout {
            entry.aliquots.reverse();
        }
        assert_eq!(aggregate(&layout, Unit::Milliliters), forward);
    }

    #[test]
    fn decode_of_blank_or_malformed_text_is_empty() {
        assert!(decode_entries("").is_empty());
        assert!(decode_entries("   ").is_empty());
        assert!(decode_entries("{not json").is_empty());
        assert!(decode_entries("42").is_empty());
    }

    #[test]
    fn decode_fills_defaults_and_parses_numeric_strings() {
        let raw = r#"[{"location":"F81","aliquots":[{"count":"10","size":"5","unit":"mL"}]}]"#;
        let entries = decode_entries(raw);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].location, "F81");
        assert!(!entries[0].id.is_empty());
        let aliquot = &entries[0].aliquots[0];
        assert_eq!(aliquot.count, 10.0);
        assert_eq!(aliquot.size, 5.0);
        assert_eq!(aliquot.unit, Unit::Milliliters);
    }

    #[test]
    fn decode_collapses_garbage_numbers_and_unknown_units() {
        let raw = r#"[{"location":"B2","aliquots":[{"count":"many","size":null,"unit":"drops"}]}]"#;
        let entries = decode_entries(raw);
        let aliquot = &entries[0].aliquots[0];
        assert_eq!(aliquot.count, 0.0);
        assert_eq!(aliquot.size, 0.0);
        assert_eq!(aliquot.unit, Unit::Units);
    }

    #[test]
    fn encode_then_decode_preserves_the_layout() {
        let layout = sample_layout();
        let decoded = decode_entries(&encode_entries(&layout));
        assert_eq!(decoded, layout);
    }
}
