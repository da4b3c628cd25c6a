//! Feeder lists and transformer (PTR) assignment.
//!
//! Feeders are spread round-robin over the station's transformers:
//! feeder `n` (1-based) goes to PTR `((n - 1) mod K) + 1`. With 4 feeders and
//! 2 PTRs that is `1, 2, 1, 2`. Every transformer therefore carries either
//! `floor(N/K)` or `ceil(N/K)` feeders, and the assignment depends only on the
//! ordinal, so reruns over unchanged input reproduce it exactly.
//!
//! The canonical stored layout is a map keyed `feeder-<n>`:
//!
//! ```text
//! feeders: { feeder-1: {id: 1, name: "11kV GHANTIMAL", ptrNo: 1}, ... }
//! feederCount: 4
//! ptrCount: 2
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::row::CellValue;
use crate::value::{FieldValue, Fields};

pub const DEFAULT_PTR_COUNT: u32 = 2;
pub const FEEDER_KEY_PREFIX: &str = "feeder-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeederRecord {
    /// 1-based position in source order
    pub ordinal: u32,
    pub name: String,
    pub ptr_no: u32,
}

/// Transformer for the feeder at 1-based `ordinal`.
pub fn assign_ptr(ordinal: u32, ptr_count: u32) -> u32 {
    debug_assert!(ordinal >= 1 && ptr_count >= 1);
    ((ordinal - 1) % ptr_count) + 1
}

/// Build feeder records from display names in source order.
pub fn build_feeders<S: AsRef<str>>(names: &[S], ptr_count: u32) -> Vec<FeederRecord> {
    names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let ordinal = idx as u32 + 1;
            FeederRecord {
                ordinal,
                name: name.as_ref().trim().to_string(),
                ptr_no: assign_ptr(ordinal, ptr_count),
            }
        })
        .collect()
}

/// Placeholder names for a count-only feeder column.
pub fn placeholder_names(count: u32) -> Vec<String> {
    (1..=count).map(|n| format!("Feeder-{n}")).collect()
}

/// Interpretation of a station's feeder cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeederSpec {
    Count(u32),
    Names(Vec<String>),
}

impl FeederSpec {
    /// Integer cells (or integer text) are counts; comma-separated text is a
    /// name list. Anything else is rejected with a reason.
    pub fn parse(cell: &CellValue) -> Result<Self, String> {
        if cell.is_empty() {
            return Err("feeder count is empty".to_string());
        }
        if let Some(count) = cell.as_integer() {
            return match u32::try_from(count) {
                Ok(n) if n >= 1 => Ok(FeederSpec::Count(n)),
                _ => Err(format!("feeder count must be a positive integer, got {count}")),
            };
        }
        if let CellValue::Text(text) = cell {
            if text.contains(',') {
                let names = split_names(text);
                if names.is_empty() {
                    return Err("feeder list contains no names".to_string());
                }
                return Ok(FeederSpec::Names(names));
            }
        }
        Err(format!("'{cell}' is neither a positive integer nor a feeder list"))
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            FeederSpec::Count(n) => placeholder_names(*n),
            FeederSpec::Names(names) => names.clone(),
        }
    }
}

/// Comma-split, trim, and drop empty entries.
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn feeder_key(ordinal: u32) -> String {
    format!("{FEEDER_KEY_PREFIX}{ordinal}")
}

/// Numeric suffix of a `feeder-<n>` key.
pub fn feeder_key_ordinal(key: &str) -> Option<u32> {
    key.rsplit('-').next().and_then(|n| n.parse().ok())
}

/// Canonical map value for the `feeders` field.
pub fn feeders_field(feeders: &[FeederRecord]) -> FieldValue {
    let map: Fields = feeders
        .iter()
        .map(|feeder| {
            let mut entry = BTreeMap::new();
            entry.insert("id".to_string(), FieldValue::Integer(feeder.ordinal as i64));
            entry.insert("name".to_string(), FieldValue::String(feeder.name.clone()));
            entry.insert("ptrNo".to_string(), FieldValue::Integer(feeder.ptr_no as i64));
            (feeder_key(feeder.ordinal), FieldValue::Map(entry))
        })
        .collect();
    FieldValue::Map(map)
}

/// The three station fields derived from a feeder list.
pub fn feeder_fields(feeders: &[FeederRecord], ptr_count: u32) -> Fields {
    let mut fields = Fields::new();
    fields.insert("feeders".to_string(), feeders_field(feeders));
    fields.insert(
        "feederCount".to_string(),
        FieldValue::Integer(feeders.len() as i64),
    );
    fields.insert("ptrCount".to_string(), FieldValue::Integer(ptr_count as i64));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn three_feeders_two_ptrs() {
        let feeders = build_feeders(&placeholder_names(3), DEFAULT_PTR_COUNT);
        let ptrs: Vec<u32> = feeders.iter().map(|f| f.ptr_no).collect();
        assert_eq!(ptrs, vec![1, 2, 1]);
        assert_eq!(feeders[2].name, "Feeder-3");
    }

    #[test]
    fn parse_count_and_list() {
        assert_eq!(
            FeederSpec::parse(&CellValue::Integer(4)).unwrap(),
            FeederSpec::Count(4)
        );
        assert_eq!(
            FeederSpec::parse(&CellValue::Number(6.0)).unwrap(),
            FeederSpec::Count(6)
        );
        assert_eq!(
            FeederSpec::parse(&CellValue::text("11kV A, 11kV B,")).unwrap(),
            FeederSpec::Names(vec!["11kV A".into(), "11kV B".into()])
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(FeederSpec::parse(&CellValue::Empty).is_err());
        assert!(FeederSpec::parse(&CellValue::text("nan")).is_err());
        assert!(FeederSpec::parse(&CellValue::Integer(0)).is_err());
        assert!(FeederSpec::parse(&CellValue::Number(2.5)).is_err());
        assert!(FeederSpec::parse(&CellValue::text(" , ,")).is_err());
    }

    #[test]
    fn canonical_field_layout() {
        let feeders = build_feeders(&["11kV GHANTIMAL", "11kV RAIDIHI"], 2);
        let fields = feeder_fields(&feeders, 2);
        assert_eq!(fields["feederCount"], FieldValue::Integer(2));
        let map = fields["feeders"].as_map().unwrap();
        let second = map["feeder-2"].as_map().unwrap();
        assert_eq!(second["name"], FieldValue::string("11kV RAIDIHI"));
        assert_eq!(second["ptrNo"], FieldValue::Integer(2));
    }

    #[test]
    fn feeder_key_roundtrip() {
        assert_eq!(feeder_key_ordinal(&feeder_key(12)), Some(12));
        assert_eq!(feeder_key_ordinal("feeder-x"), None);
    }

    /// Feeders per transformer, indexed by `ptr_no - 1`.
    fn ptr_loads(feeders: &[FeederRecord], ptr_count: u32) -> Vec<usize> {
        let mut loads = vec![0usize; ptr_count as usize];
        for feeder in feeders {
            let slot = (feeder.ptr_no as usize)
                .checked_sub(1)
                .and_then(|i| loads.get_mut(i));
            if let Some(slot) = slot {
                *slot += 1;
            }
        }
        loads
    }

    proptest! {
        #[test]
        fn prop_assignment_is_balanced(n in 1u32..200, k in 1u32..12) {
            let feeders = build_feeders(&placeholder_names(n), k);
            let loads = ptr_loads(&feeders, k);
            let floor = (n / k) as usize;
            let ceil = ((n + k - 1) / k) as usize;
            for load in loads {
                prop_assert!(load == floor || load == ceil);
            }
        }

        #[test]
        fn prop_assignment_is_deterministic(n in 1u32..200, k in 1u32..12) {
            let names = placeholder_names(n);
            prop_assert_eq!(build_feeders(&names, k), build_feeders(&names, k));
        }
    }
}
