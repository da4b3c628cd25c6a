//! Source rows -> station, person and feeder records.
//!
//! Every function here is pure: no store access, no clock, no randomness.
//! Identical sheets always yield identical records, which is what makes
//! import reruns and reconciliation idempotent.

use std::collections::HashMap;

use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::error::{PssError, PssResult};
use crate::feeders::{build_feeders, split_names, FeederRecord, FeederSpec};
use crate::keys::{normalize_key, KeyRegistry, LoginScheme};
use crate::model::{PersonRecord, Role, StationRecord};
use crate::row::{CellValue, SourceRow};
use crate::value::Fields;

/// Column headers, matched case-sensitively after trimming.
pub mod columns {
    pub const STATION_NAME: &[&str] = &["PSS_NAME", "PSS NAME"];
    pub const FEEDERS: &str = "FEEDERS";
    pub const LINEMAN: &str = "LINEMAN";
    pub const HELPER: &str = "HELPER";
    pub const PTR_COUNT: &[&str] = &["PTR_COUNT", "PTR COUNT"];

    pub const ADMIN_PHONE: &str = "phone number";
    pub const ADMIN_NAME: &str = "pss/admin name";

    pub const FEEDER_STATION: &str = "PSS";
    pub const FEEDER_NAME: &str = "Equipment";
}

/// Logical collections written or read by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Stations,
    People,
    Submissions,
}

/// One document the import intends to write.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite {
    pub collection: Collection,
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy)]
pub struct TransformContext {
    pub login: LoginScheme,
    pub default_ptr_count: u32,
}

impl Default for TransformContext {
    fn default() -> Self {
        Self {
            login: LoginScheme::default(),
            default_ptr_count: crate::feeders::DEFAULT_PTR_COUNT,
        }
    }
}

/// A transformed station row: the station plus its personnel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationBundle {
    pub row: usize,
    pub station: StationRecord,
    pub people: Vec<PersonRecord>,
}

impl StationBundle {
    /// Station document first, then one document per person.
    pub fn writes(&self) -> Vec<PlannedWrite> {
        let mut writes = Vec::with_capacity(1 + self.people.len());
        writes.push(PlannedWrite {
            collection: Collection::Stations,
            id: self.station.key.clone(),
            fields: self.station.to_fields(),
        });
        writes.extend(self.people.iter().map(person_write));
        writes
    }
}

pub fn person_write(person: &PersonRecord) -> PlannedWrite {
    PlannedWrite {
        collection: Collection::People,
        id: person.login_id.clone(),
        fields: person.to_fields(),
    }
}

fn invalid(row: usize, column: &str, reason: impl Into<String>) -> PssError {
    PssError::InvalidField {
        row,
        column: column.to_string(),
        reason: reason.into(),
    }
}

/// Positive integer cell, or `default` when the cell is empty.
fn positive_or_default(
    cell: &CellValue,
    row: usize,
    column: &str,
    default: u32,
) -> PssResult<u32> {
    if cell.is_empty() {
        return Ok(default);
    }
    match cell.as_integer().map(u32::try_from) {
        Some(Ok(n)) if n >= 1 => Ok(n),
        _ => Err(invalid(
            row,
            column,
            format!("'{cell}' is not a positive integer"),
        )),
    }
}

/// Transform one station row. Blank rows yield `Ok(None)`.
pub fn transform_station_row(
    row: &SourceRow,
    ctx: &TransformContext,
) -> PssResult<Option<StationBundle>> {
    if row.is_blank() {
        return Ok(None);
    }
    let name = row
        .get_any(columns::STATION_NAME)
        .as_text()
        .ok_or_else(|| invalid(row.index, columns::STATION_NAME[0], "station name is empty"))?;
    let key = normalize_key(&name);

    let spec = FeederSpec::parse(row.get(columns::FEEDERS))
        .map_err(|reason| invalid(row.index, columns::FEEDERS, reason))?;
    let ptr_count = positive_or_default(
        row.get_any(columns::PTR_COUNT),
        row.index,
        columns::PTR_COUNT[0],
        ctx.default_ptr_count,
    )?;
    let feeders = build_feeders(&spec.names(), ptr_count);

    let linemen = personnel(row.get(columns::LINEMAN));
    let helpers = personnel(row.get(columns::HELPER));

    let mut people = Vec::with_capacity(linemen.len() + helpers.len());
    let staff = linemen
        .iter()
        .map(|n| (n, Role::Lineman, columns::LINEMAN))
        .chain(helpers.iter().map(|n| (n, Role::Helper, columns::HELPER)));
    for (personnel_index, (person, role, column)) in staff.enumerate() {
        let login_id = ctx
            .login
            .derive(row.index, personnel_index)
            .map_err(|reason| invalid(row.index, column, reason))?;
        people.push(PersonRecord {
            login_id,
            name: person.clone(),
            role,
            station_key: Some(key.clone()),
            station_name: Some(name.clone()),
        });
    }

    Ok(Some(StationBundle {
        row: row.index,
        station: StationRecord {
            key,
            name,
            feeders,
            ptr_count,
            linemen,
            helpers,
            active: true,
        },
        people,
    }))
}

fn personnel(cell: &CellValue) -> Vec<String> {
    cell.as_text()
        .map(|text| split_names(&text))
        .unwrap_or_default()
}

/// Transform one admin row (`phone number`, `pss/admin name`).
pub fn transform_admin_row(row: &SourceRow) -> PssResult<Option<PersonRecord>> {
    if row.is_blank() {
        return Ok(None);
    }
    let phone_cell = row.get(columns::ADMIN_PHONE);
    let phone = match phone_cell.as_integer() {
        Some(n) if n > 0 => n.to_string(),
        _ => {
            return Err(invalid(
                row.index,
                columns::ADMIN_PHONE,
                format!("'{phone_cell}' is not a phone number"),
            ))
        }
    };
    let name = row
        .get(columns::ADMIN_NAME)
        .as_text()
        .ok_or_else(|| invalid(row.index, columns::ADMIN_NAME, "admin name is empty"))?;
    Ok(Some(PersonRecord {
        login_id: phone,
        name,
        role: Role::Admin,
        station_key: None,
        station_name: None,
    }))
}

/// Desired feeder configuration of one station, from the feeder and PTR sheets.
#[derive(Debug)]
pub struct FeederPlan {
    pub key: String,
    pub name: String,
    /// Data row of the first feeder line for this station
    pub first_row: usize,
    pub names: Vec<String>,
    pub ptr_count: PssResult<u32>,
}

impl FeederPlan {
    pub fn feeders(&self) -> Option<Vec<FeederRecord>> {
        self.ptr_count
            .as_ref()
            .ok()
            .map(|ptr| build_feeders(&self.names, *ptr))
    }
}

/// Group feeder rows (`PSS`, `Equipment`) by station, in first-seen order,
/// and attach PTR counts from the PTR sheet.
///
/// Distinct station names sharing a key across either sheet are fatal.
pub fn plan_feeders(
    feeder_rows: &[SourceRow],
    ptr_rows: &[SourceRow],
    default_ptr_count: u32,
    diagnostics: &mut Diagnostics,
) -> PssResult<Vec<FeederPlan>> {
    let mut registry = KeyRegistry::new();

    let mut ptr_counts: HashMap<String, PssResult<u32>> = HashMap::new();
    for row in ptr_rows {
        let Some(name) = row.get_any(columns::STATION_NAME).as_text() else {
            continue;
        };
        let key = registry.register(&name)?;
        if ptr_counts.contains_key(&key) {
            diagnostics.add_warning_with_entity(
                "ptr",
                &format!("duplicate PTR row at sheet line {}; keeping the first", row.line()),
                &key,
            );
            continue;
        }
        let cell = row.get_any(columns::PTR_COUNT);
        let count = if cell.is_empty() {
            Err(invalid(row.index, columns::PTR_COUNT[0], "PTR count is empty"))
        } else {
            positive_or_default(cell, row.index, columns::PTR_COUNT[0], default_ptr_count)
        };
        ptr_counts.insert(key, count);
    }

    let mut plans: Vec<FeederPlan> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for row in feeder_rows {
        let station = row.get(columns::FEEDER_STATION).as_text();
        let feeder = row.get(columns::FEEDER_NAME).as_text();
        let (station, feeder) = match (station, feeder) {
            (Some(s), Some(f)) => (s, f),
            (None, None) => continue,
            (Some(s), None) => {
                diagnostics.add_warning_with_entity(
                    "feeders",
                    &format!("empty Equipment at sheet line {}", row.line()),
                    &s,
                );
                continue;
            }
            (None, Some(f)) => {
                diagnostics.add_warning_with_entity(
                    "feeders",
                    &format!("feeder without PSS at sheet line {}", row.line()),
                    &f,
                );
                continue;
            }
        };
        let key = registry.register(&station)?;
        match positions.get(&key) {
            Some(&pos) => plans[pos].names.push(feeder),
            None => {
                positions.insert(key.clone(), plans.len());
                plans.push(FeederPlan {
                    key,
                    name: station,
                    first_row: row.index,
                    names: vec![feeder],
                    ptr_count: Ok(default_ptr_count),
                });
            }
        }
    }

    for plan in &mut plans {
        match ptr_counts.remove(&plan.key) {
            Some(count) => plan.ptr_count = count,
            None => diagnostics.add_warning_with_entity(
                "ptr",
                &format!("no PTR count given; using {default_ptr_count}"),
                &plan.key,
            ),
        }
    }

    Ok(plans)
}

/// Feeder names per normalized station key, in sheet order.
pub fn feeder_names_by_station(plans: &[FeederPlan]) -> HashMap<String, Vec<String>> {
    plans
        .iter()
        .map(|plan| (plan.key.clone(), plan.names.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(index: usize, cells: &[(&str, CellValue)]) -> SourceRow {
        SourceRow::new(
            index,
            cells
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn station_row(index: usize, name: &str, feeders: CellValue, lineman: &str, helper: &str) -> SourceRow {
        row(
            index,
            &[
                ("PSS NAME", CellValue::text(name)),
                ("FEEDERS", feeders),
                ("LINEMAN", CellValue::text(lineman)),
                ("HELPER", CellValue::text(helper)),
            ],
        )
    }

    #[test]
    fn river_side_scenario() {
        let source = station_row(0, "River Side PTR", CellValue::Integer(3), "A,B", "C");
        let bundle = transform_station_row(&source, &TransformContext::default())
            .unwrap()
            .unwrap();
        assert_eq!(bundle.station.key, "riversideptr");
        let ptrs: Vec<u32> = bundle.station.feeders.iter().map(|f| f.ptr_no).collect();
        assert_eq!(ptrs, vec![1, 2, 1]);
        let roles: Vec<Role> = bundle.people.iter().map(|p| p.role).collect();
        assert_eq!(roles, vec![Role::Lineman, Role::Lineman, Role::Helper]);
        let ids: Vec<&str> = bundle.people.iter().map(|p| p.login_id.as_str()).collect();
        assert_eq!(ids, vec!["9100000000", "9100000001", "9100000002"]);
        assert_eq!(bundle.writes().len(), 4);
    }

    #[test]
    fn empty_feeder_count_is_invalid_field() {
        let source = station_row(4, "SADAR", CellValue::Empty, "A", "");
        let err = transform_station_row(&source, &TransformContext::default()).unwrap_err();
        match err {
            PssError::InvalidField { row, column, .. } => {
                assert_eq!(row, 4);
                assert_eq!(column, "FEEDERS");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_personnel_is_valid() {
        let source = station_row(1, "HEMGIR", CellValue::Integer(2), "", " , ");
        let bundle = transform_station_row(&source, &TransformContext::default())
            .unwrap()
            .unwrap();
        assert!(bundle.people.is_empty());
        assert!(bundle.station.linemen.is_empty());
        assert!(bundle.station.helpers.is_empty());
    }

    #[test]
    fn blank_row_is_skipped() {
        let source = station_row(2, "", CellValue::Empty, "", "");
        assert!(transform_station_row(&source, &TransformContext::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn explicit_ptr_count_column() {
        let mut source = station_row(0, "DARLIPALI", CellValue::Integer(4), "", "");
        source
            .cells
            .push(("PTR_COUNT".to_string(), CellValue::Integer(3)));
        let bundle = transform_station_row(&source, &TransformContext::default())
            .unwrap()
            .unwrap();
        let ptrs: Vec<u32> = bundle.station.feeders.iter().map(|f| f.ptr_no).collect();
        assert_eq!(ptrs, vec![1, 2, 3, 1]);
    }

    #[test]
    fn admin_phone_from_float_cell() {
        let source = row(
            0,
            &[
                ("phone number", CellValue::Number(9124581417.0)),
                ("pss/admin name", CellValue::text("ADMIN01")),
            ],
        );
        let admin = transform_admin_row(&source).unwrap().unwrap();
        assert_eq!(admin.login_id, "9124581417");
        assert_eq!(admin.role, Role::Admin);
    }

    #[test]
    fn admin_phone_must_be_numeric() {
        let source = row(
            0,
            &[
                ("phone number", CellValue::text("call me")),
                ("pss/admin name", CellValue::text("X")),
            ],
        );
        assert!(transform_admin_row(&source).is_err());
    }

    #[test]
    fn feeder_plans_group_and_attach_ptr_counts() {
        let feeders = vec![
            row(0, &[("PSS", CellValue::text("DARLIPALI")), ("Equipment", CellValue::text("11kV GHANTIMAL"))]),
            row(1, &[("PSS", CellValue::text("LEPHRIPARA")), ("Equipment", CellValue::text("11kV dmf"))]),
            row(2, &[("PSS", CellValue::text("DARLIPALI")), ("Equipment", CellValue::text("11kV RAIDIHI"))]),
            row(3, &[("PSS", CellValue::Empty), ("Equipment", CellValue::Empty)]),
        ];
        let ptr = vec![row(
            0,
            &[("PSS NAME", CellValue::text("DARLIPALI")), ("PTR COUNT", CellValue::Integer(1))],
        )];
        let mut diag = Diagnostics::new();
        let plans = plan_feeders(&feeders, &ptr, 2, &mut diag).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].key, "darlipali");
        assert_eq!(plans[0].names, vec!["11kV GHANTIMAL", "11kV RAIDIHI"]);
        assert_eq!(*plans[0].ptr_count.as_ref().unwrap(), 1);
        assert_eq!(*plans[1].ptr_count.as_ref().unwrap(), 2);
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn feeder_plans_detect_collisions() {
        let feeders = vec![
            row(0, &[("PSS", CellValue::text("River Side")), ("Equipment", CellValue::text("F1"))]),
            row(1, &[("PSS", CellValue::text("RiverSide")), ("Equipment", CellValue::text("F2"))]),
        ];
        let mut diag = Diagnostics::new();
        let err = plan_feeders(&feeders, &[], 2, &mut diag).unwrap_err();
        assert!(matches!(err, PssError::KeyCollision { .. }));
    }
}
