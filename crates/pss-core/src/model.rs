//! Records produced by the transformer and their store documents.

use serde::Serialize;

use crate::feeders::{feeder_fields, FeederRecord};
use crate::value::{FieldValue, Fields};

/// Role of a person document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Lineman,
    Helper,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Lineman => "lineman",
            Role::Helper => "helper",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRecord {
    /// Normalized document key
    pub key: String,
    pub name: String,
    pub feeders: Vec<FeederRecord>,
    pub ptr_count: u32,
    pub linemen: Vec<String>,
    pub helpers: Vec<String>,
    pub active: bool,
}

impl StationRecord {
    pub fn to_fields(&self) -> Fields {
        let mut fields = feeder_fields(&self.feeders, self.ptr_count);
        fields.insert("name".to_string(), FieldValue::string(&*self.name));
        fields.insert(
            "linemen".to_string(),
            FieldValue::StringList(self.linemen.clone()),
        );
        fields.insert(
            "helpers".to_string(),
            FieldValue::StringList(self.helpers.clone()),
        );
        fields.insert("isActive".to_string(), FieldValue::Boolean(self.active));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonRecord {
    /// Login identifier (phone number), also the document id
    pub login_id: String,
    pub name: String,
    pub role: Role,
    /// Owning station key; `None` for admins
    pub station_key: Option<String>,
    pub station_name: Option<String>,
}

impl PersonRecord {
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("phone".to_string(), FieldValue::string(&*self.login_id));
        fields.insert("name".to_string(), FieldValue::string(&*self.name));
        match self.role {
            Role::Admin => {
                fields.insert("role".to_string(), FieldValue::string("admin"));
                fields.insert("pssStation".to_string(), FieldValue::string("ALL"));
            }
            Role::Lineman | Role::Helper => {
                fields.insert("role".to_string(), FieldValue::string("staff"));
                fields.insert("staffType".to_string(), FieldValue::string(self.role.as_str()));
                if let Some(key) = &self.station_key {
                    fields.insert("pssStation".to_string(), FieldValue::string(&**key));
                }
                if let Some(name) = &self.station_name {
                    fields.insert("stationName".to_string(), FieldValue::string(&**name));
                }
            }
        }
        fields.insert("isActive".to_string(), FieldValue::Boolean(true));
        fields
    }

    /// Short owner description used in collision reports.
    pub fn describe(&self) -> String {
        match &self.station_key {
            Some(station) => format!("{} {} @ {}", self.role.as_str(), self.name, station),
            None => format!("{} {}", self.role.as_str(), self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeders::build_feeders;

    #[test]
    fn station_fields_are_canonical() {
        let station = StationRecord {
            key: "riversideptr".into(),
            name: "River Side PTR".into(),
            feeders: build_feeders(&["F1", "F2", "F3"], 2),
            ptr_count: 2,
            linemen: vec!["A".into(), "B".into()],
            helpers: vec!["C".into()],
            active: true,
        };
        let fields = station.to_fields();
        assert_eq!(fields["feederCount"], FieldValue::Integer(3));
        assert_eq!(fields["ptrCount"], FieldValue::Integer(2));
        assert_eq!(fields["linemen"], FieldValue::list(["A", "B"]));
        assert_eq!(fields["isActive"], FieldValue::Boolean(true));
        assert!(!fields.contains_key("createdAt"));
    }

    #[test]
    fn person_fields_by_role() {
        let lineman = PersonRecord {
            login_id: "9100000000".into(),
            name: "A".into(),
            role: Role::Lineman,
            station_key: Some("riversideptr".into()),
            station_name: Some("River Side PTR".into()),
        };
        let fields = lineman.to_fields();
        assert_eq!(fields["role"], FieldValue::string("staff"));
        assert_eq!(fields["staffType"], FieldValue::string("lineman"));
        assert_eq!(fields["pssStation"], FieldValue::string("riversideptr"));

        let admin = PersonRecord {
            login_id: "9124581417".into(),
            name: "ADMIN01".into(),
            role: Role::Admin,
            station_key: None,
            station_name: None,
        };
        let fields = admin.to_fields();
        assert_eq!(fields["role"], FieldValue::string("admin"));
        assert_eq!(fields["pssStation"], FieldValue::string("ALL"));
        assert!(!fields.contains_key("staffType"));
    }
}
