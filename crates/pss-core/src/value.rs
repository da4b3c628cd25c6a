//! Store-side field values and documents.
//!
//! [`FieldValue`] is the closed set of types the loader writes. Lists only
//! ever hold strings, so a map nested inside an array cannot be constructed
//! on the write path. Values read back from the store that fall outside the
//! set are not silently coerced: the owning [`Document`] lists them in
//! [`Document::unsupported`] instead.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered field map of a document or nested map value.
pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    StringList(Vec<String>),
    Map(Fields),
}

impl FieldValue {
    pub fn string(value: impl Into<String>) -> Self {
        FieldValue::String(value.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::StringList(items.into_iter().map(Into::into).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(x) => write!(f, "{x}"),
            FieldValue::String(s) => write!(f, "{s:?}"),
            FieldValue::StringList(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                write!(f, "]")
            }
            FieldValue::Map(map) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::StringList(value)
    }
}

/// Dotted path to a (possibly nested) field, e.g. `feeders.feeder-1.name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Mask form understood by the store: segments that are not plain
    /// identifiers are back-quoted.
    pub fn to_mask(&self) -> String {
        self.0
            .iter()
            .map(|segment| {
                if is_simple_segment(segment) {
                    segment.clone()
                } else {
                    format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn is_simple_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// A stored or to-be-stored document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
    /// Top-level fields present in the store whose value could not be decoded.
    pub unsupported: Vec<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
            unsupported: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn get_path(&self, path: &FieldPath) -> Option<&FieldValue> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.fields.get(first)?;
        for segment in rest {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    pub fn is_unsupported(&self, name: &str) -> bool {
        self.unsupported.iter().any(|f| f == name)
    }

    /// What the store currently holds for a top-level field.
    pub fn stored(&self, name: &str) -> StoredValue {
        if self.is_unsupported(name) {
            StoredValue::Unsupported
        } else {
            match self.fields.get(name) {
                Some(value) => StoredValue::Value(value.clone()),
                None => StoredValue::Missing,
            }
        }
    }
}

/// Current store state of one field, as seen by a diff.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Missing,
    Unsupported,
    Value(FieldValue),
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredValue::Missing => f.write_str("<missing>"),
            StoredValue::Unsupported => f.write_str("<unsupported>"),
            StoredValue::Value(v) => write!(f, "{v}"),
        }
    }
}

/// One field that a write would change.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub before: StoredValue,
    /// `None` when a full-document replace would drop the field.
    pub after: Option<FieldValue>,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.after {
            Some(after) => write!(f, "{}: {} -> {}", self.field, self.before, after),
            None => write!(f, "{}: {} -> <removed>", self.field, self.before),
        }
    }
}

/// Field-level diff between the stored document (if any) and a full replacement.
pub fn diff_replace(current: Option<&Document>, desired: &Fields) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for (name, value) in desired {
        let before = current.map_or(StoredValue::Missing, |doc| doc.stored(name));
        if before != StoredValue::Value(value.clone()) {
            changes.push(FieldChange {
                field: name.clone(),
                before,
                after: Some(value.clone()),
            });
        }
    }
    if let Some(doc) = current {
        let stale = doc
            .fields
            .keys()
            .chain(doc.unsupported.iter())
            .filter(|name| !desired.contains_key(*name));
        for name in stale {
            changes.push(FieldChange {
                field: name.clone(),
                before: doc.stored(name),
                after: None,
            });
        }
    }
    changes
}

/// Fields of `desired` whose stored value differs; untouched fields are ignored.
pub fn diff_patch(current: &Document, desired: &Fields) -> Vec<FieldChange> {
    desired
        .iter()
        .filter_map(|(name, value)| {
            let before = current.stored(name);
            (before != StoredValue::Value(value.clone())).then(|| FieldChange {
                field: name.clone(),
                before,
                after: Some(value.clone()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, FieldValue)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn mask_quotes_non_identifier_segments() {
        let path = FieldPath::new(["feeders", "feeder-1", "name"]);
        assert_eq!(path.to_mask(), "feeders.`feeder-1`.name");
        assert_eq!(FieldPath::field("ptrCount").to_mask(), "ptrCount");
        assert_eq!(FieldPath::field("1st").to_mask(), "`1st`");
    }

    #[test]
    fn get_path_walks_nested_maps() {
        let inner = fields(&[("name", FieldValue::string("11kV DMF"))]);
        let feeders = fields(&[("feeder-1", FieldValue::Map(inner))]);
        let doc = Document::new("e1", fields(&[("feeders", FieldValue::Map(feeders))]));
        let path = FieldPath::new(["feeders", "feeder-1", "name"]);
        assert_eq!(doc.get_path(&path).and_then(FieldValue::as_str), Some("11kV DMF"));
        assert!(doc
            .get_path(&FieldPath::new(["feeders", "feeder-2", "name"]))
            .is_none());
    }

    #[test]
    fn replace_diff_reports_added_changed_and_removed() {
        let mut current = Document::new(
            "riverside",
            fields(&[
                ("name", FieldValue::string("River Side")),
                ("feeders", FieldValue::Integer(3)),
                ("code", FieldValue::string("RIV")),
            ]),
        );
        current.unsupported.push("createdAt".into());
        let desired = fields(&[
            ("name", FieldValue::string("River Side")),
            ("feeders", FieldValue::Integer(4)),
            ("isActive", FieldValue::Boolean(true)),
        ]);
        let changes = diff_replace(Some(&current), &desired);
        let names: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(names, vec!["feeders", "isActive", "code", "createdAt"]);
        assert_eq!(changes[3].before, StoredValue::Unsupported);
        assert!(changes[3].after.is_none());
    }

    #[test]
    fn patch_diff_ignores_untouched_fields() {
        let current = Document::new(
            "riverside",
            fields(&[
                ("ptrCount", FieldValue::Integer(2)),
                ("linemen", FieldValue::list(["A"])),
            ]),
        );
        let desired = fields(&[("ptrCount", FieldValue::Integer(2))]);
        assert!(diff_patch(&current, &desired).is_empty());
    }

    #[test]
    fn display_is_readable() {
        let value = FieldValue::Map(fields(&[
            ("id", FieldValue::Integer(1)),
            ("name", FieldValue::string("F1")),
        ]));
        assert_eq!(value.to_string(), r#"{id: 1, name: "F1"}"#);
        assert_eq!(FieldValue::list(["A", "B"]).to_string(), r#"["A", "B"]"#);
    }
}
