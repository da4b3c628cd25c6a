//! Firestore REST value encoding.
//!
//! Every [`FieldValue`] variant has exactly one wire form. Decoding is strict
//! per field: wire types outside the supported set (timestamps, geo points,
//! references, bytes, arrays holding anything but strings) are reported as
//! [`PssError::UnsupportedFieldType`] and never coerced. At document level the
//! offending field is listed in [`Document::unsupported`] so the rest of the
//! document stays usable.

use serde_json::{json, Map, Value};
use tracing::debug;

use pss_core::{
    Document, FieldPath, FieldValue, Fields, PssError, PssResult, StoreError, StoreErrorKind,
};

pub fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Boolean(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Float(x) if x.is_finite() => json!({ "doubleValue": x }),
        FieldValue::Float(x) => {
            let text = if x.is_nan() {
                "NaN"
            } else if *x > 0.0 {
                "Infinity"
            } else {
                "-Infinity"
            };
            json!({ "doubleValue": text })
        }
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::StringList(items) => {
            let values: Vec<Value> = items.iter().map(|s| json!({ "stringValue": s })).collect();
            json!({ "arrayValue": { "values": values } })
        }
        FieldValue::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

pub fn encode_fields(fields: &Fields) -> Value {
    let map: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect();
    Value::Object(map)
}

/// Request body for a full-document write.
pub fn encode_document(fields: &Fields) -> Value {
    json!({ "fields": encode_fields(fields) })
}

/// Request body and mask paths for a field-path patch.
///
/// Updates are folded into one nested document; the mask restricts the write
/// to exactly the listed paths so sibling fields are left untouched.
pub fn encode_patch(updates: &[(FieldPath, FieldValue)]) -> (Value, Vec<String>) {
    let mut tree = Fields::new();
    let mut mask = Vec::with_capacity(updates.len());
    for (path, value) in updates {
        insert_path(&mut tree, path.segments(), value.clone());
        let entry = path.to_mask();
        if !mask.contains(&entry) {
            mask.push(entry);
        }
    }
    (encode_document(&tree), mask)
}

pub(crate) fn insert_path(fields: &mut Fields, segments: &[String], value: FieldValue) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        fields.insert(first.clone(), value);
        return;
    }
    let slot = fields
        .entry(first.clone())
        .or_insert_with(|| FieldValue::Map(Fields::new()));
    if !matches!(slot, FieldValue::Map(_)) {
        *slot = FieldValue::Map(Fields::new());
    }
    if let FieldValue::Map(inner) = slot {
        insert_path(inner, rest, value);
    }
}

/// Wire type tag of a value object, e.g. `timestampValue`.
fn wire_type(value: &Value) -> String {
    value
        .as_object()
        .and_then(|obj| obj.keys().next().cloned())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Decode one field value; `name` is used for error context only.
pub fn decode_field(name: &str, value: &Value) -> PssResult<FieldValue> {
    decode_value(value).map_err(|wire_type| PssError::UnsupportedFieldType {
        field: name.to_string(),
        wire_type,
    })
}

/// Decode a value object; the error is the offending wire type.
fn decode_value(value: &Value) -> Result<FieldValue, String> {
    let obj = value.as_object().ok_or_else(|| "non-object".to_string())?;
    if obj.contains_key("nullValue") {
        return Ok(FieldValue::Null);
    }
    if let Some(b) = obj.get("booleanValue") {
        return b.as_bool().map(FieldValue::Boolean).ok_or_else(|| wire_type(value));
    }
    if let Some(i) = obj.get("integerValue") {
        let parsed = match i {
            Value::String(s) => s.parse::<i64>().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        };
        return parsed.map(FieldValue::Integer).ok_or_else(|| wire_type(value));
    }
    if let Some(x) = obj.get("doubleValue") {
        let parsed = match x {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => match s.as_str() {
                "NaN" => Some(f64::NAN),
                "Infinity" => Some(f64::INFINITY),
                "-Infinity" => Some(f64::NEG_INFINITY),
                _ => None,
            },
            _ => None,
        };
        return parsed.map(FieldValue::Float).ok_or_else(|| wire_type(value));
    }
    if let Some(s) = obj.get("stringValue") {
        return s
            .as_str()
            .map(FieldValue::string)
            .ok_or_else(|| wire_type(value));
    }
    if let Some(array) = obj.get("arrayValue") {
        let mut items = Vec::new();
        if let Some(values) = array.get("values").and_then(Value::as_array) {
            for item in values {
                match item.get("stringValue").and_then(Value::as_str) {
                    Some(s) => items.push(s.to_string()),
                    None => return Err(format!("arrayValue<{}>", wire_type(item))),
                }
            }
        }
        return Ok(FieldValue::StringList(items));
    }
    if let Some(map) = obj.get("mapValue") {
        let mut fields = Fields::new();
        if let Some(entries) = map.get("fields").and_then(Value::as_object) {
            for (name, inner) in entries {
                fields.insert(name.clone(), decode_value(inner)?);
            }
        }
        return Ok(FieldValue::Map(fields));
    }
    Err(wire_type(value))
}

/// Decode a document resource. Undecodable fields land in `unsupported`.
pub fn decode_document(body: &Value) -> Result<Document, StoreError> {
    let name = body.get("name").and_then(Value::as_str).ok_or_else(|| {
        StoreError::new(StoreErrorKind::Malformed, "document resource without a name")
    })?;
    let id = name.rsplit('/').next().unwrap_or(name).to_string();
    let mut doc = Document::new(id, Fields::new());
    if let Some(fields) = body.get("fields").and_then(Value::as_object) {
        for (field, value) in fields {
            match decode_field(field, value) {
                Ok(decoded) => {
                    doc.fields.insert(field.clone(), decoded);
                }
                Err(err) => {
                    debug!(document = %doc.id, "{err}");
                    doc.unsupported.push(field.clone());
                }
            }
        }
    }
    Ok(doc)
}
