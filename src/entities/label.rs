use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Placeholder shown wherever a label field could not be resolved.
pub const UNAVAILABLE_TEXT: &str = "Unknown";

/// One node of an openFDA label document.
///
/// Label JSON only carries strings, arrays and objects in practice. Numbers and
/// booleans are kept as their JSON spelling; `null` becomes an empty list so it
/// resolves the same way as a missing value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LabelValue {
    Text(String),
    List(Vec<LabelValue>),
    Map(BTreeMap<String, LabelValue>),
}

impl LabelValue {
    pub fn get(&self, key: &str) -> Option<&LabelValue> {
        match self {
            Self::Map(map) => map.get(key),
            Self::Text(_) | Self::List(_) => None,
        }
    }

    /// Text values are returned verbatim; nested values as compact JSON.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::List(_) | Self::Map(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }
}

impl From<serde_json::Value> for LabelValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
            serde_json::Value::Null => Self::List(Vec::new()),
            serde_json::Value::Bool(v) => Self::Text(v.to_string()),
            serde_json::Value::Number(v) => Self::Text(v.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for LabelValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

/// A single label document (one element of openFDA `results`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelRecord {
    fields: BTreeMap<String, LabelValue>,
}

impl LabelRecord {
    /// Builds a record from a JSON object; any other JSON shape yields `None`.
    #[cfg(test)]
    pub(crate) fn from_json(value: serde_json::Value) -> Option<Self> {
        match LabelValue::from(value) {
            LabelValue::Map(fields) => Some(Self { fields }),
            LabelValue::Text(_) | LabelValue::List(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Follows `path` through nested objects. Stepping into a non-object, a
    /// missing key, or an empty path all give `None`.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&LabelValue> {
        let (first, rest) = path.split_first()?;
        let mut current = self.fields.get(first.as_ref())?;
        for segment in rest {
            current = current.get(segment.as_ref())?;
        }
        Some(current)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Available(String),
    Unavailable,
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Available(value) => Some(value.as_str()),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or(UNAVAILABLE_TEXT))
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Available(value) => serializer.serialize_str(value),
            Self::Unavailable => serializer.serialize_none(),
        }
    }
}

/// Ordered `display name -> value` mapping produced from a label.
///
/// Used both for the full extraction (one entry per catalog field) and for the
/// question-filtered subset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFields {
    entries: Vec<(String, FieldValue)>,
}

pub type ExtractedInfo = LabelFields;
pub type FilteredInfo = LabelFields;

impl LabelFields {
    #[cfg(test)]
    pub(crate) fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, value)| value.is_available())
            .count()
    }
}

impl FromIterator<(String, FieldValue)> for LabelFields {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Serialize for LabelFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> LabelRecord {
        LabelRecord::from_json(serde_json::json!({
            "openfda": {"brand_name": ["Tylenol"], "route": ["ORAL"]},
            "warnings": ["Liver warning"],
            "set_id": "abc",
            "version": 3,
            "retired": null
        }))
        .expect("object record")
    }

    #[test]
    fn lookup_walks_nested_objects() {
        let record = sample_record();
        let value = record.lookup(&["openfda", "brand_name"]).expect("present");
        assert_eq!(
            value,
            &LabelValue::List(vec![LabelValue::Text("Tylenol".into())])
        );
    }

    #[test]
    fn lookup_rejects_steps_through_non_objects() {
        let record = sample_record();
        assert!(record.lookup(&["warnings", "0"]).is_none());
        assert!(record.lookup(&["set_id", "inner"]).is_none());
        assert!(record.lookup(&["openfda", "generic_name"]).is_none());
        assert!(record.lookup::<&str>(&[]).is_none());
    }

    #[test]
    fn json_scalars_become_text_and_null_becomes_empty_list() {
        let record = sample_record();
        assert_eq!(
            record.lookup(&["version"]),
            Some(&LabelValue::Text("3".into()))
        );
        assert_eq!(
            record.lookup(&["retired"]),
            Some(&LabelValue::List(Vec::new()))
        );
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert!(LabelRecord::from_json(serde_json::json!(["x"])).is_none());
        assert!(LabelRecord::from_json(serde_json::json!("x")).is_none());
    }

    #[test]
    fn record_deserializes_from_label_json() {
        let record: LabelRecord = serde_json::from_value(serde_json::json!({
            "openfda": {"generic_name": ["ACETAMINOPHEN"]}
        }))
        .expect("deserialize");
        assert_eq!(
            record
                .lookup(&["openfda", "generic_name"])
                .map(LabelValue::to_text),
            Some(r#"["ACETAMINOPHEN"]"#.to_string())
        );
    }

    #[test]
    fn field_value_display_uses_unknown_placeholder() {
        assert_eq!(FieldValue::Unavailable.to_string(), "Unknown");
        assert_eq!(FieldValue::Available("500 mg".into()).to_string(), "500 mg");
    }

    #[test]
    fn label_fields_serialize_in_insertion_order() {
        let fields: LabelFields = [
            ("Warnings".to_string(), FieldValue::Available("x".into())),
            ("Dosage".to_string(), FieldValue::Unavailable),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&fields).expect("json");
        assert_eq!(json, r#"{"Warnings":"x","Dosage":null}"#);
        assert_eq!(fields.available_count(), 1);
        assert_eq!(fields.get("Dosage"), Some(&FieldValue::Unavailable));
    }
}
