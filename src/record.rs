use std::borrow::Cow;
use std::fmt;

use serde_json::{Map, Value};

use crate::domain::TVError;

/// Field names, case-insensitive, that identify a record when present.
const IDENTIFIER_FIELDS: [&str; 4] = ["id", "_id", "uuid", "key"];

/// The value of one field, as seen through a safe lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(&'a serde_json::Number),
    Bool(bool),
    Other(&'a Value),
    Absent,
}

impl FieldValue<'_> {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// String used for searching and sorting. Absent values become "".
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Text(s) => Cow::Borrowed(*s),
            FieldValue::Number(n) => Cow::Owned(n.to_string()),
            FieldValue::Bool(b) => Cow::Owned(b.to_string()),
            FieldValue::Other(v) => Cow::Owned(v.to_string()),
            FieldValue::Absent => Cow::Borrowed(""),
        }
    }

    /// String shown in a table cell.
    pub fn display(&self, placeholder: &str) -> String {
        match self {
            FieldValue::Absent => placeholder.to_string(),
            other => other.as_text().into_owned(),
        }
    }
}

/// One row: field name to scalar value, in the key order of the payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn from_json(value: Value) -> Result<Self, TVError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(TVError::UnexpectedPayload(format!(
                "expected a json object per record, got `{other}`"
            ))),
        }
    }

    pub fn get(&self, field: &str) -> FieldValue<'_> {
        match self.fields.get(field) {
            None | Some(Value::Null) => FieldValue::Absent,
            Some(Value::String(s)) => FieldValue::Text(s),
            Some(Value::Number(n)) => FieldValue::Number(n),
            Some(Value::Bool(b)) => FieldValue::Bool(*b),
            Some(other) => FieldValue::Other(other),
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Case-insensitive substring test across the given fields.
    /// `needle` must already be lowercase.
    pub fn matches(&self, schema: &Schema, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        schema
            .fields()
            .iter()
            .any(|f| self.get(f).as_text().to_lowercase().contains(needle))
    }
}

/// Ordered field names shared by every record of a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<String>,
    identifier: Option<usize>,
}

impl Schema {
    pub fn infer(first: Option<&Record>) -> Self {
        let fields: Vec<String> = first
            .map(|r| r.field_names().map(str::to_string).collect())
            .unwrap_or_default();
        let identifier = fields
            .iter()
            .position(|f| IDENTIFIER_FIELDS.iter().any(|c| f.eq_ignore_ascii_case(c)));
        Self { fields, identifier }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.map(|idx| self.fields[idx].as_str())
    }
}

/// Stable identity of a row across filter and sort changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    Id(String),
    Position(usize),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Id(id) => write!(f, "{id}"),
            RowKey::Position(pos) => write!(f, "#{pos}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordCollection {
    schema: Schema,
    records: Vec<Record>,
}

impl RecordCollection {
    pub fn new(records: Vec<Record>) -> Self {
        let schema = Schema::infer(records.first());
        Self { schema, records }
    }

    /// Parse a json payload that must be an array of objects.
    pub fn from_json(payload: Value) -> Result<Self, TVError> {
        let Value::Array(items) = payload else {
            return Err(TVError::UnexpectedPayload(
                "expected a json array of records".to_string(),
            ));
        };
        let records = items
            .into_iter()
            .map(Record::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(records))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn row_key(&self, idx: usize) -> RowKey {
        self.schema
            .identifier()
            .and_then(|field| match self.records[idx].get(field) {
                FieldValue::Absent => None,
                value => Some(RowKey::Id(value.as_text().into_owned())),
            })
            .unwrap_or(RowKey::Position(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NULL: &str = crate::domain::NULL_PLACEHOLDER;

    fn collection(payload: Value) -> RecordCollection {
        RecordCollection::from_json(payload).unwrap()
    }

    #[test]
    fn schema_follows_first_record_key_order() {
        let c = collection(json!([
            {"name": "Bob", "id": 1, "active": true},
            {"id": 2, "active": false, "name": "Ann"}
        ]));
        assert_eq!(c.schema().fields(), ["name", "id", "active"]);
        assert_eq!(c.schema().identifier(), Some("id"));
    }

    #[test]
    fn lookup_returns_absent_for_missing_and_null() {
        let c = collection(json!([{"a": 1, "b": null}, {"a": 2}]));
        assert!(c.records()[0].get("b").is_absent());
        assert!(c.records()[1].get("b").is_absent());
        assert!(c.records()[1].get("nope").is_absent());
        assert_eq!(c.records()[1].get("b").display(NULL), "Null");
        assert_eq!(c.records()[0].get("a").display(NULL), "1");
    }

    #[test]
    fn non_scalar_values_render_as_json() {
        let c = collection(json!([{"tags": ["a", "b"], "ok": false}]));
        assert_eq!(c.records()[0].get("tags").as_text(), r#"["a","b"]"#);
        assert_eq!(c.records()[0].get("ok").as_text(), "false");
    }

    #[test]
    fn rejects_non_array_and_non_object_payloads() {
        assert!(matches!(
            RecordCollection::from_json(json!({"a": 1})),
            Err(TVError::UnexpectedPayload(_))
        ));
        assert!(matches!(
            RecordCollection::from_json(json!([1, 2])),
            Err(TVError::UnexpectedPayload(_))
        ));
    }

    #[test]
    fn matches_is_case_insensitive_over_all_fields() {
        let c = collection(json!([{"id": 1, "name": "Bob"}]));
        let r = &c.records()[0];
        assert!(r.matches(c.schema(), "bo"));
        assert!(r.matches(c.schema(), "1"));
        assert!(r.matches(c.schema(), ""));
        assert!(!r.matches(c.schema(), "ann"));
    }

    #[test]
    fn row_key_prefers_identifier_field() {
        let c = collection(json!([{"ID": "a-1", "v": 1}, {"ID": null, "v": 2}]));
        assert_eq!(c.row_key(0), RowKey::Id("a-1".to_string()));
        assert_eq!(c.row_key(1), RowKey::Position(1));

        let plain = collection(json!([{"v": 1}]));
        assert_eq!(plain.row_key(0), RowKey::Position(0));
    }

    #[test]
    fn identifier_is_the_first_candidate_in_field_order() {
        let c = collection(json!([{"key": "k1", "id": 7, "v": 1}]));
        assert_eq!(c.schema().identifier(), Some("key"));
        assert_eq!(c.row_key(0), RowKey::Id("k1".to_string()));

        let c = collection(json!([{"v": 1, "UUID": "u-1", "_id": 3}]));
        assert_eq!(c.schema().identifier(), Some("UUID"));
    }

    #[test]
    fn empty_collection_has_empty_schema() {
        let c = collection(json!([]));
        assert!(c.is_empty());
        assert!(c.schema().is_empty());
    }
}
