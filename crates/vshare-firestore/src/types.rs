//! Firestore REST API wire types and value conversions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Firestore document value types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

impl Value {
    pub fn array(values: Vec<Value>) -> Self {
        Value::ArrayValue(ArrayValue {
            values: Some(values),
        })
    }

    pub fn map(fields: HashMap<String, Value>) -> Self {
        Value::MapValue(MapValue {
            fields: Some(fields),
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::StringValue(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::IntegerValue(s) => s.parse().ok(),
            Value::DoubleValue(d) => Some(*d as i64),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::TimestampValue(s) | Value::StringValue(s) => {
                DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
            }
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::ArrayValue(a) => Some(a.values.as_deref().unwrap_or(&[])),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::MapValue(m) => m.fields.as_ref(),
            _ => None,
        }
    }

    pub fn as_string_array(&self) -> Option<Vec<String>> {
        self.as_array().map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
    }
}

/// Conversion into a Firestore value.
pub trait ToFirestoreValue {
    fn to_firestore_value(&self) -> Value;
}

impl ToFirestoreValue for &str {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.to_string())
    }
}

impl ToFirestoreValue for String {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.clone())
    }
}

impl ToFirestoreValue for bool {
    fn to_firestore_value(&self) -> Value {
        Value::BooleanValue(*self)
    }
}

impl ToFirestoreValue for u32 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue(self.to_string())
    }
}

impl ToFirestoreValue for u64 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue(self.to_string())
    }
}

impl ToFirestoreValue for i64 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue(self.to_string())
    }
}

impl ToFirestoreValue for DateTime<Utc> {
    fn to_firestore_value(&self) -> Value {
        Value::TimestampValue(self.to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Vec<T> {
    fn to_firestore_value(&self) -> Value {
        Value::array(self.iter().map(|v| v.to_firestore_value()).collect())
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Option<T> {
    fn to_firestore_value(&self) -> Value {
        match self {
            Some(v) => v.to_firestore_value(),
            None => Value::NullValue(()),
        }
    }
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    pub name: Option<String>,
    /// Document fields
    pub fields: Option<HashMap<String, Value>>,
    /// Create time
    pub create_time: Option<String>,
    /// Update time
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }

    /// Look up a field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.as_ref().and_then(|f| f.get(name))
    }

    /// Required string field.
    pub fn require_str(&self, name: &str) -> crate::error::FirestoreResult<String> {
        self.field(name)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                crate::error::FirestoreError::invalid_response(format!(
                    "missing or non-string field `{}`",
                    name
                ))
            })
    }

    /// Required timestamp field.
    pub fn require_timestamp(&self, name: &str) -> crate::error::FirestoreResult<DateTime<Utc>> {
        self.field(name)
            .and_then(|v| v.as_timestamp())
            .ok_or_else(|| {
                crate::error::FirestoreError::invalid_response(format!(
                    "missing or non-timestamp field `{}`",
                    name
                ))
            })
    }
}

/// Document field mask for partial updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMask {
    pub field_paths: Vec<String>,
}

/// Precondition for a write operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Precondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

/// A server-side field transform: set-semantics array mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTransform {
    pub field_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append_missing_elements: Option<ArrayValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_all_from_array: Option<ArrayValue>,
}

/// A transform applied to a single document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTransform {
    pub document: String,
    pub field_transforms: Vec<FieldTransform>,
}

/// A single write in a commit batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Document>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<DocumentTransform>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mask: Option<DocumentMask>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_document: Option<Precondition>,
}

impl Write {
    /// A masked update of the named document.
    pub fn update(name: String, fields: HashMap<String, Value>, mask: Vec<String>) -> Self {
        Self {
            update: Some(Document {
                name: Some(name),
                fields: Some(fields),
                create_time: None,
                update_time: None,
            }),
            delete: None,
            transform: None,
            update_mask: Some(DocumentMask { field_paths: mask }),
            current_document: None,
        }
    }

    /// A full-document upsert.
    pub fn upsert(name: String, fields: HashMap<String, Value>) -> Self {
        Self {
            update: Some(Document {
                name: Some(name),
                fields: Some(fields),
                create_time: None,
                update_time: None,
            }),
            delete: None,
            transform: None,
            update_mask: None,
            current_document: None,
        }
    }

    /// Delete the named document.
    pub fn delete(name: String) -> Self {
        Self {
            update: None,
            delete: Some(name),
            transform: None,
            update_mask: None,
            current_document: None,
        }
    }

    /// Append values to an array field, skipping ones already present
    /// (set semantics: a duplicate add is a no-op).
    pub fn array_union(name: String, field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::transform_write(
            name,
            FieldTransform {
                field_path: field.into(),
                append_missing_elements: Some(ArrayValue {
                    values: Some(values),
                }),
                remove_all_from_array: None,
            },
        )
    }

    /// Remove all occurrences of the given values from an array field.
    pub fn array_remove(name: String, field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::transform_write(
            name,
            FieldTransform {
                field_path: field.into(),
                append_missing_elements: None,
                remove_all_from_array: Some(ArrayValue {
                    values: Some(values),
                }),
            },
        )
    }

    fn transform_write(name: String, transform: FieldTransform) -> Self {
        Self {
            update: None,
            delete: None,
            transform: Some(DocumentTransform {
                document: name,
                field_transforms: vec![transform],
            }),
            update_mask: None,
            current_document: None,
        }
    }
}

/// Atomic commit request (`documents:commit`). All writes apply together
/// or not at all.
#[derive(Debug, Clone, Serialize)]
pub struct CommitRequest {
    pub writes: Vec<Write>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    #[serde(default)]
    pub write_results: Vec<serde_json::Value>,
}

// ============================================================================
// Structured queries
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponseItem {
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "where")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl StructuredQuery {
    pub fn collection(id: impl Into<String>) -> Self {
        Self {
            from: vec![CollectionSelector {
                collection_id: id.into(),
            }],
            filter: None,
            order_by: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by.push(Order {
            field: FieldReference {
                field_path: field.into(),
            },
            direction: "DESCENDING".to_string(),
        });
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Strip ordering and pagination, for aggregation counts over the same
    /// filter.
    pub fn unpaged(mut self) -> Self {
        self.order_by.clear();
        self.offset = None;
        self.limit = None;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub field: FieldReference,
    pub direction: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    FieldFilter(FieldFilter),
    CompositeFilter(CompositeFilter),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeFilter {
    pub op: String,
    pub filters: Vec<Filter>,
}

impl Filter {
    fn field(path: impl Into<String>, op: &str, value: Value) -> Self {
        Filter::FieldFilter(FieldFilter {
            field: FieldReference {
                field_path: path.into(),
            },
            op: op.to_string(),
            value,
        })
    }

    pub fn eq(path: impl Into<String>, value: impl ToFirestoreValue) -> Self {
        Self::field(path, "EQUAL", value.to_firestore_value())
    }

    pub fn neq(path: impl Into<String>, value: impl ToFirestoreValue) -> Self {
        Self::field(path, "NOT_EQUAL", value.to_firestore_value())
    }

    pub fn array_contains(path: impl Into<String>, value: impl ToFirestoreValue) -> Self {
        Self::field(path, "ARRAY_CONTAINS", value.to_firestore_value())
    }

    /// Matches documents whose array field contains any of `values`.
    /// Firestore caps the disjunction at 30 values.
    pub fn array_contains_any(path: impl Into<String>, values: Vec<Value>) -> Self {
        Self::field(path, "ARRAY_CONTAINS_ANY", Value::array(values))
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::CompositeFilter(CompositeFilter {
            op: "AND".to_string(),
            filters,
        })
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::CompositeFilter(CompositeFilter {
            op: "OR".to_string(),
            filters,
        })
    }
}

// ============================================================================
// Aggregation queries (count)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAggregationQueryRequest {
    pub structured_aggregation_query: StructuredAggregationQuery,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredAggregationQuery {
    pub structured_query: StructuredQuery,
    pub aggregations: Vec<Aggregation>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub alias: String,
    pub count: serde_json::Map<String, serde_json::Value>,
}

impl Aggregation {
    pub fn count(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            count: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAggregationQueryResponseItem {
    pub result: Option<AggregationResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub aggregate_fields: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_roundtrip() {
        let now = Utc::now();
        let value = now.to_firestore_value();
        let parsed = value.as_timestamp().unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_integer_value_is_string_on_the_wire() {
        let value = 42u32.to_firestore_value();
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["integerValue"], "42");
        assert_eq!(value.as_i64(), Some(42));
    }

    #[test]
    fn test_string_array_conversion() {
        let value = vec!["a".to_string(), "b".to_string()].to_firestore_value();
        assert_eq!(value.as_string_array().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_composite_filter_shape() {
        let filter = Filter::or(vec![
            Filter::eq("owner", "u1"),
            Filter::array_contains_any(
                "access_group_ids",
                vec![Value::StringValue("g1".to_string())],
            ),
        ]);
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["compositeFilter"]["op"], "OR");
        assert_eq!(
            json["compositeFilter"]["filters"][0]["fieldFilter"]["op"],
            "EQUAL"
        );
    }

    #[test]
    fn test_query_where_key() {
        let query = StructuredQuery::collection("videos")
            .with_filter(Filter::eq("owner", "u1"))
            .order_by_desc("created_at")
            .with_offset(12)
            .with_limit(12);
        let json = serde_json::to_value(&query).unwrap();
        assert!(json.get("where").is_some());
        assert_eq!(json["orderBy"][0]["direction"], "DESCENDING");
        assert_eq!(json["offset"], 12);
    }
}
