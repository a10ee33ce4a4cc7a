//! Client mutation payloads.
//!
//! Every mutation body carries an `"object"` tag selecting one of three
//! shapes. Type names and ids arrive exactly as the client sent them; they
//! are resolved and checked by [`crate::validate`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LabGraphError, Result};

/// A mutation request, discriminated by its `"object"` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "object", rename_all = "lowercase")]
pub enum MutationRequest {
    Properties(PropertiesPayload),
    Entity(EntityPayload),
    Relationships(RelationshipsPayload),
}

impl MutationRequest {
    /// Parse a JSON body; any shape error is reported as a bad request.
    pub fn from_json(body: serde_json::Value) -> Result<Self> {
        serde_json::from_value(body)
            .map_err(|e| LabGraphError::bad_request(format!("invalid request body: {e}")))
    }

    pub fn object(&self) -> &'static str {
        match self {
            Self::Properties(_) => "properties",
            Self::Entity(_) => "entity",
            Self::Relationships(_) => "relationships",
        }
    }
}

/// Set properties on an existing entity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertiesPayload {
    pub entity_type: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub entity_id: String,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Create an entity, optionally with relationships to existing entities.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPayload {
    pub entity_type: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub entity_id: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub relationships: Vec<EdgePayload>,
}

/// Create relationships between existing entities.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipsPayload {
    pub relationships: Vec<EdgePayload>,
}

/// One relationship as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgePayload {
    pub relationship_type: String,
    pub source_entity_type: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub source_entity_id: String,
    pub destination_entity_type: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub destination_entity_id: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Ids are decimal strings, but clients frequently send them as numbers.
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

// ── Property Values ───────────────────────────────────────────────

/// A validated property value, stored as a string or a list of strings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    List(Vec<String>),
}

/// Validated properties keyed by property name.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

impl PropertyValue {
    /// Convert a JSON value. Scalars become text; arrays of scalars become
    /// lists. Null, objects and nested arrays are rejected.
    pub fn from_json(key: &str, value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        let scalar = |v: &Value| -> Option<String> {
            match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            }
        };

        match value {
            Value::Array(items) => items
                .iter()
                .map(scalar)
                .collect::<Option<Vec<_>>>()
                .map(PropertyValue::List)
                .ok_or_else(|| {
                    LabGraphError::bad_request(format!(
                        "property '{key}' must be a list of scalar values"
                    ))
                }),
            other => scalar(other).map(PropertyValue::Text).ok_or_else(|| {
                LabGraphError::bad_request(format!(
                    "property '{key}' must be a string, number, boolean or list"
                ))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn properties_request_parses() {
        let req = MutationRequest::from_json(json!({
            "object": "properties",
            "entityType": "Lab",
            "entityId": "3",
            "properties": { "labName": "Optics Lab" }
        }))
        .unwrap();
        let MutationRequest::Properties(p) = req else {
            panic!("expected properties payload");
        };
        assert_eq!(p.entity_type, "Lab");
        assert_eq!(p.entity_id, "3");
        assert_eq!(p.properties["labName"], "Optics Lab");
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let req = MutationRequest::from_json(json!({
            "object": "entity",
            "entityType": "Product",
            "entityId": -1,
            "properties": { "productName": "Spectrometer" },
            "relationships": [{
                "relationshipType": "USED_AT",
                "sourceEntityType": "Product",
                "sourceEntityId": -1,
                "destinationEntityType": "Lab",
                "destinationEntityId": 3
            }]
        }))
        .unwrap();
        let MutationRequest::Entity(e) = req else {
            panic!("expected entity payload");
        };
        assert_eq!(e.entity_id, "-1");
        assert_eq!(e.relationships[0].destination_entity_id, "3");
        assert!(e.relationships[0].properties.is_empty());
    }

    #[test]
    fn unknown_object_tag_is_bad_request() {
        let err = MutationRequest::from_json(json!({
            "object": "widgets",
            "entityType": "Lab"
        }))
        .unwrap_err();
        assert!(matches!(err, LabGraphError::BadRequest(_)));

        let err = MutationRequest::from_json(json!({ "entityType": "Lab" })).unwrap_err();
        assert!(matches!(err, LabGraphError::BadRequest(_)));
    }

    #[test]
    fn property_values_are_stringified() {
        assert_eq!(
            PropertyValue::from_json("k", &json!(42)).unwrap(),
            PropertyValue::Text("42".into())
        );
        assert_eq!(
            PropertyValue::from_json("k", &json!(true)).unwrap(),
            PropertyValue::Text("true".into())
        );
        assert_eq!(
            PropertyValue::from_json("k", &json!(["1", 2])).unwrap(),
            PropertyValue::List(vec!["1".into(), "2".into()])
        );
    }

    #[test]
    fn nested_property_values_are_rejected() {
        assert!(PropertyValue::from_json("k", &json!(null)).is_err());
        assert!(PropertyValue::from_json("k", &json!({"a": 1})).is_err());
        assert!(PropertyValue::from_json("k", &json!([[1]])).is_err());
    }
}
