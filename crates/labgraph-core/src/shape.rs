//! Shaping of fetched records into client-facing documents.

use serde_json::{Map, Value};

use crate::scheme::EntityScheme;
use crate::store::{NodeProperties, PageRecord};

/// Key under which indirect sections are grouped.
pub const RECOMMENDATIONS: &str = "recommendations";

/// Build the page document for one entity.
///
/// The entity itself sits under its type name as a single object. Direct
/// sections map their label to a list of neighbors; indirect sections are
/// grouped under [`RECOMMENDATIONS`].
pub fn shape_page(scheme: &EntityScheme, record: PageRecord) -> Value {
    let mut document = Map::new();
    let mut recommendations = Map::new();

    document.insert(
        scheme.entity_type.as_str().to_string(),
        Value::Object(record.entity),
    );

    for (section, nodes) in scheme.sections.iter().zip(record.sections) {
        let list = shape_list(nodes);
        if section.recommendation {
            recommendations.insert(section.label.to_string(), list);
        } else {
            document.insert(section.label.to_string(), list);
        }
    }

    if scheme.sections.iter().any(|s| s.recommendation) {
        document.insert(RECOMMENDATIONS.to_string(), Value::Object(recommendations));
    }

    Value::Object(document)
}

/// A plain list of property maps.
pub fn shape_list(nodes: Vec<NodeProperties>) -> Value {
    Value::Array(nodes.into_iter().map(Value::Object).collect())
}
