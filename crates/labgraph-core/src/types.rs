//! Entity and relationship types of the research-lab knowledge graph.
//!
//! Canonical names double as Neo4j node labels and relationship types, so
//! client-supplied strings must pass through [`resolve_entity_type`] or
//! [`resolve_relationship_type`] before they reach any statement text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LabGraphError, Result};

// ── Entity Types ──────────────────────────────────────────────────

/// A node label in the knowledge graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Lab,
    Researcher,
    ResearchArea,
    Product,
    Faculty,
    Article,
    Research,
    ResearchSetup,
}

impl EntityType {
    pub const ALL: [EntityType; 8] = [
        Self::Lab,
        Self::Researcher,
        Self::ResearchArea,
        Self::Product,
        Self::Faculty,
        Self::Article,
        Self::Research,
        Self::ResearchSetup,
    ];

    /// Canonical name, also used as the Neo4j label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lab => "Lab",
            Self::Researcher => "Researcher",
            Self::ResearchArea => "ResearchArea",
            Self::Product => "Product",
            Self::Faculty => "Faculty",
            Self::Article => "Article",
            Self::Research => "Research",
            Self::ResearchSetup => "ResearchSetup",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Relationship Types ────────────────────────────────────────────

/// A directed relationship type between two entity types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    PartOf,
    ActiveAt,
    Using,
    Researches,
    Conducts,
    WasResearchedAt,
    UsedAt,
    ComposedOf,
    UsedIn,
    RelevantTo,
    WroteRegardTo,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 11] = [
        Self::PartOf,
        Self::ActiveAt,
        Self::Using,
        Self::Researches,
        Self::Conducts,
        Self::WasResearchedAt,
        Self::UsedAt,
        Self::ComposedOf,
        Self::UsedIn,
        Self::RelevantTo,
        Self::WroteRegardTo,
    ];

    /// Canonical name, also used as the Cypher relationship type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PartOf => "PART_OF",
            Self::ActiveAt => "ACTIVE_AT",
            Self::Using => "USING",
            Self::Researches => "RESEARCHES",
            Self::Conducts => "CONDUCTS",
            Self::WasResearchedAt => "WAS_RESEARCHED_AT",
            Self::UsedAt => "USED_AT",
            Self::ComposedOf => "COMPOSED_OF",
            Self::UsedIn => "USED_IN",
            Self::RelevantTo => "RELEVANT_TO",
            Self::WroteRegardTo => "WROTE_REGARD_TO",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Resolution ────────────────────────────────────────────────────

/// Map a client-supplied string to its canonical entity type.
///
/// Matching is an exact, case-insensitive comparison with the canonical name.
pub fn resolve_entity_type(input: &str) -> Result<EntityType> {
    EntityType::ALL
        .into_iter()
        .find(|t| t.as_str().eq_ignore_ascii_case(input))
        .ok_or_else(|| LabGraphError::EntityTypeNotFound(input.to_string()))
}

/// Map a client-supplied string to its canonical relationship type.
pub fn resolve_relationship_type(input: &str) -> Result<RelationshipType> {
    RelationshipType::ALL
        .into_iter()
        .find(|r| r.as_str().eq_ignore_ascii_case(input))
        .ok_or_else(|| LabGraphError::RelationshipTypeNotFound(input.to_string()))
}

// ── Edge References ───────────────────────────────────────────────

/// One end of a relationship: a typed entity id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self {
            entity_type,
            id: id.into(),
        }
    }
}

/// A relationship that passed validation: canonical type, typed endpoints,
/// and its list-valued properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEdge {
    pub relationship: RelationshipType,
    pub source: EntityRef,
    pub destination: EntityRef,
    pub properties: Vec<(String, Vec<String>)>,
}

impl ResolvedEdge {
    /// Replace the id of whichever endpoint has `entity_type`.
    pub fn with_new_entity_id(&self, entity_type: EntityType, id: &str) -> Self {
        let mut edge = self.clone();
        if edge.source.entity_type == entity_type {
            edge.source.id = id.to_string();
        } else if edge.destination.entity_type == entity_type {
            edge.destination.id = id.to_string();
        }
        edge
    }
}
