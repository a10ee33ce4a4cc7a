//! Scheme registry: the declarative description of every entity type.
//!
//! A scheme names the id, display and active-flag properties of a type, the
//! properties clients may mutate, the relationships the type takes part in,
//! and the neighbor sections shown on its detail page. The registry is built
//! once per process and never touches the database.

use std::sync::OnceLock;

use serde::Serialize;

use crate::error::{LabGraphError, Result};
use crate::types::{resolve_entity_type, EntityType, RelationshipType};

/// Maximum number of neighbors collected per page section.
pub const SECTION_LIMIT: usize = 20;

/// Id carried by a payload for an entity that does not exist yet.
pub const UNASSIGNED_ID: &str = "-1";

// ── Edge Schemes ──────────────────────────────────────────────────

/// An edge property holding a list of ids of another entity type.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListProperty {
    pub name: &'static str,
    pub entity_type: EntityType,
}

/// One allowed, directed relationship between two entity types.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeScheme {
    pub relationship: RelationshipType,
    pub source: EntityType,
    pub destination: EntityType,
    pub list_properties: Vec<ListProperty>,
}

impl EdgeScheme {
    fn new(relationship: RelationshipType, source: EntityType, destination: EntityType) -> Self {
        Self {
            relationship,
            source,
            destination,
            list_properties: Vec::new(),
        }
    }

    fn with_list(mut self, name: &'static str, entity_type: EntityType) -> Self {
        self.list_properties.push(ListProperty { name, entity_type });
        self
    }

    pub fn list_property(&self, name: &str) -> Option<&ListProperty> {
        self.list_properties.iter().find(|p| p.name == name)
    }

    pub fn involves(&self, entity_type: EntityType) -> bool {
        self.source == entity_type || self.destination == entity_type
    }
}

// ── Page Sections ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// One relationship traversal step away from the current node.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Hop {
    pub relationship: RelationshipType,
    pub direction: Direction,
}

impl Hop {
    pub fn out(relationship: RelationshipType) -> Self {
        Self {
            relationship,
            direction: Direction::Outgoing,
        }
    }

    pub fn inc(relationship: RelationshipType) -> Self {
        Self {
            relationship,
            direction: Direction::Incoming,
        }
    }

    /// The entity type reached by taking this hop from `from`, if the
    /// relationship is declared in that direction.
    pub fn target(&self, from: EntityType) -> Option<EntityType> {
        let edge = edge_scheme(self.relationship);
        match self.direction {
            Direction::Outgoing if edge.source == from => Some(edge.destination),
            Direction::Incoming if edge.destination == from => Some(edge.source),
            _ => None,
        }
    }
}

/// A group of neighbors shown on an entity's detail page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub label: &'static str,
    pub entity_type: EntityType,
    pub hops: Vec<Hop>,
    /// Indirect neighbors, grouped under "recommendations" in page documents.
    pub recommendation: bool,
}

impl Section {
    fn direct(label: &'static str, entity_type: EntityType, hop: Hop) -> Self {
        Self {
            label,
            entity_type,
            hops: vec![hop],
            recommendation: false,
        }
    }

    fn recommended(label: &'static str, entity_type: EntityType, hops: [Hop; 2]) -> Self {
        Self {
            label,
            entity_type,
            hops: hops.to_vec(),
            recommendation: true,
        }
    }
}

// ── Entity Schemes ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityScheme {
    pub entity_type: EntityType,
    pub id_field: &'static str,
    pub name_field: &'static str,
    pub active_field: Option<&'static str>,
    pub allowed_properties: Vec<&'static str>,
    pub edges: Vec<EdgeScheme>,
    pub sections: Vec<Section>,
}

impl EntityScheme {
    /// Every property a client may set: name, active flag, and allowed properties.
    pub fn mutable_properties(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.name_field)
            .chain(self.active_field)
            .chain(self.allowed_properties.iter().copied())
    }

    pub fn is_mutable(&self, key: &str) -> bool {
        self.mutable_properties().any(|p| p == key)
    }

    pub fn find_edge(&self, relationship: RelationshipType) -> Option<&EdgeScheme> {
        self.edges.iter().find(|e| e.relationship == relationship)
    }
}

struct Registry {
    edges: Vec<EdgeScheme>,
    schemes: Vec<EntityScheme>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(build_registry)
}

/// The scheme of an entity type.
pub fn scheme(entity_type: EntityType) -> &'static EntityScheme {
    let registry = registry();
    registry
        .schemes
        .iter()
        .find(|s| s.entity_type == entity_type)
        .unwrap_or_else(|| unreachable!("every entity type has a registered scheme"))
}

/// Resolve a client-supplied type name and return its scheme.
pub fn scheme_for(name: &str) -> Result<&'static EntityScheme> {
    Ok(scheme(resolve_entity_type(name)?))
}

/// All registered entity schemes, in declaration order.
pub fn schemes() -> &'static [EntityScheme] {
    &registry().schemes
}

/// The single declaration of a relationship type.
pub fn edge_scheme(relationship: RelationshipType) -> &'static EdgeScheme {
    registry()
        .edges
        .iter()
        .find(|e| e.relationship == relationship)
        .unwrap_or_else(|| unreachable!("every relationship type has a declared edge"))
}

/// All declared edge schemes.
pub fn edge_schemes() -> &'static [EdgeScheme] {
    &registry().edges
}

/// Id for a newly created entity given the current maximum id of its type.
pub fn next_entity_id(max_existing: Option<u64>) -> Result<u64> {
    match max_existing {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| LabGraphError::Internal(format!("no entity id left after {max}"))),
    }
}

fn build_registry() -> Registry {
    use EntityType as E;
    use RelationshipType as R;

    let edges = vec![
        EdgeScheme::new(R::PartOf, E::Lab, E::Faculty),
        EdgeScheme::new(R::ActiveAt, E::Researcher, E::Lab)
            .with_list("researchedAreaIds", E::ResearchArea),
        EdgeScheme::new(R::Using, E::Researcher, E::Product)
            .with_list("researchSetupIds", E::ResearchSetup),
        EdgeScheme::new(R::Researches, E::Researcher, E::ResearchArea),
        EdgeScheme::new(R::Conducts, E::Researcher, E::Research),
        EdgeScheme::new(R::WasResearchedAt, E::ResearchArea, E::Lab),
        EdgeScheme::new(R::UsedAt, E::Product, E::Lab),
        EdgeScheme::new(R::ComposedOf, E::ResearchSetup, E::Product),
        EdgeScheme::new(R::UsedIn, E::ResearchSetup, E::Research),
        EdgeScheme::new(R::RelevantTo, E::Article, E::ResearchArea),
        EdgeScheme::new(R::WroteRegardTo, E::Article, E::Research),
    ];

    let entity = |entity_type: EntityType,
                  id_field: &'static str,
                  name_field: &'static str,
                  active_field: Option<&'static str>,
                  allowed_properties: Vec<&'static str>,
                  sections: Vec<Section>| EntityScheme {
        entity_type,
        id_field,
        name_field,
        active_field,
        allowed_properties,
        edges: edges
            .iter()
            .filter(|e| e.involves(entity_type))
            .cloned()
            .collect(),
        sections,
    };

    let schemes = vec![
        entity(
            E::Lab,
            "labId",
            "labName",
            None,
            vec![
                "labAbbreviation",
                "labDescription",
                "labWebsite",
                "labEmail",
                "labLocation",
            ],
            vec![
                Section::direct("Faculty", E::Faculty, Hop::out(R::PartOf)),
                Section::direct("Researchers", E::Researcher, Hop::inc(R::ActiveAt)),
                Section::direct("Research Areas", E::ResearchArea, Hop::inc(R::WasResearchedAt)),
                Section::direct("Used Products", E::Product, Hop::inc(R::UsedAt)),
                Section::recommended(
                    "Related Articles",
                    E::Article,
                    [Hop::inc(R::WasResearchedAt), Hop::inc(R::RelevantTo)],
                ),
                Section::recommended(
                    "Related Labs",
                    E::Lab,
                    [Hop::inc(R::WasResearchedAt), Hop::out(R::WasResearchedAt)],
                ),
            ],
        ),
        entity(
            E::Researcher,
            "researcherId",
            "researcherName",
            Some("researcherActive"),
            vec![
                "researcherEmail",
                "researcherTitle",
                "researcherPhone",
                "researcherPhotoUrl",
                "researcherBio",
            ],
            vec![
                Section::direct("Labs", E::Lab, Hop::out(R::ActiveAt)),
                Section::direct("Research Areas", E::ResearchArea, Hop::out(R::Researches)),
                Section::direct("Used Products", E::Product, Hop::out(R::Using)),
                Section::direct("Research", E::Research, Hop::out(R::Conducts)),
                Section::recommended(
                    "Related Articles",
                    E::Article,
                    [Hop::out(R::Researches), Hop::inc(R::RelevantTo)],
                ),
                Section::recommended(
                    "Colleagues",
                    E::Researcher,
                    [Hop::out(R::ActiveAt), Hop::inc(R::ActiveAt)],
                ),
            ],
        ),
        entity(
            E::ResearchArea,
            "researchAreaId",
            "researchAreaName",
            None,
            vec!["researchAreaDescription"],
            vec![
                Section::direct("Labs", E::Lab, Hop::out(R::WasResearchedAt)),
                Section::direct("Researchers", E::Researcher, Hop::inc(R::Researches)),
                Section::direct("Articles", E::Article, Hop::inc(R::RelevantTo)),
                Section::recommended(
                    "Related Products",
                    E::Product,
                    [Hop::inc(R::Researches), Hop::out(R::Using)],
                ),
            ],
        ),
        entity(
            E::Product,
            "productId",
            "productName",
            Some("productActive"),
            vec![
                "productDescription",
                "productManufacturer",
                "productModel",
                "productQuantity",
                "productPhotoUrl",
            ],
            vec![
                Section::direct("Labs", E::Lab, Hop::out(R::UsedAt)),
                Section::direct("Researchers", E::Researcher, Hop::inc(R::Using)),
                Section::direct("Research Setups", E::ResearchSetup, Hop::inc(R::ComposedOf)),
                Section::recommended(
                    "Related Research",
                    E::Research,
                    [Hop::inc(R::ComposedOf), Hop::out(R::UsedIn)],
                ),
                Section::recommended(
                    "Related Products",
                    E::Product,
                    [Hop::inc(R::ComposedOf), Hop::out(R::ComposedOf)],
                ),
            ],
        ),
        entity(
            E::Faculty,
            "facultyId",
            "facultyName",
            None,
            vec!["facultyDescription", "facultyWebsite"],
            vec![
                Section::direct("Labs", E::Lab, Hop::inc(R::PartOf)),
                Section::recommended(
                    "Researchers",
                    E::Researcher,
                    [Hop::inc(R::PartOf), Hop::inc(R::ActiveAt)],
                ),
            ],
        ),
        entity(
            E::Article,
            "articleId",
            "articleTitle",
            None,
            vec![
                "articleUrl",
                "articleDoi",
                "articlePublicationYear",
                "articleAbstract",
            ],
            vec![
                Section::direct("Research Areas", E::ResearchArea, Hop::out(R::RelevantTo)),
                Section::direct("Research", E::Research, Hop::out(R::WroteRegardTo)),
                Section::recommended(
                    "Related Labs",
                    E::Lab,
                    [Hop::out(R::RelevantTo), Hop::out(R::WasResearchedAt)],
                ),
            ],
        ),
        entity(
            E::Research,
            "researchId",
            "researchName",
            Some("researchActive"),
            vec![
                "researchDescription",
                "researchStartDate",
                "researchEndDate",
            ],
            vec![
                Section::direct("Researchers", E::Researcher, Hop::inc(R::Conducts)),
                Section::direct("Research Setups", E::ResearchSetup, Hop::inc(R::UsedIn)),
                Section::direct("Articles", E::Article, Hop::inc(R::WroteRegardTo)),
                Section::recommended(
                    "Used Products",
                    E::Product,
                    [Hop::inc(R::UsedIn), Hop::out(R::ComposedOf)],
                ),
            ],
        ),
        entity(
            E::ResearchSetup,
            "researchSetupId",
            "researchSetupName",
            None,
            vec!["researchSetupDescription", "researchSetupLocation"],
            vec![
                Section::direct("Products", E::Product, Hop::out(R::ComposedOf)),
                Section::direct("Research", E::Research, Hop::out(R::UsedIn)),
                Section::recommended(
                    "Researchers",
                    E::Researcher,
                    [Hop::out(R::UsedIn), Hop::inc(R::Conducts)],
                ),
            ],
        ),
    ];

    Registry { edges, schemes }
}
