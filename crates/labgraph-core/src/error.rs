use thiserror::Error;

/// Top-level error type for LabGraph.
#[derive(Error, Debug)]
pub enum LabGraphError {
    #[error("Entity type not found: {0}")]
    EntityTypeNotFound(String),

    #[error("Relationship type not found: {0}")]
    RelationshipTypeNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unknown property '{property}' for entity type {entity_type}")]
    UnknownProperty {
        entity_type: String,
        property: String,
    },

    #[error("{entity_type} with id {id} not found")]
    EntityIdNotFound { entity_type: String, id: String },

    #[error("{entity_type} has no relationship {relationship}")]
    EntityHasNoSuchRelationship {
        entity_type: String,
        relationship: String,
    },

    #[error(
        "Relationship {relationship} already exists between {source_type} {source_id} and {destination_type} {destination_id}"
    )]
    RelationshipAlreadyExists {
        relationship: String,
        source_type: String,
        source_id: String,
        destination_type: String,
        destination_id: String,
    },

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by the HTTP boundary to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }
}

impl LabGraphError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_)
            | Self::UnknownProperty { .. }
            | Self::EntityHasNoSuchRelationship { .. }
            | Self::RelationshipAlreadyExists { .. } => ErrorKind::BadRequest,
            Self::EntityTypeNotFound(_)
            | Self::RelationshipTypeNotFound(_)
            | Self::EntityIdNotFound { .. } => ErrorKind::NotFound,
            Self::Graph(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, LabGraphError>;
