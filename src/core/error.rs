// ============================================================================
// spark-entities - Errors
// ============================================================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntityError {
    #[error("serialization error: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("deserialization error: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// Attaching the node would make it its own ancestor.
    #[error("cannot attach a node beneath itself or one of its descendants")]
    Cycle,
}

pub type Result<T> = std::result::Result<T, EntityError>;
