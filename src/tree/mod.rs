// ============================================================================
// spark-entities - Tree Module
// Hierarchies of composite entities with search, counting, and copying
// ============================================================================

mod node;
mod traversal;

pub use node::{Children, Node};
pub use traversal::{InsertMode, TraversalOptions};
