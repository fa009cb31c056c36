// ============================================================================
// spark-entities - Primitives Module
// Property storage: plain value fields and entity-valued child slots
// ============================================================================

pub mod field;
pub mod slot;

pub use field::Field;
pub use slot::{ChildSlot, Embedded};
