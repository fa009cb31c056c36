// ============================================================================
// spark-entities - Collections
// Sequences of entities that keep their items wired
// ============================================================================

mod observing;

pub use observing::{CollectionChange, ObservingCollection};
