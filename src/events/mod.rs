// ============================================================================
// spark-entities - Events Module
// Observer lists, subscription handles, and write-suppression equality
// ============================================================================

pub mod equality;
pub mod observers;

pub use equality::{EqualsFn, equals, safe_equals_f32, safe_equals_f64, same_entity};
pub use observers::{Listener, Observers, Subscription};
