// ============================================================================
// spark-entities - Core Module
// Entity traits, the shared entity kit, and errors
// ============================================================================

pub mod error;
pub mod kit;
pub mod types;

pub use error::{EntityError, Result};
pub use kit::{EntityKit, KitBuilder, Wiring};
pub use types::{Entity, Slot};
