// ============================================================================
// spark-entities - Observable Object Graphs for Rust
// ============================================================================
//
// Entities announce property changes, track whether they are dirty, and
// bubble both the dirty flag and status messages up to whatever owns them.
// Composites wire themselves to their children in setters; collections and
// trees do the same for every element they hold.
//
// Everything is single-threaded (Rc/RefCell) and every notification is
// delivered synchronously, in subscription order, before the mutating call
// returns.
// ============================================================================

#[macro_use]
mod macros;

pub mod capabilities;
pub mod collections;
pub mod core;
pub mod events;
pub mod primitives;
pub mod roundtrip;
pub mod tree;

// Re-export core items at crate root for ergonomic access
pub use core::error::{EntityError, Result};
pub use core::kit::{EntityKit, KitBuilder, Wiring};
pub use core::types::{Entity, Slot};

// Observation primitives
pub use events::equality::{EqualsFn, equals, safe_equals_f32, safe_equals_f64, same_entity};
pub use events::observers::{Listener, Observers, Subscription};

// Capabilities
pub use capabilities::{ChangeTracker, MessageBroadcaster, PropertyNotifier};

// Property storage
pub use primitives::field::Field;
pub use primitives::slot::{ChildSlot, Embedded};

// Collections and trees
pub use collections::{CollectionChange, ObservingCollection};
pub use tree::{Children, InsertMode, Node, TraversalOptions};

// =============================================================================
// TESTS
// =============================================================================
