// ============================================================================
// spark-entities - Capabilities Module
// Independent building blocks assembled into an EntityKit
// ============================================================================

pub mod messenger;
pub mod notifier;
pub mod tracker;

pub use messenger::MessageBroadcaster;
pub use notifier::PropertyNotifier;
pub use tracker::ChangeTracker;
