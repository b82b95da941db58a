// ============================================================================
// Persistence Context
// ============================================================================
//
// Write-behind unit of work over a single entity table:
// - identity map from key to (state, snapshot, instance)
// - lazy dirty checking by snapshot comparison at flush
// - flush order: inserts, updates, deletes
//
// ============================================================================

pub mod change;
pub mod config;
#[allow(clippy::module_inception)]
pub mod context;
pub mod state;

pub use change::{FlushSummary, PendingChange};
pub use config::{ContextConfig, FlushMode};
pub use context::PersistenceContext;
pub use state::EntityState;
