//! Everything a unit of work usually needs in one import.

pub use crate::context::{ContextConfig, EntityState, FlushMode, FlushSummary, PersistenceContext};
pub use crate::core::{DbError, EntityId, Result};
pub use crate::entity::{Customer, Entity, EntityRef};
pub use crate::repository::{CustomerRepository, Repository};
pub use crate::storage::{DurabilityMode, FileStore, InMemoryStore, Store};
pub use crate::{file_context, in_memory_context};
