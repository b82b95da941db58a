// ============================================================================
// memopersist Library
// ============================================================================

pub mod context;
pub mod core;
pub mod entity;
pub mod prelude;
pub mod repository;
pub mod storage;

// Re-export main types for convenience
pub use crate::context::{
    ContextConfig, EntityState, FlushMode, FlushSummary, PendingChange, PersistenceContext,
};
pub use crate::core::{DataType, DbError, EntityId, Fields, FlushOperation, Result, Value};
pub use crate::entity::{Customer, Entity, EntityRef};
pub use crate::repository::{CustomerRepository, Repository};
pub use crate::storage::{DurabilityMode, FileStore, InMemoryStore, Store, StoreStats};

/// A persistence context over a shared in-memory table for `E`.
///
/// The returned store handle reads the same table, which makes it easy to see
/// exactly what has been flushed.
///
/// # Examples
///
/// ```
/// use memopersist::{Customer, EntityRef, Store, in_memory_context};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (mut ctx, store) = in_memory_context::<Customer>();
///
/// let customer = EntityRef::new(Customer::new("first", "last"));
/// ctx.persist(&customer)?;
/// assert!(ctx.contains(&customer)?);
/// assert_eq!(store.row_count()?, 0);
///
/// ctx.flush()?;
/// assert_eq!(store.row_count()?, 1);
/// # Ok(())
/// # }
/// ```
pub fn in_memory_context<E: Entity>() -> (PersistenceContext<E, InMemoryStore>, InMemoryStore) {
    in_memory_context_with_config(ContextConfig::default())
}

pub fn in_memory_context_with_config<E: Entity>(
    config: ContextConfig,
) -> (PersistenceContext<E, InMemoryStore>, InMemoryStore) {
    let store = InMemoryStore::new(E::table_schema());
    (PersistenceContext::with_config(store.clone(), config), store)
}

/// A persistence context over the file-backed table for `E` under `config.data_dir`.
///
/// # Errors
/// `DbError::Config` if no data directory is configured.
pub fn file_context<E: Entity>(config: ContextConfig) -> Result<PersistenceContext<E, FileStore>> {
    let data_dir = config
        .data_dir
        .clone()
        .ok_or_else(|| DbError::Config("file-backed context requires a data directory".to_string()))?;
    let store = FileStore::open(data_dir, E::table_schema(), config.durability)?;
    Ok(PersistenceContext::with_config(store, config))
}
