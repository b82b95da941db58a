// ============================================================================
// Entity Lifecycle State
// ============================================================================
//
// Transient ──persist──> Managed ──remove──> Removed ──flush──> (untracked)
//                          │  ▲                 │
//                   detach │  │ merge           │ merge (cancels removal)
//                          ▼  │                 ▼
//                        Detached            Managed
//
// The state lives in the context, never on the entity.
//
// ============================================================================

use crate::core::Fields;
use crate::entity::EntityRef;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Never persisted; carries no key.
    Transient,

    /// Tracked by the context; changes reach the store on flush.
    Managed,

    /// Carries a key but the context does not track this instance.
    Detached,

    /// Tracked and scheduled for deletion on the next flush.
    Removed,
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityState::Transient => write!(f, "TRANSIENT"),
            EntityState::Managed => write!(f, "MANAGED"),
            EntityState::Detached => write!(f, "DETACHED"),
            EntityState::Removed => write!(f, "REMOVED"),
        }
    }
}

/// Tracking record for one identity. `state` is always `Managed` or `Removed`.
#[derive(Debug)]
pub(crate) struct EntityEntry<E> {
    pub instance: EntityRef<E>,
    pub state: EntityState,
    /// Field values as last written to (or read from) the store.
    pub snapshot: Fields,
    /// No row exists yet; the next flush inserts one.
    pub pending_insert: bool,
}

impl<E> EntityEntry<E> {
    /// Entry for an instance that has no row yet.
    pub fn pending(instance: EntityRef<E>, snapshot: Fields) -> Self {
        Self {
            instance,
            state: EntityState::Managed,
            snapshot,
            pending_insert: true,
        }
    }

    /// Entry for an instance built from an existing row.
    pub fn loaded(instance: EntityRef<E>, row: Fields) -> Self {
        Self {
            instance,
            state: EntityState::Managed,
            snapshot: row,
            pending_insert: false,
        }
    }

    pub fn is_managed(&self) -> bool {
        self.state == EntityState::Managed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Customer, Entity};

    #[test]
    fn test_state_display() {
        assert_eq!(EntityState::Removed.to_string(), "REMOVED");
        assert_eq!(EntityState::Detached.to_string(), "DETACHED");
    }

    #[test]
    fn test_entry_constructors() {
        let customer = Customer::new("a", "b");
        let fields = customer.to_fields();
        let pending = EntityEntry::pending(EntityRef::new(customer.clone()), fields.clone());
        assert!(pending.pending_insert);
        assert!(pending.is_managed());

        let loaded = EntityEntry::loaded(EntityRef::new(customer), fields);
        assert!(!loaded.pending_insert);
        assert!(loaded.is_managed());
    }
}
