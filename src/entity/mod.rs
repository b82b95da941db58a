// ============================================================================
// Entities
// ============================================================================
//
// An entity is a plain value container: an optional generated key plus a map
// of column values. It knows nothing about the context tracking it. Callers
// share instances with a context through `EntityRef`, mutate them in place,
// and the context notices the change by comparing against its snapshot.
//
// ============================================================================

pub mod customer;

pub use customer::Customer;

use crate::core::{Column, EntityId, Fields, Result};
use crate::storage::TableSchema;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// A type that can be tracked by a persistence context and stored as one row.
pub trait Entity: Clone + fmt::Debug + 'static {
    /// Name of the backing table.
    const TABLE: &'static str;

    /// Declared columns, excluding the key.
    fn columns() -> Vec<Column>;

    /// Generated key, `None` until the entity is first persisted.
    fn id(&self) -> Option<EntityId>;

    /// Called once by the context when the key is generated.
    fn assign_id(&mut self, id: EntityId);

    /// Current column values.
    fn to_fields(&self) -> Fields;

    /// Rebuild an instance from a stored row.
    fn from_row(id: EntityId, fields: &Fields) -> Result<Self>;

    fn table_schema() -> TableSchema {
        TableSchema::new(Self::TABLE, Self::columns())
    }
}

/// Shared handle to one entity instance.
///
/// Two handles are the *same instance* only if they were cloned from each
/// other; equal field values do not make them the same.
pub struct EntityRef<E> {
    inner: Rc<RefCell<E>>,
}

impl<E: Entity> EntityRef<E> {
    pub fn new(entity: E) -> Self {
        Self {
            inner: Rc::new(RefCell::new(entity)),
        }
    }

    /// # Panics
    /// Panics if the instance is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, E> {
        self.inner.borrow()
    }

    /// # Panics
    /// Panics if the instance is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, E> {
        self.inner.borrow_mut()
    }

    pub fn id(&self) -> Option<EntityId> {
        self.inner.borrow().id()
    }

    /// Whether both handles point at the same instance.
    pub fn ptr_eq(&self, other: &EntityRef<E>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A detached copy of the current field values.
    pub fn to_entity(&self) -> E {
        self.inner.borrow().clone()
    }

    pub(crate) fn try_id(&self) -> Result<Option<EntityId>> {
        Ok(self.inner.try_borrow()?.id())
    }

    pub(crate) fn try_fields(&self) -> Result<Fields> {
        Ok(self.inner.try_borrow()?.to_fields())
    }

    pub(crate) fn try_clone_entity(&self) -> Result<E> {
        Ok(self.inner.try_borrow()?.clone())
    }

    pub(crate) fn try_replace(&self, entity: E) -> Result<()> {
        *self.inner.try_borrow_mut()? = entity;
        Ok(())
    }

    pub(crate) fn try_assign_id(&self, id: EntityId) -> Result<()> {
        self.inner.try_borrow_mut()?.assign_id(id);
        Ok(())
    }
}

impl<E> Clone for EntityRef<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for EntityRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(entity) => f.debug_tuple("EntityRef").field(&*entity).finish(),
            Err(_) => f.write_str("EntityRef(<borrowed>)"),
        }
    }
}

impl<E: Entity> From<E> for EntityRef<E> {
    fn from(entity: E) -> Self {
        EntityRef::new(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_are_the_same_instance() {
        let a = EntityRef::new(Customer::new("first", "last"));
        let b = a.clone();
        let c = EntityRef::new(Customer::new("first", "last"));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));

        b.borrow_mut().update_name("new first", "new last");
        assert_eq!(a.borrow().first_name(), "new first");
    }

    #[test]
    fn test_try_accessors_fail_while_borrowed() {
        let handle = EntityRef::new(Customer::new("first", "last"));
        let _guard = handle.borrow_mut();
        assert!(handle.try_fields().is_err());
        assert!(handle.try_id().is_err());
        assert_eq!(format!("{:?}", handle), "EntityRef(<borrowed>)");
    }
}
