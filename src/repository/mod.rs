// ============================================================================
// Repositories
// ============================================================================
//
// CRUD surface over a persistence context. Writes go through the context
// and are flushed with it; queries that read the store flush first when the
// context runs in `FlushMode::Auto`.
//
// ============================================================================

use crate::context::{EntityState, PersistenceContext};
use crate::core::{DbError, EntityId, Result, Value};
use crate::entity::customer::LAST_NAME;
use crate::entity::{Customer, Entity, EntityRef};
use crate::storage::Store;

pub struct Repository<'ctx, E: Entity, S: Store> {
    ctx: &'ctx mut PersistenceContext<E, S>,
}

impl<'ctx, E: Entity, S: Store> Repository<'ctx, E, S> {
    pub fn new(ctx: &'ctx mut PersistenceContext<E, S>) -> Self {
        Self { ctx }
    }

    pub fn context(&mut self) -> &mut PersistenceContext<E, S> {
        &mut *self.ctx
    }

    /// Persists a new entity or merges a detached one, returning the managed instance.
    pub fn save(&mut self, entity: impl Into<EntityRef<E>>) -> Result<EntityRef<E>> {
        let entity = entity.into();
        match self.ctx.state_of(&entity)? {
            EntityState::Transient => {
                self.ctx.persist(&entity)?;
                Ok(entity)
            }
            EntityState::Managed => Ok(entity),
            EntityState::Detached | EntityState::Removed => self.ctx.merge(&entity),
        }
    }

    pub fn save_all<I, T>(&mut self, entities: I) -> Result<Vec<EntityRef<E>>>
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityRef<E>>,
    {
        entities.into_iter().map(|entity| self.save(entity)).collect()
    }

    pub fn find_by_id(&mut self, id: EntityId) -> Result<Option<EntityRef<E>>> {
        self.ctx.find(id)
    }

    pub fn exists_by_id(&mut self, id: EntityId) -> Result<bool> {
        Ok(self.find_by_id(id)?.is_some())
    }

    pub fn find_all(&mut self) -> Result<Vec<EntityRef<E>>> {
        self.ctx.find_all()
    }

    /// Managed instances for the given keys, skipping keys with no row.
    pub fn find_all_by_id<I>(&mut self, ids: I) -> Result<Vec<EntityRef<E>>>
    where
        I: IntoIterator<Item = EntityId>,
    {
        let mut found = Vec::new();
        for id in ids {
            if let Some(entity) = self.find_by_id(id)? {
                found.push(entity);
            }
        }
        Ok(found)
    }

    pub fn count(&mut self) -> Result<usize> {
        Ok(self.find_all()?.len())
    }

    /// Removes the entity, merging it first if it is detached. Transient
    /// entities have no row and are ignored.
    pub fn delete(&mut self, entity: &EntityRef<E>) -> Result<()> {
        match self.ctx.state_of(entity)? {
            EntityState::Transient | EntityState::Removed => Ok(()),
            EntityState::Managed => self.ctx.remove(entity),
            EntityState::Detached => {
                let managed = self.ctx.merge(entity)?;
                self.ctx.remove(&managed)
            }
        }
    }

    /// # Errors
    /// `NotFound` if no row has this key.
    pub fn delete_by_id(&mut self, id: EntityId) -> Result<()> {
        let entity = self.find_by_id(id)?.ok_or(DbError::NotFound(id))?;
        self.ctx.remove(&entity)
    }

    pub fn delete_all(&mut self) -> Result<()> {
        for entity in self.find_all()? {
            self.ctx.remove(&entity)?;
        }
        Ok(())
    }

    /// Derived query: every managed entity whose `field` equals `value`.
    ///
    /// # Errors
    /// `ColumnNotFound` if `field` is not a column of the entity's table.
    pub fn find_by(&mut self, field: &str, value: impl Into<Value>) -> Result<Vec<EntityRef<E>>> {
        if !E::columns().iter().any(|column| column.name == field) {
            return Err(DbError::ColumnNotFound(field.to_string(), E::TABLE.to_string()));
        }

        let value = value.into();
        let mut matches = Vec::new();
        for entity in self.find_all()? {
            if entity.try_fields()?.get(field) == Some(&value) {
                matches.push(entity);
            }
        }
        Ok(matches)
    }
}

/// Customer-specific queries.
pub trait CustomerRepository {
    fn find_by_last_name(&mut self, last_name: &str) -> Result<Vec<EntityRef<Customer>>>;
}

impl<S: Store> CustomerRepository for Repository<'_, Customer, S> {
    fn find_by_last_name(&mut self, last_name: &str) -> Result<Vec<EntityRef<Customer>>> {
        self.find_by(LAST_NAME, last_name)
    }
}
