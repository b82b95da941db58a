use super::change::{FlushSummary, PendingChange};
use super::config::{ContextConfig, FlushMode};
use super::state::{EntityEntry, EntityState};
use crate::core::{DbError, EntityId, Fields, Result};
use crate::entity::{Entity, EntityRef};
use crate::storage::Store;
use indexmap::IndexMap;
use tracing::{Level, event, info_span};

/// Tracks entity instances for one unit of work and writes their changes
/// behind to a [`Store`] on [`flush`](PersistenceContext::flush).
///
/// Entries are kept in the order they became tracked, which is the order
/// inserts and updates are issued in. Removals are issued in the order
/// `remove` was called.
///
/// # Thread Safety
/// A context is confined to one thread and one logical transaction.
pub struct PersistenceContext<E: Entity, S: Store> {
    store: S,
    config: ContextConfig,
    entries: IndexMap<EntityId, EntityEntry<E>>,
    removals: Vec<EntityId>,
}

impl<E: Entity, S: Store> PersistenceContext<E, S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ContextConfig::default())
    }

    pub fn with_config(store: S, config: ContextConfig) -> Self {
        Self {
            store,
            config,
            entries: IndexMap::new(),
            removals: Vec::new(),
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access. Writes made here bypass tracking.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Ends the unit of work without flushing; pending changes are lost.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Number of tracked (managed or removed) identities.
    pub fn managed_count(&self) -> usize {
        self.entries.len()
    }

    // ------------------------------------------------------------------
    // Lifecycle transitions
    // ------------------------------------------------------------------

    /// Makes a transient instance managed. The row is written on the next flush.
    ///
    /// Persisting an instance that is already managed does nothing.
    ///
    /// # Errors
    /// `InvalidState` if the instance is removed or detached.
    pub fn persist(&mut self, instance: &EntityRef<E>) -> Result<()> {
        let Some(id) = instance.try_id()? else {
            let id = self.next_free_id()?;
            instance.try_assign_id(id)?;
            let snapshot = instance.try_fields()?;
            self.entries
                .insert(id, EntityEntry::pending(instance.clone(), snapshot));
            event!(Level::DEBUG, table = E::TABLE, id = %id, "entity persisted");
            return Ok(());
        };

        match self.entries.get(&id) {
            Some(entry) if entry.instance.ptr_eq(instance) => match entry.state {
                EntityState::Removed => Err(DbError::InvalidState(format!(
                    "{} {} is scheduled for removal; merge it to keep it",
                    E::TABLE,
                    id
                ))),
                _ => Ok(()),
            },
            _ => Err(DbError::InvalidState(format!(
                "detached {} {} passed to persist; use merge",
                E::TABLE,
                id
            ))),
        }
    }

    /// Whether this very instance is managed by the context.
    ///
    /// Other instances carrying the same key, and removed instances, are not contained.
    pub fn contains(&self, instance: &EntityRef<E>) -> Result<bool> {
        Ok(self
            .tracked_entry(instance)?
            .is_some_and(|(_, entry)| entry.is_managed()))
    }

    /// The lifecycle state of an instance as seen by this context.
    pub fn state_of(&self, instance: &EntityRef<E>) -> Result<EntityState> {
        if let Some((_, entry)) = self.tracked_entry(instance)? {
            return Ok(entry.state);
        }
        Ok(match instance.try_id()? {
            Some(_) => EntityState::Detached,
            None => EntityState::Transient,
        })
    }

    /// Stops tracking an instance. Nothing is written, and later changes to the
    /// instance are ignored unless it is merged back.
    ///
    /// # Errors
    /// `NotManaged` if the instance is not tracked by this context.
    pub fn detach(&mut self, instance: &EntityRef<E>) -> Result<()> {
        let id = self.require_tracked(instance, "detach")?;
        self.entries.shift_remove(&id);
        self.removals.retain(|removed| *removed != id);
        event!(Level::DEBUG, table = E::TABLE, id = %id, "entity detached");
        Ok(())
    }

    /// Copies the state of `instance` into the managed instance for its key and
    /// returns that managed instance. `instance` itself is never made managed.
    ///
    /// - no key: a new managed copy is persisted
    /// - key tracked here: the tracked instance takes the new values; a pending
    ///   removal is cancelled
    /// - key stored but untracked: the row is loaded and updated on flush
    /// - key unknown: a managed copy with that key is inserted on flush
    pub fn merge(&mut self, instance: &EntityRef<E>) -> Result<EntityRef<E>> {
        let copy = instance.try_clone_entity()?;
        let Some(id) = copy.id() else {
            let managed = EntityRef::new(copy);
            self.persist(&managed)?;
            return Ok(managed);
        };

        if let Some(entry) = self.entries.get_mut(&id) {
            if !entry.instance.ptr_eq(instance) {
                entry.instance.try_replace(copy)?;
            }
            if entry.state == EntityState::Removed {
                entry.state = EntityState::Managed;
                self.removals.retain(|removed| *removed != id);
            }
            event!(Level::DEBUG, table = E::TABLE, id = %id, "entity merged into managed instance");
            return Ok(entry.instance.clone());
        }

        let managed = EntityRef::new(copy);
        let entry = match self.store.find(id)? {
            Some(row) => EntityEntry::loaded(managed.clone(), row),
            None => EntityEntry::pending(managed.clone(), managed.try_fields()?),
        };
        event!(
            Level::DEBUG,
            table = E::TABLE,
            id = %id,
            pending_insert = entry.pending_insert,
            "detached entity merged"
        );
        self.entries.insert(id, entry);
        Ok(managed)
    }

    /// Schedules a managed instance for deletion on the next flush.
    ///
    /// An instance whose insert has not been flushed yet is simply dropped from
    /// tracking. Removing an already removed instance does nothing.
    ///
    /// # Errors
    /// `NotManaged` if the instance is not tracked by this context.
    pub fn remove(&mut self, instance: &EntityRef<E>) -> Result<()> {
        let id = self.require_tracked(instance, "remove")?;
        let Some(entry) = self.entries.get_mut(&id) else {
            return Err(DbError::NotManaged(format!("{} {}", E::TABLE, id)));
        };

        if entry.state == EntityState::Removed {
            return Ok(());
        }

        if entry.pending_insert {
            self.entries.shift_remove(&id);
            event!(Level::DEBUG, table = E::TABLE, id = %id, "pending insert cancelled by remove");
            return Ok(());
        }

        entry.state = EntityState::Removed;
        self.removals.push(id);
        event!(Level::DEBUG, table = E::TABLE, id = %id, "entity removed");
        Ok(())
    }

    /// Drops every tracking entry. All instances become detached and unflushed
    /// changes are discarded.
    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.removals.clear();
        event!(Level::DEBUG, table = E::TABLE, dropped, "persistence context cleared");
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Looks up the managed instance for `id`, loading it from the store if it is
    /// not tracked yet. Removed identities are not found.
    pub fn find(&mut self, id: EntityId) -> Result<Option<EntityRef<E>>> {
        if let Some(entry) = self.entries.get(&id) {
            return Ok(entry.is_managed().then(|| entry.instance.clone()));
        }

        let Some(row) = self.store.find(id)? else {
            return Ok(None);
        };
        Ok(Some(self.register_loaded(id, row)?))
    }

    /// Every managed instance: stored rows (through the identity map) followed
    /// by instances whose insert is still pending. Flushes first in
    /// [`FlushMode::Auto`].
    pub fn find_all(&mut self) -> Result<Vec<EntityRef<E>>> {
        if self.config.flush_mode == FlushMode::Auto {
            self.flush()?;
        }

        let mut found = Vec::new();
        for (id, row) in self.store.read_all()? {
            match self.entries.get(&id) {
                Some(entry) if entry.is_managed() => found.push(entry.instance.clone()),
                Some(_) => {}
                None => found.push(self.register_loaded(id, row)?),
            }
        }

        found.extend(
            self.entries
                .values()
                .filter(|entry| entry.is_managed() && entry.pending_insert)
                .map(|entry| entry.instance.clone()),
        );
        Ok(found)
    }

    // ------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------

    /// The store writes the next flush would perform, in execution order.
    pub fn pending_changes(&self) -> Result<Vec<PendingChange>> {
        let mut inserts = Vec::new();
        let mut updates = Vec::new();

        for (id, entry) in &self.entries {
            if !entry.is_managed() {
                continue;
            }
            if entry.instance.try_id()? != Some(*id) {
                return Err(DbError::InvalidState(format!(
                    "key of managed {} {} was changed",
                    E::TABLE,
                    id
                )));
            }

            let current = entry.instance.try_fields()?;
            if entry.pending_insert {
                inserts.push(PendingChange::Insert {
                    id: *id,
                    fields: current,
                });
            } else if current != entry.snapshot {
                updates.push(PendingChange::Update {
                    id: *id,
                    old_fields: entry.snapshot.clone(),
                    new_fields: current,
                });
            }
        }

        let deletes = self
            .removals
            .iter()
            .map(|id| PendingChange::Delete { id: *id });

        Ok(inserts.into_iter().chain(updates).chain(deletes).collect())
    }

    /// Whether a flush would write anything.
    pub fn is_dirty(&self) -> Result<bool> {
        Ok(!self.pending_changes()?.is_empty())
    }

    /// Writes pending inserts, then changed managed instances, then removals.
    ///
    /// Unchanged instances are skipped, so a second flush without intervening
    /// changes writes nothing. Managed instances stay managed.
    ///
    /// # Errors
    /// Stops at the first failing store write and returns `DbError::Flush`
    /// naming it. Writes already issued by this flush are not undone.
    pub fn flush(&mut self) -> Result<FlushSummary> {
        let span = info_span!("persistence_context.flush", table = E::TABLE);
        let _enter = span.enter();

        let plan = self.pending_changes()?;
        let mut summary = FlushSummary::default();

        for change in plan {
            let id = change.id();
            let operation = change.operation();
            if let Err(err) = self.apply(change) {
                event!(
                    Level::ERROR,
                    id = %id,
                    operation = %operation,
                    error = %err,
                    "flush stopped"
                );
                return Err(DbError::flush(operation, id, err));
            }
            summary.record(operation);
        }

        if summary.is_empty() {
            event!(Level::DEBUG, "flush found nothing to write");
        } else {
            event!(
                Level::INFO,
                inserted = summary.inserted,
                updated = summary.updated,
                deleted = summary.deleted,
                "flush complete"
            );
        }
        Ok(summary)
    }

    /// Flushes and ends the unit of work.
    pub fn commit(mut self) -> Result<FlushSummary> {
        self.flush()
    }

    fn apply(&mut self, change: PendingChange) -> Result<()> {
        if let PendingChange::Update { id, .. } = &change {
            event!(
                Level::DEBUG,
                id = %id,
                columns = ?change.changed_columns(),
                "updating changed columns"
            );
        }

        match change {
            PendingChange::Insert { id, fields } => {
                self.store.insert(id, fields.clone())?;
                if let Some(entry) = self.entries.get_mut(&id) {
                    entry.snapshot = fields;
                    entry.pending_insert = false;
                }
            }
            PendingChange::Update { id, new_fields, .. } => {
                self.store.update(id, new_fields.clone())?;
                if let Some(entry) = self.entries.get_mut(&id) {
                    entry.snapshot = new_fields;
                }
            }
            PendingChange::Delete { id } => {
                self.store.delete(id)?;
                self.entries.shift_remove(&id);
                self.removals.retain(|removed| *removed != id);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// The entry tracking this very instance, if any.
    fn tracked_entry(&self, instance: &EntityRef<E>) -> Result<Option<(EntityId, &EntityEntry<E>)>> {
        let Some(id) = instance.try_id()? else {
            return Ok(None);
        };
        Ok(self
            .entries
            .get(&id)
            .filter(|entry| entry.instance.ptr_eq(instance))
            .map(|entry| (id, entry)))
    }

    fn require_tracked(&self, instance: &EntityRef<E>, operation: &str) -> Result<EntityId> {
        match self.tracked_entry(instance)? {
            Some((id, _)) => Ok(id),
            None => Err(DbError::NotManaged(format!(
                "cannot {} {} {}",
                operation,
                match instance.try_id()? {
                    Some(_) => "detached",
                    None => "transient",
                },
                E::TABLE
            ))),
        }
    }

    /// Draws keys from the store until one is not already held by a merged
    /// entry awaiting insert.
    fn next_free_id(&mut self) -> Result<EntityId> {
        loop {
            let id = self.store.next_id()?;
            if !self.entries.contains_key(&id) {
                return Ok(id);
            }
        }
    }

    fn register_loaded(&mut self, id: EntityId, row: Fields) -> Result<EntityRef<E>> {
        let instance = EntityRef::new(E::from_row(id, &row)?);
        self.entries
            .insert(id, EntityEntry::loaded(instance.clone(), row));
        Ok(instance)
    }
}
