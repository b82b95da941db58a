use super::{Store, StoreStats, Table, TableSchema};
use crate::core::{EntityId, Fields, Result};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to an in-memory table.
///
/// Clones point at the same rows, so one clone can be handed to a
/// persistence context while another reads the table directly to observe
/// exactly what has been flushed.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    table: Rc<RefCell<Table>>,
}

impl InMemoryStore {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            table: Rc::new(RefCell::new(Table::new(schema))),
        }
    }

    pub fn table_name(&self) -> String {
        self.table.borrow().name().to_string()
    }

    /// Write counters accumulated since the table was created.
    pub fn stats(&self) -> StoreStats {
        self.table.borrow().stats()
    }

    /// Whether two handles share the same table.
    pub fn same_table(&self, other: &InMemoryStore) -> bool {
        Rc::ptr_eq(&self.table, &other.table)
    }
}

impl Store for InMemoryStore {
    fn next_id(&mut self) -> Result<EntityId> {
        Ok(self.table.try_borrow_mut()?.next_id())
    }

    fn insert(&mut self, id: EntityId, fields: Fields) -> Result<()> {
        self.table.try_borrow_mut()?.insert(id, fields)
    }

    fn update(&mut self, id: EntityId, fields: Fields) -> Result<()> {
        self.table.try_borrow_mut()?.update(id, fields)
    }

    fn delete(&mut self, id: EntityId) -> Result<()> {
        self.table.try_borrow_mut()?.delete(id)
    }

    fn find(&self, id: EntityId) -> Result<Option<Fields>> {
        Ok(self.table.try_borrow()?.get(id).cloned())
    }

    fn read_all(&self) -> Result<Vec<(EntityId, Fields)>> {
        Ok(self.table.try_borrow()?.scan())
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.table.try_borrow()?.row_count())
    }
}
