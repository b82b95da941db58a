use crate::core::{EntityId, Fields, Result};

/// Backing medium for one entity table.
///
/// A persistence context is the only writer during a unit of work. Reads through
/// [`Store::find`] and [`Store::read_all`] observe the last flushed state and may
/// be issued by anyone holding a handle to the same table.
pub trait Store {
    /// Draw the next value of the table's identifier sequence. Not a row write.
    fn next_id(&mut self) -> Result<EntityId>;

    /// Insert a full row. Fails with `DuplicateKey` if the identity is taken.
    fn insert(&mut self, id: EntityId, fields: Fields) -> Result<()>;

    /// Replace an existing row. Fails with `NotFound` if absent.
    fn update(&mut self, id: EntityId, fields: Fields) -> Result<()>;

    /// Delete an existing row. Fails with `NotFound` if absent.
    fn delete(&mut self, id: EntityId) -> Result<()>;

    /// Read a single row by key.
    fn find(&self, id: EntityId) -> Result<Option<Fields>>;

    /// Read every row, ordered by identity.
    fn read_all(&self) -> Result<Vec<(EntityId, Fields)>>;

    fn row_count(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }
}
