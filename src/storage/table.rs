use crate::core::{Column, DbError, EntityId, Fields, Result, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Write counters kept per table. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl StoreStats {
    pub fn writes(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    schema: TableSchema,
    rows: BTreeMap<EntityId, Fields>,
    next_id: u64,
    #[serde(skip)]
    stats: StoreStats,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_id: 1,
            stats: StoreStats::default(),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, id: EntityId, fields: Fields) -> Result<()> {
        self.validate_row(&fields)?;
        if self.rows.contains_key(&id) {
            return Err(DbError::DuplicateKey(id));
        }

        // Explicit keys (merged detached rows) must not be handed out again.
        if id.0 >= self.next_id {
            self.next_id = id.0 + 1;
        }

        self.rows.insert(id, fields);
        self.stats.inserts += 1;
        Ok(())
    }

    pub fn update(&mut self, id: EntityId, fields: Fields) -> Result<()> {
        self.validate_row(&fields)?;
        let row = self.rows.get_mut(&id).ok_or(DbError::NotFound(id))?;
        *row = fields;
        self.stats.updates += 1;
        Ok(())
    }

    pub fn delete(&mut self, id: EntityId) -> Result<()> {
        self.rows.remove(&id).ok_or(DbError::NotFound(id))?;
        self.stats.deletes += 1;
        Ok(())
    }

    pub fn get(&self, id: EntityId) -> Option<&Fields> {
        self.rows.get(&id)
    }

    pub fn scan(&self) -> Vec<(EntityId, Fields)> {
        self.rows
            .iter()
            .map(|(id, fields)| (*id, fields.clone()))
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    fn validate_row(&self, fields: &Fields) -> Result<()> {
        self.schema.schema().validate(self.schema.name(), fields)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    schema: Schema,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            schema: Schema::new(columns),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}
