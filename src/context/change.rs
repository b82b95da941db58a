// ============================================================================
// Pending Changes
// ============================================================================
//
// A flush is planned as a list of store writes before any of them runs:
// inserts first, then updates, then deletes. The plan is also what
// `PersistenceContext::pending_changes` exposes for inspection.
//
// ============================================================================

use crate::core::{EntityId, Fields, FlushOperation};

/// One store write a flush would perform.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingChange {
    /// Write a full row for an identity that has never been stored.
    Insert { id: EntityId, fields: Fields },

    /// Rewrite a row whose managed instance no longer matches its snapshot.
    Update {
        id: EntityId,
        old_fields: Fields,
        new_fields: Fields,
    },

    /// Delete the row of a removed instance.
    Delete { id: EntityId },
}

impl PendingChange {
    pub fn id(&self) -> EntityId {
        match self {
            PendingChange::Insert { id, .. } => *id,
            PendingChange::Update { id, .. } => *id,
            PendingChange::Delete { id } => *id,
        }
    }

    pub fn operation(&self) -> FlushOperation {
        match self {
            PendingChange::Insert { .. } => FlushOperation::Insert,
            PendingChange::Update { .. } => FlushOperation::Update,
            PendingChange::Delete { .. } => FlushOperation::Delete,
        }
    }

    /// Names of the columns whose values differ. Empty for inserts and deletes.
    pub fn changed_columns(&self) -> Vec<&str> {
        match self {
            PendingChange::Update {
                old_fields,
                new_fields,
                ..
            } => new_fields
                .iter()
                .filter(|(name, value)| old_fields.get(*name) != Some(*value))
                .map(|(name, _)| name.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Store writes performed by one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl FlushSummary {
    pub fn record(&mut self, operation: FlushOperation) {
        match operation {
            FlushOperation::Insert => self.inserted += 1,
            FlushOperation::Update => self.updated += 1,
            FlushOperation::Delete => self.deleted += 1,
        }
    }

    pub fn writes(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.writes() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    fn fields(first: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert("first_name".into(), Value::from(first));
        fields.insert("last_name".into(), Value::from("same"));
        fields
    }

    #[test]
    fn test_change_classification() {
        let insert = PendingChange::Insert {
            id: EntityId(1),
            fields: fields("a"),
        };
        assert_eq!(insert.operation(), FlushOperation::Insert);
        assert_eq!(insert.id(), EntityId(1));

        let delete = PendingChange::Delete { id: EntityId(2) };
        assert_eq!(delete.operation(), FlushOperation::Delete);
        assert!(delete.changed_columns().is_empty());
    }

    #[test]
    fn test_update_reports_changed_columns() {
        let update = PendingChange::Update {
            id: EntityId(1),
            old_fields: fields("a"),
            new_fields: fields("b"),
        };
        assert_eq!(update.changed_columns(), vec!["first_name"]);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = FlushSummary::default();
        assert!(summary.is_empty());
        summary.record(FlushOperation::Insert);
        summary.record(FlushOperation::Delete);
        assert_eq!(summary.writes(), 2);
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.deleted, 1);
    }
}
