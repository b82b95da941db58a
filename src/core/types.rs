use super::{DataType, DbError, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Generated primary key of a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        EntityId(id)
    }
}

/// Column name to value. Ordered so that two snapshots compare field by field.
pub type Fields = BTreeMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            if !self.nullable {
                return Err(DbError::ConstraintViolation(format!(
                    "Column '{}' cannot be NULL",
                    self.name
                )));
            }
            return Ok(());
        }

        if !self.data_type.is_compatible(value) {
            return Err(DbError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                self.name,
                self.data_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    /// Checks a row against the declared columns. Absent nullable columns are allowed.
    pub fn validate(&self, table: &str, fields: &Fields) -> Result<()> {
        for name in fields.keys() {
            if self.get_column(name).is_none() {
                return Err(DbError::ColumnNotFound(name.clone(), table.to_string()));
            }
        }

        for column in &self.columns {
            match fields.get(&column.name) {
                Some(value) => column.validate(value)?,
                None => column.validate(&Value::Null)?,
            }
        }

        Ok(())
    }
}

/// Reads a required text column out of a stored row.
pub fn text_field(fields: &Fields, name: &str) -> Result<String> {
    let value = fields
        .get(name)
        .ok_or_else(|| DbError::ColumnNotFound(name.to_string(), "row".to_string()))?;
    match value.as_text() {
        Some(s) => Ok(s.to_string()),
        None => Err(DbError::TypeMismatch(format!(
            "Field '{}' expects TEXT, got {}",
            name,
            value.type_name()
        ))),
    }
}
