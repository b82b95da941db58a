use super::Entity;
use crate::core::{Column, DataType, EntityId, Fields, Result, Value, text_field};
use serde::{Deserialize, Serialize};

pub const FIRST_NAME: &str = "first_name";
pub const LAST_NAME: &str = "last_name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: Option<EntityId>,
    first_name: String,
    last_name: String,
}

impl Customer {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// A customer carrying a key, e.g. one read straight from a store.
    pub fn with_id(
        id: EntityId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn update_name(&mut self, first_name: impl Into<String>, last_name: impl Into<String>) {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
    }
}

impl Entity for Customer {
    const TABLE: &'static str = "customer";

    fn columns() -> Vec<Column> {
        vec![
            Column::new(FIRST_NAME, DataType::Text),
            Column::new(LAST_NAME, DataType::Text),
        ]
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(FIRST_NAME.to_string(), Value::from(self.first_name.as_str()));
        fields.insert(LAST_NAME.to_string(), Value::from(self.last_name.as_str()));
        fields
    }

    fn from_row(id: EntityId, fields: &Fields) -> Result<Self> {
        Ok(Self::with_id(
            id,
            text_field(fields, FIRST_NAME)?,
            text_field(fields, LAST_NAME)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_name() {
        let mut customer = Customer::new("first name", "last name");
        customer.update_name("new first name", "new last name");
        assert_eq!(customer.first_name(), "new first name");
        assert_eq!(customer.last_name(), "new last name");
        assert_eq!(customer.id(), None);
    }

    #[test]
    fn test_row_conversion_keeps_key_and_names() {
        let customer = Customer::with_id(EntityId(3), "Ada", "Lovelace");
        let fields = customer.to_fields();
        assert_eq!(fields[FIRST_NAME], Value::from("Ada"));

        let loaded = Customer::from_row(EntityId(3), &fields).unwrap();
        assert_eq!(loaded, customer);
    }

    #[test]
    fn test_schema_accepts_own_fields() {
        let schema = Customer::table_schema();
        assert_eq!(schema.name(), "customer");
        assert!(
            schema
                .schema()
                .validate(schema.name(), &Customer::new("a", "b").to_fields())
                .is_ok()
        );
    }
}
