pub mod error;
pub mod types;
pub mod value;

pub use error::{DbError, FlushOperation, Result};
pub use types::{Column, EntityId, Fields, Schema, text_field};
pub use value::{DataType, Value};
