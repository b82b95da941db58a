pub mod engine;
pub mod memory;
pub mod persistence;
pub mod table;

pub use engine::Store;
pub use memory::InMemoryStore;
pub use persistence::{DurabilityMode, FileStore, SnapshotManager, TableSnapshot};
pub use table::{StoreStats, Table, TableSchema};
