pub mod sqlite;

pub use sqlite::{SqliteStorage, StorageError, StoredAnalysis};
