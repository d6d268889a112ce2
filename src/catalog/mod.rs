// Catalog module: taxonomy ingestion, the category index and the validator on top of it.

pub mod taxonomy;
pub mod index;
pub mod validator;

pub use index::{CategoryIndex, IndexStats, SmartSearchResult};
pub use taxonomy::{Category, CategoryKind, Level, RawCategoryNode, TaxonomyError};
pub use validator::{CategoryValidator, ValidationResult};
