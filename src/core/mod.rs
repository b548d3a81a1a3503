mod error;
mod record;
mod types;

pub use error::{DbError, Result};
pub use record::{JsonMap, Record, RecordId, METADATA_ID};
pub use types::{IndexSpec, Namespace, Projection, Selector, SortKey, SortOrder, SortSpec};
