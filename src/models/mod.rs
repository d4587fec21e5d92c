//! Core data models for normalized search records and search criteria.

mod record;
mod search;

pub use record::{IndexRecord, PreprintRecord, SourceKind};
pub use search::{fetch_size, SearchCriteria, SearchMode, FETCH_FLOOR, FETCH_MULTIPLIER};
