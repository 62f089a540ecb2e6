//! Schema-tolerant compiler for Unified Agenda (REGINFO) XML snapshots.
//!
//! Documents are streamed one entity at a time, flattened against a versioned
//! superset schema, and reduced to the last known state of every RIN across
//! snapshots. Records render either as flat string rows or as typed JSON.

pub mod config;
pub mod error;
pub mod flatten;
pub mod latest;
pub mod normalize;
pub mod processor;
pub mod reduce;
pub mod schema;
pub mod snapshot;
pub mod stream;
pub mod table;
pub mod tree;
pub mod types;
pub mod view;

pub use config::{Config, ConfigBuilder, ConfigFile};
pub use error::{Error, Result};
pub use flatten::{Diagnostics, Flattener};
pub use processor::{parse_document, parse_reader, stream_records, Batch, BatchProcessor};
pub use reduce::{last_per_identity, CompositeRecord, ReduceOptions};
pub use snapshot::SnapshotWindow;
pub use stream::{EntityStream, ParseMode};
pub use types::{EntityRecord, FieldKey, LatestEvent, TimetableEntry};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, ConfigBuilder, ConfigFile};
    pub use crate::error::{Error, Result};
    pub use crate::processor::{parse_document, BatchProcessor, DocumentReport, ParsedDocument};
    pub use crate::reduce::{last_per_identity, CompositeRecord, ReduceOptions};
    pub use crate::stream::ParseMode;
    pub use crate::table::{self, Table};
    pub use crate::types::EntityRecord;
    pub use crate::view::{to_row, to_structured};
    pub use futures::StreamExt;
}
