//! # QMS Query
//!
//! Query execution for the QMS assistant.
//!
//! Every query runs through an ordered fallback chain of tiers:
//!
//! 1. **Database**: rendered rule SQL against MySQL, with bound parameters
//!    and a per-query timeout
//! 2. **Memory**: the last dataset pushed through `sync`, filtered by the
//!    extracted parameters
//! 3. **Mock**: deterministic synthetic rows
//!
//! The first tier that answers wins and its name is carried on the result.
//! The [`ResponseFormatter`] then turns rows into a summary with grouped
//! breakdowns, a preview and insights.

pub mod chain;
pub mod database;
pub mod error;
pub mod executor;
pub mod fields;
pub mod filter;
pub mod formatter;
pub mod memory;
pub mod mock;
pub mod snapshot;
pub mod tier;

pub use chain::{FallbackChain, QueryResult};
pub use database::{bind_placeholders, ensure_read_only, BoundStatement, DatabaseTier};
pub use error::{QueryError, Result, TierFailure};
pub use executor::QueryExecutor;
pub use filter::RowFilter;
pub use formatter::{
    Breakdown, FormatContext, FormattedResponse, GroupEntry, Insight, InsightLevel,
    ResponseFormatter, StructuredResult, DEFAULT_PREVIEW_ROWS,
};
pub use memory::MemoryTier;
pub use mock::MockTier;
pub use snapshot::{Collection, DatasetSnapshot, SnapshotCounts, SnapshotStore, SyncPayload};
pub use tier::{QueryAttempt, QueryRequest};
