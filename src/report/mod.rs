//! Report assembly
//!
//! Turns a sealed [`ReconciliationRun`](crate::reconcile::ReconciliationRun)
//! into a [`RunSummary`] and hands it to [`ReportSink`]s. No message
//! formatting or storage happens here.

pub mod audit;
pub mod sink;
pub mod summary;

pub use audit::AuditRecord;
pub use sink::{MemorySink, ReportSink, TracingSink};
pub use summary::{ActionCounts, ChannelOutcome, RunStatus, RunSummary};
