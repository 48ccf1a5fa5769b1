//! Append-only record of vault management operations.
//!
//! Every command run (status check, analysis, backup, tree regeneration,
//! watch start/stop) is recorded exactly once, in two views that are kept
//! consistent in the same append: a bounded JSON list (the structured
//! store, re-read on startup to seed statistics) and a rendered Markdown
//! history document for humans.
//!
//! Logging failures are reported to the caller as [`LogError`] but must
//! never roll back or mask the operation being logged - callers downgrade
//! them to warnings.

mod record;
mod store;

pub use record::{
    ActivityRecord, AnalyzeResult, BackupResult, OperationSummary, StatusResult, TreeResult,
    WatchResult,
};
pub use store::{ActivityLog, LogError, LogStats};
