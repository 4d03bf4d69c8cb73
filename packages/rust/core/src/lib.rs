//! Audit engine for footprint.
//!
//! Ties fetching, oracle calls, and profile merging into one audit run
//! (see [`Auditor`]), and writes the final report.

pub mod frontier;
pub mod merge;
pub mod oracle;
pub mod orchestrator;
pub mod report;
pub mod retry;

pub use frontier::Frontier;
pub use merge::{MergeStats, fragment_from_value, merge_profile, merge_value, normalize_key};
pub use oracle::{Decision, OpenRouterOracle, Oracle, PageAction};
pub use orchestrator::{
    AuditOutcome, AuditProgress, Auditor, SilentProgress, StopReason, run_audit,
};
pub use report::{DEFAULT_PREFIX, ReportKind, report_value, write_report};
pub use retry::RetryConfig;
