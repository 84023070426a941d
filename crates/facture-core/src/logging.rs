//! Structured logging field name constants for facture.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), job completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (tokens, candidates) |

/// Subsystem originating the log event.
/// Values: "worker", "db", "match", "extract"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "queue", "engine", "notify_loop"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "claim", "drain", "extract", "persist_match_stage"
pub const OPERATION: &str = "op";

/// Invoice UUID being processed.
pub const INVOICE_ID: &str = "invoice_id";

/// Line item UUID being scored or matched.
pub const LINE_ITEM_ID: &str = "line_item_id";

/// Vendor template identifier detected for a document.
pub const TEMPLATE: &str = "template";

/// Active processing mode ("realtime", "listen", "poll").
pub const MODE: &str = "mode";

/// Number of line items extracted or persisted.
pub const ITEM_COUNT: &str = "item_count";

/// Number of review candidates produced by the match engine.
pub const CANDIDATE_COUNT: &str = "candidate_count";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
