//! Default configuration values shared across facture crates.

/// Base polling interval when running in poll mode (seconds).
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Consecutive empty poll cycles before the interval is increased.
pub const EMPTY_POLL_STREAK: u32 = 6;

/// Multiplier applied to the poll interval after an empty streak.
pub const POLL_BACKOFF_FACTOR: f64 = 1.5;

/// Maximum poll interval as a multiple of the base interval.
pub const POLL_MAX_MULTIPLIER: f64 = 4.0;

/// Short delay after a busy drain before re-checking the queue (milliseconds).
pub const BUSY_RECHECK_DELAY_MS: u64 = 500;

/// Idle ticks between heartbeat drains in push mode. The push channel is
/// best-effort, so periodic reconciliation is mandatory for correctness.
pub const HEARTBEAT_IDLE_TICKS: u32 = 30;

/// Cooldown before the notification loop rebuilds connections after a
/// top-level failure (seconds).
pub const RECONNECT_COOLDOWN_SECS: u64 = 5;

/// Postgres NOTIFY channel carrying invoice insert events.
pub const NOTIFY_CHANNEL: &str = "invoice_inserted";

/// Capacity of the buffered event-subscription channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
