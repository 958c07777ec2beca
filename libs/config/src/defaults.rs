//! Built-in defaults
//!
//! Values used when a settings file leaves a field out.

/// Retrying client defaults
pub mod client {
    /// Upper bound on retries of a transient failure
    pub const MAX_RETRIES: u32 = 40;

    /// Total time budget for one get/set including retries (milliseconds)
    pub const WAIT_CAP_MS: u64 = 2_000;

    /// Fixed sleep between retries (milliseconds)
    pub const RETRY_SLEEP_MS: u64 = 50;
}

/// User management stream defaults
pub mod user_hal {
    /// Response timeout when a caller does not pass one (milliseconds)
    pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
}

pub mod logging {
    pub const LEVEL: &str = "info";
}
