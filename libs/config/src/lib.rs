//! # Vehicle Property Layer Configuration
//!
//! Settings for the retrying client and the user management streams, plus
//! logging setup shared by every binary and test harness.
//!
//! ## Usage
//!
//! ```rust
//! use vhal_config::HalSettings;
//!
//! let settings = HalSettings::from_toml_str("[client]\nmax_retries = 5\n").unwrap();
//! assert_eq!(settings.client.max_retries, 5);
//! assert_eq!(settings.client.retry_sleep_ms, vhal_config::defaults::client::RETRY_SLEEP_MS);
//! ```

pub mod defaults;
pub mod logging;
pub mod settings;

pub use logging::init_logging;
pub use settings::{ClientSettings, HalSettings, LoggingSettings, UserHalSettings};
