//! # Vehicle Property Router
//!
//! ## Purpose
//!
//! Demultiplexes the single property channel to many feature services:
//! - `VehicleHal`: lifecycle, property ownership and event dispatch
//! - `Router`: shared get/set/subscribe entry point for services
//! - `RequestCorrelator`: request ids, one pending request per stream,
//!   timeouts and response matching
//! - `UserHalService`: the user management streams
//!
//! ## Threading
//!
//! ```text
//! transport thread ──post──> worker queue ──> dispatcher ──> service.on_hal_events
//!                                  ↑
//!             timers ──────────────┘
//! service threads ──> Router ──> HalClient (blocking, retries on caller)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use vhal_router::{UserHalService, VehicleHal};
//! # use vhal_client::VehicleChannel;
//! # fn run(channel: Arc<dyn VehicleChannel>, runtime: tokio::runtime::Handle)
//! #     -> vhal_router::RouterResult<()> {
//! let settings = vhal_config::HalSettings::default();
//! let hal = VehicleHal::new(channel, &settings, runtime)?;
//! let users = Arc::new(UserHalService::new(hal.router(), hal.worker(), &settings.user_hal));
//! hal.register_service(users.clone())?;
//! hal.initialize()?;
//! # Ok(())
//! # }
//! ```

pub mod correlator;
pub mod error;
pub mod router;
pub mod service;
pub mod user_hal;
pub mod vehicle_hal;
pub mod worker;

pub use correlator::{Completion, HalCallbackStatus, HalResponse, RequestCorrelator};
pub use error::{RouterError, RouterResult};
pub use router::{is_subscribable, PropertySetter, Router};
pub use service::HalServiceBase;
pub use user_hal::{UserHalService, CORE_PROPERTIES, USER_HAL_SERVICE};
pub use vehicle_hal::{LifecycleState, VehicleHal};
pub use worker::{worker, DelayedTask, WorkerHandle, WorkerQueue};
