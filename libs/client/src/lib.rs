//! # Vehicle Property Client
//!
//! ## Purpose
//!
//! Low-level access to the single property channel:
//! - The channel contract (`VehicleChannel`, `ChannelCallback`)
//! - `HalClient`: get/set with bounded retry of transient failures
//! - Event fan-in: the one channel callback decodes batches and posts them
//!   to an `EventSink`
//!
//! ## Error Mapping
//!
//! | Channel outcome              | Client outcome        |
//! |------------------------------|-----------------------|
//! | TRY_AGAIN / transport, past budget | `ServiceUnavailable` |
//! | INVALID_ARG (never retried)  | `IllegalArgument`     |
//! | NOT_AVAILABLE or empty get   | `NotAvailable`        |
//! | ACCESS_DENIED                | `AccessDenied`        |
//! | anything else                | `Internal`            |

pub mod channel;
pub mod client;
pub mod error;
pub mod event;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use channel::{ChannelCallback, ChannelError, ChannelResult, SubscribeOptions, VehicleChannel};
pub use client::{HalClient, RetryPolicy};
pub use error::{ClientError, ClientResult};
pub use event::{EventSink, HalEvent};
