//! Contract of the underlying property channel
//!
//! The channel is a blocking request/response transport plus one inbound
//! callback for change events. Implementations speak exactly one
//! [`WireFormat`].

use std::sync::Arc;
use thiserror::Error;
use vhal_codec::{WireFormat, WireValue};
use vhal_types::{PropertyConfig, PropertyError, StatusCode};

/// Failure reported by a channel call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChannelError {
    /// The channel answered with a non-OK status code
    #[error("Channel status {0:?}")]
    Status(StatusCode),

    /// The transport itself failed (dead peer, broken pipe)
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl ChannelError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Transient failures are worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChannelError::Status(StatusCode::TryAgain) | ChannelError::Transport(_)
        )
    }
}

pub type ChannelResult<T> = std::result::Result<T, ChannelError>;

/// One entry of a subscribe request
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeOptions {
    pub property_id: i32,
    /// Empty means every area of the property
    pub area_ids: Vec<i32>,
    pub sample_rate: f32,
}

impl SubscribeOptions {
    pub fn new(property_id: i32, sample_rate: f32) -> Self {
        Self {
            property_id,
            area_ids: Vec::new(),
            sample_rate,
        }
    }
}

/// Receives change events and asynchronous set failures from the channel.
/// Called on a transport thread.
pub trait ChannelCallback: Send + Sync {
    fn on_property_events(&self, values: Vec<WireValue>);

    fn on_property_set_errors(&self, errors: Vec<PropertyError>);
}

pub trait VehicleChannel: Send + Sync {
    fn wire_format(&self) -> WireFormat;

    /// Every property the vehicle exposes; `None` when it exposes none
    fn get_all_prop_configs(&self) -> ChannelResult<Option<Vec<PropertyConfig>>>;

    /// `Ok(None)` is a successful call that produced no value
    fn get(&self, request: &WireValue) -> ChannelResult<Option<WireValue>>;

    fn set(&self, value: &WireValue) -> ChannelResult<()>;

    fn subscribe(&self, options: &[SubscribeOptions]) -> ChannelResult<()>;

    fn unsubscribe(&self, property_id: i32) -> ChannelResult<()>;

    fn register_callback(&self, callback: Arc<dyn ChannelCallback>) -> ChannelResult<()>;
}
