//! Retrying property client
//!
//! Wraps a [`VehicleChannel`] with bounded retry of transient failures and
//! typed outcomes. Calls block the caller's thread, retry sleeps included.

use crate::channel::{ChannelError, ChannelResult, SubscribeOptions, VehicleChannel};
use crate::error::{ClientError, ClientResult};
use crate::event::{EventSink, SinkCallback};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use vhal_codec::PropValueBuilder;
use vhal_config::ClientSettings;
use vhal_types::{Hex, PropertyConfig, PropertyValue};

/// Fixed-interval retry budget for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub wait_cap: Duration,
    pub retry_sleep: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ClientSettings::default())
    }
}

impl From<&ClientSettings> for RetryPolicy {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            wait_cap: settings.wait_cap(),
            retry_sleep: settings.retry_sleep(),
        }
    }
}

pub struct HalClient {
    channel: Arc<dyn VehicleChannel>,
    builder: PropValueBuilder,
    policy: RetryPolicy,
}

impl HalClient {
    /// Register the single event callback on `channel`, forwarding every
    /// decoded batch to `sink`.
    pub fn new(
        channel: Arc<dyn VehicleChannel>,
        sink: Arc<dyn EventSink>,
        policy: RetryPolicy,
    ) -> ClientResult<Self> {
        channel
            .register_callback(Arc::new(SinkCallback::new(sink)))
            .map_err(ClientError::Registration)?;
        let builder = PropValueBuilder::new(channel.wire_format());
        info!(format = ?builder.format(), "Vehicle channel callback registered");
        Ok(Self {
            channel,
            builder,
            policy,
        })
    }

    /// Builder bound to the channel's wire format
    pub fn builder(&self) -> PropValueBuilder {
        self.builder
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch every property config once; a channel with none yields empty
    pub fn get_all_prop_configs(&self) -> ClientResult<Vec<PropertyConfig>> {
        self.invoke_retriable(0, 0, self.policy.max_retries, || self.channel.get_all_prop_configs())
            .map(Option::unwrap_or_default)
    }

    pub fn get_value(&self, request: &PropertyValue) -> ClientResult<PropertyValue> {
        self.get_value_with_retries(request, self.policy.max_retries)
    }

    /// Get with an explicit retry count; the wait cap still applies
    pub fn get_value_with_retries(
        &self,
        request: &PropertyValue,
        max_retries: u32,
    ) -> ClientResult<PropertyValue> {
        let (property_id, area_id) = (request.property_id(), request.area_id());
        let wire = self.builder.to_wire(request);
        let result =
            self.invoke_retriable(property_id, area_id, max_retries, || self.channel.get(&wire))?;
        match result {
            Some(wire) => Ok(PropValueBuilder::build_from_wire(&wire)),
            None => Err(ClientError::not_available(property_id, area_id)),
        }
    }

    pub fn set_value(&self, value: &PropertyValue) -> ClientResult<()> {
        let wire = self.builder.to_wire(value);
        self.invoke_retriable(value.property_id(), value.area_id(), self.policy.max_retries, || {
            self.channel.set(&wire)
        })
    }

    /// Not retried; the router decides what a failure means
    pub fn subscribe(&self, options: &[SubscribeOptions]) -> ChannelResult<()> {
        self.channel.subscribe(options)
    }

    pub fn unsubscribe(&self, property_id: i32) -> ChannelResult<()> {
        self.channel.unsubscribe(property_id)
    }

    fn invoke_retriable<T>(
        &self,
        property_id: i32,
        area_id: i32,
        max_retries: u32,
        mut call: impl FnMut() -> ChannelResult<T>,
    ) -> ClientResult<T> {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match call() {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(
                            "Property {} area {} succeeded on attempt {}",
                            Hex(property_id),
                            Hex(area_id),
                            attempts
                        );
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() => {
                    let retries_used = attempts - 1;
                    let next_wake = started.elapsed() + self.policy.retry_sleep;
                    let over_cap = next_wake > self.policy.wait_cap;
                    if retries_used >= max_retries || over_cap {
                        warn!(
                            "Property {} area {} still failing after {} attempts: {}",
                            Hex(property_id),
                            Hex(area_id),
                            attempts,
                            e
                        );
                        return Err(ClientError::service_unavailable(
                            property_id,
                            area_id,
                            attempts,
                            e,
                        ));
                    }
                    debug!(
                        "Property {} area {} attempt {} failed: {}, retrying in {:?}",
                        Hex(property_id),
                        Hex(area_id),
                        attempts,
                        e,
                        self.policy.retry_sleep
                    );
                    thread::sleep(self.policy.retry_sleep);
                }
                Err(ChannelError::Status(status)) => {
                    return Err(ClientError::from_status(status, property_id, area_id));
                }
                Err(e @ ChannelError::Transport(_)) => {
                    // Transport failures are always transient; unreachable in practice
                    return Err(ClientError::service_unavailable(property_id, area_id, attempts, e));
                }
            }
        }
    }
}

impl std::fmt::Debug for HalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HalClient")
            .field("format", &self.builder.format())
            .field("policy", &self.policy)
            .finish()
    }
}
