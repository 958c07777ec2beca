//! Inbound event fan-in
//!
//! The channel callback decodes wire values and hands each batch to an
//! [`EventSink`]; nothing else runs on the transport thread.

use crate::channel::ChannelCallback;
use std::sync::Arc;
use tracing::trace;
use vhal_codec::{PropValueBuilder, WireValue};
use vhal_types::{PropertyError, PropertyValue};

#[derive(Debug, Clone, PartialEq)]
pub enum HalEvent {
    PropertyEvents(Vec<PropertyValue>),
    PropertySetErrors(Vec<PropertyError>),
}

/// Destination of decoded batches, typically the router's worker queue
pub trait EventSink: Send + Sync {
    fn post_event(&self, event: HalEvent);
}

impl<F> EventSink for F
where
    F: Fn(HalEvent) + Send + Sync,
{
    fn post_event(&self, event: HalEvent) {
        self(event)
    }
}

/// The single callback registered on the channel
pub(crate) struct SinkCallback {
    sink: Arc<dyn EventSink>,
}

impl SinkCallback {
    pub(crate) fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }
}

impl ChannelCallback for SinkCallback {
    fn on_property_events(&self, values: Vec<WireValue>) {
        if values.is_empty() {
            return;
        }
        let decoded: Vec<PropertyValue> =
            values.iter().map(PropValueBuilder::build_from_wire).collect();
        trace!("Posting {} property events", decoded.len());
        self.sink.post_event(HalEvent::PropertyEvents(decoded));
    }

    fn on_property_set_errors(&self, errors: Vec<PropertyError>) {
        if errors.is_empty() {
            return;
        }
        trace!("Posting {} set errors", errors.len());
        self.sink.post_event(HalEvent::PropertySetErrors(errors));
    }
}
