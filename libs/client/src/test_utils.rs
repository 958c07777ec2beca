//! Scriptable in-memory channel for tests

use crate::channel::{
    ChannelCallback, ChannelError, ChannelResult, SubscribeOptions, VehicleChannel,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use vhal_codec::{PropValueBuilder, WireFormat, WireValue};
use vhal_types::{PropertyConfig, PropertyError, PropertyValue};

/// Produces the events a set should trigger, if any
pub type SetResponder = Arc<dyn Fn(&PropertyValue) -> Vec<PropertyValue> + Send + Sync>;

/// A channel that records calls and plays back scripted results.
///
/// Gets pop the scripted queue first and fall back to the last value set
/// for the same property and area. Sets succeed unless a failure was
/// scripted.
pub struct MockChannel {
    builder: PropValueBuilder,
    configs: Mutex<Option<Vec<PropertyConfig>>>,
    values: Mutex<HashMap<(i32, i32), PropertyValue>>,
    get_script: Mutex<VecDeque<ChannelResult<Option<PropertyValue>>>>,
    set_script: Mutex<VecDeque<ChannelResult<()>>>,
    set_calls: Mutex<Vec<PropertyValue>>,
    get_calls: AtomicUsize,
    subscriptions: Mutex<HashMap<i32, SubscribeOptions>>,
    subscribe_error: Mutex<Option<ChannelError>>,
    unsubscribe_error: Mutex<Option<ChannelError>>,
    callback: Mutex<Option<Arc<dyn ChannelCallback>>>,
    register_calls: AtomicUsize,
    responder: Mutex<Option<(Duration, SetResponder)>>,
}

impl MockChannel {
    pub fn new(format: WireFormat) -> Self {
        Self {
            builder: PropValueBuilder::new(format),
            configs: Mutex::new(None),
            values: Mutex::new(HashMap::new()),
            get_script: Mutex::new(VecDeque::new()),
            set_script: Mutex::new(VecDeque::new()),
            set_calls: Mutex::new(Vec::new()),
            get_calls: AtomicUsize::new(0),
            subscriptions: Mutex::new(HashMap::new()),
            subscribe_error: Mutex::new(None),
            unsubscribe_error: Mutex::new(None),
            callback: Mutex::new(None),
            register_calls: AtomicUsize::new(0),
            responder: Mutex::new(None),
        }
    }

    pub fn with_configs(self, configs: Vec<PropertyConfig>) -> Self {
        *self.configs.lock() = Some(configs);
        self
    }

    pub fn builder(&self) -> PropValueBuilder {
        self.builder
    }

    pub fn put_value(&self, value: PropertyValue) {
        self.values
            .lock()
            .insert((value.property_id(), value.area_id()), value);
    }

    /// Queue the result of the next get
    pub fn script_get(&self, result: ChannelResult<Option<PropertyValue>>) {
        self.get_script.lock().push_back(result);
    }

    /// Queue the result of the next set
    pub fn script_set(&self, result: ChannelResult<()>) {
        self.set_script.lock().push_back(result);
    }

    pub fn fail_subscribe(&self, error: ChannelError) {
        *self.subscribe_error.lock() = Some(error);
    }

    pub fn fail_unsubscribe(&self, error: ChannelError) {
        *self.unsubscribe_error.lock() = Some(error);
    }

    /// After every successful set, deliver `responder`'s events from a
    /// separate thread once `delay` has passed
    pub fn respond_to_sets(&self, delay: Duration, responder: SetResponder) {
        *self.responder.lock() = Some((delay, responder));
    }

    pub fn set_calls(&self) -> Vec<PropertyValue> {
        self.set_calls.lock().clone()
    }

    pub fn set_call_count(&self) -> usize {
        self.set_calls.lock().len()
    }

    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn register_call_count(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn subscription(&self, property_id: i32) -> Option<SubscribeOptions> {
        self.subscriptions.lock().get(&property_id).cloned()
    }

    pub fn is_subscribed(&self, property_id: i32) -> bool {
        self.subscriptions.lock().contains_key(&property_id)
    }

    /// Deliver change events through the registered callback
    pub fn fire_events(&self, values: Vec<PropertyValue>) {
        let wires = values.iter().map(|v| self.builder.to_wire(v)).collect();
        if let Some(callback) = self.callback.lock().clone() {
            callback.on_property_events(wires);
        }
    }

    pub fn fire_set_errors(&self, errors: Vec<PropertyError>) {
        if let Some(callback) = self.callback.lock().clone() {
            callback.on_property_set_errors(errors);
        }
    }
}

impl VehicleChannel for MockChannel {
    fn wire_format(&self) -> WireFormat {
        self.builder.format()
    }

    fn get_all_prop_configs(&self) -> ChannelResult<Option<Vec<PropertyConfig>>> {
        Ok(self.configs.lock().clone())
    }

    fn get(&self, request: &WireValue) -> ChannelResult<Option<WireValue>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.get_script.lock().pop_front() {
            return result.map(|value| value.map(|v| self.builder.to_wire(&v)));
        }
        let key = (request.property_id(), request.area_id());
        Ok(self.values.lock().get(&key).map(|v| self.builder.to_wire(v)))
    }

    fn set(&self, value: &WireValue) -> ChannelResult<()> {
        let value = PropValueBuilder::build_from_wire(value);
        self.set_calls.lock().push(value.clone());
        if let Some(result) = self.set_script.lock().pop_front() {
            result?;
        }
        self.put_value(value.clone());

        let responder = self.responder.lock().clone();
        let callback = self.callback.lock().clone();
        if let (Some((delay, responder)), Some(callback)) = (responder, callback) {
            let events = responder(&value);
            if !events.is_empty() {
                let wires: Vec<WireValue> =
                    events.iter().map(|v| self.builder.to_wire(v)).collect();
                thread::spawn(move || {
                    thread::sleep(delay);
                    callback.on_property_events(wires);
                });
            }
        }
        Ok(())
    }

    fn subscribe(&self, options: &[SubscribeOptions]) -> ChannelResult<()> {
        if let Some(error) = self.subscribe_error.lock().clone() {
            return Err(error);
        }
        let mut subscriptions = self.subscriptions.lock();
        for option in options {
            subscriptions.insert(option.property_id, option.clone());
        }
        Ok(())
    }

    fn unsubscribe(&self, property_id: i32) -> ChannelResult<()> {
        if let Some(error) = self.unsubscribe_error.lock().clone() {
            return Err(error);
        }
        self.subscriptions.lock().remove(&property_id);
        Ok(())
    }

    fn register_callback(&self, callback: Arc<dyn ChannelCallback>) -> ChannelResult<()> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        *self.callback.lock() = Some(callback);
        Ok(())
    }
}
