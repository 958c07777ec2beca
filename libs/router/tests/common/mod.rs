//! Shared fixtures for router integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use vhal_client::test_utils::MockChannel;
use vhal_codec::WireFormat;
use vhal_config::HalSettings;
use vhal_router::{HalServiceBase, Router, VehicleHal};
use vhal_types::{ChangeMode, PropertyAccess, PropertyConfig, PropertyError, PropertyValue};

pub fn fast_settings() -> HalSettings {
    let mut settings = HalSettings::default();
    settings.client.max_retries = 2;
    settings.client.wait_cap_ms = 200;
    settings.client.retry_sleep_ms = 1;
    settings
}

pub fn on_change(property_id: i32) -> PropertyConfig {
    PropertyConfig::new(property_id, PropertyAccess::ReadWrite, ChangeMode::OnChange)
}

pub fn channel_with(format: WireFormat, configs: Vec<PropertyConfig>) -> Arc<MockChannel> {
    Arc::new(MockChannel::new(format).with_configs(configs))
}

pub fn hal_for(channel: &Arc<MockChannel>) -> VehicleHal {
    let settings = fast_settings();
    vhal_config::init_logging(&settings.logging);
    VehicleHal::new(channel.clone(), &settings, Handle::current()).unwrap()
}

/// Poll `condition` until it holds or `limit` passes
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < limit {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

pub async fn within<T>(limit: Duration, future: impl Future<Output = T>) -> T {
    tokio::time::timeout(limit, future).await.expect("timed out")
}

/// A feature service that records everything it is told
pub struct RecordingService {
    name: String,
    ids: Vec<i32>,
    journal: Arc<Mutex<Vec<String>>>,
    pub router: Option<Arc<Router>>,
    pub subscribe_on_init: bool,
    pub taken: Mutex<Vec<i32>>,
    pub events: Mutex<Vec<PropertyValue>>,
    pub errors: Mutex<Vec<PropertyError>>,
}

impl RecordingService {
    pub fn new(name: &str, ids: Vec<i32>, journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            ids,
            journal,
            router: None,
            subscribe_on_init: false,
            taken: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribing(mut self, router: Arc<Router>) -> Self {
        self.router = Some(router);
        self.subscribe_on_init = true;
        self
    }

    pub fn taken(&self) -> Vec<i32> {
        let mut taken = self.taken.lock().clone();
        taken.sort_unstable();
        taken
    }
}

impl HalServiceBase for RecordingService {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_property_ids(&self) -> Vec<i32> {
        self.ids.clone()
    }

    fn take_properties(&self, properties: &[PropertyConfig]) {
        self.journal.lock().push(format!("{}:take", self.name));
        self.taken
            .lock()
            .extend(properties.iter().map(|c| c.property_id));
    }

    fn init(&self) {
        self.journal.lock().push(format!("{}:init", self.name));
        if let (true, Some(router)) = (self.subscribe_on_init, &self.router) {
            for property_id in self.taken.lock().iter() {
                router.subscribe(&self.name, *property_id, 0.0).unwrap();
            }
        }
    }

    fn release(&self) {
        self.journal.lock().push(format!("{}:release", self.name));
    }

    fn on_hal_events(&self, values: &[PropertyValue]) {
        self.events.lock().extend_from_slice(values);
    }

    fn on_property_set_error(&self, errors: &[PropertyError]) {
        self.errors.lock().extend_from_slice(errors);
    }
}
