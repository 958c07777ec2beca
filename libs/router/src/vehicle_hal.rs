//! Router lifecycle and event dispatch
//!
//! [`VehicleHal`] owns the worker, the shared [`Router`] and the registered
//! feature services. `initialize` partitions the vehicle's properties among
//! the services; afterwards every inbound batch is grouped by owner on the
//! worker and handed to each owning service in registration order.

use crate::error::{RouterError, RouterResult};
use crate::router::Router;
use crate::service::HalServiceBase;
use crate::worker::{worker, WorkerHandle, WorkerQueue};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, trace, warn};
use vhal_client::{HalClient, HalEvent, RetryPolicy, VehicleChannel};
use vhal_codec::{PayloadValidator, SchemaTable};
use vhal_config::HalSettings;
use vhal_types::property_ids::{INVALID, SUPPORT_CUSTOMIZE_VENDOR_PERMISSION};
use vhal_types::{Hex, PropertyConfig, PropertyError, PropertyValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Released,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Released => "released",
        }
    }
}

pub struct VehicleHal {
    router: Arc<Router>,
    worker: WorkerHandle,
    queue: Mutex<Option<WorkerQueue>>,
    services: RwLock<Vec<Arc<dyn HalServiceBase>>>,
    state: Mutex<LifecycleState>,
    released: Arc<AtomicBool>,
}

impl VehicleHal {
    /// Register the channel callback and prepare the worker; timers and the
    /// worker loop run on `runtime`
    pub fn new(
        channel: Arc<dyn VehicleChannel>,
        settings: &HalSettings,
        runtime: Handle,
    ) -> RouterResult<Self> {
        let (worker, queue) = worker(runtime);
        let policy = RetryPolicy::from(&settings.client);
        let client = HalClient::new(channel, Arc::new(worker.clone()), policy)?;
        Ok(Self {
            router: Arc::new(Router::new(client)),
            worker,
            queue: Mutex::new(Some(queue)),
            services: RwLock::new(Vec::new()),
            state: Mutex::new(LifecycleState::Uninitialized),
            released: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn router(&self) -> Arc<Router> {
        self.router.clone()
    }

    pub fn worker(&self) -> WorkerHandle {
        self.worker.clone()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    /// Services must be registered before `initialize`
    pub fn register_service(&self, service: Arc<dyn HalServiceBase>) -> RouterResult<()> {
        let state = self.state.lock();
        if *state != LifecycleState::Uninitialized {
            return Err(RouterError::invalid_state("register_service", state.as_str()));
        }
        debug!("Registering service '{}'", service.name());
        self.services.write().push(service);
        Ok(())
    }

    pub fn initialize(&self) -> RouterResult<()> {
        let mut state = self.state.lock();
        if *state != LifecycleState::Uninitialized {
            return Err(RouterError::invalid_state("initialize", state.as_str()));
        }

        let configs = self.router.client().get_all_prop_configs()?;
        let schemas = SchemaTable::compile(&configs)?;

        let mut validator = PayloadValidator::new();
        validator.register_configs(&configs);
        if let Some(config) = configs
            .iter()
            .find(|c| c.property_id == SUPPORT_CUSTOMIZE_VENDOR_PERMISSION)
        {
            if let Err(e) = validator.customize_vendor_permission(&config.config_array) {
                warn!("Vendor permission customization rejected: {}", e);
            }
        }

        let services = self.services.read().clone();
        let by_id: HashMap<i32, PropertyConfig> =
            configs.into_iter().map(|c| (c.property_id, c)).collect();
        let (owners, taken) = partition(&services, &by_id)?;
        for property_id in by_id.keys().filter(|id| !owners.contains_key(id)) {
            debug!("Property {} has no owning service, ignoring", Hex(*property_id));
        }

        let owner_names = owners
            .iter()
            .map(|(id, index)| (*id, services[*index].name().to_string()))
            .collect();
        self.router.install(by_id, owner_names, schemas, validator);

        for (service, properties) in services.iter().zip(&taken) {
            debug!("Service '{}' takes {} properties", service.name(), properties.len());
            service.take_properties(properties);
        }

        for service in &services {
            service.init();
        }

        if let Some(queue) = self.queue.lock().take() {
            let mut dispatcher =
                EventDispatcher::new(owners, services.clone(), self.released.clone());
            queue.spawn(self.worker.runtime(), move |event| dispatcher.dispatch(event));
        }

        *state = LifecycleState::Initialized;
        info!("Vehicle HAL initialized with {} services", services.len());
        Ok(())
    }

    /// Unsubscribe everything, then release services in registration
    /// order. Later calls are no-ops.
    pub fn release(&self) {
        let mut state = self.state.lock();
        if *state == LifecycleState::Released {
            return;
        }
        self.released.store(true, Ordering::SeqCst);
        self.router.release_subscriptions();
        for service in self.services.read().iter() {
            service.release();
        }
        self.worker.shutdown();
        *state = LifecycleState::Released;
        info!("Vehicle HAL released");
    }
}

impl Drop for VehicleHal {
    fn drop(&mut self) {
        // The worker loop holds the services, so it never sees its queue close
        self.worker.shutdown();
    }
}

impl std::fmt::Debug for VehicleHal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VehicleHal")
            .field("state", &self.state())
            .field("services", &self.services.read().len())
            .field("router", &self.router)
            .finish()
    }
}

type Partition = (HashMap<i32, usize>, Vec<Vec<PropertyConfig>>);

/// Assign each exposed property to the one service declaring it
fn partition(
    services: &[Arc<dyn HalServiceBase>],
    configs: &HashMap<i32, PropertyConfig>,
) -> RouterResult<Partition> {
    let mut owners: HashMap<i32, usize> = HashMap::new();
    let mut taken = vec![Vec::new(); services.len()];

    for (index, service) in services.iter().enumerate() {
        for property_id in service.supported_property_ids() {
            let Some(config) = configs.get(&property_id) else {
                continue;
            };
            match owners.get(&property_id) {
                Some(&first) if first == index => continue,
                Some(&first) => {
                    return Err(RouterError::DuplicateOwner {
                        property_id: Hex(property_id),
                        first: services[first].name().to_string(),
                        second: service.name().to_string(),
                    });
                }
                None => {
                    owners.insert(property_id, index);
                    taken[index].push(config.clone());
                }
            }
        }
    }
    Ok((owners, taken))
}

/// Worker-side fan-out of inbound batches. Per-service queues are reused
/// between batches.
pub(crate) struct EventDispatcher {
    owners: HashMap<i32, usize>,
    services: Vec<Arc<dyn HalServiceBase>>,
    event_queues: Vec<Vec<PropertyValue>>,
    error_queues: Vec<Vec<PropertyError>>,
    released: Arc<AtomicBool>,
}

impl EventDispatcher {
    pub(crate) fn new(
        owners: HashMap<i32, usize>,
        services: Vec<Arc<dyn HalServiceBase>>,
        released: Arc<AtomicBool>,
    ) -> Self {
        let count = services.len();
        Self {
            owners,
            services,
            event_queues: vec![Vec::new(); count],
            error_queues: vec![Vec::new(); count],
            released,
        }
    }

    pub(crate) fn dispatch(&mut self, event: HalEvent) {
        if self.released.load(Ordering::SeqCst) {
            trace!("Dropping batch after release");
            return;
        }
        match event {
            HalEvent::PropertyEvents(values) => self.on_property_event(values),
            HalEvent::PropertySetErrors(errors) => self.on_property_set_error(errors),
        }
    }

    fn on_property_event(&mut self, values: Vec<PropertyValue>) {
        for value in values {
            match self.owners.get(&value.property_id()) {
                Some(&index) => self.event_queues[index].push(value),
                None => debug!("Dropping event for unowned property {}", Hex(value.property_id())),
            }
        }
        for (service, queue) in self.services.iter().zip(self.event_queues.iter_mut()) {
            if !queue.is_empty() {
                service.on_hal_events(queue);
                queue.clear();
            }
        }
    }

    fn on_property_set_error(&mut self, errors: Vec<PropertyError>) {
        for error in errors {
            if error.property_id == INVALID {
                continue;
            }
            match self.owners.get(&error.property_id) {
                Some(&index) => self.error_queues[index].push(error),
                None => debug!(
                    "Dropping set error for unowned property {}",
                    Hex(error.property_id)
                ),
            }
        }
        for (service, queue) in self.services.iter().zip(self.error_queues.iter_mut()) {
            if !queue.is_empty() {
                service.on_property_set_error(queue);
                queue.clear();
            }
        }
    }
}
