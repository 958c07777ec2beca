//! Shared property router
//!
//! Feature services reach the channel only through the [`Router`]. It holds
//! the tables built at initialization (configs, owners, compiled schemas,
//! permissions) and the subscription bookkeeping. Calls come from arbitrary
//! service threads, so every table sits behind a lock.

use crate::error::{RouterError, RouterResult};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use vhal_client::{ClientError, HalClient, SubscribeOptions};
use vhal_codec::{
    from_typed_value_with_schema, to_typed_value_with_schema, CarPropertyValue, CodecError,
    PayloadValidator, PropValueBuilder, PropertySchema, SchemaTable, TypedValue,
};
use vhal_types::{
    is_system_property, ChangeMode, PropertyConfig, PropertyType, PropertyValue,
};

/// A property can be subscribed when it is readable and changes at runtime
pub fn is_subscribable(config: &PropertyConfig) -> bool {
    config.access.is_readable() && config.change_mode != ChangeMode::Static
}

#[derive(Default)]
struct RouterTables {
    configs: HashMap<i32, PropertyConfig>,
    owners: HashMap<i32, String>,
    schemas: SchemaTable,
}

pub struct Router {
    client: HalClient,
    tables: RwLock<RouterTables>,
    validator: RwLock<PayloadValidator>,
    /// property id -> requested sample rate
    subscriptions: Mutex<HashMap<i32, f32>>,
}

impl Router {
    pub fn new(client: HalClient) -> Self {
        Self {
            client,
            tables: RwLock::new(RouterTables::default()),
            validator: RwLock::new(PayloadValidator::new()),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn client(&self) -> &HalClient {
        &self.client
    }

    /// Swap in the tables built by `VehicleHal::initialize`
    pub(crate) fn install(
        &self,
        configs: HashMap<i32, PropertyConfig>,
        owners: HashMap<i32, String>,
        schemas: SchemaTable,
        validator: PayloadValidator,
    ) {
        info!(
            "Router tables installed: {} configs, {} owned, {} schemas",
            configs.len(),
            owners.len(),
            schemas.len()
        );
        *self.tables.write() = RouterTables {
            configs,
            owners,
            schemas,
        };
        *self.validator.write() = validator;
    }

    /// Builder bound to the channel's wire format
    pub fn builder(&self) -> PropValueBuilder {
        self.client.builder()
    }

    pub fn config(&self, property_id: i32) -> Option<PropertyConfig> {
        self.tables.read().configs.get(&property_id).cloned()
    }

    pub fn owner_of(&self, property_id: i32) -> Option<String> {
        self.tables.read().owners.get(&property_id).cloned()
    }

    pub fn is_supported(&self, property_id: i32) -> bool {
        self.tables.read().configs.contains_key(&property_id)
    }

    pub fn read_permission(&self, property_id: i32) -> Option<&'static str> {
        self.validator.read().read_permission(property_id)
    }

    pub fn write_permission(&self, property_id: i32) -> Option<&'static str> {
        self.validator.read().write_permission(property_id)
    }

    pub fn check_payload(&self, value: &PropertyValue) -> bool {
        self.validator.read().check_payload(value)
    }

    fn ensure_supported(&self, property_id: i32) -> RouterResult<()> {
        if self.is_supported(property_id) {
            Ok(())
        } else {
            Err(RouterError::not_supported(property_id))
        }
    }

    fn schema(&self, property_id: i32) -> RouterResult<PropertySchema> {
        self.tables
            .read()
            .schemas
            .get(property_id)
            .cloned()
            .ok_or_else(|| RouterError::not_supported(property_id))
    }

    // ===== Reads =====

    /// `Ok(None)` when the channel reports the value not available
    pub fn get(&self, property_id: i32, area_id: i32) -> RouterResult<Option<PropertyValue>> {
        self.get_value(&PropertyValue::request(property_id, area_id))
    }

    pub fn get_with_retries(
        &self,
        property_id: i32,
        area_id: i32,
        max_retries: u32,
    ) -> RouterResult<Option<PropertyValue>> {
        self.ensure_supported(property_id)?;
        let request = PropertyValue::request(property_id, area_id);
        not_available_as_none(self.client.get_value_with_retries(&request, max_retries))
    }

    /// Get with a prepared request, for properties whose get carries input
    pub fn get_value(&self, request: &PropertyValue) -> RouterResult<Option<PropertyValue>> {
        self.ensure_supported(request.property_id())?;
        not_available_as_none(self.client.get_value(request))
    }

    /// Typed view of a raw value, addressed by the same id
    pub fn to_typed(&self, value: &PropertyValue) -> RouterResult<CarPropertyValue> {
        let schema = self.schema(value.property_id())?;
        Ok(to_typed_value_with_schema(value, value.property_id(), &schema)?)
    }

    pub fn from_typed(&self, value: &CarPropertyValue) -> RouterResult<PropertyValue> {
        let schema = self.schema(value.property_id)?;
        Ok(from_typed_value_with_schema(value, value.property_id, &schema)?)
    }

    fn get_typed<T>(
        &self,
        property_id: i32,
        area_id: i32,
        wanted: &'static str,
        extract: impl FnOnce(TypedValue) -> Option<T>,
    ) -> RouterResult<Option<T>> {
        let Some(value) = self.get(property_id, area_id)? else {
            return Ok(None);
        };
        let typed = self.to_typed(&value)?;
        let declared =
            PropertyType::of(property_id).ok_or_else(|| CodecError::unknown_type(property_id))?;
        extract(typed.value)
            .map(Some)
            .ok_or_else(|| CodecError::type_mismatch(property_id, declared, wanted).into())
    }

    pub fn get_bool(&self, property_id: i32, area_id: i32) -> RouterResult<Option<bool>> {
        self.get_typed(property_id, area_id, "bool", |v| match v {
            TypedValue::Bool(b) => Some(b),
            _ => None,
        })
    }

    pub fn get_i32(&self, property_id: i32, area_id: i32) -> RouterResult<Option<i32>> {
        self.get_typed(property_id, area_id, "int32", |v| match v {
            TypedValue::Int32(i) => Some(i),
            _ => None,
        })
    }

    pub fn get_f32(&self, property_id: i32, area_id: i32) -> RouterResult<Option<f32>> {
        self.get_typed(property_id, area_id, "float", |v| match v {
            TypedValue::Float(f) => Some(f),
            _ => None,
        })
    }

    pub fn get_i64(&self, property_id: i32, area_id: i32) -> RouterResult<Option<i64>> {
        self.get_typed(property_id, area_id, "int64", |v| match v {
            TypedValue::Int64(i) => Some(i),
            _ => None,
        })
    }

    pub fn get_string(&self, property_id: i32, area_id: i32) -> RouterResult<Option<String>> {
        self.get_typed(property_id, area_id, "string", |v| match v {
            TypedValue::String(s) => Some(s),
            _ => None,
        })
    }

    // ===== Writes =====

    /// System property payloads are validated before reaching the channel
    pub fn set(&self, value: &PropertyValue) -> RouterResult<()> {
        let (property_id, area_id) = (value.property_id(), value.area_id());
        self.ensure_supported(property_id)?;
        if is_system_property(property_id) {
            self.validator
                .read()
                .validate(value)
                .map_err(|e| RouterError::illegal_argument(property_id, area_id, e.to_string()))?;
        }
        self.client.set_value(value)?;
        Ok(())
    }

    /// Builder-style setter: `router.set_property(id, area).to_i32(3)`
    pub fn set_property(&self, property_id: i32, area_id: i32) -> PropertySetter<'_> {
        PropertySetter {
            router: self,
            property_id,
            area_id,
        }
    }

    // ===== Subscriptions =====

    /// Subscribe on behalf of `service`, which must own the property.
    /// Channel failures are logged and swallowed.
    pub fn subscribe(&self, service: &str, property_id: i32, sample_rate: f32) -> RouterResult<()> {
        let config = self.owned_config(service, property_id)?;
        if config.change_mode == ChangeMode::Continuous && !config.has_sample_rate_range() {
            warn!(
                property_id = %format_args!("{:#x}", property_id),
                min = config.min_sample_rate,
                max = config.max_sample_rate,
                "Declared sample rate range is unusable, rate left unclamped"
            );
        }
        let rate = config.clamp_sample_rate(sample_rate);
        self.subscriptions.lock().insert(property_id, rate);

        if !is_subscribable(&config) {
            debug!(
                property_id = %format_args!("{:#x}", property_id),
                "Property is not subscribable, skipping channel subscribe"
            );
            return Ok(());
        }
        if let Err(e) = self.client.subscribe(&[SubscribeOptions::new(property_id, rate)]) {
            warn!(
                property_id = %format_args!("{:#x}", property_id),
                service,
                "Subscribe failed: {}",
                e
            );
        }
        Ok(())
    }

    /// No-op for unknown or unsubscribed ids
    pub fn unsubscribe(&self, service: &str, property_id: i32) -> RouterResult<()> {
        if !self.is_supported(property_id) {
            return Ok(());
        }
        let config = self.owned_config(service, property_id)?;
        if self.subscriptions.lock().remove(&property_id).is_none() {
            return Ok(());
        }
        self.unsubscribe_channel(&config);
        Ok(())
    }

    pub fn is_subscribed(&self, property_id: i32) -> bool {
        self.subscriptions.lock().contains_key(&property_id)
    }

    /// Drop every subscription, continuing past channel failures
    pub(crate) fn release_subscriptions(&self) {
        let subscribed: Vec<i32> = self.subscriptions.lock().drain().map(|(id, _)| id).collect();
        for property_id in subscribed {
            if let Some(config) = self.config(property_id) {
                self.unsubscribe_channel(&config);
            }
        }
    }

    fn unsubscribe_channel(&self, config: &PropertyConfig) {
        if !is_subscribable(config) {
            return;
        }
        if let Err(e) = self.client.unsubscribe(config.property_id) {
            warn!(
                property_id = %format_args!("{:#x}", config.property_id),
                "Unsubscribe failed: {}",
                e
            );
        }
    }

    fn owned_config(&self, service: &str, property_id: i32) -> RouterResult<PropertyConfig> {
        let tables = self.tables.read();
        let config = tables
            .configs
            .get(&property_id)
            .ok_or_else(|| RouterError::not_supported(property_id))?;
        match tables.owners.get(&property_id) {
            Some(owner) if owner == service => Ok(config.clone()),
            _ => Err(RouterError::not_owner(property_id, service)),
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("Router")
            .field("client", &self.client)
            .field("configs", &tables.configs.len())
            .field("owned", &tables.owners.len())
            .field("subscriptions", &self.subscriptions.lock().len())
            .finish()
    }
}

fn not_available_as_none(
    result: Result<PropertyValue, ClientError>,
) -> RouterResult<Option<PropertyValue>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ClientError::NotAvailable { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Pending write to one property and area; see [`Router::set_property`]
#[must_use = "a setter does nothing until a value is supplied"]
pub struct PropertySetter<'a> {
    router: &'a Router,
    property_id: i32,
    area_id: i32,
}

impl PropertySetter<'_> {
    pub fn to_bool(self, value: bool) -> RouterResult<()> {
        self.router
            .set(&self.router.builder().build_bool(self.property_id, self.area_id, value))
    }

    pub fn to_i32(self, value: i32) -> RouterResult<()> {
        self.router
            .set(&self.router.builder().build_i32(self.property_id, self.area_id, value))
    }

    pub fn to_i32s(self, values: Vec<i32>) -> RouterResult<()> {
        self.router
            .set(&self.router.builder().build_i32s(self.property_id, self.area_id, values))
    }

    pub fn to_f32(self, value: f32) -> RouterResult<()> {
        self.router
            .set(&self.router.builder().build_f32(self.property_id, self.area_id, value))
    }

    pub fn to_f32s(self, values: Vec<f32>) -> RouterResult<()> {
        self.router
            .set(&self.router.builder().build_f32s(self.property_id, self.area_id, values))
    }

    pub fn to_i64(self, value: i64) -> RouterResult<()> {
        self.router
            .set(&self.router.builder().build_i64(self.property_id, self.area_id, value))
    }

    pub fn to_bytes(self, values: Vec<u8>) -> RouterResult<()> {
        self.router
            .set(&self.router.builder().build_bytes(self.property_id, self.area_id, values))
    }

    #[allow(clippy::wrong_self_convention, clippy::inherent_to_string)]
    pub fn to_string(self, value: impl Into<String>) -> RouterResult<()> {
        self.router
            .set(&self.router.builder().build_string(self.property_id, self.area_id, value))
    }
}
