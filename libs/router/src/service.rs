//! Feature service contract

use vhal_types::{PropertyConfig, PropertyError, PropertyValue};

/// A feature service behind the router (power, input, diagnostics, user
/// management, ...).
///
/// Lifecycle: `supported_property_ids` and `take_properties` during
/// initialization, then `init`, then events on the worker, then `release`.
/// Event callbacks always run on the single worker, never on the
/// transport thread.
pub trait HalServiceBase: Send + Sync {
    /// Stable name used for ownership checks and logs
    fn name(&self) -> &str;

    /// Every property id the service can handle
    fn supported_property_ids(&self) -> Vec<i32>;

    /// The subset of supported ids the vehicle actually exposes. The
    /// service decides whether a partial set is usable.
    fn take_properties(&self, properties: &[PropertyConfig]);

    fn init(&self);

    fn release(&self);

    fn on_hal_events(&self, values: &[PropertyValue]);

    fn on_property_set_error(&self, _errors: &[PropertyError]) {}
}
