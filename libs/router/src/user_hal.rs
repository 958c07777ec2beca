//! User management streams
//!
//! Hosts the correlated request streams used for user management: initial
//! user info, switch, create and remove, plus the optional user
//! identification association stream. Switch and create decisions belong
//! to the caller; this service only moves requests and responses.
//! Correlated calls take an optional timeout; `None` falls back to the
//! configured `user_hal.default_timeout_ms`.

use crate::correlator::{Completion, RequestCorrelator};
use crate::error::RouterResult;
use crate::router::Router;
use crate::service::HalServiceBase;
use crate::worker::WorkerHandle;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vhal_codec::user_hal::{
    CreateUserRequest, CreateUserResponse, InitialUserInfoRequest, InitialUserInfoRequestType,
    InitialUserInfoResponse, RemoveUserRequest, SwitchUserMessageType, SwitchUserRequest,
    SwitchUserResponse, UserIdentificationGetRequest, UserIdentificationResponse,
    UserIdentificationSetRequest, UserInfo, UsersInfo,
};
use vhal_config::UserHalSettings;
use vhal_types::property_ids::{
    CREATE_USER, INITIAL_USER_INFO, REMOVE_USER, SWITCH_USER, USER_IDENTIFICATION_ASSOCIATION,
};
use vhal_types::{Hex, PropertyConfig, PropertyError, PropertyValue};

pub const USER_HAL_SERVICE: &str = "user_hal";

/// Properties that must all be present for user management to work
pub const CORE_PROPERTIES: [i32; 4] = [INITIAL_USER_INFO, SWITCH_USER, CREATE_USER, REMOVE_USER];

pub struct UserHalService {
    router: Arc<Router>,
    correlator: RequestCorrelator,
    default_timeout: Duration,
}

impl UserHalService {
    pub fn new(router: Arc<Router>, worker: WorkerHandle, settings: &UserHalSettings) -> Self {
        Self {
            correlator: RequestCorrelator::new(router.clone(), worker),
            router,
            default_timeout: settings.default_timeout(),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn timeout_or_default(&self, timeout: impl Into<Option<Duration>>) -> Duration {
        timeout.into().unwrap_or(self.default_timeout)
    }

    /// True once every core property was taken at initialization
    pub fn is_supported(&self) -> bool {
        CORE_PROPERTIES.iter().all(|id| self.correlator.is_supported(*id))
    }

    pub fn is_user_association_supported(&self) -> bool {
        self.correlator.is_supported(USER_IDENTIFICATION_ASSOCIATION)
    }

    pub fn get_initial_user_info(
        &self,
        request_type: InitialUserInfoRequestType,
        users_info: UsersInfo,
        timeout: impl Into<Option<Duration>>,
    ) -> Completion<InitialUserInfoResponse> {
        self.correlator.issue(
            &InitialUserInfoRequest {
                request_type,
                users_info,
            },
            self.timeout_or_default(timeout),
        )
    }

    pub fn switch_user(
        &self,
        target_user: UserInfo,
        users_info: UsersInfo,
        timeout: impl Into<Option<Duration>>,
    ) -> Completion<SwitchUserResponse> {
        self.correlator.issue(
            &SwitchUserRequest {
                message_type: SwitchUserMessageType::AndroidSwitch,
                target_user,
                users_info,
            },
            self.timeout_or_default(timeout),
        )
    }

    /// Tell the vehicle the switch answered under `request_id` completed
    pub fn post_switch(
        &self,
        request_id: i32,
        target_user: UserInfo,
        users_info: UsersInfo,
    ) -> RouterResult<()> {
        let request = SwitchUserRequest {
            message_type: SwitchUserMessageType::AndroidPostSwitch,
            target_user,
            users_info,
        };
        self.correlator.send_with_id(&request, request_id)
    }

    pub fn create_user(
        &self,
        new_user_info: UserInfo,
        new_user_name: impl Into<String>,
        users_info: UsersInfo,
        timeout: impl Into<Option<Duration>>,
    ) -> Completion<CreateUserResponse> {
        self.correlator.issue(
            &CreateUserRequest {
                new_user_info,
                new_user_name: new_user_name.into(),
                users_info,
            },
            self.timeout_or_default(timeout),
        )
    }

    /// Fire-and-forget; returns the request id used
    pub fn remove_user(
        &self,
        removed_user_info: UserInfo,
        users_info: UsersInfo,
    ) -> RouterResult<i32> {
        self.correlator.send(&RemoveUserRequest {
            removed_user_info,
            users_info,
        })
    }

    pub fn get_user_association(
        &self,
        request: &UserIdentificationGetRequest,
        timeout: impl Into<Option<Duration>>,
    ) -> Completion<UserIdentificationResponse> {
        self.correlator.issue(request, self.timeout_or_default(timeout))
    }

    pub fn set_user_association(
        &self,
        request: &UserIdentificationSetRequest,
        timeout: impl Into<Option<Duration>>,
    ) -> Completion<UserIdentificationResponse> {
        self.correlator.issue(request, self.timeout_or_default(timeout))
    }
}

impl HalServiceBase for UserHalService {
    fn name(&self) -> &str {
        USER_HAL_SERVICE
    }

    fn supported_property_ids(&self) -> Vec<i32> {
        let mut ids = CORE_PROPERTIES.to_vec();
        ids.push(USER_IDENTIFICATION_ASSOCIATION);
        ids
    }

    fn take_properties(&self, properties: &[PropertyConfig]) {
        let has = |id: i32| properties.iter().any(|c| c.property_id == id);
        let mut supported = Vec::new();

        if CORE_PROPERTIES.iter().all(|id| has(*id)) {
            supported.extend_from_slice(&CORE_PROPERTIES);
        } else if CORE_PROPERTIES.iter().any(|id| has(*id)) {
            let missing: Vec<Hex> = CORE_PROPERTIES
                .iter()
                .filter(|id| !has(**id))
                .map(|id| Hex(*id))
                .collect();
            warn!("User management disabled, missing properties {:?}", missing);
        }
        if has(USER_IDENTIFICATION_ASSOCIATION) {
            supported.push(USER_IDENTIFICATION_ASSOCIATION);
        }

        info!("User HAL streams supported: {}", supported.len());
        self.correlator.set_supported(supported);
    }

    fn init(&self) {
        for property_id in self.supported_property_ids() {
            if !self.correlator.is_supported(property_id) {
                continue;
            }
            if let Err(e) = self.router.subscribe(USER_HAL_SERVICE, property_id, 0.0) {
                warn!("Cannot subscribe {}: {}", Hex(property_id), e);
            }
        }
    }

    fn release(&self) {
        self.correlator.release();
    }

    fn on_hal_events(&self, values: &[PropertyValue]) {
        for value in values {
            if !self.correlator.on_response(value) {
                debug!("Unmatched user HAL event {}", value);
            }
        }
    }

    fn on_property_set_error(&self, errors: &[PropertyError]) {
        for error in errors {
            warn!("Asynchronous set failure: {}", error);
        }
    }
}

impl std::fmt::Debug for UserHalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserHalService")
            .field("correlator", &self.correlator)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}
