//! User management request/response layouts
//!
//! The user-HAL properties are mixed values whose `int32s` start with a
//! request id. Requests are serialized into a `PropertyValue` stamped with
//! the id allocated by the caller; responses are parsed back with every
//! enumerated field checked against its domain.

use crate::builder::elapsed_nanos;
use crate::error::{CodecError, CodecResult};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use vhal_types::property_ids::{
    CREATE_USER, INITIAL_USER_INFO, REMOVE_USER, SWITCH_USER, USER_IDENTIFICATION_ASSOCIATION,
};
use vhal_types::{PropertyType, PropertyValue, RawPropValues, GLOBAL_AREA_ID};

pub mod user_flags {
    pub const NONE: i32 = 0;
    pub const SYSTEM: i32 = 1;
    pub const GUEST: i32 = 2;
    pub const EPHEMERAL: i32 = 4;
    pub const ADMIN: i32 = 8;
    pub const DISABLED: i32 = 16;
    pub const PROFILE: i32 = 32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserInfo {
    pub user_id: i32,
    pub flags: i32,
}

impl UserInfo {
    pub fn new(user_id: i32, flags: i32) -> Self {
        Self { user_id, flags }
    }
}

/// Current user plus every user known to the caller
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsersInfo {
    pub current_user: UserInfo,
    pub existing_users: Vec<UserInfo>,
}

impl UsersInfo {
    fn write(&self, out: &mut Vec<i32>) {
        out.push(self.current_user.user_id);
        out.push(self.current_user.flags);
        out.push(self.existing_users.len() as i32);
        for user in &self.existing_users {
            out.push(user.user_id);
            out.push(user.flags);
        }
    }
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum InitialUserInfoRequestType {
    FirstBoot = 1,
    FirstBootAfterOta = 2,
    ColdBoot = 3,
    Resume = 4,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum InitialUserInfoAction {
    Default = 0,
    Switch = 1,
    Create = 2,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum SwitchUserMessageType {
    LegacyAndroidSwitch = 1,
    AndroidSwitch = 2,
    VehicleResponse = 3,
    VehicleRequest = 4,
    AndroidPostSwitch = 5,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum SwitchUserStatus {
    Success = 1,
    Failure = 2,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum CreateUserStatus {
    Success = 1,
    Failure = 2,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum UserIdentificationAssociationType {
    KeyFob = 1,
    Custom1 = 101,
    Custom2 = 102,
    Custom3 = 103,
    Custom4 = 104,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum UserIdentificationAssociationValue {
    Unknown = 1,
    AssociatedCurrentUser = 2,
    AssociatedAnotherUser = 3,
    NotAssociatedAnyUser = 4,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum UserIdentificationAssociationSetValue {
    AssociateCurrentUser = 1,
    DisassociateCurrentUser = 2,
    DisassociateAllUsers = 3,
}

/// A request that travels on one user-HAL property
pub trait UserHalRequest {
    /// Property the request is written to and answered on
    const PROPERTY_ID: i32;

    /// Serialize with `request_id` in the first int32 slot
    fn to_raw_values(&self, request_id: i32) -> RawPropValues;

    fn to_property_value(&self, request_id: i32) -> PropertyValue {
        PropertyValue::new(
            Self::PROPERTY_ID,
            GLOBAL_AREA_ID,
            elapsed_nanos(),
            0,
            self.to_raw_values(request_id),
        )
    }
}

/// A response parsed from a property change event
pub trait UserHalResponse: Sized {
    fn from_property_value(value: &PropertyValue) -> CodecResult<Self>;
}

/// Request id carried in the first int32 slot, if any
pub fn request_id_of(value: &PropertyValue) -> Option<i32> {
    value.int32s().first().copied()
}

fn malformed(value: &PropertyValue, reason: impl Into<String>) -> CodecError {
    CodecError::malformed(value.property_id(), Some(PropertyType::Mixed), reason)
}

fn require_len(value: &PropertyValue, min: usize) -> CodecResult<&[i32]> {
    let ints = value.int32s();
    if ints.len() < min {
        return Err(malformed(
            value,
            format!("expected at least {} int32 elements, found {}", min, ints.len()),
        ));
    }
    Ok(ints)
}

fn decode_enum<E: TryFromPrimitive<Primitive = i32>>(
    value: &PropertyValue,
    field: &'static str,
    raw: i32,
) -> CodecResult<E> {
    E::try_from_primitive(raw)
        .map_err(|_| CodecError::invalid_enum(value.property_id(), field, raw))
}

fn check_property(value: &PropertyValue, expected: i32) -> CodecResult<()> {
    if value.property_id() != expected {
        return Err(malformed(
            value,
            format!("response arrived on {:#x}, expected {:#x}", value.property_id(), expected),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialUserInfoRequest {
    pub request_type: InitialUserInfoRequestType,
    pub users_info: UsersInfo,
}

impl UserHalRequest for InitialUserInfoRequest {
    const PROPERTY_ID: i32 = INITIAL_USER_INFO;

    fn to_raw_values(&self, request_id: i32) -> RawPropValues {
        let mut ints = vec![request_id, self.request_type.into()];
        self.users_info.write(&mut ints);
        RawPropValues::int32s(ints)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialUserInfoResponse {
    pub request_id: i32,
    pub action: InitialUserInfoAction,
    pub user_to_switch_or_create: UserInfo,
    pub user_locales: String,
    pub user_name_to_create: String,
}

impl UserHalResponse for InitialUserInfoResponse {
    fn from_property_value(value: &PropertyValue) -> CodecResult<Self> {
        check_property(value, INITIAL_USER_INFO)?;
        let ints = require_len(value, 2)?;
        let action = decode_enum(value, "action", ints[1])?;
        let user_to_switch_or_create = match action {
            InitialUserInfoAction::Default => UserInfo::default(),
            InitialUserInfoAction::Switch | InitialUserInfoAction::Create => {
                let ints = require_len(value, 4)?;
                UserInfo::new(ints[2], ints[3])
            }
        };
        let (user_locales, user_name_to_create) = match value.string().split_once("||") {
            Some((locales, name)) => (locales.to_string(), name.to_string()),
            None => (value.string().to_string(), String::new()),
        };
        Ok(Self {
            request_id: ints[0],
            action,
            user_to_switch_or_create,
            user_locales,
            user_name_to_create,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchUserRequest {
    pub message_type: SwitchUserMessageType,
    pub target_user: UserInfo,
    pub users_info: UsersInfo,
}

impl UserHalRequest for SwitchUserRequest {
    const PROPERTY_ID: i32 = SWITCH_USER;

    fn to_raw_values(&self, request_id: i32) -> RawPropValues {
        let mut ints = vec![
            request_id,
            self.message_type.into(),
            self.target_user.user_id,
            self.target_user.flags,
        ];
        self.users_info.write(&mut ints);
        RawPropValues::int32s(ints)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchUserResponse {
    pub request_id: i32,
    pub message_type: SwitchUserMessageType,
    pub status: SwitchUserStatus,
    pub error_message: String,
}

impl UserHalResponse for SwitchUserResponse {
    fn from_property_value(value: &PropertyValue) -> CodecResult<Self> {
        check_property(value, SWITCH_USER)?;
        let ints = require_len(value, 3)?;
        let message_type = decode_enum(value, "message_type", ints[1])?;
        if message_type != SwitchUserMessageType::VehicleResponse {
            return Err(CodecError::invalid_enum(value.property_id(), "message_type", ints[1]));
        }
        Ok(Self {
            request_id: ints[0],
            message_type,
            status: decode_enum(value, "status", ints[2])?,
            error_message: value.string().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserRequest {
    pub new_user_info: UserInfo,
    pub new_user_name: String,
    pub users_info: UsersInfo,
}

impl UserHalRequest for CreateUserRequest {
    const PROPERTY_ID: i32 = CREATE_USER;

    fn to_raw_values(&self, request_id: i32) -> RawPropValues {
        let mut ints = vec![request_id, self.new_user_info.user_id, self.new_user_info.flags];
        self.users_info.write(&mut ints);
        let mut values = RawPropValues::int32s(ints);
        values.string = self.new_user_name.clone();
        values
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserResponse {
    pub request_id: i32,
    pub status: CreateUserStatus,
    pub error_message: String,
}

impl UserHalResponse for CreateUserResponse {
    fn from_property_value(value: &PropertyValue) -> CodecResult<Self> {
        check_property(value, CREATE_USER)?;
        let ints = require_len(value, 2)?;
        Ok(Self {
            request_id: ints[0],
            status: decode_enum(value, "status", ints[1])?,
            error_message: value.string().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveUserRequest {
    pub removed_user_info: UserInfo,
    pub users_info: UsersInfo,
}

impl UserHalRequest for RemoveUserRequest {
    const PROPERTY_ID: i32 = REMOVE_USER;

    fn to_raw_values(&self, request_id: i32) -> RawPropValues {
        let mut ints = vec![
            request_id,
            self.removed_user_info.user_id,
            self.removed_user_info.flags,
        ];
        self.users_info.write(&mut ints);
        RawPropValues::int32s(ints)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentificationGetRequest {
    pub user_info: UserInfo,
    pub association_types: Vec<UserIdentificationAssociationType>,
}

impl UserHalRequest for UserIdentificationGetRequest {
    const PROPERTY_ID: i32 = USER_IDENTIFICATION_ASSOCIATION;

    fn to_raw_values(&self, request_id: i32) -> RawPropValues {
        let mut ints = vec![
            request_id,
            self.user_info.user_id,
            self.user_info.flags,
            self.association_types.len() as i32,
        ];
        ints.extend(self.association_types.iter().map(|t| i32::from(*t)));
        RawPropValues::int32s(ints)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserIdentificationSetAssociation {
    pub association_type: UserIdentificationAssociationType,
    pub value: UserIdentificationAssociationSetValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentificationSetRequest {
    pub user_info: UserInfo,
    pub associations: Vec<UserIdentificationSetAssociation>,
}

impl UserHalRequest for UserIdentificationSetRequest {
    const PROPERTY_ID: i32 = USER_IDENTIFICATION_ASSOCIATION;

    fn to_raw_values(&self, request_id: i32) -> RawPropValues {
        let mut ints = vec![
            request_id,
            self.user_info.user_id,
            self.user_info.flags,
            self.associations.len() as i32,
        ];
        for association in &self.associations {
            ints.push(association.association_type.into());
            ints.push(association.value.into());
        }
        RawPropValues::int32s(ints)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserIdentificationAssociation {
    pub association_type: UserIdentificationAssociationType,
    pub value: UserIdentificationAssociationValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentificationResponse {
    pub request_id: i32,
    pub associations: Vec<UserIdentificationAssociation>,
    pub error_message: String,
}

impl UserHalResponse for UserIdentificationResponse {
    fn from_property_value(value: &PropertyValue) -> CodecResult<Self> {
        check_property(value, USER_IDENTIFICATION_ASSOCIATION)?;
        let ints = require_len(value, 2)?;
        let count = usize::try_from(ints[1])
            .map_err(|_| malformed(value, format!("negative association count {}", ints[1])))?;
        let pairs = &ints[2..];
        if pairs.len() != count * 2 {
            return Err(malformed(
                value,
                format!(
                    "{} associations need {} elements, found {}",
                    count,
                    count * 2,
                    pairs.len()
                ),
            ));
        }
        let associations = pairs
            .chunks_exact(2)
            .map(|pair| {
                Ok(UserIdentificationAssociation {
                    association_type: decode_enum(value, "association_type", pair[0])?,
                    value: decode_enum(value, "association_value", pair[1])?,
                })
            })
            .collect::<CodecResult<Vec<_>>>()?;
        Ok(Self {
            request_id: ints[0],
            associations,
            error_message: value.string().to_string(),
        })
    }
}
