mod common;

use common::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vhal_client::test_utils::MockChannel;
use vhal_client::ChannelError;
use vhal_codec::user_hal::{
    user_flags, CreateUserStatus, InitialUserInfoAction, InitialUserInfoRequestType,
    SwitchUserMessageType, SwitchUserStatus, UserIdentificationAssociationSetValue,
    UserIdentificationAssociationType, UserIdentificationAssociationValue,
    UserIdentificationGetRequest, UserIdentificationSetAssociation, UserIdentificationSetRequest,
    UserInfo, UsersInfo,
};
use vhal_codec::WireFormat;
use vhal_router::{HalCallbackStatus, UserHalService, VehicleHal, CORE_PROPERTIES};
use vhal_types::property_ids::*;
use vhal_types::{PropertyConfig, PropertyValue, RawPropValues, StatusCode, GLOBAL_AREA_ID};

const WAIT: Duration = Duration::from_secs(3);

fn user_configs(with_association: bool) -> Vec<PropertyConfig> {
    let mut configs: Vec<PropertyConfig> = CORE_PROPERTIES
        .into_iter()
        .map(on_change)
        .collect();
    if with_association {
        configs.push(on_change(USER_IDENTIFICATION_ASSOCIATION));
    }
    configs
}

fn start(channel: &Arc<MockChannel>) -> (VehicleHal, Arc<UserHalService>) {
    let hal = hal_for(channel);
    let users = Arc::new(UserHalService::new(
        hal.router(),
        hal.worker(),
        &fast_settings().user_hal,
    ));
    hal.register_service(users.clone()).unwrap();
    hal.initialize().unwrap();
    (hal, users)
}

fn users_info() -> UsersInfo {
    UsersInfo {
        current_user: UserInfo::new(10, user_flags::ADMIN),
        existing_users: vec![
            UserInfo::new(0, user_flags::SYSTEM),
            UserInfo::new(10, user_flags::ADMIN),
        ],
    }
}

fn response(property_id: i32, ints: Vec<i32>, string: &str) -> PropertyValue {
    let mut values = RawPropValues::int32s(ints);
    values.string = string.to_string();
    PropertyValue::new(property_id, GLOBAL_AREA_ID, 0, 0, values)
}

/// Answer every android switch with `status`, shifting the echoed id by `id_shift`
fn answer_switches(channel: &MockChannel, delay: Duration, id_shift: i32, status: i32) {
    channel.respond_to_sets(
        delay,
        Arc::new(move |request: &PropertyValue| {
            let ints = request.int32s();
            let android_switch = i32::from(SwitchUserMessageType::AndroidSwitch);
            if request.property_id() != SWITCH_USER || ints[1] != android_switch {
                return Vec::new();
            }
            vec![response(
                SWITCH_USER,
                vec![ints[0] + id_shift, SwitchUserMessageType::VehicleResponse.into(), status],
                "",
            )]
        }),
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_property_set_enables_every_stream() {
    let channel = channel_with(WireFormat::Current, user_configs(true));
    let (_hal, users) = start(&channel);

    assert!(users.is_supported());
    assert!(users.is_user_association_supported());
    for id in CORE_PROPERTIES.into_iter().chain([USER_IDENTIFICATION_ASSOCIATION]) {
        assert!(channel.is_subscribed(id), "{:#x} not subscribed", id);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_partial_core_set_disables_user_management() {
    let mut configs = user_configs(true);
    configs.retain(|c| c.property_id != CREATE_USER);
    let channel = channel_with(WireFormat::Current, configs);
    let (_hal, users) = start(&channel);

    assert!(!users.is_supported());
    assert!(users.is_user_association_supported());
    assert!(!channel.is_subscribed(SWITCH_USER));
    assert!(channel.is_subscribed(USER_IDENTIFICATION_ASSOCIATION));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[should_panic(expected = "not a supported request stream")]
async fn test_unsupported_stream_is_a_programming_error() {
    let channel = channel_with(WireFormat::Current, user_configs(false));
    let (_hal, users) = start(&channel);
    let request = UserIdentificationGetRequest {
        user_info: UserInfo::new(10, 0),
        association_types: vec![UserIdentificationAssociationType::KeyFob],
    };
    let _ = users.get_user_association(&request, Duration::from_millis(100));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_switch_user_completes_with_matching_response() {
    let channel = channel_with(WireFormat::Legacy, user_configs(false));
    let (_hal, users) = start(&channel);
    answer_switches(&channel, Duration::from_millis(10), 0, SwitchUserStatus::Success.into());

    let target = UserInfo::new(11, user_flags::NONE);
    let outcome = within(WAIT, users.switch_user(target, users_info(), Duration::from_secs(2)))
        .await
        .unwrap();

    assert_eq!(outcome.status, HalCallbackStatus::Ok);
    let switched = outcome.response.unwrap();
    assert_eq!(switched.status, SwitchUserStatus::Success);

    let request = &channel.set_calls()[0];
    assert_eq!(request.property_id(), SWITCH_USER);
    assert_eq!(
        request.int32s(),
        &[switched.request_id, 2, 11, 0, 10, 8, 2, 0, 1, 10, 8]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_mismatched_response_id_times_out_in_window() {
    let channel = channel_with(WireFormat::Current, user_configs(false));
    let (_hal, users) = start(&channel);
    answer_switches(&channel, Duration::from_millis(5), 100, SwitchUserStatus::Success.into());

    let timeout = Duration::from_millis(150);
    let started = Instant::now();
    let outcome = within(
        WAIT,
        users.switch_user(UserInfo::new(11, 0), users_info(), timeout),
    )
    .await
    .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.status, HalCallbackStatus::HalResponseTimeout);
    assert_eq!(outcome.response, None);
    assert!(elapsed >= timeout, "completed after {:?}", elapsed);
    assert!(elapsed < timeout + Duration::from_secs(1), "completed after {:?}", elapsed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_timeout_uses_configured_default() {
    let channel = channel_with(WireFormat::Current, user_configs(false));
    let hal = hal_for(&channel);
    let mut settings = fast_settings().user_hal;
    settings.default_timeout_ms = 120;
    let users = Arc::new(UserHalService::new(hal.router(), hal.worker(), &settings));
    hal.register_service(users.clone()).unwrap();
    hal.initialize().unwrap();
    answer_switches(&channel, Duration::from_millis(5), 100, SwitchUserStatus::Success.into());

    assert_eq!(users.default_timeout(), Duration::from_millis(120));
    let started = Instant::now();
    let outcome = within(WAIT, users.switch_user(UserInfo::new(11, 0), users_info(), None))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.status, HalCallbackStatus::HalResponseTimeout);
    assert!(elapsed >= Duration::from_millis(120), "completed after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(1), "completed after {:?}", elapsed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_request_while_pending_is_rejected() {
    let channel = channel_with(WireFormat::Current, user_configs(false));
    let (_hal, users) = start(&channel);

    let first = users.switch_user(UserInfo::new(11, 0), users_info(), Duration::from_millis(200));
    let second = users.switch_user(UserInfo::new(12, 0), users_info(), Duration::from_millis(200));

    let rejected = within(WAIT, second).await.unwrap();
    assert_eq!(rejected.status, HalCallbackStatus::ConcurrentOperation);
    assert_eq!(channel.set_call_count(), 1);

    let timed_out = within(WAIT, first).await.unwrap();
    assert_eq!(timed_out.status, HalCallbackStatus::HalResponseTimeout);

    // The stream is idle again
    answer_switches(&channel, Duration::from_millis(5), 0, SwitchUserStatus::Failure.into());
    let third = within(
        WAIT,
        users.switch_user(UserInfo::new(12, 0), users_info(), Duration::from_secs(2)),
    )
    .await
    .unwrap();
    assert_eq!(third.status, HalCallbackStatus::Ok);
    assert_eq!(third.response.unwrap().status, SwitchUserStatus::Failure);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_set_failure_completes_with_set_timeout() {
    let channel = channel_with(WireFormat::Current, user_configs(false));
    let (_hal, users) = start(&channel);
    channel.script_set(Err(ChannelError::Status(StatusCode::InvalidArg)));

    let started = Instant::now();
    let outcome = within(
        WAIT,
        users.create_user(UserInfo::new(12, 0), "Dana", users_info(), Duration::from_secs(5)),
    )
    .await
    .unwrap();
    assert_eq!(outcome.status, HalCallbackStatus::HalSetTimeout);
    assert!(started.elapsed() < Duration::from_secs(1));

    // Slot was cleared, so the next request goes out
    let timeout = Duration::from_millis(50);
    let _next = users.create_user(UserInfo::new(12, 0), "Dana", users_info(), timeout);
    assert_eq!(channel.set_call_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_late_response_after_timeout_is_ignored() {
    let channel = channel_with(WireFormat::Current, user_configs(false));
    let (_hal, users) = start(&channel);
    answer_switches(&channel, Duration::from_millis(150), 0, SwitchUserStatus::Success.into());

    let outcome = within(
        WAIT,
        users.switch_user(UserInfo::new(11, 0), users_info(), Duration::from_millis(30)),
    )
    .await
    .unwrap();
    assert_eq!(outcome.status, HalCallbackStatus::HalResponseTimeout);

    // Let the late answer arrive; it must not complete anything else
    tokio::time::sleep(Duration::from_millis(250)).await;
    channel.respond_to_sets(Duration::from_millis(1), Arc::new(|_: &PropertyValue| Vec::new()));
    let next = users.switch_user(UserInfo::new(11, 0), users_info(), Duration::from_millis(50));
    let outcome = within(WAIT, next).await.unwrap();
    assert_eq!(outcome.status, HalCallbackStatus::HalResponseTimeout);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unparseable_response_is_wrong_hal_response() {
    let channel = channel_with(WireFormat::Current, user_configs(false));
    let (_hal, users) = start(&channel);
    answer_switches(&channel, Duration::from_millis(5), 0, 42);

    let outcome = within(
        WAIT,
        users.switch_user(UserInfo::new(11, 0), users_info(), Duration::from_secs(2)),
    )
    .await
    .unwrap();
    assert_eq!(outcome.status, HalCallbackStatus::WrongHalResponse);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_initial_user_info_and_create_user() {
    let channel = channel_with(WireFormat::Legacy, user_configs(false));
    let (_hal, users) = start(&channel);
    channel.respond_to_sets(
        Duration::from_millis(5),
        Arc::new(|request: &PropertyValue| {
            let request_id = request.int32s()[0];
            match request.property_id() {
                INITIAL_USER_INFO => vec![response(
                    INITIAL_USER_INFO,
                    vec![request_id, InitialUserInfoAction::Create.into(), 0, user_flags::ADMIN],
                    "en-US||Driver",
                )],
                CREATE_USER => vec![response(
                    CREATE_USER,
                    vec![request_id, CreateUserStatus::Success.into()],
                    "",
                )],
                _ => Vec::new(),
            }
        }),
    );

    let info = within(
        WAIT,
        users.get_initial_user_info(
            InitialUserInfoRequestType::FirstBoot,
            users_info(),
            Duration::from_secs(2),
        ),
    )
    .await
    .unwrap()
    .response
    .unwrap();
    assert_eq!(info.action, InitialUserInfoAction::Create);
    assert_eq!(info.user_locales, "en-US");
    assert_eq!(info.user_name_to_create, "Driver");

    let created = within(
        WAIT,
        users.create_user(UserInfo::new(12, user_flags::ADMIN), "Driver", users_info(), None),
    )
    .await
    .unwrap();
    assert_eq!(created.status, HalCallbackStatus::Ok);
    assert_eq!(created.response.unwrap().status, CreateUserStatus::Success);
    let create_request = channel
        .set_calls()
        .into_iter()
        .find(|v| v.property_id() == CREATE_USER)
        .unwrap();
    assert_eq!(create_request.string(), "Driver");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_post_switch_and_remove_are_fire_and_forget() {
    let channel = channel_with(WireFormat::Current, user_configs(false));
    let (_hal, users) = start(&channel);

    users.post_switch(77, UserInfo::new(11, 0), users_info()).unwrap();
    let removed_id = users.remove_user(UserInfo::new(12, 0), users_info()).unwrap();
    assert!(removed_id > 0);

    let calls = channel.set_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].property_id(), SWITCH_USER);
    assert_eq!(&calls[0].int32s()[..4], &[77, 5, 11, 0]);
    assert_eq!(calls[1].property_id(), REMOVE_USER);
    assert_eq!(&calls[1].int32s()[..3], &[removed_id, 12, 0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_user_association_round_trip() {
    let channel = channel_with(WireFormat::Current, user_configs(true));
    let (_hal, users) = start(&channel);
    channel.respond_to_sets(
        Duration::from_millis(5),
        Arc::new(|request: &PropertyValue| {
            vec![response(
                USER_IDENTIFICATION_ASSOCIATION,
                vec![
                    request.int32s()[0],
                    1,
                    UserIdentificationAssociationType::KeyFob.into(),
                    UserIdentificationAssociationValue::AssociatedCurrentUser.into(),
                ],
                "",
            )]
        }),
    );

    let request = UserIdentificationSetRequest {
        user_info: UserInfo::new(10, user_flags::ADMIN),
        associations: vec![UserIdentificationSetAssociation {
            association_type: UserIdentificationAssociationType::KeyFob,
            value: UserIdentificationAssociationSetValue::AssociateCurrentUser,
        }],
    };
    let outcome = within(WAIT, users.set_user_association(&request, Duration::from_secs(2)))
        .await
        .unwrap();
    let associations = outcome.response.unwrap().associations;
    assert_eq!(associations.len(), 1);
    assert_eq!(
        associations[0].value,
        UserIdentificationAssociationValue::AssociatedCurrentUser
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_release_drops_pending_requests() {
    let channel = channel_with(WireFormat::Current, user_configs(false));
    let (hal, users) = start(&channel);

    let pending = users.switch_user(UserInfo::new(11, 0), users_info(), Duration::from_millis(100));
    hal.release();

    assert!(within(WAIT, pending).await.is_err());
    assert!(!channel.is_subscribed(SWITCH_USER));
}
