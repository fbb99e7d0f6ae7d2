//! Device operations against the in-process driver


use tellcore_ffi::{
    DeviceMethod, DeviceMethods, DeviceType, Error, ResultCategory, SensorValueType, TellCore,
};
use test_support::{weather_sensor, FakeDriver, TELLSTICK_ERROR_COMMUNICATION};

fn lamp_driver() -> FakeDriver {
    FakeDriver::new()
        .with_device(3, "Hall lamp", "arctech", "selflearning-dimmer")
        .with_device(7, "Porch", "arctech", "codeswitch")
}

#[test]
fn test_enumerates_devices_in_table_order() {
    let driver = lamp_driver();
    let core = TellCore::open(driver.clone());

    assert_eq!(core.device_count().unwrap(), 2);
    assert_eq!(core.device_id(0).unwrap(), 3);
    assert_eq!(core.devices().unwrap(), vec![3, 7]);
}

#[test]
fn test_device_id_out_of_range_is_device_not_found() {
    let core = TellCore::open(lamp_driver());

    let err = core.device_id(9).unwrap_err();
    assert_eq!(err.category(), Some(ResultCategory::DeviceNotFound));
    assert_eq!(err.code(), Some(-3));
    match err {
        Error::Native { operation, message, .. } => {
            assert_eq!(operation, "tdGetDeviceId");
            assert_eq!(message, "Device not found");
        }
        other => panic!("expected a native error, got {other:?}"),
    }
}

#[test]
fn test_names_protocols_and_models() {
    let driver = lamp_driver();
    let core = TellCore::open(driver.clone());

    assert_eq!(core.name(3).unwrap(), "Hall lamp");
    assert_eq!(core.protocol(3).unwrap(), "arctech");
    assert_eq!(core.model(3).unwrap(), "selflearning-dimmer");

    core.set_name(3, "Hallway ☀ lamp").unwrap();
    core.set_protocol(3, "everflourish").unwrap();
    core.set_model(3, "selflearning-switch").unwrap();

    assert_eq!(core.name(3).unwrap(), "Hallway ☀ lamp");
    let device = driver.device(3).unwrap();
    assert_eq!(device.protocol, "everflourish");
    assert_eq!(device.model, "selflearning-switch");
}

#[test]
fn test_setter_failure_maps_to_unknown() {
    let core = TellCore::open(lamp_driver());

    let err = core.set_name(42, "Nowhere").unwrap_err();
    assert_eq!(err.category(), Some(ResultCategory::Unknown));
    assert_eq!(err.code(), Some(-99));
}

#[test]
fn test_interior_nul_never_reaches_driver() {
    let driver = lamp_driver();
    let core = TellCore::open(driver.clone());

    let err = core.set_name(3, "bad\0name").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { name: "name", .. }));
    assert_eq!(driver.count("tdSetName"), 0);
}

#[test]
fn test_device_parameters_with_default() {
    let core = TellCore::open(lamp_driver());

    assert_eq!(core.device_parameter(3, "house", Some("A")).unwrap(), "A");
    assert_eq!(core.device_parameter(3, "house", None).unwrap(), "");

    core.set_device_parameter(3, "house", "B").unwrap();
    assert_eq!(core.device_parameter(3, "house", Some("A")).unwrap(), "B");
}

#[test]
fn test_add_and_remove_device() {
    let driver = lamp_driver();
    let core = TellCore::open(driver.clone());

    let id = core.add_device().unwrap();
    assert_eq!(id, 8);
    assert_eq!(core.device_count().unwrap(), 3);

    core.remove_device(id).unwrap();
    assert!(driver.device(id).is_none());
    assert!(core.remove_device(id).is_err());
}

#[test]
fn test_methods_are_narrowed_by_supported_mask() {
    let core = TellCore::open(lamp_driver());

    let all = core.methods(3, DeviceMethods::ALL).unwrap();
    assert!(all.contains(DeviceMethods::DIM));
    assert!(all.contains(DeviceMethods::TURN_ON | DeviceMethods::TURN_OFF));

    let narrowed = core
        .methods(3, DeviceMethods::TURN_ON | DeviceMethods::TURN_OFF)
        .unwrap();
    assert!(!narrowed.contains(DeviceMethods::DIM));
    assert_eq!(narrowed.bits(), 3);
}

#[test]
fn test_commands_and_last_sent() {
    let driver = lamp_driver();
    let core = TellCore::open(driver.clone());

    core.turn_on(3).unwrap();
    assert_eq!(
        core.last_sent_command(3, DeviceMethods::ALL).unwrap(),
        DeviceMethod::TurnOn
    );

    core.turn_off(3).unwrap();
    assert_eq!(
        core.last_sent_command(3, core.supported_methods()).unwrap(),
        DeviceMethod::TurnOff
    );

    core.dim(3, 128).unwrap();
    assert_eq!(core.last_sent_value(3).unwrap(), "128");
    assert_eq!(
        core.last_sent_command(3, DeviceMethods::ALL).unwrap(),
        DeviceMethod::Dim
    );
}

#[test]
fn test_unsupported_method_is_reported() {
    let core = TellCore::open(lamp_driver());

    let err = core.bell(3).unwrap_err();
    assert_eq!(err.category(), Some(ResultCategory::MethodNotSupported));

    for result in [core.execute(3), core.up(3), core.down(3), core.stop(3), core.learn(3)] {
        assert_eq!(
            result.unwrap_err().category(),
            Some(ResultCategory::MethodNotSupported)
        );
    }
}

#[test]
fn test_command_to_missing_device() {
    let core = TellCore::open(lamp_driver());

    let err = core.turn_on(99).unwrap_err();
    assert_eq!(err.category(), Some(ResultCategory::DeviceNotFound));
}

#[test]
fn test_forced_communication_failure() {
    let driver = lamp_driver();
    let core = TellCore::open(driver.clone());
    driver.fail("tdTurnOn", TELLSTICK_ERROR_COMMUNICATION);

    let err = core.turn_on(3).unwrap_err();
    assert_eq!(err.category(), Some(ResultCategory::CommunicationFailure));
    assert_eq!(
        err.to_string(),
        "tdTurnOn failed: An error occurred while communicating with TellStick \
         (communication failure, code -5)"
    );
}

#[test]
fn test_dim_out_of_range_never_reaches_driver() {
    let driver = lamp_driver();
    let core = TellCore::open(driver.clone());

    for level in [-1, 256, i32::MIN, i32::MAX] {
        let err = core.dim(3, level).unwrap_err();
        assert!(
            matches!(err, Error::InvalidArgument { name: "level", .. }),
            "level {level}: {err:?}"
        );
    }
    assert_eq!(driver.count("tdDim"), 0);
    assert!(driver.dims().is_empty());
}

#[test]
fn test_dim_bounds_reach_driver() {
    let driver = lamp_driver();
    let core = TellCore::open(driver.clone());

    core.dim(3, 0).unwrap();
    core.dim(3, 255).unwrap();

    assert_eq!(driver.count("tdDim"), 2);
    assert_eq!(driver.dims(), vec![(3, 0), (3, 255)]);
}

#[test]
fn test_device_type() {
    let core = TellCore::open(lamp_driver());
    assert_eq!(core.device_type(3).unwrap(), DeviceType::Device);
    assert!(core.device_type(99).is_err());
}

#[test]
fn test_send_raw_command() {
    let driver = lamp_driver();
    let core = TellCore::open(driver.clone());

    core.send_raw_command("S$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$k$}+")
        .unwrap();
    assert_eq!(driver.raw_commands().len(), 1);
    assert!(driver.raw_commands()[0].starts_with("S$k"));
}

#[test]
fn test_sensor_enumeration_stops_at_first_failure() {
    let driver = FakeDriver::new().with_sensor(weather_sensor()).with_sensor({
        let mut sensor = weather_sensor();
        sensor.id = 136;
        sensor.data_types = 1;
        sensor
    });
    let core = TellCore::open(driver.clone());

    let sensors: Vec<_> = core.sensors().collect();
    assert_eq!(sensors.len(), 2);
    assert_eq!(sensors[0].protocol, "fineoffset");
    assert_eq!(sensors[0].model, "temperaturehumidity");
    assert_eq!(sensors[0].id, 135);
    assert!(sensors[0].value_types.contains(SensorValueType::Humidity));
    assert!(!sensors[1].value_types.contains(SensorValueType::Humidity));

    // Two hits plus the terminating miss
    assert_eq!(driver.count("tdSensor"), 3);
}

#[test]
fn test_sensor_names_longer_than_buffer_are_truncated() {
    let mut sensor = weather_sensor();
    sensor.model = "a-model-name-that-is-far-longer-than-thirty-bytes".to_string();
    let core = TellCore::open(FakeDriver::new().with_sensor(sensor));

    let sensors: Vec<_> = core.sensors().collect();
    assert_eq!(sensors[0].model.len(), 29);
}

#[test]
fn test_sensor_value() {
    let core = TellCore::open(FakeDriver::new().with_sensor(weather_sensor()));

    let reading = core
        .sensor_value("fineoffset", "temperaturehumidity", 135, SensorValueType::Temperature)
        .unwrap();
    assert_eq!(reading.value.as_deref(), Some("21.5"));
    assert_eq!(reading.sensor_id, 135);
    assert_eq!(reading.timestamp, 1_700_000_000);
    assert_eq!(
        reading.recorded_at().unwrap().to_rfc3339(),
        "2023-11-14T22:13:20+00:00"
    );

    let err = core
        .sensor_value("fineoffset", "temperaturehumidity", 135, SensorValueType::WindGust)
        .unwrap_err();
    assert_eq!(err.category(), Some(ResultCategory::DeviceNotFound));
}

#[test]
fn test_error_string() {
    let core = TellCore::open(FakeDriver::new());
    assert_eq!(core.error_string(-1), "TellStick not found");
    assert_eq!(core.error_string(-1234), "Unknown error");
}

#[test]
fn test_reading_json_shape() {
    let core = TellCore::open(FakeDriver::new().with_sensor(weather_sensor()));
    let reading = core
        .sensor_value("fineoffset", "temperaturehumidity", 135, SensorValueType::Humidity)
        .unwrap();

    let json = serde_json::to_value(&reading).unwrap();
    assert_eq!(json["value"], "40");
    assert_eq!(json["value_type"], "Humidity");
    assert_eq!(json["sensor_id"], 135);
}
