// Tests for device, sensor and event output

use super::*;
use std::cell::RefCell;
use std::rc::Rc;
use tellcore_ffi::DeviceChangeType;

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

fn writer(format: OutputFormat, quiet: bool) -> (OutputWriter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let out = OutputWriter::with_writer(format, false, quiet, Box::new(buffer.clone()));
    (out, buffer)
}

fn lamp() -> DeviceInfo {
    DeviceInfo {
        id: 1,
        name: "Lamp".to_string(),
        protocol: "arctech".to_string(),
        model: "selflearning-dimmer".to_string(),
        device_type: DeviceType::Device,
        methods: vec![DeviceMethod::TurnOn, DeviceMethod::TurnOff, DeviceMethod::Dim],
        last_command: DeviceMethod::Dim,
        last_value: "128".to_string(),
    }
}

fn temperature() -> SensorReading {
    SensorReading {
        protocol: "fineoffset".to_string(),
        model: "temperaturehumidity".to_string(),
        sensor_id: 135,
        value_type: SensorValueType::Temperature,
        value: Some("21.5".to_string()),
        timestamp: 1_700_000_000,
    }
}

#[test]
fn test_device_table() {
    let (mut out, buffer) = writer(OutputFormat::Human, false);
    out.devices(&[lamp()]).unwrap();

    let text = buffer.contents();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("ID │ NAME"));
    assert!(lines[1].contains("─┼─"));
    assert!(lines[2].contains("arctech/selflearning-dimmer"));
    assert!(lines[2].contains("on,off,dim"));
    assert!(lines[2].ends_with("dim 128"));
}

#[test]
fn test_device_json() {
    let (mut out, buffer) = writer(OutputFormat::Json, false);
    out.devices(&[lamp()]).unwrap();

    let value: serde_json::Value = serde_json::from_str(buffer.contents().trim()).unwrap();
    assert_eq!(value[0]["id"], 1);
    assert_eq!(value[0]["name"], "Lamp");
    assert_eq!(value[0]["methods"], serde_json::json!(["TurnOn", "TurnOff", "Dim"]));
}

#[test]
fn test_empty_lists_respect_quiet() {
    let (mut out, buffer) = writer(OutputFormat::Human, false);
    out.devices(&[]).unwrap();
    assert_eq!(buffer.contents(), "INFO: No devices configured\n");

    let (mut out, buffer) = writer(OutputFormat::Human, true);
    out.sensors(&[]).unwrap();
    assert_eq!(buffer.contents(), "");
}

#[test]
fn test_sensor_rows_per_reading() {
    let mut humidity = temperature();
    humidity.value_type = SensorValueType::Humidity;
    humidity.value = Some("40".to_string());
    let sensor = SensorInfo {
        protocol: "fineoffset".to_string(),
        model: "temperaturehumidity".to_string(),
        id: 135,
        readings: vec![temperature(), humidity],
    };

    let (mut out, buffer) = writer(OutputFormat::Human, false);
    out.sensors(&[sensor]).unwrap();

    let text = buffer.contents();
    assert!(text.contains("21.5 °C"));
    assert!(text.contains("40 %"));
    assert!(text.contains("2023-11-14 22:13:20"));
    assert_eq!(text.lines().count(), 4);
}

#[test]
fn test_missing_reading_value() {
    let mut reading = temperature();
    reading.value = None;
    assert_eq!(reading_value(&reading), "-");
}

#[test]
fn test_event_lines() {
    let state = Event::DeviceState(DeviceStateChanged {
        device_id: 7,
        method: DeviceMethod::TurnOn,
        data: Some("ON".to_string()),
    });
    assert_eq!(format_event_human(&state), "device 7: on (ON)");

    let changed = Event::DeviceChanged(DeviceChanged {
        device_id: 3,
        change: DeviceChange::Changed,
        change_type: DeviceChangeType::Name,
    });
    assert_eq!(format_event_human(&changed), "device 3: changed name");

    let raw = Event::Raw(RawDeviceEvent {
        controller_id: 1,
        data: Some("class:command;protocol:arctech;".to_string()),
    });
    assert_eq!(
        format_event_human(&raw),
        "raw [controller 1]: class:command;protocol:arctech;"
    );

    assert_eq!(
        format_event_human(&Event::Sensor(temperature())),
        "sensor fineoffset/temperaturehumidity 135: temperature = 21.5 °C"
    );
}

#[test]
fn test_events_are_json_lines_even_when_pretty() {
    let (mut out, buffer) = writer(OutputFormat::JsonPretty, false);
    out.event(&Event::Sensor(temperature())).unwrap();
    out.event(&Event::Raw(RawDeviceEvent {
        controller_id: 2,
        data: None,
    }))
    .unwrap();

    let text = buffer.contents();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["kind"], "sensor");
    assert_eq!(lines[0]["sensor_id"], 135);
    assert_eq!(lines[1]["kind"], "raw");
    assert_eq!(lines[1]["controller_id"], 2);
}

#[test]
fn test_messages_are_suppressed_for_json() {
    let (mut out, buffer) = writer(OutputFormat::Json, false);
    out.info("hello").unwrap();
    out.success("done").unwrap();
    out.warning("careful").unwrap();
    assert_eq!(buffer.contents(), "");
}

#[test]
fn test_last_command_labels() {
    assert_eq!(last_command_label(DeviceMethod::Unknown(0), ""), "-");
    assert_eq!(last_command_label(DeviceMethod::TurnOff, ""), "off");
    assert_eq!(last_command_label(DeviceMethod::Dim, ""), "dim");
}
