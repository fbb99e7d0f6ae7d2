//! Device operations
//!
//! Every method follows the same path: encode string inputs, take the
//! session lock, call the entry point, decode and release any driver
//! string, classify the result. Caller-owned buffers are dropped on every
//! exit path, including failures.

use std::os::raw::{c_char, c_int};

use crate::error::{check, check_bool, describe, Error, Result};
use crate::memory::{decode_fixed, encode_arg, LibraryString};
use crate::session::TellCore;
use crate::sys::{NativeLibrary, MODEL_CAPACITY, PROTOCOL_CAPACITY, TELLSTICK_SUCCESS, VALUE_CAPACITY};
use crate::types::{
    DeviceMethod, DeviceMethods, DeviceType, Sensor, SensorReading, SensorValueType,
    SensorValueTypes,
};

/// Take a driver-returned string, release it, and decode it. A null return
/// reads as empty.
unsafe fn take_string<L: NativeLibrary>(lib: &L, ptr: *mut c_char) -> String {
    LibraryString::from_raw(lib, ptr)
        .into_string()
        .unwrap_or_default()
}

impl<L: NativeLibrary> TellCore<L> {
    /// Number of entries in the driver's device table
    pub fn device_count(&self) -> Result<i32> {
        self.session.call("tdGetNumberOfDevices", |lib| {
            let count = unsafe { lib.td_get_number_of_devices() };
            check(lib, "tdGetNumberOfDevices", count)
        })
    }

    /// Device id at table position `index`
    pub fn device_id(&self, index: i32) -> Result<i32> {
        self.session.call("tdGetDeviceId", |lib| {
            let id = unsafe { lib.td_get_device_id(index) };
            check(lib, "tdGetDeviceId", id)
        })
    }

    /// Ids of every device, in table order
    pub fn devices(&self) -> Result<Vec<i32>> {
        let count = self.device_count()?;
        (0..count).map(|index| self.device_id(index)).collect()
    }

    pub fn name(&self, device_id: i32) -> Result<String> {
        Ok(self.session.call("tdGetName", |lib| unsafe {
            take_string(lib, lib.td_get_name(device_id))
        }))
    }

    pub fn set_name(&self, device_id: i32, name: &str) -> Result<()> {
        let name = encode_arg("name", Some(name))?;
        self.session.call("tdSetName", |lib| {
            let ok = unsafe { lib.td_set_name(device_id, name.as_ptr()) };
            check_bool(lib, "tdSetName", ok)
        })
    }

    pub fn protocol(&self, device_id: i32) -> Result<String> {
        Ok(self.session.call("tdGetProtocol", |lib| unsafe {
            take_string(lib, lib.td_get_protocol(device_id))
        }))
    }

    pub fn set_protocol(&self, device_id: i32, protocol: &str) -> Result<()> {
        let protocol = encode_arg("protocol", Some(protocol))?;
        self.session.call("tdSetProtocol", |lib| {
            let ok = unsafe { lib.td_set_protocol(device_id, protocol.as_ptr()) };
            check_bool(lib, "tdSetProtocol", ok)
        })
    }

    pub fn model(&self, device_id: i32) -> Result<String> {
        Ok(self.session.call("tdGetModel", |lib| unsafe {
            take_string(lib, lib.td_get_model(device_id))
        }))
    }

    pub fn set_model(&self, device_id: i32, model: &str) -> Result<()> {
        let model = encode_arg("model", Some(model))?;
        self.session.call("tdSetModel", |lib| {
            let ok = unsafe { lib.td_set_model(device_id, model.as_ptr()) };
            check_bool(lib, "tdSetModel", ok)
        })
    }

    /// Read a protocol parameter such as `house` or `unit`, falling back to
    /// `default_value` when the device has none
    pub fn device_parameter(
        &self,
        device_id: i32,
        name: &str,
        default_value: Option<&str>,
    ) -> Result<String> {
        let name = encode_arg("name", Some(name))?;
        let default_value = encode_arg("default_value", default_value)?;
        Ok(self.session.call("tdGetDeviceParameter", |lib| unsafe {
            take_string(
                lib,
                lib.td_get_device_parameter(device_id, name.as_ptr(), default_value.as_ptr()),
            )
        }))
    }

    pub fn set_device_parameter(&self, device_id: i32, name: &str, value: &str) -> Result<()> {
        let name = encode_arg("name", Some(name))?;
        let value = encode_arg("value", Some(value))?;
        self.session.call("tdSetDeviceParameter", |lib| {
            let ok = unsafe { lib.td_set_device_parameter(device_id, name.as_ptr(), value.as_ptr()) };
            check_bool(lib, "tdSetDeviceParameter", ok)
        })
    }

    /// Create an empty device and return its id
    pub fn add_device(&self) -> Result<i32> {
        let id = self.session.call("tdAddDevice", |lib| {
            let id = unsafe { lib.td_add_device() };
            check(lib, "tdAddDevice", id)
        })?;
        tracing::info!(device_id = id, "Added device");
        Ok(id)
    }

    pub fn remove_device(&self, device_id: i32) -> Result<()> {
        self.session.call("tdRemoveDevice", |lib| {
            let ok = unsafe { lib.td_remove_device(device_id) };
            check_bool(lib, "tdRemoveDevice", ok)
        })?;
        tracing::info!(device_id, "Removed device");
        Ok(())
    }

    /// Methods the device accepts, narrowed to `supported`
    pub fn methods(&self, device_id: i32, supported: DeviceMethods) -> Result<DeviceMethods> {
        self.session.call("tdMethods", |lib| {
            let bits = unsafe { lib.td_methods(device_id, supported.bits()) };
            check(lib, "tdMethods", bits).map(DeviceMethods::from_bits)
        })
    }

    pub fn turn_on(&self, device_id: i32) -> Result<()> {
        self.command("tdTurnOn", device_id, |lib| unsafe { lib.td_turn_on(device_id) })
    }

    pub fn turn_off(&self, device_id: i32) -> Result<()> {
        self.command("tdTurnOff", device_id, |lib| unsafe { lib.td_turn_off(device_id) })
    }

    pub fn bell(&self, device_id: i32) -> Result<()> {
        self.command("tdBell", device_id, |lib| unsafe { lib.td_bell(device_id) })
    }

    /// Dim to `level`, which must lie in `0..=255`
    pub fn dim(&self, device_id: i32, level: i32) -> Result<()> {
        let level = u8::try_from(level).map_err(|_| {
            Error::invalid_argument("level", format!("{level} is outside 0..=255"))
        })?;
        self.command("tdDim", device_id, |lib| unsafe { lib.td_dim(device_id, level) })
    }

    /// Run a scene
    pub fn execute(&self, device_id: i32) -> Result<()> {
        self.command("tdExecute", device_id, |lib| unsafe { lib.td_execute(device_id) })
    }

    pub fn up(&self, device_id: i32) -> Result<()> {
        self.command("tdUp", device_id, |lib| unsafe { lib.td_up(device_id) })
    }

    pub fn down(&self, device_id: i32) -> Result<()> {
        self.command("tdDown", device_id, |lib| unsafe { lib.td_down(device_id) })
    }

    pub fn stop(&self, device_id: i32) -> Result<()> {
        self.command("tdStop", device_id, |lib| unsafe { lib.td_stop(device_id) })
    }

    /// Send the device's learn signal so a receiver can pair with it
    pub fn learn(&self, device_id: i32) -> Result<()> {
        self.command("tdLearn", device_id, |lib| unsafe { lib.td_learn(device_id) })
    }

    fn command(
        &self,
        operation: &'static str,
        device_id: i32,
        f: impl FnOnce(&L) -> c_int,
    ) -> Result<()> {
        self.session.call(operation, |lib| {
            let code = f(lib);
            tracing::debug!(operation, device_id, code, "Sent command");
            check(lib, operation, code).map(|_| ())
        })
    }

    /// The last command sent to the device, among those in `supported`
    pub fn last_sent_command(&self, device_id: i32, supported: DeviceMethods) -> Result<DeviceMethod> {
        self.session.call("tdLastSentCommand", |lib| {
            let code = unsafe { lib.td_last_sent_command(device_id, supported.bits()) };
            check(lib, "tdLastSentCommand", code).map(DeviceMethod::from_code)
        })
    }

    /// Value that accompanied the last command, e.g. a dim level
    pub fn last_sent_value(&self, device_id: i32) -> Result<String> {
        Ok(self.session.call("tdLastSentValue", |lib| unsafe {
            take_string(lib, lib.td_last_sent_value(device_id))
        }))
    }

    pub fn device_type(&self, device_id: i32) -> Result<DeviceType> {
        self.session.call("tdGetDeviceType", |lib| {
            let code = unsafe { lib.td_get_device_type(device_id) };
            check(lib, "tdGetDeviceType", code).map(DeviceType::from_code)
        })
    }

    /// Transmit a protocol-level command string as-is
    pub fn send_raw_command(&self, command: &str) -> Result<()> {
        let command = encode_arg("command", Some(command))?;
        self.session.call("tdSendRawCommand", |lib| {
            let code = unsafe { lib.td_send_raw_command(command.as_ptr(), 0) };
            check(lib, "tdSendRawCommand", code).map(|_| ())
        })
    }

    /// Sensors the driver has heard from.
    ///
    /// Each step makes one `tdSensor` call; iteration ends at the first
    /// result that is not success.
    pub fn sensors(&self) -> Sensors<'_, L> {
        Sensors {
            client: self,
            done: false,
        }
    }

    /// Latest value of one type from one sensor
    pub fn sensor_value(
        &self,
        protocol: &str,
        model: &str,
        sensor_id: i32,
        value_type: SensorValueType,
    ) -> Result<SensorReading> {
        let protocol_arg = encode_arg("protocol", Some(protocol))?;
        let model_arg = encode_arg("model", Some(model))?;
        let mut value = [0u8; VALUE_CAPACITY];
        let mut timestamp: c_int = 0;

        self.session.call("tdSensorValue", |lib| {
            let code = unsafe {
                lib.td_sensor_value(
                    protocol_arg.as_ptr(),
                    model_arg.as_ptr(),
                    sensor_id,
                    value_type.code(),
                    value.as_mut_ptr().cast::<c_char>(),
                    VALUE_CAPACITY as c_int,
                    &mut timestamp,
                )
            };
            check(lib, "tdSensorValue", code)
        })?;

        let value = decode_fixed(&value);
        Ok(SensorReading {
            protocol: protocol.to_string(),
            model: model.to_string(),
            sensor_id,
            value_type,
            value: (!value.is_empty()).then_some(value),
            timestamp: i64::from(timestamp),
        })
    }

    /// The driver's message for a result code
    pub fn error_string(&self, code: i32) -> String {
        self.session.call("tdGetErrorString", |lib| describe(lib, code))
    }
}

/// Iterator over [`TellCore::sensors`]
pub struct Sensors<'a, L: NativeLibrary> {
    client: &'a TellCore<L>,
    done: bool,
}

impl<L: NativeLibrary> Iterator for Sensors<'_, L> {
    type Item = Sensor;

    fn next(&mut self) -> Option<Sensor> {
        if self.done {
            return None;
        }

        let mut protocol = [0u8; PROTOCOL_CAPACITY];
        let mut model = [0u8; MODEL_CAPACITY];
        let mut id: c_int = 0;
        let mut data_types: c_int = 0;

        let code = self.client.session.call("tdSensor", |lib| unsafe {
            lib.td_sensor(
                protocol.as_mut_ptr().cast::<c_char>(),
                PROTOCOL_CAPACITY as c_int,
                model.as_mut_ptr().cast::<c_char>(),
                MODEL_CAPACITY as c_int,
                &mut id,
                &mut data_types,
            )
        });

        if code != TELLSTICK_SUCCESS {
            tracing::debug!(code, "Sensor enumeration finished");
            self.done = true;
            return None;
        }

        Some(Sensor {
            protocol: decode_fixed(&protocol),
            model: decode_fixed(&model),
            id,
            value_types: SensorValueTypes::from_bits(data_types),
        })
    }
}

impl<L: NativeLibrary> std::iter::FusedIterator for Sensors<'_, L> {}
