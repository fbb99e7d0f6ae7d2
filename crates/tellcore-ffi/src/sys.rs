//! Raw entry points of the telldus-core driver
//!
//! This module describes the C ABI exactly as the driver exports it:
//! callback signatures, buffer capacities and the [`NativeLibrary`] table
//! through which every other module reaches the driver. Nothing here
//! marshals or validates; see [`crate::memory`] and [`crate::client`].

use std::os::raw::{c_char, c_int, c_uchar, c_void};

/// Return code of a successful call.
pub const TELLSTICK_SUCCESS: c_int = 0;

/// Generic failure code used by the driver for unenumerated errors.
pub const TELLSTICK_ERROR_UNKNOWN: c_int = -99;

/// Capacity of the protocol buffer handed to `tdSensor`.
pub const PROTOCOL_CAPACITY: usize = 20;

/// Capacity of the model buffer handed to `tdSensor`.
pub const MODEL_CAPACITY: usize = 30;

/// Capacity of the value buffer handed to `tdSensorValue`.
pub const VALUE_CAPACITY: usize = 20;

/// `void (int deviceId, int method, const char *data, int callbackId, void *context)`
pub type DeviceEventFn =
    unsafe extern "system" fn(c_int, c_int, *const c_char, c_int, *mut c_void);

/// `void (int deviceId, int changeEvent, int changeType, int callbackId, void *context)`
pub type DeviceChangeEventFn =
    unsafe extern "system" fn(c_int, c_int, c_int, c_int, *mut c_void);

/// `void (const char *data, int controllerId, int callbackId, void *context)`
pub type RawDeviceEventFn = unsafe extern "system" fn(*const c_char, c_int, c_int, *mut c_void);

/// `void (const char *protocol, const char *model, int id, int dataType,
/// const char *value, int timestamp, int callbackId, void *context)`
pub type SensorEventFn = unsafe extern "system" fn(
    *const c_char,
    *const c_char,
    c_int,
    c_int,
    *const c_char,
    c_int,
    c_int,
    *mut c_void,
);

/// The driver's entry point table.
///
/// [`crate::DynamicLibrary`] resolves these from the shared library at load
/// time; test suites implement the trait with an in-process fake. Method
/// names mirror the exported symbols (`td_get_name` is `tdGetName`).
///
/// # Safety
///
/// Every method is a raw foreign call. Callers must pass pointers that are
/// either null (where the driver accepts null) or point to NUL-terminated
/// buffers that outlive the call, and must release every returned string
/// with [`NativeLibrary::td_release_string`] exactly once. Implementations
/// must be callable from any thread, because callback dispatch releases
/// strings on the driver's own event thread.
pub trait NativeLibrary: Send + Sync + 'static {
    unsafe fn td_init(&self);
    unsafe fn td_close(&self);
    unsafe fn td_release_string(&self, value: *mut c_char);
    unsafe fn td_get_error_string(&self, code: c_int) -> *mut c_char;

    unsafe fn td_get_number_of_devices(&self) -> c_int;
    unsafe fn td_get_device_id(&self, index: c_int) -> c_int;
    unsafe fn td_get_name(&self, device_id: c_int) -> *mut c_char;
    unsafe fn td_set_name(&self, device_id: c_int, name: *const c_char) -> bool;
    unsafe fn td_get_protocol(&self, device_id: c_int) -> *mut c_char;
    unsafe fn td_set_protocol(&self, device_id: c_int, protocol: *const c_char) -> bool;
    unsafe fn td_get_model(&self, device_id: c_int) -> *mut c_char;
    unsafe fn td_set_model(&self, device_id: c_int, model: *const c_char) -> bool;
    unsafe fn td_get_device_parameter(
        &self,
        device_id: c_int,
        name: *const c_char,
        default_value: *const c_char,
    ) -> *mut c_char;
    unsafe fn td_set_device_parameter(
        &self,
        device_id: c_int,
        name: *const c_char,
        value: *const c_char,
    ) -> bool;
    unsafe fn td_add_device(&self) -> c_int;
    unsafe fn td_remove_device(&self, device_id: c_int) -> bool;

    unsafe fn td_methods(&self, device_id: c_int, methods_supported: c_int) -> c_int;
    unsafe fn td_turn_on(&self, device_id: c_int) -> c_int;
    unsafe fn td_turn_off(&self, device_id: c_int) -> c_int;
    unsafe fn td_bell(&self, device_id: c_int) -> c_int;
    unsafe fn td_dim(&self, device_id: c_int, level: c_uchar) -> c_int;
    unsafe fn td_execute(&self, device_id: c_int) -> c_int;
    unsafe fn td_up(&self, device_id: c_int) -> c_int;
    unsafe fn td_down(&self, device_id: c_int) -> c_int;
    unsafe fn td_stop(&self, device_id: c_int) -> c_int;
    unsafe fn td_learn(&self, device_id: c_int) -> c_int;
    unsafe fn td_last_sent_command(&self, device_id: c_int, methods_supported: c_int) -> c_int;
    unsafe fn td_last_sent_value(&self, device_id: c_int) -> *mut c_char;
    unsafe fn td_get_device_type(&self, device_id: c_int) -> c_int;
    unsafe fn td_send_raw_command(&self, command: *const c_char, reserved: c_int) -> c_int;

    unsafe fn td_sensor(
        &self,
        protocol: *mut c_char,
        protocol_len: c_int,
        model: *mut c_char,
        model_len: c_int,
        id: *mut c_int,
        data_types: *mut c_int,
    ) -> c_int;
    #[allow(clippy::too_many_arguments)]
    unsafe fn td_sensor_value(
        &self,
        protocol: *const c_char,
        model: *const c_char,
        id: c_int,
        data_type: c_int,
        value: *mut c_char,
        len: c_int,
        timestamp: *mut c_int,
    ) -> c_int;

    unsafe fn td_register_device_event(&self, callback: DeviceEventFn, context: *mut c_void)
        -> c_int;
    unsafe fn td_register_device_change_event(
        &self,
        callback: DeviceChangeEventFn,
        context: *mut c_void,
    ) -> c_int;
    unsafe fn td_register_raw_device_event(
        &self,
        callback: RawDeviceEventFn,
        context: *mut c_void,
    ) -> c_int;
    unsafe fn td_register_sensor_event(&self, callback: SensorEventFn, context: *mut c_void)
        -> c_int;
    unsafe fn td_unregister_callback(&self, callback_id: c_int) -> c_int;
}
