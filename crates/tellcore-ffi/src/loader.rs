//! Runtime loading of the telldus-core shared library
//!
//! Every entry point is resolved when the library is opened, so a driver
//! build missing a symbol fails at load rather than at first use.

use std::ffi::OsStr;
use std::os::raw::{c_char, c_int, c_uchar, c_void};
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::{Error, Result};
use crate::sys::{
    DeviceChangeEventFn, DeviceEventFn, NativeLibrary, RawDeviceEventFn, SensorEventFn,
};

/// File name the driver installs under on this platform
#[cfg(target_os = "windows")]
pub const DEFAULT_LIBRARY: &str = "TelldusCore.dll";
#[cfg(target_os = "macos")]
pub const DEFAULT_LIBRARY: &str = "libtelldus-core.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DEFAULT_LIBRARY: &str = "libtelldus-core.so";

macro_rules! entry_points {
    ($($field:ident: $symbol:literal => $ty:ty,)*) => {
        /// Resolved driver entry points
        struct EntryPoints {
            $($field: $ty,)*
        }

        impl EntryPoints {
            /// # Safety
            /// The symbols must have the declared signatures.
            unsafe fn resolve(library: &Library, path: &Path) -> Result<Self> {
                Ok(Self {
                    $($field: *library
                        .get::<$ty>(concat!($symbol, "\0").as_bytes())
                        .map_err(|source| Error::Load {
                            path: path.to_path_buf(),
                            source,
                        })?,)*
                })
            }
        }
    };
}

entry_points! {
    init: "tdInit" => unsafe extern "system" fn(),
    close: "tdClose" => unsafe extern "system" fn(),
    release_string: "tdReleaseString" => unsafe extern "system" fn(*mut c_char),
    get_error_string: "tdGetErrorString" => unsafe extern "system" fn(c_int) -> *mut c_char,
    get_number_of_devices: "tdGetNumberOfDevices" => unsafe extern "system" fn() -> c_int,
    get_device_id: "tdGetDeviceId" => unsafe extern "system" fn(c_int) -> c_int,
    get_name: "tdGetName" => unsafe extern "system" fn(c_int) -> *mut c_char,
    set_name: "tdSetName" => unsafe extern "system" fn(c_int, *const c_char) -> bool,
    get_protocol: "tdGetProtocol" => unsafe extern "system" fn(c_int) -> *mut c_char,
    set_protocol: "tdSetProtocol" => unsafe extern "system" fn(c_int, *const c_char) -> bool,
    get_model: "tdGetModel" => unsafe extern "system" fn(c_int) -> *mut c_char,
    set_model: "tdSetModel" => unsafe extern "system" fn(c_int, *const c_char) -> bool,
    get_device_parameter: "tdGetDeviceParameter" =>
        unsafe extern "system" fn(c_int, *const c_char, *const c_char) -> *mut c_char,
    set_device_parameter: "tdSetDeviceParameter" =>
        unsafe extern "system" fn(c_int, *const c_char, *const c_char) -> bool,
    add_device: "tdAddDevice" => unsafe extern "system" fn() -> c_int,
    remove_device: "tdRemoveDevice" => unsafe extern "system" fn(c_int) -> bool,
    methods: "tdMethods" => unsafe extern "system" fn(c_int, c_int) -> c_int,
    turn_on: "tdTurnOn" => unsafe extern "system" fn(c_int) -> c_int,
    turn_off: "tdTurnOff" => unsafe extern "system" fn(c_int) -> c_int,
    bell: "tdBell" => unsafe extern "system" fn(c_int) -> c_int,
    dim: "tdDim" => unsafe extern "system" fn(c_int, c_uchar) -> c_int,
    execute: "tdExecute" => unsafe extern "system" fn(c_int) -> c_int,
    up: "tdUp" => unsafe extern "system" fn(c_int) -> c_int,
    down: "tdDown" => unsafe extern "system" fn(c_int) -> c_int,
    stop: "tdStop" => unsafe extern "system" fn(c_int) -> c_int,
    learn: "tdLearn" => unsafe extern "system" fn(c_int) -> c_int,
    last_sent_command: "tdLastSentCommand" => unsafe extern "system" fn(c_int, c_int) -> c_int,
    last_sent_value: "tdLastSentValue" => unsafe extern "system" fn(c_int) -> *mut c_char,
    get_device_type: "tdGetDeviceType" => unsafe extern "system" fn(c_int) -> c_int,
    send_raw_command: "tdSendRawCommand" => unsafe extern "system" fn(*const c_char, c_int) -> c_int,
    sensor: "tdSensor" => unsafe extern "system" fn(
        *mut c_char, c_int, *mut c_char, c_int, *mut c_int, *mut c_int,
    ) -> c_int,
    sensor_value: "tdSensorValue" => unsafe extern "system" fn(
        *const c_char, *const c_char, c_int, c_int, *mut c_char, c_int, *mut c_int,
    ) -> c_int,
    register_device_event: "tdRegisterDeviceEvent" =>
        unsafe extern "system" fn(DeviceEventFn, *mut c_void) -> c_int,
    register_device_change_event: "tdRegisterDeviceChangeEvent" =>
        unsafe extern "system" fn(DeviceChangeEventFn, *mut c_void) -> c_int,
    register_raw_device_event: "tdRegisterRawDeviceEvent" =>
        unsafe extern "system" fn(RawDeviceEventFn, *mut c_void) -> c_int,
    register_sensor_event: "tdRegisterSensorEvent" =>
        unsafe extern "system" fn(SensorEventFn, *mut c_void) -> c_int,
    unregister_callback: "tdUnregisterCallback" => unsafe extern "system" fn(c_int) -> c_int,
}

/// The telldus-core driver, opened from a shared library
pub struct DynamicLibrary {
    api: EntryPoints,
    path: PathBuf,
    // Keeps every resolved pointer in `api` valid
    _library: Library,
}

impl DynamicLibrary {
    /// Open the driver at `path` and resolve its entry points
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Loading driver library");

        let library = unsafe { Library::new(path) }.map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let api = unsafe { EntryPoints::resolve(&library, path)? };

        Ok(Self {
            api,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    /// Open the driver by its platform file name, through the system's
    /// library search path
    pub fn load_default() -> Result<Self> {
        Self::load(OsStr::new(DEFAULT_LIBRARY))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl NativeLibrary for DynamicLibrary {
    unsafe fn td_init(&self) {
        (self.api.init)()
    }

    unsafe fn td_close(&self) {
        (self.api.close)()
    }

    unsafe fn td_release_string(&self, value: *mut c_char) {
        (self.api.release_string)(value)
    }

    unsafe fn td_get_error_string(&self, code: c_int) -> *mut c_char {
        (self.api.get_error_string)(code)
    }

    unsafe fn td_get_number_of_devices(&self) -> c_int {
        (self.api.get_number_of_devices)()
    }

    unsafe fn td_get_device_id(&self, index: c_int) -> c_int {
        (self.api.get_device_id)(index)
    }

    unsafe fn td_get_name(&self, device_id: c_int) -> *mut c_char {
        (self.api.get_name)(device_id)
    }

    unsafe fn td_set_name(&self, device_id: c_int, name: *const c_char) -> bool {
        (self.api.set_name)(device_id, name)
    }

    unsafe fn td_get_protocol(&self, device_id: c_int) -> *mut c_char {
        (self.api.get_protocol)(device_id)
    }

    unsafe fn td_set_protocol(&self, device_id: c_int, protocol: *const c_char) -> bool {
        (self.api.set_protocol)(device_id, protocol)
    }

    unsafe fn td_get_model(&self, device_id: c_int) -> *mut c_char {
        (self.api.get_model)(device_id)
    }

    unsafe fn td_set_model(&self, device_id: c_int, model: *const c_char) -> bool {
        (self.api.set_model)(device_id, model)
    }

    unsafe fn td_get_device_parameter(
        &self,
        device_id: c_int,
        name: *const c_char,
        default_value: *const c_char,
    ) -> *mut c_char {
        (self.api.get_device_parameter)(device_id, name, default_value)
    }

    unsafe fn td_set_device_parameter(
        &self,
        device_id: c_int,
        name: *const c_char,
        value: *const c_char,
    ) -> bool {
        (self.api.set_device_parameter)(device_id, name, value)
    }

    unsafe fn td_add_device(&self) -> c_int {
        (self.api.add_device)()
    }

    unsafe fn td_remove_device(&self, device_id: c_int) -> bool {
        (self.api.remove_device)(device_id)
    }

    unsafe fn td_methods(&self, device_id: c_int, methods_supported: c_int) -> c_int {
        (self.api.methods)(device_id, methods_supported)
    }

    unsafe fn td_turn_on(&self, device_id: c_int) -> c_int {
        (self.api.turn_on)(device_id)
    }

    unsafe fn td_turn_off(&self, device_id: c_int) -> c_int {
        (self.api.turn_off)(device_id)
    }

    unsafe fn td_bell(&self, device_id: c_int) -> c_int {
        (self.api.bell)(device_id)
    }

    unsafe fn td_dim(&self, device_id: c_int, level: c_uchar) -> c_int {
        (self.api.dim)(device_id, level)
    }

    unsafe fn td_execute(&self, device_id: c_int) -> c_int {
        (self.api.execute)(device_id)
    }

    unsafe fn td_up(&self, device_id: c_int) -> c_int {
        (self.api.up)(device_id)
    }

    unsafe fn td_down(&self, device_id: c_int) -> c_int {
        (self.api.down)(device_id)
    }

    unsafe fn td_stop(&self, device_id: c_int) -> c_int {
        (self.api.stop)(device_id)
    }

    unsafe fn td_learn(&self, device_id: c_int) -> c_int {
        (self.api.learn)(device_id)
    }

    unsafe fn td_last_sent_command(&self, device_id: c_int, methods_supported: c_int) -> c_int {
        (self.api.last_sent_command)(device_id, methods_supported)
    }

    unsafe fn td_last_sent_value(&self, device_id: c_int) -> *mut c_char {
        (self.api.last_sent_value)(device_id)
    }

    unsafe fn td_get_device_type(&self, device_id: c_int) -> c_int {
        (self.api.get_device_type)(device_id)
    }

    unsafe fn td_send_raw_command(&self, command: *const c_char, reserved: c_int) -> c_int {
        (self.api.send_raw_command)(command, reserved)
    }

    unsafe fn td_sensor(
        &self,
        protocol: *mut c_char,
        protocol_len: c_int,
        model: *mut c_char,
        model_len: c_int,
        id: *mut c_int,
        data_types: *mut c_int,
    ) -> c_int {
        (self.api.sensor)(protocol, protocol_len, model, model_len, id, data_types)
    }

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
    ) -> c_int {
        (self.api.sensor_value)(protocol, model, id, data_type, value, len, timestamp)
    }

    unsafe fn td_register_device_event(&self, callback: DeviceEventFn, context: *mut c_void) -> c_int {
        (self.api.register_device_event)(callback, context)
    }

    unsafe fn td_register_device_change_event(
        &self,
        callback: DeviceChangeEventFn,
        context: *mut c_void,
    ) -> c_int {
        (self.api.register_device_change_event)(callback, context)
    }

    unsafe fn td_register_raw_device_event(
        &self,
        callback: RawDeviceEventFn,
        context: *mut c_void,
    ) -> c_int {
        (self.api.register_raw_device_event)(callback, context)
    }

    unsafe fn td_register_sensor_event(&self, callback: SensorEventFn, context: *mut c_void) -> c_int {
        (self.api.register_sensor_event)(callback, context)
    }

    unsafe fn td_unregister_callback(&self, callback_id: c_int) -> c_int {
        (self.api.unregister_callback)(callback_id)
    }
}
