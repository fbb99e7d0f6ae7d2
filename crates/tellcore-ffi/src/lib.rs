//! TellCore - safe bindings for the telldus-core driver
//!
//! This crate wraps the C ABI of telldus-core, the driver behind TellStick
//! radio transmitters, in owned Rust types: device enumeration, commands,
//! sensors, and driver callbacks delivered to ordinary closures.
//!
//! ```no_run
//! use tellcore_ffi::TellCore;
//!
//! let core = TellCore::open_default()?;
//! core.on_device_state_changed(|event| println!("{event:?}"))?;
//! for id in core.devices()? {
//!     println!("{id}: {}", core.name(id)?);
//! }
//! core.turn_on(7)?;
//! # Ok::<(), tellcore_ffi::Error>(())
//! ```
//!
//! # Safety
//!
//! The `unsafe` surface is confined to [`NativeLibrary`] and the raw
//! buffer helpers in [`memory`]. The safe API guarantees that:
//! - strings the crate allocates are freed after every call, on every path
//! - strings the driver allocates go back through `tdReleaseString` once
//! - callback trampolines stay valid for as long as the driver may call them
//! - all binding-initiated driver calls are serialised

mod client;
mod config;
mod error;
mod events;
mod loader;
pub mod memory;
#[cfg(feature = "async")]
mod nonblocking;
mod session;
pub mod sys;
mod types;

pub use client::Sensors;
pub use config::BindingConfig;
pub use error::{describe, Error, Outcome, Result, ResultCode};
pub use events::{CallbackId, EventKind, Subscription, SubscriptionId, Transition};
pub use loader::{DynamicLibrary, DEFAULT_LIBRARY};
pub use memory::{
    decode, decode_fixed, encode, outstanding_caller_buffers, release_caller_owned,
    release_library_owned, CallerString, LibraryString,
};
#[cfg(feature = "async")]
pub use nonblocking::AsyncTellCore;
pub use session::TellCore;
pub use sys::NativeLibrary;
pub use types::{
    DeviceChange, DeviceChangeType, DeviceChanged, DeviceMethod, DeviceMethods, DeviceStateChanged,
    DeviceType, RawDeviceEvent, ResultCategory, Sensor, SensorEvent, SensorReading,
    SensorValueType, SensorValueTypes,
};
