//! Bridge from driver callbacks to Rust subscribers
//!
//! Each event kind is registered with the driver at most once per session.
//! The first subscriber triggers the native registration and the last one
//! to leave triggers the unregistration; everyone in between shares it.
//!
//! The function handed to the driver is a generic `extern "system"`
//! trampoline, so its address is static. Its context pointer is the
//! address of an `Arc<Dispatcher>` that the session keeps alive until it is
//! dropped, which is after every registration has been withdrawn.

use std::os::raw::{c_char, c_int, c_void};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{catch_callback_panic, check, Result};
use crate::memory::LibraryString;
use crate::session::{Session, TellCore};
use crate::sys::NativeLibrary;
use crate::types::{
    DeviceChange, DeviceChangeType, DeviceChanged, DeviceMethod, DeviceStateChanged,
    RawDeviceEvent, SensorEvent, SensorReading, SensorValueType,
};

/// The callback families the driver offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    DeviceStateChanged,
    DeviceChanged,
    RawDeviceEvent,
    Sensor,
}

impl EventKind {
    /// Name of the driver entry point that registers this kind
    pub fn register_symbol(self) -> &'static str {
        match self {
            Self::DeviceStateChanged => "tdRegisterDeviceEvent",
            Self::DeviceChanged => "tdRegisterDeviceChangeEvent",
            Self::RawDeviceEvent => "tdRegisterRawDeviceEvent",
            Self::Sensor => "tdRegisterSensorEvent",
        }
    }
}

/// Driver-issued id of one callback registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub i32);

/// Handle returned by the `on_*` methods, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    kind: EventKind,
    id: u64,
}

impl SubscriptionId {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// What an attach or detach did to the native registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Registered(CallbackId),
    Unregistered(CallbackId),
    Unchanged,
}

/// A new subscriber and what attaching it did to the native registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub transition: Transition,
}

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Subscribers of one event kind. The trampoline reaches this through the
/// context pointer, on the driver's thread.
pub(crate) struct Dispatcher<E, L> {
    lib: Arc<L>,
    subscribers: Mutex<Vec<(u64, Handler<E>)>>,
}

impl<E: NativeEvent, L: NativeLibrary> Dispatcher<E, L> {
    fn new(lib: Arc<L>) -> Self {
        Self {
            lib,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn attach(&self, id: u64, handler: Handler<E>) {
        lock(&self.subscribers).push((id, handler));
    }

    /// Returns `Some(true)` when the last subscriber left, `None` when `id`
    /// was not subscribed
    fn detach(&self, id: u64) -> Option<bool> {
        let mut subscribers = lock(&self.subscribers);
        let position = subscribers.iter().position(|(sub, _)| *sub == id)?;
        subscribers.remove(position);
        Some(subscribers.is_empty())
    }

    fn clear(&self) {
        lock(&self.subscribers).clear();
    }

    /// Notify subscribers in attach order. The list lock is not held while
    /// handlers run, so a handler may unsubscribe.
    fn notify(&self, event: &E) {
        let snapshot: Vec<Handler<E>> = lock(&self.subscribers)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in snapshot {
            catch_callback_panic(E::NAME, AssertUnwindSafe(|| handler(event)));
        }
    }
}

/// An event record with a native registration entry point and trampoline
pub(crate) trait NativeEvent: Sized + Send + Sync + 'static {
    const KIND: EventKind;
    const NAME: &'static str;

    /// Register this kind's trampoline with `context` as its user data.
    ///
    /// # Safety
    /// `context` must point to a live `Dispatcher<Self, L>` for as long as
    /// the registration is outstanding.
    unsafe fn register<L: NativeLibrary>(lib: &L, context: *mut c_void) -> c_int;
}

/// # Safety
/// `context` must be the pointer given to `register`, and the driver must
/// not have been told to unregister it.
unsafe fn dispatcher<'a, E, L>(context: *mut c_void) -> &'a Dispatcher<E, L> {
    &*(context as *const Dispatcher<E, L>)
}

unsafe extern "system" fn device_event_trampoline<L: NativeLibrary>(
    device_id: c_int,
    method: c_int,
    data: *const c_char,
    _callback_id: c_int,
    context: *mut c_void,
) {
    catch_callback_panic(DeviceStateChanged::NAME, AssertUnwindSafe(|| {
        let dispatcher = unsafe { dispatcher::<DeviceStateChanged, L>(context) };
        let data = unsafe { LibraryString::from_raw(&*dispatcher.lib, data as *mut c_char) };
        let event = DeviceStateChanged {
            device_id,
            method: DeviceMethod::from_code(method),
            data: data.to_string_lossy(),
        };
        dispatcher.notify(&event);
    }));
}

unsafe extern "system" fn device_change_trampoline<L: NativeLibrary>(
    device_id: c_int,
    change_event: c_int,
    change_type: c_int,
    _callback_id: c_int,
    context: *mut c_void,
) {
    catch_callback_panic(DeviceChanged::NAME, AssertUnwindSafe(|| {
        let dispatcher = unsafe { dispatcher::<DeviceChanged, L>(context) };
        let event = DeviceChanged {
            device_id,
            change: DeviceChange::from_code(change_event),
            change_type: DeviceChangeType::from_code(change_type),
        };
        dispatcher.notify(&event);
    }));
}

unsafe extern "system" fn raw_event_trampoline<L: NativeLibrary>(
    data: *const c_char,
    controller_id: c_int,
    _callback_id: c_int,
    context: *mut c_void,
) {
    catch_callback_panic(RawDeviceEvent::NAME, AssertUnwindSafe(|| {
        let dispatcher = unsafe { dispatcher::<RawDeviceEvent, L>(context) };
        let data = unsafe { LibraryString::from_raw(&*dispatcher.lib, data as *mut c_char) };
        let event = RawDeviceEvent {
            controller_id,
            data: data.to_string_lossy(),
        };
        dispatcher.notify(&event);
    }));
}

#[allow(clippy::too_many_arguments)]
unsafe extern "system" fn sensor_event_trampoline<L: NativeLibrary>(
    protocol: *const c_char,
    model: *const c_char,
    id: c_int,
    data_type: c_int,
    value: *const c_char,
    timestamp: c_int,
    _callback_id: c_int,
    context: *mut c_void,
) {
    catch_callback_panic(SensorEvent::NAME, AssertUnwindSafe(|| {
        let dispatcher = unsafe { dispatcher::<SensorEvent, L>(context) };
        let lib = &*dispatcher.lib;
        let protocol = unsafe { LibraryString::from_raw(lib, protocol as *mut c_char) };
        let model = unsafe { LibraryString::from_raw(lib, model as *mut c_char) };
        let value = unsafe { LibraryString::from_raw(lib, value as *mut c_char) };
        let event = SensorEvent(SensorReading {
            protocol: protocol.to_string_lossy().unwrap_or_default(),
            model: model.to_string_lossy().unwrap_or_default(),
            sensor_id: id,
            value_type: SensorValueType::from_code(data_type),
            value: value.to_string_lossy(),
            timestamp: i64::from(timestamp),
        });
        dispatcher.notify(&event);
    }));
}

impl NativeEvent for DeviceStateChanged {
    const KIND: EventKind = EventKind::DeviceStateChanged;
    const NAME: &'static str = "device_state_changed";

    unsafe fn register<L: NativeLibrary>(lib: &L, context: *mut c_void) -> c_int {
        lib.td_register_device_event(device_event_trampoline::<L>, context)
    }
}

impl NativeEvent for DeviceChanged {
    const KIND: EventKind = EventKind::DeviceChanged;
    const NAME: &'static str = "device_changed";

    unsafe fn register<L: NativeLibrary>(lib: &L, context: *mut c_void) -> c_int {
        lib.td_register_device_change_event(device_change_trampoline::<L>, context)
    }
}

impl NativeEvent for RawDeviceEvent {
    const KIND: EventKind = EventKind::RawDeviceEvent;
    const NAME: &'static str = "raw_device_event";

    unsafe fn register<L: NativeLibrary>(lib: &L, context: *mut c_void) -> c_int {
        lib.td_register_raw_device_event(raw_event_trampoline::<L>, context)
    }
}

impl NativeEvent for SensorEvent {
    const KIND: EventKind = EventKind::Sensor;
    const NAME: &'static str = "sensor_event";

    unsafe fn register<L: NativeLibrary>(lib: &L, context: *mut c_void) -> c_int {
        lib.td_register_sensor_event(sensor_event_trampoline::<L>, context)
    }
}

/// One event kind's subscribers plus its native registration, if any
pub(crate) struct Channel<E, L> {
    dispatcher: Arc<Dispatcher<E, L>>,
    registration: Mutex<Option<CallbackId>>,
}

impl<E: NativeEvent, L: NativeLibrary> Channel<E, L> {
    pub(crate) fn new(lib: Arc<L>) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(lib)),
            registration: Mutex::new(None),
        }
    }

    fn context(&self) -> *mut c_void {
        Arc::as_ptr(&self.dispatcher) as *mut c_void
    }

    pub(crate) fn is_registered(&self) -> bool {
        lock(&self.registration).is_some()
    }

    /// Add a subscriber, registering with the driver if it is the first.
    /// A failed registration adds nothing.
    pub(crate) fn attach(&self, session: &Session<L>, id: u64, handler: Handler<E>) -> Result<Transition> {
        let mut registration = lock(&self.registration);

        let transition = match *registration {
            Some(_) => {
                session.ensure_open(E::KIND.register_symbol());
                Transition::Unchanged
            }
            None => {
                let symbol = E::KIND.register_symbol();
                let context = self.context();
                let handle = session.call(symbol, |lib| {
                    check(lib, symbol, unsafe { E::register(lib, context) })
                })?;
                let handle = CallbackId(handle);
                *registration = Some(handle);
                tracing::info!(event = E::NAME, callback_id = handle.0, "Registered driver callback");
                Transition::Registered(handle)
            }
        };

        self.dispatcher.attach(id, handler);
        Ok(transition)
    }

    /// Remove a subscriber, unregistering from the driver if it was the last.
    /// Returns `None` when `id` was not subscribed.
    pub(crate) fn detach(&self, session: &Session<L>, id: u64) -> Option<Transition> {
        let mut registration = lock(&self.registration);
        let last = self.dispatcher.detach(id)?;
        if !last {
            return Some(Transition::Unchanged);
        }

        Some(match registration.take() {
            Some(handle) => {
                Self::unregister(session, handle);
                Transition::Unregistered(handle)
            }
            None => Transition::Unchanged,
        })
    }

    /// Withdraw the registration and drop every subscriber
    pub(crate) fn shutdown(&self, session: &Session<L>) {
        let mut registration = lock(&self.registration);
        if let Some(handle) = registration.take() {
            Self::unregister(session, handle);
        }
        self.dispatcher.clear();
    }

    /// Best effort: a failure is logged and the registration is forgotten
    /// regardless.
    fn unregister(session: &Session<L>, handle: CallbackId) {
        let result = session.call_for_cleanup(|lib| {
            check(lib, "tdUnregisterCallback", unsafe { lib.td_unregister_callback(handle.0) })
        });
        match result {
            Ok(_) => {
                tracing::info!(event = E::NAME, callback_id = handle.0, "Unregistered driver callback");
            }
            Err(e) => {
                tracing::warn!(event = E::NAME, callback_id = handle.0, error = %e, "Failed to unregister driver callback");
            }
        }
    }
}

/// The four channels a session owns
pub(crate) struct Channels<L> {
    pub(crate) device_state: Channel<DeviceStateChanged, L>,
    pub(crate) device_changed: Channel<DeviceChanged, L>,
    pub(crate) raw: Channel<RawDeviceEvent, L>,
    pub(crate) sensor: Channel<SensorEvent, L>,
}

impl<L: NativeLibrary> Channels<L> {
    pub(crate) fn new(lib: &Arc<L>) -> Self {
        Self {
            device_state: Channel::new(Arc::clone(lib)),
            device_changed: Channel::new(Arc::clone(lib)),
            raw: Channel::new(Arc::clone(lib)),
            sensor: Channel::new(Arc::clone(lib)),
        }
    }

    pub(crate) fn shutdown(&self, session: &Session<L>) {
        self.device_state.shutdown(session);
        self.device_changed.shutdown(session);
        self.raw.shutdown(session);
        self.sensor.shutdown(session);
    }
}

impl<L: NativeLibrary> TellCore<L> {
    fn subscribe<E: NativeEvent>(
        &self,
        channel: &Channel<E, L>,
        handler: Handler<E>,
    ) -> Result<Subscription> {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        let transition = channel.attach(&self.session, id, handler)?;
        Ok(Subscription {
            id: SubscriptionId { kind: E::KIND, id },
            transition,
        })
    }

    /// Subscribe to device state changes (on, off, dim level, ...)
    pub fn on_device_state_changed<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(&DeviceStateChanged) + Send + Sync + 'static,
    {
        self.subscribe(&self.channels.device_state, Arc::new(handler))
    }

    /// Subscribe to devices being added, removed or renamed
    pub fn on_device_changed<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(&DeviceChanged) + Send + Sync + 'static,
    {
        self.subscribe(&self.channels.device_changed, Arc::new(handler))
    }

    /// Subscribe to raw protocol traffic seen by the controller
    pub fn on_raw_device_event<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(&RawDeviceEvent) + Send + Sync + 'static,
    {
        self.subscribe(&self.channels.raw, Arc::new(handler))
    }

    /// Subscribe to sensor readings as they arrive
    pub fn on_sensor_event<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(&SensorEvent) + Send + Sync + 'static,
    {
        self.subscribe(&self.channels.sensor, Arc::new(handler))
    }

    /// Remove a subscriber and report what that did to the native
    /// registration. Returns `None` when it was not subscribed, which
    /// includes every subscription after the session closed.
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> Option<Transition> {
        let id = subscription.id;
        match subscription.kind {
            EventKind::DeviceStateChanged => self.channels.device_state.detach(&self.session, id),
            EventKind::DeviceChanged => self.channels.device_changed.detach(&self.session, id),
            EventKind::RawDeviceEvent => self.channels.raw.detach(&self.session, id),
            EventKind::Sensor => self.channels.sensor.detach(&self.session, id),
        }
    }

    /// Whether the driver currently holds a registration for `kind`
    pub fn is_registered(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::DeviceStateChanged => self.channels.device_state.is_registered(),
            EventKind::DeviceChanged => self.channels.device_changed.is_registered(),
            EventKind::RawDeviceEvent => self.channels.raw.is_registered(),
            EventKind::Sensor => self.channels.sensor.is_registered(),
        }
    }
}
