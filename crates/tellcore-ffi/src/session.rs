//! Session lifecycle
//!
//! A [`TellCore`] brackets all driver use between one `tdInit` and one
//! `tdClose`. Every driver call the binding initiates goes through a single
//! session-wide lock, since the driver makes no thread-safety promises.
//! Callbacks arriving from the driver's own thread never take that lock.
//!
//! Using a session after [`TellCore::close`] is a programming error and
//! panics; it is not reported through [`crate::Error`].

use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::BindingConfig;
use crate::error::Result;
use crate::events::Channels;
use crate::loader::DynamicLibrary;
use crate::sys::NativeLibrary;
use crate::types::DeviceMethods;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    /// `close` is withdrawing callback registrations
    Closing,
    Closed,
}

/// The init/close bracket and the lock that serialises driver calls
pub(crate) struct Session<L> {
    lib: Arc<L>,
    state: Mutex<State>,
}

impl<L: NativeLibrary> Session<L> {
    fn open(lib: Arc<L>) -> Self {
        let session = Self {
            lib,
            state: Mutex::new(State::Open),
        };
        {
            let _guard = session.lock();
            unsafe { session.lib.td_init() };
        }
        session
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one driver call under the session lock.
    ///
    /// # Panics
    /// When the session is closing or closed.
    pub(crate) fn call<T>(&self, operation: &'static str, f: impl FnOnce(&L) -> T) -> T {
        let guard = self.lock();
        if *guard != State::Open {
            drop(guard);
            contract_violation(operation);
        }
        let result = f(&self.lib);
        drop(guard);
        result
    }

    /// # Panics
    /// When the session is closing or closed.
    pub(crate) fn ensure_open(&self, operation: &'static str) {
        let open = *self.lock() == State::Open;
        if !open {
            contract_violation(operation);
        }
    }

    /// Driver call made while tearing down; allowed during `Closing`
    pub(crate) fn call_for_cleanup<T>(&self, f: impl FnOnce(&L) -> T) -> T {
        let _guard = self.lock();
        f(&self.lib)
    }

    /// Move `Open` to `Closing`. False if someone already closed.
    fn begin_close(&self) -> bool {
        let mut state = self.lock();
        if *state != State::Open {
            return false;
        }
        *state = State::Closing;
        true
    }

    fn finish_close(&self) {
        let mut state = self.lock();
        unsafe { self.lib.td_close() };
        *state = State::Closed;
    }

    fn is_open(&self) -> bool {
        *self.lock() == State::Open
    }
}

fn contract_violation(operation: &str) -> ! {
    panic!("TellCore contract violation: `{operation}` called after the session was closed");
}

/// An open session with the telldus-core driver.
///
/// Device operations live in [`crate::client`], event subscriptions in
/// [`crate::events`]. The session closes itself on drop; share it between
/// threads with an `Arc`.
pub struct TellCore<L: NativeLibrary = DynamicLibrary> {
    pub(crate) session: Session<L>,
    pub(crate) channels: Channels<L>,
    pub(crate) next_subscription: AtomicU64,
    supported_methods: DeviceMethods,
}

impl TellCore<DynamicLibrary> {
    /// Load the driver from its default location and open a session
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(DynamicLibrary::load_default()?))
    }

    /// Load the driver from `path` and open a session
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::open(DynamicLibrary::load(path)?))
    }

    /// Load the driver named in `config` and open a session
    pub fn from_config(config: &BindingConfig) -> Result<Self> {
        let lib = match &config.library_path {
            Some(path) => DynamicLibrary::load(path)?,
            None => DynamicLibrary::load_default()?,
        };
        Ok(Self::open(lib).with_supported_methods(config.supported_methods))
    }
}

impl<L: NativeLibrary> TellCore<L> {
    /// Call `tdInit` and start a session over `lib`
    pub fn open(lib: L) -> Self {
        let lib = Arc::new(lib);
        let session = Session::open(Arc::clone(&lib));
        tracing::info!("Opened telldus-core session");

        Self {
            session,
            channels: Channels::new(&lib),
            next_subscription: AtomicU64::new(0),
            supported_methods: DeviceMethods::ALL,
        }
    }

    /// Set the methods this application can send; see
    /// [`TellCore::supported_methods`]
    pub fn with_supported_methods(mut self, methods: DeviceMethods) -> Self {
        self.supported_methods = methods;
        self
    }

    /// The method mask this application declared it supports. Pass it to
    /// `methods` and `last_sent_command` when there is no narrower mask.
    pub fn supported_methods(&self) -> DeviceMethods {
        self.supported_methods
    }

    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    /// Withdraw every callback registration, then call `tdClose`.
    ///
    /// Idempotent: later calls do nothing. Failures to unregister are logged
    /// and do not stop the close.
    pub fn close(&self) {
        if !self.session.begin_close() {
            return;
        }
        self.channels.shutdown(&self.session);
        self.session.finish_close();
        tracing::info!("Closed telldus-core session");
    }
}

impl<L: NativeLibrary> Drop for TellCore<L> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<L: NativeLibrary> std::fmt::Debug for TellCore<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TellCore")
            .field("open", &self.is_open())
            .field("supported_methods", &self.supported_methods)
            .finish()
    }
}
