//! Async facade over a [`TellCore`] session
//!
//! Driver calls block until the radio transmission is done, so each one is
//! moved onto tokio's blocking pool instead of stalling the reactor.
//!
//! Call [`AsyncTellCore::close`] before dropping the last handle. If the
//! session is still open at that point and a runtime is running, the close
//! is moved onto the blocking pool as well.

use std::sync::Arc;

use crate::error::Result;
use crate::events::{Subscription, SubscriptionId, Transition};
use crate::session::TellCore;
use crate::sys::NativeLibrary;
use crate::types::{
    DeviceChanged, DeviceMethod, DeviceMethods, DeviceStateChanged, DeviceType, RawDeviceEvent,
    Sensor, SensorEvent, SensorReading, SensorValueType,
};

/// A shared session whose operations are `async`
pub struct AsyncTellCore<L: NativeLibrary> {
    inner: Arc<TellCore<L>>,
}

impl<L: NativeLibrary> Clone for AsyncTellCore<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: NativeLibrary> Drop for AsyncTellCore<L> {
    fn drop(&mut self) {
        // Only the last handle closes, and only if nobody did already
        if Arc::strong_count(&self.inner) > 1 || !self.inner.is_open() {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let inner = Arc::clone(&self.inner);
            tracing::debug!("Closing dropped session on the blocking pool");
            drop(runtime.spawn_blocking(move || inner.close()));
        }
    }
}

impl<L: NativeLibrary> From<TellCore<L>> for AsyncTellCore<L> {
    fn from(session: TellCore<L>) -> Self {
        Self::new(Arc::new(session))
    }
}

impl<L: NativeLibrary> AsyncTellCore<L> {
    pub fn new(inner: Arc<TellCore<L>>) -> Self {
        Self { inner }
    }

    /// The blocking session underneath
    pub fn blocking(&self) -> &Arc<TellCore<L>> {
        &self.inner
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&TellCore<L>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner)).await?
    }

    pub async fn device_count(&self) -> Result<i32> {
        self.run(|core| core.device_count()).await
    }

    pub async fn device_id(&self, index: i32) -> Result<i32> {
        self.run(move |core| core.device_id(index)).await
    }

    pub async fn devices(&self) -> Result<Vec<i32>> {
        self.run(|core| core.devices()).await
    }

    pub async fn name(&self, device_id: i32) -> Result<String> {
        self.run(move |core| core.name(device_id)).await
    }

    pub async fn set_name(&self, device_id: i32, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.run(move |core| core.set_name(device_id, &name)).await
    }

    pub async fn protocol(&self, device_id: i32) -> Result<String> {
        self.run(move |core| core.protocol(device_id)).await
    }

    pub async fn set_protocol(&self, device_id: i32, protocol: impl Into<String>) -> Result<()> {
        let protocol = protocol.into();
        self.run(move |core| core.set_protocol(device_id, &protocol))
            .await
    }

    pub async fn model(&self, device_id: i32) -> Result<String> {
        self.run(move |core| core.model(device_id)).await
    }

    pub async fn set_model(&self, device_id: i32, model: impl Into<String>) -> Result<()> {
        let model = model.into();
        self.run(move |core| core.set_model(device_id, &model)).await
    }

    pub async fn device_parameter(
        &self,
        device_id: i32,
        name: impl Into<String>,
        default_value: Option<String>,
    ) -> Result<String> {
        let name = name.into();
        self.run(move |core| core.device_parameter(device_id, &name, default_value.as_deref()))
            .await
    }

    pub async fn set_device_parameter(
        &self,
        device_id: i32,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let (name, value) = (name.into(), value.into());
        self.run(move |core| core.set_device_parameter(device_id, &name, &value))
            .await
    }

    pub async fn add_device(&self) -> Result<i32> {
        self.run(|core| core.add_device()).await
    }

    pub async fn remove_device(&self, device_id: i32) -> Result<()> {
        self.run(move |core| core.remove_device(device_id)).await
    }

    pub async fn methods(&self, device_id: i32, supported: DeviceMethods) -> Result<DeviceMethods> {
        self.run(move |core| core.methods(device_id, supported)).await
    }

    pub async fn turn_on(&self, device_id: i32) -> Result<()> {
        self.run(move |core| core.turn_on(device_id)).await
    }

    pub async fn turn_off(&self, device_id: i32) -> Result<()> {
        self.run(move |core| core.turn_off(device_id)).await
    }

    pub async fn bell(&self, device_id: i32) -> Result<()> {
        self.run(move |core| core.bell(device_id)).await
    }

    pub async fn dim(&self, device_id: i32, level: i32) -> Result<()> {
        self.run(move |core| core.dim(device_id, level)).await
    }

    pub async fn execute(&self, device_id: i32) -> Result<()> {
        self.run(move |core| core.execute(device_id)).await
    }

    pub async fn up(&self, device_id: i32) -> Result<()> {
        self.run(move |core| core.up(device_id)).await
    }

    pub async fn down(&self, device_id: i32) -> Result<()> {
        self.run(move |core| core.down(device_id)).await
    }

    pub async fn stop(&self, device_id: i32) -> Result<()> {
        self.run(move |core| core.stop(device_id)).await
    }

    pub async fn learn(&self, device_id: i32) -> Result<()> {
        self.run(move |core| core.learn(device_id)).await
    }

    pub async fn last_sent_command(
        &self,
        device_id: i32,
        supported: DeviceMethods,
    ) -> Result<DeviceMethod> {
        self.run(move |core| core.last_sent_command(device_id, supported))
            .await
    }

    pub async fn last_sent_value(&self, device_id: i32) -> Result<String> {
        self.run(move |core| core.last_sent_value(device_id)).await
    }

    pub async fn device_type(&self, device_id: i32) -> Result<DeviceType> {
        self.run(move |core| core.device_type(device_id)).await
    }

    pub async fn send_raw_command(&self, command: impl Into<String>) -> Result<()> {
        let command = command.into();
        self.run(move |core| core.send_raw_command(&command)).await
    }

    /// Every sensor, collected in one blocking task
    pub async fn sensors(&self) -> Result<Vec<Sensor>> {
        self.run(|core| Ok(core.sensors().collect())).await
    }

    pub async fn sensor_value(
        &self,
        protocol: impl Into<String>,
        model: impl Into<String>,
        sensor_id: i32,
        value_type: SensorValueType,
    ) -> Result<SensorReading> {
        let (protocol, model) = (protocol.into(), model.into());
        self.run(move |core| core.sensor_value(&protocol, &model, sensor_id, value_type))
            .await
    }

    pub async fn error_string(&self, code: i32) -> Result<String> {
        self.run(move |core| Ok(core.error_string(code))).await
    }

    pub async fn on_device_state_changed<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(&DeviceStateChanged) + Send + Sync + 'static,
    {
        self.run(move |core| core.on_device_state_changed(handler))
            .await
    }

    pub async fn on_device_changed<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(&DeviceChanged) + Send + Sync + 'static,
    {
        self.run(move |core| core.on_device_changed(handler)).await
    }

    pub async fn on_raw_device_event<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(&RawDeviceEvent) + Send + Sync + 'static,
    {
        self.run(move |core| core.on_raw_device_event(handler)).await
    }

    pub async fn on_sensor_event<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(&SensorEvent) + Send + Sync + 'static,
    {
        self.run(move |core| core.on_sensor_event(handler)).await
    }

    pub async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<Option<Transition>> {
        self.run(move |core| Ok(core.unsubscribe(subscription))).await
    }

    /// Close the session; see [`TellCore::close`]
    pub async fn close(&self) -> Result<()> {
        self.run(|core| {
            core.close();
            Ok(())
        })
        .await
    }
}
