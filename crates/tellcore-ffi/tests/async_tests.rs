//! Async facade

#![cfg(feature = "async")]


use std::sync::Arc;
use std::thread;
use std::sync::atomic::{AtomicUsize, Ordering};

use tellcore_ffi::{AsyncTellCore, Error, ResultCategory, TellCore, Transition};
use test_support::{weather_sensor, FakeDriver};

fn session(driver: &FakeDriver) -> AsyncTellCore<FakeDriver> {
    AsyncTellCore::from(TellCore::open(driver.clone()))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_operations_run_off_the_reactor() {
    let driver = FakeDriver::new()
        .with_device(5, "Blinds", "arctech", "selflearning-switch")
        .with_sensor(weather_sensor());
    let core = session(&driver);

    assert_eq!(core.devices().await.unwrap(), vec![5]);
    assert_eq!(core.name(5).await.unwrap(), "Blinds");
    core.set_name(5, "Living room blinds").await.unwrap();
    assert_eq!(core.name(5).await.unwrap(), "Living room blinds");

    core.turn_on(5).await.unwrap();
    core.dim(5, 200).await.unwrap();
    assert_eq!(driver.dims(), vec![(5, 200)]);

    let sensors = core.sensors().await.unwrap();
    assert_eq!(sensors.len(), 1);
}

#[tokio::test]
async fn test_errors_pass_through() {
    let driver = FakeDriver::new();
    let core = session(&driver);

    let err = core.turn_on(1).await.unwrap_err();
    assert_eq!(err.category(), Some(ResultCategory::DeviceNotFound));

    let err = core.dim(1, -5).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
}

#[tokio::test]
async fn test_subscriptions_and_close() {
    let driver = FakeDriver::new();
    let core = session(&driver);
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    let subscription = core
        .on_device_state_changed(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();
    assert!(matches!(subscription.transition, Transition::Registered(_)));

    driver.fire_device_event(1, 1, None);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let transition = core.unsubscribe(subscription.id).await.unwrap();
    assert!(matches!(transition, Some(Transition::Unregistered(_))));
    core.close().await.unwrap();
    assert!(!core.blocking().is_open());
    assert_eq!(driver.close_calls(), 1);
}

#[tokio::test]
async fn test_contract_violation_surfaces_as_join_error() {
    let driver = FakeDriver::new();
    let core = session(&driver);
    core.close().await.unwrap();

    let err = core.device_count().await.unwrap_err();
    assert!(matches!(err, Error::Join(_)));
}

#[tokio::test]
async fn test_dropping_an_open_session_closes_it_off_the_runtime_thread() {
    let driver = FakeDriver::new();
    let core = session(&driver);
    core.on_device_state_changed(|_| {}).await.unwrap();
    let other = core.clone();

    // A remaining handle keeps the session open
    drop(core);
    assert!(other.blocking().is_open());

    drop(other);
    while driver.close_calls() == 0 {
        tokio::task::yield_now().await;
    }

    assert_eq!(driver.close_calls(), 1);
    assert_eq!(driver.registrations(), 0);
    assert_ne!(driver.close_thread(), Some(thread::current().id()));
}

#[tokio::test]
async fn test_dropping_a_closed_session_does_nothing_more() {
    let driver = FakeDriver::new();
    let core = session(&driver);
    core.close().await.unwrap();
    drop(core);

    assert_eq!(driver.close_calls(), 1);
}
