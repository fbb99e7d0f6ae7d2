//! Event streaming
//!
//! Driver callbacks arrive on the driver's own thread. Each subscriber
//! only forwards the payload into a channel; printing happens on the
//! command's task.

use crate::cli::ListenArgs;
use crate::error::{Error, Result};
use crate::output::{Event, OutputWriter};
use std::future::Future;
use tellcore_ffi::{AsyncTellCore, NativeLibrary, SubscriptionId};
use tokio::sync::mpsc;
use tracing::instrument;

/// Handle the listen command. Runs until `stop` resolves or `--count`
/// events have been printed.
#[instrument(skip(core, output, stop))]
pub async fn handle_listen<L, S>(
    core: &AsyncTellCore<L>,
    args: ListenArgs,
    output: &mut OutputWriter,
    stop: S,
) -> Result<()>
where
    L: NativeLibrary,
    S: Future,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let subscriptions = subscribe_all(core, &tx, args.raw).await?;
    drop(tx);

    output.info("Listening for events, press Ctrl-C to stop")?;

    let result = async {
        let mut seen = 0usize;
        tokio::pin!(stop);
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => {
                        output.event(&event)?;
                        seen += 1;
                        if args.count.is_some_and(|limit| seen >= limit) {
                            break;
                        }
                    }
                    None => break,
                },
                _ = &mut stop => {
                    tracing::debug!(seen, "Interrupted");
                    break;
                }
            }
        }
        Ok::<(), Error>(())
    }
    .await;

    for subscription in subscriptions {
        core.unsubscribe(subscription).await?;
    }
    result
}

async fn subscribe_all<L: NativeLibrary>(
    core: &AsyncTellCore<L>,
    tx: &mpsc::UnboundedSender<Event>,
    raw: bool,
) -> Result<Vec<SubscriptionId>> {
    let mut subscriptions = Vec::new();

    let sender = tx.clone();
    subscriptions.push(
        core.on_device_state_changed(move |e| {
            let _ = sender.send(Event::DeviceState(e.clone()));
        })
        .await?
        .id,
    );

    let sender = tx.clone();
    subscriptions.push(
        core.on_device_changed(move |e| {
            let _ = sender.send(Event::DeviceChanged(e.clone()));
        })
        .await?
        .id,
    );

    let sender = tx.clone();
    subscriptions.push(
        core.on_sensor_event(move |e| {
            let _ = sender.send(Event::Sensor(e.0.clone()));
        })
        .await?
        .id,
    );

    if raw {
        let sender = tx.clone();
        subscriptions.push(
            core.on_raw_device_event(move |e| {
                let _ = sender.send(Event::Raw(e.clone()));
            })
            .await?
            .id,
        );
    }

    tracing::info!(count = subscriptions.len(), "Subscribed to driver events");
    Ok(subscriptions)
}
