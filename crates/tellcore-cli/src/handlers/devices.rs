//! Device table and command handlers

use crate::cli::{AddArgs, ParamAction, ParamArgs, RawArgs, SetNameArgs};
use crate::error::Result;
use crate::output::{DeviceInfo, OutputWriter};
use serde::Serialize;
use tellcore_ffi::{AsyncTellCore, DeviceMethod, NativeLibrary};
use tracing::instrument;

/// A command that targets one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    TurnOn,
    TurnOff,
    Bell,
    Dim(i32),
    Execute,
    Up,
    Down,
    Stop,
    Learn,
}

impl DeviceCommand {
    fn method(self) -> DeviceMethod {
        match self {
            Self::TurnOn => DeviceMethod::TurnOn,
            Self::TurnOff => DeviceMethod::TurnOff,
            Self::Bell => DeviceMethod::Bell,
            Self::Dim(_) => DeviceMethod::Dim,
            Self::Execute => DeviceMethod::Execute,
            Self::Up => DeviceMethod::Up,
            Self::Down => DeviceMethod::Down,
            Self::Stop => DeviceMethod::Stop,
            Self::Learn => DeviceMethod::Learn,
        }
    }
}

#[derive(Debug, Serialize)]
struct CommandReport {
    device_id: i32,
    command: DeviceMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<i32>,
}

/// Handle the list command
#[instrument(skip_all)]
pub async fn handle_list<L: NativeLibrary>(
    core: &AsyncTellCore<L>,
    output: &mut OutputWriter,
) -> Result<()> {
    let supported = core.blocking().supported_methods();
    let mut devices = Vec::new();

    for id in core.devices().await? {
        devices.push(DeviceInfo {
            id,
            name: core.name(id).await?,
            protocol: core.protocol(id).await?,
            model: core.model(id).await?,
            device_type: core.device_type(id).await?,
            methods: core.methods(id, supported).await?.iter().collect(),
            last_command: core.last_sent_command(id, supported).await?,
            last_value: core.last_sent_value(id).await?,
        });
    }

    tracing::debug!(count = devices.len(), "Listed devices");
    output.devices(&devices)
}

/// Handle on, off, bell, dim, execute, up, down, stop and learn
#[instrument(skip(core, output))]
pub async fn handle_command<L: NativeLibrary>(
    core: &AsyncTellCore<L>,
    device_id: i32,
    command: DeviceCommand,
    output: &mut OutputWriter,
) -> Result<()> {
    match command {
        DeviceCommand::TurnOn => core.turn_on(device_id).await?,
        DeviceCommand::TurnOff => core.turn_off(device_id).await?,
        DeviceCommand::Bell => core.bell(device_id).await?,
        DeviceCommand::Dim(level) => core.dim(device_id, level).await?,
        DeviceCommand::Execute => core.execute(device_id).await?,
        DeviceCommand::Up => core.up(device_id).await?,
        DeviceCommand::Down => core.down(device_id).await?,
        DeviceCommand::Stop => core.stop(device_id).await?,
        DeviceCommand::Learn => core.learn(device_id).await?,
    }

    let report = CommandReport {
        device_id,
        command: command.method(),
        level: match command {
            DeviceCommand::Dim(level) => Some(level),
            _ => None,
        },
    };

    if !output.is_human() {
        return output.data(&report);
    }
    let name = core.name(device_id).await?;
    let what = match report.level {
        Some(level) => format!("dim {level}"),
        None => report.command.to_string(),
    };
    output.success(&format!("Sent {} to device {} ({})", what, device_id, name))
}

/// Handle the add command
#[instrument(skip_all, fields(name = %args.name, protocol = %args.protocol))]
pub async fn handle_add<L: NativeLibrary>(
    core: &AsyncTellCore<L>,
    args: AddArgs,
    output: &mut OutputWriter,
) -> Result<()> {
    let id = core.add_device().await?;

    if let Err(e) = configure_device(core, id, &args).await {
        // Do not leave a half-configured entry in the driver's table
        if let Err(cleanup) = core.remove_device(id).await {
            tracing::warn!(device_id = id, error = %cleanup, "Failed to remove partially added device");
        }
        return Err(e);
    }

    tracing::info!(device_id = id, "Added device");
    if output.is_human() {
        output.success(&format!("Added device {} ({})", id, args.name))
    } else {
        output.data(&serde_json::json!({ "device_id": id }))
    }
}

async fn configure_device<L: NativeLibrary>(
    core: &AsyncTellCore<L>,
    id: i32,
    args: &AddArgs,
) -> Result<()> {
    core.set_name(id, args.name.as_str()).await?;
    core.set_protocol(id, args.protocol.as_str()).await?;
    core.set_model(id, args.model.as_str()).await?;
    for (key, value) in &args.params {
        core.set_device_parameter(id, key.as_str(), value.as_str())
            .await?;
    }
    Ok(())
}

/// Handle the remove command
#[instrument(skip(core, output))]
pub async fn handle_remove<L: NativeLibrary>(
    core: &AsyncTellCore<L>,
    device_id: i32,
    output: &mut OutputWriter,
) -> Result<()> {
    core.remove_device(device_id).await?;
    output.success(&format!("Removed device {}", device_id))
}

/// Handle the set-name command
#[instrument(skip_all, fields(device_id = args.id))]
pub async fn handle_set_name<L: NativeLibrary>(
    core: &AsyncTellCore<L>,
    args: SetNameArgs,
    output: &mut OutputWriter,
) -> Result<()> {
    core.set_name(args.id, args.name.as_str()).await?;
    output.success(&format!("Renamed device {} to {}", args.id, args.name))
}

/// Handle param get and param set
#[instrument(skip_all)]
pub async fn handle_param<L: NativeLibrary>(
    core: &AsyncTellCore<L>,
    args: ParamArgs,
    output: &mut OutputWriter,
) -> Result<()> {
    match args.action {
        ParamAction::Get { id, name, default } => {
            let value = core
                .device_parameter(id, name.as_str(), default)
                .await?;
            if output.is_human() {
                output.writeln(&value)
            } else {
                output.data(&serde_json::json!({ "device_id": id, "name": name, "value": value }))
            }
        }
        ParamAction::Set { id, name, value } => {
            core.set_device_parameter(id, name.as_str(), value.as_str())
                .await?;
            output.success(&format!("Set {} = {} on device {}", name, value, id))
        }
    }
}

/// Handle the raw command
#[instrument(skip(core, output))]
pub async fn handle_raw<L: NativeLibrary>(
    core: &AsyncTellCore<L>,
    args: RawArgs,
    output: &mut OutputWriter,
) -> Result<()> {
    core.send_raw_command(args.command).await?;
    output.success("Raw command sent")
}
