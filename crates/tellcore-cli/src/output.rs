//! Output formatting and writing utilities
//!
//! Results go to stdout either as human-readable tables and lines or as
//! JSON. Event streams in JSON mode are one document per line.

use crate::cli::OutputFormat;
use crate::error::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};
use tellcore_ffi::{
    DeviceChange, DeviceChanged, DeviceMethod, DeviceStateChanged, DeviceType, RawDeviceEvent,
    SensorReading, SensorValueType,
};
use tracing::trace;

/// One row of `tdctl list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub id: i32,
    pub name: String,
    pub protocol: String,
    pub model: String,
    pub device_type: DeviceType,
    pub methods: Vec<DeviceMethod>,
    pub last_command: DeviceMethod,
    pub last_value: String,
}

/// A sensor and its current readings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorInfo {
    pub protocol: String,
    pub model: String,
    pub id: i32,
    pub readings: Vec<SensorReading>,
}

/// Anything `tdctl listen` prints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    DeviceState(DeviceStateChanged),
    DeviceChanged(DeviceChanged),
    Raw(RawDeviceEvent),
    Sensor(SensorReading),
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer on stdout
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool) -> Self {
        Self::with_writer(format, use_color, quiet, Box::new(io::stdout()))
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(
        format: OutputFormat,
        use_color: bool,
        quiet: bool,
        writer: Box<dyn Write>,
    ) -> Self {
        Self {
            format,
            use_color,
            quiet,
            writer,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write data in the configured format. Human output falls back to
    /// pretty JSON.
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let formatted = match self.format {
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::JsonPretty | OutputFormat::Human => serde_json::to_string_pretty(value)?,
        };
        trace!(bytes = formatted.len(), "Writing data");
        self.writeln(&formatted)
    }

    /// Write a table (for human format)
    pub fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }

        let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        let header_row = pad_row(headers.iter().map(|h| h.to_string()), &widths);
        if self.use_color {
            self.writeln(&header_row.bold().to_string())?;
        } else {
            self.writeln(&header_row)?;
        }

        let separator = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");
        self.writeln(&separator)?;

        for row in rows {
            self.writeln(&pad_row(row.into_iter(), &widths))?;
        }

        Ok(())
    }

    /// Write the device list
    pub fn devices(&mut self, devices: &[DeviceInfo]) -> Result<()> {
        if !self.is_human() {
            return self.data(&devices);
        }
        if devices.is_empty() {
            return self.info("No devices configured");
        }

        let rows = devices
            .iter()
            .map(|d| {
                vec![
                    d.id.to_string(),
                    d.name.clone(),
                    format!("{}/{}", d.protocol, d.model),
                    device_type_label(d.device_type),
                    method_list(&d.methods),
                    last_command_label(d.last_command, &d.last_value),
                ]
            })
            .collect();
        self.table(&["ID", "NAME", "PROTOCOL/MODEL", "TYPE", "METHODS", "LAST"], rows)
    }

    /// Write the sensor list
    pub fn sensors(&mut self, sensors: &[SensorInfo]) -> Result<()> {
        if !self.is_human() {
            return self.data(&sensors);
        }
        if sensors.is_empty() {
            return self.info("No sensors seen");
        }

        let rows = sensors
            .iter()
            .flat_map(|s| {
                s.readings.iter().map(move |r| {
                    vec![
                        format!("{}/{}", s.protocol, s.model),
                        s.id.to_string(),
                        value_type_label(r.value_type),
                        reading_value(r),
                        r.recorded_at()
                            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                            .unwrap_or_default(),
                    ]
                })
            })
            .collect();
        self.table(&["PROTOCOL/MODEL", "ID", "TYPE", "VALUE", "UPDATED (UTC)"], rows)
    }

    /// Write one event from a listen stream
    pub fn event(&mut self, event: &Event) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                let line = format_event_human(event);
                self.writeln(&line)
            }
            // One document per line so the stream can be piped
            OutputFormat::Json | OutputFormat::JsonPretty => {
                let line = serde_json::to_string(event)?;
                self.writeln(&line)
            }
        }
    }
}

fn pad_row(cells: impl Iterator<Item = String>, widths: &[usize]) -> String {
    cells
        .enumerate()
        .map(|(i, cell)| match widths.get(i) {
            Some(width) => format!("{:width$}", cell, width = width),
            None => cell,
        })
        .collect::<Vec<_>>()
        .join(" │ ")
        .trim_end()
        .to_string()
}

fn device_type_label(device_type: DeviceType) -> String {
    match device_type {
        DeviceType::Device => "device".to_string(),
        DeviceType::Group => "group".to_string(),
        DeviceType::Scene => "scene".to_string(),
        DeviceType::Unknown(code) => format!("unknown({code})"),
    }
}

fn method_list(methods: &[DeviceMethod]) -> String {
    methods
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn last_command_label(method: DeviceMethod, value: &str) -> String {
    match method {
        DeviceMethod::Dim if !value.is_empty() => format!("dim {value}"),
        // A device that was never sent anything reports an empty mask
        DeviceMethod::Unknown(0) => "-".to_string(),
        other => other.to_string(),
    }
}

fn value_type_label(value_type: SensorValueType) -> String {
    match value_type {
        SensorValueType::Temperature => "temperature".to_string(),
        SensorValueType::Humidity => "humidity".to_string(),
        SensorValueType::RainRate => "rain rate".to_string(),
        SensorValueType::RainTotal => "rain total".to_string(),
        SensorValueType::WindDirection => "wind direction".to_string(),
        SensorValueType::WindAverage => "wind average".to_string(),
        SensorValueType::WindGust => "wind gust".to_string(),
        SensorValueType::Unknown(code) => format!("unknown({code})"),
    }
}

fn reading_value(reading: &SensorReading) -> String {
    let Some(value) = reading.value.as_deref() else {
        return "-".to_string();
    };
    match reading.value_type {
        SensorValueType::Temperature => format!("{value} °C"),
        SensorValueType::Humidity => format!("{value} %"),
        SensorValueType::RainRate => format!("{value} mm/h"),
        SensorValueType::RainTotal => format!("{value} mm"),
        SensorValueType::WindDirection => format!("{value}°"),
        SensorValueType::WindAverage | SensorValueType::WindGust => format!("{value} m/s"),
        SensorValueType::Unknown(_) => value.to_string(),
    }
}

/// Format a listen event as a single line
fn format_event_human(event: &Event) -> String {
    match event {
        Event::DeviceState(e) => match &e.data {
            Some(data) if !data.is_empty() => {
                format!("device {}: {} ({})", e.device_id, e.method, data)
            }
            _ => format!("device {}: {}", e.device_id, e.method),
        },
        Event::DeviceChanged(e) => {
            let change = match e.change {
                DeviceChange::Added => "added".to_string(),
                DeviceChange::Changed => format!("changed {:?}", e.change_type).to_lowercase(),
                DeviceChange::Removed => "removed".to_string(),
                DeviceChange::StateChanged => "state changed".to_string(),
                DeviceChange::Unknown(code) => format!("unknown change {code}"),
            };
            format!("device {}: {}", e.device_id, change)
        }
        Event::Raw(e) => format!(
            "raw [controller {}]: {}",
            e.controller_id,
            e.data.as_deref().unwrap_or("")
        ),
        Event::Sensor(r) => format!(
            "sensor {}/{} {}: {} = {}",
            r.protocol,
            r.model,
            r.sensor_id,
            value_type_label(r.value_type),
            reading_value(r)
        ),
    }
}
