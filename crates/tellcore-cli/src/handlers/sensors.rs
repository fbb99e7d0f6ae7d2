//! Sensor listing

use crate::error::Result;
use crate::output::{OutputWriter, SensorInfo};
use tellcore_ffi::{AsyncTellCore, NativeLibrary};
use tracing::instrument;

/// Handle the sensors command
#[instrument(skip_all)]
pub async fn handle_sensors<L: NativeLibrary>(
    core: &AsyncTellCore<L>,
    output: &mut OutputWriter,
) -> Result<()> {
    let mut sensors = Vec::new();

    for sensor in core.sensors().await? {
        let mut readings = Vec::new();
        for value_type in sensor.value_types.iter() {
            let reading = core
                .sensor_value(sensor.protocol.as_str(), sensor.model.as_str(), sensor.id, value_type)
                .await?;
            readings.push(reading);
        }
        sensors.push(SensorInfo {
            protocol: sensor.protocol,
            model: sensor.model,
            id: sensor.id,
            readings,
        });
    }

    tracing::debug!(count = sensors.len(), "Listed sensors");
    output.sensors(&sensors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::test_support::{weather_sensor, FakeDriver};
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use tellcore_ffi::TellCore;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_each_value_type_is_read() {
        let driver = FakeDriver::new().with_sensor(weather_sensor());
        let core = AsyncTellCore::from(TellCore::open(driver.clone()));
        let captured = Captured::default();
        let mut output =
            OutputWriter::with_writer(OutputFormat::Json, false, false, Box::new(captured.clone()));

        handle_sensors(&core, &mut output).await.unwrap();

        let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        let readings = value[0]["readings"].as_array().unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0]["value"], "21.5");
        assert_eq!(readings[1]["value"], "40");
        assert_eq!(driver.count("tdSensorValue"), 2);
        assert_eq!(driver.live_strings(), 0);
    }
}
