//! Command handlers for CLI subcommands
//!
//! Handlers that talk to the driver take an [`AsyncTellCore`] so tests can
//! run them over an in-process driver.

mod completions;
mod config;
mod devices;
mod listen;
mod sensors;

pub use completions::handle_completions;
pub use config::handle_config;
pub use devices::{
    handle_add, handle_command, handle_list, handle_param, handle_raw, handle_remove,
    handle_set_name, DeviceCommand,
};
pub use listen::handle_listen;
pub use sensors::handle_sensors;

use crate::config::Config;
use crate::error::Result;
use tellcore_ffi::{AsyncTellCore, DynamicLibrary, TellCore};

/// Load the driver named in the configuration and open a session
pub async fn connect(config: &Config) -> Result<AsyncTellCore<DynamicLibrary>> {
    let binding = config.binding.clone();
    tracing::debug!(library = ?binding.library_path, "Opening driver session");

    let core = tokio::task::spawn_blocking(move || TellCore::from_config(&binding))
        .await
        .map_err(tellcore_ffi::Error::from)??;
    Ok(AsyncTellCore::from(core))
}
