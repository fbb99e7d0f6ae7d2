//! Binding configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::DeviceMethods;

/// How to find the driver and what this application supports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Driver library to load instead of the platform default
    pub library_path: Option<PathBuf>,

    /// Methods this application knows how to send. The driver narrows a
    /// device's reported methods to this mask.
    pub supported_methods: DeviceMethods,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            supported_methods: DeviceMethods::ALL,
        }
    }
}
