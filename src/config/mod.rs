//! Configuration module for Quarry.
//!
//! Handles storage locations, remote backup and execution settings.

mod settings;

pub use settings::{
    expand_env_vars, BackupSettings, ExecutionSettings, Settings, SettingsError, StorageSettings,
};
