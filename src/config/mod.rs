//! Configuration module for cubeq.
//!
//! Handles the API endpoint, builder timing, and persistence settings.

mod settings;

pub use settings::{
    expand_env_vars, ApiSettings, BuilderSettings, PersistenceSettings, Settings, SettingsError,
};
