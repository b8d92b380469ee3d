use std::path::Path;

use anyhow::{Context, Result};
use media_check_core::BackendSettings;
use serde::Deserialize;

/// Layout of the optional `--config` file (TOML, YAML or JSON).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    backend: BackendSettings,
}

/// Resolve backend settings: defaults, then the config file, then `MEDIA_CHECK_*` variables.
pub fn load_backend_settings(config_path: Option<&Path>) -> Result<BackendSettings> {
    let settings = match config_path {
        Some(path) => {
            let raw = config::Config::builder()
                .add_source(config::File::from(path))
                .build()
                .with_context(|| format!("failed to load config file {}", path.display()))?;
            let file: FileConfig = raw
                .try_deserialize()
                .with_context(|| format!("invalid settings in {}", path.display()))?;
            file.backend
        }
        None => BackendSettings::default(),
    };
    settings.with_env()
}
