//! Engine settings with hierarchical loading: hardcoded defaults, then an
//! optional TOML file, then `WATCH_ENGINE__*` environment variables (highest
//! priority).

mod cache;
mod controller;
mod retry;

pub use cache::*;
pub use controller::*;
pub use retry::*;


use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::Result;

const ENV_PREFIX: &str = "WATCH_ENGINE";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub controller: ControllerSettings,
}

impl EngineSettings {
    /// Loads settings from an optional config file overlaid with environment
    /// variables, e.g. `WATCH_ENGINE__CACHE__SYNC_TIMEOUT_MS=5000` (the
    /// `__` separator doubles as the prefix separator).
    pub fn load(config_file: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_file {
            builder = builder.add_source(File::with_name(path));
        }
        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: EngineSettings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.controller.validate()?;
        Ok(())
    }
}
