use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use workbench_core::{ASPECT_RATIOS, DEFAULT_ASPECT_RATIO};
use workbench_engine::{ApiSettings, PollPolicy};
use workbench_logging::wb_info;

use crate::cli::GlobalArgs;

pub const DEFAULT_CONFIG_FILENAME: &str = "workbench.ron";
const DEFAULT_HISTORY_FILENAME: &str = ".workbench_history.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub poll_interval_secs: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Unset: pending tasks are polled until the service settles them.
    pub max_consecutive_poll_errors: Option<u32>,
    pub history_path: PathBuf,
    pub default_aspect_ratio: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let api = ApiSettings::default();
        let policy = PollPolicy::default();
        Self {
            api_base_url: api.base_url,
            poll_interval_secs: policy.interval.as_secs(),
            connect_timeout_secs: api.connect_timeout.as_secs(),
            request_timeout_secs: api.request_timeout.as_secs(),
            max_consecutive_poll_errors: policy.max_consecutive_errors,
            history_path: PathBuf::from(DEFAULT_HISTORY_FILENAME),
            default_aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads the config for this run: the explicit `--config` file, else
    /// `./workbench.ron` when it exists, else defaults. CLI overrides win.
    pub fn resolve(args: &GlobalArgs) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILENAME);
                if path.exists() {
                    Self::load(path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(args);
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = ron::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        wb_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn apply_overrides(&mut self, args: &GlobalArgs) {
        if let Some(base) = &args.api_base {
            self.api_base_url = base.clone();
        }
        if let Some(history) = &args.history {
            self.history_path = history.clone();
        }
        if let Some(secs) = args.poll_interval_secs {
            self.poll_interval_secs = secs;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be at least 1");
        }
        if self.connect_timeout_secs == 0 {
            bail!("connect_timeout_secs must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }
        if self.max_consecutive_poll_errors == Some(0) {
            bail!("max_consecutive_poll_errors must be at least 1 when set");
        }
        if !ASPECT_RATIOS.contains(&self.default_aspect_ratio.as_str()) {
            bail!(
                "default_aspect_ratio {:?} is not one of {}",
                self.default_aspect_ratio,
                ASPECT_RATIOS.join(", ")
            );
        }
        Ok(())
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_consecutive_errors: self.max_consecutive_poll_errors,
        }
    }
}
