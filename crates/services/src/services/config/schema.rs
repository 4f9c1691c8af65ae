use serde::{Deserialize, Serialize};

pub const CURRENT_CONFIG_VERSION: &str = "v1";

const DEFAULT_REPORT_MAX_ITEMS: usize = 5000;

fn default_config_version() -> String {
    CURRENT_CONFIG_VERSION.to_string()
}

fn default_realtime_enabled() -> bool {
    true
}

fn default_report_max_items() -> usize {
    DEFAULT_REPORT_MAX_ITEMS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Identical notifications for the same recipient and subject inside this
    /// window are not persisted again. `None` disables suppression.
    pub dedup_window_secs: Option<u64>,
    #[serde(default = "default_realtime_enabled")]
    pub realtime_enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: None,
            realtime_enabled: default_realtime_enabled(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Lets admins update and delete projects they do not own.
    pub admin_override: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    #[serde(default = "default_report_max_items")]
    pub max_items: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_items: default_report_max_items(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_config_version")]
    pub config_version: String,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub projects: ProjectConfig,
    #[serde(default)]
    pub reports: ReportConfig,
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.config_version = CURRENT_CONFIG_VERSION.to_string();

        if self.notifications.dedup_window_secs == Some(0) {
            self.notifications.dedup_window_secs = None;
        }

        if self.reports.max_items == 0 {
            tracing::warn!(
                "reports.max_items set to 0, resetting to {}",
                DEFAULT_REPORT_MAX_ITEMS
            );
            self.reports.max_items = DEFAULT_REPORT_MAX_ITEMS;
        }

        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            notifications: NotificationConfig::default(),
            projects: ProjectConfig::default(),
            reports: ReportConfig::default(),
        }
    }
}
