pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::format::{is_valid_date_format, DEFAULT_DATE_FORMAT};
use crate::core::{CopyOptions, SortSpec};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    pub live_search_delay_ms: u64,
    pub search_bar_delay_ms: u64,
    pub default_sort: SortSpec,
    pub copy_options: CopyOptions,
    /// strftime pattern for dates in copied structures.
    pub date_format: String,
    /// Key cached search results by directory as well as query.
    pub scope_search_cache_to_path: bool,
    /// Root used when the service cannot report its default drive.
    pub fallback_root: String,
    pub last_directory: Option<String>,
    pub auto_load_last_directory: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn live_search_delay(&self) -> Duration {
        Duration::from_millis(self.live_search_delay_ms)
    }

    pub fn search_bar_delay(&self) -> Duration {
        Duration::from_millis(self.search_bar_delay_ms)
    }

    /// Replaces a date pattern chrono cannot render with the default.
    /// Returns `true` if the config was changed.
    pub fn sanitize(&mut self) -> bool {
        if is_valid_date_format(&self.date_format) {
            return false;
        }
        tracing::warn!(
            "Invalid date format {:?}, using {:?}",
            self.date_format,
            DEFAULT_DATE_FORMAT
        );
        self.date_format = DEFAULT_DATE_FORMAT.to_string();
        true
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 30,
            live_search_delay_ms: 300,
            search_bar_delay_ms: 500,
            default_sort: SortSpec::default(),
            copy_options: CopyOptions::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            scope_search_cache_to_path: false,
            fallback_root: if cfg!(windows) { "C:\\" } else { "/" }.to_string(),
            last_directory: None,
            auto_load_last_directory: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"backend_url": "http://files:8080"}"#).unwrap();
        assert_eq!(config.backend_url, "http://files:8080");
        assert_eq!(config.live_search_delay(), Duration::from_millis(300));
        assert_eq!(config.search_bar_delay(), Duration::from_millis(500));
        assert_eq!(config.copy_options.max_depth, 3);
    }

    #[test]
    fn partial_copy_options_keep_other_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"copy_options": {"use_colors": true}}"#).unwrap();
        assert!(config.copy_options.use_colors);
        assert!(config.copy_options.include_sizes);
    }

    #[test]
    fn sanitize_replaces_unusable_date_format() {
        let mut config = AppConfig {
            date_format: "%Q".to_string(),
            ..AppConfig::default()
        };
        assert!(config.sanitize());
        assert_eq!(config.date_format, "%-m/%-d/%Y");
        assert!(!config.sanitize());
    }
}
