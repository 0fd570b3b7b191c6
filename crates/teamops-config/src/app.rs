//! The persisted configuration document.
//!
//! This is the JSON document kept in the object store and edited through
//! `PUT /api/config`. Every field has a default so an absent or empty
//! document still yields a usable (all jobs disabled) configuration.

use serde::{Deserialize, Serialize};

use teamops_types::OnCallSchedule;

use crate::ConfigError;
use crate::schedule::parse_cron;

/// Weekly report settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfluenceConfig {
    /// Whether the timer for this job is active.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_confluence_schedule")]
    pub schedule: String,
    /// Link to the team space, informational only.
    #[serde(default)]
    pub confluence_url: String,
    #[serde(default)]
    pub slack_channel: String,
    /// Whether the job may copy pages at all, whichever way it is triggered.
    #[serde(default)]
    pub weekly_report_enabled: bool,
    #[serde(default)]
    pub weekly_report_slack_channel: String,
    /// Year folders are titled "{prefix} {year}".
    #[serde(default = "default_root_folder_prefix")]
    pub root_folder_prefix: String,
    /// Parent page for new year folders; space root when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_parent_id: Option<String>,
    /// Prepended to the announcement, e.g. "<!subteam^S03GP72G62J>".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention: Option<String>,
}

fn default_confluence_schedule() -> String {
    "0 10 * * 1".to_string()
}

fn default_root_folder_prefix() -> String {
    "團隊週會".to_string()
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            schedule: default_confluence_schedule(),
            confluence_url: String::new(),
            slack_channel: String::new(),
            weekly_report_enabled: false,
            weekly_report_slack_channel: String::new(),
            root_folder_prefix: default_root_folder_prefix(),
            root_parent_id: None,
            mention: None,
        }
    }
}

impl ConfluenceConfig {
    /// Channel the weekly report announcement goes to.
    pub fn report_channel(&self) -> &str {
        if self.weekly_report_slack_channel.is_empty() {
            &self.slack_channel
        } else {
            &self.weekly_report_slack_channel
        }
    }

    /// Title of the year folder, e.g. "團隊週會 2025".
    pub fn root_folder_title(&self, year: i32) -> String {
        format!("{} {year}", self.root_folder_prefix.trim())
    }
}

/// On-call notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnCallConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_on_call_schedule")]
    pub schedule: String,
    #[serde(default)]
    pub slack_channel: String,
}

fn default_on_call_schedule() -> String {
    "0 18 * * 5".to_string()
}

impl Default for OnCallConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            schedule: default_on_call_schedule(),
            slack_channel: String::new(),
        }
    }
}

/// Top-level persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub confluence_config: ConfluenceConfig,
    #[serde(default)]
    pub on_call_config: OnCallConfig,
    #[serde(default)]
    pub on_call_schedule: OnCallSchedule,
}

impl AppConfig {
    /// Parse a stored document.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, ConfigError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Reject documents that would break a job at run time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let confluence = &self.confluence_config;
        parse_cron(&confluence.schedule)?;
        parse_cron(&self.on_call_config.schedule)?;

        if !confluence.confluence_url.is_empty() {
            let parsed = url::Url::parse(&confluence.confluence_url).map_err(|e| {
                ConfigError::Invalid(format!(
                    "Invalid confluence_url '{}': {e}",
                    confluence.confluence_url
                ))
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::Invalid(format!(
                    "Invalid confluence_url '{}': scheme must be http or https",
                    confluence.confluence_url
                )));
            }
        }

        if confluence.root_folder_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "root_folder_prefix must not be empty".into(),
            ));
        }
        if confluence.weekly_report_enabled && confluence.report_channel().trim().is_empty() {
            return Err(ConfigError::Invalid(
                "weekly report is enabled but no Slack channel is configured".into(),
            ));
        }
        if self.on_call_config.enabled && self.on_call_config.slack_channel.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "on-call notification is enabled but no Slack channel is configured".into(),
            ));
        }

        for (i, entry) in self.on_call_schedule.roster.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "roster entry {i}: name must not be empty"
                )));
            }
            if entry.slack_user_id.is_empty()
                || entry.slack_user_id.chars().any(char::is_whitespace)
            {
                return Err(ConfigError::Invalid(format!(
                    "roster entry {i} ({}): invalid slack_user_id '{}'",
                    entry.name, entry.slack_user_id
                )));
            }
        }

        Ok(())
    }
}
