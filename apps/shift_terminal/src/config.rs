use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::MachineConfig;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "shift_terminal.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub web_app_url: Option<String>,
    pub database_url: String,
    pub restart_delay_seconds: u64,
    pub report_fields: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            web_app_url: None,
            database_url: "sqlite://./data/shift_terminal.db".into(),
            restart_delay_seconds: 10,
            report_fields: [
                "machine",
                "partNumber",
                "quantityProduced",
                "scrapCount",
                "downtimeMinutes",
                "notes",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Settings {
    pub fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            report_fields: self.report_fields.clone(),
            restart_delay: Duration::from_secs(self.restart_delay_seconds),
        }
    }

    pub fn web_app_url(&self) -> anyhow::Result<&str> {
        self.web_app_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .context("web app url is not configured; set WEB_APP_URL or pass --web-app-url")
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    web_app_url: Option<String>,
    database_url: Option<String>,
    restart_delay_seconds: Option<u64>,
    report_fields: Option<Vec<String>>,
}

/// Defaults, then the TOML file at `path` if present, then environment.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable config file"),
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.web_app_url {
        settings.web_app_url = Some(v);
    }
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.restart_delay_seconds {
        settings.restart_delay_seconds = v;
    }
    if let Some(v) = file_cfg.report_fields {
        settings.report_fields = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("WEB_APP_URL") {
        settings.web_app_url = Some(v);
    }
    if let Some(v) = var("APP__WEB_APP_URL") {
        settings.web_app_url = Some(v);
    }

    if let Some(v) = var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = var("APP__RESTART_DELAY_SECONDS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.restart_delay_seconds = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__RESTART_DELAY_SECONDS"),
        }
    }

    if let Some(v) = var("APP__REPORT_FIELDS") {
        settings.report_fields = split_fields(&v);
    }
}

pub fn split_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(String::from)
        .collect()
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}
