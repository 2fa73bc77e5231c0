use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::MigrateError;

pub mod nginx_parser;
pub use nginx_parser::*;

/// Настройки одного запуска миграции
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MigrateConfig {
    #[serde(default)]
    pub npm: NpmConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Подключение к Nginx Proxy Manager
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NpmConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    /// Таймаут HTTP запроса в секундах, по умолчанию без таймаута
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:81".to_string(),
            user: "admin@example.com".to_string(),
            password: "changeme".to_string(),
            timeout: None,
        }
    }
}

/// Что делать с сайтом, который не удалось разобрать или создать
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Остановить весь прогон на первой ошибке
    #[default]
    Abort,
    /// Записать ошибку и перейти к следующему сайту
    Continue,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MigrationConfig {
    #[serde(default)]
    pub on_error: FailurePolicy,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub format: String, // json или text
    pub level: String,  // error, warn, info, debug, trace
    #[serde(default)]
    pub audit_log: AuditLogConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            level: "info".to_string(),
            audit_log: AuditLogConfig::default(),
        }
    }
}

/// Файл, куда пишется результат по каждому сайту
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditLogConfig {
    pub enabled: bool,
    pub path: String,
    #[serde(default = "default_audit_format")]
    pub format: String,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "npm-migrate-audit.log".to_string(),
            format: default_audit_format(),
        }
    }
}

fn default_audit_format() -> String {
    "json".to_string()
}

/// Значения из командной строки и окружения, перекрывающие файл
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub npm_host: Option<String>,
    pub npm_user: Option<String>,
    pub npm_password: Option<String>,
    pub continue_on_error: bool,
    pub dry_run: bool,
}

impl MigrateConfig {
    /// Загружает конфигурацию из YAML файла
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, MigrateError> {
        let content = fs::read_to_string(path)?;
        let config: MigrateConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.npm_host {
            self.npm.host = host;
        }
        if let Some(user) = overrides.npm_user {
            self.npm.user = user;
        }
        if let Some(password) = overrides.npm_password {
            self.npm.password = password;
        }
        if overrides.continue_on_error {
            self.migration.on_error = FailurePolicy::Continue;
        }
        if overrides.dry_run {
            self.migration.dry_run = true;
        }
    }
}
