use chrono::Utc;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{AuditLogConfig, LoggingConfig};

/// Инициализирует систему логирования.
/// Логи идут в stderr, stdout остаётся для результатов миграции.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let result = if config.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(false)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
    };

    match result {
        Ok(_) => {
            info!("Logging initialized with level: {}, format: {}", config.level, config.format);
        }
        Err(_) => {
            // Логгер уже установлен, используем существующий
            eprintln!("Global logger already set, using existing configuration");
        }
    }

    Ok(())
}

/// Итог по одному сайту для журнала миграции
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Planned,
    Created,
    Failed,
}

impl AuditStatus {
    fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Planned => "planned",
            AuditStatus::Created => "created",
            AuditStatus::Failed => "failed",
        }
    }
}

/// Журнал миграции: одна строка на сайт
#[derive(Debug, Clone)]
pub struct AuditLog {
    config: AuditLogConfig,
}

impl AuditLog {
    pub fn new(config: AuditLogConfig) -> Self {
        Self { config }
    }

    /// Записывает результат по сайту. Ошибка записи не прерывает миграцию.
    pub fn record(&self, site: &str, status: AuditStatus, detail: &str) {
        if !self.config.enabled {
            return;
        }

        let timestamp = Utc::now().to_rfc3339();
        let log_entry = if self.config.format == "json" {
            json!({
                "timestamp": timestamp,
                "site": site,
                "status": status.as_str(),
                "detail": detail,
            })
            .to_string()
        } else {
            format!("[{}] [{}] {} - {}", timestamp, status.as_str(), site, detail)
        };

        if let Err(e) = self.write_to_file(&log_entry) {
            error!(path = %self.config.path, "Failed to write audit log: {}", e);
        }
    }

    fn write_to_file(&self, log_entry: &str) -> Result<(), std::io::Error> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.path)?;

        writeln!(file, "{}", log_entry)?;
        file.flush()?;
        Ok(())
    }
}
