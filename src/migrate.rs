use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::{FailurePolicy, NginxSource};
use crate::error::{MigrateError, Result};
use crate::logging::{AuditLog, AuditStatus};
use crate::npm::{Authenticator, ProxyHostApi};
use crate::routing::to_proxy_host;
use crate::types::ProxyHostRequest;

/// Сайт, готовый к отправке в NPM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSite {
    pub server_name: String,
    pub request: ProxyHostRequest,
}

/// Итог прогона
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Сколько server блоков найдено в конфиге
    pub blocks: usize,
    /// Сколько сайтов прошло разбор и готово к отправке
    pub planned: usize,
    pub created: Vec<String>,
    /// Сайты, которые NPM отказался создать
    pub failed: Vec<String>,
    /// Блоки, пропущенные из-за ошибок разбора (только при `Continue`)
    pub skipped: Vec<String>,
}

impl MigrationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Строка, которую оператор видит для каждого созданного сайта
pub fn created_line(server_name: &str, response: &Value) -> String {
    format!("Sitio {} creado: {}", server_name, response)
}

/// Извлекает и преобразует все server блоки в исходном порядке
pub fn plan(source: &NginxSource) -> Vec<Result<PlannedSite>> {
    source
        .sites()
        .enumerate()
        .map(|(index, site)| -> Result<PlannedSite> {
            let site = site?;
            let request = to_proxy_host(&site).map_err(|source| MigrateError::Transform {
                block: index + 1,
                server_name: site.server_name.clone(),
                source,
            })?;
            Ok(PlannedSite {
                server_name: site.server_name,
                request,
            })
        })
        .collect()
}

fn site_label(err: &MigrateError) -> String {
    match err {
        MigrateError::Extract(e) => format!("server block #{}", e.block()),
        MigrateError::Transform {
            block, server_name, ..
        } => format!("{} (server block #{})", server_name, block),
        MigrateError::Submit { server_name, .. } => server_name.clone(),
        _ => "-".to_string(),
    }
}

/// Переносит сайты из nginx конфига в NPM по одному, в исходном порядке
pub struct Migrator {
    policy: FailurePolicy,
    dry_run: bool,
    audit: Option<AuditLog>,
}

impl Migrator {
    pub fn new(policy: FailurePolicy, dry_run: bool) -> Self {
        Self {
            policy,
            dry_run,
            audit: None,
        }
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    fn audit(&self, site: &str, status: AuditStatus, detail: &str) {
        if let Some(audit) = &self.audit {
            audit.record(site, status, detail);
        }
    }

    /// Записывает ошибку сайта в `sink`. При `Abort` возвращает её наружу.
    fn handle_failure(&self, err: MigrateError, sink: &mut Vec<String>) -> Result<()> {
        let site = site_label(&err);
        self.audit(&site, AuditStatus::Failed, &err.to_string());

        match self.policy {
            FailurePolicy::Abort => Err(err),
            FailurePolicy::Continue => {
                warn!(site = %site, "Skipping site: {}", err);
                sink.push(err.to_string());
                Ok(())
            }
        }
    }

    /// Запускает миграцию.
    ///
    /// Сначала разбираются все блоки: при `Abort` любая ошибка разбора
    /// останавливает прогон до авторизации, и в NPM ничего не уходит.
    /// Авторизация выполняется, только если есть что отправлять.
    pub async fn run<A: Authenticator>(
        &self,
        source: &NginxSource,
        authenticator: &A,
    ) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();
        let mut ready = Vec::new();

        for planned in plan(source) {
            report.blocks += 1;
            match planned {
                Ok(site) => ready.push(site),
                Err(err) => self.handle_failure(err, &mut report.skipped)?,
            }
        }
        report.planned = ready.len();

        info!(
            blocks = report.blocks,
            ready = ready.len(),
            "Parsed nginx configuration"
        );

        if ready.is_empty() {
            info!("No sites to migrate");
            return Ok(report);
        }

        if self.dry_run {
            for site in &ready {
                println!("{}", serde_json::to_string_pretty(&site.request)?);
                self.audit(&site.server_name, AuditStatus::Planned, "dry run");
            }
            info!(sites = ready.len(), "Dry run finished, nothing was submitted");
            return Ok(report);
        }

        let api = authenticator.authenticate().await.map_err(MigrateError::Auth)?;

        for site in ready {
            match api.create_proxy_host(&site.request).await {
                Ok(response) => {
                    println!("{}", created_line(&site.server_name, &response));
                    self.audit(&site.server_name, AuditStatus::Created, &response.to_string());
                    report.created.push(site.server_name);
                }
                Err(source) => {
                    error!(site = %site.server_name, "NPM rejected proxy host: {}", source);
                    self.handle_failure(
                        MigrateError::Submit {
                            server_name: site.server_name,
                            source,
                        },
                        &mut report.failed,
                    )?;
                }
            }
        }

        info!(
            created = report.created.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Migration finished"
        );
        Ok(report)
    }
}
