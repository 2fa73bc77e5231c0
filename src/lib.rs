pub mod config;
pub mod error;
pub mod logging;
pub mod migrate;
pub mod npm;
pub mod routing;
pub mod types;

pub use config::{MigrateConfig, NginxSource};
pub use error::MigrateError;
pub use migrate::{MigrationReport, Migrator};
pub use types::{LocationRule, ProxyHostRequest, SiteRecord};
