use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{error, info};
use std::process;

use npm_migrate::config::{MigrateConfig, NginxSource, Overrides};
use npm_migrate::logging::{init_logging, AuditLog};
use npm_migrate::migrate::{plan, Migrator};
use npm_migrate::npm::NpmClient;

fn cli() -> Command {
    Command::new("npm-migrate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Migrates nginx server blocks into Nginx Proxy Manager proxy hosts")
        .arg(Arg::new("nginx_conf")
            .value_name("NGINX_CONF")
            .help("nginx configuration file with server blocks")
            .required(true))
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .value_name("FILE")
            .help("Migration settings file (YAML)"))
        .arg(Arg::new("npm_host")
            .long("npm-host")
            .env("NPM_HOST")
            .value_name("URL")
            .help("Nginx Proxy Manager URL, e.g. http://localhost:81"))
        .arg(Arg::new("npm_user")
            .long("npm-user")
            .env("NPM_USER")
            .value_name("EMAIL")
            .help("NPM admin identity"))
        .arg(Arg::new("npm_password")
            .long("npm-password")
            .env("NPM_PASSWORD")
            .hide_env_values(true)
            .value_name("PASSWORD")
            .help("NPM admin password"))
        .arg(Arg::new("continue_on_error")
            .long("continue-on-error")
            .help("Report failed sites and keep migrating the rest")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("dry_run")
            .long("dry-run")
            .help("Print the proxy host requests without submitting them")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("test")
            .short('t')
            .long("test")
            .help("Test the nginx configuration and exit")
            .action(ArgAction::SetTrue))
}

/// Код выхода для ошибки разбора аргументов: справка и версия не ошибка
fn usage_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn overrides(matches: &ArgMatches) -> Overrides {
    Overrides {
        npm_host: matches.get_one::<String>("npm_host").cloned(),
        npm_user: matches.get_one::<String>("npm_user").cloned(),
        npm_password: matches.get_one::<String>("npm_password").cloned(),
        continue_on_error: matches.get_flag("continue_on_error"),
        dry_run: matches.get_flag("dry_run"),
    }
}

#[tokio::main]
async fn main() {
    let matches = match cli().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            e.print().ok();
            process::exit(usage_exit_code(e.kind()));
        }
    };

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => MigrateConfig::load_from_file(path).unwrap_or_else(|e| {
            eprintln!("Failed to load config from {}: {}", path, e);
            process::exit(1);
        }),
        None => MigrateConfig::default(),
    };
    config.apply_overrides(overrides(&matches));

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}, falling back to env_logger", e);
        env_logger::init();
    }

    // clap гарантирует наличие обязательного аргумента
    let Some(nginx_conf) = matches.get_one::<String>("nginx_conf") else {
        process::exit(1);
    };
    let source = NginxSource::from_file(nginx_conf).unwrap_or_else(|e| {
        error!("Failed to read {}: {}", nginx_conf, e);
        process::exit(1);
    });

    if matches.get_flag("test") {
        if !test_configuration(&source, nginx_conf) {
            process::exit(1);
        }
        return;
    }

    let client = NpmClient::new(&config.npm).unwrap_or_else(|e| {
        error!("Failed to build NPM client: {}", e);
        process::exit(1);
    });

    info!(
        "Migrating {} to {} (on error: {:?}, dry run: {})",
        nginx_conf,
        client.host(),
        config.migration.on_error,
        config.migration.dry_run
    );

    let migrator = Migrator::new(config.migration.on_error, config.migration.dry_run)
        .with_audit_log(AuditLog::new(config.logging.audit_log.clone()));

    match migrator.run(&source, &client).await {
        Ok(report) if report.is_success() => {
            if config.migration.dry_run {
                info!("Dry run: {} site(s) planned, nothing submitted", report.planned);
            } else {
                info!("{} site(s) created", report.created.len());
            }
        }
        Ok(report) => {
            error!(
                "{} site(s) created, {} failed, {} skipped",
                report.created.len(),
                report.failed.len(),
                report.skipped.len()
            );
            for failure in report.skipped.iter().chain(&report.failed) {
                error!("  {}", failure);
            }
            process::exit(1);
        }
        Err(e) => {
            error!("Migration aborted: {}", e);
            process::exit(1);
        }
    }
}

/// Проверка конфигурации без обращения к NPM (как nginx -t)
fn test_configuration(source: &NginxSource, path: &str) -> bool {
    println!("npm-migrate: testing configuration file {}", path);

    let mut errors = 0;
    let planned = plan(source);
    println!("npm-migrate: found {} server block(s)", planned.len());

    for (i, site) in planned.iter().enumerate() {
        match site {
            Ok(site) => {
                let request = &site.request;
                println!(
                    "npm-migrate: site {} ({}) -> {}://{}:{}",
                    i + 1,
                    site.server_name,
                    request.forward_scheme,
                    request.forward_host,
                    request.forward_port
                );
                for line in request.advanced_config.lines().filter(|l| l.starts_with("location")) {
                    println!("npm-migrate:   {}", line.trim_end_matches(" {"));
                }
            }
            Err(e) => {
                println!("npm-migrate: [error] {}", e);
                errors += 1;
            }
        }
    }

    if errors > 0 {
        println!("npm-migrate: configuration file {} test failed ({} error(s))", path, errors);
        false
    } else {
        println!("npm-migrate: configuration file {} test is successful", path);
        true
    }
}
