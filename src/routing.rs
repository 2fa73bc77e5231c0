use thiserror::Error;

use crate::types::{ForwardScheme, ProxyHostMeta, ProxyHostRequest, SiteRecord};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("no location with proxy_pass, cannot pick a forwarding target")]
    NoLocations,

    #[error("invalid port in proxy_pass target `{target}`")]
    InvalidPort { target: String },
}

/// Хост и порт backend, куда NPM будет проксировать запросы
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTarget {
    pub host: String,
    pub port: u16,
}

/// Разбирает адрес из proxy_pass.
///
/// Схема `http://`/`https://` отбрасывается, путь после первого `/` тоже.
/// Если порт не указан, берётся 443 для сайта на 443 порту, иначе 80.
pub fn resolve_forward(target: &str, listen_port: u16) -> Result<ForwardTarget, TransformError> {
    let without_scheme = target
        .strip_prefix("http://")
        .or_else(|| target.strip_prefix("https://"))
        .unwrap_or(target);
    let authority = without_scheme.split('/').next().unwrap_or(without_scheme);

    match authority.split_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| TransformError::InvalidPort {
                target: target.to_string(),
            })?;
            Ok(ForwardTarget {
                host: host.to_string(),
                port,
            })
        }
        None => Ok(ForwardTarget {
            host: authority.to_string(),
            port: if listen_port == 443 { 443 } else { 80 },
        }),
    }
}

/// Собирает advanced_config со всеми location сайта в исходном порядке
fn build_advanced_config(site: &SiteRecord) -> Result<String, TransformError> {
    let mut advanced_config = String::new();
    for location in &site.locations {
        resolve_forward(&location.target, site.listen_port)?;
        advanced_config.push_str(&format!(
            "location {} {{\n    proxy_pass {};\n}}\n",
            location.path, location.target
        ));
    }
    Ok(advanced_config.trim().to_string())
}

/// Преобразует сайт из nginx в запрос на создание proxy host в NPM.
/// Первый location задаёт основной forward target.
pub fn to_proxy_host(site: &SiteRecord) -> Result<ProxyHostRequest, TransformError> {
    let primary = site.locations.first().ok_or(TransformError::NoLocations)?;
    let forward = resolve_forward(&primary.target, site.listen_port)?;
    let advanced_config = build_advanced_config(site)?;

    Ok(ProxyHostRequest {
        domain_names: vec![site.server_name.clone()],
        forward_scheme: ForwardScheme::for_port(forward.port),
        forward_host: forward.host,
        forward_port: forward.port,
        access_list_id: 0,
        certificate_id: 0,
        ssl_forced: true,
        caching_enabled: false,
        block_exploits: false,
        advanced_config,
        meta: ProxyHostMeta::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocationRule;

    fn site(listen_port: u16, locations: &[(&str, &str)]) -> SiteRecord {
        SiteRecord {
            server_name: "a.example.com".to_string(),
            ssl_certificate_path: "/c".to_string(),
            ssl_certificate_key_path: "/k".to_string(),
            listen_port,
            locations: locations
                .iter()
                .map(|(path, target)| LocationRule {
                    path: path.to_string(),
                    target: target.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_default_port_follows_listen_port() {
        let request = to_proxy_host(&site(443, &[("/", "http://backend")])).unwrap();
        assert_eq!(request.forward_host, "backend");
        assert_eq!(request.forward_port, 443);
        assert_eq!(request.forward_scheme, ForwardScheme::Https);

        let request = to_proxy_host(&site(8443, &[("/", "http://backend")])).unwrap();
        assert_eq!(request.forward_port, 80);
        assert_eq!(request.forward_scheme, ForwardScheme::Http);
    }

    #[test]
    fn test_explicit_port_is_kept() {
        let request = to_proxy_host(&site(443, &[("/", "http://backend:8080")])).unwrap();
        assert_eq!(request.forward_port, 8080);
        assert_eq!(request.forward_scheme, ForwardScheme::Https);

        let request = to_proxy_host(&site(443, &[("/", "https://backend:80")])).unwrap();
        assert_eq!(request.forward_port, 80);
        assert_eq!(request.forward_scheme, ForwardScheme::Http);
    }

    #[test]
    fn test_resolve_forward_drops_path() {
        assert_eq!(
            resolve_forward("http://10.0.0.2:9000/api/", 443).unwrap(),
            ForwardTarget {
                host: "10.0.0.2".to_string(),
                port: 9000
            }
        );
        assert_eq!(
            resolve_forward("backend/app", 80).unwrap(),
            ForwardTarget {
                host: "backend".to_string(),
                port: 80
            }
        );
    }

    #[test]
    fn test_invalid_port() {
        assert_eq!(
            resolve_forward("http://backend:http", 443),
            Err(TransformError::InvalidPort {
                target: "http://backend:http".to_string()
            })
        );

        let broken = site(443, &[("/", "http://a:80"), ("/api", "http://b:70000")]);
        assert_eq!(
            to_proxy_host(&broken),
            Err(TransformError::InvalidPort {
                target: "http://b:70000".to_string()
            })
        );
    }

    #[test]
    fn test_no_locations() {
        assert_eq!(to_proxy_host(&site(443, &[])), Err(TransformError::NoLocations));
    }

    #[test]
    fn test_advanced_config_lists_every_location() {
        let request =
            to_proxy_host(&site(443, &[("/", "http://a:80"), ("/api", "http://b:9000")])).unwrap();

        assert_eq!(
            request.advanced_config,
            "location / {\n    proxy_pass http://a:80;\n}\nlocation /api {\n    proxy_pass http://b:9000;\n}"
        );
        assert_eq!(request.forward_host, "a");
        assert_eq!(request.forward_scheme, ForwardScheme::Http);
    }

    #[test]
    fn test_fixed_fields() {
        let request = to_proxy_host(&site(443, &[("/", "http://backend")])).unwrap();
        assert_eq!(request.domain_names, vec!["a.example.com".to_string()]);
        assert!(request.ssl_forced);
        assert!(!request.caching_enabled);
        assert!(!request.block_exploits);
        assert_eq!(request.access_list_id, 0);
        assert_eq!(request.certificate_id, 0);
        assert_eq!(request.meta, ProxyHostMeta::default());
    }
}
