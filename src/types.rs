use serde::Serialize;

/// Один location из server блока: путь и адрес backend из proxy_pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRule {
    pub path: String,
    /// Адрес в виде `scheme://host[:port]`, как записан в конфиге
    pub target: String,
}

/// Нормализованное описание одного виртуального хоста nginx
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRecord {
    pub server_name: String,
    pub ssl_certificate_path: String,
    pub ssl_certificate_key_path: String,
    /// Порт из `listen <addr>:<port> ssl;`
    pub listen_port: u16,
    pub locations: Vec<LocationRule>,
}

/// Схема, по которой NPM ходит в backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwardScheme {
    Http,
    Https,
}

impl ForwardScheme {
    /// Порт 80 считаем http, всё остальное https (эвристика, не проверка протокола)
    pub fn for_port(port: u16) -> Self {
        if port == 80 {
            ForwardScheme::Http
        } else {
            ForwardScheme::Https
        }
    }
}

impl std::fmt::Display for ForwardScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForwardScheme::Http => write!(f, "http"),
            ForwardScheme::Https => write!(f, "https"),
        }
    }
}

/// Метаданные автоматического выпуска сертификата (всегда выключено)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProxyHostMeta {
    pub letsencrypt_agree: bool,
    pub dns_challenge: bool,
}

/// Тело запроса `POST /api/nginx/proxy-hosts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyHostRequest {
    pub domain_names: Vec<String>,
    pub forward_scheme: ForwardScheme,
    pub forward_host: String,
    pub forward_port: u16,
    /// 0 = без access list, настраивается вручную после миграции
    pub access_list_id: u32,
    /// 0 = без сертификата, привязка сертификата остаётся ручной
    pub certificate_id: u32,
    pub ssl_forced: bool,
    pub caching_enabled: bool,
    pub block_exploits: bool,
    pub advanced_config: String,
    pub meta: ProxyHostMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scheme_from_port() {
        assert_eq!(ForwardScheme::for_port(80), ForwardScheme::Http);
        assert_eq!(ForwardScheme::for_port(443), ForwardScheme::Https);
        assert_eq!(ForwardScheme::for_port(8080), ForwardScheme::Https);
    }

    #[test]
    fn test_request_uses_npm_field_names() {
        let request = ProxyHostRequest {
            domain_names: vec!["a.example.com".to_string()],
            forward_scheme: ForwardScheme::Http,
            forward_host: "backend".to_string(),
            forward_port: 80,
            access_list_id: 0,
            certificate_id: 0,
            ssl_forced: true,
            caching_enabled: false,
            block_exploits: false,
            advanced_config: String::new(),
            meta: ProxyHostMeta::default(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "domain_names": ["a.example.com"],
                "forward_scheme": "http",
                "forward_host": "backend",
                "forward_port": 80,
                "access_list_id": 0,
                "certificate_id": 0,
                "ssl_forced": true,
                "caching_enabled": false,
                "block_exploits": false,
                "advanced_config": "",
                "meta": {
                    "letsencrypt_agree": false,
                    "dns_challenge": false
                }
            })
        );
    }
}
