use std::fs;
use std::path::Path;

use log::debug;
use once_cell::sync::Lazy;
use regex::{Regex, Split};
use thiserror::Error;

use crate::types::{LocationRule, SiteRecord};

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#.*$").expect("comment regex"));

/// Начало виртуального хоста: `server {` в начале строки
static SERVER_BOUNDARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^server\s*\{").expect("server boundary regex"));

static SERVER_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bserver_name\s+([^;]+);").expect("server_name regex"));

static SSL_CERTIFICATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bssl_certificate\s+([^\s;]+)\s*;").expect("ssl_certificate regex")
});

static SSL_CERTIFICATE_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bssl_certificate_key\s+([^\s;]+)\s*;").expect("ssl_certificate_key regex")
});

/// Только listen с явным маркером `ssl`, остальные listen игнорируются
static LISTEN_SSL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\blisten\s+\S+:(\d+)\s+ssl\b[^;]*;").expect("listen regex"));

/// `location [=|~|~*|^~] <path> { ... }` без вложенных фигурных скобок
static LOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\blocation\s+((?:(?:=|~\*?|\^~)\s+)?[^\s{]+)\s*\{([^{}]*)\}")
        .expect("location regex")
});

static NESTED_LOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\blocation\s+((?:(?:=|~\*?|\^~)\s+)?[^\s{]+)\s*\{[^{}]*\{")
        .expect("nested location regex")
});

/// Путь location с фигурной скобкой внутри, например `~ ^/x{2}`
static BRACED_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\blocation\s+((?:(?:=|~\*?|\^~)\s+)?[^\s{]*\{\S+)")
        .expect("braced location path regex")
});

static PROXY_PASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bproxy_pass\s+([^\s;]+)\s*;").expect("proxy_pass regex"));

/// Ошибка извлечения одного server блока. Номер блока считается с 1.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("server block #{block}: missing `{directive}` directive")]
    MissingDirective {
        block: usize,
        directive: &'static str,
    },

    #[error("server block #{block}: invalid TLS listen port `{value}`")]
    InvalidListenPort { block: usize, value: String },

    #[error("server block #{block}: location `{path}` contains nested braces, which are not supported")]
    NestedLocation { block: usize, path: String },

    #[error("server block #{block}: location path `{path}` contains braces, which are not supported")]
    BracedLocationPath { block: usize, path: String },
}

impl ExtractError {
    pub fn block(&self) -> usize {
        match self {
            ExtractError::MissingDirective { block, .. }
            | ExtractError::InvalidListenPort { block, .. }
            | ExtractError::NestedLocation { block, .. }
            | ExtractError::BracedLocationPath { block, .. } => *block,
        }
    }
}

/// Исходный nginx конфиг, очищенный от комментариев
#[derive(Debug, Clone)]
pub struct NginxSource {
    content: String,
}

impl NginxSource {
    /// Читает конфиг с диска
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn parse(raw: &str) -> Self {
        Self {
            content: Self::remove_comments(raw),
        }
    }

    /// Ленивая последовательность сайтов, по одному на каждый server блок.
    /// Текст до первого `server {` отбрасывается.
    pub fn sites(&self) -> SiteRecords<'_> {
        SiteRecords {
            blocks: SERVER_BOUNDARY_RE.split(&self.content).skip(1).enumerate(),
        }
    }

    /// Удаляет комментарии из конфига
    fn remove_comments(content: &str) -> String {
        content
            .lines()
            .map(|line| COMMENT_RE.replace(line, "").trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Итератор по server блокам; каждый блок разбирается независимо
pub struct SiteRecords<'a> {
    blocks: std::iter::Enumerate<std::iter::Skip<Split<'static, 'a>>>,
}

impl<'a> Iterator for SiteRecords<'a> {
    type Item = Result<SiteRecord, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, block) = self.blocks.next()?;
        Some(parse_server_block(index + 1, block))
    }
}

/// Парсит server блок
fn parse_server_block(block: usize, content: &str) -> Result<SiteRecord, ExtractError> {
    let server_name = SERVER_NAME_RE
        .captures(content)
        .and_then(|cap| cap.get(1))
        .and_then(|names| names.as_str().split_whitespace().next())
        .ok_or(ExtractError::MissingDirective {
            block,
            directive: "server_name",
        })?
        .to_string();

    let ssl_certificate_path = capture_directive(&SSL_CERTIFICATE_RE, content).ok_or(
        ExtractError::MissingDirective {
            block,
            directive: "ssl_certificate",
        },
    )?;

    let ssl_certificate_key_path = capture_directive(&SSL_CERTIFICATE_KEY_RE, content).ok_or(
        ExtractError::MissingDirective {
            block,
            directive: "ssl_certificate_key",
        },
    )?;

    let port_str = capture_directive(&LISTEN_SSL_RE, content).ok_or(
        ExtractError::MissingDirective {
            block,
            directive: "listen ... ssl",
        },
    )?;
    let listen_port = port_str
        .parse::<u16>()
        .map_err(|_| ExtractError::InvalidListenPort {
            block,
            value: port_str.clone(),
        })?;

    let locations = parse_locations(block, content)?;

    Ok(SiteRecord {
        server_name,
        ssl_certificate_path,
        ssl_certificate_key_path,
        listen_port,
        locations,
    })
}

fn capture_directive(regex: &Regex, content: &str) -> Option<String> {
    regex
        .captures(content)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Парсит location блоки с proxy_pass в порядке появления
fn parse_locations(block: usize, content: &str) -> Result<Vec<LocationRule>, ExtractError> {
    if let Some(cap) = BRACED_PATH_RE.captures(content) {
        let path = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
        return Err(ExtractError::BracedLocationPath {
            block,
            path: path.to_string(),
        });
    }

    if let Some(cap) = NESTED_LOCATION_RE.captures(content) {
        let path = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
        return Err(ExtractError::NestedLocation {
            block,
            path: path.to_string(),
        });
    }

    let mut locations = Vec::new();
    for cap in LOCATION_RE.captures_iter(content) {
        if let (Some(path), Some(body)) = (cap.get(1), cap.get(2)) {
            match capture_directive(&PROXY_PASS_RE, body.as_str()) {
                Some(target) => locations.push(LocationRule {
                    path: path.as_str().to_string(),
                    target,
                }),
                None => debug!(
                    "server block #{}: location {} has no proxy_pass, skipping",
                    block,
                    path.as_str()
                ),
            }
        }
    }

    Ok(locations)
}
