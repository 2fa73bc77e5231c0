use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::NpmConfig;
use crate::types::ProxyHostRequest;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("token response has no `token` field")]
    MissingToken,
}

/// Создание proxy host в NPM
#[async_trait]
pub trait ProxyHostApi: Send + Sync {
    async fn create_proxy_host(&self, request: &ProxyHostRequest) -> Result<Value, ApiError>;
}

/// Получение авторизованной сессии NPM
#[async_trait]
pub trait Authenticator: Send + Sync {
    type Api: ProxyHostApi;

    async fn authenticate(&self) -> Result<Self::Api, ApiError>;
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    identity: &'a str,
    secret: &'a str,
}

/// HTTP клиент Nginx Proxy Manager до авторизации
#[derive(Debug, Clone)]
pub struct NpmClient {
    client: Client,
    host: String,
    user: String,
    password: String,
}

impl NpmClient {
    pub fn new(config: &NpmConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(seconds) = config.timeout {
            builder = builder.timeout(Duration::from_secs(seconds));
        }

        Ok(Self {
            client: builder.build()?,
            host: config.host.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl Authenticator for NpmClient {
    type Api = AuthenticatedClient;

    /// `POST /api/tokens`, без повторов
    async fn authenticate(&self) -> Result<AuthenticatedClient, ApiError> {
        let url = format!("{}/api/tokens", self.host);
        debug!("Requesting NPM token from {} as {}", url, self.user);

        let response = self
            .client
            .post(&url)
            .json(&TokenRequest {
                identity: &self.user,
                secret: &self.password,
            })
            .send()
            .await?;
        let body: Value = ensure_success(&url, response).await?.json().await?;

        let token = body
            .get("token")
            .and_then(Value::as_str)
            .ok_or(ApiError::MissingToken)?
            .to_string();

        info!("Authenticated against NPM at {}", self.host);
        Ok(AuthenticatedClient {
            client: self.client.clone(),
            host: self.host.clone(),
            token,
        })
    }
}

/// Клиент с bearer токеном, полученным из `/api/tokens`
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    client: Client,
    host: String,
    token: String,
}

#[async_trait]
impl ProxyHostApi for AuthenticatedClient {
    async fn create_proxy_host(&self, request: &ProxyHostRequest) -> Result<Value, ApiError> {
        let url = format!("{}/api/nginx/proxy-hosts", self.host);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        Ok(ensure_success(&url, response).await?.json().await?)
    }
}

async fn ensure_success(url: &str, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        url: url.to_string(),
        status,
        body,
    })
}
