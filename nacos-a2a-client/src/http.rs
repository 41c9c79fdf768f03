//! HTTP transport shared by the Nacos sub-services.
//!
//! Talks to the Nacos open API. Requests go to one server at a time and fail
//! over to the next one on connection errors, timeouts or 5xx answers.

use base64::Engine;
use hmac::{Hmac, Mac};
use nacos_a2a_core::{ConnectionConfig, Credentials};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{NacosError, NacosResult};

type HmacSha1 = Hmac<sha1::Sha1>;

/// Standard v2/v3 response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    #[serde(default = "default_token_ttl")]
    token_ttl: u64,
}

fn default_token_ttl() -> u64 {
    18_000
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

/// HTTP client bound to one connection configuration.
#[derive(Debug)]
pub struct NacosHttpClient {
    http: reqwest::Client,
    servers: Vec<String>,
    next: AtomicUsize,
    namespace: String,
    credentials: Option<Credentials>,
    token: Mutex<Option<AccessToken>>,
}

impl NacosHttpClient {
    /// Resolve the server list and authenticate.
    ///
    /// In endpoint mode the server list is fetched from the endpoint. With
    /// username/password credentials a login is performed eagerly so that a
    /// bad configuration fails here rather than on first use.
    pub async fn connect(config: &ConnectionConfig) -> NacosResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let context = config.context_path();

        let addresses = if config.server_addresses.is_empty() {
            match &config.endpoint {
                Some(endpoint) => fetch_server_list(&http, endpoint, context).await?,
                None => return Err(NacosError::NoServer("no address or endpoint".into())),
            }
        } else {
            config.server_addresses.clone()
        };
        if addresses.is_empty() {
            return Err(NacosError::NoServer("server list is empty".into()));
        }

        let servers = addresses
            .iter()
            .map(|addr| format!("{}/{}", with_scheme(addr), context))
            .collect();

        let client = Self {
            http,
            servers,
            next: AtomicUsize::new(0),
            namespace: config.namespace().to_string(),
            credentials: config.credentials.clone(),
            token: Mutex::new(None),
        };

        if matches!(client.credentials, Some(Credentials::Basic { .. })) {
            client.access_token().await?;
        }

        Ok(client)
    }

    /// The namespace requests are scoped to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Base URLs of the resolved servers.
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Send a request and unwrap the `{code, message, data}` envelope.
    ///
    /// GET and DELETE carry `params` in the query string, other methods as a
    /// form body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> NacosResult<Option<T>> {
        let start = self.next.fetch_add(1, Ordering::Relaxed);
        let mut last_error = None;

        for attempt in 0..self.servers.len() {
            let base = &self.servers[(start + attempt) % self.servers.len()];
            let url = format!("{}/{}", base, path.trim_start_matches('/'));

            match self.send_once(method.clone(), &url, params).await {
                Ok(data) => return Ok(data),
                Err(e) if e.is_transport() => {
                    warn!(url = %url, error = %e, "Nacos request failed, trying next server");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| NacosError::NoServer("no server tried".into())))
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
    ) -> NacosResult<Option<T>> {
        debug!(method = %method, url = %url, "Making Nacos request");

        let builder = self.http.request(method.clone(), url);
        let builder = if method == Method::GET || method == Method::DELETE {
            builder.query(params)
        } else {
            builder.form(params)
        };
        let builder = self.authorize(builder).await?;

        let response = builder.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            if matches!(self.credentials, Some(Credentials::Basic { .. })) {
                // Token may have been revoked; log in again on the next call.
                *self.token.lock().await = None;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(NacosError::Auth(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NacosError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiResponse<T> = response.json().await?;
        if envelope.code != 0 {
            return Err(NacosError::Api {
                code: envelope.code,
                message: envelope.message.unwrap_or_default(),
            });
        }
        Ok(envelope.data)
    }

    async fn authorize(&self, builder: RequestBuilder) -> NacosResult<RequestBuilder> {
        match &self.credentials {
            None => Ok(builder),
            Some(Credentials::Basic { .. }) => {
                let token = self.access_token().await?;
                Ok(builder.query(&[("accessToken", token)]))
            }
            Some(Credentials::AccessKey {
                access_key,
                secret_key,
            }) => {
                let timestamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis()
                    .to_string();
                let signature = sign(secret_key, &timestamp)?;
                Ok(builder
                    .header("Spas-AccessKey", access_key)
                    .header("Timestamp", timestamp)
                    .header("Spas-Signature", signature))
            }
        }
    }

    /// Current access token, logging in when missing or due for refresh.
    async fn access_token(&self) -> NacosResult<String> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if Instant::now() < current.refresh_at {
                return Ok(current.value.clone());
            }
        }

        let (username, password) = match &self.credentials {
            Some(Credentials::Basic { username, password }) => (username, password),
            _ => return Err(NacosError::Auth("no username/password configured".into())),
        };

        let mut last_error = None;
        for base in &self.servers {
            let url = format!("{}/v1/auth/login", base);
            let result = self
                .http
                .post(&url)
                .form(&[("username", username.as_str()), ("password", password.as_str())])
                .send()
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    warn!(url = %url, error = %e, "Nacos login failed, trying next server");
                    last_error = Some(NacosError::Http(e));
                    continue;
                }
            };

            if !response.status().is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(NacosError::Auth(body));
            }

            let login: LoginResponse = response.json().await?;
            // Refresh once 90% of the TTL has elapsed.
            let refresh_after = Duration::from_secs(login.token_ttl.saturating_mul(9) / 10);
            *token = Some(AccessToken {
                value: login.access_token.clone(),
                refresh_at: Instant::now() + refresh_after,
            });
            debug!(username = %username, "Nacos login succeeded");
            return Ok(login.access_token);
        }

        Err(last_error.unwrap_or_else(|| NacosError::NoServer("no server for login".into())))
    }
}

fn with_scheme(address: &str) -> String {
    let address = address.trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

async fn fetch_server_list(
    http: &reqwest::Client,
    endpoint: &str,
    context: &str,
) -> NacosResult<Vec<String>> {
    let url = format!("{}/{}/serverlist", with_scheme(endpoint), context);
    debug!(url = %url, "Fetching Nacos server list");

    let response = http.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(NacosError::Status {
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    let body = response.text().await?;

    Ok(body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn sign(secret_key: &str, content: &str) -> NacosResult<String> {
    let mut mac = HmacSha1::new_from_slice(secret_key.as_bytes())
        .map_err(|e| NacosError::Auth(e.to_string()))?;
    mac.update(content.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}
