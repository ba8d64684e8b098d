//! Vault `aws` auth method login client.

use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identity::IamLoginData;

/// Path the `aws` auth method is mounted at unless configured otherwise.
pub const DEFAULT_MOUNT: &str = "aws";

/// Where to find Vault and its `aws` auth method.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    addr: Url,
    mount: String,
}

impl VaultConfig {
    /// Validates `addr` as an absolute http(s) URL and normalizes `mount`.
    pub fn new(addr: &str, mount: &str) -> Result<Self> {
        let addr = Url::parse(addr)
            .map_err(|e| Error::Config(format!("invalid Vault address {addr:?}: {e}")))?;

        if !matches!(addr.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "unsupported Vault address scheme: {}",
                addr.scheme()
            )));
        }

        let mount = mount.trim_matches('/');
        if mount.is_empty() {
            return Err(Error::Config("auth mount must not be empty".to_string()));
        }

        Ok(Self {
            addr,
            mount: mount.to_owned(),
        })
    }

    pub fn login_url(&self) -> String {
        format!(
            "{}/v1/auth/{}/login",
            self.addr.as_str().trim_end_matches('/'),
            self.mount
        )
    }
}

/// Login request body: the identity proof plus the requested role.
#[derive(Debug, Serialize)]
pub struct LoginPayload<'a> {
    #[serde(flatten)]
    pub identity: &'a IamLoginData,
    pub role: &'a str,
}

/// Raw answer from Vault.
#[derive(Debug, Clone)]
pub struct LoginReply {
    pub status: StatusCode,
    pub body: String,
}

/// Parsed login response; Vault sends `errors` instead of `auth` on failure.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub auth: Option<AuthInfo>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthInfo {
    pub client_token: String,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
}

impl LoginResponse {
    pub fn into_token(self) -> Result<String> {
        match self.auth {
            Some(auth) if !auth.client_token.is_empty() => {
                info!(
                    lease_duration = auth.lease_duration,
                    renewable = auth.renewable,
                    "Vault issued client token"
                );
                Ok(auth.client_token)
            }
            _ => Err(Error::MissingToken(self.errors)),
        }
    }
}

/// Sends login payloads to one Vault server.
#[derive(Debug, Clone)]
pub struct VaultClient {
    config: VaultConfig,
    http: reqwest::Client,
}

impl VaultClient {
    pub fn new(config: VaultConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Posts `identity` for `role` to the login endpoint. Any HTTP status is
    /// returned as a reply; only transport failures are errors.
    pub async fn login(&self, role: &str, identity: &IamLoginData) -> Result<LoginReply> {
        let url = self.config.login_url();
        let body = serde_json::to_vec(&LoginPayload { identity, role })?;

        debug!(%url, role, "Submitting Vault login");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        debug!(%status, bytes = body.len(), "Received Vault login response");

        Ok(LoginReply { status, body })
    }
}
