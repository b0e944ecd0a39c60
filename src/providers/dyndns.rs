//! dyndns2 protocol provider (Google Domains, and compatible endpoints).
//!
//! An update is a single authenticated GET:
//! `GET /nic/update?hostname=<fqdn>&myip=<ip>[&offline=yes]`, answered with a
//! plain-text body such as `good 1.2.3.4`, `nochg 1.2.3.4` or an error token.

use super::{DdnsProvider, UpdateResult};
use crate::error::{DdnsError, ProviderResponse, Result};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

pub const DEFAULT_UPDATE_URL: &str = "https://domains.google.com/nic/update";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// dyndns2 DDNS provider.
pub struct DynDnsProvider {
    client: reqwest::Client,
    username: String,
    password: String,
    hostname: String,
    offline: bool,
    base_url: String,
}

impl DynDnsProvider {
    /// Create a new provider talking to the Google Domains endpoint.
    pub fn new(
        username: String,
        password: String,
        hostname: String,
        offline: bool,
    ) -> Result<Self> {
        Self::with_base_url(
            username,
            password,
            hostname,
            offline,
            DEFAULT_UPDATE_URL.to_string(),
            DEFAULT_TIMEOUT,
        )
    }

    /// Create with a custom update endpoint and request timeout.
    pub fn with_base_url(
        username: String,
        password: String,
        hostname: String,
        offline: bool,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::user_agent())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            username,
            password,
            hostname,
            offline,
            base_url,
        })
    }

    fn query(&self, ip: IpAddr) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("hostname", self.hostname.clone()),
            ("myip", ip.to_string()),
        ];
        if self.offline {
            params.push(("offline", "yes".to_string()));
        }
        params
    }
}

#[async_trait]
impl DdnsProvider for DynDnsProvider {
    fn name(&self) -> &'static str {
        "dyndns"
    }

    fn domain(&self) -> String {
        self.hostname.clone()
    }

    async fn update_ip(&self, ip: IpAddr) -> Result<UpdateResult> {
        let response = self
            .client
            .get(&self.base_url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&self.query(ip))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DdnsError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        if let Some(code) = ProviderResponse::parse(&text) {
            tracing::debug!("{} rejected update of {}: {:?}", self.base_url, self.hostname, text);
            return Err(code.into());
        }

        Ok(UpdateResult {
            provider: self.name().to_string(),
            domain: self.domain(),
            ip,
            response: text.trim().to_string(),
            timestamp: chrono::Utc::now(),
        })
    }

    async fn validate(&self) -> Result<()> {
        let missing = if self.username.is_empty() {
            Some("Username")
        } else if self.password.is_empty() {
            Some("Password")
        } else if self.hostname.is_empty() {
            Some("Hostname")
        } else {
            None
        };

        match missing {
            Some(field) => Err(DdnsError::Config(format!("{} is empty", field))),
            None => Ok(()),
        }
    }
}
