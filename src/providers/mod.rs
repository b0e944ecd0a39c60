//! DDNS provider implementations.

mod dyndns;

pub use dyndns::{DynDnsProvider, DEFAULT_UPDATE_URL};

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Result of a DNS update operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResult {
    /// Provider name.
    pub provider: String,
    /// Hostname that was updated.
    pub domain: String,
    /// New IP address.
    pub ip: IpAddr,
    /// Raw response body, e.g. `good 1.2.3.4` or `nochg 1.2.3.4`.
    pub response: String,
    /// Timestamp of the update.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Trait for DDNS providers.
#[async_trait]
pub trait DdnsProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// Get the hostname being managed.
    fn domain(&self) -> String;

    /// Point the record at `ip`.
    async fn update_ip(&self, ip: IpAddr) -> Result<UpdateResult>;

    /// Validate provider configuration/credentials.
    async fn validate(&self) -> Result<()>;
}

/// Create a provider from configuration.
pub fn create_provider(config: &Config) -> Result<Box<dyn DdnsProvider>> {
    let provider = DynDnsProvider::with_base_url(
        config.username.clone(),
        resolve_env(&config.password),
        config.hostname.clone(),
        config.offline,
        config.update_url.clone(),
        config.timeout(),
    )?;
    Ok(Box::new(provider))
}

/// Resolve environment variable references (values starting with $).
fn resolve_env(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_else(|_| {
            tracing::warn!("Environment variable {} not set", var_name);
            value.to_string()
        })
    } else {
        value.to_string()
    }
}
