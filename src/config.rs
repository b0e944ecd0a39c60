//! Configuration management for gddns.

use crate::detector::{AddressSource, IpFamily};
use crate::error::{DdnsError, Result};
use crate::providers::DEFAULT_UPDATE_URL;
use crate::resolver::{default_fallback_nameservers, default_primary_nameservers};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default "what is my IP" echo endpoint.
pub const DEFAULT_CHECKIP_URL: &str = "https://domains.google.com/checkip";

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Provider-generated username.
    pub username: String,

    /// Provider-generated password (or environment variable name if prefixed with $).
    pub password: String,

    /// File holding the password; replaces `password` when set.
    pub password_file: Option<PathBuf>,

    /// FQDN of the record to update.
    pub hostname: String,

    /// Interface to read the address from; overrides `url` when set.
    pub interface: Option<String>,

    /// Manage the AAAA record instead of the A record.
    pub ipv6: bool,

    /// Mark the record offline.
    pub offline: bool,

    /// Log what would change without updating.
    pub dryrun: bool,

    /// Echo endpoint used to discover the public address.
    pub url: String,

    /// dyndns2 update endpoint.
    pub update_url: String,

    /// Nameservers queried first for the current record.
    pub primary_nameservers: Vec<SocketAddr>,

    /// Nameservers queried when the primary lookup fails.
    pub fallback_nameservers: Vec<SocketAddr>,

    /// Deadline for one discover/resolve/update run, in seconds.
    pub timeout_secs: u64,

    /// Deadline for one nameserver group's lookup, in seconds.
    pub dns_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            password_file: None,
            hostname: String::new(),
            interface: None,
            ipv6: false,
            offline: false,
            dryrun: false,
            url: DEFAULT_CHECKIP_URL.to_string(),
            update_url: DEFAULT_UPDATE_URL.to_string(),
            primary_nameservers: default_primary_nameservers(),
            fallback_nameservers: default_fallback_nameservers(),
            timeout_secs: 30,
            dns_timeout_secs: 5,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct Overrides {
    /// Provider-generated username
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Provider-generated password
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Path to a file holding the password, used instead of --password
    #[arg(long, global = true)]
    pub password_file: Option<PathBuf>,

    /// FQDN of the hostname to update
    #[arg(long, global = true)]
    pub hostname: Option<String>,

    /// Interface to read the address from, overrides --url
    #[arg(long, global = true)]
    pub interface: Option<String>,

    /// URL used to GET the external IP address
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// dyndns2 update endpoint
    #[arg(long, global = true)]
    pub update_url: Option<String>,

    /// Use the IPv6 address instead of the IPv4 address
    #[arg(long, global = true)]
    pub ipv6: bool,

    /// Set the host record as offline (inactive)
    #[arg(long, global = true)]
    pub offline: bool,
}

impl Config {
    /// Load configuration from a specific path.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply command-line values on top of the file values.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(username) = overrides.username {
            self.username = username;
        }
        if let Some(password) = overrides.password {
            self.password = password;
        }
        if overrides.password_file.is_some() {
            self.password_file = overrides.password_file;
        }
        if let Some(hostname) = overrides.hostname {
            self.hostname = hostname;
        }
        if overrides.interface.is_some() {
            self.interface = overrides.interface;
        }
        if let Some(url) = overrides.url {
            self.url = url;
        }
        if let Some(update_url) = overrides.update_url {
            self.update_url = update_url;
        }
        self.ipv6 |= overrides.ipv6;
        self.offline |= overrides.offline;
        self
    }

    /// Check that credentials and a hostname are present.
    pub fn validate(&self) -> Result<()> {
        if self.password.is_empty() && self.password_file.is_none() {
            return Err(DdnsError::Config(
                "both --password and --password-file values missing".to_string(),
            ));
        }
        if self.username.is_empty() {
            return Err(DdnsError::Config("--username value missing".to_string()));
        }
        if self.hostname.is_empty() {
            return Err(DdnsError::Config("--hostname value missing".to_string()));
        }
        Ok(())
    }

    /// Replace `password` with the content of `password_file`, if set.
    pub fn resolve_password(&mut self) -> Result<()> {
        if let Some(path) = &self.password_file {
            let content = std::fs::read_to_string(path).map_err(|e| {
                DdnsError::Config(format!("reading {}: {}", path.display(), e))
            })?;
            self.password = content.trim_end().to_string();
        }
        Ok(())
    }

    /// Where to discover the public address from.
    pub fn address_source(&self) -> AddressSource {
        match &self.interface {
            Some(name) if !name.is_empty() => AddressSource::Interface(name.clone()),
            _ => AddressSource::Url(self.url.clone()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Per-group lookup deadline, capped at a third of the run deadline so
    /// the primary group alone can never use up the run.
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs).min(self.timeout() / 3)
    }

    pub fn family(&self) -> IpFamily {
        IpFamily::from_ipv6_flag(self.ipv6)
    }
}
