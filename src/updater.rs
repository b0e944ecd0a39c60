//! Discover, compare and update: one run of the DDNS pipeline.

use crate::config::Config;
use crate::detector::{Address, AddressSource, IpDetector, IpFamily};
use crate::error::{DdnsError, Result};
use crate::providers::{create_provider, DdnsProvider, UpdateResult};
use crate::resolver::{DnsRecordResolver, RecordResolver};
use serde::Serialize;
use std::net::IpAddr;
use std::time::Duration;

/// What a run did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The record already points at the discovered address.
    Unchanged { hostname: String, ip: IpAddr },
    /// An update was due but dry-run mode suppressed it.
    DryRun {
        hostname: String,
        previous_ip: Option<IpAddr>,
        ip: IpAddr,
    },
    /// The provider accepted the update.
    Updated(UpdateResult),
}

/// Discovered address next to the published record, without updating.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub hostname: String,
    pub family: IpFamily,
    pub discovered: Address,
    pub current_ip: Option<IpAddr>,
    pub record_ip: Option<IpAddr>,
    pub record_error: Option<String>,
    pub up_to_date: bool,
}

/// Runs the discover → resolve → update pipeline for one hostname.
pub struct Updater {
    detector: IpDetector,
    resolver: Box<dyn RecordResolver>,
    provider: Box<dyn DdnsProvider>,
    source: AddressSource,
    family: IpFamily,
    timeout: Duration,
}

impl Updater {
    pub fn new(
        detector: IpDetector,
        resolver: Box<dyn RecordResolver>,
        provider: Box<dyn DdnsProvider>,
        source: AddressSource,
        family: IpFamily,
        timeout: Duration,
    ) -> Self {
        Self {
            detector,
            resolver,
            provider,
            source,
            family,
            timeout,
        }
    }

    /// Build the pipeline from a validated configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.timeout();
        let resolver = DnsRecordResolver::with_nameservers(
            config.primary_nameservers.clone(),
            config.fallback_nameservers.clone(),
            config.dns_timeout(),
        );

        Ok(Self::new(
            IpDetector::new(timeout)?,
            Box::new(resolver),
            create_provider(config)?,
            config.address_source(),
            config.family(),
            timeout,
        ))
    }

    pub fn provider(&self) -> &dyn DdnsProvider {
        self.provider.as_ref()
    }

    /// Run the pipeline once, bounded by the configured timeout.
    ///
    /// With `force` the record comparison is skipped and a failed record
    /// lookup is tolerated.
    pub async fn run(&self, dry_run: bool, force: bool) -> Result<Outcome> {
        tokio::time::timeout(self.timeout, self.run_once(dry_run, force))
            .await
            .map_err(|_| DdnsError::Timeout(self.timeout.as_secs()))?
    }

    async fn run_once(&self, dry_run: bool, force: bool) -> Result<Outcome> {
        let hostname = self.provider.domain();
        let ip = self.detector.detect(&self.source).await?.select(self.family)?;

        let previous_ip = match self.resolver.resolve(&hostname, self.family).await {
            Ok(record) => Some(record),
            Err(e) if force => {
                tracing::warn!("Ignoring failed lookup of {}: {}", hostname, e);
                None
            }
            Err(e) => return Err(e),
        };

        if !force && previous_ip == Some(ip) {
            tracing::info!("{} not modified: {} (no change)", hostname, ip);
            return Ok(Outcome::Unchanged { hostname, ip });
        }

        if dry_run {
            tracing::info!("[dryrun] setting {} to {}", hostname, ip);
            return Ok(Outcome::DryRun {
                hostname,
                previous_ip,
                ip,
            });
        }

        tracing::info!("setting {} to {}", hostname, ip);
        let result = self.provider.update_ip(ip).await?;
        tracing::info!("{} updated to {}: {:?}", hostname, ip, result.response);
        Ok(Outcome::Updated(result))
    }

    /// Discover and resolve without updating.
    pub async fn status(&self) -> Result<Status> {
        tokio::time::timeout(self.timeout, self.status_once())
            .await
            .map_err(|_| DdnsError::Timeout(self.timeout.as_secs()))?
    }

    async fn status_once(&self) -> Result<Status> {
        let hostname = self.provider.domain();
        let discovered = self.detector.detect(&self.source).await?;
        let current_ip = discovered.select(self.family).ok();

        let (record_ip, record_error) = match self.resolver.resolve(&hostname, self.family).await {
            Ok(ip) => (Some(ip), None),
            Err(e) => (None, Some(e.to_string())),
        };

        Ok(Status {
            up_to_date: current_ip.is_some() && current_ip == record_ip,
            hostname,
            family: self.family,
            discovered,
            current_ip,
            record_ip,
            record_error,
        })
    }
}
