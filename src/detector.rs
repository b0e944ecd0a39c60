//! Public IP detection.

use crate::error::{DdnsError, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Address family of the record being managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    pub fn from_ipv6_flag(ipv6: bool) -> Self {
        if ipv6 {
            IpFamily::V6
        } else {
            IpFamily::V4
        }
    }
}

/// Where to discover the host's address from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSource {
    /// A "what is my IP" echo endpoint answering with one address per line.
    Url(String),
    /// A local network interface, by name.
    Interface(String),
}

impl std::fmt::Display for AddressSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressSource::Url(url) => write!(f, "url {}", url),
            AddressSource::Interface(name) => write!(f, "interface {}", name),
        }
    }
}

/// Addresses discovered from a single source, at most one per family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Address {
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl Address {
    /// Fold addresses into one per family; the last one seen wins.
    pub fn collect<I>(addrs: I) -> Self
    where
        I: IntoIterator<Item = IpAddr>,
    {
        let mut address = Address::default();
        for ip in addrs {
            match ip {
                IpAddr::V4(v4) => address.ipv4 = Some(v4),
                IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                    Some(v4) => address.ipv4 = Some(v4),
                    None => address.ipv6 = Some(v6),
                },
            }
        }
        address
    }

    /// Pick the address of the requested family.
    pub fn select(&self, family: IpFamily) -> Result<IpAddr> {
        match family {
            IpFamily::V4 => self.ipv4.map(IpAddr::V4).ok_or_else(|| {
                DdnsError::IpDetection("no IPv4 address found".to_string())
            }),
            IpFamily::V6 => self.ipv6.map(IpAddr::V6).ok_or_else(|| {
                DdnsError::IpDetection("no IPv6 address found".to_string())
            }),
        }
    }
}

/// IP detector backed by an echo endpoint or a local interface.
pub struct IpDetector {
    client: reqwest::Client,
}

impl IpDetector {
    /// Create a new IP detector.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::user_agent())
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Discover addresses from the given source.
    pub async fn detect(&self, source: &AddressSource) -> Result<Address> {
        let address = match source {
            AddressSource::Url(url) => self.fetch_url(url).await?,
            AddressSource::Interface(name) => Self::read_interface(name)?,
        };
        tracing::debug!(?address, "Discovered addresses from {}", source);
        Ok(address)
    }

    /// GET an echo endpoint and parse every line of the body as an address.
    pub async fn fetch_url(&self, url: &str) -> Result<Address> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(DdnsError::IpDetection(format!(
                "unexpected response code {} from {}, wanted 2xx",
                response.status().as_u16(),
                url
            )));
        }

        let text = response.text().await?;
        Ok(Address::collect(
            text.lines().filter_map(|line| line.trim().parse().ok()),
        ))
    }

    /// Read the addresses assigned to a local interface.
    pub fn read_interface(name: &str) -> Result<Address> {
        let interfaces = if_addrs::get_if_addrs()?;
        let addrs: Vec<IpAddr> = interfaces
            .iter()
            .filter(|iface| iface.name == name)
            .map(|iface| iface.ip())
            .collect();

        if addrs.is_empty() {
            return Err(DdnsError::IpDetection(format!(
                "no addresses on interface {}",
                name
            )));
        }

        Ok(Address::collect(addrs))
    }
}
