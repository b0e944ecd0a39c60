//! Lookup of the DNS record currently published for a hostname.

use crate::detector::IpFamily;
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use hickory_resolver::config::{
    LookupIpStrategy, NameServerConfigGroup, ResolverConfig, ResolverOpts,
};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{Resolver, TokioResolver};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Google Public DNS.
pub fn default_primary_nameservers() -> Vec<SocketAddr> {
    vec![
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 53),
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 4, 4)), 53),
    ]
}

/// Cloudflare DNS.
pub fn default_fallback_nameservers() -> Vec<SocketAddr> {
    vec![
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), 53),
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 0, 0, 1)), 53),
    ]
}

/// Resolves the single address a hostname currently points at.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordResolver: Send + Sync {
    async fn resolve(&self, hostname: &str, family: IpFamily) -> Result<IpAddr>;
}

/// Queries one fixed group of nameservers, bypassing the system resolver.
pub struct NameserverResolver {
    servers: Vec<SocketAddr>,
    timeout: Duration,
    resolver_by_family: [TokioResolver; 2],
}

impl NameserverResolver {
    pub fn new(servers: Vec<SocketAddr>, timeout: Duration) -> Self {
        let resolver_by_family = [
            Self::build(&servers, LookupIpStrategy::Ipv4Only, timeout),
            Self::build(&servers, LookupIpStrategy::Ipv6Only, timeout),
        ];
        Self {
            servers,
            timeout,
            resolver_by_family,
        }
    }

    fn build(servers: &[SocketAddr], strategy: LookupIpStrategy, timeout: Duration) -> TokioResolver {
        let mut group = NameServerConfigGroup::with_capacity(servers.len() * 2);
        for server in servers {
            group.merge(NameServerConfigGroup::from_ips_clear(
                &[server.ip()],
                server.port(),
                true,
            ));
        }
        let config = ResolverConfig::from_parts(None, vec![], group);

        let mut opts = ResolverOpts::default();
        opts.ip_strategy = strategy;
        opts.timeout = timeout;
        opts.attempts = 1;
        opts.cache_size = 0;

        Resolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build()
    }

    pub fn servers(&self) -> &[SocketAddr] {
        &self.servers
    }
}

#[async_trait]
impl RecordResolver for NameserverResolver {
    async fn resolve(&self, hostname: &str, family: IpFamily) -> Result<IpAddr> {
        let resolver = match family {
            IpFamily::V4 => &self.resolver_by_family[0],
            IpFamily::V6 => &self.resolver_by_family[1],
        };

        let fqdn = if hostname.ends_with('.') {
            hostname.to_string()
        } else {
            format!("{}.", hostname)
        };

        // One lookup may walk several servers; bound the whole walk so a
        // silent group still leaves time for the fallback.
        let lookup = tokio::time::timeout(self.timeout, resolver.lookup_ip(fqdn))
            .await
            .map_err(|_| {
                DdnsError::Dns(format!(
                    "no answer from {:?} within {}ms",
                    self.servers,
                    self.timeout.as_millis()
                ))
            })??;
        single_address(lookup.iter().collect())
    }
}

/// A record must map to exactly one address of the managed family.
fn single_address(addrs: Vec<IpAddr>) -> Result<IpAddr> {
    match addrs.as_slice() {
        [addr] => Ok(*addr),
        _ => Err(DdnsError::Dns(format!(
            "expected 1 address, got {}: {:?}",
            addrs.len(),
            addrs
        ))),
    }
}

/// Tries `primary` and falls back to `fallback` on any error.
pub struct FallbackResolver<P, F> {
    primary: P,
    fallback: F,
}

/// Resolver dialing Google Public DNS first and Cloudflare second.
pub type DnsRecordResolver = FallbackResolver<NameserverResolver, NameserverResolver>;

impl<P, F> FallbackResolver<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl DnsRecordResolver {
    pub fn with_nameservers(
        primary: Vec<SocketAddr>,
        fallback: Vec<SocketAddr>,
        timeout: Duration,
    ) -> Self {
        Self::new(
            NameserverResolver::new(primary, timeout),
            NameserverResolver::new(fallback, timeout),
        )
    }
}

#[async_trait]
impl<P, F> RecordResolver for FallbackResolver<P, F>
where
    P: RecordResolver,
    F: RecordResolver,
{
    async fn resolve(&self, hostname: &str, family: IpFamily) -> Result<IpAddr> {
        match self.primary.resolve(hostname, family).await {
            Ok(addr) => Ok(addr),
            Err(e) => {
                tracing::warn!("Primary nameserver lookup of {} failed: {}", hostname, e);
                self.fallback.resolve(hostname, family).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_single_address() {
        let addr: IpAddr = "192.0.2.1".parse().unwrap();
        assert_eq!(single_address(vec![addr]).unwrap(), addr);
    }

    #[test]
    fn test_single_address_rejects_none_and_many() {
        assert!(matches!(single_address(vec![]), Err(DdnsError::Dns(_))));

        let err = single_address(vec![
            "192.0.2.1".parse().unwrap(),
            "192.0.2.2".parse().unwrap(),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("expected 1 address, got 2"));
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let mut primary = MockRecordResolver::new();
        primary
            .expect_resolve()
            .with(eq("home.example.com"), eq(IpFamily::V4))
            .times(1)
            .returning(|_, _| Ok("192.0.2.10".parse().unwrap()));

        let mut fallback = MockRecordResolver::new();
        fallback.expect_resolve().never();

        let resolver = FallbackResolver::new(primary, fallback);
        let addr = resolver
            .resolve("home.example.com", IpFamily::V4)
            .await
            .unwrap();
        assert_eq!(addr, "192.0.2.10".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_primary_failure_uses_fallback() {
        let mut primary = MockRecordResolver::new();
        primary
            .expect_resolve()
            .times(1)
            .returning(|_, _| Err(DdnsError::Dns("timeout".to_string())));

        let mut fallback = MockRecordResolver::new();
        fallback
            .expect_resolve()
            .with(eq("home.example.com"), eq(IpFamily::V6))
            .times(1)
            .returning(|_, _| Ok("2001:db8::10".parse().unwrap()));

        let resolver = FallbackResolver::new(primary, fallback);
        let addr = resolver
            .resolve("home.example.com", IpFamily::V6)
            .await
            .unwrap();
        assert_eq!(addr, "2001:db8::10".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_both_fail_returns_fallback_error() {
        let mut primary = MockRecordResolver::new();
        primary
            .expect_resolve()
            .returning(|_, _| Err(DdnsError::Dns("primary".to_string())));

        let mut fallback = MockRecordResolver::new();
        fallback
            .expect_resolve()
            .returning(|_, _| Err(DdnsError::Dns("fallback".to_string())));

        let resolver = FallbackResolver::new(primary, fallback);
        let err = resolver
            .resolve("home.example.com", IpFamily::V4)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "DNS lookup failed: fallback");
    }

    #[test]
    fn test_default_nameservers() {
        assert_eq!(default_primary_nameservers()[0].to_string(), "8.8.8.8:53");
        assert_eq!(default_fallback_nameservers()[0].to_string(), "1.1.1.1:53");
    }

    #[tokio::test]
    async fn test_nameserver_resolver_keeps_servers() {
        let resolver =
            NameserverResolver::new(default_primary_nameservers(), Duration::from_secs(1));
        assert_eq!(resolver.servers().len(), 2);
    }

    /// Answers every A query with 192.0.2.44 and every AAAA query with 2001:db8::44.
    async fn spawn_dual_stack_responder() -> SocketAddr {
        use hickory_resolver::proto::op::{Message, MessageType};
        use hickory_resolver::proto::rr::rdata::{A, AAAA};
        use hickory_resolver::proto::rr::{RData, Record, RecordType};

        let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let Ok(request) = Message::from_vec(&buf[..len]) else {
                    continue;
                };

                let mut response = Message::new();
                response
                    .set_id(request.id())
                    .set_message_type(MessageType::Response)
                    .set_op_code(request.op_code())
                    .set_recursion_desired(request.recursion_desired())
                    .set_recursion_available(true);

                for query in request.queries() {
                    response.add_query(query.clone());
                    let rdata = match query.query_type() {
                        RecordType::A => RData::A(A(Ipv4Addr::new(192, 0, 2, 44))),
                        RecordType::AAAA => RData::AAAA(AAAA("2001:db8::44".parse().unwrap())),
                        _ => continue,
                    };
                    response.add_answer(Record::from_rdata(query.name().clone(), 60, rdata));
                }

                let _ = socket.send_to(&response.to_vec().unwrap(), peer).await;
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_nameserver_resolver_queries_requested_family() {
        let server = spawn_dual_stack_responder().await;
        let resolver = NameserverResolver::new(vec![server], Duration::from_secs(2));

        let v4 = resolver
            .resolve("dual.example.com", IpFamily::V4)
            .await
            .unwrap();
        assert_eq!(v4, "192.0.2.44".parse::<IpAddr>().unwrap());

        let v6 = resolver
            .resolve("dual.example.com", IpFamily::V6)
            .await
            .unwrap();
        assert_eq!(v6, "2001:db8::44".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_nameserver_resolver_accepts_trailing_dot() {
        let server = spawn_dual_stack_responder().await;
        let resolver = NameserverResolver::new(vec![server], Duration::from_secs(2));

        let addr = resolver
            .resolve("dual.example.com.", IpFamily::V4)
            .await
            .unwrap();
        assert_eq!(addr, "192.0.2.44".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_silent_nameserver_times_out() {
        // Bound but never read from.
        let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let resolver = NameserverResolver::new(
            vec![silent.local_addr().unwrap()],
            Duration::from_millis(200),
        );

        let started = std::time::Instant::now();
        let err = resolver
            .resolve("home.example.com", IpFamily::V4)
            .await
            .unwrap_err();

        assert!(matches!(err, DdnsError::Dns(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
