use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{ResolveError, TokioResolver};
use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

use super::domain;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsError {
    #[error("NXDOMAIN: domain does not exist")]
    NxDomain,
    #[error("no records of the requested type")]
    NoRecords,
    #[error("SERVFAIL: server failure")]
    ServFail,
    #[error("timeout")]
    Timeout,
    #[error("DNS error: {0}")]
    Other(String),
}

impl DnsError {
    /// Returns `true` when the answer is authoritative but empty (the name or
    /// record type does not exist). Such answers resolve to an empty set
    /// rather than failing the lookup.
    #[must_use]
    pub const fn is_void(&self) -> bool {
        matches!(self, Self::NxDomain | Self::NoRecords)
    }
}

/// DNS resolver trait for abstracting DNS lookups
pub trait DnsResolver: Send + Sync {
    fn query_txt(&self, domain: &str) -> impl Future<Output = Result<Vec<String>, DnsError>> + Send;
    fn query_a(&self, domain: &str) -> impl Future<Output = Result<Vec<Ipv4Addr>, DnsError>> + Send;
    fn query_aaaa(&self, domain: &str) -> impl Future<Output = Result<Vec<Ipv6Addr>, DnsError>> + Send;
    fn query_mx(&self, domain: &str) -> impl Future<Output = Result<Vec<(u16, String)>, DnsError>> + Send;
}

/// Configuration for the hickory-backed resolver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    /// Per-query timeout in seconds (default: 5)
    pub timeout_secs: u64,
    /// Attempts per query before giving up (default: 2)
    pub attempts: usize,
    /// Nameservers to query over UDP/TCP port 53. Empty means the system
    /// resolver configuration.
    pub nameservers: Vec<IpAddr>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            attempts: 2,
            nameservers: Vec::new(),
        }
    }
}

impl DnsConfig {
    fn resolver_opts(&self) -> ResolverOpts {
        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(self.timeout_secs);
        opts.attempts = self.attempts;
        opts
    }
}

/// Hickory DNS resolver implementation
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: TokioResolver,
}

impl HickoryResolver {
    /// Resolver using the system configuration with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the system DNS configuration cannot be loaded.
    pub fn new() -> Result<Self, DnsError> {
        Self::from_config(&DnsConfig::default())
    }

    /// Resolver built from a [`DnsConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `nameservers` is empty and the system DNS
    /// configuration cannot be loaded.
    pub fn from_config(config: &DnsConfig) -> Result<Self, DnsError> {
        let opts = config.resolver_opts();

        if config.nameservers.is_empty() {
            let resolver = TokioResolver::builder(TokioConnectionProvider::default())
                .map_err(|e| Self::classify_error(&e))?
                .with_options(opts)
                .build();
            return Ok(Self { resolver });
        }

        let group = NameServerConfigGroup::from_ips_clear(&config.nameservers, 53, true);
        Ok(Self::with_config(ResolverConfig::from_parts(None, Vec::new(), group), opts))
    }

    pub fn with_config(config: ResolverConfig, opts: ResolverOpts) -> Self {
        let resolver = TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();
        Self { resolver }
    }

    fn classify_error(e: &ResolveError) -> DnsError {
        if e.is_nx_domain() {
            return DnsError::NxDomain;
        }
        if e.is_no_records_found() {
            return DnsError::NoRecords;
        }
        let msg = e.to_string().to_lowercase();
        if msg.contains("timed out") || msg.contains("timeout") {
            DnsError::Timeout
        } else if msg.contains("servfail") {
            DnsError::ServFail
        } else {
            DnsError::Other(e.to_string())
        }
    }
}

impl DnsResolver for HickoryResolver {
    async fn query_txt(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        match self.resolver.txt_lookup(domain).await {
            Ok(lookup) => {
                // A TXT RR may be split into several character-strings; they
                // are concatenated without separators.
                let records: Vec<String> = lookup
                    .iter()
                    .map(|txt| {
                        txt.txt_data()
                            .iter()
                            .map(|part| String::from_utf8_lossy(part))
                            .collect::<String>()
                    })
                    .collect();
                trace!("TXT {domain}: {} record(s)", records.len());
                Ok(records)
            }
            Err(e) => Err(Self::classify_error(&e)),
        }
    }

    async fn query_a(&self, domain: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
        match self.resolver.ipv4_lookup(domain).await {
            Ok(lookup) => Ok(lookup.iter().map(|a| a.0).collect()),
            Err(e) => Err(Self::classify_error(&e)),
        }
    }

    async fn query_aaaa(&self, domain: &str) -> Result<Vec<Ipv6Addr>, DnsError> {
        match self.resolver.ipv6_lookup(domain).await {
            Ok(lookup) => Ok(lookup.iter().map(|aaaa| aaaa.0).collect()),
            Err(e) => Err(Self::classify_error(&e)),
        }
    }

    async fn query_mx(&self, domain: &str) -> Result<Vec<(u16, String)>, DnsError> {
        match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => {
                let records: Vec<(u16, String)> = lookup
                    .iter()
                    .map(|mx| (mx.preference(), domain::normalize(&mx.exchange().to_utf8())))
                    .collect();
                Ok(records)
            }
            Err(e) => Err(Self::classify_error(&e)),
        }
    }
}

/// Mock DNS resolver for testing.
///
/// Unknown names answer with an empty set. Clones share the same zone data,
/// so a resolver can be handed to a verifier and still be inspected.
#[derive(Clone, Default)]
pub struct MockResolver {
    txt_records: Arc<Mutex<HashMap<String, Vec<String>>>>,
    a_records: Arc<Mutex<HashMap<String, Vec<Ipv4Addr>>>>,
    aaaa_records: Arc<Mutex<HashMap<String, Vec<Ipv6Addr>>>>,
    mx_records: Arc<Mutex<HashMap<String, Vec<(u16, String)>>>>,
    nxdomain: Arc<Mutex<HashSet<String>>>,
    failures: Arc<Mutex<HashMap<String, DnsError>>>,
    queries: Arc<AtomicUsize>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_txt(&self, domain: &str, records: Vec<&str>) {
        let records = records.into_iter().map(str::to_string).collect();
        lock(&self.txt_records).insert(domain.to_lowercase(), records);
    }

    pub fn add_a(&self, domain: &str, addrs: Vec<Ipv4Addr>) {
        lock(&self.a_records).insert(domain.to_lowercase(), addrs);
    }

    pub fn add_aaaa(&self, domain: &str, addrs: Vec<Ipv6Addr>) {
        lock(&self.aaaa_records).insert(domain.to_lowercase(), addrs);
    }

    pub fn add_mx(&self, domain: &str, records: Vec<(u16, &str)>) {
        let records = records.into_iter().map(|(pref, host)| (pref, host.to_string())).collect();
        lock(&self.mx_records).insert(domain.to_lowercase(), records);
    }

    pub fn set_nxdomain(&self, domain: &str) {
        lock(&self.nxdomain).insert(domain.to_lowercase());
    }

    /// Every query for `domain` fails with `error`.
    pub fn set_failure(&self, domain: &str, error: DnsError) {
        lock(&self.failures).insert(domain.to_lowercase(), error);
    }

    /// Number of queries answered so far, across all clones.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn answer<T: Clone>(
        &self,
        table: &Mutex<HashMap<String, Vec<T>>>,
        domain: &str,
    ) -> Result<Vec<T>, DnsError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let domain_lower = domain.to_lowercase();
        if let Some(err) = lock(&self.failures).get(&domain_lower) {
            return Err(err.clone());
        }
        if lock(&self.nxdomain).contains(&domain_lower) {
            return Err(DnsError::NxDomain);
        }
        Ok(lock(table).get(&domain_lower).cloned().unwrap_or_default())
    }
}

// A poisoned mock table only means another test thread panicked mid-insert;
// the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl DnsResolver for MockResolver {
    async fn query_txt(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        self.answer(&self.txt_records, domain)
    }

    async fn query_a(&self, domain: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
        self.answer(&self.a_records, domain)
    }

    async fn query_aaaa(&self, domain: &str) -> Result<Vec<Ipv6Addr>, DnsError> {
        self.answer(&self.aaaa_records, domain)
    }

    async fn query_mx(&self, domain: &str) -> Result<Vec<(u16, String)>, DnsError> {
        self.answer(&self.mx_records, domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_resolver_txt() {
        let resolver = MockResolver::new();
        resolver.add_txt("example.com", vec!["v=spf1 -all"]);

        let result = resolver.query_txt("EXAMPLE.com").await.unwrap();
        assert_eq!(result, vec!["v=spf1 -all"]);
    }

    #[tokio::test]
    async fn test_mock_resolver_nxdomain() {
        let resolver = MockResolver::new();
        resolver.set_nxdomain("nonexistent.com");

        let result = resolver.query_txt("nonexistent.com").await;
        assert!(matches!(result, Err(DnsError::NxDomain)));
    }

    #[tokio::test]
    async fn test_mock_resolver_failure_and_count() {
        let resolver = MockResolver::new();
        resolver.set_failure("broken.example", DnsError::ServFail);

        assert_eq!(resolver.query_a("broken.example").await, Err(DnsError::ServFail));
        assert_eq!(resolver.query_mx("unknown.example").await, Ok(vec![]));
        assert_eq!(resolver.clone().query_count(), 2);
    }

    #[test]
    fn test_void_classification() {
        assert!(DnsError::NxDomain.is_void());
        assert!(DnsError::NoRecords.is_void());
        assert!(!DnsError::ServFail.is_void());
        assert!(!DnsError::Timeout.is_void());
        assert!(!DnsError::Other("refused".into()).is_void());
    }

    #[test]
    fn test_dns_config_defaults() {
        let config = DnsConfig::default();
        let opts = config.resolver_opts();
        assert_eq!(opts.timeout, Duration::from_secs(5));
        assert_eq!(opts.attempts, 2);
    }

    #[tokio::test]
    #[ignore = "Requires network access"]
    async fn test_hickory_txt_lookup() {
        let resolver = HickoryResolver::new().unwrap();
        let records = resolver.query_txt("gmail.com").await.unwrap();
        assert!(records.iter().any(|r| r.starts_with("v=spf1")));
    }
}
