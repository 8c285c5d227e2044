use std::net::IpAddr;

use tracing::debug;

use crate::common::dns::{DnsError, DnsResolver};

use super::record::SpfRecord;

/// Query DNS TXT records for a domain and keep the SPF ones, in the order the
/// resolver returned them.
///
/// - NXDOMAIN / no TXT records → `Ok(vec![])`
/// - Any other DNS failure → `Err`
pub async fn fetch_policy_records<R: DnsResolver>(
    resolver: &R,
    domain: &str,
) -> Result<Vec<SpfRecord>, DnsError> {
    let txt_records = void_as_empty(resolver.query_txt(domain).await)?;

    let records: Vec<SpfRecord> = txt_records
        .iter()
        .filter(|txt| SpfRecord::is_spf(txt))
        .map(|txt| SpfRecord::parse(txt))
        .collect();

    debug!("Found {} SPF record(s) for {domain}", records.len());
    Ok(records)
}

/// All IPv4 and IPv6 addresses of `domain`. A name without addresses yields
/// an empty set, not an error.
pub async fn resolve_addresses<R: DnsResolver>(
    resolver: &R,
    domain: &str,
) -> Result<Vec<IpAddr>, DnsError> {
    let v4 = void_as_empty(resolver.query_a(domain).await)?;
    let v6 = void_as_empty(resolver.query_aaaa(domain).await)?;

    Ok(v4
        .into_iter()
        .map(IpAddr::V4)
        .chain(v6.into_iter().map(IpAddr::V6))
        .collect())
}

/// Mail-exchange hostnames of `domain`, most preferred first.
pub async fn resolve_mail_exchanges<R: DnsResolver>(
    resolver: &R,
    domain: &str,
) -> Result<Vec<String>, DnsError> {
    let mut exchanges = void_as_empty(resolver.query_mx(domain).await)?;
    exchanges.sort_by_key(|(preference, _)| *preference);
    Ok(exchanges.into_iter().map(|(_, host)| host).collect())
}

fn void_as_empty<T>(answer: Result<Vec<T>, DnsError>) -> Result<Vec<T>, DnsError> {
    match answer {
        Err(e) if e.is_void() => Ok(Vec::new()),
        other => other,
    }
}
