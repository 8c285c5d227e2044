//! Membership tests for the mechanisms that look at the sender address.

use std::net::IpAddr;

use tracing::trace;

use crate::common::cidr::NetworkRange;
use crate::common::dns::{DnsError, DnsResolver};

use super::lookup::{resolve_addresses, resolve_mail_exchanges};
use super::mechanism::Mechanism;

/// Test one mechanism against `client_ip`.
///
/// `domain` is the domain whose record is being evaluated and stands in for
/// an omitted target. Returns `Ok(None)` when the mechanism contributes no
/// result at all (`ptr`, unparseable ranges, and the mechanisms the
/// evaluator handles itself). A DNS failure is returned as `Err` and must
/// abort the whole evaluation.
pub async fn check_mechanism<R: DnsResolver>(
    resolver: &R,
    mechanism: &Mechanism,
    domain: &str,
    client_ip: IpAddr,
) -> Result<Option<bool>, DnsError> {
    let matched = match mechanism {
        Mechanism::A(target) => {
            let target = target.as_deref().unwrap_or(domain);
            check_a(resolver, target, client_ip).await?
        }
        Mechanism::Mx(target) => {
            let target = target.as_deref().unwrap_or(domain);
            check_mx(resolver, target, client_ip).await?
        }
        Mechanism::Exists(target) => {
            // Same lookup as `a`: the target must resolve to the sender's
            // own address, not merely to something.
            let target = target.as_deref().unwrap_or(domain);
            check_a(resolver, target, client_ip).await?
        }
        Mechanism::Ip4(range) => match NetworkRange::parse_v4(range) {
            Some(range) => range.contains(client_ip),
            None => {
                trace!("ignoring unparseable ip4 range {range}");
                return Ok(None);
            }
        },
        Mechanism::Ip6(range) => match NetworkRange::parse_v6(range) {
            Some(range) => range.contains(client_ip),
            None => {
                trace!("ignoring unparseable ip6 range {range}");
                return Ok(None);
            }
        },
        Mechanism::Ptr
        | Mechanism::Version
        | Mechanism::Include(_)
        | Mechanism::All
        | Mechanism::Redirect(_)
        | Mechanism::Unrecognized(_) => return Ok(None),
    };
    Ok(Some(matched))
}

async fn check_a<R: DnsResolver>(
    resolver: &R,
    domain: &str,
    client_ip: IpAddr,
) -> Result<bool, DnsError> {
    let addrs = resolve_addresses(resolver, domain).await?;
    trace!("{domain} has {} address(es)", addrs.len());
    Ok(addrs.contains(&client_ip))
}

async fn check_mx<R: DnsResolver>(
    resolver: &R,
    domain: &str,
    client_ip: IpAddr,
) -> Result<bool, DnsError> {
    let mut found = false;
    // Every exchange is resolved, even after a hit, so a failing exchange
    // lookup is never masked by an earlier one.
    for host in resolve_mail_exchanges(resolver, domain).await? {
        if resolve_addresses(resolver, &host).await?.contains(&client_ip) {
            found = true;
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::dns::MockResolver;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn fixture_resolver() -> MockResolver {
        let r = MockResolver::new();
        r.add_a("example.com", vec!["192.0.2.10".parse().unwrap()]);
        r.add_aaaa("example.com", vec!["2001:db8::10".parse().unwrap()]);
        r.add_a("other.example", vec!["198.51.100.5".parse().unwrap()]);
        r.add_mx("example.com", vec![(10, "mx1.example.com"), (20, "mx2.example.com")]);
        r.add_a("mx1.example.com", vec!["192.0.2.25".parse().unwrap()]);
        r.add_a("mx2.example.com", vec!["192.0.2.26".parse().unwrap()]);
        r
    }

    #[tokio::test]
    async fn a_uses_record_domain_when_no_target() {
        let r = fixture_resolver();
        let m = Mechanism::A(None);
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("192.0.2.10")).await, Ok(Some(true)));
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("2001:db8::10")).await, Ok(Some(true)));
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("192.0.2.11")).await, Ok(Some(false)));
    }

    #[tokio::test]
    async fn a_with_explicit_target() {
        let r = fixture_resolver();
        let m = Mechanism::A(Some("other.example".into()));
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("198.51.100.5")).await, Ok(Some(true)));
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("192.0.2.10")).await, Ok(Some(false)));
    }

    #[tokio::test]
    async fn a_on_nxdomain_is_no_match() {
        let r = fixture_resolver();
        r.set_nxdomain("gone.example");
        let m = Mechanism::A(Some("gone.example".into()));
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("192.0.2.10")).await, Ok(Some(false)));
    }

    #[tokio::test]
    async fn a_on_servfail_is_error() {
        let r = fixture_resolver();
        r.set_failure("broken.example", DnsError::ServFail);
        let m = Mechanism::A(Some("broken.example".into()));
        assert_eq!(
            check_mechanism(&r, &m, "example.com", ip("192.0.2.10")).await,
            Err(DnsError::ServFail)
        );
    }

    #[tokio::test]
    async fn mx_matches_any_exchange() {
        let r = fixture_resolver();
        let m = Mechanism::Mx(None);
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("192.0.2.26")).await, Ok(Some(true)));
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("192.0.2.10")).await, Ok(Some(false)));
    }

    #[tokio::test]
    async fn mx_exchange_failure_after_hit_is_error() {
        let r = fixture_resolver();
        r.set_failure("mx2.example.com", DnsError::Timeout);
        let m = Mechanism::Mx(None);
        assert_eq!(
            check_mechanism(&r, &m, "example.com", ip("192.0.2.25")).await,
            Err(DnsError::Timeout)
        );
    }

    #[tokio::test]
    async fn exists_requires_sender_address() {
        let r = fixture_resolver();
        let m = Mechanism::Exists(Some("other.example".into()));
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("198.51.100.5")).await, Ok(Some(true)));
        // Resolving to some address is not enough.
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("192.0.2.99")).await, Ok(Some(false)));
    }

    #[tokio::test]
    async fn ip_ranges() {
        let r = MockResolver::new();
        let m = Mechanism::Ip4("203.0.113.0/24".into());
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("203.0.113.42")).await, Ok(Some(true)));
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("198.51.100.1")).await, Ok(Some(false)));
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("2001:db8::1")).await, Ok(Some(false)));

        let m = Mechanism::Ip6("2001:db8::/32".into());
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("2001:db8::1")).await, Ok(Some(true)));
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("203.0.113.42")).await, Ok(Some(false)));
        assert_eq!(r.query_count(), 0);
    }

    #[tokio::test]
    async fn unparseable_range_contributes_nothing() {
        let r = MockResolver::new();
        let m = Mechanism::Ip4("not-an-address".into());
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("192.0.2.1")).await, Ok(None));
        let m = Mechanism::Ip6("192.0.2.0/24".into());
        assert_eq!(check_mechanism(&r, &m, "example.com", ip("192.0.2.1")).await, Ok(None));
    }

    #[tokio::test]
    async fn ptr_is_inert() {
        let r = fixture_resolver();
        assert_eq!(check_mechanism(&r, &Mechanism::Ptr, "example.com", ip("192.0.2.10")).await, Ok(None));
        assert_eq!(r.query_count(), 0);
    }
}
