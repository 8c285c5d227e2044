use crate::common::domain;

use super::mechanism::{Directive, Mechanism, Qualifier};

/// Split one SPF record string into its directives, in order.
///
/// Classification is case-insensitive and never fails: terms that are not
/// understood become [`Mechanism::Unrecognized`] and are skipped during
/// evaluation. The version marker is kept as a directive so the evaluator can
/// detect duplicates.
pub fn parse_directives(record: &str) -> Vec<Directive> {
    record.split_whitespace().map(parse_term).collect()
}

fn parse_term(term: &str) -> Directive {
    let lower = term.to_ascii_lowercase();

    // The marker is matched before qualifier stripping, so "+v=spf1" is not
    // a version marker.
    if lower == "v=spf1" {
        return Directive { qualifier: Qualifier::Pass, mechanism: Mechanism::Version };
    }

    let (qualifier, rest) = Qualifier::parse_prefix(&lower);
    let mechanism = classify(rest).unwrap_or_else(|| Mechanism::Unrecognized(term.to_string()));

    Directive { qualifier, mechanism }
}

fn classify(term: &str) -> Option<Mechanism> {
    let mechanism = match term {
        "a" => Mechanism::A(None),
        "mx" => Mechanism::Mx(None),
        "ptr" => Mechanism::Ptr,
        "exists" => Mechanism::Exists(None),
        "all" => Mechanism::All,
        _ => {
            if let Some(target) = term.strip_prefix("a:") {
                Mechanism::A(Some(domain::normalize(target)))
            } else if let Some(range) = term.strip_prefix("ip4:") {
                Mechanism::Ip4(range.to_string())
            } else if let Some(range) = term.strip_prefix("ip6:") {
                Mechanism::Ip6(range.to_string())
            } else if let Some(target) = term.strip_prefix("mx:") {
                Mechanism::Mx(Some(domain::normalize(target)))
            } else if let Some(target) = term.strip_prefix("exists:") {
                Mechanism::Exists(Some(domain::normalize(target)))
            } else if let Some(target) = term.strip_prefix("include:") {
                Mechanism::Include(domain::normalize(target))
            } else if let Some(target) = term.strip_prefix("redirect=") {
                Mechanism::Redirect(domain::normalize(target))
            } else {
                return None;
            }
        }
    };
    Some(mechanism)
}
