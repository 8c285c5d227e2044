//! SPF policy evaluation.
//!
//! [`SpfVerifier`] fetches a domain's `v=spf1` records through a
//! [`DnsResolver`](crate::common::dns::DnsResolver), walks every directive and
//! reduces the outcomes to one [`SpfResult`].

mod eval;
mod lookup;
mod mechanism;
mod parser;
mod record;
mod report;
mod resolve;
mod verdict;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use eval::{SpfVerifier, MAX_TERMS};
pub use lookup::{fetch_policy_records, resolve_addresses, resolve_mail_exchanges};
pub use mechanism::{Directive, Mechanism, Qualifier};
pub use parser::parse_directives;
pub use record::SpfRecord;
pub use report::{FailureSink, ResolutionFailure, SpfEvaluation};
pub use resolve::check_mechanism;
pub use verdict::{reduce, TermResult};

/// SPF evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpfResult {
    /// No applicable policy.
    None,
    /// No assertion made.
    Neutral,
    /// Sender is authorized.
    Pass,
    /// Sender is NOT authorized.
    Fail,
    /// Weak authorization failure.
    SoftFail,
    /// Transient DNS error; a later retry may succeed.
    TempError,
    /// Malformed or abusive policy; do not retry.
    PermError,
}

impl SpfResult {
    /// Lowercase token as used in `Received-SPF` and `Authentication-Results`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpfResult::None => "none",
            SpfResult::Neutral => "neutral",
            SpfResult::Pass => "pass",
            SpfResult::Fail => "fail",
            SpfResult::SoftFail => "softfail",
            SpfResult::TempError => "temperror",
            SpfResult::PermError => "permerror",
        }
    }
}

impl fmt::Display for SpfResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
