//! SPF directive types.

use std::fmt;

use super::SpfResult;

/// Qualifier prefix on a directive. Defaults to Pass if omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Pass,     // +
    Neutral,  // ?
    SoftFail, // ~
    Fail,     // -
}

impl Qualifier {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Qualifier::Pass),
            '?' => Some(Qualifier::Neutral),
            '~' => Some(Qualifier::SoftFail),
            '-' => Some(Qualifier::Fail),
            _ => None,
        }
    }

    /// Split a leading qualifier symbol off a term. If there is none, the
    /// term is returned whole with the default `Pass`.
    pub fn parse_prefix(term: &str) -> (Qualifier, &str) {
        match term.chars().next().and_then(Qualifier::from_char) {
            Some(q) => (q, &term[1..]),
            None => (Qualifier::Pass, term),
        }
    }

    /// The verdict a matching directive with this qualifier produces.
    pub fn to_result(self) -> SpfResult {
        match self {
            Qualifier::Pass => SpfResult::Pass,
            Qualifier::Neutral => SpfResult::Neutral,
            Qualifier::SoftFail => SpfResult::SoftFail,
            Qualifier::Fail => SpfResult::Fail,
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::Pass => write!(f, "+"),
            Qualifier::Neutral => write!(f, "?"),
            Qualifier::SoftFail => write!(f, "~"),
            Qualifier::Fail => write!(f, "-"),
        }
    }
}

/// SPF mechanism. Targets are already lowercased and normalized; `None`
/// means "the domain whose record is being evaluated".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mechanism {
    /// `v=spf1`
    Version,
    /// `a` / `a:<domain>`
    A(Option<String>),
    /// `ip4:<network>[/prefix]`, kept as text until evaluation
    Ip4(String),
    /// `ip6:<network>[/prefix]`, kept as text until evaluation
    Ip6(String),
    /// `mx` / `mx:<domain>`
    Mx(Option<String>),
    /// `ptr`
    Ptr,
    /// `exists` / `exists:<domain>`
    Exists(Option<String>),
    /// `include:<domain>`
    Include(String),
    /// `all`
    All,
    /// `redirect=<domain>`
    Redirect(String),
    /// Anything else, verbatim.
    Unrecognized(String),
}

impl Mechanism {
    /// Whether evaluating this mechanism consumes one unit of the term budget.
    pub fn counts_toward_limit(&self) -> bool {
        matches!(
            self,
            Mechanism::A(_)
                | Mechanism::Mx(_)
                | Mechanism::Ptr
                | Mechanism::Exists(_)
                | Mechanism::Include(_)
                | Mechanism::Redirect(_)
        )
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mechanism::Version => write!(f, "v=spf1"),
            Mechanism::A(None) => write!(f, "a"),
            Mechanism::A(Some(d)) => write!(f, "a:{d}"),
            Mechanism::Ip4(r) => write!(f, "ip4:{r}"),
            Mechanism::Ip6(r) => write!(f, "ip6:{r}"),
            Mechanism::Mx(None) => write!(f, "mx"),
            Mechanism::Mx(Some(d)) => write!(f, "mx:{d}"),
            Mechanism::Ptr => write!(f, "ptr"),
            Mechanism::Exists(None) => write!(f, "exists"),
            Mechanism::Exists(Some(d)) => write!(f, "exists:{d}"),
            Mechanism::Include(d) => write!(f, "include:{d}"),
            Mechanism::All => write!(f, "all"),
            Mechanism::Redirect(d) => write!(f, "redirect={d}"),
            Mechanism::Unrecognized(raw) => write!(f, "{raw}"),
        }
    }
}

/// A directive = qualifier + mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub qualifier: Qualifier,
    pub mechanism: Mechanism,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.mechanism, self.qualifier) {
            // Markers and modifiers carry no qualifier of their own.
            (Mechanism::Version | Mechanism::Redirect(_) | Mechanism::Unrecognized(_), _)
            | (_, Qualifier::Pass) => write!(f, "{}", self.mechanism),
            (mechanism, qualifier) => write!(f, "{qualifier}{mechanism}"),
        }
    }
}
