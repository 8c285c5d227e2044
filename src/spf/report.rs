//! Side channel for the DNS failures that abort an evaluation.

use std::fmt;

use crate::common::dns::DnsError;

use super::SpfResult;

/// A DNS failure that turned an evaluation into `TempError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    /// Domain whose record was being evaluated (or fetched) when the lookup
    /// failed.
    pub domain: String,
    /// The directive being resolved, in canonical text form. `None` when the
    /// failure happened while fetching the record itself, or when the whole
    /// evaluation ran out of time.
    pub directive: Option<String>,
    pub error: DnsError,
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.directive {
            Some(directive) => write!(f, "{}: {directive}: {}", self.domain, self.error),
            None => write!(f, "{}: {}", self.domain, self.error),
        }
    }
}

/// Receives failures as they happen. Implemented for any
/// `Fn(&ResolutionFailure)`.
pub trait FailureSink: Send + Sync {
    fn notify(&self, failure: &ResolutionFailure);
}

impl<F> FailureSink for F
where
    F: Fn(&ResolutionFailure) + Send + Sync,
{
    fn notify(&self, failure: &ResolutionFailure) {
        self(failure)
    }
}

/// Verdict plus the failures collected while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpfEvaluation {
    pub result: SpfResult,
    pub failures: Vec<ResolutionFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn display_with_and_without_directive() {
        let failure = ResolutionFailure {
            domain: "example.com".into(),
            directive: Some("-mx".into()),
            error: DnsError::ServFail,
        };
        assert_eq!(failure.to_string(), "example.com: -mx: SERVFAIL: server failure");

        let failure = ResolutionFailure { directive: None, error: DnsError::Timeout, ..failure };
        assert_eq!(failure.to_string(), "example.com: timeout");
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Mutex::new(Vec::new());
        let sink = |f: &ResolutionFailure| seen.lock().unwrap().push(f.domain.clone());
        sink.notify(&ResolutionFailure {
            domain: "example.org".into(),
            directive: None,
            error: DnsError::Timeout,
        });
        assert_eq!(*seen.lock().unwrap(), vec!["example.org".to_string()]);
    }
}
