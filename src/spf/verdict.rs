use super::mechanism::{Directive, Qualifier};
use super::SpfResult;

/// Outcome of one evaluated directive, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermResult {
    pub directive: Directive,
    pub matched: bool,
    /// Qualifier the entry contributes. For `include` this is the include
    /// directive's own qualifier, never the included record's.
    pub qualifier: Qualifier,
}

impl TermResult {
    pub fn new(directive: &Directive, matched: bool) -> Self {
        Self {
            directive: directive.clone(),
            matched,
            qualifier: directive.qualifier,
        }
    }
}

/// Verdict of the first matching entry, or `None` if nothing matched (the
/// caller then falls back to a redirect or `Neutral`).
pub fn reduce(results: &[TermResult]) -> Option<SpfResult> {
    results
        .iter()
        .find(|r| r.matched)
        .map(|r| r.qualifier.to_result())
}
