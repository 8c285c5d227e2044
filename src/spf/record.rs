//! SPF record text and its parsed directives.

use super::mechanism::Directive;
use super::parser::parse_directives;

const VERSION_MARKER: &str = "v=spf1";

/// One published SPF record string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpfRecord {
    pub directives: Vec<Directive>,
    pub raw: String,
}

impl SpfRecord {
    /// Parse an SPF TXT record. Parsing is total; unknown terms are kept as
    /// unrecognized directives.
    pub fn parse(txt: &str) -> Self {
        Self {
            directives: parse_directives(txt),
            raw: txt.to_string(),
        }
    }

    /// Whether a TXT string is published as an SPF record (case-insensitive
    /// `v=spf1` prefix).
    pub fn is_spf(txt: &str) -> bool {
        txt.get(..VERSION_MARKER.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(VERSION_MARKER))
    }
}
