//! Sender Policy Framework evaluation.
//!
//! DNS caching is the caller's responsibility. This library provides
//! a `DnsResolver` trait; implement it with caching at the resolver layer.

pub mod common;
pub mod config;
pub mod spf;

pub use config::{Config, ConfigError, SpfConfig};
pub use spf::{SpfEvaluation, SpfResult, SpfVerifier};
