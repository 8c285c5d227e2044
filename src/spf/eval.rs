use std::future::Future;
use std::net::IpAddr;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::common::dns::{DnsError, DnsResolver, HickoryResolver};
use crate::common::domain;
use crate::config::{Config, SpfConfig};

use super::lookup::fetch_policy_records;
use super::mechanism::{Directive, Mechanism};
use super::record::SpfRecord;
use super::report::{FailureSink, ResolutionFailure, SpfEvaluation};
use super::resolve::check_mechanism;
use super::verdict::{reduce, TermResult};
use super::SpfResult;

/// Most budget-consuming terms (`a`, `mx`, `ptr`, `exists`, `include`,
/// `redirect`) a whole evaluation tree may use before it is a `PermError`.
pub const MAX_TERMS: u32 = 10;

type BoxedVerdict<'a> = Pin<Box<dyn Future<Output = SpfResult> + Send + 'a>>;

/// SPF verifier
pub struct SpfVerifier<R: DnsResolver> {
    resolver: Arc<R>,
    config: SpfConfig,
    sink: Option<Arc<dyn FailureSink>>,
}

impl<R: DnsResolver> SpfVerifier<R> {
    pub fn new(resolver: Arc<R>) -> Self {
        Self {
            resolver,
            config: SpfConfig::default(),
            sink: None,
        }
    }

    pub fn with_config(mut self, config: SpfConfig) -> Self {
        self.config = config;
        self
    }

    /// Notify `sink` of every DNS failure that aborts an evaluation.
    pub fn with_sink(mut self, sink: impl FailureSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Is `client_ip` authorized to send mail for `domain`?
    pub async fn evaluate(&self, domain: &str, client_ip: IpAddr) -> SpfResult {
        self.evaluate_with_report(domain, client_ip).await.result
    }

    /// Like [`evaluate`](Self::evaluate), also returning the DNS failures
    /// that caused a `TempError`.
    ///
    /// The configured deadline, if any, applies to the whole call.
    pub async fn evaluate_with_report(&self, domain: &str, client_ip: IpAddr) -> SpfEvaluation {
        self.run(domain, client_ip, self.config.timeout()).await
    }

    /// Evaluate with an explicit deadline. Expiry abandons every pending
    /// lookup and yields `TempError`.
    pub async fn evaluate_with_timeout(
        &self,
        domain: &str,
        client_ip: IpAddr,
        deadline: Duration,
    ) -> SpfResult {
        self.run(domain, client_ip, Some(deadline)).await.result
    }

    async fn run(&self, domain: &str, client_ip: IpAddr, deadline: Option<Duration>) -> SpfEvaluation {
        let domain = domain::normalize(domain);
        let mut failures = Vec::new();

        let result = match deadline {
            None => self.check_domain(&domain, client_ip, 0, None, &mut failures).await,
            Some(deadline) => {
                let check = self.check_domain(&domain, client_ip, 0, None, &mut failures);
                let outcome = tokio::time::timeout(deadline, check).await;
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        self.report(&mut failures, &domain, None, DnsError::Timeout);
                        SpfResult::TempError
                    }
                }
            }
        };

        debug!("SPF {domain} for {client_ip}: {result}");
        SpfEvaluation { result, failures }
    }

    /// One level of the recursion. `terms` is the budget already consumed by
    /// the enclosing levels and is passed by value: what this level spends is
    /// visible to the levels it starts, never to its caller.
    ///
    /// `origin` is the enclosing domain and the `include`/`redirect`
    /// directive that led here; a failed record fetch is reported there.
    fn check_domain<'a>(
        &'a self,
        domain: &'a str,
        client_ip: IpAddr,
        terms: u32,
        origin: Option<(&'a str, &'a Directive)>,
        failures: &'a mut Vec<ResolutionFailure>,
    ) -> BoxedVerdict<'a> {
        Box::pin(async move {
            if terms > MAX_TERMS {
                debug!("term limit exceeded at {domain} ({terms} > {MAX_TERMS})");
                return SpfResult::PermError;
            }

            let records = match fetch_policy_records(self.resolver.as_ref(), domain).await {
                Ok(records) => records,
                Err(e) => {
                    match origin {
                        Some((parent, directive)) => self.report(failures, parent, Some(directive), e),
                        None => self.report(failures, domain, None, e),
                    }
                    return SpfResult::TempError;
                }
            };

            let mut state = EvalState {
                domain,
                client_ip,
                terms,
                results: Vec::new(),
                redirect: None,
            };

            for record in &records {
                if let ControlFlow::Break(result) = self.check_record(record, &mut state, failures).await {
                    return result;
                }
            }

            if let Some(result) = reduce(&state.results) {
                return result;
            }

            match &state.redirect {
                Some(directive @ Directive { mechanism: Mechanism::Redirect(target), .. }) => {
                    debug!("{domain}: no match, following redirect to {target}");
                    self.check_domain(target, client_ip, state.terms, Some((domain, directive)), failures)
                        .await
                }
                _ => SpfResult::Neutral,
            }
        })
    }

    /// Walk one record's directives, appending to `state`. `Break` carries a
    /// verdict that ends the whole evaluation at this level.
    async fn check_record(
        &self,
        record: &SpfRecord,
        state: &mut EvalState<'_>,
        failures: &mut Vec<ResolutionFailure>,
    ) -> ControlFlow<SpfResult> {
        let mut version_seen = false;
        let mut all_seen = false;

        for directive in &record.directives {
            match &directive.mechanism {
                Mechanism::Version => {
                    if version_seen {
                        debug!("{}: duplicate version marker in {:?}", state.domain, record.raw);
                        return ControlFlow::Break(SpfResult::PermError);
                    }
                    version_seen = true;
                    continue;
                }
                // Past `all` the rest of the record only gets the version check.
                _ if all_seen => continue,
                Mechanism::Unrecognized(_) => continue,
                mechanism if has_empty_target(mechanism) => {
                    debug!("{}: missing target in {directive}", state.domain);
                    return ControlFlow::Break(SpfResult::PermError);
                }
                _ => {}
            }

            if directive.mechanism.counts_toward_limit() {
                state.terms += 1;
            }

            match &directive.mechanism {
                Mechanism::All => {
                    state.results.push(TermResult::new(directive, true));
                    all_seen = true;
                }
                Mechanism::Redirect(_) => {
                    state.redirect = Some(directive.clone());
                }
                Mechanism::Include(target) => {
                    let origin = Some((state.domain, directive));
                    let result = self
                        .check_domain(target, state.client_ip, state.terms, origin, failures)
                        .await;
                    let matched = match result {
                        SpfResult::Pass => true,
                        SpfResult::Fail | SpfResult::SoftFail | SpfResult::Neutral | SpfResult::None => false,
                        SpfResult::TempError | SpfResult::PermError => {
                            debug!("{}: {directive} gave {result}", state.domain);
                            return ControlFlow::Break(result);
                        }
                    };
                    state.results.push(TermResult::new(directive, matched));
                }
                mechanism => {
                    match check_mechanism(self.resolver.as_ref(), mechanism, state.domain, state.client_ip).await {
                        Ok(Some(matched)) => state.results.push(TermResult::new(directive, matched)),
                        Ok(None) => {}
                        Err(e) => {
                            self.report(failures, state.domain, Some(directive), e);
                            return ControlFlow::Break(SpfResult::TempError);
                        }
                    }
                }
            }

            if self.config.short_circuit {
                if let Some(result) = reduce(&state.results) {
                    return ControlFlow::Break(result);
                }
            }
        }

        ControlFlow::Continue(())
    }

    fn report(
        &self,
        failures: &mut Vec<ResolutionFailure>,
        domain: &str,
        directive: Option<&Directive>,
        error: DnsError,
    ) {
        let failure = ResolutionFailure {
            domain: domain.to_string(),
            directive: directive.map(Directive::to_string),
            error,
        };
        warn!("SPF lookup failed, {failure}");
        if let Some(sink) = &self.sink {
            sink.notify(&failure);
        }
        failures.push(failure);
    }
}

impl SpfVerifier<HickoryResolver> {
    /// Verifier backed by hickory, configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if no nameservers are configured and the system DNS
    /// configuration cannot be loaded.
    pub fn from_config(config: &Config) -> Result<Self, DnsError> {
        let resolver = HickoryResolver::from_config(&config.dns)?;
        Ok(Self::new(Arc::new(resolver)).with_config(config.spf.clone()))
    }
}

impl<R: DnsResolver> SpfVerifier<R> {
    /// Evaluate on a private current-thread runtime, for callers without one.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be created.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn evaluate_blocking(&self, domain: &str, client_ip: IpAddr) -> std::io::Result<SpfResult> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(runtime.block_on(self.evaluate(domain, client_ip)))
    }
}

/// Per-level evaluation state.
struct EvalState<'a> {
    domain: &'a str,
    client_ip: IpAddr,
    terms: u32,
    results: Vec<TermResult>,
    /// Last `redirect=` seen before any `all`.
    redirect: Option<Directive>,
}

fn has_empty_target(mechanism: &Mechanism) -> bool {
    match mechanism {
        Mechanism::A(Some(target)) | Mechanism::Mx(Some(target)) | Mechanism::Exists(Some(target)) => {
            target.is_empty()
        }
        Mechanism::Include(target) | Mechanism::Redirect(target) => target.is_empty(),
        _ => false,
    }
}
