use crate::adaptive::AdaptiveEngine;
use crate::error::ScanError;
use crate::fingerprint;
use crate::gate::AdmissionGate;
use crate::prober::{Dialer, ProbeOutcome, ProbeStatus, Prober};
use crate::profile;
use crate::types::{HostResult, PortResult, ScanReport};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OnceCell};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound on the best-effort reverse DNS lookup.
const RDNS_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-call knobs for [`HostScanner::scan`].
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Skip the reverse DNS lookup for the target.
    pub skip_host_discovery: bool,
    /// SOCKS5 endpoints; only the first is dialed.
    pub proxies: Vec<String>,
    /// Zero bytes written to every open port before the banner read.
    pub padding_len: usize,
    /// Replaces the profile's pacing delay.
    pub probe_delay: Option<Duration>,
    /// Retry probes that timed out, up to the profile's retry count.
    pub retry_timeouts: bool,
    /// Let the admission gate follow the engine's concurrency mid-scan.
    pub adaptive_gate: bool,
    /// Shared counters for live monitoring.
    pub progress: Option<ScanProgress>,
}

/// Probe counters that can be shared with a caller while a scan runs.
#[derive(Clone, Debug, Default)]
pub struct ScanProgress {
    pub probed: Arc<AtomicU64>,
    pub open: Arc<AtomicU64>,
    pub refused: Arc<AtomicU64>,
    pub timed_out: Arc<AtomicU64>,
    pub failed: Arc<AtomicU64>,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, outcome: &ProbeOutcome) {
        self.probed.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome.status {
            ProbeStatus::Open { .. } => &self.open,
            ProbeStatus::Refused => &self.refused,
            ProbeStatus::TimedOut => &self.timed_out,
            ProbeStatus::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Scans one host at a time with a shared [`AdaptiveEngine`].
///
/// The engine outlives individual scans, so adaptation learned on one host
/// carries over to the next.
pub struct HostScanner {
    engine: Arc<AdaptiveEngine>,
    resolver: OnceCell<TokioAsyncResolver>,
}

impl fmt::Debug for HostScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostScanner")
            .field("engine", &self.engine)
            .field("resolver_ready", &self.resolver.initialized())
            .finish()
    }
}

impl HostScanner {
    pub fn new(engine: AdaptiveEngine) -> Self {
        Self::with_engine(Arc::new(engine))
    }

    pub fn with_engine(engine: Arc<AdaptiveEngine>) -> Self {
        Self {
            engine,
            resolver: OnceCell::new(),
        }
    }

    /// Build a scanner for a named profile (unknown names mean `balanced`).
    pub fn from_profile(name: &str) -> Self {
        Self::new(AdaptiveEngine::new(profile::resolve(name)))
    }

    pub fn engine(&self) -> &Arc<AdaptiveEngine> {
        &self.engine
    }

    /// Probe `ports` on `target` and collect every open one.
    ///
    /// Results arrive in completion order. If `cancel` fires before the scan
    /// finishes, the ports found so far come back inside
    /// [`ScanError::Cancelled`].
    pub async fn scan(
        &self,
        cancel: &CancellationToken,
        target: &str,
        ports: &[u16],
        options: &ScanOptions,
    ) -> Result<HostResult, ScanError> {
        let mut result = HostResult::new(target);
        if !options.skip_host_discovery {
            result.hostname = self.reverse_lookup(cancel, target).await;
        }

        let dialer = Dialer::from_endpoints(&options.proxies).unwrap_or_else(|e| {
            warn!("proxy unusable, every probe will fail: {e}");
            Dialer::Unavailable(e.to_string())
        });
        let prober = Arc::new(Prober::new(dialer, options.padding_len));

        // A fixed gate always holds the profile's initial concurrency. The
        // resizable one starts from the engine's current value and follows it.
        let gate = Arc::new(if options.adaptive_gate {
            AdmissionGate::resizable(self.engine.concurrency())
        } else {
            AdmissionGate::fixed(self.engine.initial_concurrency())
        });
        let capacity = gate.capacity();

        let config = self.engine.config();
        let delay = options.probe_delay.unwrap_or(config.scan_delay);
        let retries = if options.retry_timeouts {
            config.retry_count
        } else {
            0
        };
        let progress = options.progress.clone().unwrap_or_default();
        let host: Arc<str> = Arc::from(target);

        debug!(
            "scanning {target}: {} ports, gate {capacity}, delay {delay:?}, retries {retries}",
            ports.len()
        );

        let (tx, mut rx) = mpsc::channel::<PortResult>(ports.len().max(1));
        let collector = tokio::spawn(async move {
            let mut found = Vec::new();
            while let Some(port) = rx.recv().await {
                found.push(port);
            }
            found
        });

        let mut set = JoinSet::new();
        for &port in ports {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = gate.admit() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let task = ProbeTask {
                engine: Arc::clone(&self.engine),
                prober: Arc::clone(&prober),
                gate: Arc::clone(&gate),
                host: Arc::clone(&host),
                cancel: cancel.clone(),
                tx: tx.clone(),
                progress: progress.clone(),
                delay,
                retries,
            };
            set.spawn(async move {
                let _permit = permit; // released when the task ends
                task.run(port).await;
            });
        }
        drop(tx);

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!("probe task for {target} aborted: {e}");
            }
        }
        result.ports = match collector.await {
            Ok(found) => found,
            Err(e) => {
                warn!("result collector for {target} aborted: {e}");
                Vec::new()
            }
        };

        info!(
            "{target}: {} open, concurrency now {}, timeout now {:?}",
            result.ports.len(),
            self.engine.concurrency(),
            self.engine.timeout()
        );

        if cancel.is_cancelled() {
            return Err(ScanError::cancelled(result));
        }
        Ok(result)
    }

    /// Scan targets one after another with the shared engine.
    ///
    /// Hosts without open ports are counted but not listed. A cancellation
    /// stops the session; the interrupted host's partial ports are kept.
    pub async fn scan_all(
        &self,
        cancel: &CancellationToken,
        targets: &[String],
        ports: &[u16],
        options: &ScanOptions,
    ) -> ScanReport {
        let mut report = ScanReport::new(targets.to_vec());
        for target in targets {
            if cancel.is_cancelled() {
                break;
            }
            match self.scan(cancel, target, ports, options).await {
                Ok(host) => report.push(host),
                Err(err) => {
                    warn!("{err}");
                    report.push(err.into_partial());
                    break;
                }
            }
        }
        report
    }

    async fn reverse_lookup(&self, cancel: &CancellationToken, target: &str) -> Option<String> {
        let ip: IpAddr = target.parse().ok()?;
        let resolver = self
            .resolver
            .get_or_init(|| async {
                TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|_| {
                    TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
                })
            })
            .await;

        let lookup = tokio::select! {
            _ = cancel.cancelled() => return None,
            lookup = time::timeout(RDNS_TIMEOUT, resolver.reverse_lookup(ip)) => lookup,
        };
        match lookup {
            Ok(Ok(names)) => names
                .iter()
                .map(|name| name.to_string().trim_end_matches('.').to_string())
                .find(|name| !name.is_empty()),
            Ok(Err(e)) => {
                debug!("reverse lookup of {ip} failed: {e}");
                None
            }
            Err(_) => {
                debug!("reverse lookup of {ip} timed out");
                None
            }
        }
    }
}

/// Everything one admitted port task needs.
struct ProbeTask {
    engine: Arc<AdaptiveEngine>,
    prober: Arc<Prober>,
    gate: Arc<AdmissionGate>,
    host: Arc<str>,
    cancel: CancellationToken,
    tx: mpsc::Sender<PortResult>,
    progress: ScanProgress,
    delay: Duration,
    retries: u32,
}

impl ProbeTask {
    async fn run(self, port: u16) {
        if self.cancel.is_cancelled() {
            return;
        }

        let mut attempt = 0;
        let outcome = loop {
            let start = Instant::now();
            let timeout = self.engine.timeout();

            if !self.delay.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = time::sleep(self.delay) => {}
                }
            }

            // A probe that already finished wins over a late cancellation.
            let outcome = tokio::select! {
                biased;
                outcome = self.prober.probe(&self.host, port, timeout) => outcome,
                _ = self.cancel.cancelled() => return,
            };

            let concurrency = self.engine.record_result(start.elapsed(), outcome.is_open());
            self.gate.resize(concurrency);
            self.progress.record(&outcome);
            debug!(
                "{}:{port} -> {:?} in {:?} (timeout {timeout:?})",
                self.host, outcome.status, outcome.latency
            );

            if outcome.timed_out() && attempt < self.retries {
                attempt += 1;
                continue;
            }
            break outcome;
        };

        let ProbeStatus::Open { banner } = outcome.status else {
            return;
        };
        let details = fingerprint::classify(port, &banner);
        let found = PortResult {
            service: details.service,
            version: details.version,
            cpe: details.cpe,
            banner,
            ..PortResult::tcp(port)
        };
        if self.tx.send(found).await.is_err() {
            warn!("collector gone, dropping {}:{port}", self.host);
        }
    }
}
