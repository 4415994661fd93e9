use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use parashu_rs::config::{parse_duration, Settings};
use parashu_rs::profile::Profile;
use parashu_rs::types::{HostResult, ScanReport};
use parashu_rs::{logging, ports, targets, HostScanner, ScanOptions};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// parashu-rs: adaptive TCP connect scanner with banner fingerprinting.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "parashu-rs",
    version,
    about = "Adaptive TCP connect scanner with banner fingerprinting.",
    long_about = None
)]
struct Cli {
    /// Targets: IPs, hostnames, or small CIDRs (at most 1024 hosts each).
    targets: Vec<String>,

    /// File with one target per line.
    #[arg(short = 'f', long = "file")]
    target_file: Option<PathBuf>,

    /// Ports: top1000, common, all, or a list like 22,80,8000-8100.
    #[arg(long)]
    ports: Option<String>,

    /// Timing profile: paranoid, stealth, polite, balanced, aggressive, insane.
    #[arg(long)]
    profile: Option<String>,

    /// Numeric timing tier, overrides --profile.
    #[arg(short = 'T', value_parser = clap::value_parser!(u8).range(0..=5))]
    timing: Option<u8>,

    /// Skip reverse DNS for targets.
    #[arg(short = 'n', long = "no-ping")]
    no_ping: bool,

    /// Comma-separated SOCKS5 proxies; the first one is used.
    #[arg(long, value_delimiter = ',')]
    proxies: Vec<String>,

    /// Zero bytes sent to each open port before reading its banner.
    #[arg(long = "data-length")]
    data_length: Option<usize>,

    /// Delay before every probe, e.g. 10ms or 1s. Overrides the profile.
    #[arg(long = "scan-delay", value_parser = parse_duration)]
    scan_delay: Option<std::time::Duration>,

    /// Retry timed-out probes up to the profile's retry count.
    #[arg(long = "retry-timeouts")]
    retry_timeouts: bool,

    /// Let the number of in-flight probes follow the adaptive engine mid-scan.
    #[arg(long = "adaptive-gate")]
    adaptive_gate: bool,

    /// Write the report as pretty JSON to this path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Settings file (defaults to ~/.parashu.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset.
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    logging::init(
        cli.log_level
            .as_deref()
            .or(settings.log_level.as_deref())
            .unwrap_or("info"),
    );

    let mut raw_targets = cli.targets.clone();
    if let Some(path) = cli.target_file.as_deref() {
        raw_targets.extend(targets::read_target_file(path)?);
    }
    let scan_targets = targets::expand_targets(&raw_targets)?;
    if scan_targets.is_empty() {
        bail!("no targets given; pass them as arguments or with --file");
    }

    let port_spec = cli
        .ports
        .as_deref()
        .or(settings.ports.as_deref())
        .unwrap_or("top1000");
    let scan_ports = ports::parse_port_spec(port_spec).context("invalid --ports")?;

    let profile_name = match cli.timing {
        Some(tier) => tier.to_string(),
        None => cli
            .profile
            .clone()
            .or_else(|| settings.profile.clone())
            .unwrap_or_else(|| Profile::default().to_string()),
    };
    if Profile::lookup(&profile_name).is_none() {
        warn!("unknown profile {profile_name:?}, using balanced");
    }
    let profile: Profile = profile_name.parse().unwrap_or_default();

    let options = ScanOptions {
        skip_host_discovery: cli.no_ping || settings.no_ping.unwrap_or(false),
        proxies: if cli.proxies.is_empty() {
            settings.proxies.clone().unwrap_or_default()
        } else {
            cli.proxies.clone()
        },
        padding_len: cli.data_length.or(settings.data_length).unwrap_or(0),
        probe_delay: cli.scan_delay.or_else(|| settings.scan_delay()),
        retry_timeouts: cli.retry_timeouts || settings.retry_timeouts.unwrap_or(false),
        adaptive_gate: cli.adaptive_gate || settings.adaptive_gate.unwrap_or(false),
        progress: None,
    };

    info!(
        "scanning {} target(s), {} port(s), profile {profile}",
        scan_targets.len(),
        scan_ports.len()
    );

    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_ctrlc.cancel();
        }
    });

    let scanner = HostScanner::from_profile(profile.name());

    let started = Instant::now();
    let mut report = scanner
        .scan_all(&cancel, &scan_targets, &scan_ports, &options)
        .await;
    for host in &mut report.results {
        host.sort_ports();
    }

    print_report(&report);
    if cancel.is_cancelled() {
        println!("\nScan interrupted; results above are partial.");
    }
    println!("Scan completed in {:.2?}", started.elapsed());

    if let Some(path) = cli.output.as_deref() {
        write_report_json(path, &report)
            .with_context(|| format!("failed to write JSON to {}", path.display()))?;
        println!("Wrote JSON results to {}", path.display());
    }

    Ok(())
}

fn print_report(report: &ScanReport) {
    println!(
        "\nHosts scanned: {}  open ports: {}",
        report.summary.hosts_scanned, report.summary.open_ports
    );
    for host in &report.results {
        print_host_table(host);
    }
}

fn print_host_table(host: &HostResult) {
    let mut service_w = "service".len();
    let mut banner_w = "banner".len();
    for p in &host.ports {
        service_w = service_w.max(p.service.len());
        banner_w = banner_w.max(p.banner.len().min(60));
    }

    match &host.hostname {
        Some(name) => println!("\n{} ({})", host.target, name),
        None => println!("\n{}", host.target),
    }
    println!("{:<9}  {:<service_w$}  {:<banner_w$}", "port", "service", "banner");
    println!("{:-<9}  {:-<service_w$}  {:-<banner_w$}", "", "", "");
    for p in &host.ports {
        let banner: String = p.banner.replace(['\r', '\n'], " ").chars().take(60).collect();
        println!(
            "{:>5}/{:<3}  {:<service_w$}  {:<banner_w$}",
            p.port, p.protocol, p.service, banner
        );
    }
}

fn write_report_json(path: &Path, report: &ScanReport) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}
