use ::time::{format_description::well_known, OffsetDateTime};
use serde::{Deserialize, Serialize};

/// One known vulnerability attached to a port by downstream matching.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Vuln {
    pub cve: String,
    pub cvss: f64,
    pub epss: f64,
    pub kev: bool,
    pub summary: String,
    pub references: Vec<String>,
}

/// One open TCP port and what was learned about it.
///
/// `vulnerabilities` and `risk_score` belong to the shared schema but are
/// left empty by the scanner.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PortResult {
    pub port: u16,
    pub protocol: String,
    pub service: String,
    pub banner: String,
    pub version: String,
    pub cpe: String,
    #[serde(default)]
    pub vulnerabilities: Vec<Vuln>,
    #[serde(default)]
    pub risk_score: f64,
}

impl PortResult {
    pub fn tcp(port: u16) -> Self {
        Self {
            port,
            protocol: "tcp".to_string(),
            service: String::new(),
            banner: String::new(),
            version: String::new(),
            cpe: String::new(),
            vulnerabilities: Vec::new(),
            risk_score: 0.0,
        }
    }
}

/// Findings for a single target. `ports` arrives in completion order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct HostResult {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub ports: Vec<PortResult>,
}

impl HostResult {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            hostname: None,
            ports: Vec::new(),
        }
    }

    /// Order ports ascending for display or diffing.
    pub fn sort_ports(&mut self) {
        self.ports.sort_by_key(|p| p.port);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanSummary {
    pub hosts_scanned: usize,
    pub open_ports: usize,
    pub vulnerable_services: usize,
    pub critical_vulns: usize,
}

/// Top-level document for a multi-host session.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScanReport {
    pub scan_id: String,
    pub timestamp: String,
    pub targets: Vec<String>,
    pub results: Vec<HostResult>,
    pub summary: ScanSummary,
}

impl ScanReport {
    pub fn new(targets: Vec<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            scan_id: format!("scan-{}", now.unix_timestamp()),
            timestamp: now
                .format(&well_known::Rfc3339)
                .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z")),
            targets,
            results: Vec::new(),
            summary: ScanSummary::default(),
        }
    }

    /// Record a scanned host; hosts without open ports only count towards the summary.
    pub fn push(&mut self, host: HostResult) {
        self.summary.hosts_scanned += 1;
        if host.ports.is_empty() {
            return;
        }
        self.summary.open_ports += host.ports.len();
        self.summary.vulnerable_services += host
            .ports
            .iter()
            .filter(|p| !p.vulnerabilities.is_empty())
            .count();
        self.summary.critical_vulns += host
            .ports
            .iter()
            .flat_map(|p| &p.vulnerabilities)
            .filter(|v| v.cvss >= 9.0)
            .count();
        self.results.push(host);
    }
}
