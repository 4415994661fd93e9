//! Banner and port based service identification.
//!
//! Pure functions only: no I/O and no shared state, so callers may classify
//! from any number of tasks at once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const UNKNOWN_SERVICE: &str = "unknown";

/// What the fingerprinter concluded about one open port.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceDetails {
    pub service: String,
    pub version: String,
    pub cpe: String,
    /// Free-form annotations; `source` records whether the banner or the
    /// port number decided the service.
    pub extras: BTreeMap<String, String>,
}

struct BannerSignature {
    needle: &'static str,
    service: &'static str,
    cpe: Option<&'static str>,
}

// Checked in order, first match wins.
const BANNER_SIGNATURES: &[BannerSignature] = &[
    BannerSignature {
        needle: "ssh",
        service: "ssh",
        cpe: Some("cpe:/a:openssh:openssh"),
    },
    BannerSignature {
        needle: "http",
        service: "http",
        cpe: None,
    },
];

const WELL_KNOWN_PORTS: &[(u16, &str)] = &[
    (21, "ftp"),
    (22, "ssh"),
    (23, "telnet"),
    (25, "smtp"),
    (53, "dns"),
    (80, "http"),
    (110, "pop3"),
    (143, "imap"),
    (443, "https"),
    (3306, "mysql"),
    (5432, "postgresql"),
    (8080, "http-alt"),
];

/// Identify the service behind `port` from its banner, falling back to the
/// well-known port table and finally to `"unknown"`.
pub fn classify(port: u16, banner: &str) -> ServiceDetails {
    let mut details = ServiceDetails::default();

    let trimmed = banner.trim();
    if !trimmed.is_empty() {
        let lowered = trimmed.to_lowercase();
        if let Some(sig) = BANNER_SIGNATURES
            .iter()
            .find(|sig| lowered.contains(sig.needle))
        {
            details.service = sig.service.to_string();
            details.version = trimmed.to_string();
            details.cpe = sig.cpe.unwrap_or_default().to_string();
            details.extras.insert("source".into(), "banner".into());
            return details;
        }
    }

    match service_for_port(port) {
        Some(name) => {
            details.service = name.to_string();
            details.extras.insert("source".into(), "port".into());
        }
        None => details.service = UNKNOWN_SERVICE.to_string(),
    }
    details
}

/// Conventional service name for a port, if it is one we know.
pub fn service_for_port(port: u16) -> Option<&'static str> {
    WELL_KNOWN_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_banner() {
        let d = classify(22, "SSH-2.0-OpenSSH_8.9p1 Ubuntu-3ubuntu0.1");
        assert_eq!(d.service, "ssh");
        assert_eq!(d.version, "SSH-2.0-OpenSSH_8.9p1 Ubuntu-3ubuntu0.1");
        assert_eq!(d.cpe, "cpe:/a:openssh:openssh");
        assert_eq!(d.extras.get("source").map(String::as_str), Some("banner"));
    }

    #[test]
    fn http_banner() {
        let d = classify(80, "HTTP/1.1 200 OK");
        assert_eq!(d.service, "http");
        assert_eq!(d.version, "HTTP/1.1 200 OK");
        assert!(d.cpe.is_empty());
    }

    #[test]
    fn banner_beats_port_and_ignores_case() {
        let d = classify(2222, "  ssh-2.0-dropbear\r\n");
        assert_eq!(d.service, "ssh");
        assert_eq!(d.version, "ssh-2.0-dropbear");
    }

    #[test]
    fn port_fallback() {
        let d = classify(3306, "");
        assert_eq!(d.service, "mysql");
        assert!(d.version.is_empty());
        assert_eq!(d.extras.get("source").map(String::as_str), Some("port"));
    }

    #[test]
    fn unmatched_banner_falls_back_to_port() {
        assert_eq!(classify(21, "220 ProFTPD Server ready.").service, "ftp");
        assert_eq!(classify(9999, "220 ProFTPD Server ready.").service, "unknown");
    }

    #[test]
    fn unknown_service() {
        let d = classify(9999, "");
        assert_eq!(d.service, UNKNOWN_SERVICE);
        assert!(d.extras.is_empty());
    }
}
