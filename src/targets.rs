use anyhow::{Context, Result};
use ipnet::IpNet;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Largest CIDR (in host bits) that is expanded automatically.
pub const MAX_CIDR_HOST_BITS: u8 = 10;

/// Turn target arguments into individual scan targets.
///
/// Plain IPs and hostnames pass through unchanged. CIDRs are expanded to
/// their host addresses (IPv4 drops network and broadcast); ranges with
/// more than 2^10 addresses are skipped with a warning.
pub fn expand_targets<S: AsRef<str>>(specs: &[S]) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for spec in specs {
        let spec = spec.as_ref().trim();
        if spec.is_empty() {
            continue;
        }
        if !spec.contains('/') {
            out.push(spec.to_string());
            continue;
        }

        let net: IpNet = spec
            .parse()
            .with_context(|| format!("invalid CIDR {spec}"))?;
        let host_bits = net.max_prefix_len() - net.prefix_len();
        if host_bits > MAX_CIDR_HOST_BITS {
            warn!("skipping {spec}: too many hosts to expand");
            continue;
        }
        out.extend(net.hosts().map(|ip| ip.to_string()));
    }
    Ok(out)
}

/// Read targets from a file, one per line; blank lines and `#` comments are ignored.
pub fn read_target_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read target file: {}", path.as_ref().display()))?;
    Ok(content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
