use anyhow::{bail, Context, Result};
use std::collections::HashSet;

/// The short "top" list scanned when no ports are given.
pub const TOP_PORTS: &[u16] = &[
    21, 22, 23, 25, 53, 80, 110, 111, 135, 139, 143, 443, 445, 993, 995, 1723, 3306, 3389, 5432,
    5900, 8080,
];

/// Parse a port description into a deduplicated list in first-seen order.
///
/// Accepted forms:
/// - keywords: `top1000` / `common` (the [`TOP_PORTS`] list), `all` (1-65535)
/// - single ports and inclusive ranges: `22`, `8000-8010`
/// - any mix of the above separated by commas or newlines
/// - `#` starts a comment that runs to the end of the line
pub fn parse_port_spec(spec: &str) -> Result<Vec<u16>> {
    let mut out: Vec<u16> = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |p: u16, out: &mut Vec<u16>| {
        if seen.insert(p) {
            out.push(p);
        }
    };

    for raw_line in spec.lines() {
        let line = raw_line.split('#').next().unwrap_or("");
        for item in line.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.to_ascii_lowercase().as_str() {
                "top1000" | "common" | "top" => {
                    TOP_PORTS.iter().for_each(|&p| push(p, &mut out));
                    continue;
                }
                "all" => {
                    (1..=u16::MAX).for_each(|p| push(p, &mut out));
                    continue;
                }
                _ => {}
            }

            if let Some((a, b)) = item.split_once('-') {
                let start = parse_port(a.trim())
                    .with_context(|| format!("invalid start in range {item:?}"))?;
                let end = parse_port(b.trim())
                    .with_context(|| format!("invalid end in range {item:?}"))?;
                if start > end {
                    bail!("invalid range {start}-{end} (start > end)");
                }
                (start..=end).for_each(|p| push(p, &mut out));
                continue;
            }

            let p = parse_port(item).with_context(|| format!("invalid port value {item:?}"))?;
            push(p, &mut out);
        }
    }

    if out.is_empty() {
        bail!("no ports in {spec:?}");
    }
    Ok(out)
}

fn parse_port(s: &str) -> Result<u16> {
    let val: u32 = s.parse()?;
    if val == 0 || val > u32::from(u16::MAX) {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}
