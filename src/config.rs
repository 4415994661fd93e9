//! Settings file support.
//!
//! Settings live in `~/.parashu.toml` unless a path is given explicitly.
//! Every key is optional; command-line flags take precedence.
//!
//! ```toml
//! profile = "aggressive"
//! ports = "22,80,443,8000-8100"
//! proxies = ["socks5://127.0.0.1:9050"]
//! data_length = 32
//! scan_delay = "250ms"
//! no_ping = true
//! retry_timeouts = false
//! adaptive_gate = true
//! log_level = "debug"
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_FILE_NAME: &str = ".parashu.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub profile: Option<String>,
    pub ports: Option<String>,
    pub proxies: Option<Vec<String>>,
    pub data_length: Option<usize>,
    pub scan_delay: Option<String>,
    pub no_ping: Option<bool>,
    pub retry_timeouts: Option<bool>,
    pub adaptive_gate: Option<bool>,
    pub log_level: Option<String>,
}

impl Settings {
    /// Load settings from `path`, or from the default location when `None`.
    /// A missing file is not an error and yields empty settings.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        if let Some(delay) = &settings.scan_delay {
            parse_duration(delay).map_err(|message| ConfigError::Invalid {
                key: "scan_delay",
                message,
            })?;
        }
        Ok(settings)
    }

    /// Configured pacing delay, if any. Validated by [`Settings::parse`].
    pub fn scan_delay(&self) -> Option<Duration> {
        self.scan_delay.as_deref().and_then(|d| parse_duration(d).ok())
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_FILE_NAME))
}

/// Parse `"250ms"`, `"2s"`, `"1m"`, or a bare number of milliseconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("expected a duration like 250ms, got {s:?}"))?;
    match unit.trim() {
        "" | "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        other => Err(format!("unknown duration unit {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let s = Settings::parse(
            r#"
            profile = "aggressive"
            ports = "22,80"
            proxies = ["127.0.0.1:9050"]
            data_length = 16
            scan_delay = "250ms"
            no_ping = true
            adaptive_gate = true
            "#,
        )
        .unwrap();
        assert_eq!(s.profile.as_deref(), Some("aggressive"));
        assert_eq!(s.proxies, Some(vec!["127.0.0.1:9050".to_string()]));
        assert_eq!(s.data_length, Some(16));
        assert_eq!(s.scan_delay(), Some(Duration::from_millis(250)));
        assert_eq!(s.no_ping, Some(true));
        assert_eq!(s.retry_timeouts, None);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Settings::parse("").unwrap(), Settings::default());
    }

    #[test]
    fn unknown_keys_and_bad_delays_are_rejected() {
        assert!(matches!(Settings::parse("turbo = true"), Err(ConfigError::Toml(_))));
        assert!(matches!(
            Settings::parse("scan_delay = \"soon\""),
            Err(ConfigError::Invalid { key: "scan_delay", .. })
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("parashu-does-not-exist.toml");
        assert_eq!(Settings::load(Some(&path)).unwrap(), Settings::default());
    }

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration("10ms"), Ok(Duration::from_millis(10)));
        assert_eq!(parse_duration("3s"), Ok(Duration::from_secs(3)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("75"), Ok(Duration::from_millis(75)));
        assert!(parse_duration("1h").is_err());
        assert!(parse_duration("ms").is_err());
    }
}
