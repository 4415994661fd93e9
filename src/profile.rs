use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Timing parameters for one scan session.
///
/// Produced once by [`resolve`] and never mutated afterwards; the adaptive
/// engine reads it but keeps its own live state separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Starting size of the admission gate (always >= 1).
    pub initial_concurrency: usize,
    /// Lower bound for the adaptive probe timeout.
    pub min_timeout: Duration,
    /// Upper bound for the adaptive probe timeout.
    pub max_timeout: Duration,
    /// Extra attempts allowed for timed-out probes when retries are enabled.
    pub retry_count: u32,
    /// Pacing delay slept inside the gated region before every probe.
    pub scan_delay: Duration,
}

/// Named timing templates, including the numeric `0`..`5` tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    Paranoid,
    Stealth,
    Polite,
    #[default]
    Balanced,
    Aggressive,
    Insane,
}

impl Profile {
    pub const ALL: [Profile; 6] = [
        Profile::Paranoid,
        Profile::Stealth,
        Profile::Polite,
        Profile::Balanced,
        Profile::Aggressive,
        Profile::Insane,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Profile::Paranoid => "paranoid",
            Profile::Stealth => "stealth",
            Profile::Polite => "polite",
            Profile::Balanced => "balanced",
            Profile::Aggressive => "aggressive",
            Profile::Insane => "insane",
        }
    }

    /// Look a profile up by name or timing tier. Unknown names yield `None`.
    pub fn lookup(name: &str) -> Option<Profile> {
        let profile = match name.trim().to_ascii_lowercase().as_str() {
            "paranoid" | "0" => Profile::Paranoid,
            "stealth" | "sneaky" | "1" => Profile::Stealth,
            "polite" | "2" => Profile::Polite,
            "balanced" | "normal" | "3" => Profile::Balanced,
            "aggressive" | "4" => Profile::Aggressive,
            "insane" | "5" => Profile::Insane,
            _ => return None,
        };
        Some(profile)
    }

    pub fn config(self) -> ScanConfig {
        match self {
            Profile::Paranoid => ScanConfig {
                initial_concurrency: 1,
                min_timeout: Duration::from_secs(5),
                max_timeout: Duration::from_secs(30),
                retry_count: 0,
                scan_delay: Duration::from_secs(5 * 60),
            },
            Profile::Stealth => ScanConfig {
                initial_concurrency: 1,
                min_timeout: Duration::from_millis(1_500),
                max_timeout: Duration::from_secs(10),
                retry_count: 0,
                scan_delay: Duration::from_secs(15),
            },
            Profile::Polite => ScanConfig {
                initial_concurrency: 1,
                min_timeout: Duration::from_millis(500),
                max_timeout: Duration::from_secs(5),
                retry_count: 0,
                scan_delay: Duration::from_millis(400),
            },
            Profile::Balanced => ScanConfig {
                initial_concurrency: 50,
                min_timeout: Duration::from_millis(500),
                max_timeout: Duration::from_secs(2),
                retry_count: 1,
                scan_delay: Duration::ZERO,
            },
            Profile::Aggressive => ScanConfig {
                initial_concurrency: 100,
                min_timeout: Duration::from_millis(300),
                max_timeout: Duration::from_millis(1_500),
                retry_count: 2,
                scan_delay: Duration::ZERO,
            },
            Profile::Insane => ScanConfig {
                initial_concurrency: 300,
                min_timeout: Duration::from_millis(50),
                max_timeout: Duration::from_millis(500),
                retry_count: 3,
                scan_delay: Duration::ZERO,
            },
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = std::convert::Infallible;

    /// Never fails: unrecognised names fall back to [`Profile::Balanced`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Profile::lookup(s).unwrap_or_default())
    }
}

/// Map a profile name to its [`ScanConfig`]. Unknown names resolve to `balanced`.
pub fn resolve(name: &str) -> ScanConfig {
    Profile::lookup(name).unwrap_or_default().config()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_profile_is_well_formed() {
        for p in Profile::ALL {
            let cfg = p.config();
            assert!(cfg.initial_concurrency >= 1, "{p}");
            assert!(cfg.min_timeout <= cfg.max_timeout, "{p}");
        }
    }

    #[test]
    fn unknown_name_falls_back_to_balanced() {
        assert_eq!(resolve("warp-speed"), resolve("balanced"));
        assert_eq!(resolve(""), Profile::Balanced.config());
    }

    #[test]
    fn aliases_and_tiers_agree() {
        assert_eq!(resolve("sneaky"), resolve("stealth"));
        assert_eq!(resolve("1"), resolve("stealth"));
        assert_eq!(resolve("normal"), resolve("3"));
        assert_eq!(resolve("0"), resolve("paranoid"));
        assert_eq!(resolve("5"), resolve("insane"));
        assert_eq!(resolve("  Aggressive "), resolve("4"));
    }

    #[test]
    fn stealth_is_slow_and_aggressive_is_wide() {
        let stealth = resolve("stealth");
        assert_eq!(stealth.initial_concurrency, 1);
        assert!(stealth.scan_delay >= Duration::from_secs(1));

        let aggressive = resolve("aggressive");
        assert!(aggressive.initial_concurrency >= 100);
        assert!(aggressive.min_timeout < Duration::from_secs(1));
        assert_eq!(aggressive.scan_delay, Duration::ZERO);
    }

    #[test]
    fn from_str_round_trips_display() {
        for p in Profile::ALL {
            assert_eq!(p.to_string().parse::<Profile>().unwrap(), p);
        }
        assert_eq!("nope".parse::<Profile>().unwrap(), Profile::Balanced);
    }
}
