//! Library crate for parashu-rs: an adaptive TCP connect scanner with
//! banner fingerprinting.
//!
//! [`scanner::HostScanner`] drives the scan. It pulls timing from an
//! [`adaptive::AdaptiveEngine`] seeded by a [`profile`], probes ports through
//! [`prober::Prober`] and labels open ports with [`fingerprint::classify`].
pub mod adaptive;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod gate;
pub mod logging;
pub mod ports;
pub mod prober;
pub mod profile;
pub mod scanner;
pub mod socks5;
pub mod targets;
pub mod types;

pub use error::ScanError;
pub use scanner::{HostScanner, ScanOptions};
pub use types::{HostResult, PortResult, ScanReport};
