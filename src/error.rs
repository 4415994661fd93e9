//! Error types surfaced by the library.

use crate::types::HostResult;
use std::io;

/// Failure of a host scan. Cancellation is the only way a scan fails, and
/// the error always carries whatever ports were captured before it.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scan of {target} cancelled after {} open port(s)", partial.ports.len())]
    Cancelled {
        target: String,
        partial: Box<HostResult>,
    },
}

impl ScanError {
    pub fn cancelled(partial: HostResult) -> Self {
        Self::Cancelled {
            target: partial.target.clone(),
            partial: Box::new(partial),
        }
    }

    /// Hand back the results captured before the failure.
    pub fn into_partial(self) -> HostResult {
        match self {
            Self::Cancelled { partial, .. } => *partial,
        }
    }
}

/// Problems dialing through a SOCKS5 proxy.
#[derive(Debug, thiserror::Error)]
pub enum Socks5Error {
    #[error("proxy I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid proxy endpoint {0:?}")]
    BadEndpoint(String),

    #[error("proxy answered with version {0:#04x}, expected 0x05")]
    Version(u8),

    #[error("proxy accepted none of the offered auth methods")]
    NoAcceptableAuth,

    #[error("proxy rejected the supplied credentials")]
    AuthRejected,

    #[error("proxy CONNECT failed with reply code {0:#04x}")]
    Reply(u8),

    #[error("{0} is too long for a SOCKS5 request")]
    TooLong(&'static str),
}

/// Problems loading the settings file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed settings file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}
