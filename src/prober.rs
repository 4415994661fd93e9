use crate::error::Socks5Error;
use crate::socks5::{Socks5Proxy, REPLY_REFUSED, REPLY_TTL_EXPIRED};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use tracing::debug;

/// Largest banner read from a freshly connected service.
pub const BANNER_LIMIT: usize = 1024;

/// How a single probe ended.
///
/// Everything except `Open` counts as a failed probe for the adaptive
/// engine, but the variants stay apart so callers can tell a closed port
/// from a slow or broken network path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// TCP connect succeeded. The banner may be empty.
    Open { banner: String },
    /// Destination (or the proxy on its behalf) refused the connection.
    Refused,
    /// No answer within the timeout.
    TimedOut,
    /// Any other dial or proxy failure.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub port: u16,
    pub status: ProbeStatus,
    pub latency: Duration,
}

impl ProbeOutcome {
    pub fn is_open(&self) -> bool {
        matches!(self.status, ProbeStatus::Open { .. })
    }

    pub fn timed_out(&self) -> bool {
        self.status == ProbeStatus::TimedOut
    }

    /// Banner text for open ports, empty otherwise.
    pub fn banner(&self) -> &str {
        match &self.status {
            ProbeStatus::Open { banner } => banner,
            _ => "",
        }
    }
}

/// How probes reach their destination.
#[derive(Debug, Clone, Default)]
pub enum Dialer {
    #[default]
    Direct,
    Socks5(Socks5Proxy),
    /// A proxy was requested but could not be used; every dial fails rather
    /// than silently going direct.
    Unavailable(String),
}

impl Dialer {
    /// Pick the dial strategy for a list of proxy endpoints: the first one
    /// is used, an empty list means direct.
    pub fn from_endpoints<S: AsRef<str>>(endpoints: &[S]) -> Result<Self, Socks5Error> {
        match endpoints.first() {
            None => Ok(Dialer::Direct),
            Some(endpoint) => Ok(Dialer::Socks5(endpoint.as_ref().parse()?)),
        }
    }

    async fn dial(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<TcpStream, ProbeStatus> {
        match self {
            Dialer::Direct => match time::timeout(timeout, TcpStream::connect((host, port))).await {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => Err(ProbeStatus::Refused),
                Ok(Err(e)) => Err(ProbeStatus::Failed(e.to_string())),
                Err(_) => Err(ProbeStatus::TimedOut),
            },
            Dialer::Socks5(proxy) => match time::timeout(timeout, proxy.connect(host, port)).await {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(Socks5Error::Reply(REPLY_REFUSED))) => Err(ProbeStatus::Refused),
                Ok(Err(Socks5Error::Reply(REPLY_TTL_EXPIRED))) => Err(ProbeStatus::TimedOut),
                Ok(Err(e)) => Err(ProbeStatus::Failed(e.to_string())),
                Err(_) => Err(ProbeStatus::TimedOut),
            },
            Dialer::Unavailable(reason) => Err(ProbeStatus::Failed(reason.clone())),
        }
    }
}

/// Connects to one port, optionally sends padding, and grabs a banner.
#[derive(Debug, Clone, Default)]
pub struct Prober {
    dialer: Dialer,
    padding_len: usize,
}

impl Prober {
    pub fn new(dialer: Dialer, padding_len: usize) -> Self {
        Self {
            dialer,
            padding_len,
        }
    }

    pub fn dialer(&self) -> &Dialer {
        &self.dialer
    }

    /// Probe `host:port`. Connect failures are folded into the outcome; the
    /// connection, if any, is shut down before returning.
    pub async fn probe(&self, host: &str, port: u16, timeout: Duration) -> ProbeOutcome {
        let start = Instant::now();
        let status = match self.dialer.dial(host, port, timeout).await {
            Ok(mut stream) => {
                let banner = self.grab_banner(&mut stream, timeout).await;
                if let Err(e) = stream.shutdown().await {
                    debug!("shutdown of {host}:{port} failed: {e}");
                }
                ProbeStatus::Open { banner }
            }
            Err(status) => status,
        };
        ProbeOutcome {
            port,
            status,
            latency: start.elapsed(),
        }
    }

    async fn grab_banner(&self, stream: &mut TcpStream, timeout: Duration) -> String {
        if self.padding_len > 0 {
            let padding = vec![0u8; self.padding_len];
            // Padding is best effort; the port is already known to be open.
            match time::timeout(timeout, stream.write_all(&padding)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("padding write failed: {e}"),
                Err(_) => debug!("padding write timed out"),
            }
        }

        let mut buf = vec![0u8; BANNER_LIMIT];
        match time::timeout(timeout, stream.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => String::from_utf8_lossy(&buf[..n]).trim().to_string(),
            _ => String::new(),
        }
    }
}
