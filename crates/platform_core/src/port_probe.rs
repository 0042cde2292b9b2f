//! TCP reachability probe for control-panel webmail ports
//!
//! A single connect attempt per port. Refused, unreachable and timed-out
//! connections all read as "closed"; nothing is retried.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// cPanel webmail over HTTP and HTTPS
pub const CONTROL_PANEL_PORTS: &[u16] = &[2095, 2096];

/// Reachability check for a single TCP port
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Whether `domain:port` accepts a TCP connection
    async fn probe(&self, domain: &str, port: u16) -> bool;
}

/// Probe backed by a real TCP connect with a fixed timeout
#[derive(Debug, Clone)]
pub struct TcpPortProbe {
    timeout: Duration,
}

impl TcpPortProbe {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[async_trait]
impl PortProbe for TcpPortProbe {
    async fn probe(&self, domain: &str, port: u16) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect((domain, port))).await {
            Ok(Ok(stream)) => {
                debug!("Port {} open on {}", port, domain);
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                debug!("Port {} closed on {}: {}", port, domain, e);
                false
            }
            Err(_) => {
                debug!("Port {} probe on {} timed out after {:?}", port, domain, self.timeout);
                false
            }
        }
    }
}

/// Probe `ports` in order and return the first open one
pub async fn first_open_port(probe: &dyn PortProbe, domain: &str, ports: &[u16]) -> Option<u16> {
    for &port in ports {
        if probe.probe(domain, port).await {
            return Some(port);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpPortProbe::new(1000);
        assert!(probe.probe("127.0.0.1", port).await);
    }

    #[tokio::test]
    async fn test_closed_port() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = TcpPortProbe::new(1000);
        assert!(!probe.probe("127.0.0.1", port).await);
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_closed() {
        let probe = TcpPortProbe::new(1000);
        assert!(!probe.probe("host.invalid", 2095).await);
    }

    #[tokio::test]
    async fn test_first_open_port_stops_at_first_hit() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = TcpPortProbe::new(1000);
        assert_eq!(first_open_port(&probe, "127.0.0.1", &[closed, open]).await, Some(open));
        assert_eq!(first_open_port(&probe, "127.0.0.1", &[closed]).await, None);
    }
}
