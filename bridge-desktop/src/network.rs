//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::time::Duration;
use tracing::debug;

const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:53";

/// Desktop network monitor implementation
///
/// Reachability is checked with a short TCP connect to a well-known host.
/// Platform APIs (netlink, SystemConfiguration, Network List Manager) would
/// distinguish link types, but the provisioning pipeline only needs
/// "online or not".
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    timeout: Duration,
}

impl DesktopNetworkMonitor {
    /// Create a new network monitor
    pub fn new() -> Self {
        Self::with_probe(DEFAULT_PROBE_ADDR, Duration::from_secs(5))
    }

    /// Probe a custom `host:port` instead of the public DNS resolver.
    pub fn with_probe(probe_addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            probe_addr: probe_addr.into(),
            timeout,
        }
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match tokio::time::timeout(
            self.timeout,
            tokio::net::TcpStream::connect(self.probe_addr.as_str()),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) | Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.check_connectivity().await;
        debug!(status = ?status, probe = %self.probe_addr, "Network info updated");

        Ok(match status {
            NetworkStatus::Connected => NetworkInfo::connected(NetworkType::Other),
            _ => NetworkInfo::disconnected(),
        })
    }

    async fn is_metered(&self) -> bool {
        false
    }
}
