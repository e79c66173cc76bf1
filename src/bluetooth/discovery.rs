//! Nearby device discovery

use super::adapter::RadioMode;
use anyhow::{Context, Result};
use bluer::{Adapter, AdapterEvent, Address, Device, DiscoveryFilter, DiscoveryTransport};
use futures::StreamExt;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Length of a discovery window
pub const SCAN_DURATION: Duration = Duration::from_secs(5);

/// A device seen during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub address: Address,
    /// Advertised name, `"Unknown"` when the device has none
    pub name: String,
    /// Class of device (BR/EDR only)
    pub class: Option<u32>,
    /// Signal strength (if available)
    pub rssi: Option<i16>,
}

/// Scan for devices of one radio flavor
///
/// An empty result is not an error: the caller decides how to report it.
pub async fn scan(
    adapter: &Adapter,
    mode: RadioMode,
    duration: Duration,
) -> Result<Vec<DiscoveredDevice>> {
    let mut filter = DiscoveryFilter::default();
    filter.transport = match mode {
        RadioMode::Classic => DiscoveryTransport::BrEdr,
        RadioMode::LowEnergy => DiscoveryTransport::Le,
    };
    adapter
        .set_discovery_filter(filter)
        .await
        .context("Cannot set discovery filter")?;

    let mut seen: HashSet<Address> = HashSet::new();
    let mut order: Vec<Address> = Vec::new();

    let discover = adapter
        .discover_devices()
        .await
        .context("Cannot start discovery")?;
    tokio::pin!(discover);

    let scan_result = timeout(duration, async {
        while let Some(evt) = discover.next().await {
            if let AdapterEvent::DeviceAdded(addr) = evt {
                if seen.insert(addr) {
                    order.push(addr);
                }
            }
        }
    })
    .await;

    // Timeout is the normal end of a scan
    if scan_result.is_err() {
        debug!(found = order.len(), %mode, "discovery window closed");
    }

    let mut devices = Vec::with_capacity(order.len());
    for addr in order {
        match adapter.device(addr) {
            Ok(device) => devices.push(describe(&device, mode).await),
            Err(e) => debug!(%addr, error = %e, "device vanished before it could be read"),
        }
    }

    sort_by_signal(&mut devices);
    Ok(devices)
}

async fn describe(device: &Device, mode: RadioMode) -> DiscoveredDevice {
    let name = match device.name().await {
        Ok(Some(name)) if !name.trim().is_empty() => name,
        _ => "Unknown".to_string(),
    };
    let class = match mode {
        RadioMode::Classic => device.class().await.ok().flatten(),
        RadioMode::LowEnergy => None,
    };

    DiscoveredDevice {
        address: device.address(),
        name,
        class,
        rssi: device.rssi().await.ok().flatten(),
    }
}

/// Strongest signal first; devices without RSSI go last
pub fn sort_by_signal(devices: &mut [DiscoveredDevice]) {
    devices.sort_by(|a, b| {
        let rssi_a = a.rssi.unwrap_or(i16::MIN);
        let rssi_b = b.rssi.unwrap_or(i16::MIN);
        rssi_b.cmp(&rssi_a)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(last: u8, rssi: Option<i16>) -> DiscoveredDevice {
        DiscoveredDevice {
            address: Address::new([0, 0, 0, 0, 0, last]),
            name: format!("dev-{last}"),
            class: None,
            rssi,
        }
    }

    #[test]
    fn test_sort_by_signal() {
        let mut devices = vec![
            device(1, Some(-80)),
            device(2, None),
            device(3, Some(-40)),
            device(4, Some(-60)),
        ];
        sort_by_signal(&mut devices);

        let order: Vec<u8> = devices.iter().map(|d| d.address.0[5]).collect();
        assert_eq!(order, vec![3, 4, 1, 2]);
    }

    #[test]
    fn test_scan_window() {
        assert_eq!(SCAN_DURATION, Duration::from_secs(5));
    }
}
