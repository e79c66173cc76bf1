//! Adapter acquisition and capability checks

use anyhow::{Context, Result};
use bluer::{Adapter, Address, Session};
use std::fmt;
use tracing::debug;

/// Which radio flavor a command works with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RadioMode {
    /// BR/EDR
    #[default]
    Classic,
    /// Bluetooth Low Energy
    LowEnergy,
}

impl RadioMode {
    pub fn from_ble_flag(ble: bool) -> Self {
        if ble {
            RadioMode::LowEnergy
        } else {
            RadioMode::Classic
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RadioMode::Classic => "BR/EDR",
            RadioMode::LowEnergy => "BLE",
        }
    }
}

impl fmt::Display for RadioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Get the default Bluetooth adapter, powered on
///
/// Fails when BlueZ is unreachable or no adapter exists; callers treat that
/// as a missing capability and exit before doing any work.
pub async fn open_adapter() -> Result<Adapter> {
    let session = Session::new()
        .await
        .context("BlueZ is not reachable over D-Bus (is bluetoothd running?)")?;
    let adapter = session
        .default_adapter()
        .await
        .context("No Bluetooth adapter found")?;

    if !adapter.is_powered().await? {
        adapter
            .set_powered(true)
            .await
            .with_context(|| format!("Cannot power on adapter {}", adapter.name()))?;
    }

    debug!(adapter = adapter.name(), "adapter ready");
    Ok(adapter)
}

/// Parse a `AA:BB:CC:DD:EE:FF` device address
pub fn parse_address(address: &str) -> Result<Address> {
    address
        .trim()
        .parse::<Address>()
        .with_context(|| format!("Invalid Bluetooth address: {address}"))
}
