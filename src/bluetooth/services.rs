//! Service enumeration for classic and low-energy devices

use super::adapter::RadioMode;
use super::uuids::{self, describe_uuid, short_uuid};
use anyhow::{bail, Context, Result};
use bleeding_core::{Logger, Protocol};
use bluer::gatt::remote::Service;
use bluer::gatt::CharacteristicFlags;
use bluer::{Adapter, Address, Device, Uuid};
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

/// Connection timeout when enumerating a BLE device
pub const LE_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection timeout when BlueZ has no cached records for a classic device
pub const CLASSIC_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const RESOLVE_POLL: Duration = Duration::from_millis(250);

/// How a service is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceProtocol {
    Classic(Protocol),
    Gatt,
}

impl fmt::Display for ServiceProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceProtocol::Classic(protocol) => write!(f, "{protocol}"),
            ServiceProtocol::Gatt => f.write_str("GATT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub name: String,
    pub properties: Vec<&'static str>,
}

/// One advertised service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub name: String,
    pub description: String,
    pub protocol: ServiceProtocol,
    /// Well-known PSM for L2CAP profiles; RFCOMM channels are not exposed by BlueZ
    pub port: Option<u16>,
    pub uuid: Uuid,
    pub characteristics: Vec<CharacteristicInfo>,
}

/// List the services of `address`
pub async fn enumerate_services(
    adapter: &Adapter,
    address: Address,
    mode: RadioMode,
    logger: &Logger,
) -> Result<Vec<ServiceRecord>> {
    let device = adapter
        .device(address)
        .with_context(|| format!("Unknown device {address}"))?;

    match mode {
        RadioMode::Classic => classic_services(&device, logger).await,
        RadioMode::LowEnergy => gatt_services(&device, logger).await,
    }
}

async fn classic_services(device: &Device, logger: &Logger) -> Result<Vec<ServiceRecord>> {
    let mut uuids = device.uuids().await?.unwrap_or_default();

    if uuids.is_empty() {
        logger.info(format!(
            "No cached service records, connecting to {}...",
            logger.good(device.address())
        ));
        connect(device, CLASSIC_CONNECT_TIMEOUT).await?;
        uuids = device.uuids().await?.unwrap_or_default();
        if let Err(e) = device.disconnect().await {
            debug!(error = %e, "disconnect after service lookup failed");
        }
    }

    let mut records: Vec<ServiceRecord> = uuids.into_iter().map(classic_record).collect();
    records.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(records)
}

/// Label a classic service UUID from the assigned-numbers table
pub fn classic_record(uuid: Uuid) -> ServiceRecord {
    let profile = short_uuid(&uuid).and_then(uuids::classic_profile);
    let (name, protocol, port) = match profile {
        Some(p) => (p.name.to_string(), p.protocol, p.psm),
        None => ("Unknown".to_string(), Protocol::ConnectionOriented, None),
    };

    ServiceRecord {
        name,
        description: describe_uuid(&uuid),
        protocol: ServiceProtocol::Classic(protocol),
        port,
        uuid,
        characteristics: Vec::new(),
    }
}

async fn gatt_services(device: &Device, logger: &Logger) -> Result<Vec<ServiceRecord>> {
    logger.info(format!(
        "Connecting to BLE device {}...",
        logger.good(device.address())
    ));
    connect(device, LE_CONNECT_TIMEOUT).await?;
    logger.info("Connected! Discovering GATT services...");

    let result = read_gatt(device).await;

    if let Err(e) = device.disconnect().await {
        debug!(error = %e, "disconnect after GATT discovery failed");
    }
    logger.info("Disconnected from BLE device");

    result
}

async fn read_gatt(device: &Device) -> Result<Vec<ServiceRecord>> {
    wait_for_services(device, LE_CONNECT_TIMEOUT).await?;

    let mut records = Vec::new();
    for service in device.services().await? {
        records.push(gatt_record(&service).await?);
    }
    Ok(records)
}

async fn gatt_record(service: &Service) -> Result<ServiceRecord> {
    let uuid = service.uuid().await?;
    let primary = service.primary().await?;

    let mut characteristics = Vec::new();
    for ch in service.characteristics().await? {
        let ch_uuid = ch.uuid().await?;
        let flags = ch.flags().await?;
        characteristics.push(CharacteristicInfo {
            uuid: ch_uuid,
            name: short_uuid(&ch_uuid)
                .and_then(uuids::gatt_characteristic_name)
                .unwrap_or("Unknown")
                .to_string(),
            properties: flag_names(&flags),
        });
    }

    Ok(ServiceRecord {
        name: short_uuid(&uuid)
            .and_then(uuids::gatt_service_name)
            .unwrap_or("Unknown")
            .to_string(),
        description: if primary {
            "Primary service".to_string()
        } else {
            "Secondary service".to_string()
        },
        protocol: ServiceProtocol::Gatt,
        port: None,
        uuid,
        characteristics,
    })
}

/// Property names, in characteristic property bit order
pub fn flag_names(flags: &CharacteristicFlags) -> Vec<&'static str> {
    [
        (flags.broadcast, "broadcast"),
        (flags.read, "read"),
        (flags.write_without_response, "write-without-response"),
        (flags.write, "write"),
        (flags.notify, "notify"),
        (flags.indicate, "indicate"),
        (flags.authenticated_signed_writes, "authenticated-signed-writes"),
        (flags.reliable_write, "reliable-write"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect()
}

async fn connect(device: &Device, limit: Duration) -> Result<()> {
    if device.is_connected().await? {
        return Ok(());
    }
    match timeout(limit, device.connect()).await {
        Ok(result) => result.with_context(|| format!("Cannot connect to {}", device.address())),
        Err(_) => bail!(
            "Timed out connecting to {} after {}s",
            device.address(),
            limit.as_secs()
        ),
    }
}

/// Wait until BlueZ has resolved the GATT database of a connected device
pub async fn wait_for_services(device: &Device, limit: Duration) -> Result<()> {
    let deadline = Instant::now() + limit;
    loop {
        if device.is_services_resolved().await? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!("GATT services of {} not resolved", device.address());
        }
        sleep(RESOLVE_POLL).await;
    }
}
