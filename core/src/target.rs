//! Target descriptor shared read-only by every worker

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use thiserror::Error;

/// Largest filler payload accepted for a single attempt
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Errors raised while building a target
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("Target address is empty")]
    EmptyAddress,

    #[error("Payload size must be at least 1 byte")]
    EmptyPayload,

    #[error("Payload size too large: {0} bytes (max: {MAX_PAYLOAD_SIZE})")]
    PayloadTooLarge(usize),

    #[error("Unknown protocol: {0} (expected stream/rfcomm or connection-oriented/l2cap)")]
    UnknownProtocol(String),
}

/// Framing of the classic-radio connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    /// Stream-oriented link (RFCOMM)
    Stream,
    /// Connection-oriented sequenced packets (L2CAP)
    #[default]
    ConnectionOriented,
}

impl Protocol {
    /// Conventional name of the Bluetooth protocol behind this framing
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Stream => "RFCOMM",
            Protocol::ConnectionOriented => "L2CAP",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Protocol {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" | "rfcomm" => Ok(Protocol::Stream),
            "connection-oriented" | "l2cap" | "seqpacket" => Ok(Protocol::ConnectionOriented),
            other => Err(TargetError::UnknownProtocol(other.to_string())),
        }
    }
}

/// The device under attack
///
/// Immutable once built; the pool hands the same instance to every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    address: String,
    port: u16,
    protocol: Protocol,
    payload_size: NonZeroUsize,
}

impl Target {
    /// Build a validated target
    pub fn new(
        address: impl Into<String>,
        port: u16,
        protocol: Protocol,
        payload_size: usize,
    ) -> Result<Self, TargetError> {
        let address = address.into().trim().to_string();
        if address.is_empty() {
            return Err(TargetError::EmptyAddress);
        }
        if payload_size > MAX_PAYLOAD_SIZE {
            return Err(TargetError::PayloadTooLarge(payload_size));
        }
        let payload_size = NonZeroUsize::new(payload_size).ok_or(TargetError::EmptyPayload)?;

        Ok(Self {
            address,
            port,
            protocol,
            payload_size,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// L2CAP PSM or RFCOMM channel; meaningless for low-energy jobs
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size.get()
    }

    /// Filler payload of `payload_size` copies of `fill`
    pub fn payload(&self, fill: u8) -> Vec<u8> {
        vec![fill; self.payload_size.get()]
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} port {})", self.address, self.protocol, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_target() {
        let target = Target::new(" 00:11:22:33:44:55 ", 0x1001, Protocol::ConnectionOriented, 512)
            .unwrap();
        assert_eq!(target.address(), "00:11:22:33:44:55");
        assert_eq!(target.port(), 0x1001);
        assert_eq!(target.payload_size(), 512);
        assert_eq!(target.payload(0x01).len(), 512);
        assert!(target.payload(0x01).iter().all(|&b| b == 0x01));
    }

    #[test]
    fn test_rejects_bad_targets() {
        assert_eq!(
            Target::new("  ", 1, Protocol::Stream, 10),
            Err(TargetError::EmptyAddress)
        );
        assert_eq!(
            Target::new("AA:BB:CC:DD:EE:FF", 1, Protocol::Stream, 0),
            Err(TargetError::EmptyPayload)
        );
        assert_eq!(
            Target::new("AA:BB:CC:DD:EE:FF", 1, Protocol::Stream, MAX_PAYLOAD_SIZE + 1),
            Err(TargetError::PayloadTooLarge(MAX_PAYLOAD_SIZE + 1))
        );
    }

    #[test]
    fn test_protocol_names() {
        assert_eq!("rfcomm".parse::<Protocol>().unwrap(), Protocol::Stream);
        assert_eq!("Stream".parse::<Protocol>().unwrap(), Protocol::Stream);
        assert_eq!("L2CAP".parse::<Protocol>().unwrap(), Protocol::ConnectionOriented);
        assert_eq!(
            "connection-oriented".parse::<Protocol>().unwrap(),
            Protocol::ConnectionOriented
        );
        assert!("sco".parse::<Protocol>().is_err());
        assert_eq!(Protocol::default().to_string(), "L2CAP");
    }
}
