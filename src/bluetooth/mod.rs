//! Bluetooth access through BlueZ
//!
//! Adapter acquisition, device discovery and service enumeration. Everything
//! here is sequential; the concurrent part of the tool lives in the pool.

mod adapter;
mod discovery;
mod services;
pub mod uuids;

pub use adapter::{open_adapter, parse_address, RadioMode};
pub use discovery::{scan, DiscoveredDevice, SCAN_DURATION};
pub use services::{enumerate_services, wait_for_services, ServiceProtocol, ServiceRecord};
