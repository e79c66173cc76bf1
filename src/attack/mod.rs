//! Attack jobs run by the worker pool
//!
//! Each type implements [`bleeding_core::Job`]: one connect+send cycle
//! against the target, with failures sorted into transient and fatal.

mod classic;
mod gatt;
mod ping;

pub use classic::{ClassicFlood, DEFAULT_L2CAP_PSM, DEFAULT_RFCOMM_CHANNEL};
pub use gatt::GattFlood;
pub use ping::PingFlood;

use bleeding_core::JobError;
use bluer::ErrorKind;

/// Default filler size per attempt
pub const DEFAULT_PAYLOAD_SIZE: usize = 512;

/// Classify a BlueZ error: permission and capability problems stop the worker
pub(crate) fn classify(err: bluer::Error) -> JobError {
    if is_fatal_kind(&err.kind) {
        JobError::fatal(err)
    } else {
        JobError::transient(err)
    }
}

fn is_fatal_kind(kind: &ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::NotAuthorized
            | ErrorKind::NotPermitted
            | ErrorKind::NotSupported
            | ErrorKind::InvalidArguments
    )
}
