//! Command-line interface

use crate::attack::{DEFAULT_L2CAP_PSM, DEFAULT_PAYLOAD_SIZE};
use bleeding_core::pool::default_threads;
use bleeding_core::Protocol;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default HCI interface for `l2ping`
pub const DEFAULT_INTERFACE: &str = "hci0";

#[derive(Parser, Debug)]
#[command(name = "bleeding")]
#[command(about = "Bleeding: Bluetooth/BLE DeAuth and Analysis Tool", version)]
pub struct Cli {
    /// Headless mode (no colors and formatting)
    #[arg(long, global = true)]
    pub headless: bool,

    /// Print debug diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan for nearby Bluetooth or BLE devices
    Scan {
        /// Scan for BLE devices
        #[arg(short, long)]
        ble: bool,
    },

    /// Enumerate services on target device
    Enum {
        target: String,

        /// Use BLE mode
        #[arg(short, long)]
        ble: bool,
    },

    /// Execute DeAuth attack on target device
    Deauth(DeauthArgs),

    /// Flood the target with l2ping echo requests
    Massping(MassPingArgs),

    /// Generate random MAC addresses for all vendors
    RandomMac,

    /// Interactive mode: scan, select device, enumerate services, and attack
    #[command(alias = "i")]
    Interactive {
        /// Use BLE mode
        #[arg(short, long)]
        ble: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct DeauthArgs {
    pub target: String,

    /// Use BLE mode
    #[arg(short, long)]
    pub ble: bool,

    /// Port to use (BR/EDR only), decimal or 0x-prefixed
    #[arg(short, long, default_value_t = DEFAULT_L2CAP_PSM, value_parser = parse_port)]
    pub port: u16,

    /// Protocol to use (BR/EDR only)
    #[arg(short = 'P', long, value_enum, default_value = "connection-oriented")]
    pub protocol: ProtocolArg,

    /// Length of packets to send
    #[arg(short, long, default_value_t = DEFAULT_PAYLOAD_SIZE)]
    pub size: usize,

    /// Threads count to use
    #[arg(short, long, default_value_t = default_threads())]
    pub threads: usize,

    /// Attack duration in seconds (zero or negative: until interrupted)
    #[arg(short = 'T', long, allow_negative_numbers = true)]
    pub timeout: Option<i64>,
}

#[derive(Args, Debug, Clone)]
pub struct MassPingArgs {
    pub target: String,

    /// HCI interface to ping from
    #[arg(short, long, default_value = DEFAULT_INTERFACE)]
    pub interface: String,

    /// Length of echo packets
    #[arg(short, long, default_value_t = DEFAULT_PAYLOAD_SIZE)]
    pub size: usize,

    /// Threads count to use
    #[arg(short, long, default_value_t = default_threads())]
    pub threads: usize,

    /// Attack duration in seconds (zero or negative: until interrupted)
    #[arg(short = 'T', long, allow_negative_numbers = true)]
    pub timeout: Option<i64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolArg {
    /// RFCOMM
    #[value(alias = "rfcomm")]
    Stream,
    /// L2CAP
    #[value(alias = "l2cap")]
    ConnectionOriented,
}

impl From<ProtocolArg> for Protocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Stream => Protocol::Stream,
            ProtocolArg::ConnectionOriented => Protocol::ConnectionOriented,
        }
    }
}

/// Accept `4097` as well as `0x1001`
pub fn parse_port(value: &str) -> Result<u16, String> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid port '{value}': {e}"))
}
