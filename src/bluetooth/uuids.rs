//! Bluetooth SIG assigned numbers used to label services
//!
//! BlueZ exposes the service class UUIDs of a classic device but not its
//! protocol descriptor lists, so the transport and well-known PSM of a
//! profile come from this table.

use bleeding_core::Protocol;
use bluer::Uuid;

/// Lower 96 bits of the Bluetooth base UUID `0000xxxx-0000-1000-8000-00805F9B34FB`
const BASE_UUID_LOW: u128 = 0x0000_1000_8000_0080_5f9b_34fb;
const LOW_MASK: u128 = (1 << 96) - 1;

/// Extract the 16-bit alias of a UUID built on the Bluetooth base UUID
pub fn short_uuid(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    if value & LOW_MASK != BASE_UUID_LOW {
        return None;
    }
    u16::try_from(value >> 96).ok()
}

/// A classic profile: display name, transport and well-known PSM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassicProfile {
    pub name: &'static str,
    pub protocol: Protocol,
    pub psm: Option<u16>,
}

const fn rfcomm(name: &'static str) -> ClassicProfile {
    ClassicProfile {
        name,
        protocol: Protocol::Stream,
        psm: None,
    }
}

const fn l2cap(name: &'static str, psm: Option<u16>) -> ClassicProfile {
    ClassicProfile {
        name,
        protocol: Protocol::ConnectionOriented,
        psm,
    }
}

const PSM_SDP: u16 = 0x0001;
const PSM_BNEP: u16 = 0x000f;
const PSM_HID_CONTROL: u16 = 0x0011;
const PSM_AVCTP: u16 = 0x0017;
const PSM_AVDTP: u16 = 0x0019;

pub fn classic_profile(short: u16) -> Option<ClassicProfile> {
    let profile = match short {
        0x1101 => rfcomm("Serial Port"),
        0x1102 => rfcomm("LAN Access Using PPP"),
        0x1103 => rfcomm("Dialup Networking"),
        0x1104 => rfcomm("IrMC Sync"),
        0x1105 => rfcomm("OBEX Object Push"),
        0x1106 => rfcomm("OBEX File Transfer"),
        0x1108 => rfcomm("Headset"),
        0x110a => l2cap("Audio Source", Some(PSM_AVDTP)),
        0x110b => l2cap("Audio Sink", Some(PSM_AVDTP)),
        0x110c => l2cap("A/V Remote Control Target", Some(PSM_AVCTP)),
        0x110d => l2cap("Advanced Audio Distribution", Some(PSM_AVDTP)),
        0x110e => l2cap("A/V Remote Control", Some(PSM_AVCTP)),
        0x110f => l2cap("A/V Remote Control Controller", Some(PSM_AVCTP)),
        0x1112 => rfcomm("Headset Audio Gateway"),
        0x1115 => l2cap("PAN User", Some(PSM_BNEP)),
        0x1116 => l2cap("Network Access Point", Some(PSM_BNEP)),
        0x1117 => l2cap("Group Ad-hoc Network", Some(PSM_BNEP)),
        0x111e => rfcomm("Handsfree"),
        0x111f => rfcomm("Handsfree Audio Gateway"),
        0x1124 => l2cap("Human Interface Device", Some(PSM_HID_CONTROL)),
        0x112d => rfcomm("SIM Access"),
        0x112f => rfcomm("Phonebook Access Server"),
        0x1132 => rfcomm("Message Access Server"),
        0x1133 => rfcomm("Message Notification Server"),
        0x1200 => l2cap("PnP Information", Some(PSM_SDP)),
        0x1203 => l2cap("Generic Audio", None),
        _ => return None,
    };
    Some(profile)
}

pub fn gatt_service_name(short: u16) -> Option<&'static str> {
    let name = match short {
        0x1800 => "Generic Access",
        0x1801 => "Generic Attribute",
        0x1802 => "Immediate Alert",
        0x1803 => "Link Loss",
        0x1804 => "Tx Power",
        0x1805 => "Current Time",
        0x180a => "Device Information",
        0x180d => "Heart Rate",
        0x180f => "Battery Service",
        0x1812 => "Human Interface Device",
        0x1813 => "Scan Parameters",
        0x1816 => "Cycling Speed and Cadence",
        0x181c => "User Data",
        0x1822 => "Pulse Oximeter",
        0xfe59 => "Nordic Secure DFU",
        _ => return None,
    };
    Some(name)
}

pub fn gatt_characteristic_name(short: u16) -> Option<&'static str> {
    let name = match short {
        0x2a00 => "Device Name",
        0x2a01 => "Appearance",
        0x2a04 => "Peripheral Preferred Connection Parameters",
        0x2a05 => "Service Changed",
        0x2a06 => "Alert Level",
        0x2a07 => "Tx Power Level",
        0x2a19 => "Battery Level",
        0x2a23 => "System ID",
        0x2a24 => "Model Number String",
        0x2a25 => "Serial Number String",
        0x2a26 => "Firmware Revision String",
        0x2a27 => "Hardware Revision String",
        0x2a28 => "Software Revision String",
        0x2a29 => "Manufacturer Name String",
        0x2a37 => "Heart Rate Measurement",
        0x2a4a => "HID Information",
        0x2a4b => "Report Map",
        0x2a4c => "HID Control Point",
        0x2a4d => "Report",
        0x2a4e => "Protocol Mode",
        0x2a50 => "PnP ID",
        0x2aa6 => "Central Address Resolution",
        _ => return None,
    };
    Some(name)
}

/// `0x1101` for base UUIDs, the full form otherwise
pub fn describe_uuid(uuid: &Uuid) -> String {
    match short_uuid(uuid) {
        Some(short) => format!("UUID {short:#06x}"),
        None => format!("UUID {uuid}"),
    }
}
