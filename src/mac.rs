//! Vendor-prefixed random MAC addresses

use bluer::Address;
use rand::Rng;

/// Organizationally unique identifiers of common Bluetooth vendors
pub const VENDORS: [(&str, [u8; 3]); 16] = [
    ("acer", [0xc0, 0x98, 0x79]),
    ("apple", [0xfc, 0xfc, 0x48]),
    ("asus", [0xfc, 0xc2, 0x33]),
    ("dell", [0xd8, 0xd0, 0x90]),
    ("google", [0xf8, 0x8f, 0xca]),
    ("hp", [0xb0, 0x5c, 0xda]),
    ("htc", [0x98, 0x0d, 0x2e]),
    ("intel", [0xfc, 0xf8, 0xae]),
    ("lenovo", [0xa4, 0x8c, 0xdb]),
    ("lg", [0xf8, 0xa9, 0xd0]),
    ("microsoft", [0xc4, 0x9d, 0xed]),
    ("motorola", [0xf8, 0xf1, 0xb6]),
    ("samsung", [0xfc, 0xf1, 0x36]),
    ("sony", [0xd4, 0x38, 0x9c]),
    ("toshiba", [0xec, 0x21, 0xe5]),
    ("xiaomi", [0xfc, 0x64, 0xba]),
];

/// `oui` followed by three random octets
pub fn vendor_mac<R: Rng + ?Sized>(oui: [u8; 3], rng: &mut R) -> Address {
    let tail: [u8; 3] = rng.gen();
    Address::new([oui[0], oui[1], oui[2], tail[0], tail[1], tail[2]])
}

/// One random address per known vendor, in table order
pub fn random_mac_all_vendors<R: Rng + ?Sized>(rng: &mut R) -> Vec<(&'static str, Address)> {
    VENDORS
        .iter()
        .map(|&(vendor, oui)| (vendor, vendor_mac(oui, rng)))
        .collect()
}
