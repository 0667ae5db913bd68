//! Parses a colon separated MAC address and constructs a WakeOnLAN packet
//! (so called "Magic Packet Technology") from it.
use std::fmt;

use thiserror::Error;

const MAC_LEN: usize = 6;
const SYNC_LEN: usize = 6;
const MAC_REPEATS: usize = 16;
pub const MAGIC_PACKET_LEN: usize = SYNC_LEN + MAC_LEN * MAC_REPEATS;

/// A 102 byte magic packet: six 0xFF bytes followed by the target MAC sixteen times.
#[derive(Clone, PartialEq, Eq)]
pub struct MagicPacket([u8; MAGIC_PACKET_LEN]);

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    /// The address contains something other than hex digit pairs and colons
    #[error("invalid MAC address: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Decoded fine, but not into exactly six bytes
    #[error("invalid MAC address: expected 6 bytes, got {0}")]
    InvalidLength(usize),
}

/// Decodes `AA:BB:CC:DD:EE:FF` (separators optional) into its six octets.
fn parse_mac(input: &str) -> Result<[u8; MAC_LEN], ParseError> {
    let digits: String = input.chars().filter(|c| *c != ':').collect();
    let bytes = hex::decode(digits)?;

    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ParseError::InvalidLength(bytes.len()))
}

/// Creates a magic packet for the given MAC address. Colons are stripped before the
/// remaining characters are decoded as hex, which must yield exactly six bytes.
pub fn create_magic_packet(mac: &str) -> Result<MagicPacket, ParseError> {
    let mac = parse_mac(mac)?;
    let mut packet = [0xFFu8; MAGIC_PACKET_LEN];

    // the first SYNC_LEN bytes stay 0xFF, the rest is the MAC over and over
    for chunk in packet[SYNC_LEN..].chunks_exact_mut(MAC_LEN) {
        chunk.copy_from_slice(&mac);
    }

    Ok(MagicPacket(packet))
}

impl MagicPacket {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The target address the packet was built for.
    pub fn mac(&self) -> [u8; MAC_LEN] {
        let mut mac = [0u8; MAC_LEN];
        mac.copy_from_slice(&self.0[SYNC_LEN..SYNC_LEN + MAC_LEN]);
        mac
    }
}

impl fmt::Debug for MagicPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.mac();
        write!(
            f,
            "MagicPacket({a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X})"
        )
    }
}

#[test]
fn test_magic_gibberish() {
    assert!(matches!(
        create_magic_packet("hello"),
        Err(ParseError::InvalidHex(_))
    ));
}

#[test]
fn test_magic_invalid_alphabet() {
    assert!(matches!(
        create_magic_packet("he:js:an:cc:dd:ee"),
        Err(ParseError::InvalidHex(_))
    ));
}

#[test]
fn test_magic_too_short() {
    assert_eq!(
        create_magic_packet("ab:cd").unwrap_err(),
        ParseError::InvalidLength(2)
    );
}

#[test]
fn test_magic_too_long() {
    assert_eq!(
        create_magic_packet("ab:cd:ab:cd:ab:cd:ab:cd:ab").unwrap_err(),
        ParseError::InvalidLength(9)
    );
}

#[test]
fn test_magic_odd_digit_count() {
    assert!(matches!(
        create_magic_packet("AA:BB:CC:DD:EE:F"),
        Err(ParseError::InvalidHex(hex::FromHexError::OddLength))
    ));
}

#[test]
fn test_magic_empty() {
    assert_eq!(
        create_magic_packet("").unwrap_err(),
        ParseError::InvalidLength(0)
    );
}

#[test]
fn test_magic_hyphens_rejected() {
    assert!(create_magic_packet("AA-BB-CC-DD-EE-FF").is_err());
}

#[test]
fn test_magic_without_separators() {
    let pkt = create_magic_packet("aabbccddeeff").unwrap();
    assert_eq!(pkt.mac(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
}

#[test]
fn test_magic() {
    let pkt = create_magic_packet("AA:BB:CC:DD:EE:FF").unwrap();
    let bytes = pkt.as_bytes();
    assert_eq!(bytes.len(), 102);

    // starts with padding
    assert_eq!(&bytes[..6], &[0xFF; 6]);

    // followed by sixteen copies of the mac
    let mac = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
    for k in 0..16 {
        assert_eq!(&bytes[6 + 6 * k..12 + 6 * k], &mac, "repeat {k}");
    }
}

#[test]
fn test_magic_is_deterministic() {
    let a = create_magic_packet("11:22:33:44:55:66").unwrap();
    let b = create_magic_packet("11:22:33:44:55:66").unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
}

#[test]
fn test_magic_debug_shows_mac() {
    let pkt = create_magic_packet("0a:1b:2c:3d:4e:5f").unwrap();
    assert_eq!(format!("{pkt:?}"), "MagicPacket(0A:1B:2C:3D:4E:5F)");
}
