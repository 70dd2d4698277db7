use std::fmt;
use std::str::FromStr;

use rand::Rng;
use thiserror::Error;

/// Error type for MAC address parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MacParseError {
    #[error("expected 17 characters in xx:xx:xx:xx:xx:xx form")]
    InvalidFormat,
}

/// A 6-octet hardware address, network byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn new(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Random unicast, locally-administered address.
    pub fn random() -> Self {
        let mut octets: [u8; 6] = rand::rng().random();
        // IEEE convention: set the locally-administered bit, clear multicast
        octets[0] = (octets[0] | 0x02) & 0xfe;
        MacAddress(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    /// Accepts exactly `xx:xx:xx:xx:xx:xx`, upper or lower case. Colons are
    /// required at offsets 2, 5, 8, 11 and 14; nothing shorter, longer or
    /// dash-separated parses.
    fn from_str(s: &str) -> Result<Self, MacParseError> {
        let bytes = s.as_bytes();
        if bytes.len() != 17 {
            return Err(MacParseError::InvalidFormat);
        }

        let mut octets = [0u8; 6];
        for (i, group) in bytes.chunks(3).enumerate() {
            if group.len() == 3 && group[2] != b':' {
                return Err(MacParseError::InvalidFormat);
            }
            let hi = hex_val(group[0]).ok_or(MacParseError::InvalidFormat)?;
            let lo = hex_val(group[1]).ok_or(MacParseError::InvalidFormat)?;
            octets[i] = hi << 4 | lo;
        }

        Ok(MacAddress(octets))
    }
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parse_lowercase() {
        let mac: MacAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(mac.octets(), [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    }

    #[test]
    fn parse_uppercase_normalizes() {
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn display_round_trips() {
        for s in ["00:11:22:33:44:55", "a1:b2:c3:d4:e5:f6", "00:00:00:00:00:00"] {
            let mac: MacAddress = s.parse().unwrap();
            assert_eq!(mac.to_string(), s);
        }
    }

    #[test]
    fn display_pads_small_octets() {
        let mac = MacAddress::new([0x00, 0x01, 0x02, 0x0a, 0x0b, 0x0c]);
        let s = mac.to_string();
        assert_eq!(s.len(), 17);
        assert_eq!(s, "00:01:02:0a:0b:0c");
    }

    #[test]
    fn parse_rejects_wrong_length() {
        // 16 and 18 characters
        assert_eq!(
            "aa:bb:cc:dd:ee:f".parse::<MacAddress>(),
            Err(MacParseError::InvalidFormat)
        );
        assert_eq!(
            "aa:bb:cc:dd:ee:ff:".parse::<MacAddress>(),
            Err(MacParseError::InvalidFormat)
        );
        assert_eq!("".parse::<MacAddress>(), Err(MacParseError::InvalidFormat));
    }

    #[test]
    fn parse_rejects_dash_separators() {
        assert_eq!(
            "aa-bb-cc-dd-ee-ff".parse::<MacAddress>(),
            Err(MacParseError::InvalidFormat)
        );
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert_eq!(
            "gg:bb:cc:dd:ee:ff".parse::<MacAddress>(),
            Err(MacParseError::InvalidFormat)
        );
        assert_eq!(
            "aa:bb:cc:dd:ee:f ".parse::<MacAddress>(),
            Err(MacParseError::InvalidFormat)
        );
    }

    #[test]
    fn random_is_local_unicast() {
        let mac = MacAddress::random();
        assert_eq!(mac.octets()[0] & 0x02, 0x02, "locally-administered bit");
        assert_eq!(mac.octets()[0] & 0x01, 0x00, "unicast bit");
    }

    #[test]
    fn random_does_not_repeat() {
        // statistical, not guaranteed; 1000 draws from 2^46 should not collide
        let draws: HashSet<[u8; 6]> = (0..1000).map(|_| MacAddress::random().octets()).collect();
        assert_eq!(draws.len(), 1000);
    }
}
