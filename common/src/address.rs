use base64::{engine::general_purpose, Engine as _};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

pub const ADDRESS_HASH_SIZE: usize = 32;
// tag + workchain + hash + crc16
pub const FRIENDLY_ADDRESS_BYTES: usize = 36;
pub const FRIENDLY_ADDRESS_LENGTH: usize = 48;

const BOUNCEABLE_TAG: u8 = 0x11;
const NON_BOUNCEABLE_TAG: u8 = 0x51;
const TEST_FLAG: u8 = 0x80;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address length: {}", _0)]
    InvalidLength(usize),
    #[error("invalid base64 in address")]
    InvalidBase64,
    #[error("invalid address tag {:#04x}", _0)]
    InvalidTag(u8),
    #[error("invalid address checksum")]
    InvalidChecksum,
    #[error("invalid workchain '{}'", _0)]
    InvalidWorkchain(String),
    #[error("invalid address hash")]
    InvalidHash,
}

// CRC-16/XMODEM used by user-friendly addresses
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

// Flags used to render a user-friendly address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressFlags {
    pub bounceable: bool,
    pub test_only: bool,
    pub url_safe: bool,
}

impl Default for AddressFlags {
    fn default() -> Self {
        Self {
            bounceable: true,
            test_only: false,
            url_safe: true,
        }
    }
}

// Standard internal address: workchain and account id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    workchain: i8,
    hash: [u8; ADDRESS_HASH_SIZE],
}

// Address parsed from its user-friendly form, with the flags it carried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FriendlyAddress {
    pub address: Address,
    pub bounceable: bool,
    pub test_only: bool,
}

impl Address {
    // addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256
    pub const STD_BITS: usize = 2 + 1 + 8 + 256;

    pub fn new(workchain: i8, hash: [u8; ADDRESS_HASH_SIZE]) -> Self {
        Self { workchain, hash }
    }

    pub fn get_workchain(&self) -> i8 {
        self.workchain
    }

    pub fn get_hash(&self) -> &[u8; ADDRESS_HASH_SIZE] {
        &self.hash
    }

    pub fn to_raw_string(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    pub fn to_friendly(&self, flags: AddressFlags) -> String {
        let mut bytes = [0u8; FRIENDLY_ADDRESS_BYTES];
        let mut tag = if flags.bounceable {
            BOUNCEABLE_TAG
        } else {
            NON_BOUNCEABLE_TAG
        };
        if flags.test_only {
            tag |= TEST_FLAG;
        }
        bytes[0] = tag;
        bytes[1] = self.workchain as u8;
        bytes[2..34].copy_from_slice(&self.hash);
        let crc = crc16(&bytes[..34]);
        bytes[34..].copy_from_slice(&crc.to_be_bytes());

        if flags.url_safe {
            general_purpose::URL_SAFE.encode(bytes)
        } else {
            general_purpose::STANDARD.encode(bytes)
        }
    }

    pub fn parse_raw(value: &str) -> Result<Self, AddressError> {
        let (workchain, hash) = value
            .split_once(':')
            .ok_or(AddressError::InvalidLength(value.len()))?;
        let workchain = workchain
            .parse::<i8>()
            .map_err(|_| AddressError::InvalidWorkchain(workchain.to_owned()))?;
        let decoded = hex::decode(hash).map_err(|_| AddressError::InvalidHash)?;
        let hash: [u8; ADDRESS_HASH_SIZE] =
            decoded.try_into().map_err(|_| AddressError::InvalidHash)?;
        Ok(Self::new(workchain, hash))
    }

    pub fn parse_friendly(value: &str) -> Result<FriendlyAddress, AddressError> {
        if value.len() != FRIENDLY_ADDRESS_LENGTH {
            return Err(AddressError::InvalidLength(value.len()));
        }
        let bytes = if value.contains('-') || value.contains('_') {
            general_purpose::URL_SAFE.decode(value)
        } else {
            general_purpose::STANDARD.decode(value)
        }
        .map_err(|_| AddressError::InvalidBase64)?;
        if bytes.len() != FRIENDLY_ADDRESS_BYTES {
            return Err(AddressError::InvalidLength(bytes.len()));
        }

        let crc = u16::from_be_bytes([bytes[34], bytes[35]]);
        if crc != crc16(&bytes[..34]) {
            return Err(AddressError::InvalidChecksum);
        }

        let mut tag = bytes[0];
        let test_only = tag & TEST_FLAG != 0;
        if test_only {
            tag ^= TEST_FLAG;
        }
        let bounceable = match tag {
            BOUNCEABLE_TAG => true,
            NON_BOUNCEABLE_TAG => false,
            _ => return Err(AddressError::InvalidTag(bytes[0])),
        };

        let mut hash = [0u8; ADDRESS_HASH_SIZE];
        hash.copy_from_slice(&bytes[2..34]);
        Ok(FriendlyAddress {
            address: Self::new(bytes[1] as i8, hash),
            bounceable,
            test_only,
        })
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            Self::parse_raw(s)
        } else {
            Self::parse_friendly(s).map(|friendly| friendly.address)
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_friendly(AddressFlags::default()))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Address::from_str(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "0QCXIWd86sfFmlx2YL1SAX9jJS_jWXEVtGRNS3DCyduybU2A";
    const CONTRACT_HASH: &str = "9721677ceac7c59a5c7660bd52017f63252fe3597115b4644d4b70c2c9dbb26d";

    #[test]
    fn test_crc16_vector() {
        assert_eq!(crc16(b"123456789"), 0x31c3);
    }

    #[test]
    fn test_parse_friendly_testnet_address() {
        let friendly = Address::parse_friendly(CONTRACT).unwrap();
        assert!(friendly.test_only);
        assert!(!friendly.bounceable);
        assert_eq!(friendly.address.get_workchain(), 0);
        assert_eq!(hex::encode(friendly.address.get_hash()), CONTRACT_HASH);

        let flags = AddressFlags {
            bounceable: false,
            test_only: true,
            url_safe: true,
        };
        assert_eq!(friendly.address.to_friendly(flags), CONTRACT);
    }

    #[test]
    fn test_default_display_is_bounceable() {
        let address: Address = CONTRACT.parse().unwrap();
        assert_eq!(
            address.to_string(),
            "EQCXIWd86sfFmlx2YL1SAX9jJS_jWXEVtGRNS3DCyduybavP"
        );
        let testnet = AddressFlags {
            test_only: true,
            ..Default::default()
        };
        assert_eq!(
            address.to_friendly(testnet),
            "kQCXIWd86sfFmlx2YL1SAX9jJS_jWXEVtGRNS3DCyduybRBF"
        );
    }

    #[test]
    fn test_raw_form() {
        let address: Address = CONTRACT.parse().unwrap();
        let raw = address.to_raw_string();
        assert_eq!(raw, format!("0:{}", CONTRACT_HASH));
        assert_eq!(raw.parse::<Address>().unwrap(), address);

        let masterchain: Address = format!("-1:{}", CONTRACT_HASH).parse().unwrap();
        assert_eq!(masterchain.get_workchain(), -1);
    }

    #[test]
    fn test_invalid_checksum() {
        let mut tampered = CONTRACT.to_owned();
        tampered.replace_range(10..11, "A");
        assert!(matches!(
            Address::parse_friendly(&tampered),
            Err(AddressError::InvalidChecksum) | Err(AddressError::InvalidBase64)
        ));
        assert_eq!(
            Address::parse_friendly("abc"),
            Err(AddressError::InvalidLength(3))
        );
    }

    #[test]
    fn test_serde_roundtrip_uses_friendly_form() {
        let address: Address = CONTRACT.parse().unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"EQCXIWd86sfFmlx2YL1SAX9jJS_jWXEVtGRNS3DCyduybavP\"");
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), address);
    }
}
