use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Length of a raw object id in bytes.
pub const ID_LEN: usize = 20;

/// Length of a hex-encoded object id.
pub const ID_HEX_LEN: usize = ID_LEN * 2;

/// Content-addressed identifier for any git object.
///
/// An `ObjectId` is the SHA-1 digest of an object's canonical encoding
/// (`"<type> <size>\0<payload>"`). Ids compare and sort by their raw bytes,
/// which is also the order used by pack index files.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; ID_LEN]);

impl ObjectId {
    /// Create an `ObjectId` from a raw 20-byte digest.
    pub const fn from_raw(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Create an `ObjectId` from a byte slice that must be exactly 20 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        let raw: [u8; ID_LEN] = bytes.try_into().map_err(|_| TypeError::MalformedId {
            input: hex::encode(bytes),
            reason: format!("expected {ID_LEN} bytes, got {}", bytes.len()),
        })?;
        Ok(Self(raw))
    }

    /// The null object id (all zeros). Git uses it to mean "no object".
    pub const fn null() -> Self {
        Self([0u8; ID_LEN])
    }

    /// Returns `true` if this is the null object id.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; ID_LEN]
    }

    /// The raw 20-byte digest.
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Leading byte, used to select a pack index fan-out bucket.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// Lowercase hex representation (40 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex representation (first 7 characters).
    pub fn short_hex(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(7);
        s
    }

    /// Parse from a 40-character hex string.
    ///
    /// Surrounding whitespace (including newlines, as found at the end of ref
    /// files) is trimmed. No other normalization is applied.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let trimmed = s.trim();
        if trimmed.len() != ID_HEX_LEN {
            return Err(TypeError::MalformedId {
                input: s.to_string(),
                reason: format!("expected {ID_HEX_LEN} hex characters, got {}", trimmed.len()),
            });
        }
        let mut raw = [0u8; ID_LEN];
        hex::decode_to_slice(trimmed, &mut raw).map_err(|e| TypeError::MalformedId {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(raw))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; ID_LEN]> for ObjectId {
    fn from(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; ID_LEN] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl AsRef<[u8]> for ObjectId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = "af69da9aad950cec69faeca2543498075f8e3804";

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::from_hex(SAMPLE).unwrap();
        assert_eq!(id.to_hex(), SAMPLE);
        assert_eq!(id.first_byte(), 0xaf);
    }

    #[test]
    fn uppercase_is_formatted_lowercase() {
        let id = ObjectId::from_hex(&SAMPLE.to_uppercase()).unwrap();
        assert_eq!(id.to_hex(), SAMPLE);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let id = ObjectId::from_hex(&format!("  {SAMPLE}\n")).unwrap();
        assert_eq!(id.to_hex(), SAMPLE);
    }

    #[test]
    fn wrong_length_is_malformed() {
        for input in ["", "abc", &SAMPLE[..39], &format!("{SAMPLE}0")] {
            let err = ObjectId::from_hex(input).unwrap_err();
            assert!(matches!(err, TypeError::MalformedId { .. }), "{input:?}");
        }
    }

    #[test]
    fn non_hex_is_malformed() {
        let bad = format!("{}g", &SAMPLE[..39]);
        assert!(matches!(
            ObjectId::from_hex(&bad),
            Err(TypeError::MalformedId { .. })
        ));
    }

    #[test]
    fn inner_whitespace_is_not_normalized() {
        let bad = format!("{} {}", &SAMPLE[..20], &SAMPLE[21..]);
        assert!(ObjectId::from_hex(&bad).is_err());
    }

    #[test]
    fn from_bytes_checks_length() {
        assert!(ObjectId::from_bytes(&[0u8; 20]).unwrap().is_null());
        assert!(ObjectId::from_bytes(&[0u8; 19]).is_err());
    }

    #[test]
    fn short_hex_is_7_chars() {
        let id = ObjectId::from_hex(SAMPLE).unwrap();
        assert_eq!(id.short_hex(), "af69da9");
        assert_eq!(format!("{id:?}"), "ObjectId(af69da9)");
    }

    #[test]
    fn serde_uses_hex_strings() {
        let id = ObjectId::from_hex(SAMPLE).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{SAMPLE}\""));
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn ordering_is_bytewise() {
        let low = ObjectId::from_raw([0; 20]);
        let mut raw = [0; 20];
        raw[19] = 1;
        let high = ObjectId::from_raw(raw);
        assert!(low < high);
    }

    proptest! {
        #[test]
        fn format_parse_is_lowercase_identity(s in "[0-9a-fA-F]{40}") {
            let id = ObjectId::from_hex(&s).unwrap();
            prop_assert_eq!(id.to_hex(), s.to_lowercase());
        }

        #[test]
        fn wrong_lengths_always_fail(s in "[0-9a-f]{0,80}") {
            prop_assume!(s.len() != ID_HEX_LEN);
            prop_assert!(ObjectId::from_hex(&s).is_err());
        }
    }
}
