/// Time-ordered 128-bit identifiers (UUID version 7)
///
/// The high 48 bits carry the epoch timestamp in milliseconds, the rest is
/// cryptographic randomness with the standard version and variant markers.
/// Used for request trace ids.
use crate::error::{VaultError, VaultResult};
use rand::RngCore;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub const UUID_SIZE: usize = 16;

/// A 128-bit universally unique identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uuid {
    bytes: [u8; UUID_SIZE],
}

impl Uuid {
    /// Generate a new time-ordered (version 7) UUID.
    pub fn now_v7() -> Self {
        let mut bytes = [0u8; UUID_SIZE];

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        // Timestamp in the first 6 bytes, big-endian
        bytes[0] = (now >> 40) as u8;
        bytes[1] = (now >> 32) as u8;
        bytes[2] = (now >> 24) as u8;
        bytes[3] = (now >> 16) as u8;
        bytes[4] = (now >> 8) as u8;
        bytes[5] = now as u8;

        rand::rngs::OsRng.fill_bytes(&mut bytes[6..]);

        // Version 7 nibble, RFC 4122 variant bits
        bytes[6] = (bytes[6] & 0x0F) | 0x70;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;

        Self { bytes }
    }

    /// Decode a UUID from its string representation.
    ///
    /// Hyphens are ignored; anything other than 32 hex characters is
    /// rejected.
    pub fn parse(input: &str) -> VaultResult<Self> {
        let hex_str: String = input.chars().filter(|c| *c != '-').collect();
        if hex_str.len() != UUID_SIZE * 2 {
            return Err(VaultError::InvalidInput(format!(
                "invalid UUID format: {input:?}"
            )));
        }

        let decoded = hex::decode(&hex_str)
            .map_err(|e| VaultError::InvalidInput(format!("invalid UUID format: {e}")))?;

        let mut bytes = [0u8; UUID_SIZE];
        bytes.copy_from_slice(&decoded);

        Ok(Self { bytes })
    }

    /// Epoch milliseconds embedded in the high 48 bits.
    pub fn timestamp_ms(&self) -> u64 {
        (u64::from(self.bytes[0]) << 40)
            | (u64::from(self.bytes[1]) << 32)
            | (u64::from(self.bytes[2]) << 24)
            | (u64::from(self.bytes[3]) << 16)
            | (u64::from(self.bytes[4]) << 8)
            | u64::from(self.bytes[5])
    }

    /// Raw bytes of the UUID.
    pub fn as_bytes(&self) -> &[u8; UUID_SIZE] {
        &self.bytes
    }
}

/// Canonical 8-4-4-4-12 lowercase hex form.
impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}",
            hex::encode(&self.bytes[0..4]),
            hex::encode(&self.bytes[4..6]),
            hex::encode(&self.bytes[6..8]),
            hex::encode(&self.bytes[8..10]),
            hex::encode(&self.bytes[10..16]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_canonical_form(s: &str) {
        let groups: Vec<&str> = s.split('-').collect();
        assert_eq!(groups.len(), 5, "expected 5 groups in {s}");
        let lens = [8, 4, 4, 4, 12];
        for (group, len) in groups.iter().zip(lens) {
            assert_eq!(group.len(), len);
            assert!(group.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_generate_v7_markers() {
        let uuid = Uuid::now_v7();
        let bytes = uuid.as_bytes();

        assert_eq!(bytes[6] >> 4, 0x7, "version nibble");
        assert_eq!(bytes[8] >> 6, 0b10, "variant bits");
        assert_canonical_form(&uuid.to_string());
    }

    #[test]
    fn test_timestamp_is_recent() {
        let uuid = Uuid::now_v7();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;

        assert!(now - uuid.timestamp_ms() < 1000, "timestamp too old");
    }

    #[test]
    fn test_parse_roundtrip() {
        let uuid = Uuid::now_v7();
        let parsed = Uuid::parse(&uuid.to_string()).unwrap();
        assert_eq!(parsed, uuid);
        assert_eq!(parsed.to_string(), uuid.to_string());
    }

    #[test]
    fn test_parse_accepts_undashed() {
        let parsed = Uuid::parse("123e4567e89b7abc9def123456789abc").unwrap();
        assert_eq!(parsed.to_string(), "123e4567-e89b-7abc-9def-123456789abc");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Uuid::parse("123e4567").is_err());
        assert!(Uuid::parse("123e4567-e89b-7abc-9def-12345678xxxx").is_err());
    }

    #[tokio::test]
    async fn test_concurrent_generation_is_distinct() {
        let mut handles = Vec::new();
        for _ in 0..100 {
            handles.push(tokio::spawn(async { Uuid::now_v7() }));
        }

        let mut seen = HashSet::new();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;

        for handle in handles {
            let uuid = handle.await.unwrap();
            assert!(seen.insert(uuid), "duplicate UUID generated");
            assert!(now.saturating_sub(uuid.timestamp_ms()) < 1000);
            assert_eq!(Uuid::parse(&uuid.to_string()).unwrap(), uuid);
        }
    }
}
