use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of every key and derived address, in bytes.
pub const PUBKEY_BYTES: usize = 32;

/// A 32-byte key naming an identity or an account.
///
/// Owners, proposers and executors are identities whose signatures the
/// platform has already verified. Registry, transaction and authority
/// addresses are derived values with no private key (see
/// [`crate::derivation`]). Both share this representation so that payloads
/// can reference either without a lookup.
///
/// Serialized as a lowercase hex string.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pubkey([u8; PUBKEY_BYTES]);

impl Pubkey {
    pub const fn new(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// A fresh random key, for tests and simulations.
    /// Each call produces a distinct key.
    pub fn new_unique() -> Self {
        let mut buf = [0u8; PUBKEY_BYTES];
        buf[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        buf[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        Self(*blake3::hash(&buf).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; PUBKEY_BYTES] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; PUBKEY_BYTES] {
        self.0
    }

    /// Short display form (first 8 bytes hex).
    pub fn short_id(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; PUBKEY_BYTES]> for Pubkey {
    fn from(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self.short_id())
    }
}

/// Errors from parsing a hex-encoded key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsePubkeyError {
    #[error("expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid hex character at position {0}")]
    InvalidCharacter(usize),
}

impl FromStr for Pubkey {
    type Err = ParsePubkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode_32(s).map(Self)
    }
}

impl TryFrom<String> for Pubkey {
    type Error = ParsePubkeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pubkey> for String {
    fn from(key: Pubkey) -> Self {
        key.to_string()
    }
}

mod hex {
    use super::{ParsePubkeyError, PUBKEY_BYTES};

    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(bytes: &[u8]) -> String {
        let mut s = String::with_capacity(bytes.len() * 2);
        for &b in bytes {
            s.push(HEX_CHARS[(b >> 4) as usize] as char);
            s.push(HEX_CHARS[(b & 0xf) as usize] as char);
        }
        s
    }

    pub fn decode_32(s: &str) -> Result<[u8; PUBKEY_BYTES], ParsePubkeyError> {
        let raw = s.as_bytes();
        if raw.len() != PUBKEY_BYTES * 2 {
            return Err(ParsePubkeyError::InvalidLength {
                expected: PUBKEY_BYTES * 2,
                actual: raw.len(),
            });
        }

        let mut out = [0u8; PUBKEY_BYTES];
        for (i, byte) in out.iter_mut().enumerate() {
            let hi = nibble(raw[2 * i]).ok_or(ParsePubkeyError::InvalidCharacter(2 * i))?;
            let lo = nibble(raw[2 * i + 1]).ok_or(ParsePubkeyError::InvalidCharacter(2 * i + 1))?;
            *byte = (hi << 4) | lo;
        }
        Ok(out)
    }

    fn nibble(c: u8) -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'a'..=b'f' => Some(c - b'a' + 10),
            b'A'..=b'F' => Some(c - b'A' + 10),
            _ => None,
        }
    }
}
