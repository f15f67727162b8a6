use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

pub const OID_LEN: usize = 20;

/// A content hash naming one object: 20 raw bytes, rendered as 40
/// lowercase hex characters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid([u8; OID_LEN]);

impl Oid {
    /// Parses a 40-character hex string. Either case is accepted on
    /// input; rendering is always lowercase.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != OID_LEN * 2 {
            return Err(Error::Format);
        }
        let bytes = hex::decode(s).map_err(|_| Error::Format)?;
        bytes.as_slice().try_into()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; OID_LEN]> for Oid {
    fn from(raw: [u8; OID_LEN]) -> Self {
        Self(raw)
    }
}

impl TryFrom<&[u8]> for Oid {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; OID_LEN] = bytes.try_into().map_err(|_| Error::Format)?;
        Ok(Self(raw))
    }
}

impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
