use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], TypeError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
    if bytes.len() != N {
        return Err(TypeError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

macro_rules! hash_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wrap a pre-computed 32-byte hash.
            pub const fn from_hash(hash: [u8; 32]) -> Self {
                Self(hash)
            }

            /// The all-zero value.
            pub const fn zero() -> Self {
                Self([0u8; 32])
            }

            /// Returns `true` if every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            /// The raw 32-byte hash.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// `0x`-prefixed hex encoding.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }

            /// First four bytes as hex, for log lines.
            pub fn short_hex(&self) -> String {
                hex::encode(&self.0[..4])
            }

            /// Parse from hex, with or without a `0x` prefix.
            pub fn from_hex(s: &str) -> Result<Self, TypeError> {
                decode_fixed::<32>(s).map(Self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.short_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }
    };
}

hash_id! {
    /// Ledger-assigned organization identifier.
    ///
    /// Derived by the registry contract when the organization is created and
    /// immutable afterwards.
    OrgId
}

hash_id! {
    /// Hash of a signed transaction request.
    TxHash
}

hash_id! {
    /// Hash of an event signature; identifies the shape of a receipt log.
    EventTopic
}

/// 20-byte account address derived from a signer's public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    /// Derive an address from a 32-byte public key: the trailing 20 bytes of
    /// its BLAKE3 hash.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let digest = blake3::hash(public_key);
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&digest.as_bytes()[12..]);
        Self(arr)
    }

    /// Wrap raw address bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// The zero address.
    pub const fn zero() -> Self {
        Self([0u8; 20])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// `0x`-prefixed hex encoding.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        decode_fixed::<20>(s).map(Self)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
