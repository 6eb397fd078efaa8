//! Fixed-size byte buffers with big-endian hex display and serde
//! support.

use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ParseError;

macro_rules! impl_buf {
    ($name:ident, $len:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn new(data: [u8; $len]) -> Self {
                Self(data)
            }

            pub const fn zero() -> Self {
                Self([0; $len])
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            pub fn as_slice(&self) -> &[u8] {
                &self.0
            }

            /// Copies from a slice, failing unless it is exactly
            /// [`Self::LEN`] bytes long.
            pub fn from_slice(data: &[u8]) -> Result<Self, ParseError> {
                let arr: [u8; $len] = data
                    .try_into()
                    .map_err(|_| ParseError::WrongLength($len, data.len()))?;
                Ok(Self(arr))
            }

            /// Parses a big-endian hex string of exactly `2 * LEN` chars.
            pub fn from_hex(s: &str) -> Result<Self, ParseError> {
                let bytes = hex::decode(s)?;
                Self::from_slice(&bytes)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::zero()
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(value: [u8; $len]) -> Self {
                Self(value)
            }
        }

        impl From<$name> for [u8; $len] {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<[u8; $len]> for $name {
            fn as_ref(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(de::Error::custom)
            }
        }
    };
}

impl_buf!(Hash256, 32, "A 32-byte hash, displayed as big-endian hex.");
impl_buf!(Address20, 20, "A 20-byte address (HASH160 or side-chain account).");
impl_buf!(Pubkey32, 32, "A 32-byte validator pubkey.");
impl_buf!(Pubkey33, 33, "A 33-byte compressed monitor pubkey.");
