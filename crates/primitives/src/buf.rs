//! Fixed-size byte buffers used as key/hash/signature newtypes.
//!
//! Mirrors the `Buf20`/`Buf32`/`Buf64` wrapper idiom, but over plain arrays
//! instead of an external `alloy_primitives::FixedBytes` dependency since
//! this workspace has no EVM surface.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

macro_rules! fixed_buf {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(#[serde(with = "hex::serde")] pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn new(buf: [u8; $len]) -> Self {
                Self(buf)
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn from_slice(s: &[u8]) -> Option<Self> {
                if s.len() != $len {
                    return None;
                }
                let mut buf = [0u8; $len];
                buf.copy_from_slice(s);
                Some(Self(buf))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $len])
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(buf: [u8; $len]) -> Self {
                Self(buf)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl BorshSerialize for $name {
            fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
                writer.write_all(&self.0)
            }
        }

        impl BorshDeserialize for $name {
            fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
                let mut buf = [0u8; $len];
                reader.read_exact(&mut buf)?;
                Ok(Self(buf))
            }
        }
    };
}

fixed_buf!(Hash32, 32);
fixed_buf!(PubKey, 32);
fixed_buf!(X25519PubKey, 32);
fixed_buf!(KeyImage, 32);
fixed_buf!(Signature, 64);
fixed_buf!(BlsPublicKey, 96);
fixed_buf!(BlsSignature, 48);
