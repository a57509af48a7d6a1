//! Operator/contributor addresses, native and post-HF20 Ethereum.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::buf::PubKey;

/// An address a contributor or operator can be paid out to.
///
/// Pre-HF20 chains only ever see [`Address::Native`]; HF20+ introduces
/// Ethereum-denominated addresses for the off-chain reward path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Address {
    Native(PubKey),
    Ethereum([u8; 20]),
}

impl Address {
    pub fn is_ethereum(&self) -> bool {
        matches!(self, Address::Ethereum(_))
    }
}

impl BorshSerialize for Address {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Address::Native(pk) => {
                0u8.serialize(writer)?;
                pk.serialize(writer)
            }
            Address::Ethereum(bytes) => {
                1u8.serialize(writer)?;
                bytes.serialize(writer)
            }
        }
    }
}

impl BorshDeserialize for Address {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let tag = u8::deserialize_reader(reader)?;
        match tag {
            0 => Ok(Address::Native(PubKey::deserialize_reader(reader)?)),
            1 => Ok(Address::Ethereum(<[u8; 20]>::deserialize_reader(reader)?)),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "unknown Address tag",
            )),
        }
    }
}
