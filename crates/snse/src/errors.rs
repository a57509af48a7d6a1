//! One top-level `thiserror` type per crate, with `#[from]` conversions
//! absorbing the lower layers' errors, composing into the five abstract
//! kinds of SPEC_FULL §7.

use snsd_chainio::ChainIoError;
use snsd_chaintsn::{OpError, TsnError};
use snsd_state::StateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("backing store error: {0}")]
    Db(#[from] ChainIoError),

    #[error("consensus mismatch: {0}")]
    ConsensusMismatch(String),

    #[error("invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("internal logic error: {0}")]
    InternalLogicError(String),

    #[error("protocol timeout: {0}")]
    ProtocolTimeout(String),
}

impl From<TsnError> for Error {
    fn from(e: TsnError) -> Self {
        match e {
            TsnError::PulseVerification(msg) => Error::ConsensusMismatch(msg),
            other => Error::InternalLogicError(other.to_string()),
        }
    }
}

impl From<OpError> for Error {
    fn from(e: OpError) -> Self {
        match &e {
            OpError::InvalidRegistration { .. } => Error::InvalidRegistration(e.to_string()),
            _ => Error::InternalLogicError(e.to_string()),
        }
    }
}

impl From<StateError> for Error {
    fn from(e: StateError) -> Self {
        Error::InternalLogicError(e.to_string())
    }
}
