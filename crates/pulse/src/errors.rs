//! PSM never bubbles stage failures to callers (SPEC_FULL §5); this type
//! only surfaces conditions `tick()`'s caller genuinely needs to react to
//! (a broken `ChainStore`/`QuorumNet`), plus `ProtocolTimeout` for
//! observability.

use snsd_chainio::ChainIoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("chain store error: {0}")]
    ChainIo(#[from] ChainIoError),

    #[error("pulse protocol timeout: {0}")]
    ProtocolTimeout(String),

    #[error("byzantine message rejected: {0}")]
    Byzantine(String),
}
