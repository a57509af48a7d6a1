use snsd_primitives::PubKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("node {0} not found in snapshot")]
    NodeNotFound(PubKey),
    #[error("node {0} cannot transition: {1}")]
    InvalidTransition(PubKey, String),
    #[error("invariant violated: {0}")]
    InvariantViolated(String),
}
