use thiserror::Error;

/// Errors surfaced by a [`crate::traits::ChainStore`] implementation.
/// `snsd-chainio` never implements this concretely; the variants exist so
/// callers (`snsd-state::history`, `snsd-snse`) have something typed to
/// propagate.
#[derive(Debug, Error)]
pub enum ChainIoError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
    #[error("requested block/tx not found")]
    NotFound,
    #[error("corrupt or unreadable auxiliary record: {0}")]
    CorruptRecord(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
