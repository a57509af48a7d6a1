use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrimitivesError {
    #[error("amount overflow")]
    AmountOverflow,
    #[error("amount underflow")]
    AmountUnderflow,
    #[error("invalid buffer length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },
}
