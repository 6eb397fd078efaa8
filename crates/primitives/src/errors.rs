//! Errors during parsing/handling of primitives.

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("expected {0} bytes, got {1}")]
    WrongLength(usize, usize),

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
