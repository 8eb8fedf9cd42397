//! Error types for anything that crosses an external boundary (FEN
//! parsing, UCI move tokens). Internal invariant violations (a corrupt
//! bitboard, an empty move history on unmake) remain panics, since they
//! indicate a bug rather than bad input.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid FEN string: {0}")]
    InvalidFen(String),

    #[error("invalid UCI move token: {0}")]
    InvalidUciMove(String),
}
