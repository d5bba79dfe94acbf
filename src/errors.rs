// Copyright 2025 Bilinear Labs - MIT License

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ThexError {
    #[error("Tree already finalized, call reset before reusing it")]
    AlreadyFinalized,

    #[error("Pipeline closed before the root was delivered")]
    PipelineClosed,

    #[error("Underlying algorithm reports a zero-width digest")]
    ZeroWidthDigest,

    #[error("Invalid node: {0}")]
    InvalidNode(String),
}
