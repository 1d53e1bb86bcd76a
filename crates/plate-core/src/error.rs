use thiserror::Error;

/// Why a step could not be applied to a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("position {pos} is outside the document (content size {size})")]
    OutOfRange { pos: usize, size: usize },

    #[error("range {from}..{to} does not share a single parent")]
    CrossesParents { from: usize, to: usize },

    #[error("range {from}..{to} is inverted")]
    InvertedRange { from: usize, to: usize },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("no element or void node starts at {pos}")]
    NoNodeAt { pos: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("duplicate node spec kind: {0}")]
    DuplicateKind(String),
}
