//! Error types for the block runtime.

use blocks_core::PathError;
use blocks_dom::DomError;
use thiserror::Error;

use crate::BlockId;

/// Errors raised by block construction, rendering and state access.
///
/// Errors are `Clone` so one initialization outcome can be handed to every
/// waiter on [`Block::ready`](crate::Block::ready).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A state path could not be parsed.
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// Building an element or parsing a selector failed.
    #[error("dom error: {0}")]
    Dom(#[from] DomError),

    /// A placeholder names a child the block does not own.
    #[error("block {parent} has a placeholder for unknown child '{child}'")]
    MissingChild { parent: BlockId, child: String },

    /// The block was removed before the operation could complete.
    #[error("block {0} was removed")]
    Removed(BlockId),

    /// A block's `initialize` hook failed.
    #[error("initialize failed: {0}")]
    Initialize(String),

    /// A block id string was not of the form `block<n>`.
    #[error("invalid block id: {0:?}")]
    InvalidBlockId(String),

    /// Runtime configuration could not be loaded.
    #[error("invalid runtime config: {0}")]
    Config(String),

    /// The task pool is already being driven further up the stack.
    #[error("runtime is already running")]
    Reentrant,
}

impl Error {
    /// Build an initialization failure from any displayable error.
    pub fn initialize(message: impl std::fmt::Display) -> Self {
        Error::Initialize(message.to_string())
    }
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;
