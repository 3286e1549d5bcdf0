//! Error types for fastselect
//!
//! Each subsystem has its own error enum:
//! - Atom table errors (interning)
//! - Tree errors (node construction)
//! - Selector errors (compilation)
//!
//! Matching itself never fails: the VM treats malformed bytecode and invalid
//! nodes as a non-match, so a query over any tree with any program returns a
//! boolean. All errors use the `thiserror` crate for minimal boilerplate and
//! proper error trait implementations.

use thiserror::Error;

/// Result type alias for fastselect operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for fastselect
///
/// Covers everything that can fail during the build phase (interning,
/// tree construction, selector compilation).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// Atom table error
  #[error("Atom error: {0}")]
  Atom(#[from] AtomError),

  /// Tree construction error
  #[error("Tree error: {0}")]
  Tree(#[from] TreeError),

  /// Selector compilation error
  #[error("Selector error: {0}")]
  Selector(#[from] SelectorError),
}

/// Errors reported by the atom table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtomError {
  /// Input exceeds the 64 KiB per-atom limit
  #[error("String of {len} bytes exceeds the 65535-byte atom limit")]
  StringTooLong { len: usize },
}

/// Errors reported during tree construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
  /// A node index referred to a node that does not exist
  #[error("Invalid node index: {node}")]
  InvalidNode { node: u32 },

  /// More classes than a node can carry
  #[error("{count} classes exceed the 255-per-node limit")]
  TooManyClasses { count: usize },
}

/// Errors reported by the selector compiler
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
  /// The selector contained no usable compound
  #[error("Selector is empty")]
  EmptySelector,
}
