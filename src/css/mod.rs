//! Selector compilation and bytecode
//!
//! This module turns selector text into the immutable bytecode programs the
//! matching VM executes, and hosts the instruction set, packed specificity,
//! and the precomputed keyword hashes.

pub mod compiler;
pub mod keywords;
pub mod opcode;
pub mod specificity;

// Re-exports for convenience
pub use compiler::{
  compile_selector, compile_selector_list, compile_selector_with_diagnostics, CompileDiagnostic,
  CompiledSelector,
};
pub use specificity::Specificity;
