//! fastselect: data-oriented CSS selector matching
//!
//! Strings are interned to 32-bit atoms, the document tree is a set of
//! parallel flat arrays addressed by integer indices, and selectors compile
//! to a compact bytecode executed right to left by a small VM. Every node
//! carries a bloom filter of its ancestors' {tag, id, class} hashes so
//! descendant selectors can reject whole subtrees without walking them.
//!
//! Typical use goes through a [`Session`]: intern atoms, build the tree,
//! compile selectors, then match. WebAssembly and C hosts use the flat
//! functions in [`abi`] instead, which wrap a process-global session.
//!
//! ```
//! use fastselect::{NodeId, Session};
//!
//! let mut session = Session::new();
//! let div = session.intern(b"div").unwrap();
//! let span = session.intern(b"span").unwrap();
//! let container = session.intern(b"container").unwrap();
//!
//! let outer = session.create_element(div, NodeId::NONE).unwrap();
//! session.set_classes(outer, &[container]).unwrap();
//! let inner = session.create_element(span, outer).unwrap();
//!
//! let selector = session.compile(".container span").unwrap();
//! assert_eq!(session.matches(selector, inner), Some(true));
//! assert_eq!(session.matches(selector, outer), Some(false));
//! ```

pub mod abi;
pub mod atom;
pub mod bloom;
pub mod config;
pub mod css;
pub mod dom;
pub mod error;
pub mod matching;
pub mod session;

pub use atom::{fnv1a, AtomId, AtomTable};
pub use bloom::{BloomFilter, BloomFilter256};
pub use css::{
  compile_selector, compile_selector_list, compile_selector_with_diagnostics, CompileDiagnostic,
  CompiledSelector, Specificity,
};
pub use dom::{Document, NodeId, NodeType};
pub use error::{Error, Result};
pub use matching::{execute, match_best, MAX_BACKTRACK_DEPTH};
pub use session::Session;
