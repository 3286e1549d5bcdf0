//! Matching session
//!
//! A [`Session`] owns everything with a shared lifetime: the atom table, the
//! flat document tree, and the compiled selector list. Dropping the session
//! releases all of it in one step. Selectors compiled through a session are
//! cached by source text, so re-compiling the same selector returns the
//! original index and embedders can treat indices as stable handles.
//!
//! The session is the native API; the flat C surface in [`crate::abi`] wraps
//! one process-global session for hosts that cannot hold a handle.

use crate::atom::AtomId;
use crate::atom::AtomTable;
use crate::css::compiler;
use crate::css::CompileDiagnostic;
use crate::css::CompiledSelector;
use crate::dom::Document;
use crate::dom::NodeId;
use crate::error::Result;
use crate::matching;
use rustc_hash::FxHashMap;

/// One build-then-query lifecycle: atoms, tree and selectors together.
pub struct Session {
  atoms: AtomTable,
  doc: Document,
  selectors: Vec<CompiledSelector>,
  /// Selector source → index into `selectors`.
  compile_cache: FxHashMap<Box<str>, u32>,
  style_atom: AtomId,
}

impl Default for Session {
  fn default() -> Self {
    Self::new()
  }
}

impl Session {
  pub fn new() -> Self {
    let mut atoms = AtomTable::new();
    let style_atom = atoms
      .intern(b"style")
      .expect("interning a short literal cannot fail");
    Session {
      atoms,
      doc: Document::new(),
      selectors: Vec::new(),
      compile_cache: FxHashMap::default(),
      style_atom,
    }
  }

  /// Rebuilds the tree from scratch. Atoms and compiled selectors survive;
  /// node ids from the previous tree do not.
  pub fn reset_document(&mut self) {
    self.doc.reset();
  }

  pub fn atoms(&self) -> &AtomTable {
    &self.atoms
  }

  pub fn document(&self) -> &Document {
    &self.doc
  }

  pub fn intern(&mut self, bytes: &[u8]) -> Result<AtomId> {
    Ok(self.atoms.intern(bytes)?)
  }

  pub fn create_element(&mut self, tag: AtomId, parent: NodeId) -> Result<NodeId> {
    Ok(self.doc.create_element(&self.atoms, tag, parent)?)
  }

  pub fn create_text(&mut self, parent: NodeId, bytes: &[u8]) -> Result<NodeId> {
    Ok(self.doc.create_text(parent, bytes)?)
  }

  pub fn set_id(&mut self, node: NodeId, id: AtomId) -> Result<()> {
    Ok(self.doc.set_id(&self.atoms, node, id)?)
  }

  pub fn set_classes(&mut self, node: NodeId, classes: &[AtomId]) -> Result<()> {
    Ok(self.doc.set_classes(&self.atoms, node, classes)?)
  }

  /// Appends an attribute; a `style` attribute also sets the node's
  /// has-style flag.
  pub fn add_attribute(&mut self, node: NodeId, name: AtomId, value: &[u8]) -> Result<()> {
    self.doc.add_attribute(node, name, value)?;
    if name == self.style_atom {
      self.doc.set_has_style(node)?;
    }
    Ok(())
  }

  /// Compiles a selector and returns its stable index.
  pub fn compile(&mut self, source: &str) -> Result<u32> {
    self.compile_with_diagnostics(source).map(|(index, _)| index)
  }

  /// Compiles a selector, returning its index and any diagnostics.
  ///
  /// Cache hits return the existing index with no diagnostics; the source
  /// was already accepted once.
  pub fn compile_with_diagnostics(&mut self, source: &str) -> Result<(u32, Vec<CompileDiagnostic>)> {
    if let Some(&index) = self.compile_cache.get(source) {
      return Ok((index, Vec::new()));
    }
    let (selector, diagnostics) = compiler::compile_selector_with_diagnostics(&mut self.atoms, source)?;
    let index = self.selectors.len() as u32;
    self.selectors.push(selector);
    self.compile_cache.insert(source.into(), index);
    Ok((index, diagnostics))
  }

  pub fn selector(&self, index: u32) -> Option<&CompiledSelector> {
    self.selectors.get(index as usize)
  }

  pub fn selector_count(&self) -> usize {
    self.selectors.len()
  }

  pub fn node_count(&self) -> usize {
    self.doc.node_count()
  }

  /// Runs one compiled selector against a node. `None` for an unknown
  /// selector index.
  pub fn matches(&self, index: u32, node: NodeId) -> Option<bool> {
    let selector = self.selectors.get(index as usize)?;
    Some(matching::matches(selector, &self.atoms, &self.doc, node))
  }

  /// Index of the winning selector for `node` across every compiled
  /// selector: highest specificity, later index on ties.
  pub fn match_best(&self, node: NodeId) -> Option<u32> {
    matching::match_best(&self.selectors, &self.atoms, &self.doc, node).map(|i| i as u32)
  }
}
