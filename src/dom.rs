//! Flat document tree
//!
//! The tree is stored as structure-of-arrays: every per-node field is its own
//! contiguous column, and every cross-node reference is a plain integer index
//! into those columns. Selector matching touches one or two fields across
//! many sibling nodes, and the flat columns keep those accesses cache-dense.
//! There are no node objects and no pointers anywhere in the layout.
//!
//! Index 0 is a synthetic document node created with the tree. Passing
//! [`NodeId::NONE`] as a parent creates a top-level element: it participates
//! in the document node's child list so sibling iteration works, but reports
//! parent 0 and depth 0.
//!
//! Each node carries an ancestor bloom filter: the union of the {tag, id,
//! class} hashes of every strict ancestor, never including the node itself.
//! The filter is computed once at insertion from the parent's filter and the
//! parent's own hashes. Setting an id or classes on a node after its
//! descendants exist does not rewrite the descendants' filters; producers are
//! expected to populate a node before creating its children.
//!
//! The tree is append-only. Nodes cannot be removed; rebuild the tree to
//! "remove". All storage is released together when the tree is dropped.

use crate::atom::AtomId;
use crate::atom::AtomTable;
use crate::bloom::BloomFilter;
use crate::error::TreeError;

/// Upper bound on classes per node.
pub const MAX_CLASSES_PER_NODE: usize = 255;

/// Index of a node in the flat tree.
///
/// 0 doubles as "no node" in link columns and as the synthetic document
/// node's own index. The document node is never returned as a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
  /// Absent node / the synthetic document node.
  pub const NONE: NodeId = NodeId(0);

  #[inline]
  pub fn is_none(self) -> bool {
    self.0 == 0
  }

  #[inline]
  fn index(self) -> usize {
    self.0 as usize
  }
}

/// Kind of a tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
  Element,
  Text,
  Cdata,
  Comment,
  Document,
  Doctype,
  Fragment,
}

const FLAG_HAS_ID: u8 = 1 << 0;
const FLAG_HAS_CLASSES: u8 = 1 << 1;
const FLAG_HAS_STYLE: u8 = 1 << 2;
const FLAG_IN_SHADOW: u8 = 1 << 3;

/// Per-node flag bits, packed into one byte per node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeFlags(u8);

impl NodeFlags {
  pub fn has_id(self) -> bool {
    self.0 & FLAG_HAS_ID != 0
  }

  pub fn has_classes(self) -> bool {
    self.0 & FLAG_HAS_CLASSES != 0
  }

  pub fn has_style(self) -> bool {
    self.0 & FLAG_HAS_STYLE != 0
  }

  pub fn in_shadow(self) -> bool {
    self.0 & FLAG_IN_SHADOW != 0
  }

  fn set(&mut self, bit: u8, on: bool) {
    if on {
      self.0 |= bit;
    } else {
      self.0 &= !bit;
    }
  }
}

/// One attribute in the shared attribute pool.
#[derive(Clone, Copy, Debug)]
struct AttrEntry {
  name: AtomId,
  value_offset: u32,
  value_len: u32,
}

/// The flat document tree.
///
/// All mutation happens during the build phase; matching reads only.
#[derive(Debug, Default)]
pub struct Document {
  // Per-node columns.
  tag: Vec<AtomId>,
  id: Vec<AtomId>,
  class_offset: Vec<u32>,
  class_count: Vec<u8>,
  parent: Vec<NodeId>,
  first_child: Vec<NodeId>,
  last_child: Vec<NodeId>,
  next_sibling: Vec<NodeId>,
  prev_sibling: Vec<NodeId>,
  ancestor_filter: Vec<BloomFilter>,
  /// Bloom of the node's own {tag, id, classes}; folded into each child's
  /// ancestor filter at child creation time.
  self_filter: Vec<BloomFilter>,
  node_type: Vec<NodeType>,
  depth: Vec<u16>,
  flags: Vec<NodeFlags>,
  text_offset: Vec<u32>,
  text_len: Vec<u32>,
  attr_offset: Vec<u32>,
  attr_count: Vec<u16>,

  // Shared append-only pools.
  class_pool: Vec<AtomId>,
  attr_pool: Vec<AttrEntry>,
  byte_pool: Vec<u8>,
}

impl Document {
  pub fn new() -> Self {
    let mut doc = Document::default();
    doc.push_node(NodeType::Document, AtomId::NULL, 0, BloomFilter::empty());
    doc
  }

  /// Drops every node and pool and re-creates the synthetic document node.
  pub fn reset(&mut self) {
    *self = Document::new();
  }

  /// Number of nodes, including the document node at index 0.
  pub fn node_count(&self) -> usize {
    self.tag.len()
  }

  // ==========================================================================
  // Construction
  // ==========================================================================

  /// Appends an element as the last child of `parent`.
  ///
  /// The child's depth and ancestor filter are derived from the parent here
  /// and never touched again. `parent == NodeId::NONE` creates a top-level
  /// element with depth 0 and an empty filter.
  pub fn create_element(
    &mut self,
    atoms: &AtomTable,
    tag: AtomId,
    parent: NodeId,
  ) -> Result<NodeId, TreeError> {
    self.check_node(parent)?;
    let (depth, filter) = self.child_placement(parent);
    let node = self.push_node(NodeType::Element, tag, depth, filter);
    self.self_filter[node.index()] = BloomFilter::single(atoms.hash_of(tag));
    self.link_last_child(parent, node);
    Ok(node)
  }

  /// Appends a text node as the last child of `parent`.
  ///
  /// Text nodes are never selector targets, so they carry an empty ancestor
  /// filter; producers that never match against text may elide them
  /// entirely.
  pub fn create_text(&mut self, parent: NodeId, bytes: &[u8]) -> Result<NodeId, TreeError> {
    self.check_node(parent)?;
    let (depth, _) = self.child_placement(parent);
    let node = self.push_node(NodeType::Text, AtomId::NULL, depth, BloomFilter::empty());
    self.text_offset[node.index()] = self.byte_pool.len() as u32;
    self.text_len[node.index()] = bytes.len() as u32;
    self.byte_pool.extend_from_slice(bytes);
    self.link_last_child(parent, node);
    Ok(node)
  }

  /// Sets the node's id attribute atom.
  ///
  /// Descendants created before this call keep their existing ancestor
  /// filters; set the id before creating children.
  pub fn set_id(&mut self, atoms: &AtomTable, node: NodeId, id: AtomId) -> Result<(), TreeError> {
    self.check_node(node)?;
    self.id[node.index()] = id;
    self.flags[node.index()].set(FLAG_HAS_ID, !id.is_null());
    if !id.is_null() {
      self.self_filter[node.index()] |= BloomFilter::single(atoms.hash_of(id));
    }
    Ok(())
  }

  /// Replaces the node's class list. Same retroactivity caveat as
  /// [`Self::set_id`].
  pub fn set_classes(
    &mut self,
    atoms: &AtomTable,
    node: NodeId,
    classes: &[AtomId],
  ) -> Result<(), TreeError> {
    self.check_node(node)?;
    if classes.len() > MAX_CLASSES_PER_NODE {
      return Err(TreeError::TooManyClasses { count: classes.len() });
    }
    self.class_offset[node.index()] = self.class_pool.len() as u32;
    self.class_count[node.index()] = classes.len() as u8;
    self.class_pool.extend_from_slice(classes);
    self.flags[node.index()].set(FLAG_HAS_CLASSES, !classes.is_empty());
    for &class in classes {
      self.self_filter[node.index()] |= BloomFilter::single(atoms.hash_of(class));
    }
    Ok(())
  }

  /// Appends an attribute to the node.
  ///
  /// Each node's attributes form one contiguous run in the shared pool. If
  /// the node's run is no longer at the pool tail (another node appended in
  /// between), the run is copied to the tail first; the pool itself only
  /// ever grows.
  pub fn add_attribute(
    &mut self,
    node: NodeId,
    name: AtomId,
    value: &[u8],
  ) -> Result<(), TreeError> {
    self.check_node(node)?;
    let i = node.index();
    let offset = self.attr_offset[i] as usize;
    let count = self.attr_count[i] as usize;
    if count > 0 && offset + count != self.attr_pool.len() {
      let moved = self.attr_pool.len() as u32;
      for k in 0..count {
        let entry = self.attr_pool[offset + k];
        self.attr_pool.push(entry);
      }
      self.attr_offset[i] = moved;
    } else if count == 0 {
      self.attr_offset[i] = self.attr_pool.len() as u32;
    }
    let value_offset = self.byte_pool.len() as u32;
    self.byte_pool.extend_from_slice(value);
    self.attr_pool.push(AttrEntry {
      name,
      value_offset,
      value_len: value.len() as u32,
    });
    self.attr_count[i] += 1;
    Ok(())
  }

  /// Marks the node as carrying inline style.
  pub fn set_has_style(&mut self, node: NodeId) -> Result<(), TreeError> {
    self.check_node(node)?;
    self.flags[node.index()].set(FLAG_HAS_STYLE, true);
    Ok(())
  }

  /// Marks the node as living inside a shadow scope.
  pub fn set_in_shadow(&mut self, node: NodeId) -> Result<(), TreeError> {
    self.check_node(node)?;
    self.flags[node.index()].set(FLAG_IN_SHADOW, true);
    Ok(())
  }

  // ==========================================================================
  // Accessors
  // ==========================================================================

  pub fn tag(&self, node: NodeId) -> AtomId {
    self.tag.get(node.index()).copied().unwrap_or(AtomId::NULL)
  }

  pub fn id(&self, node: NodeId) -> AtomId {
    self.id.get(node.index()).copied().unwrap_or(AtomId::NULL)
  }

  pub fn parent(&self, node: NodeId) -> NodeId {
    self.parent.get(node.index()).copied().unwrap_or(NodeId::NONE)
  }

  pub fn first_child(&self, node: NodeId) -> NodeId {
    self.first_child.get(node.index()).copied().unwrap_or(NodeId::NONE)
  }

  pub fn next_sibling(&self, node: NodeId) -> NodeId {
    self.next_sibling.get(node.index()).copied().unwrap_or(NodeId::NONE)
  }

  pub fn prev_sibling(&self, node: NodeId) -> NodeId {
    self.prev_sibling.get(node.index()).copied().unwrap_or(NodeId::NONE)
  }

  pub fn ancestor_filter(&self, node: NodeId) -> BloomFilter {
    self
      .ancestor_filter
      .get(node.index())
      .copied()
      .unwrap_or_else(BloomFilter::empty)
  }

  pub fn depth(&self, node: NodeId) -> u16 {
    self.depth.get(node.index()).copied().unwrap_or(0)
  }

  pub fn node_type(&self, node: NodeId) -> NodeType {
    self.node_type.get(node.index()).copied().unwrap_or(NodeType::Document)
  }

  pub fn flags(&self, node: NodeId) -> NodeFlags {
    self.flags.get(node.index()).copied().unwrap_or_default()
  }

  /// True for element nodes other than the document node.
  pub fn is_element(&self, node: NodeId) -> bool {
    !node.is_none() && matches!(self.node_type.get(node.index()), Some(NodeType::Element))
  }

  /// Whether `node` exists in this tree.
  pub fn contains(&self, node: NodeId) -> bool {
    node.index() < self.tag.len()
  }

  pub fn classes(&self, node: NodeId) -> &[AtomId] {
    match (self.class_offset.get(node.index()), self.class_count.get(node.index())) {
      (Some(&offset), Some(&count)) => {
        let start = offset as usize;
        &self.class_pool[start..start + count as usize]
      }
      _ => &[],
    }
  }

  pub fn has_class(&self, node: NodeId, class: AtomId) -> bool {
    !class.is_null() && self.classes(node).contains(&class)
  }

  /// Text payload for text-like nodes.
  pub fn text_of(&self, node: NodeId) -> Option<&[u8]> {
    let i = node.index();
    match self.node_type.get(i) {
      Some(NodeType::Text | NodeType::Cdata | NodeType::Comment) => {
        let start = self.text_offset[i] as usize;
        Some(&self.byte_pool[start..start + self.text_len[i] as usize])
      }
      _ => None,
    }
  }

  /// Value bytes of the first attribute named `name`.
  pub fn attribute(&self, node: NodeId, name: AtomId) -> Option<&[u8]> {
    self.attributes(node).find(|&(n, _)| n == name).map(|(_, v)| v)
  }

  /// Ordered attribute list of the node.
  pub fn attributes(&self, node: NodeId) -> impl Iterator<Item = (AtomId, &[u8])> + '_ {
    let (offset, count) = match (self.attr_offset.get(node.index()), self.attr_count.get(node.index())) {
      (Some(&o), Some(&c)) => (o as usize, c as usize),
      _ => (0, 0),
    };
    self.attr_pool[offset..offset + count].iter().map(|entry| {
      let start = entry.value_offset as usize;
      (entry.name, &self.byte_pool[start..start + entry.value_len as usize])
    })
  }

  /// Forward child sequence. Lazy and finite; re-create to iterate again.
  pub fn children(&self, node: NodeId) -> Children<'_> {
    Children {
      doc: self,
      next: self.first_child(node),
    }
  }

  /// Bottom-up ancestor sequence starting at the node's parent. The
  /// document node is never yielded.
  pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
    Ancestors {
      doc: self,
      next: self.parent(node),
    }
  }

  /// Nearest preceding element sibling, skipping text and other non-element
  /// siblings.
  pub fn prev_element_sibling(&self, node: NodeId) -> NodeId {
    let mut sibling = self.prev_sibling(node);
    while !sibling.is_none() && !self.is_element(sibling) {
      sibling = self.prev_sibling(sibling);
    }
    sibling
  }

  /// 1-based position of the node among its element siblings, counting
  /// forward from the first sibling.
  pub fn element_index(&self, node: NodeId) -> i32 {
    let mut index = 1;
    let mut sibling = self.prev_sibling(node);
    while !sibling.is_none() {
      if self.is_element(sibling) {
        index += 1;
      }
      sibling = self.prev_sibling(sibling);
    }
    index
  }

  /// 1-based position counting backward from the last element sibling.
  pub fn element_index_from_end(&self, node: NodeId) -> i32 {
    let mut index = 1;
    let mut sibling = self.next_sibling(node);
    while !sibling.is_none() {
      if self.is_element(sibling) {
        index += 1;
      }
      sibling = self.next_sibling(sibling);
    }
    index
  }

  // ==========================================================================
  // Internals
  // ==========================================================================

  fn check_node(&self, node: NodeId) -> Result<(), TreeError> {
    if self.contains(node) {
      Ok(())
    } else {
      Err(TreeError::InvalidNode { node: node.0 })
    }
  }

  /// Depth and ancestor filter a new child of `parent` receives.
  fn child_placement(&self, parent: NodeId) -> (u16, BloomFilter) {
    if parent.is_none() {
      (0, BloomFilter::empty())
    } else {
      let i = parent.index();
      (
        self.depth[i].saturating_add(1),
        self.ancestor_filter[i] | self.self_filter[i],
      )
    }
  }

  fn push_node(&mut self, node_type: NodeType, tag: AtomId, depth: u16, filter: BloomFilter) -> NodeId {
    let id = NodeId(self.tag.len() as u32);
    self.tag.push(tag);
    self.id.push(AtomId::NULL);
    self.class_offset.push(0);
    self.class_count.push(0);
    self.parent.push(NodeId::NONE);
    self.first_child.push(NodeId::NONE);
    self.last_child.push(NodeId::NONE);
    self.next_sibling.push(NodeId::NONE);
    self.prev_sibling.push(NodeId::NONE);
    self.ancestor_filter.push(filter);
    self.self_filter.push(BloomFilter::empty());
    self.node_type.push(node_type);
    self.depth.push(depth);
    self.flags.push(NodeFlags::default());
    self.text_offset.push(0);
    self.text_len.push(0);
    self.attr_offset.push(0);
    self.attr_count.push(0);
    id
  }

  /// Links `node` as the last child of `parent`, keeping the sibling links
  /// symmetric. The parent column records `NodeId::NONE` for top-level
  /// nodes even though they sit in the document node's child list.
  fn link_last_child(&mut self, parent: NodeId, node: NodeId) {
    self.parent[node.index()] = parent;
    let list_head = parent.index();
    let previous_last = self.last_child[list_head];
    if previous_last.is_none() {
      self.first_child[list_head] = node;
    } else {
      self.next_sibling[previous_last.index()] = node;
      self.prev_sibling[node.index()] = previous_last;
    }
    self.last_child[list_head] = node;
  }
}

/// Forward iterator over a node's children.
pub struct Children<'a> {
  doc: &'a Document,
  next: NodeId,
}

impl<'a> Iterator for Children<'a> {
  type Item = NodeId;

  fn next(&mut self) -> Option<NodeId> {
    if self.next.is_none() {
      return None;
    }
    let current = self.next;
    self.next = self.doc.next_sibling(current);
    Some(current)
  }
}

/// Bottom-up iterator over a node's strict ancestors.
pub struct Ancestors<'a> {
  doc: &'a Document,
  next: NodeId,
}

impl<'a> Iterator for Ancestors<'a> {
  type Item = NodeId;

  fn next(&mut self) -> Option<NodeId> {
    if self.next.is_none() {
      return None;
    }
    let current = self.next;
    self.next = self.doc.parent(current);
    Some(current)
  }
}
