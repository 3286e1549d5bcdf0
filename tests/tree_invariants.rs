//! Whole-tree invariant checks over a generated document.

use fastselect::atom::fnv1a;
use fastselect::{AtomId, BloomFilter, NodeId, Session};

/// Builds a deterministic branching tree and returns every node.
fn build_tree(session: &mut Session, depth: usize, branching: usize) -> Vec<NodeId> {
  let tags: Vec<AtomId> = ["section", "div", "article", "nav"]
    .iter()
    .map(|t| session.intern(t.as_bytes()).unwrap())
    .collect();
  let mut nodes = Vec::new();
  let mut frontier = vec![NodeId::NONE];
  for level in 0..depth {
    let mut next = Vec::new();
    for &parent in &frontier {
      for branch in 0..branching {
        let tag = tags[(level + branch) % tags.len()];
        let node = session.create_element(tag, parent).unwrap();
        let class = session
          .intern(format!("c{}", (level * 7 + branch) % 5).as_bytes())
          .unwrap();
        session.set_classes(node, &[class]).unwrap();
        if branch == 0 {
          let id = session.intern(format!("n{}x{}", level, parent.0).as_bytes()).unwrap();
          session.set_id(node, id).unwrap();
        }
        nodes.push(node);
        next.push(node);
      }
    }
    frontier = next;
  }
  nodes
}

#[test]
fn sibling_links_are_symmetric_everywhere() {
  let mut session = Session::new();
  let nodes = build_tree(&mut session, 4, 3);
  let doc = session.document();

  for &node in &nodes {
    let next = doc.next_sibling(node);
    if !next.is_none() {
      assert_eq!(doc.prev_sibling(next), node);
    }
    let prev = doc.prev_sibling(node);
    if !prev.is_none() {
      assert_eq!(doc.next_sibling(prev), node);
    }
    // The first child of the node's list terminates the chain. The parent
    // column reads 0 for top-level nodes, which is also the document's own
    // index, so the lookup covers both cases.
    let first = doc.first_child(doc.parent(node));
    assert!(doc.prev_sibling(first).is_none());
  }
}

#[test]
fn depth_increments_from_parent() {
  let mut session = Session::new();
  let nodes = build_tree(&mut session, 5, 2);
  let doc = session.document();

  for &node in &nodes {
    let parent = doc.parent(node);
    if parent.is_none() {
      assert_eq!(doc.depth(node), 0);
    } else {
      assert_eq!(doc.depth(node), doc.depth(parent) + 1);
    }
  }
}

#[test]
fn ancestor_filter_covers_all_strict_ancestors() {
  let mut session = Session::new();
  let nodes = build_tree(&mut session, 4, 3);
  let doc = session.document();
  let atoms = session.atoms();

  for &node in &nodes {
    // Recompute the expected union the slow way: every strict ancestor's
    // tag, id and classes.
    let mut expected = BloomFilter::empty();
    for ancestor in doc.ancestors(node) {
      expected.add(atoms.hash_of(doc.tag(ancestor)));
      let id = doc.id(ancestor);
      if !id.is_null() {
        expected.add(atoms.hash_of(id));
      }
      for &class in doc.classes(ancestor) {
        expected.add(atoms.hash_of(class));
      }
    }
    let actual = doc.ancestor_filter(node);
    // Every required bit is present.
    assert_eq!(actual | expected, actual);
  }
}

#[test]
fn ancestor_iteration_matches_parent_chain() {
  let mut session = Session::new();
  let nodes = build_tree(&mut session, 5, 2);
  let doc = session.document();

  let leaf = *nodes.last().unwrap();
  let ancestors: Vec<NodeId> = doc.ancestors(leaf).collect();
  assert_eq!(ancestors.len(), doc.depth(leaf) as usize);
  let mut expected = doc.parent(leaf);
  for &ancestor in &ancestors {
    assert_eq!(ancestor, expected);
    expected = doc.parent(expected);
  }
}

#[test]
fn children_iteration_is_ordered_and_complete() {
  let mut session = Session::new();
  build_tree(&mut session, 3, 4);
  let doc = session.document();

  for parent in [NodeId::NONE, doc.first_child(NodeId::NONE)] {
    let children: Vec<NodeId> = doc.children(parent).collect();
    for window in children.windows(2) {
      assert!(window[0].0 < window[1].0, "children append in creation order");
      assert_eq!(doc.next_sibling(window[0]), window[1]);
    }
  }
}

#[test]
fn bloom_probe_agrees_with_exact_walk() {
  let mut session = Session::new();
  let nodes = build_tree(&mut session, 4, 3);
  let doc = session.document();
  let atoms = session.atoms();

  // If some strict ancestor carries a class, the probe must say maybe.
  for &node in &nodes {
    for ancestor in doc.ancestors(node) {
      for &class in doc.classes(ancestor) {
        let hash = atoms.hash_of(class);
        assert!(doc.ancestor_filter(node).might_contain(hash));
      }
    }
  }
}

#[test]
fn estimated_false_positive_rate_holds_for_small_filters() {
  let mut session = Session::new();
  let div = session.intern(b"div").unwrap();
  let container = session.intern(b"container").unwrap();

  let parent = session.create_element(div, NodeId::NONE).unwrap();
  session.set_classes(parent, &[container]).unwrap();
  let child = session.create_element(div, parent).unwrap();

  let filter = session.document().ancestor_filter(child);
  assert!(filter.might_contain(fnv1a(b"container")));
  assert!(filter.might_contain(fnv1a(b"div")));

  // Two entries give an estimated rate well under 2%; measure it.
  let mut hits = 0;
  let probes = 20_000;
  for i in 0..probes {
    if filter.might_contain(fnv1a(format!("never-used-{}", i).as_bytes())) {
      hits += 1;
    }
  }
  assert!((hits as f64 / probes as f64) < 0.02);
  assert!(BloomFilter::estimated_fp_rate(2) < 0.02);
}
