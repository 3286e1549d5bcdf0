#![no_main]

use arbitrary::Arbitrary;
use fastselect::{NodeId, Session};
use libfuzzer_sys::fuzz_target;

const MAX_CHILDREN: usize = 8;
const MAX_DEPTH: usize = 5;
const MAX_CLASSES: usize = 6;
const MAX_SELECTOR_LEN: usize = 4 * 1024;
const MAX_TEXT: usize = 256;

#[derive(Arbitrary, Debug)]
struct RandomElement {
  tag: String,
  id: Option<String>,
  classes: Vec<String>,
  children: Vec<RandomNode>,
}

#[derive(Arbitrary, Debug)]
enum RandomNode {
  Element(RandomElement),
  Text(String),
}

#[derive(Arbitrary, Debug)]
struct MatchCase {
  selector_bytes: Vec<u8>,
  dom: RandomNode,
}

fn sanitize_ident(s: &str, fallback: &str) -> String {
  let filtered: String = s
    .chars()
    .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    .take(24)
    .collect();
  if filtered.is_empty() {
    fallback.to_string()
  } else {
    filtered
  }
}

fn build(session: &mut Session, node: &RandomNode, parent: NodeId, depth: usize) {
  match node {
    RandomNode::Text(content) => {
      let text: String = content.chars().take(MAX_TEXT).collect();
      let _ = session.create_text(parent, text.as_bytes());
    }
    RandomNode::Element(el) => {
      let tag = sanitize_ident(&el.tag, "div");
      let Ok(tag_atom) = session.intern(tag.as_bytes()) else {
        return;
      };
      let Ok(id) = session.create_element(tag_atom, parent) else {
        return;
      };

      if let Some(id_value) = &el.id {
        let name = sanitize_ident(id_value, "seed-id");
        if let Ok(atom) = session.intern(name.as_bytes()) {
          let _ = session.set_id(id, atom);
        }
      }

      let classes: Vec<_> = el
        .classes
        .iter()
        .take(MAX_CLASSES)
        .filter_map(|c| {
          let name = sanitize_ident(c, "");
          if name.is_empty() {
            None
          } else {
            session.intern(name.as_bytes()).ok()
          }
        })
        .collect();
      let _ = session.set_classes(id, &classes);

      let child_limit = if depth >= MAX_DEPTH { 0 } else { MAX_CHILDREN };
      for child in el.children.iter().take(child_limit) {
        build(session, child, id, depth + 1);
      }
    }
  }
}

fuzz_target!(|case: MatchCase| {
  let truncated = if case.selector_bytes.len() > MAX_SELECTOR_LEN {
    &case.selector_bytes[..MAX_SELECTOR_LEN]
  } else {
    &case.selector_bytes[..]
  };
  let selector_text = String::from_utf8_lossy(truncated).into_owned();

  let mut session = Session::new();
  build(&mut session, &case.dom, NodeId::NONE, 0);

  // Compilation may reject the input, but it must never panic, and any
  // program it produces must match totally against every node.
  if let Ok(index) = session.compile(&selector_text) {
    for node in 0..session.node_count() as u32 {
      let _ = session.matches(index, NodeId(node));
    }
  }
});
