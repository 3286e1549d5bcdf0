//! Selector bytecode VM
//!
//! Executes compiled selector programs against a node of the flat tree.
//! Programs run right to left: the first compound in the bytecode tests the
//! start node, and each combinator walks `current` toward ancestors or
//! earlier siblings before the next compound runs.
//!
//! Matching is total. Malformed bytecode, unknown opcodes, wild jumps and
//! invalid start nodes all yield `false`; nothing panics and nothing
//! allocates during execution. The backtrack stack is a fixed array of
//! [`MAX_BACKTRACK_DEPTH`] frames on the call stack.

use crate::atom::AtomId;
use crate::atom::AtomTable;
use crate::css::opcode;
use crate::css::CompiledSelector;
use crate::css::Specificity;
use crate::dom::Document;
use crate::dom::NodeId;

/// Backtrack stack capacity.
///
/// A frame is live per unresolved descendant or general-sibling walk, so
/// this bounds the number of those combinators in one selector, not tree
/// depth. When the stack is full the push is refused and matching continues
/// without that fallback, which can under-match pathological selectors.
pub const MAX_BACKTRACK_DEPTH: usize = 32;

#[derive(Clone, Copy)]
enum FrameKind {
  /// Retry candidates are successive ancestors.
  Ancestor,
  /// Retry candidates are successive earlier element siblings.
  Sibling,
}

#[derive(Clone, Copy)]
struct Frame {
  /// Instruction to resume at, pointing just past the combinator.
  resume_ip: usize,
  /// Next candidate node to try, `NodeId::NONE` when exhausted.
  node: NodeId,
  kind: FrameKind,
}

const EMPTY_FRAME: Frame = Frame {
  resume_ip: 0,
  node: NodeId::NONE,
  kind: FrameKind::Ancestor,
};

/// Runs `program` with `start` as the candidate node.
pub fn execute(program: &[u8], atoms: &AtomTable, doc: &Document, start: NodeId) -> bool {
  if start.is_none() || !doc.contains(start) {
    return false;
  }

  let mut ip = 0usize;
  let mut current = start;
  let mut matched = true;
  let mut stack = [EMPTY_FRAME; MAX_BACKTRACK_DEPTH];
  let mut sp = 0usize;

  // On a dead end: resume the most recent walk combinator at its next
  // candidate, or give up.
  macro_rules! backtrack_or_fail {
    () => {
      match pop_frame(&mut stack, &mut sp, doc) {
        Some((resume_ip, node)) => {
          ip = resume_ip;
          current = node;
          matched = true;
          continue;
        }
        None => return false,
      }
    };
  }

  loop {
    let Some(&op) = program.get(ip) else {
      return false; // ran off the end without a terminal
    };
    ip += 1;

    match op {
      opcode::MATCH_TAG => {
        let Some(atom) = read_u32(program, &mut ip) else {
          return false;
        };
        if matched {
          matched = doc.tag(current) == AtomId(atom);
        }
      }
      opcode::MATCH_ID => {
        let Some(atom) = read_u32(program, &mut ip) else {
          return false;
        };
        if matched {
          matched = doc.id(current) == AtomId(atom);
        }
      }
      opcode::MATCH_CLASS => {
        let Some(atom) = read_u32(program, &mut ip) else {
          return false;
        };
        if matched {
          matched = doc.has_class(current, AtomId(atom));
        }
      }
      opcode::MATCH_ATTR => {
        let Some(name) = read_u32(program, &mut ip) else {
          return false;
        };
        if matched {
          matched = doc.attribute(current, AtomId(name)).is_some();
        }
      }
      opcode::MATCH_ATTR_EQ
      | opcode::MATCH_ATTR_WORD
      | opcode::MATCH_ATTR_PREFIX
      | opcode::MATCH_ATTR_SUFFIX
      | opcode::MATCH_ATTR_SUBSTR => {
        let Some(name) = read_u32(program, &mut ip) else {
          return false;
        };
        let Some(value) = read_u32(program, &mut ip) else {
          return false;
        };
        if matched {
          let needle = atoms.string_of(AtomId(value)).unwrap_or(b"");
          matched = match doc.attribute(current, AtomId(name)) {
            Some(actual) => attr_value_matches(op, actual, needle),
            None => false,
          };
        }
      }
      opcode::MATCH_ANY => {
        if matched {
          matched = doc.is_element(current);
        }
      }

      opcode::PSEUDO_FIRST_CHILD => {
        if matched {
          matched = doc.prev_sibling(current).is_none();
        }
      }
      opcode::PSEUDO_LAST_CHILD => {
        if matched {
          matched = doc.next_sibling(current).is_none();
        }
      }
      opcode::PSEUDO_ONLY_CHILD => {
        if matched {
          matched = doc.prev_sibling(current).is_none() && doc.next_sibling(current).is_none();
        }
      }
      opcode::PSEUDO_NTH_CHILD => {
        let Some((a, b)) = read_nth(program, &mut ip) else {
          return false;
        };
        if matched {
          matched = nth_matches(a, b, doc.element_index(current));
        }
      }
      opcode::PSEUDO_NTH_LAST_CHILD => {
        let Some((a, b)) = read_nth(program, &mut ip) else {
          return false;
        };
        if matched {
          matched = nth_matches(a, b, doc.element_index_from_end(current));
        }
      }
      opcode::PSEUDO_EMPTY => {
        if matched {
          matched = doc.first_child(current).is_none();
        }
      }
      opcode::PSEUDO_ROOT => {
        // Top-level nodes carry parent 0 and depth 0, so the parent test
        // alone identifies roots; a depth test would also catch their
        // children.
        if matched {
          matched = doc.parent(current).is_none();
        }
      }

      opcode::COMB_CHILD => {
        if !matched {
          backtrack_or_fail!();
        }
        let parent = doc.parent(current);
        if parent.is_none() {
          backtrack_or_fail!();
        }
        current = parent;
      }
      opcode::COMB_ADJACENT => {
        if !matched {
          backtrack_or_fail!();
        }
        let sibling = doc.prev_element_sibling(current);
        if sibling.is_none() {
          backtrack_or_fail!();
        }
        current = sibling;
      }
      opcode::COMB_DESCENDANT => {
        if !matched {
          backtrack_or_fail!();
        }
        let parent = doc.parent(current);
        if parent.is_none() {
          backtrack_or_fail!();
        }
        if sp < MAX_BACKTRACK_DEPTH {
          stack[sp] = Frame {
            resume_ip: ip,
            node: doc.parent(parent),
            kind: FrameKind::Ancestor,
          };
          sp += 1;
        }
        current = parent;
      }
      opcode::COMB_SIBLING => {
        if !matched {
          backtrack_or_fail!();
        }
        let sibling = doc.prev_element_sibling(current);
        if sibling.is_none() {
          backtrack_or_fail!();
        }
        if sp < MAX_BACKTRACK_DEPTH {
          stack[sp] = Frame {
            resume_ip: ip,
            node: doc.prev_element_sibling(sibling),
            kind: FrameKind::Sibling,
          };
          sp += 1;
        }
        current = sibling;
      }

      opcode::JUMP_FAIL => {
        let Some(target) = read_jump_target(program, &mut ip) else {
          return false;
        };
        if !matched {
          ip = target;
        }
      }
      opcode::JUMP => {
        let Some(target) = read_jump_target(program, &mut ip) else {
          return false;
        };
        ip = target;
      }
      opcode::JUMP_ALT => {
        let Some(target) = read_jump_target(program, &mut ip) else {
          return false;
        };
        if !matched {
          matched = true;
          ip = target;
        }
      }

      opcode::BLOOM_CHECK_CLASS | opcode::BLOOM_CHECK_ID | opcode::BLOOM_CHECK_TAG => {
        let Some(hash) = read_u32(program, &mut ip) else {
          return false;
        };
        // A miss in the ancestor filter means no ancestor can carry the
        // hash; the whole candidate subtree is rejected at once.
        if !doc.ancestor_filter(current).might_contain(hash) {
          return false;
        }
      }

      opcode::MATCH_SUCCESS => {
        if matched {
          return true;
        }
        backtrack_or_fail!();
      }
      opcode::MATCH_FAIL => return false,

      _ => return false, // outside the ISA
    }
  }
}

/// Convenience wrapper over [`execute`] for a compiled selector.
pub fn matches(selector: &CompiledSelector, atoms: &AtomTable, doc: &Document, node: NodeId) -> bool {
  execute(selector.bytecode(), atoms, doc, node)
}

/// Evaluates every selector against `node` and picks the winner.
///
/// The winner is the matching selector with the greatest specificity; among
/// equals the later one in the list wins, matching last-rule-wins cascade
/// order. `None` when nothing matches.
pub fn match_best(
  selectors: &[CompiledSelector],
  atoms: &AtomTable,
  doc: &Document,
  node: NodeId,
) -> Option<usize> {
  let mut best: Option<(Specificity, usize)> = None;
  for (index, selector) in selectors.iter().enumerate() {
    if execute(selector.bytecode(), atoms, doc, node) {
      let specificity = selector.specificity();
      if best.is_none_or(|(top, _)| specificity >= top) {
        best = Some((specificity, index));
      }
    }
  }
  best.map(|(_, index)| index)
}

fn pop_frame(stack: &mut [Frame], sp: &mut usize, doc: &Document) -> Option<(usize, NodeId)> {
  while *sp > 0 {
    *sp -= 1;
    let frame = stack[*sp];
    if frame.node.is_none() {
      continue; // exhausted walk, drop it
    }
    let next = match frame.kind {
      FrameKind::Ancestor => doc.parent(frame.node),
      FrameKind::Sibling => doc.prev_element_sibling(frame.node),
    };
    stack[*sp] = Frame { node: next, ..frame };
    *sp += 1;
    return Some((frame.resume_ip, frame.node));
  }
  None
}

fn read_u32(program: &[u8], ip: &mut usize) -> Option<u32> {
  let bytes = program.get(*ip..*ip + 4)?;
  *ip += 4;
  Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_i16(program: &[u8], ip: &mut usize) -> Option<i16> {
  let bytes = program.get(*ip..*ip + 2)?;
  *ip += 2;
  Some(i16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_nth(program: &[u8], ip: &mut usize) -> Option<(i16, i16)> {
  let a = read_i16(program, ip)?;
  let b = read_i16(program, ip)?;
  Some((a, b))
}

/// Resolves a relative jump. Offsets are relative to the instruction after
/// the operand; anything outside the program is malformed.
fn read_jump_target(program: &[u8], ip: &mut usize) -> Option<usize> {
  let offset = read_i16(program, ip)?;
  let target = (*ip as i64) + offset as i64;
  if target < 0 || target > program.len() as i64 {
    return None;
  }
  Some(target as usize)
}

/// Attribute value predicates. The word, prefix, suffix and substring forms
/// never match an empty needle; exact equality does.
fn attr_value_matches(op: u8, actual: &[u8], needle: &[u8]) -> bool {
  match op {
    opcode::MATCH_ATTR_EQ => actual == needle,
    opcode::MATCH_ATTR_WORD => {
      !needle.is_empty()
        && actual
          .split(|b: &u8| b.is_ascii_whitespace())
          .any(|word| word == needle)
    }
    opcode::MATCH_ATTR_PREFIX => !needle.is_empty() && actual.starts_with(needle),
    opcode::MATCH_ATTR_SUFFIX => !needle.is_empty() && actual.ends_with(needle),
    opcode::MATCH_ATTR_SUBSTR => {
      !needle.is_empty()
        && needle.len() <= actual.len()
        && actual.windows(needle.len()).any(|window| window == needle)
    }
    _ => false,
  }
}

/// `An+B` membership test against a 1-based index.
fn nth_matches(a: i16, b: i16, index: i32) -> bool {
  let a = a as i32;
  let b = b as i32;
  if a == 0 {
    return index == b;
  }
  let d = index - b;
  if a > 0 {
    d >= 0 && d % a == 0
  } else {
    d <= 0 && d % (-a) == 0
  }
}
