//! Selector compilation
//!
//! Compiles the textual selector dialect into bytecode for the matching VM.
//! The scanner works on raw bytes: identifiers are `[A-Za-z0-9_-]` with
//! bytes ≥ 0x80 accepted as identifier bytes, so UTF-8 names pass through
//! untouched. Unknown pseudo-classes are ignored for the match result and
//! reported on a diagnostics channel; stray bytes outside identifiers are
//! skipped.
//!
//! Use [`compile_selector`] when diagnostics are not needed and
//! [`compile_selector_with_diagnostics`] to capture them.
//! [`compile_selector_list`] splits on top-level commas and compiles each
//! selector into its own program.

use crate::atom::AtomId;
use crate::atom::AtomTable;
use crate::config;
use crate::css::opcode;
use crate::css::specificity::Specificity;
use crate::error::Error;
use crate::error::Result;
use crate::error::SelectorError;
use std::fmt;

/// An immutable compiled selector: bytecode plus packed specificity.
#[derive(Clone)]
pub struct CompiledSelector {
  bytecode: Box<[u8]>,
  specificity: Specificity,
  source: Option<Box<str>>,
}

impl CompiledSelector {
  pub fn bytecode(&self) -> &[u8] {
    &self.bytecode
  }

  pub fn specificity(&self) -> Specificity {
    self.specificity
  }

  /// Original selector text, kept for diagnostics.
  pub fn source(&self) -> Option<&str> {
    self.source.as_deref()
  }
}

impl fmt::Debug for CompiledSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
      f,
      "CompiledSelector {{ source: {:?}, specificity: {} }}",
      self.source.as_deref().unwrap_or(""),
      self.specificity
    )?;
    f.write_str(&opcode::disassemble(&self.bytecode))
  }
}

/// Non-fatal findings collected while compiling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileDiagnostic {
  /// A pseudo-class outside the supported set; it was ignored.
  UnknownPseudoClass { name: String, offset: usize },
  /// Syntax the compiler recognizes but does not support; it was skipped.
  UnsupportedSyntax { fragment: String, offset: usize },
}

impl fmt::Display for CompileDiagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CompileDiagnostic::UnknownPseudoClass { name, offset } => {
        write!(f, "unknown pseudo-class ':{}' at offset {}", name, offset)
      }
      CompileDiagnostic::UnsupportedSyntax { fragment, offset } => {
        write!(f, "unsupported syntax '{}' at offset {}", fragment, offset)
      }
    }
  }
}

/// Compile one selector, dropping any diagnostics.
pub fn compile_selector(atoms: &mut AtomTable, source: &str) -> Result<CompiledSelector> {
  compile_selector_with_diagnostics(atoms, source).map(|(selector, _)| selector)
}

/// Compile one selector and report what was ignored or skipped.
///
/// A top-level comma ends the selector; the remainder is reported as
/// unsupported (use [`compile_selector_list`] for selector lists).
pub fn compile_selector_with_diagnostics(
  atoms: &mut AtomTable,
  source: &str,
) -> Result<(CompiledSelector, Vec<CompileDiagnostic>)> {
  let mut scanner = Scanner::new(source.as_bytes());
  let mut diagnostics = Vec::new();
  let parsed = parse_one(&mut scanner, atoms, &mut diagnostics)?;
  if scanner.peek() == Some(b',') {
    diagnostics.push(CompileDiagnostic::UnsupportedSyntax {
      fragment: "selector list".to_string(),
      offset: scanner.pos,
    });
  }
  let selector = emit(atoms, parsed, source)?;
  Ok((selector, diagnostics))
}

/// Compile a comma-separated selector list into independent programs.
///
/// Empty list items are skipped; a list with no usable selector at all is an
/// error.
pub fn compile_selector_list(atoms: &mut AtomTable, source: &str) -> Result<Vec<CompiledSelector>> {
  let mut scanner = Scanner::new(source.as_bytes());
  let mut diagnostics = Vec::new();
  let mut selectors = Vec::new();
  loop {
    let start = scanner.pos;
    let parsed = parse_one(&mut scanner, atoms, &mut diagnostics)?;
    if !parsed.compounds.is_empty() {
      let text = std::str::from_utf8(&scanner.bytes[start..scanner.pos])
        .unwrap_or("")
        .trim();
      selectors.push(emit(atoms, parsed, text)?);
    }
    if scanner.peek() == Some(b',') {
      scanner.bump();
    } else {
      break;
    }
  }
  if selectors.is_empty() {
    return Err(Error::Selector(SelectorError::EmptySelector));
  }
  Ok(selectors)
}

// ============================================================================
// Parsed representation
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
  Descendant,
  Child,
  Adjacent,
  Sibling,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttrOp {
  Eq,
  Word,
  Prefix,
  Suffix,
  Substr,
}

#[derive(Clone, Copy, Debug)]
enum Simple {
  Universal,
  Tag(AtomId),
  Id(AtomId),
  Class(AtomId),
  AttrPresent(AtomId),
  Attr { op: AttrOp, name: AtomId, value: AtomId },
  FirstChild,
  LastChild,
  OnlyChild,
  Empty,
  Root,
  NthChild(i16, i16),
  NthLastChild(i16, i16),
}

#[derive(Debug, Default)]
struct Compound {
  simples: Vec<Simple>,
}

#[derive(Debug, Default)]
struct ParsedSelector {
  compounds: Vec<Compound>,
  /// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
  combinators: Vec<Combinator>,
}

// ============================================================================
// Scanner
// ============================================================================

struct Scanner<'a> {
  bytes: &'a [u8],
  pos: usize,
}

fn is_ident_start(b: u8) -> bool {
  b.is_ascii_alphabetic() || b == b'_' || b == b'-' || b >= 0x80
}

fn is_ident_byte(b: u8) -> bool {
  is_ident_start(b) || b.is_ascii_digit()
}

impl<'a> Scanner<'a> {
  fn new(bytes: &'a [u8]) -> Self {
    Scanner { bytes, pos: 0 }
  }

  fn peek(&self) -> Option<u8> {
    self.bytes.get(self.pos).copied()
  }

  fn bump(&mut self) -> Option<u8> {
    let b = self.peek()?;
    self.pos += 1;
    Some(b)
  }

  fn skip_whitespace(&mut self) {
    while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
      self.pos += 1;
    }
  }

  /// Consumes an identifier, or returns `None` without advancing.
  fn ident(&mut self) -> Option<&'a [u8]> {
    let start = self.pos;
    if !matches!(self.peek(), Some(b) if is_ident_start(b)) {
      return None;
    }
    while matches!(self.peek(), Some(b) if is_ident_byte(b)) {
      self.pos += 1;
    }
    Some(&self.bytes[start..self.pos])
  }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses one selector, stopping at a top-level comma or end of input.
fn parse_one(
  scanner: &mut Scanner<'_>,
  atoms: &mut AtomTable,
  diagnostics: &mut Vec<CompileDiagnostic>,
) -> Result<ParsedSelector> {
  let mut parsed = ParsedSelector::default();
  let mut pending: Option<Combinator> = None;

  loop {
    scanner.skip_whitespace();
    match scanner.peek() {
      None | Some(b',') => break,
      Some(b'>') => {
        scanner.bump();
        pending = Some(Combinator::Child);
      }
      Some(b'+') => {
        scanner.bump();
        pending = Some(Combinator::Adjacent);
      }
      Some(b'~') => {
        scanner.bump();
        pending = Some(Combinator::Sibling);
      }
      Some(b) if is_compound_start(b) => {
        let compound = parse_compound(scanner, atoms, diagnostics)?;
        if !parsed.compounds.is_empty() {
          parsed.combinators.push(pending.take().unwrap_or(Combinator::Descendant));
        } else {
          // A combinator with nothing on its left is dropped.
          pending = None;
        }
        parsed.compounds.push(compound);
      }
      Some(_) => {
        // Bytes outside identifiers and structure are skipped.
        scanner.bump();
      }
    }
  }
  Ok(parsed)
}

fn is_compound_start(b: u8) -> bool {
  b == b'*' || b == b'.' || b == b'#' || b == b':' || b == b'[' || is_ident_start(b)
}

fn parse_compound(
  scanner: &mut Scanner<'_>,
  atoms: &mut AtomTable,
  diagnostics: &mut Vec<CompileDiagnostic>,
) -> Result<Compound> {
  let mut compound = Compound::default();
  loop {
    match scanner.peek() {
      Some(b'*') => {
        scanner.bump();
        compound.simples.push(Simple::Universal);
      }
      Some(b'.') => {
        scanner.bump();
        match scanner.ident() {
          Some(name) => compound.simples.push(Simple::Class(atoms.intern(name)?)),
          None => continue, // stray '.', skipped
        }
      }
      Some(b'#') => {
        scanner.bump();
        match scanner.ident() {
          Some(name) => compound.simples.push(Simple::Id(atoms.intern(name)?)),
          None => continue,
        }
      }
      Some(b':') => {
        if let Some(simple) = parse_pseudo(scanner, diagnostics) {
          compound.simples.push(simple);
        }
      }
      Some(b'[') => {
        if let Some(simple) = parse_attribute(scanner, atoms, diagnostics)? {
          compound.simples.push(simple);
        }
      }
      Some(b) if is_ident_start(b) => {
        let name = scanner.ident().unwrap_or(b"");
        compound.simples.push(Simple::Tag(atoms.intern(name)?));
      }
      _ => break,
    }
  }
  Ok(compound)
}

/// Parses a pseudo-class. Unknown names are ignored with a diagnostic; the
/// `::` pseudo-element form is treated the same way.
fn parse_pseudo(scanner: &mut Scanner<'_>, diagnostics: &mut Vec<CompileDiagnostic>) -> Option<Simple> {
  let offset = scanner.pos;
  scanner.bump(); // ':'
  let element_form = scanner.peek() == Some(b':');
  if element_form {
    scanner.bump();
  }
  let Some(name) = scanner.ident() else {
    return None; // stray ':', skipped
  };
  let argument = if scanner.peek() == Some(b'(') {
    scanner.bump();
    let start = scanner.pos;
    while scanner.peek().is_some_and(|b| b != b')') {
      scanner.bump();
    }
    let arg = &scanner.bytes[start..scanner.pos];
    scanner.bump(); // ')'
    Some(arg)
  } else {
    None
  };

  let simple = if element_form {
    None
  } else {
    match (name, argument) {
      (b"first-child", None) => Some(Simple::FirstChild),
      (b"last-child", None) => Some(Simple::LastChild),
      (b"only-child", None) => Some(Simple::OnlyChild),
      (b"empty", None) => Some(Simple::Empty),
      (b"root", None) => Some(Simple::Root),
      (b"nth-child", Some(arg)) => parse_nth(arg).map(|(a, b)| Simple::NthChild(a, b)),
      (b"nth-last-child", Some(arg)) => parse_nth(arg).map(|(a, b)| Simple::NthLastChild(a, b)),
      _ => None,
    }
  };

  if simple.is_none() {
    diagnostics.push(CompileDiagnostic::UnknownPseudoClass {
      name: String::from_utf8_lossy(name).into_owned(),
      offset,
    });
  }
  simple
}

/// Parses an `An+B` argument: `odd`, `even`, a bare integer, or the full
/// form with optional signs and whitespace. Returns `None` on malformed
/// input.
fn parse_nth(arg: &[u8]) -> Option<(i16, i16)> {
  let mut s = Scanner::new(arg);
  s.skip_whitespace();

  match s.ident() {
    Some(b"odd") => {
      s.skip_whitespace();
      return s.peek().is_none().then_some((2, 1));
    }
    Some(b"even") => {
      s.skip_whitespace();
      return s.peek().is_none().then_some((2, 0));
    }
    Some(word) => {
      // Bare `n` / `-n` parse below; anything else is malformed.
      s.pos -= word.len();
    }
    None => {}
  }

  let lead_sign = parse_sign(&mut s);
  let lead_digits = parse_digits(&mut s);

  if matches!(s.peek(), Some(b'n') | Some(b'N')) {
    s.bump();
    let a = lead_sign * lead_digits.unwrap_or(1);
    s.skip_whitespace();
    let b = match s.peek() {
      None => 0,
      Some(b'+') | Some(b'-') => {
        let sign = parse_sign(&mut s);
        s.skip_whitespace();
        sign * parse_digits(&mut s)?
      }
      Some(_) => return None,
    };
    s.skip_whitespace();
    s.peek().is_none().then_some((clamp_i16(a), clamp_i16(b)))
  } else {
    // No `n`: a bare index, `0n+B`.
    let b = lead_sign * lead_digits?;
    s.skip_whitespace();
    s.peek().is_none().then_some((0, clamp_i16(b)))
  }
}

fn parse_sign(s: &mut Scanner<'_>) -> i32 {
  match s.peek() {
    Some(b'+') => {
      s.bump();
      1
    }
    Some(b'-') => {
      s.bump();
      -1
    }
    _ => 1,
  }
}

fn parse_digits(s: &mut Scanner<'_>) -> Option<i32> {
  let mut value: i32 = 0;
  let mut any = false;
  while let Some(b) = s.peek() {
    if !b.is_ascii_digit() {
      break;
    }
    s.bump();
    any = true;
    value = value.saturating_mul(10).saturating_add((b - b'0') as i32);
  }
  any.then_some(value)
}

fn clamp_i16(v: i32) -> i16 {
  v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Parses `[name]`, `[name=v]` and the `~=` / `^=` / `$=` / `*=` forms.
/// `|=` and malformed bodies are skipped with a diagnostic.
fn parse_attribute(
  scanner: &mut Scanner<'_>,
  atoms: &mut AtomTable,
  diagnostics: &mut Vec<CompileDiagnostic>,
) -> Result<Option<Simple>> {
  let offset = scanner.pos;
  scanner.bump(); // '['
  scanner.skip_whitespace();

  let Some(name) = scanner.ident() else {
    skip_to_bracket_end(scanner);
    diagnostics.push(CompileDiagnostic::UnsupportedSyntax {
      fragment: "attribute selector".to_string(),
      offset,
    });
    return Ok(None);
  };
  let name = atoms.intern(name)?;
  scanner.skip_whitespace();

  let op = match scanner.peek() {
    Some(b']') => {
      scanner.bump();
      return Ok(Some(Simple::AttrPresent(name)));
    }
    Some(b'=') => {
      scanner.bump();
      AttrOp::Eq
    }
    Some(b'~') | Some(b'^') | Some(b'$') | Some(b'*') => {
      let marker = scanner.bump();
      if scanner.peek() != Some(b'=') {
        skip_to_bracket_end(scanner);
        diagnostics.push(CompileDiagnostic::UnsupportedSyntax {
          fragment: "attribute selector".to_string(),
          offset,
        });
        return Ok(None);
      }
      scanner.bump();
      match marker {
        Some(b'~') => AttrOp::Word,
        Some(b'^') => AttrOp::Prefix,
        Some(b'$') => AttrOp::Suffix,
        _ => AttrOp::Substr,
      }
    }
    _ => {
      skip_to_bracket_end(scanner);
      diagnostics.push(CompileDiagnostic::UnsupportedSyntax {
        fragment: "attribute selector".to_string(),
        offset,
      });
      return Ok(None);
    }
  };

  scanner.skip_whitespace();
  let value = match scanner.peek() {
    Some(quote @ (b'"' | b'\'')) => {
      scanner.bump();
      let start = scanner.pos;
      while scanner.peek().is_some_and(|b| b != quote) {
        scanner.bump();
      }
      let bytes = &scanner.bytes[start..scanner.pos];
      scanner.bump(); // closing quote
      Some(bytes)
    }
    _ => scanner.ident(),
  };
  let Some(value) = value else {
    skip_to_bracket_end(scanner);
    diagnostics.push(CompileDiagnostic::UnsupportedSyntax {
      fragment: "attribute selector".to_string(),
      offset,
    });
    return Ok(None);
  };
  let value = atoms.intern(value)?;

  scanner.skip_whitespace();
  if scanner.peek() == Some(b']') {
    scanner.bump();
  }
  Ok(Some(Simple::Attr { op, name, value }))
}

fn skip_to_bracket_end(scanner: &mut Scanner<'_>) {
  while let Some(b) = scanner.bump() {
    if b == b']' {
      break;
    }
  }
}

// ============================================================================
// Emission
// ============================================================================

/// Lowers a parsed selector to bytecode, right to left.
fn emit(atoms: &AtomTable, parsed: ParsedSelector, source: &str) -> Result<CompiledSelector> {
  if parsed.compounds.is_empty() {
    return Err(Error::Selector(SelectorError::EmptySelector));
  }

  let mut code = Vec::new();
  let mut specificity = Specificity::ZERO;

  emit_bloom_hoist(atoms, &parsed, &mut code);

  for i in (0..parsed.compounds.len()).rev() {
    emit_compound(&parsed.compounds[i], &mut code, &mut specificity);
    if i > 0 {
      code.push(match parsed.combinators[i - 1] {
        Combinator::Descendant => opcode::COMB_DESCENDANT,
        Combinator::Child => opcode::COMB_CHILD,
        Combinator::Adjacent => opcode::COMB_ADJACENT,
        Combinator::Sibling => opcode::COMB_SIBLING,
      });
    }
  }
  code.push(opcode::MATCH_SUCCESS);

  Ok(CompiledSelector {
    bytecode: code.into_boxed_slice(),
    specificity,
    source: if source.is_empty() {
      None
    } else {
      Some(source.into())
    },
  })
}

/// Front-loads an ancestor-bloom probe for the leftmost compound.
///
/// Valid only when every compound to the left of the start node is a strict
/// ancestor, i.e. when all combinators walk upward and at least one of them
/// is a descendant walk worth short-circuiting. Sibling combinators break
/// that property, so their presence disables the hoist. The probe is a pure
/// reject-early hint and never changes the result.
fn emit_bloom_hoist(atoms: &AtomTable, parsed: &ParsedSelector, code: &mut Vec<u8>) {
  if !config::bloom_hoist_enabled() {
    return;
  }
  let ancestor_only = parsed
    .combinators
    .iter()
    .all(|c| matches!(c, Combinator::Descendant | Combinator::Child));
  let any_descendant = parsed.combinators.contains(&Combinator::Descendant);
  if !ancestor_only || !any_descendant {
    return;
  }

  // Most selective probe wins: id, then first class, then tag.
  let leftmost = &parsed.compounds[0];
  let mut id = None;
  let mut class = None;
  let mut tag = None;
  for simple in &leftmost.simples {
    match *simple {
      Simple::Id(atom) if id.is_none() => id = Some(atom),
      Simple::Class(atom) if class.is_none() => class = Some(atom),
      Simple::Tag(atom) if tag.is_none() => tag = Some(atom),
      _ => {}
    }
  }
  let check = id
    .map(|atom| (opcode::BLOOM_CHECK_ID, atom))
    .or(class.map(|atom| (opcode::BLOOM_CHECK_CLASS, atom)))
    .or(tag.map(|atom| (opcode::BLOOM_CHECK_TAG, atom)));
  if let Some((op, atom)) = check {
    if !atom.is_null() {
      code.push(op);
      code.extend_from_slice(&atoms.hash_of(atom).to_le_bytes());
    }
  }
}

fn emit_compound(compound: &Compound, code: &mut Vec<u8>, specificity: &mut Specificity) {
  if compound.simples.is_empty() {
    // Everything in the compound was ignored; it still has to be an element.
    code.push(opcode::MATCH_ANY);
    return;
  }
  for simple in &compound.simples {
    match *simple {
      Simple::Universal => code.push(opcode::MATCH_ANY),
      Simple::Tag(atom) => {
        code.push(opcode::MATCH_TAG);
        code.extend_from_slice(&atom.0.to_le_bytes());
        specificity.bump_tag();
      }
      Simple::Id(atom) => {
        code.push(opcode::MATCH_ID);
        code.extend_from_slice(&atom.0.to_le_bytes());
        specificity.bump_id();
      }
      Simple::Class(atom) => {
        code.push(opcode::MATCH_CLASS);
        code.extend_from_slice(&atom.0.to_le_bytes());
        specificity.bump_class_like();
      }
      Simple::AttrPresent(name) => {
        code.push(opcode::MATCH_ATTR);
        code.extend_from_slice(&name.0.to_le_bytes());
        specificity.bump_class_like();
      }
      Simple::Attr { op, name, value } => {
        code.push(match op {
          AttrOp::Eq => opcode::MATCH_ATTR_EQ,
          AttrOp::Word => opcode::MATCH_ATTR_WORD,
          AttrOp::Prefix => opcode::MATCH_ATTR_PREFIX,
          AttrOp::Suffix => opcode::MATCH_ATTR_SUFFIX,
          AttrOp::Substr => opcode::MATCH_ATTR_SUBSTR,
        });
        code.extend_from_slice(&name.0.to_le_bytes());
        code.extend_from_slice(&value.0.to_le_bytes());
        specificity.bump_class_like();
      }
      Simple::FirstChild => {
        code.push(opcode::PSEUDO_FIRST_CHILD);
        specificity.bump_class_like();
      }
      Simple::LastChild => {
        code.push(opcode::PSEUDO_LAST_CHILD);
        specificity.bump_class_like();
      }
      Simple::OnlyChild => {
        code.push(opcode::PSEUDO_ONLY_CHILD);
        specificity.bump_class_like();
      }
      Simple::Empty => {
        code.push(opcode::PSEUDO_EMPTY);
        specificity.bump_class_like();
      }
      Simple::Root => {
        code.push(opcode::PSEUDO_ROOT);
        specificity.bump_class_like();
      }
      Simple::NthChild(a, b) => {
        code.push(opcode::PSEUDO_NTH_CHILD);
        code.extend_from_slice(&a.to_le_bytes());
        code.extend_from_slice(&b.to_le_bytes());
        specificity.bump_class_like();
      }
      Simple::NthLastChild(a, b) => {
        code.push(opcode::PSEUDO_NTH_LAST_CHILD);
        code.extend_from_slice(&a.to_le_bytes());
        code.extend_from_slice(&b.to_le_bytes());
        specificity.bump_class_like();
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn compile(source: &str) -> CompiledSelector {
    let mut atoms = AtomTable::new();
    compile_selector(&mut atoms, source).unwrap()
  }

  fn compile_diag(source: &str) -> (CompiledSelector, Vec<CompileDiagnostic>) {
    let mut atoms = AtomTable::new();
    compile_selector_with_diagnostics(&mut atoms, source).unwrap()
  }

  fn ops(selector: &CompiledSelector) -> Vec<u8> {
    let mut out = Vec::new();
    let code = selector.bytecode();
    let mut ip = 0;
    while ip < code.len() {
      let op = code[ip];
      out.push(op);
      ip += 1 + opcode::operand_len(op).unwrap();
    }
    out
  }

  #[test]
  fn test_simple_tag() {
    let sel = compile("div");
    assert_eq!(ops(&sel), vec![opcode::MATCH_TAG, opcode::MATCH_SUCCESS]);
    assert_eq!(sel.specificity(), Specificity::from_parts(0, 0, 1));
    assert_eq!(sel.source(), Some("div"));
  }

  #[test]
  fn test_compound_specificity() {
    let sel = compile("div.class#id");
    assert_eq!(sel.specificity(), Specificity::from_parts(1, 1, 1));

    let sel = compile(".a.b.c");
    assert_eq!(sel.specificity(), Specificity::from_parts(0, 3, 0));

    let sel = compile("*");
    assert_eq!(sel.specificity(), Specificity::ZERO);
  }

  #[test]
  fn test_combinators() {
    let sel = compile("div > span");
    assert_eq!(
      ops(&sel),
      vec![opcode::MATCH_TAG, opcode::COMB_CHILD, opcode::MATCH_TAG, opcode::MATCH_SUCCESS]
    );

    let sel = compile("a + b");
    assert!(ops(&sel).contains(&opcode::COMB_ADJACENT));
    let sel = compile("a ~ b");
    assert!(ops(&sel).contains(&opcode::COMB_SIBLING));
  }

  #[test]
  fn test_descendant_gets_bloom_hoist() {
    let sel = compile(".container span");
    assert_eq!(
      ops(&sel),
      vec![
        opcode::BLOOM_CHECK_CLASS,
        opcode::MATCH_TAG,
        opcode::COMB_DESCENDANT,
        opcode::MATCH_CLASS,
        opcode::MATCH_SUCCESS,
      ]
    );
  }

  #[test]
  fn test_id_preferred_for_hoist() {
    let sel = compile("div#main.wrap p");
    assert_eq!(ops(&sel)[0], opcode::BLOOM_CHECK_ID);
  }

  #[test]
  fn test_sibling_combinator_disables_hoist() {
    let sel = compile(".a ~ .b .c");
    assert_ne!(ops(&sel)[0], opcode::BLOOM_CHECK_CLASS);
  }

  #[test]
  fn test_child_only_chain_has_no_hoist() {
    let sel = compile(".a > .b");
    assert_eq!(ops(&sel)[0], opcode::MATCH_CLASS);
  }

  #[test]
  fn test_pseudo_classes() {
    let sel = compile("li:first-child");
    assert!(ops(&sel).contains(&opcode::PSEUDO_FIRST_CHILD));
    assert_eq!(sel.specificity(), Specificity::from_parts(0, 1, 1));

    let sel = compile(":root");
    assert!(ops(&sel).contains(&opcode::PSEUDO_ROOT));
    let sel = compile("p:empty");
    assert!(ops(&sel).contains(&opcode::PSEUDO_EMPTY));
    let sel = compile("li:only-child");
    assert!(ops(&sel).contains(&opcode::PSEUDO_ONLY_CHILD));
  }

  #[test]
  fn test_nth_child_forms() {
    fn nth_operands(source: &str) -> (i16, i16) {
      let sel = compile(source);
      let code = sel.bytecode();
      let at = code
        .iter()
        .position(|&b| b == opcode::PSEUDO_NTH_CHILD || b == opcode::PSEUDO_NTH_LAST_CHILD)
        .unwrap();
      (
        i16::from_le_bytes([code[at + 1], code[at + 2]]),
        i16::from_le_bytes([code[at + 3], code[at + 4]]),
      )
    }

    assert_eq!(nth_operands("li:nth-child(2n)"), (2, 0));
    assert_eq!(nth_operands("li:nth-child(2n+1)"), (2, 1));
    assert_eq!(nth_operands("li:nth-child(odd)"), (2, 1));
    assert_eq!(nth_operands("li:nth-child(even)"), (2, 0));
    assert_eq!(nth_operands("li:nth-child(3)"), (0, 3));
    assert_eq!(nth_operands("li:nth-child(-n+3)"), (-1, 3));
    assert_eq!(nth_operands("li:nth-child(n)"), (1, 0));
    assert_eq!(nth_operands("li:nth-child( 2n + 1 )"), (2, 1));
    assert_eq!(nth_operands("li:nth-last-child(2n)"), (2, 0));
  }

  #[test]
  fn test_malformed_nth_is_ignored() {
    let (sel, diags) = compile_diag("li:nth-child(frog)");
    assert_eq!(ops(&sel), vec![opcode::MATCH_TAG, opcode::MATCH_SUCCESS]);
    assert_eq!(diags.len(), 1);
  }

  #[test]
  fn test_unknown_pseudo_ignored_with_diagnostic() {
    let (sel, diags) = compile_diag("a:hover");
    assert_eq!(ops(&sel), vec![opcode::MATCH_TAG, opcode::MATCH_SUCCESS]);
    assert_eq!(
      diags,
      vec![CompileDiagnostic::UnknownPseudoClass {
        name: "hover".to_string(),
        offset: 1,
      }]
    );
    // Specificity ignores the unknown pseudo too.
    assert_eq!(sel.specificity(), Specificity::from_parts(0, 0, 1));
  }

  #[test]
  fn test_pseudo_element_ignored() {
    let (sel, diags) = compile_diag("p::before");
    assert_eq!(ops(&sel), vec![opcode::MATCH_TAG, opcode::MATCH_SUCCESS]);
    assert_eq!(diags.len(), 1);
  }

  #[test]
  fn test_only_ignored_pseudo_still_matches_elements() {
    let (sel, _) = compile_diag("div :hover");
    assert_eq!(
      ops(&sel),
      vec![
        opcode::BLOOM_CHECK_TAG,
        opcode::MATCH_ANY,
        opcode::COMB_DESCENDANT,
        opcode::MATCH_TAG,
        opcode::MATCH_SUCCESS,
      ]
    );
  }

  #[test]
  fn test_attribute_selectors() {
    let sel = compile("[href]");
    assert_eq!(ops(&sel), vec![opcode::MATCH_ATTR, opcode::MATCH_SUCCESS]);
    assert_eq!(sel.specificity(), Specificity::from_parts(0, 1, 0));

    let sel = compile("input[type=text]");
    assert_eq!(
      ops(&sel),
      vec![opcode::MATCH_TAG, opcode::MATCH_ATTR_EQ, opcode::MATCH_SUCCESS]
    );

    assert!(ops(&compile("[a~=b]")).contains(&opcode::MATCH_ATTR_WORD));
    assert!(ops(&compile("[a^=b]")).contains(&opcode::MATCH_ATTR_PREFIX));
    assert!(ops(&compile("[a$=b]")).contains(&opcode::MATCH_ATTR_SUFFIX));
    assert!(ops(&compile("[a*=b]")).contains(&opcode::MATCH_ATTR_SUBSTR));
    assert!(ops(&compile("[a=\"quoted value\"]")).contains(&opcode::MATCH_ATTR_EQ));
  }

  #[test]
  fn test_dash_match_unsupported() {
    let (sel, diags) = compile_diag("a[lang|=en]");
    assert_eq!(ops(&sel), vec![opcode::MATCH_TAG, opcode::MATCH_SUCCESS]);
    assert!(matches!(diags[0], CompileDiagnostic::UnsupportedSyntax { .. }));
  }

  #[test]
  fn test_empty_selector_is_error() {
    let mut atoms = AtomTable::new();
    assert!(matches!(
      compile_selector(&mut atoms, ""),
      Err(Error::Selector(SelectorError::EmptySelector))
    ));
    assert!(compile_selector(&mut atoms, "   ").is_err());
  }

  #[test]
  fn test_whitespace_around_combinators() {
    let a = compile("div>span");
    let b = compile("div  >  span");
    assert_eq!(a.bytecode(), b.bytecode());
  }

  #[test]
  fn test_stray_bytes_skipped() {
    let sel = compile("div )( span");
    // Identical to "div span", bloom hoist included.
    assert_eq!(sel.bytecode(), compile("div span").bytecode());
    assert_eq!(
      ops(&sel),
      vec![
        opcode::BLOOM_CHECK_TAG,
        opcode::MATCH_TAG,
        opcode::COMB_DESCENDANT,
        opcode::MATCH_TAG,
        opcode::MATCH_SUCCESS,
      ]
    );
  }

  #[test]
  fn test_utf8_identifiers() {
    let mut atoms = AtomTable::new();
    let sel = compile_selector(&mut atoms, ".déjà-vu").unwrap();
    assert_eq!(ops(&sel), vec![opcode::MATCH_CLASS, opcode::MATCH_SUCCESS]);
    // The class atom is the raw UTF-8 bytes.
    assert!(atoms.len() >= 1);
  }

  #[test]
  fn test_selector_list() {
    let mut atoms = AtomTable::new();
    let list = compile_selector_list(&mut atoms, "div, .item, #main p").unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[0].source(), Some("div"));
    assert_eq!(list[1].source(), Some(".item"));
    assert_eq!(list[2].source(), Some("#main p"));
    assert_eq!(list[2].specificity(), Specificity::from_parts(1, 0, 1));
  }

  #[test]
  fn test_selector_list_skips_empty_items() {
    let mut atoms = AtomTable::new();
    let list = compile_selector_list(&mut atoms, "div, , span").unwrap();
    assert_eq!(list.len(), 2);
    assert!(compile_selector_list(&mut atoms, " , ").is_err());
  }

  #[test]
  fn test_comma_in_single_compile_reports_diagnostic() {
    let (sel, diags) = compile_diag("div, span");
    assert_eq!(ops(&sel), vec![opcode::MATCH_TAG, opcode::MATCH_SUCCESS]);
    assert!(matches!(diags[0], CompileDiagnostic::UnsupportedSyntax { .. }));
  }

  #[test]
  fn test_every_program_ends_with_success() {
    for source in ["div", "* > *", ".a .b .c", "li:nth-child(2n)", "[x=y]"] {
      let sel = compile(source);
      assert_eq!(*sel.bytecode().last().unwrap(), opcode::MATCH_SUCCESS);
    }
  }
}
