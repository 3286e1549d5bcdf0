//! Flat embedding surface
//!
//! A C-style boundary for WebAssembly hosts and native linkers: integer
//! handles only, every pointer accompanied by an explicit length, and a
//! uniform return convention of non-negative on success and `-1` on error.
//! Hosts must keep byte buffers alive until the call returns.
//!
//! The surface wraps one process-global [`Session`] with an explicit
//! init/reset lifecycle. Native embedders that can hold a handle should use
//! [`Session`] directly; the global is for hosts that cannot.

use crate::dom::NodeId;
use crate::session::Session;
use std::sync::Mutex;

static SESSION: Mutex<Option<Session>> = Mutex::new(None);

fn with_session<F>(f: F) -> i64
where
  F: FnOnce(&mut Session) -> i64,
{
  match SESSION.lock() {
    Ok(mut guard) => match guard.as_mut() {
      Some(session) => f(session),
      None => -1,
    },
    Err(_) => -1,
  }
}

/// Reads a host buffer; `len == 0` is always an empty slice.
///
/// # Safety
/// `ptr` must point to `len` readable bytes when `len > 0`.
unsafe fn host_bytes<'a>(ptr: *const u8, len: usize) -> Option<&'a [u8]> {
  if len == 0 {
    Some(&[])
  } else if ptr.is_null() {
    None
  } else {
    Some(unsafe { std::slice::from_raw_parts(ptr, len) })
  }
}

/// Creates the global session. Idempotent: an existing session is replaced.
#[no_mangle]
pub extern "C" fn engine_init() -> i32 {
  match SESSION.lock() {
    Ok(mut guard) => {
      *guard = Some(Session::new());
      0
    }
    Err(_) => -1,
  }
}

/// Drops the global session and everything it owns.
#[no_mangle]
pub extern "C" fn engine_shutdown() -> i32 {
  match SESSION.lock() {
    Ok(mut guard) => {
      *guard = None;
      0
    }
    Err(_) => -1,
  }
}

/// Resets the tree within the session. Atoms and selectors survive.
#[no_mangle]
pub extern "C" fn engine_create_dom() -> i32 {
  with_session(|session| {
    session.reset_document();
    0
  }) as i32
}

/// Interns a byte string and returns its atom id.
///
/// # Safety
/// `ptr` must point to `len` readable bytes that outlive the call.
#[no_mangle]
pub unsafe extern "C" fn engine_intern_string(ptr: *const u8, len: usize) -> i64 {
  let Some(bytes) = (unsafe { host_bytes(ptr, len) }) else {
    return -1;
  };
  with_session(|session| match session.intern(bytes) {
    Ok(atom) => atom.0 as i64,
    Err(_) => -1,
  })
}

/// Appends an element node and returns its node id.
#[no_mangle]
pub extern "C" fn engine_add_node(tag_atom: u32, parent_id: u32) -> i64 {
  with_session(|session| {
    match session.create_element(crate::atom::AtomId(tag_atom), NodeId(parent_id)) {
      Ok(node) => node.0 as i64,
      Err(_) => -1,
    }
  })
}

/// Appends a text node and returns its node id.
///
/// # Safety
/// `ptr` must point to `len` readable bytes that outlive the call.
#[no_mangle]
pub unsafe extern "C" fn engine_create_text_node(parent_id: u32, ptr: *const u8, len: usize) -> i64 {
  let Some(bytes) = (unsafe { host_bytes(ptr, len) }) else {
    return -1;
  };
  with_session(|session| match session.create_text(NodeId(parent_id), bytes) {
    Ok(node) => node.0 as i64,
    Err(_) => -1,
  })
}

/// Sets a node's id attribute atom.
#[no_mangle]
pub extern "C" fn engine_set_id(node_id: u32, atom: u32) -> i32 {
  with_session(|session| {
    match session.set_id(NodeId(node_id), crate::atom::AtomId(atom)) {
      Ok(()) => 0,
      Err(_) => -1,
    }
  }) as i32
}

/// Replaces a node's class list with `count` atom ids read from `ptr`.
///
/// # Safety
/// `ptr` must point to `count` readable `u32` atom ids that outlive the
/// call.
#[no_mangle]
pub unsafe extern "C" fn engine_set_classes(node_id: u32, ptr: *const u32, count: usize) -> i32 {
  let classes: &[u32] = if count == 0 {
    &[]
  } else if ptr.is_null() {
    return -1;
  } else {
    unsafe { std::slice::from_raw_parts(ptr, count) }
  };
  let atoms: Vec<crate::atom::AtomId> = classes.iter().map(|&c| crate::atom::AtomId(c)).collect();
  with_session(|session| match session.set_classes(NodeId(node_id), &atoms) {
    Ok(()) => 0,
    Err(_) => -1,
  }) as i32
}

/// Appends an attribute to a node.
///
/// # Safety
/// `ptr` must point to `len` readable bytes that outlive the call.
#[no_mangle]
pub unsafe extern "C" fn engine_add_attribute(
  node_id: u32,
  name_atom: u32,
  ptr: *const u8,
  len: usize,
) -> i32 {
  let Some(bytes) = (unsafe { host_bytes(ptr, len) }) else {
    return -1;
  };
  with_session(|session| {
    match session.add_attribute(NodeId(node_id), crate::atom::AtomId(name_atom), bytes) {
      Ok(()) => 0,
      Err(_) => -1,
    }
  }) as i32
}

/// Compiles a selector and returns its session-scoped index.
///
/// # Safety
/// `ptr` must point to `len` readable bytes of UTF-8 selector text that
/// outlive the call.
#[no_mangle]
pub unsafe extern "C" fn engine_compile_selector(ptr: *const u8, len: usize) -> i64 {
  let Some(bytes) = (unsafe { host_bytes(ptr, len) }) else {
    return -1;
  };
  let Ok(source) = std::str::from_utf8(bytes) else {
    return -1;
  };
  with_session(|session| match session.compile(source) {
    Ok(index) => index as i64,
    Err(_) => -1,
  })
}

/// Matches a compiled selector against a node: 1 match, 0 no match, -1
/// error (unknown selector index or node id).
#[no_mangle]
pub extern "C" fn engine_match_selector(selector_index: u32, node_id: u32) -> i32 {
  with_session(|session| {
    if node_id as usize >= session.node_count() {
      return -1;
    }
    match session.matches(selector_index, NodeId(node_id)) {
      Some(true) => 1,
      Some(false) => 0,
      None => -1,
    }
  }) as i32
}

/// Number of nodes in the session's tree, including the document node.
#[no_mangle]
pub extern "C" fn engine_node_count() -> i64 {
  with_session(|session| session.node_count() as i64)
}

/// Number of selectors compiled into the session.
#[no_mangle]
pub extern "C" fn engine_selector_count() -> i64 {
  with_session(|session| session.selector_count() as i64)
}
