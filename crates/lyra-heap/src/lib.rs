#![cfg_attr(test, allow(clippy::redundant_clone, clippy::clone_on_copy))]

use itertools::Itertools;
use std::{collections::HashMap, hash::Hash};

#[derive(Clone, Copy)]
struct InlineRepr {
  size: u8,
  storage: [u8; 7],
}

/// Strings of at most 7 bytes live inside the pointer itself. Longer strings are stored in the
/// heap and the pointer holds `HEAP_TAG | id`. The tag byte can never appear in valid UTF-8, so the
/// two forms are distinguishable by the most significant byte.
#[derive(Clone, Copy)]
union PStrRepr {
  inline: InlineRepr,
  heap_id: u64,
}

const HEAP_TAG: u64 = 255_u64 << 56;

impl PStrRepr {
  fn as_inline_str(&self) -> Result<&str, u32> {
    unsafe {
      if (self.heap_id >> 56) == 255 {
        Err((self.heap_id & (u32::MAX as u64)) as u32)
      } else {
        Ok(std::str::from_utf8_unchecked(&self.inline.storage[..(self.inline.size as usize)]))
      }
    }
  }

  fn inline_opt(s: &str) -> Option<PStrRepr> {
    let bytes = s.as_bytes();
    if bytes.len() > 7 {
      return None;
    }
    let mut storage = [0; 7];
    storage[..bytes.len()].copy_from_slice(bytes);
    Some(PStrRepr { inline: InlineRepr { size: bytes.len() as u8, storage } })
  }

  const fn from_id(id: u32) -> PStrRepr {
    PStrRepr { heap_id: (id as u64) | HEAP_TAG }
  }
}

impl std::fmt::Debug for PStrRepr {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.as_inline_str() {
      Ok(s) => f.debug_tuple("Inline").field(&s).finish(),
      Err(id) => f.debug_tuple("Heap").field(&id).finish(),
    }
  }
}

impl Eq for PStrRepr {}

impl PartialEq for PStrRepr {
  fn eq(&self, other: &Self) -> bool {
    unsafe { self.heap_id == other.heap_id }
  }
}

impl Hash for PStrRepr {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    unsafe { self.heap_id.hash(state) }
  }
}

impl Ord for PStrRepr {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    match (self.as_inline_str(), other.as_inline_str()) {
      (Ok(s1), Ok(s2)) => s1.cmp(s2),
      (Err(id1), Err(id2)) => id1.cmp(&id2),
      (Ok(_), Err(_)) => std::cmp::Ordering::Less,
      (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
    }
  }
}

impl PartialOrd for PStrRepr {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

/// An interned string pointer that is free to be copied around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PStr(PStrRepr);

const fn inline_const(bytes: &[u8]) -> PStr {
  assert!(bytes.len() <= 7);
  let mut storage = [0; 7];
  let mut i = 0;
  while i < bytes.len() {
    storage[i] = bytes[i];
    i += 1;
  }
  PStr(PStrRepr { inline: InlineRepr { size: bytes.len() as u8, storage } })
}

/// Long names the checker needs as constants. `Heap::new` allocates them in exactly this order, so
/// the n-th entry always receives heap id n.
const PREALLOCATED_LONG_STRINGS: [&str; 6] =
  ["findIndex", "includes", "toUpperCase", "toLowerCase", "children", "InternalError"];

impl PStr {
  pub fn as_str<'a>(&'a self, heap: &'a Heap) -> &'a str {
    self.0.as_inline_str().unwrap_or_else(|id| heap.str_pointer_table[id as usize])
  }

  pub const EMPTY: PStr = inline_const(b"");
  pub const UNDERSCORE: PStr = inline_const(b"_");
  pub const DUMMY_MODULE: PStr = inline_const(b"DUMMY");

  pub const OPTION: PStr = inline_const(b"Option");
  pub const SOME: PStr = inline_const(b"Some");
  pub const NONE: PStr = inline_const(b"None");
  pub const RESULT: PStr = inline_const(b"Result");
  pub const OK: PStr = inline_const(b"Ok");
  pub const ERR: PStr = inline_const(b"Err");
  pub const ARRAY: PStr = inline_const(b"Array");
  pub const ELEMENT: PStr = inline_const(b"Element");

  pub const STRING: PStr = inline_const(b"string");
  pub const NUMBER: PStr = inline_const(b"number");
  pub const BOOLEAN: PStr = inline_const(b"boolean");
  pub const UNIT: PStr = inline_const(b"unit");
  pub const VOID: PStr = inline_const(b"void");
  pub const UNKNOWN: PStr = inline_const(b"unknown");
  pub const TRUE: PStr = inline_const(b"true");
  pub const FALSE: PStr = inline_const(b"false");

  pub const LENGTH: PStr = inline_const(b"length");
  pub const MAP: PStr = inline_const(b"map");
  pub const FILTER: PStr = inline_const(b"filter");
  pub const FIND: PStr = inline_const(b"find");
  pub const JOIN: PStr = inline_const(b"join");
  pub const CONCAT: PStr = inline_const(b"concat");
  pub const TRIM: PStr = inline_const(b"trim");
  pub const FIND_INDEX: PStr = PStr(PStrRepr::from_id(0));
  pub const INCLUDES: PStr = PStr(PStrRepr::from_id(1));
  pub const TO_UPPER_CASE: PStr = PStr(PStrRepr::from_id(2));
  pub const TO_LOWER_CASE: PStr = PStr(PStrRepr::from_id(3));
  pub const CHILDREN: PStr = PStr(PStrRepr::from_id(4));
  pub const INTERNAL_ERROR: PStr = PStr(PStrRepr::from_id(5));

  pub const UPPER_A: PStr = inline_const(b"A");
  pub const UPPER_B: PStr = inline_const(b"B");
  pub const UPPER_E: PStr = inline_const(b"E");
  pub const UPPER_T: PStr = inline_const(b"T");
  pub const UPPER_U: PStr = inline_const(b"U");

  pub const LOWER_A: PStr = inline_const(b"a");
  pub const LOWER_B: PStr = inline_const(b"b");
  pub const LOWER_C: PStr = inline_const(b"c");
  pub const LOWER_F: PStr = inline_const(b"f");
  pub const LOWER_X: PStr = inline_const(b"x");
  pub const LOWER_Y: PStr = inline_const(b"y");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleReference(usize);

impl ModuleReference {
  pub const ROOT: ModuleReference = ModuleReference(0);
  pub const DUMMY: ModuleReference = ModuleReference(1);

  pub fn get_parts<'a>(&self, heap: &'a Heap) -> &'a [PStr] {
    &heap.module_reference_pointer_table[self.0]
  }

  pub fn pretty_print(&self, heap: &Heap) -> String {
    self.get_parts(heap).iter().map(|p| p.as_str(heap)).join(".")
  }

  pub fn to_filename(&self, heap: &Heap) -> String {
    self.get_parts(heap).iter().map(|p| p.as_str(heap)).join("/") + ".ly"
  }
}

/// Every string allocated in the heap stays alive until the heap is dropped. Compilation runs are
/// short lived, so there is no collection.
pub struct Heap {
  str_pointer_table: Vec<&'static str>,
  module_reference_pointer_table: Vec<Vec<PStr>>,
  interned_string: HashMap<&'static str, u32>,
  interned_module_reference: HashMap<Vec<PStr>, ModuleReference>,
}

impl Heap {
  pub fn new() -> Heap {
    let mut heap = Heap {
      str_pointer_table: vec![],
      module_reference_pointer_table: vec![],
      interned_string: HashMap::new(),
      interned_module_reference: HashMap::new(),
    };
    for s in PREALLOCATED_LONG_STRINGS {
      heap.alloc_str_permanent(s);
    }
    debug_assert_eq!("findIndex", PStr::FIND_INDEX.as_str(&heap));
    debug_assert_eq!("InternalError", PStr::INTERNAL_ERROR.as_str(&heap));
    heap.alloc_module_reference(vec![]);
    let allocated_dummy = heap.alloc_module_reference(vec![PStr::DUMMY_MODULE]);
    debug_assert!(ModuleReference::DUMMY == allocated_dummy);
    heap
  }

  pub fn get_allocated_str_opt(&self, s: &str) -> Option<PStr> {
    if let Some(repr) = PStrRepr::inline_opt(s) {
      return Some(PStr(repr));
    }
    self.interned_string.get(s).map(|id| PStr(PStrRepr::from_id(*id)))
  }

  fn alloc_static(&mut self, s: &'static str) -> PStr {
    if let Some(p) = self.get_allocated_str_opt(s) {
      return p;
    }
    let id = self.str_pointer_table.len() as u32;
    self.str_pointer_table.push(s);
    self.interned_string.insert(s, id);
    PStr(PStrRepr::from_id(id))
  }

  pub fn alloc_str_permanent(&mut self, s: &'static str) -> PStr {
    self.alloc_static(s)
  }

  pub fn alloc_str_for_test(&mut self, s: &'static str) -> PStr {
    self.alloc_static(s)
  }

  pub fn alloc_string(&mut self, string: String) -> PStr {
    if let Some(p) = self.get_allocated_str_opt(&string) {
      return p;
    }
    self.alloc_static(Box::leak(string.into_boxed_str()))
  }

  pub fn alloc_module_reference(&mut self, parts: Vec<PStr>) -> ModuleReference {
    if let Some(mod_ref) = self.interned_module_reference.get(&parts) {
      return *mod_ref;
    }
    let mod_ref = ModuleReference(self.module_reference_pointer_table.len());
    self.interned_module_reference.insert(parts.clone(), mod_ref);
    self.module_reference_pointer_table.push(parts);
    mod_ref
  }

  pub fn alloc_module_reference_from_string_vec(&mut self, parts: Vec<String>) -> ModuleReference {
    let parts = parts.into_iter().map(|p| self.alloc_string(p)).collect_vec();
    self.alloc_module_reference(parts)
  }

  /// Returns the statistics of heap to help debugging
  pub fn stat(&self) -> String {
    format!(
      "Strings: {}. Module references: {}",
      self.str_pointer_table.len(),
      self.module_reference_pointer_table.len()
    )
  }
}

impl Default for Heap {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::{Heap, ModuleReference, PStr, PStrRepr};
  use pretty_assertions::assert_eq;
  use std::cmp::Ordering;

  #[test]
  fn boilterplate() {
    assert!(!format!("{:?}", PStr::LOWER_A.clone()).is_empty());
    assert!(!format!("{:?}", PStr::FIND_INDEX).is_empty());
    assert!(!format!("{:?}", ModuleReference::ROOT.clone()).is_empty());
    assert!(PStrRepr::inline_opt("too long for inline").is_none());
  }

  #[test]
  fn preallocated_constants_tests() {
    let heap = Heap::new();
    assert_eq!("findIndex", PStr::FIND_INDEX.as_str(&heap));
    assert_eq!("includes", PStr::INCLUDES.as_str(&heap));
    assert_eq!("toUpperCase", PStr::TO_UPPER_CASE.as_str(&heap));
    assert_eq!("toLowerCase", PStr::TO_LOWER_CASE.as_str(&heap));
    assert_eq!("children", PStr::CHILDREN.as_str(&heap));
    assert_eq!("InternalError", PStr::INTERNAL_ERROR.as_str(&heap));
    assert_eq!("Option", PStr::OPTION.as_str(&heap));
    assert_eq!("", PStr::EMPTY.as_str(&heap));
    assert_eq!("Strings: 6. Module references: 2", heap.stat());
  }

  #[test]
  fn heap_tests() {
    let mut heap = Heap::default();
    let a1 = heap.alloc_str_for_test("aaaaaaaaaaaaaaaaaaaaaaaaaaa");
    let a2 = heap.alloc_string("aaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string());
    let b = heap.alloc_string("b".to_string());
    assert_eq!(PStr::LOWER_B, b);
    assert_eq!(a1, a2);
    assert_ne!(a1, b);
    assert_eq!(Ordering::Equal, a1.cmp(&a2));
    assert_eq!(Ordering::Less, b.cmp(&a1));
    assert_eq!(Some(Ordering::Greater), a1.partial_cmp(&b));
    assert_eq!("aaaaaaaaaaaaaaaaaaaaaaaaaaa", a1.as_str(&heap));
    assert!(heap.get_allocated_str_opt("aaaaaaaaaaaaaaaaaaaaaaaaaaa").is_some());
    assert!(heap.get_allocated_str_opt("dddddddddddddddddddddddddddd").is_none());
    assert_eq!(heap.alloc_str_permanent("includes"), heap.alloc_string("includes".to_string()));
    assert_eq!(PStr::INCLUDES, heap.alloc_string("includes".to_string()));
    assert_eq!("Strings: 7. Module references: 2", heap.stat());
  }

  #[test]
  fn module_reference_tests() {
    let mut heap = Heap::new();
    let ma1 = heap.alloc_module_reference_from_string_vec(vec!["a".to_string()]);
    let mb = heap.alloc_module_reference_from_string_vec(vec!["b".to_string(), "d-c".to_string()]);
    let ma2 = heap.alloc_module_reference_from_string_vec(vec!["a".to_string()]);
    assert_eq!(ma1, ma2);
    assert_ne!(ma1, mb);
    assert_eq!("a", ma1.pretty_print(&heap));
    assert_eq!("b.d-c", mb.pretty_print(&heap));
    assert_eq!("b/d-c.ly", mb.to_filename(&heap));
    assert_eq!("DUMMY", ModuleReference::DUMMY.pretty_print(&heap));
    assert_eq!("", ModuleReference::ROOT.pretty_print(&heap));
    assert_eq!(&[PStr::LOWER_A], ma1.get_parts(&heap));
  }

  #[should_panic]
  #[test]
  fn heap_str_crash() {
    let heap = Heap::new();
    PStr(PStrRepr::from_id(1000)).as_str(&heap);
  }

  #[should_panic]
  #[test]
  fn heap_mod_ref_crash() {
    let heap = Heap::new();
    ModuleReference(100).pretty_print(&heap);
  }
}
