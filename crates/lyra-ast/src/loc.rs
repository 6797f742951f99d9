use lyra_heap::{Heap, ModuleReference};

/// Zero-based (line, column).
#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct Position(pub u32, pub u32);

pub const DUMMY_POSITION: Position = Position(u32::MAX, u32::MAX);

impl Position {
  pub fn is_dummy(self) -> bool {
    self == DUMMY_POSITION
  }
}

/// Source span of a syntax node. The parser guarantees that no two nodes of one module share a
/// location, so it doubles as the node identity in every per-node table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
  pub module_reference: ModuleReference,
  pub start: Position,
  pub end: Position,
}

impl Location {
  pub fn dummy() -> Self {
    Self { module_reference: ModuleReference::DUMMY, start: DUMMY_POSITION, end: DUMMY_POSITION }
  }

  pub fn from_pos(sl: u32, sc: u32, el: u32, ec: u32) -> Self {
    Self {
      module_reference: ModuleReference::DUMMY,
      start: Position(sl, sc),
      end: Position(el, ec),
    }
  }

  pub fn pretty_print_without_file(&self) -> String {
    if self.start.is_dummy() && self.end.is_dummy() {
      return "DUMMY".to_owned();
    }
    format!(
      "{}:{}-{}:{}",
      self.start.0 as u64 + 1,
      self.start.1 as u64 + 1,
      self.end.0 as u64 + 1,
      self.end.1 as u64 + 1
    )
  }

  pub fn pretty_print(&self, heap: &Heap) -> String {
    format!("{}:{}", self.module_reference.to_filename(heap), self.pretty_print_without_file())
  }
}
