use std::{collections::HashMap, hash::Hash};

/// Scopes taken off a [LocalStackedContext] by `detach_scopes_above`.
pub struct DetachedScopes<K, V>(Vec<HashMap<K, V>>);

/// A stack of scopes. Lookups see the innermost binding; bindings only conflict with other
/// bindings of the same scope.
pub struct LocalStackedContext<K: Clone + Eq + Hash, V: Clone> {
  local_values_stack: Vec<HashMap<K, V>>,
}

impl<K: Clone + Eq + Hash, V: Clone> LocalStackedContext<K, V> {
  pub fn new() -> LocalStackedContext<K, V> {
    LocalStackedContext { local_values_stack: vec![HashMap::new()] }
  }

  pub fn get(&self, name: &K) -> Option<&V> {
    self.local_values_stack.iter().rev().find_map(|level| level.get(name))
  }

  pub fn get_in_current_scope(&self, name: &K) -> Option<&V> {
    self.local_values_stack.last().and_then(|level| level.get(name))
  }

  /// Binds `name` in the innermost scope. If the innermost scope already binds it, the old value
  /// is kept and returned.
  pub fn insert(&mut self, name: K, value: V) -> Option<V> {
    if let Some(existing) = self.get_in_current_scope(&name) {
      return Some(existing.clone());
    }
    if let Some(level) = self.local_values_stack.last_mut() {
      level.insert(name, value);
    }
    None
  }

  /// Overwrites the innermost binding of `name`, wherever it lives. Returns whether it exists.
  pub fn update(&mut self, name: &K, value: V) -> bool {
    match self.local_values_stack.iter_mut().rev().find_map(|level| level.get_mut(name)) {
      Some(slot) => {
        *slot = value;
        true
      }
      None => false,
    }
  }

  pub fn push_scope(&mut self) {
    self.local_values_stack.push(HashMap::new());
  }

  pub fn pop_scope(&mut self) {
    if self.local_values_stack.len() > 1 {
      self.local_values_stack.pop();
    }
  }

  pub fn depth(&self) -> usize {
    self.local_values_stack.len()
  }

  /// Drops every scope opened after the stack had `depth` scopes.
  pub fn restore_depth(&mut self, depth: usize) {
    self.local_values_stack.truncate(depth.max(1));
  }

  /// The depth, as counted by `depth`, of the innermost scope that binds `name`.
  pub fn binding_depth(&self, name: &K) -> Option<usize> {
    self.local_values_stack.iter().rposition(|level| level.contains_key(name)).map(|i| i + 1)
  }

  /// Hides every scope opened after the stack had `depth` scopes until they are reattached.
  pub fn detach_scopes_above(&mut self, depth: usize) -> DetachedScopes<K, V> {
    let depth = depth.clamp(1, self.local_values_stack.len());
    DetachedScopes(self.local_values_stack.split_off(depth))
  }

  pub fn reattach_scopes(&mut self, detached: DetachedScopes<K, V>) {
    self.local_values_stack.extend(detached.0);
  }

  pub fn values(&self) -> impl Iterator<Item = &V> {
    self.local_values_stack.iter().flat_map(|level| level.values())
  }
}

impl<K: Clone + Eq + Hash, V: Clone> Default for LocalStackedContext<K, V> {
  fn default() -> Self {
    Self::new()
  }
}
