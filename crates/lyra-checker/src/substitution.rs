use super::type_::{FunctionType, RecordField, Type};
use lyra_heap::PStr;
use std::{collections::HashMap, rc::Rc};

/// What a substitution binds. Placeholders (zero-argument generics standing for a not yet resolved
/// type name) live in their own key space so they can never collide with inference variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubstitutionKey {
  Var(u32),
  Placeholder(PStr),
}

/// Acyclic by construction: every bind is preceded by an occurs check.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
  bindings: HashMap<SubstitutionKey, Rc<Type>>,
}

impl Substitution {
  pub fn new() -> Substitution {
    Substitution { bindings: HashMap::new() }
  }

  pub fn len(&self) -> usize {
    self.bindings.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bindings.is_empty()
  }

  pub fn get(&self, key: &SubstitutionKey) -> Option<&Rc<Type>> {
    self.bindings.get(key)
  }

  pub(crate) fn bind(&mut self, key: SubstitutionKey, t: Rc<Type>) {
    self.bindings.insert(key, t);
  }

  pub(crate) fn remove(&mut self, key: &SubstitutionKey) -> Option<Rc<Type>> {
    self.bindings.remove(key)
  }

  /// Placeholder bindings only make sense within the statement that produced them.
  pub(crate) fn clear_placeholders(&mut self) {
    self.bindings.retain(|key, _| matches!(key, SubstitutionKey::Var(_)));
  }

  /// Fully resolves `t`, following bindings transitively through every nested position.
  pub fn apply(&self, t: &Rc<Type>) -> Rc<Type> {
    if self.bindings.is_empty() {
      return t.clone();
    }
    match t.as_ref() {
      Type::Primitive(_) | Type::Adt(_) | Type::StringLiteral(_) | Type::LiteralUnion(_) => {
        t.clone()
      }
      Type::Var(v) => match self.bindings.get(&SubstitutionKey::Var(v.id)) {
        Some(bound) => self.apply(bound),
        None => t.clone(),
      },
      Type::Generic(name, type_arguments) if type_arguments.is_empty() => {
        match self.bindings.get(&SubstitutionKey::Placeholder(*name)) {
          Some(bound) => self.apply(bound),
          None => t.clone(),
        }
      }
      Type::Generic(name, type_arguments) => {
        Rc::new(Type::Generic(*name, type_arguments.iter().map(|it| self.apply(it)).collect()))
      }
      Type::Fn(f) => Rc::new(Type::Fn(self.apply_fn(f))),
      Type::Record(fields) => Rc::new(Type::Record(
        fields
          .iter()
          .map(|f| RecordField { name: f.name, type_: self.apply(&f.type_), optional: f.optional })
          .collect(),
      )),
      Type::Tuple(elements) => {
        Rc::new(Type::Tuple(elements.iter().map(|it| self.apply(it)).collect()))
      }
      Type::Array(element) => Rc::new(Type::Array(self.apply(element))),
      Type::TemplateElement(props) => Rc::new(Type::TemplateElement(self.apply(props))),
    }
  }

  pub fn apply_fn(&self, f: &FunctionType) -> FunctionType {
    FunctionType {
      parameter_types: f.parameter_types.iter().map(|it| self.apply(it)).collect(),
      return_type: self.apply(&f.return_type),
      constructor_name: f.constructor_name,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::super::type_::{test_type_builder, ISourceType};
  use super::*;
  use lyra_heap::Heap;
  use pretty_assertions::assert_eq;

  #[test]
  fn boilterplate() {
    assert!(!format!("{:?}", Substitution::default().clone()).is_empty());
    assert!(!format!("{:?}", SubstitutionKey::Var(0).clone()).is_empty());
    assert!(Substitution::new().is_empty());
    assert_ne!(SubstitutionKey::Var(0), SubstitutionKey::Placeholder(PStr::UPPER_A));
  }

  #[test]
  fn transitive_apply_tests() {
    let builder = test_type_builder::create();
    let heap = &Heap::new();
    let mut subst = Substitution::new();
    subst.bind(SubstitutionKey::Var(0), builder.var(1));
    subst.bind(SubstitutionKey::Var(1), builder.array_type(builder.var(2)));
    subst.bind(SubstitutionKey::Var(2), builder.number_type());
    subst.bind(SubstitutionKey::Placeholder(PStr::UPPER_A), builder.string_type());
    assert_eq!(4, subst.len());
    assert!(subst.get(&SubstitutionKey::Var(2)).is_some());

    let t = builder.fun_type(
      vec![
        builder.var(0),
        builder.generic_type(PStr::UPPER_A, vec![]),
        builder.record_type(vec![(PStr::LOWER_A, true, builder.var(2))]),
      ],
      builder.tuple_type(vec![
        builder.element_type(builder.record_type(vec![])),
        builder.option_type(builder.var(3)),
        builder.adt_type(PStr::UPPER_B),
      ]),
    );
    assert_eq!(
      "(Array<number>, string, { a?: number }) => [Element<{}>, Option<t3>, B]",
      subst.apply(&t).pretty_print(heap)
    );

    subst.clear_placeholders();
    assert_eq!(3, subst.len());
    assert_eq!("A", subst.apply(&builder.generic_type(PStr::UPPER_A, vec![])).pretty_print(heap));
    assert!(subst.remove(&SubstitutionKey::Var(0)).is_some());
    assert_eq!("t0", subst.apply(&builder.var(0)).pretty_print(heap));
    assert_eq!("number", subst.get(&SubstitutionKey::Var(2)).unwrap().pretty_print(heap));
  }
}
