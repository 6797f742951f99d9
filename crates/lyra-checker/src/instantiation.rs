use super::{
  substitution::Substitution,
  type_::{FunctionType, RecordField, Type, TypeVariable},
};
use lyra_heap::PStr;
use std::{
  collections::{HashMap, HashSet},
  rc::Rc,
};

/// Hands out type variables with ids unique across every module of a session.
#[derive(Debug, Default)]
pub struct TypeVariableGenerator {
  next_id: u32,
}

impl TypeVariableGenerator {
  pub fn new() -> TypeVariableGenerator {
    TypeVariableGenerator { next_id: 0 }
  }

  pub fn fresh(&mut self, name: PStr) -> TypeVariable {
    let id = self.next_id;
    self.next_id += 1;
    TypeVariable { id, name }
  }

  pub fn fresh_type(&mut self, name: PStr) -> Rc<Type> {
    Rc::new(Type::Var(self.fresh(name)))
  }
}

fn collect_free_type_variables(t: &Type, collector: &mut Vec<TypeVariable>) {
  match t {
    Type::Primitive(_) | Type::Adt(_) | Type::StringLiteral(_) | Type::LiteralUnion(_) => {}
    Type::Var(v) => {
      if !collector.iter().any(|it| it.id == v.id) {
        collector.push(*v);
      }
    }
    Type::Generic(_, type_arguments) | Type::Tuple(type_arguments) => {
      for t in type_arguments {
        collect_free_type_variables(t, collector);
      }
    }
    Type::Fn(f) => {
      for t in &f.parameter_types {
        collect_free_type_variables(t, collector);
      }
      collect_free_type_variables(&f.return_type, collector);
    }
    Type::Record(fields) => {
      for f in fields {
        collect_free_type_variables(&f.type_, collector);
      }
    }
    Type::Array(t) | Type::TemplateElement(t) => collect_free_type_variables(t, collector),
  }
}

/// Free variables in order of first appearance, without duplicates.
pub fn free_type_variables(t: &Type) -> Vec<TypeVariable> {
  let mut collector = vec![];
  collect_free_type_variables(t, &mut collector);
  collector
}

pub(crate) fn substitute_type_variables(
  t: &Rc<Type>,
  mapping: &HashMap<u32, Rc<Type>>,
) -> Rc<Type> {
  match t.as_ref() {
    Type::Primitive(_) | Type::Adt(_) | Type::StringLiteral(_) | Type::LiteralUnion(_) => t.clone(),
    Type::Var(v) => mapping.get(&v.id).cloned().unwrap_or_else(|| t.clone()),
    Type::Generic(name, type_arguments) => Rc::new(Type::Generic(
      *name,
      type_arguments.iter().map(|it| substitute_type_variables(it, mapping)).collect(),
    )),
    Type::Fn(f) => Rc::new(Type::Fn(substitute_fn_type_variables(f, mapping))),
    Type::Record(fields) => Rc::new(Type::Record(
      fields
        .iter()
        .map(|f| RecordField {
          name: f.name,
          type_: substitute_type_variables(&f.type_, mapping),
          optional: f.optional,
        })
        .collect(),
    )),
    Type::Tuple(elements) => Rc::new(Type::Tuple(
      elements.iter().map(|it| substitute_type_variables(it, mapping)).collect(),
    )),
    Type::Array(element) => Rc::new(Type::Array(substitute_type_variables(element, mapping))),
    Type::TemplateElement(props) => {
      Rc::new(Type::TemplateElement(substitute_type_variables(props, mapping)))
    }
  }
}

pub(crate) fn substitute_fn_type_variables(
  f: &FunctionType,
  mapping: &HashMap<u32, Rc<Type>>,
) -> FunctionType {
  FunctionType {
    parameter_types: f
      .parameter_types
      .iter()
      .map(|it| substitute_type_variables(it, mapping))
      .collect(),
    return_type: substitute_type_variables(&f.return_type, mapping),
    constructor_name: f.constructor_name,
  }
}

fn fresh_mapping(
  generic_params: &[TypeVariable],
  generator: &mut TypeVariableGenerator,
) -> HashMap<u32, Rc<Type>> {
  generic_params.iter().map(|v| (v.id, generator.fresh_type(v.name))).collect()
}

/// Gives every generic parameter of a polymorphic binding a fresh variable with the same name.
pub fn instantiate(
  t: &Rc<Type>,
  generic_params: &[TypeVariable],
  generator: &mut TypeVariableGenerator,
) -> Rc<Type> {
  if generic_params.is_empty() {
    return t.clone();
  }
  substitute_type_variables(t, &fresh_mapping(generic_params, generator))
}

pub fn instantiate_fn(
  f: &FunctionType,
  generic_params: &[TypeVariable],
  generator: &mut TypeVariableGenerator,
) -> FunctionType {
  if generic_params.is_empty() {
    return f.clone();
  }
  substitute_fn_type_variables(f, &fresh_mapping(generic_params, generator))
}

/// The variables of `t` (resolved through `subst`) that the environment does not pin down.
pub fn generalize(
  t: &Rc<Type>,
  subst: &Substitution,
  environment_free_variables: &HashSet<u32>,
) -> Vec<TypeVariable> {
  free_type_variables(&subst.apply(t))
    .into_iter()
    .filter(|v| !environment_free_variables.contains(&v.id))
    .collect()
}
