use super::{
  constructors::ConstructorCatalog,
  instantiation::{self, free_type_variables},
  module_resolver::CheckerSession,
  substitution::Substitution,
  type_::{ISourceType, PrimitiveTypeKind, RecordField, Type, TypeVariable},
  unification,
};
use lyra_ast::{
  Location,
  source::{Id, annotation},
};
use lyra_collections::LocalStackedContext;
use lyra_errors::ErrorSet;
use lyra_heap::{Heap, ModuleReference, PStr};
use std::{
  collections::{HashMap, HashSet},
  rc::Rc,
};

#[derive(Debug, Clone)]
pub struct EnvironmentEntry {
  pub type_: Rc<Type>,
  /// Non-empty for let-polymorphic bindings. Every reference instantiates these afresh.
  pub generic_params: Vec<TypeVariable>,
  pub loc: Location,
}

impl EnvironmentEntry {
  pub fn monomorphic(type_: Rc<Type>, loc: Location) -> EnvironmentEntry {
    EnvironmentEntry { type_, generic_params: vec![], loc }
  }
}

/// Lexical scopes of value bindings.
pub struct TypeEnvironment {
  scopes: LocalStackedContext<PStr, EnvironmentEntry>,
}

impl TypeEnvironment {
  pub fn new() -> TypeEnvironment {
    TypeEnvironment { scopes: LocalStackedContext::new() }
  }

  /// Fails with the location of the existing binding when the innermost scope already has `name`.
  pub fn declare(&mut self, name: PStr, entry: EnvironmentEntry) -> Result<(), Location> {
    match self.scopes.insert(name, entry) {
      Some(existing) => Err(existing.loc),
      None => Ok(()),
    }
  }

  pub fn lookup(&self, name: PStr) -> Option<&EnvironmentEntry> {
    self.scopes.get(&name)
  }

  pub fn update(&mut self, name: PStr, entry: EnvironmentEntry) -> bool {
    self.scopes.update(&name, entry)
  }

  pub fn push_scope(&mut self) {
    self.scopes.push_scope();
  }

  pub fn pop_scope(&mut self) {
    self.scopes.pop_scope();
  }

  pub fn depth(&self) -> usize {
    self.scopes.depth()
  }

  pub fn restore_depth(&mut self, depth: usize) {
    self.scopes.restore_depth(depth);
  }

  /// Ids of variables free in some monomorphic part of the environment. The binding declared at
  /// `excluding` is skipped.
  pub fn free_type_variables(
    &self,
    subst: &Substitution,
    excluding: Option<Location>,
  ) -> HashSet<u32> {
    let mut collector = HashSet::new();
    for entry in self.scopes.values() {
      if Some(entry.loc) == excluding {
        continue;
      }
      for v in free_type_variables(&subst.apply(&entry.type_)) {
        if !entry.generic_params.iter().any(|g| g.id == v.id) {
          collector.insert(v.id);
        }
      }
    }
    collector
  }
}

impl Default for TypeEnvironment {
  fn default() -> Self {
    Self::new()
  }
}

#[derive(Debug, Clone)]
pub enum AliasBody {
  Unresolved(Rc<annotation::T>),
  Resolved(Rc<Type>),
}

/// What a name in type position refers to.
#[derive(Debug, Clone)]
pub enum TypeNameEntry {
  TypeParameter { loc: Location, variable: TypeVariable },
  Alias { loc: Location, type_parameters: Vec<TypeVariable>, body: AliasBody },
  Adt { loc: Location, type_parameters: Vec<TypeVariable> },
}

impl TypeNameEntry {
  pub fn loc(&self) -> Location {
    match self {
      TypeNameEntry::TypeParameter { loc, .. }
      | TypeNameEntry::Alias { loc, .. }
      | TypeNameEntry::Adt { loc, .. } => *loc,
    }
  }
}

/// Runtime helpers the generated code needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreludeRequirements {
  pub array_safe_index: bool,
  pub option_constructors: bool,
  pub result_constructors: bool,
}

pub(crate) struct TypingContext<'a> {
  pub(crate) heap: &'a mut Heap,
  pub(crate) session: &'a mut CheckerSession,
  pub(crate) module_reference: ModuleReference,
  pub(crate) error_set: ErrorSet,
  pub(crate) env: TypeEnvironment,
  pub(crate) type_names: LocalStackedContext<PStr, TypeNameEntry>,
  pub(crate) subst: Substitution,
  pub(crate) catalog: ConstructorCatalog,
  pub(crate) prelude: PreludeRequirements,
  pub(crate) exports: HashMap<PStr, EnvironmentEntry>,
  pub(crate) exported_types: HashMap<PStr, TypeNameEntry>,
  pub(crate) annotations: HashMap<Location, Rc<Type>>,
  pub(crate) hints: Vec<(Location, Rc<Type>)>,
  pub(crate) resolving_aliases: Vec<PStr>,
  pub(crate) nesting_depth: usize,
}

impl<'a> TypingContext<'a> {
  pub(crate) fn new(
    heap: &'a mut Heap,
    session: &'a mut CheckerSession,
    module_reference: ModuleReference,
  ) -> TypingContext<'a> {
    let catalog = ConstructorCatalog::with_builtins(&mut session.type_variable_generator);
    let mut type_names = LocalStackedContext::new();
    for adt in catalog.adts() {
      type_names.insert(
        adt.name,
        TypeNameEntry::Adt { loc: adt.loc, type_parameters: adt.type_parameters.clone() },
      );
    }
    TypingContext {
      heap,
      session,
      module_reference,
      error_set: ErrorSet::new(),
      env: TypeEnvironment::new(),
      type_names,
      subst: Substitution::new(),
      catalog,
      prelude: PreludeRequirements::default(),
      exports: HashMap::new(),
      exported_types: HashMap::new(),
      annotations: HashMap::new(),
      hints: vec![],
      resolving_aliases: vec![],
      nesting_depth: 0,
    }
  }

  pub(crate) fn fresh_variable(&mut self, name: PStr) -> TypeVariable {
    self.session.type_variable_generator.fresh(name)
  }

  pub(crate) fn fresh_type(&mut self) -> Rc<Type> {
    self.session.type_variable_generator.fresh_type(PStr::EMPTY)
  }

  pub(crate) fn instantiate(&mut self, entry: &EnvironmentEntry) -> Rc<Type> {
    instantiation::instantiate(
      &entry.type_,
      &entry.generic_params,
      &mut self.session.type_variable_generator,
    )
  }

  pub(crate) fn record(&mut self, loc: Location, t: Rc<Type>) {
    self.annotations.insert(loc, t);
  }

  pub(crate) fn hint(&mut self, loc: Location, t: Rc<Type>) {
    self.hints.push((loc, t));
  }

  pub(crate) fn note_constructor_use(&mut self, adt_name: PStr) {
    if adt_name == PStr::OPTION {
      self.prelude.option_constructors = true;
    } else if adt_name == PStr::RESULT {
      self.prelude.result_constructors = true;
    }
  }

  pub(crate) fn option_of(&mut self, t: Rc<Type>) -> Rc<Type> {
    self.prelude.option_constructors = true;
    Type::option_type(t)
  }

  /// Unifies in the ambient substitution, reporting a failure at `loc`.
  pub(crate) fn unify_or_report(
    &mut self,
    t1: &Rc<Type>,
    t2: &Rc<Type>,
    loc: Location,
  ) -> Option<Rc<Type>> {
    match unification::unify(t1, t2, &mut self.subst) {
      Ok(t) => Some(t),
      Err(e) => {
        self.error_set.report_stackable_error(loc, e);
        None
      }
    }
  }

  pub(crate) fn report_incompatible(&mut self, loc: Location, actual: &Type, expected: &Type) {
    let mut error = lyra_errors::StackableError::new();
    error.add_type_incompatibility_error(actual.to_description(), expected.to_description());
    self.error_set.report_stackable_error(loc, error);
  }

  pub(crate) fn declare_value(&mut self, id: Id, type_: Rc<Type>) {
    self.declare_entry(id, EnvironmentEntry::monomorphic(type_, id.loc));
  }

  pub(crate) fn declare_entry(&mut self, id: Id, entry: EnvironmentEntry) -> bool {
    match self.env.declare(id.name, entry) {
      Ok(()) => true,
      Err(old_loc) => {
        self.error_set.report_name_already_bound_error(id.loc, id.name, old_loc);
        false
      }
    }
  }

  pub(crate) fn declare_type_name(&mut self, id: Id, entry: TypeNameEntry) -> bool {
    match self.type_names.insert(id.name, entry) {
      None => true,
      Some(existing) => {
        self.error_set.report_name_already_bound_error(id.loc, id.name, existing.loc());
        false
      }
    }
  }

  /// Resolves an alias body on first use, in the scope the alias is defined in. Returns its type
  /// parameters and body.
  pub(crate) fn resolve_alias(
    &mut self,
    name: PStr,
    use_loc: Location,
  ) -> Option<(Vec<TypeVariable>, Rc<Type>)> {
    let Some(TypeNameEntry::Alias { loc, type_parameters, body }) =
      self.type_names.get(&name).cloned()
    else {
      return None;
    };
    let annotation = match body {
      AliasBody::Resolved(t) => return Some((type_parameters, t)),
      AliasBody::Unresolved(annotation) => annotation,
    };
    if self.resolving_aliases.contains(&name) {
      self.error_set.report_cyclic_type_definition_error(use_loc, name);
      return None;
    }
    self.resolving_aliases.push(name);
    // The body only sees the type names of the scope that defines the alias.
    let defining_depth = self.type_names.binding_depth(&name).unwrap_or(self.type_names.depth());
    let use_site_scopes = self.type_names.detach_scopes_above(defining_depth);
    self.type_names.push_scope();
    for variable in &type_parameters {
      let entry = TypeNameEntry::TypeParameter { loc, variable: *variable };
      self.type_names.insert(variable.name, entry);
    }
    let resolved = self.resolve_annotation(&annotation);
    self.type_names.pop_scope();
    self.type_names.update(
      &name,
      TypeNameEntry::Alias {
        loc,
        type_parameters: type_parameters.clone(),
        body: AliasBody::Resolved(resolved.clone()),
      },
    );
    self.type_names.reattach_scopes(use_site_scopes);
    self.resolving_aliases.pop();
    Some((type_parameters, resolved))
  }

  fn check_type_argument_count(&mut self, loc: Location, expected: usize, actual: usize) -> bool {
    if expected == actual {
      true
    } else {
      self.error_set.report_arity_mismatch_error(loc, "type arguments", expected, actual);
      false
    }
  }

  fn resolve_id_annotation(&mut self, annot: &annotation::Id) -> Rc<Type> {
    let name = annot.id.name;
    let type_arguments =
      annot.type_arguments.iter().map(|t| self.resolve_annotation(t)).collect::<Vec<_>>();
    match self.type_names.get(&name).cloned() {
      Some(TypeNameEntry::TypeParameter { variable, .. }) => {
        if self.check_type_argument_count(annot.location, 0, type_arguments.len()) {
          Rc::new(Type::Var(variable))
        } else {
          Type::unknown_type()
        }
      }
      Some(TypeNameEntry::Alias { .. }) => {
        let Some((type_parameters, body)) = self.resolve_alias(name, annot.location) else {
          return Type::unknown_type();
        };
        if type_parameters.is_empty() || !type_arguments.is_empty() {
          if !self.check_type_argument_count(
            annot.location,
            type_parameters.len(),
            type_arguments.len(),
          ) {
            return Type::unknown_type();
          }
          let mapping: HashMap<u32, Rc<Type>> =
            type_parameters.iter().map(|v| v.id).zip(type_arguments).collect();
          instantiation::substitute_type_variables(&body, &mapping)
        } else {
          let generator = &mut self.session.type_variable_generator;
          instantiation::instantiate(&body, &type_parameters, generator)
        }
      }
      Some(TypeNameEntry::Adt { type_parameters, .. }) => {
        if type_parameters.is_empty() {
          if self.check_type_argument_count(annot.location, 0, type_arguments.len()) {
            Rc::new(Type::Adt(name))
          } else {
            Type::unknown_type()
          }
        } else if type_arguments.is_empty() {
          Rc::new(Type::Generic(name, vec![]))
        } else if self.check_type_argument_count(
          annot.location,
          type_parameters.len(),
          type_arguments.len(),
        ) {
          Rc::new(Type::Generic(name, type_arguments))
        } else {
          Type::unknown_type()
        }
      }
      None if name == PStr::ARRAY || name == PStr::ELEMENT => {
        if !self.check_type_argument_count(annot.location, 1, type_arguments.len()) {
          return Type::unknown_type();
        }
        let argument = type_arguments.into_iter().next().unwrap_or_else(Type::unknown_type);
        if name == PStr::ARRAY {
          Rc::new(Type::Array(argument))
        } else {
          Rc::new(Type::TemplateElement(argument))
        }
      }
      None if name == PStr::VOID => Type::unit_type(),
      None => {
        self.error_set.report_cannot_resolve_type_error(annot.id.loc, name);
        Type::unknown_type()
      }
    }
  }

  pub(crate) fn resolve_annotation(&mut self, annot: &annotation::T) -> Rc<Type> {
    match annot {
      annotation::T::Primitive(_, kind) => Rc::new(Type::Primitive(match kind {
        annotation::PrimitiveTypeKind::String => PrimitiveTypeKind::String,
        annotation::PrimitiveTypeKind::Number => PrimitiveTypeKind::Number,
        annotation::PrimitiveTypeKind::Boolean => PrimitiveTypeKind::Boolean,
        annotation::PrimitiveTypeKind::Unit => PrimitiveTypeKind::Unit,
        annotation::PrimitiveTypeKind::Unknown => PrimitiveTypeKind::Unknown,
      })),
      annotation::T::Id(annot) => self.resolve_id_annotation(annot),
      annotation::T::Fn(annot) => {
        let parameter_types = annot.parameters.iter().map(|t| self.resolve_annotation(t)).collect();
        let return_type = self.resolve_annotation(&annot.return_type);
        Type::fn_type(parameter_types, return_type)
      }
      annotation::T::Record(annot) => Rc::new(Type::Record(
        annot
          .fields
          .iter()
          .map(|f| RecordField {
            name: f.name.name,
            type_: self.resolve_annotation(&f.annotation),
            optional: f.optional,
          })
          .collect(),
      )),
      annotation::T::Tuple(_, elements) => {
        Rc::new(Type::Tuple(elements.iter().map(|t| self.resolve_annotation(t)).collect()))
      }
      annotation::T::Array(_, element) => Rc::new(Type::Array(self.resolve_annotation(element))),
      annotation::T::StringLiteral(_, value) => Rc::new(Type::StringLiteral(*value)),
      annotation::T::LiteralUnion(_, values) => {
        let mut deduplicated: Vec<PStr> = vec![];
        for v in values {
          if !deduplicated.contains(v) {
            deduplicated.push(*v);
          }
        }
        Rc::new(Type::LiteralUnion(deduplicated))
      }
    }
  }
}
