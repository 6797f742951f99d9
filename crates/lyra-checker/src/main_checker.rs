use super::{
  constructors::{AdtDefinition, ConstructorCatalog},
  instantiation::generalize,
  module_resolver::{CachedModule, CheckerSession, ImportResolution, resolve_module_path},
  pattern_coverage::{
    MatchCoverage, canonical_pattern_string, classify_pattern, names_nullary_constructor,
  },
  substitution::SubstitutionKey,
  type_::{FunctionType, ISourceType, PrimitiveTypeKind, RecordField, Type, TypeVariable},
  typing_context::{
    AliasBody, EnvironmentEntry, PreludeRequirements, TypeNameEntry, TypingContext,
  },
  unification::unify,
};
use lyra_ast::{
  Location,
  source::{
    Assignment, Id, Import, Literal, MatchingPattern, Module, Statement, TypeDefinition,
    TypeDefinitionBody, expr, pattern,
  },
};
use lyra_errors::ErrorSet;
use lyra_heap::{Heap, ModuleReference, PStr};
use std::{
  any::Any,
  collections::HashMap,
  panic::{self, AssertUnwindSafe},
  rc::Rc,
};
use tracing::{debug, warn};

/// The inferred type of an unannotated binding or parameter, rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHint {
  pub location: Location,
  pub display: String,
}

pub struct ModuleCheckResult {
  pub module_reference: ModuleReference,
  /// Every checked expression, binding and pattern, resolved through the final substitution.
  pub annotations: HashMap<Location, Rc<Type>>,
  pub catalog: ConstructorCatalog,
  pub error_set: ErrorSet,
  pub type_hints: Vec<TypeHint>,
  pub prelude_requirements: PreludeRequirements,
  pub exports: HashMap<PStr, EnvironmentEntry>,
}

impl ModuleCheckResult {
  pub fn type_at(&self, loc: Location) -> Option<&Rc<Type>> {
    self.annotations.get(&loc)
  }
}

/// Checks one module and caches its exports in the session.
pub fn type_check_module(
  session: &mut CheckerSession,
  heap: &mut Heap,
  module_reference: ModuleReference,
  module: &Module,
) -> ModuleCheckResult {
  debug!(module = %module_reference.pretty_print(heap), "type checking module");
  session.resolving_stack.push(module_reference);
  let (result, cached) = {
    let mut cx = TypingContext::new(heap, session, module_reference);
    register_type_definitions(&mut cx, &module.statements);
    for statement in &module.statements {
      check_top_level_statement(&mut cx, statement);
    }
    finish(cx)
  };
  if let Some(position) = session.resolving_stack.iter().position(|m| *m == module_reference) {
    session.resolving_stack.truncate(position);
  }
  session.store(module_reference, cached);
  debug!(
    module = %module_reference.pretty_print(heap),
    errors = result.error_set.len(),
    "finished type checking module"
  );
  result
}

fn finish(cx: TypingContext) -> (ModuleCheckResult, CachedModule) {
  let TypingContext {
    heap,
    module_reference,
    error_set,
    subst,
    catalog,
    prelude,
    exports,
    exported_types,
    annotations,
    hints,
    ..
  } = cx;
  let heap: &Heap = heap;
  let annotations = annotations.into_iter().map(|(loc, t)| (loc, subst.apply(&t))).collect();
  let type_hints = hints
    .into_iter()
    .map(|(location, t)| TypeHint { location, display: subst.apply(&t).pretty_print(heap) })
    .collect();
  let exports = exports
    .into_iter()
    .map(|(name, entry)| (name, EnvironmentEntry { type_: subst.apply(&entry.type_), ..entry }))
    .collect::<HashMap<_, _>>();
  let exported_types = exported_types
    .into_iter()
    .map(|(name, entry)| {
      let entry = match entry {
        TypeNameEntry::Alias { loc, type_parameters, body: AliasBody::Resolved(t) } => {
          TypeNameEntry::Alias {
            loc,
            type_parameters,
            body: AliasBody::Resolved(subst.apply(&t)),
          }
        }
        entry => entry,
      };
      (name, entry)
    })
    .collect();
  let cached = CachedModule {
    exports: exports.clone(),
    exported_types,
    adts: catalog.adts().to_vec(),
    constructors: catalog.constructors().to_vec(),
    errors: error_set.errors().to_vec(),
  };
  let result = ModuleCheckResult {
    module_reference,
    annotations,
    catalog,
    error_set,
    type_hints,
    prelude_requirements: prelude,
    exports,
  };
  (result, cached)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown fault".to_string()
  }
}

/// A fault inside one statement becomes a diagnostic. Scopes opened by the failed statement are
/// dropped and checking resumes with the next statement.
fn check_top_level_statement(cx: &mut TypingContext, statement: &Statement) {
  let env_depth = cx.env.depth();
  let type_names_depth = cx.type_names.depth();
  let resolving_stack_len = cx.session.resolving_stack.len();
  let outcome = panic::catch_unwind(AssertUnwindSafe(|| check_statement(cx, statement, true)));
  if let Err(payload) = outcome {
    let reason = panic_message(payload.as_ref());
    warn!(
      module = %cx.module_reference.pretty_print(cx.heap),
      %reason,
      "internal fault while checking a statement"
    );
    cx.env.restore_depth(env_depth);
    cx.type_names.restore_depth(type_names_depth);
    cx.session.resolving_stack.truncate(resolving_stack_len);
    cx.resolving_aliases.clear();
    cx.nesting_depth = 0;
    cx.error_set.report_internal_error(statement.loc(), reason);
  }
  cx.subst.clear_placeholders();
}

/// Makes every type name of a statement list visible before any statement is checked.
fn register_type_definitions(cx: &mut TypingContext, statements: &[Statement]) {
  let definitions = statements
    .iter()
    .filter_map(|statement| match statement {
      Statement::TypeDefinition(definition) => Some(definition),
      Statement::Export(_, inner) => inner.as_type_definition(),
      _ => None,
    })
    .collect::<Vec<_>>();
  let mut sum_types = vec![];
  for definition in definitions {
    for (i, id) in definition.type_parameters.iter().enumerate() {
      if let Some(previous) = definition.type_parameters[..i].iter().find(|p| p.name == id.name) {
        cx.error_set.report_name_already_bound_error(id.loc, id.name, previous.loc);
      }
    }
    let type_parameters =
      definition.type_parameters.iter().map(|id| cx.fresh_variable(id.name)).collect::<Vec<_>>();
    let loc = definition.name.loc;
    let entry = match &definition.body {
      TypeDefinitionBody::Alias(annotation) => TypeNameEntry::Alias {
        loc,
        type_parameters: type_parameters.clone(),
        body: AliasBody::Unresolved(Rc::new(annotation.clone())),
      },
      TypeDefinitionBody::Sum(_) => {
        TypeNameEntry::Adt { loc, type_parameters: type_parameters.clone() }
      }
    };
    if !cx.declare_type_name(definition.name, entry) {
      continue;
    }
    if let TypeDefinitionBody::Sum(variants) = &definition.body {
      let adt = AdtDefinition {
        name: definition.name.name,
        type_parameters: type_parameters.clone(),
        loc,
      };
      if let Err(old_loc) = cx.catalog.add_adt(adt) {
        cx.error_set.report_name_already_bound_error(loc, definition.name.name, old_loc);
        continue;
      }
      sum_types.push((definition, type_parameters, variants));
    }
  }
  for (definition, type_parameters, variants) in sum_types {
    cx.type_names.push_scope();
    for (id, variable) in definition.type_parameters.iter().zip(&type_parameters) {
      let entry = TypeNameEntry::TypeParameter { loc: id.loc, variable: *variable };
      cx.type_names.insert(id.name, entry);
    }
    for variant in variants {
      let payload = variant.payload.as_ref().map(|annotation| cx.resolve_annotation(annotation));
      if let Err(old_loc) =
        cx.catalog.add_variant(definition.name.name, variant.name.name, payload, variant.name.loc)
      {
        cx.error_set.report_name_already_bound_error(variant.name.loc, variant.name.name, old_loc);
      }
    }
    cx.type_names.pop_scope();
  }
}

fn check_statement(cx: &mut TypingContext, statement: &Statement, top_level: bool) {
  match statement {
    Statement::Assignment(assignment) => check_assignment(cx, assignment),
    Statement::TypeDefinition(definition) => check_type_definition(cx, definition),
    Statement::Import(import) => check_import(cx, import),
    Statement::Export(_, inner) => {
      check_statement(cx, inner, top_level);
      if top_level {
        for name in declared_names(inner) {
          export_name(cx, name);
        }
      }
    }
    Statement::ExportNames(_, names) => {
      if top_level {
        for name in names {
          export_name(cx, *name);
        }
      }
    }
    Statement::Expression(e) => {
      check_expression(cx, e);
    }
  }
}

fn declared_names(statement: &Statement) -> Vec<Id> {
  match statement {
    Statement::Assignment(assignment) => assignment.binding.bound_names(),
    Statement::TypeDefinition(definition) => vec![definition.name],
    Statement::Import(import) => import.imported_members.clone(),
    Statement::Export(_, _) | Statement::ExportNames(_, _) | Statement::Expression(_) => vec![],
  }
}

fn export_name(cx: &mut TypingContext, id: Id) {
  let mut found = false;
  if let Some(entry) = cx.env.lookup(id.name).cloned() {
    cx.exports.insert(id.name, entry);
    found = true;
  }
  match cx.type_names.get(&id.name).cloned() {
    Some(TypeNameEntry::Alias { .. }) => {
      cx.resolve_alias(id.name, id.loc);
      if let Some(entry) = cx.type_names.get(&id.name).cloned() {
        cx.exported_types.insert(id.name, entry);
      }
      found = true;
    }
    Some(entry @ TypeNameEntry::Adt { .. }) => {
      cx.exported_types.insert(id.name, entry);
      found = true;
    }
    Some(TypeNameEntry::TypeParameter { .. }) | None => {}
  }
  if !found {
    cx.error_set.report_cannot_resolve_name_error(id.loc, id.name);
  }
}

fn check_type_definition(cx: &mut TypingContext, definition: &TypeDefinition) {
  if !matches!(definition.body, TypeDefinitionBody::Alias(_)) {
    return;
  }
  let registered_here =
    cx.type_names.get(&definition.name.name).is_some_and(|e| e.loc() == definition.name.loc);
  if registered_here {
    if let Some((_, t)) = cx.resolve_alias(definition.name.name, definition.name.loc) {
      cx.record(definition.name.loc, t);
    }
  }
}

fn bind_unknown_members(cx: &mut TypingContext, import: &Import) {
  for member in &import.imported_members {
    cx.declare_value(*member, Type::unknown_type());
  }
}

fn check_import(cx: &mut TypingContext, import: &Import) {
  let path = import.path.name.as_str(cx.heap).to_string();
  let resolution = match resolve_module_path(cx.heap, cx.module_reference, &path) {
    Some(target) => Some((target, cx.session.resolve_import(cx.heap, target))),
    None => None,
  };
  match resolution {
    None | Some((_, ImportResolution::NotFound)) => {
      cx.error_set.report_cannot_resolve_module_error(import.path.loc, import.path.name);
      bind_unknown_members(cx, import);
    }
    Some((target, ImportResolution::Cycle)) => {
      cx.error_set.report_cyclic_import_error(import.loc, target);
      bind_unknown_members(cx, import);
    }
    Some((target, ImportResolution::Resolved(module))) => {
      for member in &import.imported_members {
        import_member(cx, target, &module, *member);
      }
    }
  }
}

fn import_member(
  cx: &mut TypingContext,
  target: ModuleReference,
  module: &CachedModule,
  member: Id,
) {
  let mut found = false;
  if let Some(entry) = module.exports.get(&member.name) {
    cx.declare_entry(member, EnvironmentEntry { loc: member.loc, ..entry.clone() });
    found = true;
  }
  if let Some(entry) = module.exported_types.get(&member.name) {
    found = true;
    if cx.declare_type_name(member, entry.clone()) && matches!(entry, TypeNameEntry::Adt { .. }) {
      import_adt(cx, module, member);
    }
  }
  if !found {
    cx.error_set.report_missing_export_error(member.loc, target, member.name);
    cx.declare_value(member, Type::unknown_type());
  }
}

/// Brings an imported sum type's constructors into scope.
fn import_adt(cx: &mut TypingContext, module: &CachedModule, member: Id) {
  let Some(adt) = module.adts.iter().find(|adt| adt.name == member.name) else {
    return;
  };
  if let Err(old_loc) = cx.catalog.add_adt(adt.clone()) {
    cx.error_set.report_name_already_bound_error(member.loc, member.name, old_loc);
    return;
  }
  for constructor in module.constructors.iter().filter(|c| c.adt_name == member.name) {
    if let Err(old_loc) = cx.catalog.add_definition(constructor.clone()) {
      cx.error_set.report_name_already_bound_error(member.loc, constructor.name, old_loc);
    }
  }
}

fn check_assignment(cx: &mut TypingContext, assignment: &Assignment) {
  let annotated_type = assignment.annotation.as_ref().map(|a| cx.resolve_annotation(a));
  let rhs = &assignment.assigned_expression;
  match &assignment.binding {
    pattern::Binding::Id(id) => {
      if let expr::E::Function(_) = rhs {
        check_function_assignment(cx, *id, annotated_type, rhs);
        return;
      }
      let t = match &annotated_type {
        Some(expected) => check_against(cx, rhs, expected),
        None => check_expression(cx, rhs),
      };
      if annotated_type.is_none() {
        cx.hint(id.loc, t.clone());
      }
      cx.record(id.loc, t.clone());
      cx.declare_value(*id, t);
    }
    pattern::Binding::Object(loc, fields) => {
      let t = match &annotated_type {
        Some(expected) => check_against(cx, rhs, expected),
        None => check_expression(cx, rhs),
      };
      let t = cx.subst.apply(&t);
      for field in fields {
        let field_type = match t.as_ref() {
          Type::Record(record_fields) => {
            match record_fields.iter().find(|f| f.name == field.field_name.name) {
              Some(f) if f.optional => cx.option_of(f.type_.clone()),
              Some(f) => f.type_.clone(),
              None => {
                cx.error_set.report_missing_field_error(
                  field.field_name.loc,
                  t.to_description(),
                  field.field_name.name,
                );
                Type::unknown_type()
              }
            }
          }
          _ => Type::unknown_type(),
        };
        bind_destructured(cx, field.bound_name(), field_type, annotated_type.is_none());
      }
      if !matches!(t.as_ref(), Type::Record(_)) && !t.is_unknown() {
        cx.error_set.report_not_a_record_error(*loc, t.to_description());
      }
    }
    pattern::Binding::Array(loc, names) => {
      let t = match &annotated_type {
        Some(expected) => check_against(cx, rhs, expected),
        None => check_expression(cx, rhs),
      };
      let t = cx.subst.apply(&t);
      for (i, name) in names.iter().enumerate() {
        let element_type = match t.as_ref() {
          Type::Array(element) => element.clone(),
          Type::Tuple(slots) => match slots.get(i) {
            Some(slot) => slot.clone(),
            None => {
              let description = t.to_description();
              cx.error_set.report_element_missing_error(name.loc, description, i.to_string());
              Type::unknown_type()
            }
          },
          _ => Type::unknown_type(),
        };
        bind_destructured(cx, *name, element_type, annotated_type.is_none());
      }
      if !matches!(t.as_ref(), Type::Array(_) | Type::Tuple(_)) && !t.is_unknown() {
        cx.error_set.report_not_indexable_error(*loc, t.to_description());
      }
    }
  }
}

fn bind_destructured(cx: &mut TypingContext, name: Id, t: Rc<Type>, with_hint: bool) {
  if with_hint {
    cx.hint(name.loc, t.clone());
  }
  cx.record(name.loc, t.clone());
  cx.declare_value(name, t);
}

/// Function bindings are visible in their own body and generalized afterwards.
fn check_function_assignment(
  cx: &mut TypingContext,
  id: Id,
  annotated_type: Option<Rc<Type>>,
  function: &expr::E,
) {
  let slot = annotated_type.clone().unwrap_or_else(|| cx.fresh_type());
  let declared = cx.declare_entry(id, EnvironmentEntry::monomorphic(slot.clone(), id.loc));
  let t = match &annotated_type {
    Some(expected) => check_against(cx, function, expected),
    None => {
      let t = check_expression(cx, function);
      cx.unify_or_report(&slot, &t, id.loc).unwrap_or(t)
    }
  };
  if annotated_type.is_none() {
    cx.hint(id.loc, t.clone());
  }
  cx.record(id.loc, t.clone());
  if declared {
    let environment_free_variables = cx.env.free_type_variables(&cx.subst, Some(id.loc));
    let generic_params = generalize(&t, &cx.subst, &environment_free_variables);
    let type_ = cx.subst.apply(&t);
    cx.env.update(id.name, EnvironmentEntry { type_, generic_params, loc: id.loc });
  }
}

pub(crate) fn check_expression(cx: &mut TypingContext, e: &expr::E) -> Rc<Type> {
  check_expression_with_hint(cx, e, None)
}

/// Runs `check` one level deeper, or reports the node when the nesting limit is reached.
fn nested<'a>(
  cx: &mut TypingContext<'a>,
  loc: Location,
  check: impl FnOnce(&mut TypingContext<'a>) -> Rc<Type>,
) -> Rc<Type> {
  let limit = cx.session.options.max_nesting_depth;
  let t = if cx.nesting_depth >= limit {
    cx.error_set.report_nesting_too_deep_error(loc, limit);
    Type::unknown_type()
  } else {
    cx.nesting_depth += 1;
    let t = check(cx);
    cx.nesting_depth -= 1;
    t
  };
  cx.record(loc, t.clone());
  t
}

fn check_expression_with_hint(
  cx: &mut TypingContext,
  e: &expr::E,
  hint: Option<&Rc<Type>>,
) -> Rc<Type> {
  nested(cx, e.loc(), |cx| match e {
    expr::E::Literal(_, literal) => literal_type(literal),
    expr::E::Id(_, id) => check_id(cx, *id),
    expr::E::Parenthesized(_, inner) => check_expression_with_hint(cx, inner, hint),
    expr::E::Record(_, fields) => check_record_literal(cx, fields),
    expr::E::Array(_, elements) => check_array_literal(cx, elements),
    expr::E::Block(block) => check_block(cx, block),
    expr::E::IfElse(if_else) => check_if_else(cx, if_else),
    expr::E::Function(function) => {
      let expected = hint.map(|h| cx.subst.apply(h));
      check_function(cx, function, expected.as_ref().and_then(|t| t.as_fn()))
    }
    expr::E::Match(match_) => check_match(cx, match_),
    expr::E::Call(call) => check_call(cx, call),
    expr::E::FieldAccess(access) => check_field_access(cx, access),
    expr::E::Index(index) => check_index(cx, index),
    expr::E::Unary(unary) => check_unary(cx, unary),
    expr::E::Binary(binary) => check_binary(cx, binary),
    expr::E::Element(element) => check_element(cx, element),
  })
}

fn literal_type(literal: &Literal) -> Rc<Type> {
  match literal {
    Literal::Bool(_) => Type::boolean_type(),
    Literal::Number(_) => Type::number_type(),
    Literal::String(_) => Type::string_type(),
  }
}

/// Checks `e` where a type is expected. Literals and containers are checked piecewise so that
/// string literal unions and optional fields are understood; the expected type wins on failure.
pub(crate) fn check_against(cx: &mut TypingContext, e: &expr::E, expected: &Rc<Type>) -> Rc<Type> {
  let expected = cx.subst.apply(expected);
  match (e, expected.as_ref()) {
    (
      expr::E::Literal(_, Literal::String(value)),
      Type::StringLiteral(_) | Type::LiteralUnion(_),
    ) => nested(cx, e.loc(), |cx| {
      let actual = Rc::new(Type::StringLiteral(*value));
      cx.unify_or_report(&actual, &expected, e.loc());
      expected.clone()
    }),
    (expr::E::Parenthesized(_, inner), _) => {
      nested(cx, e.loc(), |cx| check_against(cx, inner, &expected))
    }
    (expr::E::Record(_, fields), Type::Record(expected_fields)) => nested(cx, e.loc(), |cx| {
      check_record_against(cx, e.loc(), fields, &expected, expected_fields);
      expected.clone()
    }),
    (expr::E::Array(_, elements), Type::Array(element)) => nested(cx, e.loc(), |cx| {
      for e in elements {
        check_against(cx, e, element);
      }
      expected.clone()
    }),
    (expr::E::Array(_, elements), Type::Tuple(slots)) if elements.len() == slots.len() => {
      nested(cx, e.loc(), |cx| {
        for (e, slot) in elements.iter().zip(slots) {
          check_against(cx, e, slot);
        }
        expected.clone()
      })
    }
    _ => {
      let actual = check_expression_with_hint(cx, e, Some(&expected));
      reconcile(cx, &actual, &expected, e.loc())
    }
  }
}

/// Fits an inferred type into an expected one. Records are compared field by field so that
/// optional fields may be absent.
fn reconcile(
  cx: &mut TypingContext,
  actual: &Rc<Type>,
  expected: &Rc<Type>,
  loc: Location,
) -> Rc<Type> {
  let actual = cx.subst.apply(actual);
  let expected = cx.subst.apply(expected);
  if let (Type::Record(actual_fields), Type::Record(expected_fields)) =
    (actual.as_ref(), expected.as_ref())
  {
    for expected_field in expected_fields {
      match actual_fields.iter().find(|f| f.name == expected_field.name) {
        Some(actual_field) if actual_field.optional && !expected_field.optional => {
          cx.report_incompatible(loc, &actual, &expected);
        }
        Some(actual_field) => {
          reconcile(cx, &actual_field.type_, &expected_field.type_, loc);
        }
        None if !expected_field.optional => {
          cx.error_set.report_missing_field_error(
            loc,
            expected.to_description(),
            expected_field.name,
          );
        }
        None => {}
      }
    }
    for actual_field in actual_fields {
      if !expected_fields.iter().any(|f| f.name == actual_field.name) {
        cx.error_set.report_cannot_resolve_member_error(
          loc,
          expected.to_description(),
          actual_field.name,
        );
      }
    }
    return expected;
  }
  match unify(&actual, &expected, &mut cx.subst) {
    Ok(t) => t,
    Err(error) => {
      cx.error_set.report_stackable_error(loc, error);
      expected
    }
  }
}

fn check_record_field_value(cx: &mut TypingContext, field: &expr::RecordField) -> Rc<Type> {
  match &field.value {
    Some(value) => check_expression(cx, value),
    None => {
      let t = check_id(cx, field.name);
      cx.record(field.name.loc, t.clone());
      t
    }
  }
}

fn check_record_against(
  cx: &mut TypingContext,
  loc: Location,
  fields: &[expr::RecordField],
  expected: &Rc<Type>,
  expected_fields: &[RecordField],
) {
  for field in fields {
    match expected_fields.iter().find(|f| f.name == field.name.name) {
      Some(expected_field) => match &field.value {
        Some(value) => {
          check_against(cx, value, &expected_field.type_);
        }
        None => {
          let t = check_record_field_value(cx, field);
          reconcile(cx, &t, &expected_field.type_, field.name.loc);
        }
      },
      None => {
        check_record_field_value(cx, field);
        cx.error_set.report_cannot_resolve_member_error(
          field.name.loc,
          expected.to_description(),
          field.name.name,
        );
      }
    }
  }
  for expected_field in expected_fields {
    if !expected_field.optional && !fields.iter().any(|f| f.name.name == expected_field.name) {
      cx.error_set.report_missing_field_error(loc, expected.to_description(), expected_field.name);
    }
  }
}

fn check_id(cx: &mut TypingContext, id: Id) -> Rc<Type> {
  if let Some(definition) = cx.catalog.find(id.name).cloned() {
    cx.note_constructor_use(definition.adt_name);
    return cx.catalog.value_type(&definition, &mut cx.session.type_variable_generator);
  }
  if let Some(entry) = cx.env.lookup(id.name).cloned() {
    return cx.instantiate(&entry);
  }
  cx.error_set.report_cannot_resolve_name_error(id.loc, id.name);
  Type::unknown_type()
}

fn check_record_literal(cx: &mut TypingContext, fields: &[expr::RecordField]) -> Rc<Type> {
  let mut record_fields = vec![];
  for (i, field) in fields.iter().enumerate() {
    if let Some(previous) = fields[..i].iter().find(|f| f.name.name == field.name.name) {
      cx.error_set.report_name_already_bound_error(
        field.name.loc,
        field.name.name,
        previous.name.loc,
      );
    }
    let type_ = check_record_field_value(cx, field);
    record_fields.push(RecordField { name: field.name.name, type_, optional: false });
  }
  Rc::new(Type::Record(record_fields))
}

/// Elements that unify make an array. Otherwise the literal is a tuple of the element types.
/// Unification happens on a copy of the substitution that is dropped afterwards.
fn check_array_literal(cx: &mut TypingContext, elements: &[expr::E]) -> Rc<Type> {
  let element_types = elements.iter().map(|e| check_expression(cx, e)).collect::<Vec<_>>();
  let Some((first, rest)) = element_types.split_first() else {
    return Rc::new(Type::Array(cx.fresh_type()));
  };
  let mut local_subst = cx.subst.clone();
  let mut element = Ok(first.clone());
  for t in rest {
    element = element.and_then(|acc| unify(&acc, t, &mut local_subst));
  }
  match element {
    Ok(element) => Rc::new(Type::Array(local_subst.apply(&element))),
    Err(_) => Rc::new(Type::Tuple(element_types.iter().map(|t| cx.subst.apply(t)).collect())),
  }
}

fn check_block(cx: &mut TypingContext, block: &expr::Block) -> Rc<Type> {
  cx.env.push_scope();
  cx.type_names.push_scope();
  register_type_definitions(cx, &block.statements);
  for statement in &block.statements {
    check_statement(cx, statement, false);
  }
  let t = match &block.expression {
    Some(e) => check_expression(cx, e),
    None => Type::unit_type(),
  };
  cx.type_names.pop_scope();
  cx.env.pop_scope();
  t
}

fn check_if_else(cx: &mut TypingContext, if_else: &expr::IfElse) -> Rc<Type> {
  let condition = check_expression(cx, &if_else.condition);
  cx.unify_or_report(&condition, &Type::boolean_type(), if_else.condition.loc());
  let t1 = check_expression(cx, &if_else.e1);
  match &if_else.e2 {
    Some(e2) => {
      let t2 = check_expression(cx, e2);
      cx.unify_or_report(&t1, &t2, e2.loc()).unwrap_or_else(Type::unknown_type)
    }
    None => Type::unit_type(),
  }
}

fn check_function(
  cx: &mut TypingContext,
  function: &expr::Function,
  expected: Option<&FunctionType>,
) -> Rc<Type> {
  cx.type_names.push_scope();
  let mut own_type_parameters = vec![];
  for id in &function.type_parameters {
    let variable = cx.fresh_variable(id.name);
    if cx.declare_type_name(*id, TypeNameEntry::TypeParameter { loc: id.loc, variable }) {
      own_type_parameters.push(variable);
    }
  }
  let expected_parameters = expected
    .filter(|f| f.parameter_types.len() == function.parameters.len())
    .map(|f| f.parameter_types.clone());
  cx.env.push_scope();
  let mut parameter_types = vec![];
  for (i, parameter) in function.parameters.iter().enumerate() {
    let type_ = match &parameter.annotation {
      Some(annotation) => cx.resolve_annotation(annotation),
      None => {
        let hinted = expected_parameters.as_ref().and_then(|ps| ps.get(i).cloned());
        let t = hinted.unwrap_or_else(|| cx.fresh_type());
        cx.hint(parameter.name.loc, t.clone());
        t
      }
    };
    cx.declare_value(parameter.name, type_.clone());
    cx.record(parameter.name.loc, type_.clone());
    parameter_types.push(type_);
  }
  let return_type = match &function.return_annotation {
    Some(annotation) => {
      let expected_return = cx.resolve_annotation(annotation);
      check_against(cx, &function.body, &expected_return)
    }
    None => check_expression(cx, &function.body),
  };
  cx.env.pop_scope();
  cx.type_names.pop_scope();
  release_type_parameters(cx, &own_type_parameters, function.common.loc);
  Type::fn_type(parameter_types, return_type)
}

/// Declared type parameters are rigid. A parameter the body bound to another variable swaps the
/// binding around; one bound to a concrete type is an error.
fn release_type_parameters(cx: &mut TypingContext, own: &[TypeVariable], loc: Location) {
  for variable in own {
    let Some(bound) = cx.subst.remove(&SubstitutionKey::Var(variable.id)) else {
      continue;
    };
    let bound = cx.subst.apply(&bound);
    match bound.as_ref() {
      Type::Var(other) if other.id == variable.id => {}
      Type::Var(other) if !own.iter().any(|o| o.id == other.id) => {
        cx.subst.bind(SubstitutionKey::Var(other.id), Rc::new(Type::Var(*variable)));
      }
      _ => cx.report_incompatible(loc, &Type::Var(*variable), &bound),
    }
  }
}

fn check_call(cx: &mut TypingContext, call: &expr::Call) -> Rc<Type> {
  let callee_type = check_expression(cx, &call.callee);
  let callee_type = cx.subst.apply(&callee_type);
  let function_type = match callee_type.as_ref() {
    Type::Fn(f) => f.clone(),
    Type::Var(_) => {
      let f = FunctionType {
        parameter_types: call.arguments.iter().map(|_| cx.fresh_type()).collect(),
        return_type: cx.fresh_type(),
        constructor_name: None,
      };
      cx.unify_or_report(&callee_type, &Rc::new(Type::Fn(f.clone())), call.callee.loc());
      f
    }
    _ => {
      if !callee_type.is_unknown() {
        cx.error_set.report_not_a_function_error(call.callee.loc(), callee_type.to_description());
      }
      for argument in &call.arguments {
        check_expression(cx, argument);
      }
      return Type::unknown_type();
    }
  };
  if function_type.parameter_types.len() != call.arguments.len() {
    cx.error_set.report_arity_mismatch_error(
      call.common.loc,
      "arguments",
      function_type.parameter_types.len(),
      call.arguments.len(),
    );
    for argument in &call.arguments {
      check_expression(cx, argument);
    }
    return cx.subst.apply(&function_type.return_type);
  }
  // Argument bindings only stick when every argument checks.
  let checkpoint = cx.subst.clone();
  let errors_before = cx.error_set.len();
  for (argument, parameter_type) in call.arguments.iter().zip(&function_type.parameter_types) {
    check_against(cx, argument, parameter_type);
  }
  if cx.error_set.len() > errors_before {
    cx.subst = checkpoint;
  }
  cx.subst.apply(&function_type.return_type)
}

fn predicate_over(element: &Rc<Type>) -> Rc<Type> {
  Type::fn_type(vec![element.clone()], Type::boolean_type())
}

fn array_member(cx: &mut TypingContext, element: &Rc<Type>, name: PStr) -> Option<Rc<Type>> {
  let array = Rc::new(Type::Array(element.clone()));
  let member = if name == PStr::LENGTH {
    Type::number_type()
  } else if name == PStr::MAP {
    let mapped = cx.fresh_type();
    Type::fn_type(
      vec![Type::fn_type(vec![element.clone()], mapped.clone())],
      Rc::new(Type::Array(mapped)),
    )
  } else if name == PStr::FILTER {
    Type::fn_type(vec![predicate_over(element)], array)
  } else if name == PStr::FIND {
    let found = cx.option_of(element.clone());
    Type::fn_type(vec![predicate_over(element)], found)
  } else if name == PStr::FIND_INDEX {
    let found = cx.option_of(Type::number_type());
    Type::fn_type(vec![predicate_over(element)], found)
  } else if name == PStr::INCLUDES {
    Type::fn_type(vec![element.clone()], Type::boolean_type())
  } else if name == PStr::CONCAT {
    Type::fn_type(vec![array.clone()], array)
  } else if name == PStr::JOIN {
    Type::fn_type(vec![Type::string_type()], Type::string_type())
  } else {
    return None;
  };
  Some(member)
}

fn string_member(name: PStr) -> Option<Rc<Type>> {
  if name == PStr::LENGTH {
    Some(Type::number_type())
  } else if name == PStr::TO_UPPER_CASE || name == PStr::TO_LOWER_CASE || name == PStr::TRIM {
    Some(Type::fn_type(vec![], Type::string_type()))
  } else if name == PStr::INCLUDES {
    Some(Type::fn_type(vec![Type::string_type()], Type::boolean_type()))
  } else {
    None
  }
}

fn check_field_access(cx: &mut TypingContext, access: &expr::FieldAccess) -> Rc<Type> {
  let object_type = check_expression(cx, &access.object);
  let object_type = cx.subst.apply(&object_type);
  let name = access.field_name.name;
  let member = match object_type.as_ref() {
    Type::Record(_) => match object_type.find_field(name) {
      Some(field) if field.optional => Some(cx.option_of(field.type_.clone())),
      Some(field) => Some(field.type_.clone()),
      None => None,
    },
    Type::Array(element) => array_member(cx, element, name),
    Type::Tuple(_) if name == PStr::LENGTH => Some(Type::number_type()),
    Type::Primitive(PrimitiveTypeKind::String) | Type::StringLiteral(_) | Type::LiteralUnion(_) => {
      string_member(name)
    }
    Type::Primitive(PrimitiveTypeKind::Unknown) => Some(Type::unknown_type()),
    _ => None,
  };
  match member {
    Some(t) => {
      cx.record(access.field_name.loc, t.clone());
      t
    }
    None => {
      cx.error_set.report_cannot_resolve_member_error(
        access.field_name.loc,
        object_type.to_description(),
        name,
      );
      Type::unknown_type()
    }
  }
}

fn check_index(cx: &mut TypingContext, index: &expr::Index) -> Rc<Type> {
  let object_type = check_expression(cx, &index.object);
  let object_type = cx.subst.apply(&object_type);
  let index_type = check_expression(cx, &index.index);
  match object_type.as_ref() {
    Type::Array(element) => {
      cx.unify_or_report(&index_type, &Type::number_type(), index.index.loc());
      cx.prelude.array_safe_index = true;
      cx.option_of(element.clone())
    }
    Type::Tuple(slots) => {
      let expr::E::Literal(_, Literal::Number(n)) = index.index.as_ref() else {
        cx.error_set.report_not_indexable_error(index.common.loc, object_type.to_description());
        return Type::unknown_type();
      };
      let slot = if *n >= 0.0 && n.fract() == 0.0 { slots.get(*n as usize) } else { None };
      match slot {
        Some(t) => t.clone(),
        None => {
          cx.error_set.report_element_missing_error(
            index.index.loc(),
            object_type.to_description(),
            n.to_string(),
          );
          Type::unknown_type()
        }
      }
    }
    Type::Primitive(PrimitiveTypeKind::Unknown) => Type::unknown_type(),
    _ => {
      cx.error_set.report_not_indexable_error(index.common.loc, object_type.to_description());
      Type::unknown_type()
    }
  }
}

fn check_unary(cx: &mut TypingContext, unary: &expr::Unary) -> Rc<Type> {
  let argument_type = check_expression(cx, &unary.argument);
  let expected = match unary.operator {
    expr::UnaryOperator::NOT => Type::boolean_type(),
    expr::UnaryOperator::NEG => Type::number_type(),
  };
  cx.unify_or_report(&argument_type, &expected, unary.argument.loc());
  expected
}

fn check_binary(cx: &mut TypingContext, binary: &expr::Binary) -> Rc<Type> {
  use expr::BinaryOperator::*;
  let t1 = check_expression(cx, &binary.e1);
  let t2 = check_expression(cx, &binary.e2);
  let (operand, result) = match binary.operator {
    PLUS => return check_plus(cx, binary, &t1, &t2),
    MUL | DIV | MOD | MINUS => (Type::number_type(), Type::number_type()),
    LT | LE | GT | GE => (Type::number_type(), Type::boolean_type()),
    AND | OR => (Type::boolean_type(), Type::boolean_type()),
    EQ | NE => {
      cx.unify_or_report(&t1, &t2, binary.common.loc);
      return Type::boolean_type();
    }
  };
  cx.unify_or_report(&t1, &operand, binary.e1.loc());
  cx.unify_or_report(&t2, &operand, binary.e2.loc());
  result
}

/// `+` adds numbers or concatenates strings. Operands of unknown shape default to numbers.
fn check_plus(
  cx: &mut TypingContext,
  binary: &expr::Binary,
  t1: &Rc<Type>,
  t2: &Rc<Type>,
) -> Rc<Type> {
  let Some(unified) = cx.unify_or_report(t1, t2, binary.common.loc) else {
    return Type::unknown_type();
  };
  let unified = cx.subst.apply(&unified);
  match unified.as_ref() {
    Type::Primitive(
      PrimitiveTypeKind::Number | PrimitiveTypeKind::String | PrimitiveTypeKind::Unknown,
    ) => unified,
    Type::StringLiteral(_) | Type::LiteralUnion(_) => Type::string_type(),
    Type::Var(_) => {
      cx.unify_or_report(&unified, &Type::number_type(), binary.common.loc);
      Type::number_type()
    }
    _ => {
      cx.report_incompatible(binary.common.loc, &unified, &Type::number_type());
      Type::unknown_type()
    }
  }
}

fn check_match(cx: &mut TypingContext, match_: &expr::Match) -> Rc<Type> {
  let matched_type = check_expression(cx, &match_.matched);
  let matched_type = cx.subst.apply(&matched_type);
  let mut coverage = MatchCoverage::new(&matched_type, &cx.catalog);
  let mut result: Option<Rc<Type>> = None;
  let mut arms_disagree = false;
  for case in &match_.cases {
    let info = classify_pattern(&case.pattern, &matched_type, &cx.catalog);
    let pattern_string =
      canonical_pattern_string(&case.pattern, &matched_type, &cx.catalog, cx.heap);
    if !coverage.process(pattern_string, &info) {
      cx.error_set.report_unreachable_pattern_error(case.pattern.loc());
    }
    cx.env.push_scope();
    check_matching_pattern(cx, &case.pattern, &matched_type);
    let body_type = check_expression(cx, &case.body);
    cx.env.pop_scope();
    match &result {
      None => result = Some(body_type),
      Some(expected) => {
        if let Err(error) = unify(expected, &body_type, &mut cx.subst) {
          cx.error_set.report_stackable_error(case.body.loc(), error);
          arms_disagree = true;
        }
      }
    }
  }
  let missing_cases = coverage.missing_cases();
  if !missing_cases.is_empty() {
    cx.error_set.report_non_exhaustive_match_error(match_.common.loc, missing_cases);
  }
  match result {
    Some(_) if arms_disagree => Type::unknown_type(),
    Some(t) => cx.subst.apply(&t),
    None => Type::unit_type(),
  }
}

fn check_matching_pattern(cx: &mut TypingContext, pattern: &MatchingPattern, expected: &Rc<Type>) {
  match pattern {
    MatchingPattern::Literal(loc, literal) => {
      let t = match literal {
        Literal::String(value) => match cx.subst.apply(expected).as_ref() {
          Type::StringLiteral(_) | Type::LiteralUnion(_) => Rc::new(Type::StringLiteral(*value)),
          _ => Type::string_type(),
        },
        literal => literal_type(literal),
      };
      cx.unify_or_report(&t, expected, *loc);
      cx.record(*loc, t);
    }
    MatchingPattern::Wildcard(loc) => cx.record(*loc, expected.clone()),
    MatchingPattern::Id(id)
      if names_nullary_constructor(&cx.catalog, &cx.subst.apply(expected), id.name) =>
    {
      check_constructor_pattern(cx, id.loc, *id, None, expected);
    }
    MatchingPattern::Id(id) => {
      cx.record(id.loc, expected.clone());
      cx.declare_value(*id, expected.clone());
    }
    MatchingPattern::Constructor { loc, name, argument } => {
      check_constructor_pattern(cx, *loc, *name, argument.as_deref(), expected);
    }
  }
}

fn check_constructor_pattern(
  cx: &mut TypingContext,
  loc: Location,
  name: Id,
  argument: Option<&MatchingPattern>,
  expected: &Rc<Type>,
) {
  let Some(definition) = cx.catalog.find(name.name).cloned() else {
    cx.error_set.report_cannot_resolve_name_error(name.loc, name.name);
    if let Some(argument) = argument {
      check_matching_pattern(cx, argument, &Type::unknown_type());
    }
    return;
  };
  cx.note_constructor_use(definition.adt_name);
  let constructor =
    cx.catalog.instantiate_constructor(&definition, &mut cx.session.type_variable_generator);
  cx.unify_or_report(&constructor.return_type, expected, loc);
  match (constructor.parameter_types.first(), argument) {
    (Some(payload), Some(argument)) => check_matching_pattern(cx, argument, payload),
    (Some(_), None) => {
      cx.error_set.report_arity_mismatch_error(loc, "constructor payload", 1, 0);
    }
    (None, Some(argument)) => {
      cx.error_set.report_arity_mismatch_error(loc, "constructor payload", 0, 1);
      check_matching_pattern(cx, argument, &Type::unknown_type());
    }
    (None, None) => {}
  }
  let t = cx.subst.apply(&constructor.return_type);
  cx.record(loc, t);
}

fn is_renderable(t: &Type) -> bool {
  match t {
    Type::TemplateElement(_)
    | Type::StringLiteral(_)
    | Type::LiteralUnion(_)
    | Type::Var(_)
    | Type::Primitive(
      PrimitiveTypeKind::String | PrimitiveTypeKind::Number | PrimitiveTypeKind::Unknown,
    ) => true,
    Type::Array(element) => is_renderable(element),
    _ => false,
  }
}

fn attribute_value_type(cx: &mut TypingContext, attribute: &expr::ElementAttribute) -> Rc<Type> {
  match &attribute.value {
    Some(value) => check_expression(cx, value),
    None => Type::boolean_type(),
  }
}

/// Lowercase tags are intrinsic elements whose props are whatever the attributes say. Other tags
/// name a component function that receives the attributes as its props record.
fn check_element(cx: &mut TypingContext, element: &expr::Element) -> Rc<Type> {
  for child in &element.children {
    let t = check_expression(cx, child);
    let t = cx.subst.apply(&t);
    if !is_renderable(&t) {
      let renderable = Type::TemplateElement(Rc::new(Type::Record(vec![])));
      cx.report_incompatible(child.loc(), &t, &renderable);
    }
  }
  let is_intrinsic =
    element.tag.name.as_str(cx.heap).starts_with(|c: char| c.is_ascii_lowercase());
  if is_intrinsic {
    let props = element
      .attributes
      .iter()
      .map(|attribute| RecordField {
        name: attribute.name.name,
        type_: attribute_value_type(cx, attribute),
        optional: false,
      })
      .collect();
    return Rc::new(Type::TemplateElement(Rc::new(Type::Record(props))));
  }
  let component_type = check_id(cx, element.tag);
  cx.record(element.tag.loc, component_type.clone());
  let component_type = cx.subst.apply(&component_type);
  match component_type.as_ref() {
    Type::Fn(f) if f.parameter_types.len() <= 1 => {
      let expected_props = match f.parameter_types.first() {
        Some(t) => cx.subst.apply(t),
        None => Rc::new(Type::Record(vec![])),
      };
      check_element_attributes(cx, element, &expected_props);
      cx.subst.apply(&f.return_type)
    }
    _ => {
      if !component_type.is_unknown() {
        cx.error_set.report_not_a_function_error(element.tag.loc, component_type.to_description());
      }
      for attribute in &element.attributes {
        attribute_value_type(cx, attribute);
      }
      Type::unknown_type()
    }
  }
}

fn check_element_attributes(
  cx: &mut TypingContext,
  element: &expr::Element,
  expected_props: &Rc<Type>,
) {
  let Type::Record(expected_fields) = expected_props.as_ref() else {
    let props = element
      .attributes
      .iter()
      .map(|attribute| RecordField {
        name: attribute.name.name,
        type_: attribute_value_type(cx, attribute),
        optional: false,
      })
      .collect();
    reconcile(cx, &Rc::new(Type::Record(props)), expected_props, element.common.loc);
    return;
  };
  for attribute in &element.attributes {
    match expected_fields.iter().find(|f| f.name == attribute.name.name) {
      Some(field) => match &attribute.value {
        Some(value) => {
          check_against(cx, value, &field.type_);
        }
        None => {
          reconcile(cx, &Type::boolean_type(), &field.type_, attribute.name.loc);
        }
      },
      None => {
        attribute_value_type(cx, attribute);
        cx.error_set.report_cannot_resolve_member_error(
          attribute.name.loc,
          expected_props.to_description(),
          attribute.name.name,
        );
      }
    }
  }
  for field in expected_fields {
    let provided = element.attributes.iter().any(|a| a.name.name == field.name);
    if !field.optional && !provided && field.name != PStr::CHILDREN {
      cx.error_set.report_missing_field_error(
        element.common.loc,
        expected_props.to_description(),
        field.name,
      );
    }
  }
}
