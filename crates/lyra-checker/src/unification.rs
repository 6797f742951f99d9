use super::{
  substitution::{Substitution, SubstitutionKey},
  type_::{FunctionType, ISourceType, PrimitiveTypeKind, RecordField, Type},
};
use lyra_errors::StackableError;
use std::rc::Rc;

fn incompatible(t1: &Type, t2: &Type) -> StackableError {
  let mut error = StackableError::new();
  error.add_type_incompatibility_error(t1.to_description(), t2.to_description());
  error
}

/// Whether `key` appears anywhere inside `t`. `t` must already be resolved.
fn occurs_in(key: SubstitutionKey, t: &Type) -> bool {
  match t {
    Type::Primitive(_) | Type::Adt(_) | Type::StringLiteral(_) | Type::LiteralUnion(_) => false,
    Type::Var(v) => key == SubstitutionKey::Var(v.id),
    Type::Generic(name, type_arguments) => {
      (type_arguments.is_empty() && key == SubstitutionKey::Placeholder(*name))
        || type_arguments.iter().any(|it| occurs_in(key, it))
    }
    Type::Fn(f) => {
      f.parameter_types.iter().any(|it| occurs_in(key, it)) || occurs_in(key, &f.return_type)
    }
    Type::Record(fields) => fields.iter().any(|f| occurs_in(key, &f.type_)),
    Type::Tuple(elements) => elements.iter().any(|it| occurs_in(key, it)),
    Type::Array(element) => occurs_in(key, element),
    Type::TemplateElement(props) => occurs_in(key, props),
  }
}

fn bind(
  key: SubstitutionKey,
  variable: &Rc<Type>,
  t: &Rc<Type>,
  subst: &mut Substitution,
) -> Result<Rc<Type>, StackableError> {
  if occurs_in(key, t) {
    let mut error = StackableError::new();
    error.add_occurs_check_error(variable.to_description(), t.to_description());
    return Err(error);
  }
  subst.bind(key, t.clone());
  Ok(t.clone())
}

fn unify_list(
  list1: &[Rc<Type>],
  list2: &[Rc<Type>],
  subst: &mut Substitution,
) -> Result<Vec<Rc<Type>>, StackableError> {
  let mut unified = Vec::with_capacity(list1.len());
  for (t1, t2) in list1.iter().zip(list2) {
    unified.push(unify_internal(t1, t2, subst)?);
  }
  Ok(unified)
}

fn unify_fn(
  f1: &FunctionType,
  f2: &FunctionType,
  subst: &mut Substitution,
) -> Result<FunctionType, StackableError> {
  if f1.parameter_types.len() != f2.parameter_types.len() {
    let mut error = StackableError::new();
    error.add_fn_param_arity_error(f1.parameter_types.len(), f2.parameter_types.len());
    return Err(error);
  }
  let parameter_types = unify_list(&f1.parameter_types, &f2.parameter_types, subst)?;
  let return_type = unify_internal(&f1.return_type, &f2.return_type, subst)?;
  Ok(FunctionType {
    parameter_types,
    return_type,
    constructor_name: f1.constructor_name.or(f2.constructor_name),
  })
}

fn unify_record(
  fields1: &[RecordField],
  fields2: &[RecordField],
  subst: &mut Substitution,
) -> Option<Result<Vec<RecordField>, StackableError>> {
  if fields1.len() != fields2.len() {
    return None;
  }
  let mut unified = Vec::with_capacity(fields1.len());
  for f1 in fields1 {
    let f2 = fields2.iter().find(|f2| f2.name == f1.name && f2.optional == f1.optional)?;
    match unify_internal(&f1.type_, &f2.type_, subst) {
      Ok(type_) => unified.push(RecordField { name: f1.name, type_, optional: f1.optional }),
      Err(e) => return Some(Err(e)),
    }
  }
  Some(Ok(unified))
}

/// Between two structurally equal types, prefer the one that is not a placeholder.
fn more_informative(t1: &Rc<Type>, t2: &Rc<Type>) -> Rc<Type> {
  if t1.is_placeholder() { t2.clone() } else { t1.clone() }
}

fn unify_internal(
  t1: &Rc<Type>,
  t2: &Rc<Type>,
  subst: &mut Substitution,
) -> Result<Rc<Type>, StackableError> {
  let t1 = &subst.apply(t1);
  let t2 = &subst.apply(t2);
  if t1.is_the_same_type(t2) {
    return Ok(more_informative(t1, t2));
  }
  match (t1.as_ref(), t2.as_ref()) {
    (Type::Primitive(PrimitiveTypeKind::Unknown), _) => Ok(t2.clone()),
    (_, Type::Primitive(PrimitiveTypeKind::Unknown)) => Ok(t1.clone()),
    (Type::Generic(name, type_arguments), _) if type_arguments.is_empty() => {
      bind(SubstitutionKey::Placeholder(*name), t1, t2, subst)
    }
    (_, Type::Generic(name, type_arguments)) if type_arguments.is_empty() => {
      bind(SubstitutionKey::Placeholder(*name), t2, t1, subst)
    }
    (Type::Generic(n1, args1), Type::Generic(n2, args2)) => {
      if n1 != n2 {
        return Err(incompatible(t1, t2));
      }
      if args1.len() != args2.len() {
        let mut error = StackableError::new();
        error.add_type_args_arity_error(args1.len(), args2.len());
        return Err(error.with_type_incompatibility(t1.to_description(), t2.to_description()));
      }
      unify_list(args1, args2, subst)
        .map(|type_arguments| Rc::new(Type::Generic(*n1, type_arguments)))
        .map_err(|e| e.with_type_incompatibility(t1.to_description(), t2.to_description()))
    }
    (Type::Adt(_), Type::Adt(_)) => Err(incompatible(t1, t2)),
    (Type::Var(v), _) => bind(SubstitutionKey::Var(v.id), t1, t2, subst),
    (_, Type::Var(v)) => bind(SubstitutionKey::Var(v.id), t2, t1, subst),
    (Type::Array(e1), Type::Array(e2)) => unify_internal(e1, e2, subst)
      .map(|e| Rc::new(Type::Array(e)))
      .map_err(|e| e.with_type_incompatibility(t1.to_description(), t2.to_description())),
    (Type::Fn(f1), Type::Fn(f2)) => unify_fn(f1, f2, subst)
      .map(|f| Rc::new(Type::Fn(f)))
      .map_err(|e| e.with_type_incompatibility(t1.to_description(), t2.to_description())),
    (Type::Tuple(elements1), Type::Tuple(elements2)) => {
      if elements1.len() != elements2.len() {
        let mut error = StackableError::new();
        error.add_tuple_arity_error(elements1.len(), elements2.len());
        return Err(error.with_type_incompatibility(t1.to_description(), t2.to_description()));
      }
      unify_list(elements1, elements2, subst)
        .map(|elements| Rc::new(Type::Tuple(elements)))
        .map_err(|e| e.with_type_incompatibility(t1.to_description(), t2.to_description()))
    }
    (Type::Record(fields1), Type::Record(fields2)) => match unify_record(fields1, fields2, subst) {
      None => Err(incompatible(t1, t2)),
      Some(result) => result
        .map(|fields| Rc::new(Type::Record(fields)))
        .map_err(|e| e.with_type_incompatibility(t1.to_description(), t2.to_description())),
    },
    (Type::TemplateElement(p1), Type::TemplateElement(p2)) => unify_internal(p1, p2, subst)
      .map(|props| Rc::new(Type::TemplateElement(props)))
      .map_err(|e| e.with_type_incompatibility(t1.to_description(), t2.to_description())),
    (Type::StringLiteral(_), Type::Primitive(PrimitiveTypeKind::String)) => Ok(t2.clone()),
    (Type::Primitive(PrimitiveTypeKind::String), Type::StringLiteral(_)) => Ok(t1.clone()),
    (Type::StringLiteral(v), Type::LiteralUnion(values)) if values.contains(v) => Ok(t2.clone()),
    (Type::LiteralUnion(values), Type::StringLiteral(v)) if values.contains(v) => Ok(t1.clone()),
    _ => Err(incompatible(t1, t2)),
  }
}

/// Makes `t1` and `t2` equal by extending `subst`, returning the unified type.
///
/// On failure `subst` may keep bindings made before the failing position; callers that need
/// atomicity unify in a fork.
pub fn unify(
  t1: &Rc<Type>,
  t2: &Rc<Type>,
  subst: &mut Substitution,
) -> Result<Rc<Type>, StackableError> {
  let result = unify_internal(t1, t2, subst);
  if let Err(e) = &result {
    tracing::trace!(occurs_check = e.is_occurs_check_failure(), "unification failed");
  }
  result
}
