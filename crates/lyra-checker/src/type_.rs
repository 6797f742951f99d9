use enum_as_inner::EnumAsInner;
use itertools::Itertools;
use lyra_ast::Description;
use lyra_heap::{Heap, PStr};
use std::rc::Rc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveTypeKind {
  String,
  Number,
  Boolean,
  Unit,
  Unknown,
}

impl PrimitiveTypeKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::String => "string",
      Self::Number => "number",
      Self::Boolean => "boolean",
      Self::Unit => "unit",
      Self::Unknown => "unknown",
    }
  }

  pub fn to_description(self) -> Description {
    match self {
      Self::String => Description::StringType,
      Self::Number => Description::NumberType,
      Self::Boolean => Description::BooleanType,
      Self::Unit => Description::UnitType,
      Self::Unknown => Description::UnknownType,
    }
  }
}

pub trait ISourceType {
  fn pretty_print(&self, heap: &Heap) -> String;
  fn to_description(&self) -> Description;
  fn is_the_same_type(&self, other: &Self) -> bool;
}

/// An inference variable. Identity is the id alone; the name is kept for display.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVariable {
  pub id: u32,
  pub name: PStr,
}

impl TypeVariable {
  fn to_description(self) -> Description {
    Description::TypeVariable { name: self.name, id: self.id }
  }

  fn pretty_print(self, heap: &Heap) -> String {
    if self.name == PStr::EMPTY {
      format!("t{}", self.id)
    } else {
      self.name.as_str(heap).to_string()
    }
  }
}

#[derive(Debug, Clone)]
pub struct FunctionType {
  pub parameter_types: Vec<Rc<Type>>,
  pub return_type: Rc<Type>,
  /// Set when the function is the constructor of an ADT variant.
  pub constructor_name: Option<PStr>,
}

impl ISourceType for FunctionType {
  fn pretty_print(&self, heap: &Heap) -> String {
    format!(
      "({}) => {}",
      self.parameter_types.iter().map(|it| it.pretty_print(heap)).join(", "),
      self.return_type.pretty_print(heap)
    )
  }

  fn to_description(&self) -> Description {
    Description::FunctionType(
      self.parameter_types.iter().map(|it| it.to_description()).collect(),
      Box::new(self.return_type.to_description()),
    )
  }

  fn is_the_same_type(&self, other: &Self) -> bool {
    self.parameter_types.len() == other.parameter_types.len()
      && self
        .parameter_types
        .iter()
        .zip(&other.parameter_types)
        .all(|(a, b)| a.is_the_same_type(b))
      && self.return_type.is_the_same_type(&other.return_type)
  }
}

#[derive(Debug, Clone)]
pub struct RecordField {
  pub name: PStr,
  pub type_: Rc<Type>,
  pub optional: bool,
}

#[derive(Debug, Clone, EnumAsInner)]
pub enum Type {
  Primitive(PrimitiveTypeKind),
  Fn(FunctionType),
  /// Fields in declaration order.
  Record(Vec<RecordField>),
  Tuple(Vec<Rc<Type>>),
  Array(Rc<Type>),
  Adt(PStr),
  /// A generic instance. Zero type arguments marks a placeholder for a not yet resolved name.
  Generic(PStr, Vec<Rc<Type>>),
  Var(TypeVariable),
  StringLiteral(PStr),
  LiteralUnion(Vec<PStr>),
  /// Props are always a record.
  TemplateElement(Rc<Type>),
}

impl Type {
  pub fn string_type() -> Rc<Type> {
    Rc::new(Type::Primitive(PrimitiveTypeKind::String))
  }

  pub fn number_type() -> Rc<Type> {
    Rc::new(Type::Primitive(PrimitiveTypeKind::Number))
  }

  pub fn boolean_type() -> Rc<Type> {
    Rc::new(Type::Primitive(PrimitiveTypeKind::Boolean))
  }

  pub fn unit_type() -> Rc<Type> {
    Rc::new(Type::Primitive(PrimitiveTypeKind::Unit))
  }

  pub fn unknown_type() -> Rc<Type> {
    Rc::new(Type::Primitive(PrimitiveTypeKind::Unknown))
  }

  pub fn option_type(t: Rc<Type>) -> Rc<Type> {
    Rc::new(Type::Generic(PStr::OPTION, vec![t]))
  }

  pub fn fn_type(parameter_types: Vec<Rc<Type>>, return_type: Rc<Type>) -> Rc<Type> {
    Rc::new(Type::Fn(FunctionType { parameter_types, return_type, constructor_name: None }))
  }

  pub fn is_unknown(&self) -> bool {
    matches!(self, Type::Primitive(PrimitiveTypeKind::Unknown))
  }

  pub fn is_placeholder(&self) -> bool {
    matches!(self, Type::Generic(_, type_arguments) if type_arguments.is_empty())
  }

  pub fn find_field(&self, name: PStr) -> Option<&RecordField> {
    self.as_record().and_then(|fields| fields.iter().find(|f| f.name == name))
  }
}

fn record_fields_pretty_print(fields: &[RecordField], heap: &Heap) -> String {
  if fields.is_empty() {
    return "{}".to_string();
  }
  format!(
    "{{ {} }}",
    fields
      .iter()
      .map(|f| format!(
        "{}{}: {}",
        f.name.as_str(heap),
        if f.optional { "?" } else { "" },
        f.type_.pretty_print(heap)
      ))
      .join(", ")
  )
}

fn same_type_list(list1: &[Rc<Type>], list2: &[Rc<Type>]) -> bool {
  list1.len() == list2.len() && list1.iter().zip(list2).all(|(a, b)| a.is_the_same_type(b))
}

impl ISourceType for Type {
  fn pretty_print(&self, heap: &Heap) -> String {
    match self {
      Type::Primitive(kind) => kind.as_str().to_string(),
      Type::Fn(f) => f.pretty_print(heap),
      Type::Record(fields) => record_fields_pretty_print(fields, heap),
      Type::Tuple(elements) => {
        format!("[{}]", elements.iter().map(|it| it.pretty_print(heap)).join(", "))
      }
      Type::Array(element) => format!("Array<{}>", element.pretty_print(heap)),
      Type::Adt(name) => name.as_str(heap).to_string(),
      Type::Generic(name, type_arguments) if type_arguments.is_empty() => {
        name.as_str(heap).to_string()
      }
      Type::Generic(name, type_arguments) => format!(
        "{}<{}>",
        name.as_str(heap),
        type_arguments.iter().map(|it| it.pretty_print(heap)).join(", ")
      ),
      Type::Var(v) => v.pretty_print(heap),
      Type::StringLiteral(value) => format!("\"{}\"", value.as_str(heap)),
      Type::LiteralUnion(values) => {
        values.iter().map(|v| format!("\"{}\"", v.as_str(heap))).join(" | ")
      }
      Type::TemplateElement(props) => format!("Element<{}>", props.pretty_print(heap)),
    }
  }

  fn to_description(&self) -> Description {
    match self {
      Type::Primitive(kind) => kind.to_description(),
      Type::Fn(f) => f.to_description(),
      Type::Record(fields) => Description::RecordType(
        fields.iter().map(|f| (f.name, f.optional, f.type_.to_description())).collect(),
      ),
      Type::Tuple(elements) => {
        Description::TupleType(elements.iter().map(|it| it.to_description()).collect())
      }
      Type::Array(element) => Description::ArrayType(Box::new(element.to_description())),
      Type::Adt(name) => Description::AdtType(*name),
      Type::Generic(name, type_arguments) => Description::GenericType {
        name: *name,
        type_args: type_arguments.iter().map(|it| it.to_description()).collect(),
      },
      Type::Var(v) => v.to_description(),
      Type::StringLiteral(value) => Description::StringLiteralType(*value),
      Type::LiteralUnion(values) => Description::LiteralUnionType(values.clone()),
      Type::TemplateElement(props) => Description::ElementType(Box::new(props.to_description())),
    }
  }

  fn is_the_same_type(&self, other: &Self) -> bool {
    match (self, other) {
      (Type::Primitive(k1), Type::Primitive(k2)) => k1 == k2,
      (Type::Fn(f1), Type::Fn(f2)) => f1.is_the_same_type(f2),
      (Type::Record(fields1), Type::Record(fields2)) => {
        fields1.len() == fields2.len()
          && fields1.iter().all(|f1| {
            fields2.iter().any(|f2| {
              f1.name == f2.name
                && f1.optional == f2.optional
                && f1.type_.is_the_same_type(&f2.type_)
            })
          })
      }
      (Type::Tuple(elements1), Type::Tuple(elements2)) => same_type_list(elements1, elements2),
      (Type::Array(e1), Type::Array(e2)) => e1.is_the_same_type(e2),
      (Type::Adt(n1), Type::Adt(n2)) => n1 == n2,
      (Type::Generic(n1, args1), Type::Generic(n2, args2)) => {
        if args1.is_empty() || args2.is_empty() {
          n1 == n2
        } else {
          n1 == n2 && same_type_list(args1, args2)
        }
      }
      (Type::Var(v1), Type::Var(v2)) => v1.id == v2.id,
      (Type::StringLiteral(v1), Type::StringLiteral(v2)) => v1 == v2,
      (Type::LiteralUnion(values1), Type::LiteralUnion(values2)) => {
        values1.iter().all(|v| values2.contains(v)) && values2.iter().all(|v| values1.contains(v))
      }
      (Type::TemplateElement(p1), Type::TemplateElement(p2)) => p1.is_the_same_type(p2),
      _ => false,
    }
  }
}

pub mod test_type_builder {
  use super::*;

  pub struct TypeBuilder;

  impl TypeBuilder {
    pub fn string_type(&self) -> Rc<Type> {
      Type::string_type()
    }

    pub fn number_type(&self) -> Rc<Type> {
      Type::number_type()
    }

    pub fn boolean_type(&self) -> Rc<Type> {
      Type::boolean_type()
    }

    pub fn unit_type(&self) -> Rc<Type> {
      Type::unit_type()
    }

    pub fn unknown_type(&self) -> Rc<Type> {
      Type::unknown_type()
    }

    pub fn var(&self, id: u32) -> Rc<Type> {
      Rc::new(Type::Var(TypeVariable { id, name: PStr::EMPTY }))
    }

    pub fn named_var(&self, id: u32, name: PStr) -> Rc<Type> {
      Rc::new(Type::Var(TypeVariable { id, name }))
    }

    pub fn fun_type(&self, parameter_types: Vec<Rc<Type>>, return_type: Rc<Type>) -> Rc<Type> {
      Type::fn_type(parameter_types, return_type)
    }

    pub fn array_type(&self, element: Rc<Type>) -> Rc<Type> {
      Rc::new(Type::Array(element))
    }

    pub fn tuple_type(&self, elements: Vec<Rc<Type>>) -> Rc<Type> {
      Rc::new(Type::Tuple(elements))
    }

    /// Fields are `(name, optional, type)`.
    pub fn record_type(&self, fields: Vec<(PStr, bool, Rc<Type>)>) -> Rc<Type> {
      Rc::new(Type::Record(
        fields
          .into_iter()
          .map(|(name, optional, type_)| RecordField { name, type_, optional })
          .collect(),
      ))
    }

    pub fn adt_type(&self, name: PStr) -> Rc<Type> {
      Rc::new(Type::Adt(name))
    }

    pub fn generic_type(&self, name: PStr, type_arguments: Vec<Rc<Type>>) -> Rc<Type> {
      Rc::new(Type::Generic(name, type_arguments))
    }

    pub fn option_type(&self, t: Rc<Type>) -> Rc<Type> {
      Type::option_type(t)
    }

    pub fn string_literal_type(&self, value: PStr) -> Rc<Type> {
      Rc::new(Type::StringLiteral(value))
    }

    pub fn literal_union_type(&self, values: Vec<PStr>) -> Rc<Type> {
      Rc::new(Type::LiteralUnion(values))
    }

    pub fn element_type(&self, props: Rc<Type>) -> Rc<Type> {
      Rc::new(Type::TemplateElement(props))
    }
  }

  pub fn create() -> TypeBuilder {
    TypeBuilder
  }
}

#[cfg(test)]
mod type_tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn boilterplate() {
    let builder = test_type_builder::create();
    assert!(!format!("{:?}", builder.number_type().clone()).is_empty());
    assert!(builder.number_type().as_primitive().is_some());
    assert!(builder.fun_type(vec![], builder.unit_type()).as_fn().is_some());
    assert!(builder.var(0).as_var().is_some());
    assert_eq!(PrimitiveTypeKind::Unit, PrimitiveTypeKind::Unit.clone());
    assert!(builder.unknown_type().is_unknown());
    assert!(builder.generic_type(PStr::UPPER_A, vec![]).is_placeholder());
    assert!(!builder.option_type(builder.number_type()).is_placeholder());
  }

  #[test]
  fn pretty_print_tests() {
    let builder = test_type_builder::create();
    let heap = &mut Heap::new();

    assert_eq!("string", builder.string_type().pretty_print(heap));
    assert_eq!("number", builder.number_type().pretty_print(heap));
    assert_eq!("boolean", builder.boolean_type().pretty_print(heap));
    assert_eq!("unit", builder.unit_type().pretty_print(heap));
    assert_eq!("unknown", builder.unknown_type().pretty_print(heap));
    assert_eq!(
      "(number, string) => unit",
      builder
        .fun_type(vec![builder.number_type(), builder.string_type()], builder.unit_type())
        .pretty_print(heap)
    );
    assert_eq!("{}", builder.record_type(vec![]).pretty_print(heap));
    let id = heap.alloc_str_for_test("id");
    let name = heap.alloc_str_for_test("name");
    assert_eq!(
      "{ id: number, name?: string }",
      builder
        .record_type(vec![(id, false, builder.number_type()), (name, true, builder.string_type())])
        .pretty_print(heap)
    );
    assert_eq!(
      "[number, string]",
      builder.tuple_type(vec![builder.number_type(), builder.string_type()]).pretty_print(heap)
    );
    assert_eq!("Array<number>", builder.array_type(builder.number_type()).pretty_print(heap));
    assert_eq!("A", builder.adt_type(PStr::UPPER_A).pretty_print(heap));
    assert_eq!("A", builder.generic_type(PStr::UPPER_A, vec![]).pretty_print(heap));
    assert_eq!(
      "Result<number, string>",
      builder
        .generic_type(PStr::RESULT, vec![builder.number_type(), builder.string_type()])
        .pretty_print(heap)
    );
    assert_eq!("t3", builder.var(3).pretty_print(heap));
    assert_eq!("T", builder.named_var(3, PStr::UPPER_T).pretty_print(heap));
    assert_eq!("\"a\"", builder.string_literal_type(PStr::LOWER_A).pretty_print(heap));
    assert_eq!(
      "\"a\" | \"b\"",
      builder.literal_union_type(vec![PStr::LOWER_A, PStr::LOWER_B]).pretty_print(heap)
    );
    assert_eq!("Element<{}>", builder.element_type(builder.record_type(vec![])).pretty_print(heap));
  }

  #[test]
  fn to_description_tests() {
    let builder = test_type_builder::create();
    let heap = &Heap::new();
    let t = builder.fun_type(
      vec![
        builder.option_type(builder.named_var(0, PStr::UPPER_T)),
        builder.record_type(vec![(PStr::LOWER_A, true, builder.boolean_type())]),
        builder.tuple_type(vec![builder.adt_type(PStr::UPPER_B), builder.unknown_type()]),
      ],
      builder.element_type(builder.record_type(vec![])),
    );
    assert_eq!(t.pretty_print(heap), t.to_description().pretty_print(heap));
    let t = builder.array_type(builder.literal_union_type(vec![PStr::LOWER_A]));
    assert_eq!(t.pretty_print(heap), t.to_description().pretty_print(heap));
    let t = builder.string_literal_type(PStr::LOWER_B);
    assert_eq!(t.pretty_print(heap), t.to_description().pretty_print(heap));
    assert_eq!("unit", builder.unit_type().to_description().pretty_print(heap));
    assert_eq!("string", builder.string_type().to_description().pretty_print(heap));
    assert_eq!("number", builder.number_type().to_description().pretty_print(heap));
  }

  #[test]
  fn is_the_same_type_tests() {
    let builder = test_type_builder::create();

    assert!(builder.number_type().is_the_same_type(&builder.number_type()));
    assert!(!builder.number_type().is_the_same_type(&builder.string_type()));
    assert!(builder.var(1).is_the_same_type(&builder.named_var(1, PStr::UPPER_T)));
    assert!(!builder.var(1).is_the_same_type(&builder.var(2)));
    assert!(builder.adt_type(PStr::UPPER_A).is_the_same_type(&builder.adt_type(PStr::UPPER_A)));
    assert!(!builder.adt_type(PStr::UPPER_A).is_the_same_type(&builder.adt_type(PStr::UPPER_B)));

    let option_number = builder.option_type(builder.number_type());
    let option_string = builder.option_type(builder.string_type());
    assert!(option_number.is_the_same_type(&builder.option_type(builder.number_type())));
    assert!(!option_number.is_the_same_type(&option_string));
    assert!(option_number.is_the_same_type(&builder.generic_type(PStr::OPTION, vec![])));
    assert!(!option_number.is_the_same_type(&builder.generic_type(PStr::RESULT, vec![])));

    let f1 = builder.fun_type(vec![builder.number_type()], builder.unit_type());
    let mut f2 = f1.as_fn().unwrap().clone();
    f2.constructor_name = Some(PStr::SOME);
    assert!(f1.is_the_same_type(&Type::Fn(f2)));
    assert!(!f1.is_the_same_type(&builder.fun_type(vec![], builder.unit_type())));
    assert!(
      !f1.is_the_same_type(&builder.fun_type(vec![builder.number_type()], builder.number_type()))
    );

    let r1 = builder.record_type(vec![
      (PStr::LOWER_A, false, builder.number_type()),
      (PStr::LOWER_B, true, builder.string_type()),
    ]);
    let r2 = builder.record_type(vec![
      (PStr::LOWER_B, true, builder.string_type()),
      (PStr::LOWER_A, false, builder.number_type()),
    ]);
    let r3 = builder.record_type(vec![
      (PStr::LOWER_B, false, builder.string_type()),
      (PStr::LOWER_A, false, builder.number_type()),
    ]);
    assert!(r1.is_the_same_type(&r2));
    assert!(!r1.is_the_same_type(&r3));
    assert!(!r1.is_the_same_type(&builder.record_type(vec![])));

    assert!(
      builder
        .tuple_type(vec![builder.number_type()])
        .is_the_same_type(&builder.tuple_type(vec![builder.number_type()]))
    );
    assert!(
      !builder
        .tuple_type(vec![builder.number_type()])
        .is_the_same_type(&builder.tuple_type(vec![]))
    );
    assert!(
      builder
        .array_type(builder.number_type())
        .is_the_same_type(&builder.array_type(builder.number_type()))
    );
    assert!(
      builder
        .literal_union_type(vec![PStr::LOWER_A, PStr::LOWER_B])
        .is_the_same_type(&builder.literal_union_type(vec![PStr::LOWER_B, PStr::LOWER_A]))
    );
    assert!(
      !builder
        .literal_union_type(vec![PStr::LOWER_A])
        .is_the_same_type(&builder.literal_union_type(vec![PStr::LOWER_B, PStr::LOWER_A]))
    );
    assert!(
      builder
        .string_literal_type(PStr::LOWER_A)
        .is_the_same_type(&builder.string_literal_type(PStr::LOWER_A))
    );
    assert!(
      builder
        .element_type(builder.record_type(vec![]))
        .is_the_same_type(&builder.element_type(builder.record_type(vec![])))
    );
    assert!(!builder.number_type().is_the_same_type(&builder.array_type(builder.number_type())));
  }

  #[test]
  fn find_field_tests() {
    let builder = test_type_builder::create();
    let r = builder.record_type(vec![(PStr::LOWER_A, true, builder.number_type())]);
    assert!(r.find_field(PStr::LOWER_A).unwrap().optional);
    assert!(r.find_field(PStr::LOWER_B).is_none());
    assert!(builder.number_type().find_field(PStr::LOWER_A).is_none());
  }
}
