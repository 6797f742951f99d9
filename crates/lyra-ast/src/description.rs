use itertools::Itertools;
use lyra_heap::{Heap, PStr};

/// Heap-free structural rendering of a type or pattern, stored inside diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Description {
  StringType,
  NumberType,
  BooleanType,
  UnitType,
  UnknownType,
  GeneralFunctionType,
  GeneralRecordType,
  GeneralIndexableType,
  FunctionType(Vec<Description>, Box<Description>),
  RecordType(Vec<(PStr, bool, Description)>),
  TupleType(Vec<Description>),
  ArrayType(Box<Description>),
  AdtType(PStr),
  GenericType { name: PStr, type_args: Vec<Description> },
  TypeVariable { name: PStr, id: u32 },
  StringLiteralType(PStr),
  LiteralUnionType(Vec<PStr>),
  ElementType(Box<Description>),
  WildcardPattern,
  BooleanPattern(bool),
  VariantPattern { name: PStr, has_payload: bool },
}

impl Description {
  pub fn pretty_print(&self, heap: &Heap) -> String {
    match self {
      Self::StringType => "string".to_string(),
      Self::NumberType => "number".to_string(),
      Self::BooleanType => "boolean".to_string(),
      Self::UnitType => "unit".to_string(),
      Self::UnknownType => "unknown".to_string(),
      Self::GeneralFunctionType => "function type".to_string(),
      Self::GeneralRecordType => "record type".to_string(),
      Self::GeneralIndexableType => "array or tuple type".to_string(),
      Self::FunctionType(param_types, return_type) => format!(
        "({}) => {}",
        param_types.iter().map(|t| t.pretty_print(heap)).join(", "),
        return_type.pretty_print(heap)
      ),
      Self::RecordType(fields) if fields.is_empty() => "{}".to_string(),
      Self::RecordType(fields) => format!(
        "{{ {} }}",
        fields
          .iter()
          .map(|(name, optional, t)| format!(
            "{}{}: {}",
            name.as_str(heap),
            if *optional { "?" } else { "" },
            t.pretty_print(heap)
          ))
          .join(", ")
      ),
      Self::TupleType(elements) => {
        format!("[{}]", elements.iter().map(|t| t.pretty_print(heap)).join(", "))
      }
      Self::ArrayType(element) => format!("Array<{}>", element.pretty_print(heap)),
      Self::AdtType(name) => name.as_str(heap).to_string(),
      Self::GenericType { name, type_args } if type_args.is_empty() => {
        name.as_str(heap).to_string()
      }
      Self::GenericType { name, type_args } => format!(
        "{}<{}>",
        name.as_str(heap),
        type_args.iter().map(|t| t.pretty_print(heap)).join(", ")
      ),
      Self::TypeVariable { name, id } if *name == PStr::EMPTY => format!("t{id}"),
      Self::TypeVariable { name, id: _ } => name.as_str(heap).to_string(),
      Self::StringLiteralType(value) => format!("\"{}\"", value.as_str(heap)),
      Self::LiteralUnionType(values) => {
        values.iter().map(|v| format!("\"{}\"", v.as_str(heap))).join(" | ")
      }
      Self::ElementType(props) => format!("Element<{}>", props.pretty_print(heap)),
      Self::WildcardPattern => "_".to_string(),
      Self::BooleanPattern(b) => b.to_string(),
      Self::VariantPattern { name, has_payload: true } => format!("{}(_)", name.as_str(heap)),
      Self::VariantPattern { name, has_payload: false } => name.as_str(heap).to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn boilterplate() {
    assert!(!format!("{:?}", Description::UnitType.clone()).is_empty());
    assert!(Description::UnitType <= Description::UnitType);
    assert_eq!(Description::UnitType.cmp(&Description::UnitType), std::cmp::Ordering::Equal);
  }

  #[test]
  fn primitive_and_general_desc_tests() {
    let heap = &Heap::new();
    assert_eq!("string", Description::StringType.pretty_print(heap));
    assert_eq!("number", Description::NumberType.pretty_print(heap));
    assert_eq!("boolean", Description::BooleanType.pretty_print(heap));
    assert_eq!("unit", Description::UnitType.pretty_print(heap));
    assert_eq!("unknown", Description::UnknownType.pretty_print(heap));
    assert_eq!("function type", Description::GeneralFunctionType.pretty_print(heap));
    assert_eq!("record type", Description::GeneralRecordType.pretty_print(heap));
    assert_eq!("array or tuple type", Description::GeneralIndexableType.pretty_print(heap));
  }

  #[test]
  fn compound_desc_tests() {
    let heap = &Heap::new();
    assert_eq!(
      "(number, string) => unit",
      Description::FunctionType(
        vec![Description::NumberType, Description::StringType],
        Box::new(Description::UnitType)
      )
      .pretty_print(heap)
    );
    assert_eq!("{}", Description::RecordType(vec![]).pretty_print(heap));
    assert_eq!(
      "{ a: number, b?: string }",
      Description::RecordType(vec![
        (PStr::LOWER_A, false, Description::NumberType),
        (PStr::LOWER_B, true, Description::StringType)
      ])
      .pretty_print(heap)
    );
    assert_eq!(
      "[number, boolean]",
      Description::TupleType(vec![Description::NumberType, Description::BooleanType])
        .pretty_print(heap)
    );
    assert_eq!(
      "Array<number>",
      Description::ArrayType(Box::new(Description::NumberType)).pretty_print(heap)
    );
    assert_eq!("A", Description::AdtType(PStr::UPPER_A).pretty_print(heap));
    assert_eq!(
      "Option",
      Description::GenericType { name: PStr::OPTION, type_args: vec![] }.pretty_print(heap)
    );
    assert_eq!(
      "Result<number, string>",
      Description::GenericType {
        name: PStr::RESULT,
        type_args: vec![Description::NumberType, Description::StringType]
      }
      .pretty_print(heap)
    );
    assert_eq!("T", Description::TypeVariable { name: PStr::UPPER_T, id: 3 }.pretty_print(heap));
    assert_eq!("t3", Description::TypeVariable { name: PStr::EMPTY, id: 3 }.pretty_print(heap));
    assert_eq!("\"a\"", Description::StringLiteralType(PStr::LOWER_A).pretty_print(heap));
    assert_eq!(
      "\"a\" | \"b\"",
      Description::LiteralUnionType(vec![PStr::LOWER_A, PStr::LOWER_B]).pretty_print(heap)
    );
    assert_eq!(
      "Element<{}>",
      Description::ElementType(Box::new(Description::RecordType(vec![]))).pretty_print(heap)
    );
  }

  #[test]
  fn pattern_desc_tests() {
    let heap = &Heap::new();
    assert_eq!("_", Description::WildcardPattern.pretty_print(heap));
    assert_eq!("false", Description::BooleanPattern(false).pretty_print(heap));
    assert_eq!(
      "Some(_)",
      Description::VariantPattern { name: PStr::SOME, has_payload: true }.pretty_print(heap)
    );
    assert_eq!(
      "None",
      Description::VariantPattern { name: PStr::NONE, has_payload: false }.pretty_print(heap)
    );
  }
}
