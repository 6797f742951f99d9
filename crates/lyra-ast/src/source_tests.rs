#[cfg(test)]
mod tests {
  use super::super::source::{
    annotation, expr, pattern, test_builder::AstBuilder, Id, Literal, MatchingPattern, Statement,
  };
  use crate::Location;
  use lyra_heap::{Heap, ModuleReference, PStr};
  use pretty_assertions::assert_eq;
  use std::collections::HashSet;

  #[test]
  fn boilterplate() {
    assert!(!format!("{:?}", Id::from(PStr::LOWER_A).clone()).is_empty());
    assert_eq!(Literal::Bool(true), Literal::Bool(true).clone());
    assert!(!format!("{:?}", expr::UnaryOperator::NOT.clone()).is_empty());
    assert!(!format!("{:?}", annotation::PrimitiveTypeKind::Unit.clone()).is_empty());
  }

  #[test]
  fn record_annotation_field_names_tests() {
    let heap = &mut Heap::new();
    let builder = AstBuilder::new(heap, ModuleReference::DUMMY);
    let annot = builder.record_annot(vec![
      ("id", false, builder.number_annot()),
      ("name", true, builder.string_annot()),
    ]);
    let record = annot.as_record().unwrap();
    let names: Vec<Id> = record.fields.iter().map(|f| f.name).collect();
    assert_eq!(builder.str("id"), names[0].name);
    assert_eq!(builder.str("name"), names[1].name);
    assert!(!record.fields[0].optional);
    assert!(record.fields[1].optional);
    assert_ne!(names[0].loc, names[1].loc);
  }

  #[test]
  fn literal_pretty_print_tests() {
    let heap = &mut Heap::new();
    assert_eq!("true", Literal::Bool(true).pretty_print(heap));
    assert_eq!("42", Literal::Number(42.0).pretty_print(heap));
    assert_eq!("1.5", Literal::Number(1.5).pretty_print(heap));
    let hi = heap.alloc_str_for_test("hi");
    assert_eq!("\"hi\"", Literal::String(hi).pretty_print(heap));
  }

  #[test]
  fn operator_text_tests() {
    assert_eq!("!", expr::UnaryOperator::NOT.as_str());
    assert_eq!("-", expr::UnaryOperator::NEG.as_str());
    let all = [
      expr::BinaryOperator::MUL,
      expr::BinaryOperator::DIV,
      expr::BinaryOperator::MOD,
      expr::BinaryOperator::PLUS,
      expr::BinaryOperator::MINUS,
      expr::BinaryOperator::LT,
      expr::BinaryOperator::LE,
      expr::BinaryOperator::GT,
      expr::BinaryOperator::GE,
      expr::BinaryOperator::EQ,
      expr::BinaryOperator::NE,
      expr::BinaryOperator::AND,
      expr::BinaryOperator::OR,
    ];
    assert_eq!(
      "* / % + - < <= > >= == != && ||",
      all.iter().map(|o| o.as_str()).collect::<Vec<_>>().join(" ")
    );
  }

  #[test]
  fn builder_gives_every_node_a_distinct_location() {
    let heap = &mut Heap::new();
    let builder = AstBuilder::new(heap, ModuleReference::DUMMY);
    let nodes = vec![
      builder.number(1.0),
      builder.string("a"),
      builder.boolean(true),
      builder.var("x"),
      builder.array(vec![]),
      builder.record(vec![]),
      builder.lambda(&["x"], builder.var("x")),
      builder.call(builder.var("f"), vec![]),
      builder.field(builder.var("r"), "a"),
      builder.index(builder.var("r"), builder.number(0.0)),
      builder.unary(expr::UnaryOperator::NEG, builder.number(1.0)),
      builder.binary(expr::BinaryOperator::PLUS, builder.number(1.0), builder.number(2.0)),
      builder.if_else(builder.boolean(true), builder.number(1.0), None),
      builder.match_(builder.var("x"), vec![(builder.wildcard_pattern(), builder.number(1.0))]),
      builder.block(vec![], None),
      builder.paren(builder.number(1.0)),
      builder.element("div", vec![], vec![]),
      builder.record_shorthand(&["a"]),
    ];
    let locations = nodes.iter().map(expr::E::loc).collect::<HashSet<Location>>();
    assert_eq!(nodes.len(), locations.len());
    assert!(locations.iter().all(|l| l.module_reference == ModuleReference::DUMMY));
  }

  #[test]
  fn statement_and_pattern_accessor_tests() {
    let heap = &mut Heap::new();
    let builder = AstBuilder::new(heap, ModuleReference::DUMMY);
    let let_stmt = builder.let_("a", None, builder.number(1.0));
    let object_stmt =
      builder.let_object(vec![("id", None), ("name", Some("n"))], None, builder.var("u"));
    let array_stmt = builder.let_array(&["x", "y"], None, builder.var("arr"));
    let type_stmt = builder.type_alias("A", &[], builder.number_annot());
    let sum_stmt = builder.sum_type("B", &["T"], vec![("C", None)]);
    let import_stmt = builder.import(&["a"], "./a");
    let export_stmt = builder.export(builder.let_("b", None, builder.number(1.0)));
    let export_names = builder.export_names(&["a"]);
    let expression_stmt = builder.expression_statement(builder.number(3.0));
    let module = builder.module(vec![
      let_stmt, object_stmt, array_stmt, type_stmt, sum_stmt, import_stmt, export_stmt,
      export_names, expression_stmt,
    ]);
    let locations = module.statements.iter().map(Statement::loc).collect::<HashSet<_>>();
    assert_eq!(9, locations.len());

    let bound_count =
      |s: &Statement| s.as_assignment().map(|a| a.binding.bound_names().len()).unwrap_or(0);
    assert_eq!(1, bound_count(&module.statements[0]));
    assert_eq!(2, bound_count(&module.statements[1]));
    assert_eq!(2, bound_count(&module.statements[2]));
    assert_eq!(0, bound_count(&module.statements[3]));
    let object_binding = &module.statements[1].as_assignment().unwrap().binding;
    assert!(matches!(object_binding, pattern::Binding::Object(_, _)));
    assert_ne!(object_binding.loc(), module.statements[1].loc());
  }

  #[test]
  fn bound_name_prefers_alias() {
    let heap = &mut Heap::new();
    let builder = AstBuilder::new(heap, ModuleReference::DUMMY);
    let field = pattern::ObjectPatternField {
      loc: builder.loc(),
      field_name: builder.id("name"),
      alias: Some(builder.id("n")),
    };
    assert_eq!(builder.str("n"), field.bound_name().name);
    let shorthand =
      pattern::ObjectPatternField { loc: builder.loc(), field_name: builder.id("id"), alias: None };
    assert_eq!(builder.str("id"), shorthand.bound_name().name);
  }

  #[test]
  fn annotation_and_pattern_location_tests() {
    let heap = &mut Heap::new();
    let builder = AstBuilder::new(heap, ModuleReference::DUMMY);
    let annotations = vec![
      builder.string_annot(),
      builder.boolean_annot(),
      builder.unit_annot(),
      builder.unknown_annot(),
      builder.simple_id_annot("T"),
      builder.fn_annot(vec![], builder.unit_annot()),
      builder.record_annot(vec![("a", true, builder.number_annot())]),
      builder.tuple_annot(vec![]),
      builder.array_annot(builder.number_annot()),
      builder.string_literal_annot("a"),
      builder.literal_union_annot(&["a", "b"]),
    ];
    let locations = annotations.iter().map(annotation::T::location).collect::<HashSet<_>>();
    assert_eq!(annotations.len(), locations.len());

    let patterns = vec![
      builder.wildcard_pattern(),
      builder.id_pattern("x"),
      builder.bool_pattern(true),
      builder.number_pattern(1.0),
      builder.string_pattern("s"),
      builder.ctor_pattern("Some", Some(builder.wildcard_pattern())),
    ];
    let locations = patterns.iter().map(MatchingPattern::loc).collect::<HashSet<_>>();
    assert_eq!(patterns.len(), locations.len());
  }
}
