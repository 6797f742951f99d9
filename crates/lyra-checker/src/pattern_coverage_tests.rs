#[cfg(test)]
mod tests {
  use crate::{
    constructors::{AdtDefinition, ConstructorCatalog},
    instantiation::TypeVariableGenerator,
    pattern_coverage::{
      canonical_pattern_string, classify_pattern, CoverageKind, MatchCoverage, PatternInfo,
    },
    type_::test_type_builder,
  };
  use lyra_ast::{
    Location,
    source::{test_builder::AstBuilder, MatchingPattern},
  };
  use lyra_heap::{Heap, ModuleReference, PStr};
  use pretty_assertions::assert_eq;

  /// Runs every pattern through a fresh coverage state. Returns the reachability of each arm and
  /// the printed missing cases.
  fn run(
    heap: &Heap,
    catalog: &ConstructorCatalog,
    matched: &crate::Type,
    patterns: &[MatchingPattern],
  ) -> (Vec<bool>, Vec<String>) {
    let mut coverage = MatchCoverage::new(matched, catalog);
    let reachability = patterns
      .iter()
      .map(|p| {
        coverage.process(
          canonical_pattern_string(p, matched, catalog, heap),
          &classify_pattern(p, matched, catalog),
        )
      })
      .collect();
    let missing = coverage.missing_cases().iter().map(|d| d.pretty_print(heap)).collect();
    (reachability, missing)
  }

  #[test]
  fn boilterplate() {
    let catalog = ConstructorCatalog::with_builtins(&mut TypeVariableGenerator::new());
    let coverage = MatchCoverage::new(&test_type_builder::create().number_type(), &catalog);
    assert!(!format!("{:?} {:?}", coverage, PatternInfo::Wildcard.clone()).is_empty());
    assert_eq!(CoverageKind::Number, coverage.kind().clone());
  }

  #[test]
  fn classification_tests() {
    let mut heap = Heap::new();
    let builder = test_type_builder::create();
    let nested_option = builder.option_type(builder.option_type(builder.number_type()));
    let catalog = ConstructorCatalog::with_builtins(&mut TypeVariableGenerator::new());
    let b = AstBuilder::new(&mut heap, ModuleReference::DUMMY);
    let patterns = vec![
      b.ctor_pattern("None", None),
      b.id_pattern("None"),
      b.ctor_pattern("Some", Some(b.id_pattern("x"))),
      b.ctor_pattern("Some", Some(b.wildcard_pattern())),
      b.ctor_pattern("Some", Some(b.number_pattern(42.0))),
      b.ctor_pattern("Some", Some(b.ctor_pattern("Ok", Some(b.id_pattern("y"))))),
      b.ctor_pattern("Some", Some(b.id_pattern("None"))),
      b.string_pattern("s"),
      b.wildcard_pattern(),
      b.id_pattern("Some"),
      b.id_pattern("value"),
    ];
    drop(b);
    let infos =
      patterns.iter().map(|p| classify_pattern(p, &nested_option, &catalog)).collect::<Vec<_>>();
    assert_eq!(PatternInfo::AdtBare(PStr::NONE), infos[0]);
    assert_eq!(PatternInfo::AdtBare(PStr::NONE), infos[1]);
    assert_eq!(PatternInfo::AdtParam(PStr::SOME), infos[2]);
    assert_eq!(PatternInfo::AdtWildcard(PStr::SOME), infos[3]);
    assert_eq!(PatternInfo::AdtLiteral(PStr::SOME), infos[4]);
    assert_eq!(PatternInfo::AdtLiteral(PStr::SOME), infos[5]);
    assert_eq!(PatternInfo::AdtLiteral(PStr::SOME), infos[6]);
    assert!(matches!(infos[7], PatternInfo::Literal(_)));
    assert_eq!(PatternInfo::Wildcard, infos[8]);
    assert_eq!(PatternInfo::Variable, infos[9]);
    assert_eq!(PatternInfo::Variable, infos[10]);

    let strings = patterns
      .iter()
      .map(|p| canonical_pattern_string(p, &nested_option, &catalog, &heap))
      .collect::<Vec<_>>();
    assert_eq!(
      vec![
        "None",
        "None",
        "Some(_)",
        "Some(_)",
        "Some(42)",
        "Some(Ok(_))",
        "Some(None)",
        "\"s\"",
        "_",
        "_",
        "_"
      ],
      strings
    );
  }

  #[test]
  fn identifiers_only_name_constructors_of_the_matched_adt_tests() {
    let mut heap = Heap::new();
    let builder = test_type_builder::create();
    let mut catalog = ConstructorCatalog::with_builtins(&mut TypeVariableGenerator::new());
    let b = AstBuilder::new(&mut heap, ModuleReference::DUMMY);
    let color = b.str("Color");
    let red = b.str("Red");
    let bare_red = b.id_pattern("Red");
    let some_red = b.ctor_pattern("Some", Some(b.id_pattern("Red")));
    let bare_none = b.id_pattern("None");
    drop(b);
    catalog
      .add_adt(AdtDefinition { name: color, type_parameters: vec![], loc: Location::dummy() })
      .unwrap();
    catalog.add_variant(color, red, None, Location::dummy()).unwrap();
    let option_number = builder.option_type(builder.number_type());
    let option_color = builder.option_type(builder.adt_type(color));

    assert_eq!(PatternInfo::Variable, classify_pattern(&bare_red, &option_number, &catalog));
    assert_eq!("_", canonical_pattern_string(&bare_red, &option_number, &catalog, &heap));
    assert_eq!(
      PatternInfo::AdtBare(red),
      classify_pattern(&bare_red, &builder.adt_type(color), &catalog)
    );
    assert_eq!(
      PatternInfo::AdtParam(PStr::SOME),
      classify_pattern(&some_red, &option_number, &catalog)
    );
    assert_eq!("Some(_)", canonical_pattern_string(&some_red, &option_number, &catalog, &heap));
    assert_eq!(
      PatternInfo::AdtLiteral(PStr::SOME),
      classify_pattern(&some_red, &option_color, &catalog)
    );
    assert_eq!("Some(Red)", canonical_pattern_string(&some_red, &option_color, &catalog, &heap));
    assert_eq!(
      PatternInfo::Variable,
      classify_pattern(&bare_none, &builder.number_type(), &catalog)
    );
    assert_eq!(
      PatternInfo::AdtBare(PStr::NONE),
      classify_pattern(&bare_none, &builder.var(0), &catalog)
    );
    assert_eq!(
      PatternInfo::AdtBare(PStr::NONE),
      classify_pattern(&bare_none, &builder.unknown_type(), &catalog)
    );

    assert_eq!(
      (vec![true, false], Vec::<String>::new()),
      run(&heap, &catalog, &option_number, &[bare_red.clone(), bare_none.clone()])
    );
  }

  #[test]
  fn option_literal_payload_tests() {
    let mut heap = Heap::new();
    let builder = test_type_builder::create();
    let catalog = ConstructorCatalog::with_builtins(&mut TypeVariableGenerator::new());
    let b = AstBuilder::new(&mut heap, ModuleReference::DUMMY);
    let literal_then_wildcard = vec![
      b.ctor_pattern("Some", Some(b.string_pattern("x"))),
      b.ctor_pattern("Some", Some(b.wildcard_pattern())),
      b.ctor_pattern("None", None),
    ];
    let literal_only = vec![
      b.ctor_pattern("Some", Some(b.string_pattern("x"))),
      b.ctor_pattern("None", None),
    ];
    let wildcard_then_literal = vec![
      b.ctor_pattern("Some", Some(b.wildcard_pattern())),
      b.ctor_pattern("Some", Some(b.string_pattern("x"))),
      b.id_pattern("None"),
    ];
    let repeated_binders = vec![
      b.ctor_pattern("Some", Some(b.id_pattern("a"))),
      b.ctor_pattern("Some", Some(b.id_pattern("b"))),
      b.ctor_pattern("None", None),
    ];
    drop(b);
    let option_string = builder.option_type(builder.string_type());

    assert_eq!(
      (vec![true, true, true], Vec::<String>::new()),
      run(&heap, &catalog, &option_string, &literal_then_wildcard)
    );
    assert_eq!(
      (vec![true, true], vec!["Some(_)".to_string()]),
      run(&heap, &catalog, &option_string, &literal_only)
    );
    assert_eq!(
      (vec![true, false, true], Vec::<String>::new()),
      run(&heap, &catalog, &option_string, &wildcard_then_literal)
    );
    assert_eq!(
      (vec![true, false, true], Vec::<String>::new()),
      run(&heap, &catalog, &option_string, &repeated_binders)
    );
  }

  #[test]
  fn boolean_tests() {
    let mut heap = Heap::new();
    let builder = test_type_builder::create();
    let catalog = ConstructorCatalog::with_builtins(&mut TypeVariableGenerator::new());
    let b = AstBuilder::new(&mut heap, ModuleReference::DUMMY);
    let true_false_wildcard =
      vec![b.bool_pattern(true), b.bool_pattern(false), b.wildcard_pattern()];
    let true_only = vec![b.bool_pattern(true)];
    let true_variable = vec![b.bool_pattern(true), b.id_pattern("other")];
    drop(b);
    let boolean = builder.boolean_type();

    assert_eq!(
      (vec![true, true, false], Vec::<String>::new()),
      run(&heap, &catalog, &boolean, &true_false_wildcard)
    );
    assert_eq!((vec![true], vec!["false".to_string()]), run(&heap, &catalog, &boolean, &true_only));
    assert_eq!(
      (vec![true, true], Vec::<String>::new()),
      run(&heap, &catalog, &boolean, &true_variable)
    );
    assert_eq!(
      (Vec::<bool>::new(), vec!["true".to_string(), "false".to_string()]),
      run(&heap, &catalog, &boolean, &[])
    );
  }

  #[test]
  fn open_domain_tests() {
    let mut heap = Heap::new();
    let builder = test_type_builder::create();
    let catalog = ConstructorCatalog::with_builtins(&mut TypeVariableGenerator::new());
    let b = AstBuilder::new(&mut heap, ModuleReference::DUMMY);
    let literals = vec![b.number_pattern(1.0), b.number_pattern(2.0), b.number_pattern(1.0)];
    let literals_then_variable =
      vec![b.number_pattern(1.0), b.id_pattern("n"), b.number_pattern(2.0), b.wildcard_pattern()];
    drop(b);

    assert_eq!(
      (vec![true, true, false], vec!["_".to_string()]),
      run(&heap, &catalog, &builder.number_type(), &literals)
    );
    assert_eq!(
      (vec![true, true, false, false], Vec::<String>::new()),
      run(&heap, &catalog, &builder.number_type(), &literals_then_variable)
    );
    assert_eq!(
      (vec![true, true, false], vec!["_".to_string()]),
      run(&heap, &catalog, &builder.string_type(), &literals)
    );
    assert_eq!(
      (Vec::<bool>::new(), vec!["_".to_string()]),
      run(&heap, &catalog, &builder.array_type(builder.number_type()), &[])
    );
  }

  #[test]
  fn user_adt_and_literal_union_tests() {
    let mut heap = Heap::new();
    let builder = test_type_builder::create();
    let mut catalog = ConstructorCatalog::with_builtins(&mut TypeVariableGenerator::new());
    let b = AstBuilder::new(&mut heap, ModuleReference::DUMMY);
    let color = b.str("Color");
    let red = b.str("Red");
    let green = b.str("Green");
    let rgb = b.str("Rgb");
    let first = b.str("first");
    let second = b.str("second");
    let partial_colors =
      vec![b.id_pattern("Red"), b.ctor_pattern("Rgb", Some(b.number_pattern(0.0)))];
    let full_colors = vec![
      b.id_pattern("Red"),
      b.id_pattern("Green"),
      b.ctor_pattern("Rgb", Some(b.id_pattern("v"))),
      b.wildcard_pattern(),
    ];
    let foreign_constructor = vec![b.ctor_pattern("None", None), b.wildcard_pattern()];
    let union_arms = vec![b.string_pattern("first"), b.string_pattern("other")];
    drop(b);
    catalog
      .add_adt(AdtDefinition { name: color, type_parameters: vec![], loc: Location::dummy() })
      .unwrap();
    catalog.add_variant(color, red, None, Location::dummy()).unwrap();
    catalog.add_variant(color, green, None, Location::dummy()).unwrap();
    catalog.add_variant(color, rgb, Some(builder.number_type()), Location::dummy()).unwrap();
    let color_type = builder.adt_type(color);

    assert_eq!(
      (vec![true, true], vec!["Green".to_string(), "Rgb(_)".to_string()]),
      run(&heap, &catalog, &color_type, &partial_colors)
    );
    assert_eq!(
      (vec![true, true, true, false], Vec::<String>::new()),
      run(&heap, &catalog, &color_type, &full_colors)
    );
    assert_eq!(
      (vec![true, true], Vec::<String>::new()),
      run(&heap, &catalog, &color_type, &foreign_constructor)
    );

    let union = builder.literal_union_type(vec![first, second]);
    assert_eq!(
      (vec![true, true], vec!["\"second\"".to_string()]),
      run(&heap, &catalog, &union, &union_arms)
    );
    assert_eq!(
      (vec![true], Vec::<String>::new()),
      run(&heap, &catalog, &builder.string_literal_type(first), &union_arms[..1])
    );
  }
}
