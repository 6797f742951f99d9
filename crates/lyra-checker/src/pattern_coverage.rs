use super::{
  constructors::ConstructorCatalog,
  instantiation::substitute_type_variables,
  type_::{PrimitiveTypeKind, Type},
};
use lyra_ast::{
  Description,
  source::{Literal, MatchingPattern},
};
use lyra_heap::{Heap, PStr};
use std::{
  collections::{HashMap, HashSet},
  rc::Rc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageKind {
  Adt,
  String,
  Number,
  Boolean,
  LiteralUnion,
  Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternInfo {
  /// `None`
  AdtBare(PStr),
  /// `Some(x)`
  AdtParam(PStr),
  /// `Some(_)`
  AdtWildcard(PStr),
  /// `Some(42)` or a nested constructor payload. Narrows the variant without covering it.
  AdtLiteral(PStr),
  Literal(Literal),
  Wildcard,
  Variable,
}

/// Whether the identifier `name` stands for a nullary constructor of the ADT `matched` belongs
/// to. While `matched` is still unresolved any nullary constructor qualifies.
pub(crate) fn names_nullary_constructor(
  catalog: &ConstructorCatalog,
  matched: &Type,
  name: PStr,
) -> bool {
  let Some(constructor) = catalog.find(name).filter(|c| c.is_nullary()) else {
    return false;
  };
  match matched {
    Type::Adt(adt_name) | Type::Generic(adt_name, _) => constructor.adt_name == *adt_name,
    Type::Var(_) | Type::Primitive(PrimitiveTypeKind::Unknown) => true,
    _ => false,
  }
}

/// The payload type of `constructor` when it matches a value of type `matched`.
fn payload_type(catalog: &ConstructorCatalog, matched: &Type, constructor: PStr) -> Rc<Type> {
  let Some(definition) = catalog.find(constructor) else {
    return Type::unknown_type();
  };
  let Some(payload) = definition.type_.parameter_types.first() else {
    return Type::unknown_type();
  };
  match matched {
    Type::Generic(adt_name, type_arguments) if *adt_name == definition.adt_name => {
      let type_parameters =
        catalog.find_adt(*adt_name).map(|adt| adt.type_parameters.as_slice()).unwrap_or(&[]);
      let mapping = type_parameters
        .iter()
        .zip(type_arguments)
        .map(|(parameter, argument)| (parameter.id, argument.clone()))
        .collect::<HashMap<_, _>>();
      substitute_type_variables(payload, &mapping)
    }
    Type::Adt(adt_name) if *adt_name == definition.adt_name => payload.clone(),
    _ => Type::unknown_type(),
  }
}

/// Classifies a `match` arm pattern against the resolved type of the matched value. An
/// identifier is a bare constructor only when it names a nullary constructor of that type's ADT;
/// otherwise it binds a variable.
pub fn classify_pattern(
  pattern: &MatchingPattern,
  matched: &Type,
  catalog: &ConstructorCatalog,
) -> PatternInfo {
  match pattern {
    MatchingPattern::Literal(_, literal) => PatternInfo::Literal(*literal),
    MatchingPattern::Wildcard(_) => PatternInfo::Wildcard,
    MatchingPattern::Id(id) if names_nullary_constructor(catalog, matched, id.name) => {
      PatternInfo::AdtBare(id.name)
    }
    MatchingPattern::Id(_) => PatternInfo::Variable,
    MatchingPattern::Constructor { name, argument: None, .. } => PatternInfo::AdtBare(name.name),
    MatchingPattern::Constructor { name, argument: Some(argument), .. } => match argument.as_ref() {
      MatchingPattern::Wildcard(_) => PatternInfo::AdtWildcard(name.name),
      MatchingPattern::Id(id)
        if !names_nullary_constructor(
          catalog,
          &payload_type(catalog, matched, name.name),
          id.name,
        ) =>
      {
        PatternInfo::AdtParam(name.name)
      }
      _ => PatternInfo::AdtLiteral(name.name),
    },
  }
}

/// Source-like text of a pattern with every binder replaced by `_`, so that `Some(x)` and
/// `Some(y)` are recognized as the same pattern.
pub fn canonical_pattern_string(
  pattern: &MatchingPattern,
  matched: &Type,
  catalog: &ConstructorCatalog,
  heap: &Heap,
) -> String {
  match pattern {
    MatchingPattern::Literal(_, literal) => literal.pretty_print(heap),
    MatchingPattern::Wildcard(_) => "_".to_string(),
    MatchingPattern::Id(id) if names_nullary_constructor(catalog, matched, id.name) => {
      id.name.as_str(heap).to_string()
    }
    MatchingPattern::Id(_) => "_".to_string(),
    MatchingPattern::Constructor { name, argument: None, .. } => name.name.as_str(heap).to_string(),
    MatchingPattern::Constructor { name, argument: Some(argument), .. } => {
      let payload = payload_type(catalog, matched, name.name);
      format!(
        "{}({})",
        name.name.as_str(heap),
        canonical_pattern_string(argument, &payload, catalog, heap)
      )
    }
  }
}

/// Per-match coverage state, fed arm by arm and consulted once at the end.
#[derive(Debug)]
pub struct MatchCoverage {
  kind: CoverageKind,
  /// (variant or literal, whether it carries a payload) in declaration order.
  all_variants: Vec<(PStr, bool)>,
  remaining_variants: Vec<PStr>,
  partially_covered_variants: HashSet<PStr>,
  wildcard_or_variable_seen: bool,
  true_covered: bool,
  false_covered: bool,
  processed_pattern_strings: HashSet<String>,
}

impl MatchCoverage {
  /// `matched` must already be resolved through the substitution.
  pub fn new(matched: &Type, catalog: &ConstructorCatalog) -> MatchCoverage {
    let (kind, all_variants) = match matched {
      Type::Adt(name) | Type::Generic(name, _) if catalog.find_adt(*name).is_some() => (
        CoverageKind::Adt,
        catalog.variants_of(*name).map(|c| (c.name, !c.is_nullary())).collect(),
      ),
      Type::Primitive(PrimitiveTypeKind::String) => (CoverageKind::String, vec![]),
      Type::Primitive(PrimitiveTypeKind::Number) => (CoverageKind::Number, vec![]),
      Type::Primitive(PrimitiveTypeKind::Boolean) => (CoverageKind::Boolean, vec![]),
      Type::LiteralUnion(values) => {
        (CoverageKind::LiteralUnion, values.iter().map(|v| (*v, false)).collect())
      }
      Type::StringLiteral(value) => (CoverageKind::LiteralUnion, vec![(*value, false)]),
      _ => (CoverageKind::Other, vec![]),
    };
    let remaining_variants = all_variants.iter().map(|(name, _)| *name).collect();
    MatchCoverage {
      kind,
      all_variants,
      remaining_variants,
      partially_covered_variants: HashSet::new(),
      wildcard_or_variable_seen: false,
      true_covered: false,
      false_covered: false,
      processed_pattern_strings: HashSet::new(),
    }
  }

  pub fn kind(&self) -> CoverageKind {
    self.kind
  }

  fn is_variant(&self, name: PStr) -> bool {
    self.all_variants.iter().any(|(n, _)| *n == name)
  }

  fn nothing_remains(&self) -> bool {
    match self.kind {
      CoverageKind::Adt | CoverageKind::LiteralUnion => self.remaining_variants.is_empty(),
      CoverageKind::Boolean => self.true_covered && self.false_covered,
      CoverageKind::String | CoverageKind::Number | CoverageKind::Other => false,
    }
  }

  fn remove_remaining(&mut self, name: PStr) -> bool {
    let before = self.remaining_variants.len();
    self.remaining_variants.retain(|n| *n != name);
    self.remaining_variants.len() != before
  }

  /// Records one arm and returns whether it can still be selected.
  pub fn process(&mut self, pattern_string: String, info: &PatternInfo) -> bool {
    let repeated = !self.processed_pattern_strings.insert(pattern_string);
    if repeated || self.wildcard_or_variable_seen {
      return false;
    }
    match info {
      PatternInfo::AdtBare(name) | PatternInfo::AdtParam(name) | PatternInfo::AdtWildcard(name) => {
        // A variant of some other ADT is a type error reported elsewhere.
        !self.is_variant(*name) || self.remove_remaining(*name)
      }
      PatternInfo::AdtLiteral(name) => {
        if !self.is_variant(*name) {
          return true;
        }
        if !self.remaining_variants.contains(name) {
          return false;
        }
        self.partially_covered_variants.insert(*name);
        true
      }
      PatternInfo::Wildcard | PatternInfo::Variable => {
        if self.nothing_remains() {
          return false;
        }
        self.wildcard_or_variable_seen = true;
        self.remaining_variants.clear();
        true
      }
      PatternInfo::Literal(Literal::Bool(b)) if self.kind == CoverageKind::Boolean => {
        let covered = if *b { &mut self.true_covered } else { &mut self.false_covered };
        let reachable = !*covered;
        *covered = true;
        reachable
      }
      PatternInfo::Literal(Literal::String(s)) if self.kind == CoverageKind::LiteralUnion => {
        !self.is_variant(*s) || self.remove_remaining(*s)
      }
      PatternInfo::Literal(_) => true,
    }
  }

  /// Empty when the match is exhaustive.
  pub fn missing_cases(&self) -> Vec<Description> {
    if self.wildcard_or_variable_seen {
      return vec![];
    }
    match self.kind {
      CoverageKind::Adt => self
        .all_variants
        .iter()
        .filter(|(name, _)| self.remaining_variants.contains(name))
        .map(|(name, has_payload)| Description::VariantPattern {
          name: *name,
          has_payload: *has_payload,
        })
        .collect(),
      CoverageKind::LiteralUnion => self
        .all_variants
        .iter()
        .filter(|(name, _)| self.remaining_variants.contains(name))
        .map(|(name, _)| Description::StringLiteralType(*name))
        .collect(),
      CoverageKind::Boolean => {
        let mut missing = vec![];
        if !self.true_covered {
          missing.push(Description::BooleanPattern(true));
        }
        if !self.false_covered {
          missing.push(Description::BooleanPattern(false));
        }
        missing
      }
      CoverageKind::String | CoverageKind::Number | CoverageKind::Other => {
        vec![Description::WildcardPattern]
      }
    }
  }
}
