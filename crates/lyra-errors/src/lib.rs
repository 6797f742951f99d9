#![cfg_attr(test, allow(clippy::redundant_clone, clippy::clone_on_copy))]
use itertools::Itertools;
use lyra_ast::{Description, Location};
use lyra_heap::{Heap, ModuleReference, PStr};
use std::collections::HashMap;

/// Error message pieces that still refer to heap-allocated data.
enum PrintableError<'a> {
  Size(usize),
  PStr(&'a PStr),
  Text(&'a str),
  Description(&'a Description),
  LocationReference(&'a Location),
  ModuleReference(&'a ModuleReference),
}

struct PrintableStream<'a> {
  collector: Vec<PrintableError<'a>>,
}

impl<'a> PrintableStream<'a> {
  fn new() -> PrintableStream<'a> {
    PrintableStream { collector: vec![] }
  }

  fn push_size(&mut self, size: usize) {
    self.collector.push(PrintableError::Size(size))
  }

  fn push_pstr(&mut self, p_str: &'a PStr) {
    self.collector.push(PrintableError::PStr(p_str))
  }

  fn push_text(&mut self, text: &'a str) {
    self.collector.push(PrintableError::Text(text))
  }

  fn push_description(&mut self, description: &'a Description) {
    self.collector.push(PrintableError::Description(description))
  }

  fn push_location(&mut self, loc: &'a Location) {
    self.collector.push(PrintableError::LocationReference(loc))
  }

  fn push_mod_ref(&mut self, module_reference: &'a ModuleReference) {
    self.collector.push(PrintableError::ModuleReference(module_reference))
  }

  fn materialize(self, heap: &Heap) -> String {
    let mut collector = String::new();
    for printable in self.collector {
      match printable {
        PrintableError::Size(s) => collector.push_str(&s.to_string()),
        PrintableError::PStr(p) => collector.push_str(p.as_str(heap)),
        PrintableError::Text(s) => collector.push_str(s),
        PrintableError::Description(d) => collector.push_str(&d.pretty_print(heap)),
        PrintableError::LocationReference(loc) => collector.push_str(&loc.pretty_print(heap)),
        PrintableError::ModuleReference(m) => collector.push_str(&m.pretty_print(heap)),
      }
    }
    collector
  }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum IncompatibilityNode {
  Type { lower: Description, upper: Description },
  FunctionParametersArity(usize, usize),
  TupleArity(usize, usize),
  TypeArgumentsArity(usize, usize),
  OccursCheck { variable: Description, type_: Description },
}

/// A unification failure. The innermost mismatch is pushed first, and every enclosing structure
/// that gave up because of it pushes one more node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct StackableError {
  rev_stack: Vec<IncompatibilityNode>,
}

impl Default for StackableError {
  fn default() -> Self {
    StackableError { rev_stack: Vec::with_capacity(2) }
  }
}

impl StackableError {
  pub fn new() -> StackableError {
    StackableError::default()
  }

  pub fn is_empty(&self) -> bool {
    self.rev_stack.is_empty()
  }

  pub fn is_occurs_check_failure(&self) -> bool {
    self.rev_stack.iter().any(|n| matches!(n, IncompatibilityNode::OccursCheck { .. }))
  }

  pub fn add_type_incompatibility_error(&mut self, lower: Description, upper: Description) {
    self.rev_stack.push(IncompatibilityNode::Type { lower, upper });
  }

  pub fn add_fn_param_arity_error(&mut self, lower: usize, upper: usize) {
    self.rev_stack.push(IncompatibilityNode::FunctionParametersArity(lower, upper));
  }

  pub fn add_tuple_arity_error(&mut self, lower: usize, upper: usize) {
    self.rev_stack.push(IncompatibilityNode::TupleArity(lower, upper));
  }

  pub fn add_type_args_arity_error(&mut self, lower: usize, upper: usize) {
    self.rev_stack.push(IncompatibilityNode::TypeArgumentsArity(lower, upper));
  }

  pub fn add_occurs_check_error(&mut self, variable: Description, type_: Description) {
    self.rev_stack.push(IncompatibilityNode::OccursCheck { variable, type_ });
  }

  /// Wraps an existing failure with the outer pair of types that failed because of it.
  pub fn with_type_incompatibility(mut self, lower: Description, upper: Description) -> Self {
    self.add_type_incompatibility_error(lower, upper);
    self
  }

  fn push_to_printable_stream<'a>(&'a self, printable_stream: &mut PrintableStream<'a>) {
    for (i, e) in self.rev_stack.iter().rev().enumerate() {
      if i >= 1 {
        printable_stream.push_text("\n");
        for _ in 0..(i - 1) {
          printable_stream.push_text("  ");
        }
        printable_stream.push_text("- ");
      }
      match e {
        IncompatibilityNode::Type { lower, upper } => {
          printable_stream.push_text("Cannot unify `");
          printable_stream.push_description(lower);
          printable_stream.push_text("` with `");
          printable_stream.push_description(upper);
          printable_stream.push_text("`.");
        }
        IncompatibilityNode::FunctionParametersArity(l, u) => {
          printable_stream.push_text("Function parameter arity of ");
          printable_stream.push_size(*l);
          printable_stream.push_text(" is incompatible with function parameter arity of ");
          printable_stream.push_size(*u);
          printable_stream.push_text(".");
        }
        IncompatibilityNode::TupleArity(l, u) => {
          printable_stream.push_text("Tuple arity of ");
          printable_stream.push_size(*l);
          printable_stream.push_text(" is incompatible with tuple arity of ");
          printable_stream.push_size(*u);
          printable_stream.push_text(".");
        }
        IncompatibilityNode::TypeArgumentsArity(l, u) => {
          printable_stream.push_text("Type argument arity of ");
          printable_stream.push_size(*l);
          printable_stream.push_text(" is incompatible with type argument arity of ");
          printable_stream.push_size(*u);
          printable_stream.push_text(".");
        }
        IncompatibilityNode::OccursCheck { variable, type_ } => {
          printable_stream.push_text("`");
          printable_stream.push_description(variable);
          printable_stream.push_text("` fails occurs check against `");
          printable_stream.push_description(type_);
          printable_stream.push_text("`.");
        }
      }
    }
  }

  pub fn pretty_print(&self, heap: &Heap) -> String {
    let mut stream = PrintableStream::new();
    self.push_to_printable_stream(&mut stream);
    stream.materialize(heap)
  }
}


#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorDetail {
  ArityMismatch { kind: &'static str, expected: usize, actual: usize },
  CannotResolveMember { parent: Description, member: PStr },
  CannotResolveModule { path: PStr },
  CannotResolveName { name: PStr },
  CannotResolveType { name: PStr },
  CyclicImport { module_reference: ModuleReference },
  CyclicTypeDefinition { name: PStr },
  ElementMissing { parent: Description, index: String },
  InternalError(String),
  MissingExport { module_reference: ModuleReference, name: PStr },
  MissingField { parent: Description, field: PStr },
  NameAlreadyBound { name: PStr, old_loc: Location },
  NestingTooDeep { limit: usize },
  NonExhaustiveMatch { missing_cases: Vec<Description> },
  NotAFunction { description: Description },
  NotARecord { description: Description },
  NotIndexable { description: Description },
  Stacked(StackableError),
  UnreachablePattern,
}

impl ErrorDetail {
  fn push_to_printable_stream<'a>(&'a self, printable_stream: &mut PrintableStream<'a>) {
    match self {
      ErrorDetail::ArityMismatch { kind, expected, actual } => {
        printable_stream.push_text("Incorrect ");
        printable_stream.push_text(kind);
        printable_stream.push_text(" size. Expected: ");
        printable_stream.push_size(*expected);
        printable_stream.push_text(", actual: ");
        printable_stream.push_size(*actual);
        printable_stream.push_text(".");
      }
      ErrorDetail::CannotResolveMember { parent, member } => {
        printable_stream.push_text("Cannot resolve member `");
        printable_stream.push_pstr(member);
        printable_stream.push_text("` on `");
        printable_stream.push_description(parent);
        printable_stream.push_text("`.");
      }
      ErrorDetail::CannotResolveModule { path } => {
        printable_stream.push_text("Cannot resolve module `");
        printable_stream.push_pstr(path);
        printable_stream.push_text("`.");
      }
      ErrorDetail::CannotResolveName { name } => {
        printable_stream.push_text("Cannot resolve name `");
        printable_stream.push_pstr(name);
        printable_stream.push_text("`.");
      }
      ErrorDetail::CannotResolveType { name } => {
        printable_stream.push_text("Cannot resolve type `");
        printable_stream.push_pstr(name);
        printable_stream.push_text("`.");
      }
      ErrorDetail::CyclicImport { module_reference } => {
        printable_stream.push_text("Module `");
        printable_stream.push_mod_ref(module_reference);
        printable_stream.push_text("` is part of a circular dependency.");
      }
      ErrorDetail::CyclicTypeDefinition { name } => {
        printable_stream.push_text("Type `");
        printable_stream.push_pstr(name);
        printable_stream.push_text("` has a cyclic definition.");
      }
      ErrorDetail::ElementMissing { parent, index } => {
        printable_stream.push_text("Cannot access member of `");
        printable_stream.push_description(parent);
        printable_stream.push_text("` at index ");
        printable_stream.push_text(index);
        printable_stream.push_text(".");
      }
      ErrorDetail::InternalError(reason) => {
        printable_stream.push_text("Internal checker error: ");
        printable_stream.push_text(reason);
      }
      ErrorDetail::MissingExport { module_reference, name } => {
        printable_stream.push_text("There is no `");
        printable_stream.push_pstr(name);
        printable_stream.push_text("` export in `");
        printable_stream.push_mod_ref(module_reference);
        printable_stream.push_text("`.");
      }
      ErrorDetail::MissingField { parent, field } => {
        printable_stream.push_text("Field `");
        printable_stream.push_pstr(field);
        printable_stream.push_text("` is required by `");
        printable_stream.push_description(parent);
        printable_stream.push_text("` but missing.");
      }
      ErrorDetail::NameAlreadyBound { name, old_loc } => {
        printable_stream.push_text("Name `");
        printable_stream.push_pstr(name);
        printable_stream.push_text("` collides with a previously defined name at ");
        printable_stream.push_location(old_loc);
        printable_stream.push_text(".");
      }
      ErrorDetail::NestingTooDeep { limit } => {
        printable_stream.push_text("Expression is nested deeper than the limit of ");
        printable_stream.push_size(*limit);
        printable_stream.push_text(".");
      }
      ErrorDetail::NonExhaustiveMatch { missing_cases } => {
        printable_stream.push_text("This pattern-matching is not exhaustive. Missing cases: ");
        for (i, case) in missing_cases.iter().enumerate() {
          if i > 0 {
            printable_stream.push_text(", ");
          }
          printable_stream.push_text("`");
          printable_stream.push_description(case);
          printable_stream.push_text("`");
        }
        printable_stream.push_text(".");
      }
      ErrorDetail::NotAFunction { description } => {
        printable_stream.push_text("`");
        printable_stream.push_description(description);
        printable_stream.push_text("` is not a function.");
      }
      ErrorDetail::NotARecord { description } => {
        printable_stream.push_text("`");
        printable_stream.push_description(description);
        printable_stream.push_text("` is not a record.");
      }
      ErrorDetail::NotIndexable { description } => {
        printable_stream.push_text("`");
        printable_stream.push_description(description);
        printable_stream.push_text("` cannot be indexed.");
      }
      ErrorDetail::Stacked(s) => s.push_to_printable_stream(printable_stream),
      ErrorDetail::UnreachablePattern => {
        printable_stream
          .push_text("The pattern is unreachable. It is already covered by previous cases.");
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompileTimeError {
  pub location: Location,
  pub detail: ErrorDetail,
}

impl CompileTimeError {
  pub fn message(&self, heap: &Heap) -> String {
    let mut stream = PrintableStream::new();
    self.detail.push_to_printable_stream(&mut stream);
    stream.materialize(heap)
  }

  fn print_code_frame(&self, sources: &HashMap<ModuleReference, String>, collector: &mut String) {
    let Location { module_reference, start, end } = self.location;
    if start.is_dummy() || start.0 != end.0 {
      return;
    }
    let Some(line) =
      sources.get(&module_reference).and_then(|s| s.split('\n').nth(start.0 as usize))
    else {
      return;
    };
    let line_num = (start.0 + 1).to_string();
    collector.push_str(&format!("{}| {}\n", line_num, line));
    collector.push_str(&" ".repeat(line_num.len() + 2 + start.1 as usize));
    collector.push_str(&"^".repeat(end.1.saturating_sub(start.1) as usize));
    collector.push_str("\n\n");
  }

  fn pretty_print(&self, heap: &Heap, sources: &HashMap<ModuleReference, String>) -> String {
    let loc_string = self.location.pretty_print(heap);
    let full_err_line = "Error ------------------------------------------------------";
    let mut collector = String::new();
    if loc_string.len() > full_err_line.len() - 10 {
      collector.push_str(full_err_line);
      collector.push('\n');
    } else {
      collector.push_str(&full_err_line[..(full_err_line.len() - loc_string.len() - 1)]);
      collector.push(' ');
    }
    collector.push_str(&loc_string);
    collector.push_str("\n\n");
    self.print_code_frame(sources, &mut collector);
    collector.push_str(&self.message(heap));
    collector.push_str("\n\n");
    collector
  }
}

/// Diagnostics in the order they were reported.
#[derive(Debug, Clone, Default)]
pub struct ErrorSet {
  errors: Vec<CompileTimeError>,
}

impl ErrorSet {
  pub fn new() -> ErrorSet {
    ErrorSet::default()
  }

  pub fn has_errors(&self) -> bool {
    !self.errors.is_empty()
  }

  pub fn len(&self) -> usize {
    self.errors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.errors.is_empty()
  }

  pub fn errors(&self) -> &[CompileTimeError] {
    &self.errors
  }

  pub fn into_errors(self) -> Vec<CompileTimeError> {
    self.errors
  }

  pub fn group_errors(self) -> HashMap<ModuleReference, Vec<CompileTimeError>> {
    self.errors.into_iter().into_group_map_by(|e| e.location.module_reference)
  }

  pub fn error_messages(&self, heap: &Heap) -> Vec<String> {
    self.errors.iter().map(|e| e.message(heap)).collect()
  }

  pub fn pretty_print_error_messages(
    &self,
    heap: &Heap,
    sources: &HashMap<ModuleReference, String>,
  ) -> String {
    if self.errors.is_empty() {
      return "".to_string();
    }
    let mut collector = self.errors.iter().map(|e| e.pretty_print(heap, sources)).join("");
    if self.errors.len() > 1 {
      collector.push_str(&format!("Found {} errors.", self.errors.len()));
    } else {
      collector.push_str("Found 1 error.");
    }
    collector
  }

  pub fn pretty_print_error_messages_no_frame_for_test(&self, heap: &Heap) -> String {
    self.pretty_print_error_messages(heap, &HashMap::new())
  }

  fn report_error(&mut self, location: Location, detail: ErrorDetail) {
    self.errors.push(CompileTimeError { location, detail });
  }

  pub fn report_arity_mismatch_error(
    &mut self,
    loc: Location,
    kind: &'static str,
    expected: usize,
    actual: usize,
  ) {
    self.report_error(loc, ErrorDetail::ArityMismatch { kind, expected, actual })
  }

  pub fn report_cannot_resolve_member_error(
    &mut self,
    loc: Location,
    parent: Description,
    member: PStr,
  ) {
    self.report_error(loc, ErrorDetail::CannotResolveMember { parent, member })
  }

  pub fn report_cannot_resolve_module_error(&mut self, loc: Location, path: PStr) {
    self.report_error(loc, ErrorDetail::CannotResolveModule { path })
  }

  pub fn report_cannot_resolve_name_error(&mut self, loc: Location, name: PStr) {
    self.report_error(loc, ErrorDetail::CannotResolveName { name })
  }

  pub fn report_cannot_resolve_type_error(&mut self, loc: Location, name: PStr) {
    self.report_error(loc, ErrorDetail::CannotResolveType { name })
  }

  pub fn report_cyclic_import_error(&mut self, loc: Location, module_reference: ModuleReference) {
    self.report_error(loc, ErrorDetail::CyclicImport { module_reference })
  }

  pub fn report_cyclic_type_definition_error(&mut self, loc: Location, name: PStr) {
    self.report_error(loc, ErrorDetail::CyclicTypeDefinition { name })
  }

  pub fn report_element_missing_error(
    &mut self,
    loc: Location,
    parent: Description,
    index: String,
  ) {
    self.report_error(loc, ErrorDetail::ElementMissing { parent, index })
  }

  pub fn report_internal_error(&mut self, loc: Location, reason: String) {
    self.report_error(loc, ErrorDetail::InternalError(reason))
  }

  pub fn report_missing_export_error(
    &mut self,
    loc: Location,
    module_reference: ModuleReference,
    name: PStr,
  ) {
    self.report_error(loc, ErrorDetail::MissingExport { module_reference, name })
  }

  pub fn report_missing_field_error(&mut self, loc: Location, parent: Description, field: PStr) {
    self.report_error(loc, ErrorDetail::MissingField { parent, field })
  }

  pub fn report_name_already_bound_error(&mut self, loc: Location, name: PStr, old_loc: Location) {
    self.report_error(loc, ErrorDetail::NameAlreadyBound { name, old_loc })
  }

  pub fn report_nesting_too_deep_error(&mut self, loc: Location, limit: usize) {
    self.report_error(loc, ErrorDetail::NestingTooDeep { limit })
  }

  pub fn report_non_exhaustive_match_error(
    &mut self,
    loc: Location,
    missing_cases: Vec<Description>,
  ) {
    self.report_error(loc, ErrorDetail::NonExhaustiveMatch { missing_cases })
  }

  pub fn report_not_a_function_error(&mut self, loc: Location, description: Description) {
    self.report_error(loc, ErrorDetail::NotAFunction { description })
  }

  pub fn report_not_a_record_error(&mut self, loc: Location, description: Description) {
    self.report_error(loc, ErrorDetail::NotARecord { description })
  }

  pub fn report_not_indexable_error(&mut self, loc: Location, description: Description) {
    self.report_error(loc, ErrorDetail::NotIndexable { description })
  }

  pub fn report_stackable_error(&mut self, loc: Location, stackable: StackableError) {
    self.report_error(loc, ErrorDetail::Stacked(stackable))
  }

  pub fn report_unreachable_pattern_error(&mut self, loc: Location) {
    self.report_error(loc, ErrorDetail::UnreachablePattern)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn boilterplate() {
    assert!(!format!("{:?}", ErrorDetail::UnreachablePattern.clone()).is_empty());
    assert!(ErrorDetail::UnreachablePattern <= ErrorDetail::UnreachablePattern);
    let error =
      CompileTimeError { location: Location::dummy(), detail: ErrorDetail::UnreachablePattern };
    assert_eq!(error.clone(), error);
    assert!(!format!("{:?}", ErrorSet::new()).is_empty());
  }

  #[test]
  fn error_message_tests() {
    let heap = &mut Heap::new();
    let mod_ref = heap.alloc_module_reference_from_string_vec(vec!["Foo".to_string()]);
    let mut error_set = ErrorSet::new();
    assert!(!error_set.has_errors());
    assert!(error_set.is_empty());
    let mut stacked = StackableError::new();
    stacked.add_type_incompatibility_error(Description::NumberType, Description::StringType);

    error_set.report_arity_mismatch_error(Location::dummy(), "arguments", 1, 2);
    error_set.report_cannot_resolve_member_error(
      Location::dummy(),
      Description::GeneralRecordType,
      PStr::LOWER_A,
    );
    error_set.report_cannot_resolve_module_error(Location::dummy(), PStr::LOWER_A);
    error_set.report_cannot_resolve_name_error(Location::dummy(), PStr::LOWER_B);
    error_set.report_cannot_resolve_type_error(Location::dummy(), PStr::UPPER_A);
    error_set.report_cyclic_import_error(Location::dummy(), mod_ref);
    error_set.report_cyclic_type_definition_error(Location::dummy(), PStr::UPPER_A);
    error_set.report_element_missing_error(
      Location::dummy(),
      Description::TupleType(vec![Description::NumberType]),
      "1".to_string(),
    );
    error_set.report_internal_error(Location::dummy(), "boom".to_string());
    error_set.report_missing_export_error(Location::dummy(), mod_ref, PStr::LOWER_C);
    error_set.report_missing_field_error(
      Location::dummy(),
      Description::GeneralRecordType,
      PStr::LOWER_A,
    );
    error_set.report_name_already_bound_error(
      Location::dummy(),
      PStr::LOWER_A,
      Location::from_pos(0, 0, 0, 1),
    );
    error_set.report_nesting_too_deep_error(Location::dummy(), 3);
    error_set.report_non_exhaustive_match_error(
      Location::dummy(),
      vec![
        Description::VariantPattern { name: PStr::SOME, has_payload: true },
        Description::BooleanPattern(true),
      ],
    );
    error_set.report_not_a_function_error(Location::dummy(), Description::NumberType);
    error_set.report_not_a_record_error(Location::dummy(), Description::NumberType);
    error_set.report_not_indexable_error(Location::dummy(), Description::NumberType);
    error_set.report_stackable_error(Location::dummy(), stacked);
    error_set.report_unreachable_pattern_error(Location::dummy());

    assert!(error_set.has_errors());
    assert_eq!(19, error_set.len());
    assert_eq!(
      vec![
        "Incorrect arguments size. Expected: 1, actual: 2.",
        "Cannot resolve member `a` on `record type`.",
        "Cannot resolve module `a`.",
        "Cannot resolve name `b`.",
        "Cannot resolve type `A`.",
        "Module `Foo` is part of a circular dependency.",
        "Type `A` has a cyclic definition.",
        "Cannot access member of `[number]` at index 1.",
        "Internal checker error: boom",
        "There is no `c` export in `Foo`.",
        "Field `a` is required by `record type` but missing.",
        "Name `a` collides with a previously defined name at DUMMY.ly:1:1-1:2.",
        "Expression is nested deeper than the limit of 3.",
        "This pattern-matching is not exhaustive. Missing cases: `Some(_)`, `true`.",
        "`number` is not a function.",
        "`number` is not a record.",
        "`number` cannot be indexed.",
        "Cannot unify `number` with `string`.",
        "The pattern is unreachable. It is already covered by previous cases.",
      ],
      error_set.error_messages(heap)
    );
  }

  #[test]
  fn pretty_print_tests() {
    let heap = &mut Heap::new();
    let mod_ref = heap.alloc_module_reference_from_string_vec(vec!["Demo".to_string()]);
    let mut error_set = ErrorSet::new();
    assert_eq!("", error_set.pretty_print_error_messages_no_frame_for_test(heap));

    error_set.report_cannot_resolve_name_error(
      Location {
        module_reference: mod_ref,
        start: lyra_ast::Position(0, 8),
        end: lyra_ast::Position(0, 9),
      },
      PStr::LOWER_X,
    );
    let sources = HashMap::from([(mod_ref, "let a = x;".to_string())]);
    assert_eq!(
      r#"
Error ------------------------------------- Demo.ly:1:9-1:10

1| let a = x;
           ^

Cannot resolve name `x`.

Found 1 error."#
        .trim(),
      error_set.pretty_print_error_messages(heap, &sources).trim()
    );

    error_set.report_unreachable_pattern_error(Location::dummy());
    assert_eq!(
      r#"
Error ------------------------------------- Demo.ly:1:9-1:10

Cannot resolve name `x`.

Error --------------------------------------- DUMMY.ly:DUMMY

The pattern is unreachable. It is already covered by previous cases.

Found 2 errors."#
        .trim(),
      error_set.pretty_print_error_messages_no_frame_for_test(heap).trim()
    );

    let grouped = error_set.clone().group_errors();
    assert_eq!(2, grouped.len());
    assert_eq!(1, grouped[&mod_ref].len());
    assert_eq!(2, error_set.into_errors().len());
  }
}
