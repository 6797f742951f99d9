#![cfg_attr(test, allow(clippy::redundant_clone, clippy::clone_on_copy))]

mod constructors;
mod instantiation;
mod main_checker;
mod module_resolver;
mod pattern_coverage;
mod substitution;
mod type_;
mod typing_context;
mod unification;

#[cfg(test)]
mod pattern_coverage_tests;

pub use constructors::{AdtDefinition, ConstructorCatalog, ConstructorDefinition};
pub use instantiation::{TypeVariableGenerator, free_type_variables, generalize, instantiate};
pub use main_checker::{ModuleCheckResult, TypeHint, type_check_module};
pub use module_resolver::{
  CachedModule, CheckerOptions, CheckerSession, FileSystemModuleLoader, InMemoryModuleLoader,
  ModuleLoader, SourceParser, resolve_module_path,
};
pub use pattern_coverage::{
  CoverageKind, MatchCoverage, PatternInfo, canonical_pattern_string, classify_pattern,
};
pub use substitution::{Substitution, SubstitutionKey};
pub use type_::{
  FunctionType, ISourceType, PrimitiveTypeKind, RecordField, Type, TypeVariable, test_type_builder,
};
pub use typing_context::{
  AliasBody, EnvironmentEntry, PreludeRequirements, TypeEnvironment, TypeNameEntry,
};
pub use unification::unify;
