use super::{
  constructors::{AdtDefinition, ConstructorDefinition},
  instantiation::TypeVariableGenerator,
  main_checker::{self, ModuleCheckResult},
  typing_context::{EnvironmentEntry, TypeNameEntry},
};
use lyra_ast::source::Module;
use lyra_configuration::{DEFAULT_MAX_NESTING_DEPTH, ProjectConfiguration};
use lyra_errors::CompileTimeError;
use lyra_heap::{Heap, ModuleReference, PStr};
use std::{
  collections::HashMap,
  fs,
  path::{Path, PathBuf},
  rc::Rc,
};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckerOptions {
  pub max_nesting_depth: usize,
}

impl Default for CheckerOptions {
  fn default() -> Self {
    CheckerOptions { max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH }
  }
}

impl From<&ProjectConfiguration> for CheckerOptions {
  fn from(configuration: &ProjectConfiguration) -> Self {
    CheckerOptions { max_nesting_depth: configuration.max_nesting_depth }
  }
}

/// Supplies the syntax tree of an imported module.
pub trait ModuleLoader {
  fn load(&self, heap: &mut Heap, module_reference: ModuleReference) -> Option<Module>;
}

/// Turns source text into a module. The checker does not ship a parser of its own.
pub trait SourceParser {
  fn parse(&self, heap: &mut Heap, module_reference: ModuleReference, source: &str)
  -> Option<Module>;
}

#[derive(Default)]
pub struct InMemoryModuleLoader {
  modules: HashMap<ModuleReference, Module>,
}

impl InMemoryModuleLoader {
  pub fn new() -> InMemoryModuleLoader {
    InMemoryModuleLoader::default()
  }

  pub fn add(&mut self, module_reference: ModuleReference, module: Module) {
    self.modules.insert(module_reference, module);
  }
}

impl ModuleLoader for InMemoryModuleLoader {
  fn load(&self, _heap: &mut Heap, module_reference: ModuleReference) -> Option<Module> {
    self.modules.get(&module_reference).cloned()
  }
}

/// Reads `<source_directory>/<a>/<b>.ly` for the module `a.b`.
pub struct FileSystemModuleLoader {
  source_directory: PathBuf,
  parser: Box<dyn SourceParser>,
}

impl FileSystemModuleLoader {
  pub fn new(source_directory: &Path, parser: Box<dyn SourceParser>) -> FileSystemModuleLoader {
    FileSystemModuleLoader { source_directory: source_directory.to_path_buf(), parser }
  }

  pub fn from_configuration(
    configuration: &ProjectConfiguration,
    parser: Box<dyn SourceParser>,
  ) -> FileSystemModuleLoader {
    FileSystemModuleLoader::new(Path::new(&configuration.source_directory), parser)
  }
}

impl ModuleLoader for FileSystemModuleLoader {
  fn load(&self, heap: &mut Heap, module_reference: ModuleReference) -> Option<Module> {
    let path = self.source_directory.join(module_reference.to_filename(heap));
    match fs::read_to_string(&path) {
      Ok(source) => self.parser.parse(heap, module_reference, &source),
      Err(e) => {
        debug!(path = %path.display(), error = %e, "module source is unreadable");
        None
      }
    }
  }
}

/// What importers can see of a checked module.
#[derive(Debug, Clone)]
pub struct CachedModule {
  pub exports: HashMap<PStr, EnvironmentEntry>,
  pub exported_types: HashMap<PStr, TypeNameEntry>,
  pub adts: Vec<AdtDefinition>,
  pub constructors: Vec<ConstructorDefinition>,
  pub errors: Vec<CompileTimeError>,
}

pub(crate) enum ImportResolution {
  Resolved(Rc<CachedModule>),
  Cycle,
  NotFound,
}

/// State shared by every module checked in one run: options, the type variable counter, the
/// module cache and the stack of modules being checked.
pub struct CheckerSession {
  pub(crate) options: CheckerOptions,
  pub(crate) type_variable_generator: TypeVariableGenerator,
  pub(crate) resolving_stack: Vec<ModuleReference>,
  cache: HashMap<ModuleReference, Rc<CachedModule>>,
  loader: Box<dyn ModuleLoader>,
}

impl CheckerSession {
  pub fn new(options: CheckerOptions, loader: Box<dyn ModuleLoader>) -> CheckerSession {
    CheckerSession {
      options,
      type_variable_generator: TypeVariableGenerator::new(),
      resolving_stack: vec![],
      cache: HashMap::new(),
      loader,
    }
  }

  pub fn options(&self) -> CheckerOptions {
    self.options
  }

  pub fn cached_module(&self, module_reference: ModuleReference) -> Option<Rc<CachedModule>> {
    self.cache.get(&module_reference).cloned()
  }

  /// Loads the module through the session's loader and checks it.
  pub fn check_module_by_reference(
    &mut self,
    heap: &mut Heap,
    module_reference: ModuleReference,
  ) -> Option<ModuleCheckResult> {
    let module = self.loader.load(heap, module_reference)?;
    Some(main_checker::type_check_module(self, heap, module_reference, &module))
  }

  pub(crate) fn store(&mut self, module_reference: ModuleReference, module: CachedModule) {
    self.cache.insert(module_reference, Rc::new(module));
  }

  pub(crate) fn resolve_import(
    &mut self,
    heap: &mut Heap,
    module_reference: ModuleReference,
  ) -> ImportResolution {
    if let Some(cached) = self.cache.get(&module_reference) {
      debug!(module = %module_reference.pretty_print(heap), "module cache hit");
      return ImportResolution::Resolved(cached.clone());
    }
    if self.resolving_stack.contains(&module_reference) {
      debug!(module = %module_reference.pretty_print(heap), "import cycle detected");
      return ImportResolution::Cycle;
    }
    let Some(module) = self.loader.load(heap, module_reference) else {
      warn!(module = %module_reference.pretty_print(heap), "cannot load imported module");
      return ImportResolution::NotFound;
    };
    main_checker::type_check_module(self, heap, module_reference, &module);
    match self.cache.get(&module_reference) {
      Some(cached) => ImportResolution::Resolved(cached.clone()),
      None => ImportResolution::NotFound,
    }
  }
}

/// Resolves `./x`, `../x` and `./x.ly` against the directory of `importer`. Bare paths and paths
/// escaping the source root do not resolve.
pub fn resolve_module_path(
  heap: &mut Heap,
  importer: ModuleReference,
  path: &str,
) -> Option<ModuleReference> {
  if !(path.starts_with("./") || path.starts_with("../")) {
    return None;
  }
  let path = path.strip_suffix(".ly").unwrap_or(path);
  let mut parts =
    importer.get_parts(heap).iter().map(|p| p.as_str(heap).to_string()).collect::<Vec<_>>();
  parts.pop();
  for segment in path.split('/') {
    match segment {
      "" | "." => {}
      ".." => {
        parts.pop()?;
      }
      name => parts.push(name.to_string()),
    }
  }
  if parts.is_empty() { None } else { Some(heap.alloc_module_reference_from_string_vec(parts)) }
}
