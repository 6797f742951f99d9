use serde_json::Value;
use std::{
  fs,
  path::{Path, PathBuf},
};

pub const CONFIGURATION_FILE_NAME: &str = "lyconfig.json";

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfiguration {
  pub source_directory: String,
  pub entry_points: Vec<String>,
  pub ignores: Vec<String>,
  /// Expressions nested deeper than this are reported instead of checked.
  pub max_nesting_depth: usize,
}

impl Default for ProjectConfiguration {
  fn default() -> Self {
    ProjectConfiguration {
      source_directory: ".".to_string(),
      entry_points: vec![],
      ignores: vec![],
      max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
    }
  }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigurationLoadingFailure {
  UnreadableConfigurationFile,
  UnparsableConfigurationFile,
  NoConfiguration,
}

impl ConfigurationLoadingFailure {
  pub fn to_str(&self) -> &'static str {
    match self {
      ConfigurationLoadingFailure::UnreadableConfigurationFile => "UNREADABLE_CONFIGURATION_FILE",
      ConfigurationLoadingFailure::UnparsableConfigurationFile => "UNPARSABLE_CONFIGURATION_FILE",
      ConfigurationLoadingFailure::NoConfiguration => "NO_CONFIGURATION",
    }
  }
}

fn parse_string_field(parsed: &Value, field: &str, default: &str) -> Option<String> {
  Some(if let Some(s) = parsed.get(field) { s.as_str()? } else { default }.to_string())
}

fn parse_string_array_field(parsed: &Value, field: &str) -> Option<Vec<String>> {
  let mut parsed_array = vec![];
  if let Some(array) = parsed.get(field) {
    for elem in array.as_array()? {
      parsed_array.push(elem.as_str()?.to_string());
    }
  }
  Some(parsed_array)
}

fn parse_positive_integer_field(parsed: &Value, field: &str, default: usize) -> Option<usize> {
  match parsed.get(field) {
    None => Some(default),
    Some(v) => usize::try_from(v.as_u64()?).ok().filter(|n| *n > 0),
  }
}

pub fn parse_configuration(configuration_string: &str) -> Option<ProjectConfiguration> {
  let parsed: Value = serde_json::from_str(configuration_string).ok()?;
  parsed.as_object()?;
  let source_directory = parse_string_field(&parsed, "sourceDirectory", ".")?;
  let entry_points = parse_string_array_field(&parsed, "entryPoints")?;
  let ignores = parse_string_array_field(&parsed, "ignores")?;
  let max_nesting_depth =
    parse_positive_integer_field(&parsed, "maxNestingDepth", DEFAULT_MAX_NESTING_DEPTH)?;
  Some(ProjectConfiguration { source_directory, entry_points, ignores, max_nesting_depth })
}

/// Walks up from `start_path` and loads the first configuration file it finds.
pub fn load_project_configuration_custom_start_path(
  start_path: &Path,
) -> Result<ProjectConfiguration, ConfigurationLoadingFailure> {
  let Ok(start_path_buf) = fs::canonicalize(PathBuf::from(start_path)) else {
    return Err(ConfigurationLoadingFailure::NoConfiguration);
  };
  let mut config_dir_opt = Some(start_path_buf.as_path());
  while let Some(config_dir) = config_dir_opt {
    let config_path = config_dir.join(CONFIGURATION_FILE_NAME);
    if !config_path.exists() {
      config_dir_opt = config_dir.parent();
      continue;
    }
    let Ok(content) = fs::read_to_string(config_path) else {
      return Err(ConfigurationLoadingFailure::UnreadableConfigurationFile);
    };
    return parse_configuration(&content)
      .ok_or(ConfigurationLoadingFailure::UnparsableConfigurationFile);
  }
  Err(ConfigurationLoadingFailure::NoConfiguration)
}

pub fn load_project_configuration() -> Result<ProjectConfiguration, ConfigurationLoadingFailure> {
  load_project_configuration_custom_start_path(Path::new("."))
}
