use serde::{Deserialize, Serialize};

/// Knobs of one configuration run that do not come from options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguratorSettings {
    /// Substituted for `{royaleVersion}` in paths.
    pub tool_version: String,
    /// Option receiving bare command-line arguments.
    pub default_variable: Option<String>,
    /// When off, missing library path entries are kept instead of reported.
    pub report_missing_libraries: bool,
    pub warn_on_ecosystem_only: bool,
    /// Unknown keys in config files are skipped instead of reported.
    pub ignore_unknown_file_items: bool,
    /// Appended to the input file stem to find a project config file.
    pub project_config_suffix: String,
}

impl Default for ConfiguratorSettings {
    fn default() -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            default_variable: Some("file-specs".to_string()),
            report_missing_libraries: true,
            warn_on_ecosystem_only: false,
            ignore_unknown_file_items: false,
            project_config_suffix: "-config.toml".to_string(),
        }
    }
}
