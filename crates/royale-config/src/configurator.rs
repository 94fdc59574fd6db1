use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::buffer::{ConfigurationBuffer, ConfigurationValue};
use crate::config::{validate_no_library_only_options, Configuration, Target};
use crate::error::ConfigResult;
use crate::loader::{
    CommandLineConfigurator, DefaultsConfigurator, FileConfigurator, SystemPropertiesConfigurator,
    SOURCE_COMMAND_LINE, SOURCE_DEFAULTS,
};
use crate::paths::{FsPathResolver, PathResolver};
use crate::problem::ConfigurationProblem;
use crate::properties::Properties;
use crate::schema::OptionRegistry;
use crate::settings::ConfiguratorSettings;

/// Source name of arguments added by [`Configurator::with_extra_arguments`].
pub const SOURCE_EXTRA_ARGUMENTS: &str = "extra arguments";

const LOAD_CONFIG: &str = "load-config";
const FILE_SPECS: &str = "file-specs";

/// What the caller asked for instead of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoRequest {
    Version,
    Help(Vec<String>),
}

/// Serializable summary of the last [`Configurator::configure`] run.
#[derive(Debug, Serialize)]
pub struct ConfigurationReport<'a> {
    pub success: bool,
    /// A fatal problem stopped the run before validation.
    pub fatal: bool,
    pub configuration: Option<&'a Configuration>,
    pub problems: &'a [ConfigurationProblem],
    pub loaded_config_files: &'a [PathBuf],
    pub missing_config_files: &'a [PathBuf],
}

/// Result of a speculative run on top of the last configuration.
#[derive(Debug)]
pub struct Speculation {
    pub configuration: Configuration,
    pub problems: Vec<ConfigurationProblem>,
}

impl Speculation {
    pub fn is_success(&self) -> bool {
        !self.problems.iter().any(ConfigurationProblem::is_error)
    }
}

/// Drives a configuration run: defaults, system properties, command line,
/// configuration files, then commit and validation.
pub struct Configurator {
    registry: Arc<OptionRegistry<Configuration>>,
    settings: ConfiguratorSettings,
    properties: Arc<Properties>,
    resolver: Arc<dyn PathResolver>,
    tokens: BTreeMap<String, String>,
    buffer: Option<ConfigurationBuffer<Configuration>>,
    configuration: Option<Configuration>,
    problems: Vec<ConfigurationProblem>,
    loaded_config_files: Vec<PathBuf>,
    missing_config_files: Vec<PathBuf>,
}

impl Configurator {
    /// Configurator reading the process environment and resolving paths
    /// against the working directory.
    pub fn new() -> ConfigResult<Self> {
        Ok(Self {
            registry: Configuration::registry()?,
            settings: ConfiguratorSettings::default(),
            properties: Arc::new(Properties::from_env()),
            resolver: Arc::new(FsPathResolver::from_current_dir()),
            tokens: BTreeMap::new(),
            buffer: None,
            configuration: None,
            problems: Vec::new(),
            loaded_config_files: Vec::new(),
            missing_config_files: Vec::new(),
        })
    }

    pub fn with_settings(mut self, settings: ConfiguratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = Arc::new(properties);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn PathResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Token applied after the built-in and command-line ones, so it wins over them.
    pub fn set_token(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.tokens.insert(name.into(), value.into());
    }

    pub fn settings(&self) -> &ConfiguratorSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<OptionRegistry<Configuration>> {
        &self.registry
    }

    fn new_buffer(&self) -> ConfigurationBuffer<Configuration> {
        ConfigurationBuffer::new(Arc::clone(&self.registry), Arc::clone(&self.properties))
    }

    fn new_configuration(&self) -> Configuration {
        Configuration::new(Arc::clone(&self.resolver), self.settings.clone())
    }

    fn default_var(&self) -> Option<&str> {
        self.settings.default_variable.as_deref()
    }

    /// Run the whole pipeline over `args`. Returns `true` when the
    /// configuration committed without error problems. Returns `false`
    /// without committing when `-version` or `-help` was given; see
    /// [`Configurator::info_request`].
    pub fn configure(&mut self, args: &[String]) -> bool {
        self.problems.clear();
        self.loaded_config_files.clear();
        self.missing_config_files.clear();
        self.configuration = None;

        let mut buffer = self.new_buffer();
        let mut configuration = self.new_configuration();

        let proceed = match self.load(&mut buffer, args) {
            Ok(proceed) => proceed,
            Err(err) => {
                warn!(error = %err, "Configuration aborted");
                self.problems.push(err.into());
                self.buffer = Some(buffer);
                return false;
            }
        };
        if !proceed {
            debug!("Version or help requested; skipping commit");
            self.buffer = Some(buffer);
            return false;
        }

        buffer.commit(&mut configuration, &mut self.problems);
        self.problems.extend(configuration.take_problems());
        if self.has_fatal_problem() {
            error!("Fatal configuration problem; skipping validation");
        } else {
            self.problems.extend(configuration.validate(&buffer));
        }

        let success = !self.problems.iter().any(ConfigurationProblem::is_error);
        info!(
            success,
            problems = self.problems.len(),
            loaded = self.loaded_config_files.len(),
            "Configuration complete"
        );
        self.buffer = Some(buffer);
        self.configuration = Some(configuration);
        success
    }

    /// Fill the buffer from every source. `Ok(false)` is an early exit.
    fn load(&mut self, buffer: &mut ConfigurationBuffer<Configuration>, args: &[String]) -> ConfigResult<bool> {
        DefaultsConfigurator::load_defaults(buffer)?;
        SystemPropertiesConfigurator::load(buffer, &self.properties)?;
        CommandLineConfigurator::parse(buffer, self.default_var(), args)?;

        let sdk_known = self.properties.contains("royalelib")
            || self.properties.contains("application.home")
            || self.tokens.contains_key("royalelib")
            || buffer.tokens().is_defined("royalelib");
        if !sdk_known {
            debug!("No SDK location configured; skipping default configuration file");
            let explicit: Vec<ConfigurationValue> = buffer
                .get_var(LOAD_CONFIG)
                .map(|values| values.iter().filter(|v| v.source() != SOURCE_DEFAULTS).cloned().collect())
                .unwrap_or_default();
            buffer.clear_var(LOAD_CONFIG);
            for value in explicit {
                buffer.set_value(value)?;
            }
        }

        let royalelib = match (self.properties.get("royalelib"), self.properties.get("application.home")) {
            (Some(lib), _) => lib.to_string(),
            (None, Some(home)) => format!("{}/frameworks", home),
            (None, None) => ".".to_string(),
        };
        // `+name=value` on the command line wins over the built-in value
        for (name, value) in [
            ("royalelib", royalelib),
            ("configname", "royale".to_string()),
            ("build.number", "workspace".to_string()),
        ] {
            if !buffer.tokens().is_defined(name) {
                buffer.set_token(name, value);
            }
        }
        self.apply_tokens(buffer);

        if buffer.has_values("version") || buffer.has_values("help") {
            return Ok(false);
        }

        self.load_config_files(buffer);
        self.load_project_config(buffer)?;

        buffer.clear_source_vars(SOURCE_COMMAND_LINE);
        CommandLineConfigurator::parse(buffer, self.default_var(), args)?;
        self.apply_tokens(buffer);
        Ok(true)
    }

    fn apply_tokens(&self, buffer: &mut ConfigurationBuffer<Configuration>) {
        for (name, value) in &self.tokens {
            buffer.set_token(name.clone(), value.clone());
        }
    }

    fn load_config_files(&mut self, buffer: &mut ConfigurationBuffer<Configuration>) {
        let values: Vec<ConfigurationValue> = buffer.get_var(LOAD_CONFIG).map(<[_]>::to_vec).unwrap_or_default();
        for value in &values {
            let origin = value.origin();
            let paths = match buffer.process_values(LOAD_CONFIG, value.args(), &origin) {
                Ok(paths) => paths,
                Err(err) => {
                    self.problems.push(err.into());
                    continue;
                }
            };
            for path in paths {
                let path = self.resolve_in_context(&path, value.context());
                if self.resolver.is_file(&path) {
                    self.load_file(buffer, path);
                } else {
                    warn!(path = %path.display(), "Configuration file not found");
                    self.problems.push(ConfigurationProblem::missing_config_file(
                        &path.display().to_string(),
                        Some(&origin),
                    ));
                    self.missing_config_files.push(path);
                }
            }
        }
    }

    /// `src/App.mxml` picks up `src/App-config.toml` when it exists.
    fn load_project_config(&mut self, buffer: &mut ConfigurationBuffer<Configuration>) -> ConfigResult<()> {
        let Some(value) = buffer.get_var(FILE_SPECS).and_then(|values| values.last()).cloned() else {
            return Ok(());
        };
        let Some(last) = value.args().last() else {
            return Ok(());
        };
        let processed = buffer.process_values(FILE_SPECS, std::slice::from_ref(last), &value.origin())?;
        let Some(spec) = processed.first() else {
            return Ok(());
        };

        let input = self.resolve_in_context(spec, value.context());
        let Some(stem) = input.file_stem().and_then(|s| s.to_str()) else {
            return Ok(());
        };
        let project = input.with_file_name(format!("{}{}", stem, self.settings.project_config_suffix));
        if self.resolver.is_file(&project) {
            self.load_file(buffer, project);
        } else {
            debug!(path = %project.display(), "No project configuration file");
        }
        Ok(())
    }

    /// A rejected file is reported and the run goes on with whatever it set.
    fn load_file(&mut self, buffer: &mut ConfigurationBuffer<Configuration>, path: PathBuf) {
        if let Err(err) = FileConfigurator::load(buffer, &path, self.settings.ignore_unknown_file_items) {
            warn!(path = %path.display(), error = %err, "Configuration file rejected");
            self.problems.push(err.into());
        }
        self.loaded_config_files.push(path);
    }

    fn has_fatal_problem(&self) -> bool {
        self.problems.iter().any(|p| p.fatal)
    }

    fn resolve_in_context(&self, path: &str, context: Option<&Path>) -> PathBuf {
        match context {
            Some(context) if !Path::new(path).is_absolute() => {
                self.resolver.resolve(&context.join(path).to_string_lossy())
            }
            _ => self.resolver.resolve(path),
        }
    }

    /// Parse `args` on their own and, for application targets, reject
    /// library-only options.
    pub fn validate_configuration(&self, args: &[String], target: Target) -> ConfigResult<()> {
        let mut buffer = self.new_buffer();
        CommandLineConfigurator::parse(&mut buffer, self.default_var(), args)?;
        if target == Target::Swf {
            validate_no_library_only_options(&buffer)?;
        }
        Ok(())
    }

    /// Commit the last run's values plus `extra` into a new configuration,
    /// leaving this configurator's state untouched. Extra arguments override
    /// values from every other source.
    pub fn with_extra_arguments(&self, extra: &[String]) -> Speculation {
        let mut buffer = match &self.buffer {
            Some(buffer) => buffer.fork(false),
            None => self.new_buffer(),
        };
        let mut configuration = self.new_configuration();
        let mut problems = Vec::new();

        let parsed = CommandLineConfigurator::parse_as(&mut buffer, None, extra, SOURCE_EXTRA_ARGUMENTS);
        match parsed {
            Ok(()) => {
                buffer.commit(&mut configuration, &mut problems);
                problems.extend(configuration.take_problems());
            }
            Err(err) => problems.push(err.into()),
        }
        debug!(extra = extra.len(), problems = problems.len(), "Speculative configuration");
        Speculation { configuration, problems }
    }

    /// Set when the last run stopped early for `-version` or `-help`.
    pub fn info_request(&self) -> Option<InfoRequest> {
        let buffer = self.buffer.as_ref()?;
        if buffer.has_values("help") {
            let keywords: Vec<String> = buffer
                .get_var("help")
                .map(|values| values.iter().flat_map(|v| v.args().iter().cloned()).collect())
                .unwrap_or_default();
            return Some(InfoRequest::Help(keywords));
        }
        buffer.has_values("version").then_some(InfoRequest::Version)
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    pub fn buffer(&self) -> Option<&ConfigurationBuffer<Configuration>> {
        self.buffer.as_ref()
    }

    pub fn problems(&self) -> &[ConfigurationProblem] {
        &self.problems
    }

    pub fn loaded_config_files(&self) -> &[PathBuf] {
        &self.loaded_config_files
    }

    pub fn missing_config_files(&self) -> &[PathBuf] {
        &self.missing_config_files
    }

    pub fn report(&self) -> ConfigurationReport<'_> {
        ConfigurationReport {
            success: self.configuration.is_some() && !self.problems.iter().any(ConfigurationProblem::is_error),
            fatal: self.has_fatal_problem(),
            configuration: self.configuration.as_ref(),
            problems: &self.problems,
            loaded_config_files: &self.loaded_config_files,
            missing_config_files: &self.missing_config_files,
        }
    }
}
