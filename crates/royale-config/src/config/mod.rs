//! The typed configuration object options are committed onto.

mod options;
mod player;
mod validation;

pub use options::{schema, DEFAULT_OUTPUT_DIRECTORY_TOKEN};
pub use player::PlayerVersion;
pub use validation::{validate_no_library_only_options, Target};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::error::{ConfigError, ConfigResult};
use crate::paths::{expand_tokens, resolve_path_strict, FsPathResolver, PathResolver, PathTokens};
use crate::problem::ConfigurationProblem;
use crate::schema::{OptionCall, OptionRegistry};
use crate::settings::ConfiguratorSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Define {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceMapping {
    pub uri: String,
    pub manifest: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageRange {
    pub lang: String,
    pub range: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DefaultSize {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScriptLimits {
    pub max_recursion_depth: i32,
    pub max_execution_time: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub creators: Vec<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    pub label: String,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RslPath {
    pub swc: PathBuf,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeFile {
    pub name: String,
    pub path: PathBuf,
}

/// Committed compiler settings. Every field is written by exactly one
/// option setter; see [`schema`] for the option each one belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct Configuration {
    pub royale: bool,
    pub load_config: Vec<PathBuf>,
    pub version: bool,
    pub help: Vec<String>,
    pub dump_config: Option<PathBuf>,
    pub verbose: bool,
    pub diagnostics: i32,
    pub warnings: bool,

    pub target_player: PlayerVersion,
    pub swf_version: i32,

    pub locales: Vec<String>,
    pub exclude_native_js_libraries: bool,
    pub library_path: Vec<PathBuf>,
    pub external_library_path: Vec<PathBuf>,
    pub source_path: Vec<PathBuf>,
    pub include_libraries: Vec<PathBuf>,
    pub theme: Vec<PathBuf>,
    pub debug: bool,
    pub strict: bool,
    pub as3: bool,
    pub es: bool,
    pub accessible: bool,
    pub optimize: bool,
    pub defines: Vec<Define>,
    pub namespaces: Vec<NamespaceMapping>,
    pub font_managers: Vec<String>,
    pub language_ranges: Vec<LanguageRange>,
    pub compatibility_version: Option<String>,
    pub minimum_supported_version: Option<String>,
    pub defaults_css_url: Option<PathBuf>,
    pub keep_as3_metadata: Vec<String>,
    pub headless_server: bool,

    pub default_size: DefaultSize,
    pub default_frame_rate: i32,
    pub default_background_color: i32,
    pub script_limits: ScriptLimits,
    pub debug_password: String,
    pub includes: Vec<String>,
    pub externs: Vec<String>,
    pub output: Option<PathBuf>,
    pub link_report: Option<PathBuf>,
    pub use_network: bool,
    pub tools_locale: Option<String>,
    pub metadata: Metadata,
    pub frames: Vec<FrameInfo>,
    pub licenses: BTreeMap<String, String>,

    pub runtime_shared_libraries: Vec<String>,
    pub rsl_paths: Vec<RslPath>,
    pub static_link_rsls: bool,

    pub include_classes: Vec<String>,
    pub include_sources: Vec<PathBuf>,
    pub include_namespaces: Vec<String>,
    pub include_files: Vec<IncludeFile>,
    pub directory: bool,
    pub use_flashbuilder_project_files: bool,
    pub file_specs: Vec<PathBuf>,

    /// Search-path entries produced by `{locale}` expansion, by locale.
    pub locale_dependent_sources: BTreeMap<PathBuf, String>,

    #[serde(skip)]
    problems: Vec<ConfigurationProblem>,
    #[serde(skip)]
    resolver: Arc<dyn PathResolver>,
    #[serde(skip)]
    settings: ConfiguratorSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(
            Arc::new(FsPathResolver::from_current_dir()),
            ConfiguratorSettings::default(),
        )
    }
}

impl Configuration {
    pub fn new(resolver: Arc<dyn PathResolver>, settings: ConfiguratorSettings) -> Self {
        Self {
            royale: false,
            load_config: Vec::new(),
            version: false,
            help: Vec::new(),
            dump_config: None,
            verbose: false,
            diagnostics: 0,
            warnings: true,
            target_player: PlayerVersion::default(),
            swf_version: 14,
            locales: Vec::new(),
            exclude_native_js_libraries: false,
            library_path: Vec::new(),
            external_library_path: Vec::new(),
            source_path: Vec::new(),
            include_libraries: Vec::new(),
            theme: Vec::new(),
            debug: false,
            strict: true,
            as3: true,
            es: false,
            accessible: false,
            optimize: true,
            defines: Vec::new(),
            namespaces: Vec::new(),
            font_managers: Vec::new(),
            language_ranges: Vec::new(),
            compatibility_version: None,
            minimum_supported_version: None,
            defaults_css_url: None,
            keep_as3_metadata: Vec::new(),
            headless_server: false,
            default_size: DefaultSize {
                width: 500,
                height: 375,
            },
            default_frame_rate: 24,
            default_background_color: 0xFFFFFF,
            script_limits: ScriptLimits {
                max_recursion_depth: 1000,
                max_execution_time: 60,
            },
            debug_password: String::new(),
            includes: Vec::new(),
            externs: Vec::new(),
            output: None,
            link_report: None,
            use_network: true,
            tools_locale: None,
            metadata: Metadata::default(),
            frames: Vec::new(),
            licenses: BTreeMap::new(),
            runtime_shared_libraries: Vec::new(),
            rsl_paths: Vec::new(),
            static_link_rsls: true,
            include_classes: Vec::new(),
            include_sources: Vec::new(),
            include_namespaces: Vec::new(),
            include_files: Vec::new(),
            directory: false,
            use_flashbuilder_project_files: false,
            file_specs: Vec::new(),
            locale_dependent_sources: BTreeMap::new(),
            problems: Vec::new(),
            resolver,
            settings,
        }
    }

    /// The option registry for this type, built on first use.
    pub fn registry() -> ConfigResult<Arc<OptionRegistry<Configuration>>> {
        static REGISTRY: OnceLock<Result<Arc<OptionRegistry<Configuration>>, ConfigError>> = OnceLock::new();
        REGISTRY
            .get_or_init(|| OptionRegistry::build(schema()).map(Arc::new))
            .clone()
    }

    /// Problems raised by setters that did not abort their option, such as
    /// dropped search-path entries.
    pub fn problems(&self) -> &[ConfigurationProblem] {
        &self.problems
    }

    pub(crate) fn take_problems(&mut self) -> Vec<ConfigurationProblem> {
        std::mem::take(&mut self.problems)
    }

    pub fn resolver(&self) -> &Arc<dyn PathResolver> {
        &self.resolver
    }

    pub fn settings(&self) -> &ConfiguratorSettings {
        &self.settings
    }

    fn path_tokens(&self, call: &OptionCall<'_>) -> PathTokens {
        let playerglobal_home = call
            .property("PLAYERGLOBAL_HOME")
            .or_else(|| call.token("env.PLAYERGLOBAL_HOME"))
            .unwrap_or("libs/player");
        let air_home = call
            .property("AIR_HOME")
            .or_else(|| call.token("env.AIR_HOME"))
            .unwrap_or("..");
        PathTokens {
            playerglobal_home: playerglobal_home.to_string(),
            air_home: air_home.to_string(),
            tool_version: self.settings.tool_version.clone(),
            player_major: self.target_player.major,
            player_minor: self.target_player.minor,
        }
    }

    /// Best-effort expansion of a search path; dropped entries become problems.
    fn expand_paths(&mut self, call: &OptionCall<'_>, tolerate_missing: bool) -> Vec<PathBuf> {
        let tokens = self.path_tokens(call);
        let expansion = expand_tokens(
            self.resolver.as_ref(),
            &tokens,
            &call.list(),
            &self.locales,
            call.value(),
            tolerate_missing,
        );
        self.locale_dependent_sources.extend(expansion.locale_sources);
        self.problems.extend(expansion.problems);
        expansion.paths
    }

    fn resolve_strict(&self, call: &OptionCall<'_>, path: &str) -> ConfigResult<PathBuf> {
        resolve_path_strict(self.resolver.as_ref(), path, call.context(), false)
            .map_err(|err| err.with_var(call.var()).with_origin(&call.origin()))
    }

    /// Strict resolution that also rejects directories.
    fn resolve_file(&self, call: &OptionCall<'_>, path: &str) -> ConfigResult<PathBuf> {
        let resolved = self.resolve_strict(call, path)?;
        if !self.resolver.is_file(&resolved) {
            return Err(ConfigError::NotAFile {
                var: Some(call.var().to_string()),
                path: resolved.display().to_string(),
                origin: call.origin(),
            });
        }
        Ok(resolved)
    }

    fn resolve_lenient(&self, call: &OptionCall<'_>, path: &str) -> PathBuf {
        match call.context() {
            Some(context) if !Path::new(path).is_absolute() => {
                self.resolver.resolve(&context.join(path).to_string_lossy())
            }
            _ => self.resolver.resolve(path),
        }
    }

    /// Output files go to the default output directory token when set,
    /// otherwise next to the file that named them.
    fn output_path(&self, call: &OptionCall<'_>, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            return self.resolver.resolve(path);
        }
        match call.token(DEFAULT_OUTPUT_DIRECTORY_TOKEN) {
            Some(dir) => self.resolver.resolve(&Path::new(dir).join(path).to_string_lossy()),
            None => self.resolve_lenient(call, path),
        }
    }
}
