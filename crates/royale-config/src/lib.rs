//! Configuration binder for the Royale compiler.
//!
//! Options are declared once in a [`Schema`], collected from defaults,
//! system properties, the command line and TOML files into a
//! [`ConfigurationBuffer`], then committed onto a typed [`Configuration`]
//! with prerequisite ordering. The [`Configurator`] runs the whole pipeline.

pub mod buffer;
pub mod config;
pub mod configurator;
pub mod error;
pub mod loader;
pub mod paths;
pub mod problem;
pub mod properties;
pub mod schema;
pub mod settings;

pub use buffer::{ConfigurationBuffer, ConfigurationValue, TokenTable};
pub use config::{Configuration, PlayerVersion, Target};
pub use configurator::{ConfigurationReport, Configurator, InfoRequest, Speculation};
pub use error::{ConfigError, ConfigResult, Origin};
pub use paths::{FsPathResolver, PathResolver};
pub use problem::{ConfigurationProblem, Severity};
pub use properties::Properties;
pub use schema::{ArgContract, ArgType, OptionCall, OptionDescriptor, OptionRegistry, Schema};
pub use settings::ConfiguratorSettings;
