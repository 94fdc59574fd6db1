//! Sources that feed the configuration buffer

pub mod command_line;
pub mod defaults;
pub mod file;
pub mod system;

pub use command_line::{CommandLineConfigurator, SOURCE_COMMAND_LINE};
pub use defaults::{DefaultsConfigurator, SOURCE_DEFAULTS};
pub use file::FileConfigurator;
pub use system::{SystemPropertiesConfigurator, SOURCE_SYSTEM_PROPERTIES, SYSTEM_PROPERTY_PREFIX};
