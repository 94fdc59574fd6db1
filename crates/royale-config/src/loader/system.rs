use tracing::debug;

use crate::buffer::ConfigurationBuffer;
use crate::error::ConfigResult;
use crate::properties::Properties;

pub const SOURCE_SYSTEM_PROPERTIES: &str = "system properties";

/// Properties under this prefix name options, e.g. `royale.compiler.debug`.
pub const SYSTEM_PROPERTY_PREFIX: &str = "royale";

/// Loads options from process properties.
pub struct SystemPropertiesConfigurator;

impl SystemPropertiesConfigurator {
    /// Every `royale.<option>` property sets that option, its value split
    /// on commas. Properties naming no option are skipped.
    pub fn load<T: 'static>(buffer: &mut ConfigurationBuffer<T>, properties: &Properties) -> ConfigResult<()> {
        for (name, value) in properties.prefixed(SYSTEM_PROPERTY_PREFIX) {
            if !buffer.is_valid_var(name) {
                debug!(property = name, "Ignoring property that names no option");
                continue;
            }
            let args: Vec<String> = value.split(',').map(|s| s.trim().to_string()).collect();
            buffer.set_var(name, args, SOURCE_SYSTEM_PROPERTIES, None)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Configuration;

    #[test]
    fn test_prefixed_properties_set_options() {
        let properties = Properties::new()
            .with("royale.compiler.debug", "true")
            .with("royale.compiler.locale", "en_US, ja_JP")
            .with("royale.not-an-option", "x")
            .with("PLAYERGLOBAL_HOME", "/pg");
        let mut buf = ConfigurationBuffer::new(Configuration::registry().unwrap(), Arc::new(properties.clone()));
        SystemPropertiesConfigurator::load(&mut buf, &properties).unwrap();

        assert_eq!(buf.get_var("compiler.debug").unwrap()[0].source(), SOURCE_SYSTEM_PROPERTIES);
        assert_eq!(buf.get_var("compiler.locale").unwrap()[0].args(), ["en_US", "ja_JP"]);
        assert_eq!(buf.var_names().count(), 2);
    }
}
