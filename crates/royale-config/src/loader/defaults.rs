use tracing::debug;

use crate::buffer::ConfigurationBuffer;
use crate::error::ConfigResult;

pub const SOURCE_DEFAULTS: &str = "defaults";

/// Seeds the buffer with every option's declared default value.
pub struct DefaultsConfigurator;

impl DefaultsConfigurator {
    pub fn load_defaults<T: 'static>(buffer: &mut ConfigurationBuffer<T>) -> ConfigResult<()> {
        let registry = std::sync::Arc::clone(buffer.registry());
        let mut count = 0;
        for descriptor in registry.iter() {
            if let Some(values) = descriptor.default_values() {
                buffer.set_var(descriptor.name(), values.iter().cloned(), SOURCE_DEFAULTS, None)?;
                count += 1;
            }
        }
        debug!(count, "Loaded option defaults");
        Ok(())
    }
}
