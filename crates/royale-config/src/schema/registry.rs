use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

use super::descriptor::{OptionDescriptor, Schema};

/// Immutable table of every option a configuration type accepts, in
/// declaration order. Shared by all buffers for that type.
pub struct OptionRegistry<T> {
    options: IndexMap<String, OptionDescriptor<T>>,
    aliases: BTreeMap<String, String>,
    required: Vec<String>,
}

impl<T> fmt::Debug for OptionRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionRegistry")
            .field("options", &self.options.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .field("required", &self.required)
            .finish()
    }
}

impl<T: 'static> OptionRegistry<T> {
    pub fn build(schema: Schema<T>) -> ConfigResult<Self> {
        Self::build_filtered(schema, |_| true)
    }

    /// Build from the subset of `schema` accepted by `keep`. Aliases whose
    /// target was filtered out are dropped.
    pub fn build_filtered<F>(schema: Schema<T>, keep: F) -> ConfigResult<Self>
    where
        F: Fn(&OptionDescriptor<T>) -> bool,
    {
        let mut options = IndexMap::with_capacity(schema.options.len());
        for descriptor in schema.options {
            if !keep(&descriptor) {
                continue;
            }
            let name = descriptor.name().to_string();
            if options.contains_key(&name) {
                return Err(ConfigError::DuplicateOption(name));
            }
            options.insert(name, descriptor);
        }

        if options.is_empty() {
            return Err(ConfigError::EmptySchema);
        }

        let required = options
            .values()
            .filter(|d| d.flags().is_required)
            .map(|d| d.name().to_string())
            .collect();

        let mut registry = Self {
            options,
            aliases: BTreeMap::new(),
            required,
        };

        for (alias, target) in schema.aliases {
            if !registry.options.contains_key(&target) {
                debug!(alias = %alias, target = %target, "Dropping alias to filtered option");
                continue;
            }
            registry.check_alias(&registry.aliases, &alias, &target)?;
            registry.aliases.insert(alias, target);
        }

        debug!(
            options = registry.options.len(),
            aliases = registry.aliases.len(),
            "Built option registry"
        );
        Ok(registry)
    }

    /// Validate `alias -> target` against the registry and an alias table.
    pub(crate) fn check_alias(
        &self,
        aliases: &BTreeMap<String, String>,
        alias: &str,
        target: &str,
    ) -> ConfigResult<()> {
        let invalid = |reason: &str| ConfigError::InvalidAlias {
            alias: alias.to_string(),
            reason: reason.to_string(),
        };
        if !self.options.contains_key(target) {
            return Err(invalid(&format!("target '{}' is not an option", target)));
        }
        if aliases.contains_key(alias) {
            return Err(invalid("already defined"));
        }
        if self.options.contains_key(alias) {
            return Err(invalid("collides with an option name"));
        }
        Ok(())
    }

    /// Resolve an alias to its canonical name; other names pass through.
    pub fn canonicalize<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn lookup(&self, name: &str) -> Option<&OptionDescriptor<T>> {
        self.options.get(self.canonicalize(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.options.get_index_of(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionDescriptor<T>> {
        self.options.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn aliases_for(&self, name: &str) -> Vec<&str> {
        self.aliases
            .iter()
            .filter(|(_, target)| target.as_str() == name)
            .map(|(alias, _)| alias.as_str())
            .collect()
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// One line per displayed option, sorted by name.
    pub fn usage(&self, include_advanced: bool) -> String {
        let mut lines: Vec<String> = self
            .options
            .values()
            .filter(|d| d.flags().is_displayed && (include_advanced || !d.flags().is_advanced))
            .map(|d| {
                let mut line = d.usage();
                let aliases = self.aliases_for(d.name());
                if !aliases.is_empty() {
                    line.push_str(&format!("  alias -{}", aliases.join(", -")));
                }
                if d.flags().is_advanced {
                    line.push_str("  (advanced)");
                }
                if d.is_deprecated() {
                    line.push_str("  (deprecated)");
                }
                line
            })
            .collect();
        lines.sort();
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}
