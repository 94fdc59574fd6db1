//! The value buffer: per-option pending values from every source, merged
//! under the overwrite/append rules and committed onto a target object.

mod commit;
mod dump;
mod tokens;
mod value;

pub use commit::{decode_int, decode_long, parse_bool};
pub use tokens::{TokenTable, MAX_TOKEN_SUBSTITUTIONS};
pub use value::ConfigurationValue;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::trace;

use crate::error::{ConfigError, ConfigResult, Origin};
use crate::properties::Properties;
use crate::schema::OptionRegistry;

pub struct ConfigurationBuffer<T> {
    registry: Arc<OptionRegistry<T>>,
    vars: BTreeMap<String, Vec<ConfigurationValue>>,
    committed: BTreeSet<String>,
    aliases: BTreeMap<String, String>,
    tokens: TokenTable,
}

impl<T: 'static> ConfigurationBuffer<T> {
    pub fn new(registry: Arc<OptionRegistry<T>>, properties: Arc<Properties>) -> Self {
        let aliases = registry.aliases().clone();
        Self {
            registry,
            vars: BTreeMap::new(),
            committed: BTreeSet::new(),
            aliases,
            tokens: TokenTable::new(properties),
        }
    }

    /// Copy sharing the registry. Pending values and tokens are deep-copied;
    /// the committed set only when `copy_committed` is set.
    pub fn fork(&self, copy_committed: bool) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            vars: self.vars.clone(),
            committed: if copy_committed {
                self.committed.clone()
            } else {
                BTreeSet::new()
            },
            aliases: self.aliases.clone(),
            tokens: self.tokens.clone(),
        }
    }

    pub fn registry(&self) -> &Arc<OptionRegistry<T>> {
        &self.registry
    }

    pub fn unalias<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn is_valid_var(&self, name: &str) -> bool {
        self.registry.contains(self.unalias(name))
    }

    pub fn add_alias(&mut self, alias: &str, target: &str) -> ConfigResult<()> {
        self.registry.check_alias(&self.aliases, alias, target)?;
        self.aliases.insert(alias.to_string(), target.to_string());
        Ok(())
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Store `args` for `var` from `source`.
    pub fn set_var<I, S>(&mut self, var: &str, args: I, source: &str, line: Option<u32>) -> ConfigResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_value(ConfigurationValue::new(var, args, source).at_line(line))
    }

    /// Store a fully described value: alias resolution, trailing defaults,
    /// arity check, then the overwrite/append policy.
    pub fn set_value(&mut self, value: ConfigurationValue) -> ConfigResult<()> {
        let var = self.unalias(value.var()).to_string();
        let registry = Arc::clone(&self.registry);
        let descriptor = registry.lookup(&var).ok_or_else(|| ConfigError::UnknownVariable {
            var: value.var().to_string(),
            origin: value.origin(),
        })?;

        let mut args = value.args().to_vec();
        if let Some(expected) = descriptor.arg_count() {
            if args.len() < expected {
                let missing = expected - args.len();
                let defaults = descriptor.default_args_list();
                if missing <= defaults.len() {
                    args.extend_from_slice(&defaults[defaults.len() - missing..]);
                }
            }
            if args.len() != expected {
                return Err(ConfigError::IncorrectArgumentCount {
                    var,
                    expected,
                    actual: args.len(),
                    origin: value.origin(),
                });
            }
        }

        trace!(var = %var, source = value.source(), args = ?args, "Setting configuration variable");
        let value = value.into_canonical(&var, args);
        self.store_value(&var, descriptor.flags().allow_multiple, value)?;
        self.committed.remove(&var);
        Ok(())
    }

    fn store_value(&mut self, var: &str, allow_multiple: bool, value: ConfigurationValue) -> ConfigResult<()> {
        let values = self.vars.entry(var.to_string()).or_default();
        if let Some(first) = values.first() {
            if !value.is_append() && first.source() != value.source() {
                trace!(var, replaced = first.source(), by = value.source(), "Overriding values");
                values.clear();
            } else if !allow_multiple {
                return Err(ConfigError::IllegalMultipleSet {
                    var: var.to_string(),
                    origin: value.origin(),
                });
            }
        }
        values.push(value);
        Ok(())
    }

    /// Drop every pending value of `var` and un-commit it.
    pub fn clear_var(&mut self, var: &str) {
        let var = self.unalias(var).to_string();
        self.vars.remove(&var);
        self.committed.remove(&var);
    }

    /// Drop every pending value that came from `source`.
    pub fn clear_source_vars(&mut self, source: &str) {
        self.vars.retain(|_, values| {
            values.retain(|v| v.source() != source);
            !values.is_empty()
        });
    }

    pub fn get_var(&self, var: &str) -> Option<&[ConfigurationValue]> {
        self.vars.get(self.unalias(var)).map(Vec::as_slice)
    }

    pub fn has_values(&self, var: &str) -> bool {
        self.get_var(var).is_some_and(|v| !v.is_empty())
    }

    /// Options with at least one pending value, sorted by name.
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.vars
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, _)| k.as_str())
    }

    pub fn is_committed(&self, var: &str) -> bool {
        self.committed.contains(self.unalias(var))
    }

    pub fn committed_vars(&self) -> impl Iterator<Item = &str> {
        self.committed.iter().map(String::as_str)
    }

    pub fn set_token(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.tokens.set(name, value);
    }

    pub fn get_token(&self, name: &str) -> Option<&str> {
        self.tokens.get(name)
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    /// Token-substitute every argument.
    pub fn process_values(&self, var: &str, args: &[String], origin: &Origin) -> ConfigResult<Vec<String>> {
        args.iter()
            .map(|arg| self.tokens.expand(var, arg, origin))
            .collect()
    }

    /// Processed arguments of every pending value, without committing.
    pub fn peek_var(&self, var: &str) -> ConfigResult<Option<Vec<Vec<String>>>> {
        let Some(values) = self.get_var(var) else {
            return Ok(None);
        };
        values
            .iter()
            .map(|v| self.process_values(v.var(), v.args(), &v.origin()))
            .collect::<ConfigResult<Vec<_>>>()
            .map(Some)
    }

    /// The processed argument when `var` holds exactly one single-argument value.
    pub fn peek_simple_var(&self, var: &str) -> ConfigResult<Option<String>> {
        match self.get_var(var) {
            Some([value]) if value.args().len() == 1 => {
                let mut processed = self.process_values(value.var(), value.args(), &value.origin())?;
                Ok(processed.pop())
            }
            _ => Ok(None),
        }
    }

    /// Take over `other`'s pending values (replacing per option), committed
    /// set and tokens.
    pub fn merge(&mut self, other: &ConfigurationBuffer<T>) {
        for (var, values) in &other.vars {
            self.vars.insert(var.clone(), values.clone());
        }
        self.committed.extend(other.committed.iter().cloned());
        self.tokens.extend_from(&other.tokens);
    }
}
