use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::{ConfigError, ConfigResult, Origin};
use crate::properties::Properties;

/// Substitutions allowed while expanding a single argument.
pub const MAX_TOKEN_SUBSTITUTIONS: usize = 100;

/// `${name}` substitution table, falling back to [`Properties`].
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: BTreeMap<String, String>,
    properties: Arc<Properties>,
}

impl TokenTable {
    pub fn new(properties: Arc<Properties>) -> Self {
        Self {
            tokens: BTreeMap::new(),
            properties,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.tokens.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.tokens.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tokens
            .get(name)
            .map(String::as_str)
            .or_else(|| self.properties.get(name))
    }

    /// Whether `name` is set on the table itself, ignoring properties.
    pub fn is_defined(&self, name: &str) -> bool {
        self.tokens.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn properties(&self) -> &Arc<Properties> {
        &self.properties
    }

    pub(crate) fn extend_from(&mut self, other: &TokenTable) {
        for (name, value) in &other.tokens {
            self.tokens.insert(name.clone(), value.clone());
        }
    }

    /// Replace every `${name}` in `raw`. Substituted text is rescanned, so
    /// tokens may refer to other tokens.
    pub fn expand(&self, var: &str, raw: &str, origin: &Origin) -> ConfigResult<String> {
        let mut value = raw.to_string();
        let mut substitutions = 0;

        while let Some(open) = value.find("${") {
            let close = value[open + 2..]
                .find('}')
                .map(|i| open + 2 + i)
                .ok_or_else(|| ConfigError::MissingDelimiter {
                    var: var.to_string(),
                    origin: origin.clone(),
                })?;

            if substitutions == MAX_TOKEN_SUBSTITUTIONS {
                return Err(ConfigError::RecursionLimit {
                    var: var.to_string(),
                    origin: origin.clone(),
                });
            }

            let name = &value[open + 2..close];
            let replacement = self.get(name).ok_or_else(|| ConfigError::UnknownToken {
                var: var.to_string(),
                token: name.to_string(),
                origin: origin.clone(),
            })?;
            trace!(var, token = name, "Substituting token");

            value = format!("{}{}{}", &value[..open], replacement, &value[close + 1..]);
            substitutions += 1;
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TokenTable {
        TokenTable::new(Arc::new(Properties::new().with("user.home", "/home/dev")))
    }

    /// `${t0}` needs exactly `depth` substitutions to reach `end`.
    fn chain(depth: usize) -> TokenTable {
        let mut tokens = table();
        for i in 0..depth - 1 {
            tokens.set(format!("t{}", i), format!("${{t{}}}", i + 1));
        }
        tokens.set(format!("t{}", depth - 1), "end");
        tokens
    }

    #[test]
    fn test_plain_values_pass_through() {
        assert_eq!(table().expand("output", "a.swf", &Origin::unknown()).unwrap(), "a.swf");
    }

    #[test]
    fn test_token_then_property_lookup() {
        let mut tokens = table();
        tokens.set("royalelib", "/sdk/frameworks");
        let out = tokens
            .expand("load-config", "${royalelib}/royale-config.toml:${user.home}", &Origin::unknown())
            .unwrap();
        assert_eq!(out, "/sdk/frameworks/royale-config.toml:/home/dev");
    }

    #[test]
    fn test_unknown_token() {
        let err = table().expand("output", "${nope}.swf", &Origin::unknown()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownToken { token, .. } if token == "nope"));
    }

    #[test]
    fn test_missing_delimiter() {
        let err = table().expand("output", "${royalelib/x", &Origin::unknown()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDelimiter { .. }));
    }

    #[test]
    fn test_chain_of_99_resolves() {
        let out = chain(99).expand("x", "${t0}", &Origin::unknown()).unwrap();
        assert_eq!(out, "end");
    }

    #[test]
    fn test_chain_of_100_resolves() {
        assert!(chain(MAX_TOKEN_SUBSTITUTIONS).expand("x", "${t0}", &Origin::unknown()).is_ok());
    }

    #[test]
    fn test_chain_of_101_hits_limit() {
        let err = chain(101).expand("x", "${t0}", &Origin::unknown()).unwrap_err();
        assert!(matches!(err, ConfigError::RecursionLimit { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_self_reference_hits_limit() {
        let mut tokens = table();
        tokens.set("loop", "${loop}");
        let err = tokens.expand("x", "${loop}", &Origin::unknown()).unwrap_err();
        assert!(matches!(err, ConfigError::RecursionLimit { .. }));
    }
}
