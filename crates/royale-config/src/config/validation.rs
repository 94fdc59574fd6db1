use std::fs;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::buffer::{ConfigurationBuffer, ConfigurationValue};
use crate::error::{ConfigError, ConfigResult};
use crate::loader::SOURCE_DEFAULTS;
use crate::problem::ConfigurationProblem;

use super::Configuration;

/// Kind of artifact being configured. Library-only options are rejected
/// for applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Swf,
    Swc,
}

/// Fail with `UnknownVariable` for the first library-only option holding
/// a value.
pub fn validate_no_library_only_options(buffer: &ConfigurationBuffer<Configuration>) -> ConfigResult<()> {
    for var in buffer.var_names() {
        let Some(descriptor) = buffer.registry().lookup(var) else {
            continue;
        };
        if !descriptor.flags().is_library_only {
            continue;
        }
        let origin = buffer
            .get_var(var)
            .and_then(|values| values.first())
            .map(ConfigurationValue::origin)
            .unwrap_or_default();
        return Err(ConfigError::UnknownVariable {
            var: var.to_string(),
            origin,
        });
    }
    Ok(())
}

/// First value of `var` that did not come from the built-in defaults.
fn explicit_value<'a>(buffer: &'a ConfigurationBuffer<Configuration>, var: &str) -> Option<&'a ConfigurationValue> {
    buffer
        .get_var(var)?
        .iter()
        .find(|value| value.source() != SOURCE_DEFAULTS)
}

impl Configuration {
    /// Post-commit checks. Returns warnings for deprecated, removed and
    /// misplaced options and for inconsistent settings, plus an error when
    /// the requested buffer dump cannot be written.
    pub fn validate(&self, buffer: &ConfigurationBuffer<Configuration>) -> Vec<ConfigurationProblem> {
        let mut problems = Vec::new();

        for var in buffer.var_names() {
            let Some(descriptor) = buffer.registry().lookup(var) else {
                continue;
            };
            let Some(value) = explicit_value(buffer, var) else {
                continue;
            };
            let origin = value.origin();

            if let Some(deprecation) = descriptor.deprecation() {
                problems.push(ConfigurationProblem::deprecated(
                    var,
                    deprecation.replacement.as_deref(),
                    deprecation.since.as_deref(),
                    deprecation.message.as_deref(),
                    Some(&origin),
                ));
            }
            if descriptor.flags().is_removed {
                problems.push(ConfigurationProblem::removed(var, Some(&origin)));
            }
            if descriptor.flags().is_ecosystem_only && self.settings.warn_on_ecosystem_only && !self.royale {
                problems.push(ConfigurationProblem::ecosystem_only(var, Some(&origin)));
            }
        }

        if let Some(value) = explicit_value(buffer, "swf-version") {
            let minimum = self.target_player.minimum_swf_version();
            if i64::from(self.swf_version) < i64::from(minimum) {
                problems.push(ConfigurationProblem::inconsistent(
                    "swf-version",
                    Some(&value.origin()),
                    format!(
                        "swf-version {} is below {} required by target-player {}",
                        self.swf_version, minimum, self.target_player
                    ),
                ));
            }
        }

        if !self.debug_password.is_empty() && !self.debug {
            let origin = explicit_value(buffer, "debug-password").map(ConfigurationValue::origin);
            problems.push(ConfigurationProblem::inconsistent(
                "debug-password",
                origin.as_ref(),
                "debug-password has no effect unless compiler.debug is enabled",
            ));
        }

        if let Some(path) = &self.dump_config {
            match fs::write(path, buffer.to_string()) {
                Ok(()) => info!(path = %path.display(), "Wrote configuration dump"),
                Err(err) => problems.push(ConfigError::io(path.display().to_string(), &err).into()),
            }
        }

        debug!(problems = problems.len(), "Validated configuration");
        problems
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::problem::Severity;
    use crate::properties::Properties;

    fn buffer() -> ConfigurationBuffer<Configuration> {
        ConfigurationBuffer::new(Configuration::registry().unwrap(), Arc::new(Properties::new()))
    }

    #[test]
    fn test_library_only_rejected() {
        let mut buf = buffer();
        buf.set_var("include-classes", ["a.B"], "command line", Some(2)).unwrap();
        let err = validate_no_library_only_options(&buf).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownVariable { ref var, .. } if var == "include-classes"));
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_application_options_pass() {
        let mut buf = buffer();
        buf.set_var("output", ["a.swf"], "command line", None).unwrap();
        assert!(validate_no_library_only_options(&buf).is_ok());
    }

    #[test]
    fn test_removed_and_deprecated_warnings() {
        let mut buf = buffer();
        buf.set_var("benchmark", ["true"], "command line", Some(0)).unwrap();
        buf.set_var("compiler.headless-server", ["true"], "command line", Some(1))
            .unwrap();
        let mut config = Configuration::default();
        let mut problems = Vec::new();
        assert!(buf.commit(&mut config, &mut problems));

        let warnings = config.validate(&buf);
        let keys: Vec<_> = warnings.iter().map(|p| p.key).collect();
        assert_eq!(keys, vec!["RemovedOption", "DeprecatedOption"]);
        assert!(warnings.iter().all(|p| p.severity == Severity::Warning));
    }

    #[test]
    fn test_swf_version_below_player_minimum() {
        let mut buf = buffer();
        buf.set_var("target-player", ["11.4"], "command line", Some(0)).unwrap();
        buf.set_var("swf-version", ["10"], "command line", Some(1)).unwrap();
        let mut config = Configuration::default();
        let mut problems = Vec::new();
        assert!(buf.commit(&mut config, &mut problems));

        let warnings = config.validate(&buf);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key, "InconsistentOptions");
        assert_eq!(warnings[0].line, Some(1));
    }

    #[test]
    fn test_huge_player_major_warns_instead_of_overflowing() {
        let mut buf = buffer();
        buf.set_var("target-player", ["2147483647"], "command line", Some(0)).unwrap();
        buf.set_var("swf-version", ["14"], "command line", Some(1)).unwrap();
        let mut config = Configuration::default();
        let mut problems = Vec::new();
        assert!(buf.commit(&mut config, &mut problems), "{:?}", problems);

        let warnings = config.validate(&buf);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key, "InconsistentOptions");
    }

    #[test]
    fn test_dump_config_written() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("dump.txt");
        let mut buf = buffer();
        buf.set_var("dump-config", [target.to_string_lossy().into_owned()], "command line", None)
            .unwrap();
        buf.set_var("output", ["app.swf"], "command line", None).unwrap();
        let mut config = Configuration::default();
        let mut problems = Vec::new();
        assert!(buf.commit(&mut config, &mut problems));

        assert!(config.validate(&buf).is_empty());
        let dump = fs::read_to_string(&target).unwrap();
        assert!(dump.contains("output=app.swf\n"));
    }
}
