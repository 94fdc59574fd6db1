use std::fmt;

use serde::Serialize;

use crate::error::{ConfigError, Origin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

/// A collected, non-thrown diagnostic produced while configuring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationProblem {
    pub severity: Severity,
    pub source: Option<String>,
    pub line: Option<u32>,
    pub key: &'static str,
    pub var: Option<String>,
    pub message: String,
    /// Raised by a broken token graph or schema; validation is skipped.
    pub fatal: bool,
}

impl ConfigurationProblem {
    fn warning(key: &'static str, var: &str, origin: Option<&Origin>, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            source: origin.and_then(|o| o.source.clone()),
            line: origin.and_then(|o| o.line),
            key,
            var: Some(var.to_string()),
            message,
            fatal: false,
        }
    }

    pub fn deprecated(
        var: &str,
        replacement: Option<&str>,
        since: Option<&str>,
        message: Option<&str>,
        origin: Option<&Origin>,
    ) -> Self {
        let mut text = format!("'{}' is deprecated", var);
        if let Some(since) = since {
            text.push_str(&format!(" since {}", since));
        }
        match (replacement, message) {
            (Some(replacement), _) => text.push_str(&format!("; use '{}' instead", replacement)),
            (None, Some(message)) => text.push_str(&format!("; {}", message)),
            (None, None) => {}
        }
        Self::warning("DeprecatedOption", var, origin, text)
    }

    pub fn removed(var: &str, origin: Option<&Origin>) -> Self {
        Self::warning(
            "RemovedOption",
            var,
            origin,
            format!("'{}' has been removed and is ignored", var),
        )
    }

    pub fn ecosystem_only(var: &str, origin: Option<&Origin>) -> Self {
        Self::warning(
            "EcosystemOnlyOption",
            var,
            origin,
            format!("'{}' only applies to Royale applications", var),
        )
    }

    pub fn inconsistent(var: &str, origin: Option<&Origin>, message: impl Into<String>) -> Self {
        Self::warning("InconsistentOptions", var, origin, message.into())
    }

    pub fn missing_config_file(path: &str, origin: Option<&Origin>) -> Self {
        Self {
            severity: Severity::Error,
            source: origin.and_then(|o| o.source.clone()),
            line: origin.and_then(|o| o.line),
            key: "MissingConfigFile",
            var: Some("load-config".to_string()),
            message: format!("configuration file '{}' not found", path),
            fatal: false,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<ConfigError> for ConfigurationProblem {
    fn from(err: ConfigError) -> Self {
        Self {
            severity: Severity::Error,
            source: err.source_name().map(str::to_string),
            line: err.line(),
            key: err.key(),
            var: err.var().map(str::to_string),
            message: err.to_string(),
            fatal: err.is_fatal(),
        }
    }
}

impl fmt::Display for ConfigurationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.line) {
            (Some(source), Some(line)) => write!(f, "{}({}): ", source, line)?,
            (Some(source), None) => write!(f, "{}: ", source)?,
            _ => {}
        }
        write!(f, "{}: {}", self.severity, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_from_error_keeps_origin() {
        let err = ConfigError::UnknownVariable {
            var: "bogus".to_string(),
            origin: Origin::new("command line", Some(2)),
        };
        let problem = ConfigurationProblem::from(err);
        assert_eq!(problem.key, "UnknownVariable");
        assert_eq!(problem.var.as_deref(), Some("bogus"));
        assert_eq!(
            problem.to_string(),
            "command line(2): Error: unknown configuration variable 'bogus'"
        );
    }

    #[test]
    fn test_deprecated_message() {
        let problem = ConfigurationProblem::deprecated(
            "compiler.headless-server",
            None,
            Some("0.9.0"),
            Some("no longer needed"),
            None,
        );
        assert_eq!(problem.severity, Severity::Warning);
        assert_eq!(
            problem.to_string(),
            "Warning: 'compiler.headless-server' is deprecated since 0.9.0; no longer needed"
        );
    }
}
