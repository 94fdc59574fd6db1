use std::fmt;

use thiserror::Error;

use crate::schema::ArgType;

/// Provenance of a value: the source that supplied it and, when known, the
/// line (or argument index) it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    pub source: Option<String>,
    pub line: Option<u32>,
}

impl Origin {
    pub fn new(source: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            source: Some(source.into()),
            line,
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.source.is_some()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.line) {
            (Some(source), Some(line)) => write!(f, "{}({})", source, line),
            (Some(source), None) => write!(f, "{}", source),
            (None, Some(line)) => write!(f, "({})", line),
            (None, None) => Ok(()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("configuration schema declares no options")]
    EmptySchema,

    #[error("option '{0}' is declared more than once")]
    DuplicateOption(String),

    #[error("invalid alias '{alias}': {reason}")]
    InvalidAlias { alias: String, reason: String },

    #[error("unknown configuration variable '{var}'")]
    UnknownVariable { var: String, origin: Origin },

    #[error("'{var}' expects {expected} argument(s) but {actual} were given")]
    IncorrectArgumentCount {
        var: String,
        expected: usize,
        actual: usize,
        origin: Origin,
    },

    #[error("'{var}' is missing its '{argument}' argument")]
    MissingArgument {
        var: String,
        argument: String,
        origin: Origin,
    },

    #[error("'{var}' cannot be set more than once")]
    IllegalMultipleSet { var: String, origin: Origin },

    #[error("unknown token '{token}' in '{var}'")]
    UnknownToken {
        var: String,
        token: String,
        origin: Origin,
    },

    #[error("missing '}}' after '${{' in '{var}'")]
    MissingDelimiter { var: String, origin: Origin },

    #[error("token substitution in '{var}' exceeded the recursion limit")]
    RecursionLimit { var: String, origin: Origin },

    #[error("unable to open '{path}'")]
    CannotOpen {
        var: Option<String>,
        path: String,
        origin: Origin,
    },

    #[error("'{path}' is not a directory")]
    NotDirectory {
        var: Option<String>,
        path: String,
        origin: Origin,
    },

    #[error("'{path}' is not a file")]
    NotAFile {
        var: Option<String>,
        path: String,
        origin: Origin,
    },

    #[error("{}", requirement_message(.required, .dependent.as_deref()))]
    MissingRequirement {
        required: String,
        dependent: Option<String>,
        origin: Origin,
    },

    #[error("'{var}' expects a {expected} value but got '{value}'")]
    TypeMismatch {
        var: String,
        expected: ArgType,
        value: String,
        origin: Origin,
    },

    #[error("bad value for '{var}': {message}")]
    BadValue {
        var: String,
        message: String,
        origin: Origin,
    },

    #[error("'{version}' is not a supported version for '{var}'")]
    BadVersion {
        var: String,
        version: String,
        origin: Origin,
    },

    #[error("error while setting '{var}': {message}")]
    OtherThrowable {
        var: String,
        message: String,
        origin: Origin,
    },

    #[error("positional argument '{arg}' has no default variable to bind to")]
    UnexpectedArgument { arg: String, origin: Origin },

    #[error("syntax error in '{path}': {message}")]
    FileSyntax {
        path: String,
        line: Option<u32>,
        message: String,
    },

    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn requirement_message(required: &str, dependent: Option<&str>) -> String {
    match dependent {
        Some(dependent) => format!("'{}' is required by '{}'", required, dependent),
        None => format!("'{}' is a required option", required),
    }
}

impl ConfigError {
    pub fn bad_value(var: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::BadValue {
            var: var.into(),
            message: message.into(),
            origin: Origin::unknown(),
        }
    }

    pub fn cannot_open(path: impl Into<String>) -> Self {
        ConfigError::CannotOpen {
            var: None,
            path: path.into(),
            origin: Origin::unknown(),
        }
    }

    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Stable identifier of the error kind, used as the problem key.
    pub fn key(&self) -> &'static str {
        match self {
            ConfigError::EmptySchema => "EmptySchema",
            ConfigError::DuplicateOption(_) => "DuplicateOption",
            ConfigError::InvalidAlias { .. } => "InvalidAlias",
            ConfigError::UnknownVariable { .. } => "UnknownVariable",
            ConfigError::IncorrectArgumentCount { .. } => "IncorrectArgumentCount",
            ConfigError::MissingArgument { .. } => "MissingArgument",
            ConfigError::IllegalMultipleSet { .. } => "IllegalMultipleSet",
            ConfigError::UnknownToken { .. } => "UnknownToken",
            ConfigError::MissingDelimiter { .. } => "MissingDelimiter",
            ConfigError::RecursionLimit { .. } => "RecursionLimit",
            ConfigError::CannotOpen { .. } => "CannotOpen",
            ConfigError::NotDirectory { .. } => "NotDirectory",
            ConfigError::NotAFile { .. } => "NotAFile",
            ConfigError::MissingRequirement { .. } => "MissingRequirement",
            ConfigError::TypeMismatch { .. } => "TypeMismatch",
            ConfigError::BadValue { .. } => "BadValue",
            ConfigError::BadVersion { .. } => "BadVersion",
            ConfigError::OtherThrowable { .. } => "OtherThrowable",
            ConfigError::UnexpectedArgument { .. } => "UnexpectedArgument",
            ConfigError::FileSyntax { .. } => "FileSyntax",
            ConfigError::Io { .. } => "Io",
        }
    }

    /// Errors that indicate a broken schema or token graph rather than a bad value.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConfigError::EmptySchema
                | ConfigError::DuplicateOption(_)
                | ConfigError::InvalidAlias { .. }
                | ConfigError::RecursionLimit { .. }
        )
    }

    /// The option the error is about, if any.
    pub fn var(&self) -> Option<&str> {
        match self {
            ConfigError::UnknownVariable { var, .. }
            | ConfigError::IncorrectArgumentCount { var, .. }
            | ConfigError::MissingArgument { var, .. }
            | ConfigError::IllegalMultipleSet { var, .. }
            | ConfigError::UnknownToken { var, .. }
            | ConfigError::MissingDelimiter { var, .. }
            | ConfigError::RecursionLimit { var, .. }
            | ConfigError::TypeMismatch { var, .. }
            | ConfigError::BadValue { var, .. }
            | ConfigError::BadVersion { var, .. }
            | ConfigError::OtherThrowable { var, .. } => Some(var),
            ConfigError::CannotOpen { var, .. }
            | ConfigError::NotDirectory { var, .. }
            | ConfigError::NotAFile { var, .. } => var.as_deref(),
            ConfigError::MissingRequirement {
                dependent,
                required,
                ..
            } => Some(dependent.as_deref().unwrap_or(required)),
            _ => None,
        }
    }

    pub fn origin(&self) -> Option<&Origin> {
        match self {
            ConfigError::UnknownVariable { origin, .. }
            | ConfigError::IncorrectArgumentCount { origin, .. }
            | ConfigError::MissingArgument { origin, .. }
            | ConfigError::IllegalMultipleSet { origin, .. }
            | ConfigError::UnknownToken { origin, .. }
            | ConfigError::MissingDelimiter { origin, .. }
            | ConfigError::RecursionLimit { origin, .. }
            | ConfigError::CannotOpen { origin, .. }
            | ConfigError::NotDirectory { origin, .. }
            | ConfigError::NotAFile { origin, .. }
            | ConfigError::MissingRequirement { origin, .. }
            | ConfigError::TypeMismatch { origin, .. }
            | ConfigError::BadValue { origin, .. }
            | ConfigError::BadVersion { origin, .. }
            | ConfigError::OtherThrowable { origin, .. }
            | ConfigError::UnexpectedArgument { origin, .. } => Some(origin),
            _ => None,
        }
    }

    fn origin_mut(&mut self) -> Option<&mut Origin> {
        match self {
            ConfigError::UnknownVariable { origin, .. }
            | ConfigError::IncorrectArgumentCount { origin, .. }
            | ConfigError::MissingArgument { origin, .. }
            | ConfigError::IllegalMultipleSet { origin, .. }
            | ConfigError::UnknownToken { origin, .. }
            | ConfigError::MissingDelimiter { origin, .. }
            | ConfigError::RecursionLimit { origin, .. }
            | ConfigError::CannotOpen { origin, .. }
            | ConfigError::NotDirectory { origin, .. }
            | ConfigError::NotAFile { origin, .. }
            | ConfigError::MissingRequirement { origin, .. }
            | ConfigError::TypeMismatch { origin, .. }
            | ConfigError::BadValue { origin, .. }
            | ConfigError::BadVersion { origin, .. }
            | ConfigError::OtherThrowable { origin, .. }
            | ConfigError::UnexpectedArgument { origin, .. } => Some(origin),
            _ => None,
        }
    }

    pub fn source_name(&self) -> Option<&str> {
        match self {
            ConfigError::FileSyntax { path, .. } | ConfigError::Io { path, .. } => Some(path),
            _ => self.origin().and_then(|o| o.source.as_deref()),
        }
    }

    pub fn line(&self) -> Option<u32> {
        match self {
            ConfigError::FileSyntax { line, .. } => *line,
            _ => self.origin().and_then(|o| o.line),
        }
    }

    /// Attach provenance unless the error already carries some.
    pub fn with_origin(mut self, source: &Origin) -> Self {
        if let Some(origin) = self.origin_mut() {
            if !origin.is_known() {
                *origin = source.clone();
            }
        }
        self
    }

    /// Attach the option name to path errors raised by shared helpers.
    pub fn with_var(mut self, name: &str) -> Self {
        match &mut self {
            ConfigError::CannotOpen { var, .. }
            | ConfigError::NotDirectory { var, .. }
            | ConfigError::NotAFile { var, .. } => {
                if var.is_none() {
                    *var = Some(name.to_string());
                }
            }
            _ => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_origin_only_fills_unknown() {
        let err = ConfigError::bad_value("output", "empty").with_origin(&Origin::new("a.toml", Some(3)));
        assert_eq!(err.source_name(), Some("a.toml"));
        assert_eq!(err.line(), Some(3));

        let err = err.with_origin(&Origin::new("command line", Some(0)));
        assert_eq!(err.source_name(), Some("a.toml"));
    }

    #[test]
    fn test_missing_requirement_message() {
        let err = ConfigError::MissingRequirement {
            required: "compiler.debug".to_string(),
            dependent: Some("debug-password".to_string()),
            origin: Origin::unknown(),
        };
        assert_eq!(err.to_string(), "'compiler.debug' is required by 'debug-password'");
        assert_eq!(err.var(), Some("debug-password"));

        let err = ConfigError::MissingRequirement {
            required: "output".to_string(),
            dependent: None,
            origin: Origin::unknown(),
        };
        assert_eq!(err.to_string(), "'output' is a required option");
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(ConfigError::EmptySchema.is_fatal());
        assert!(ConfigError::RecursionLimit {
            var: "x".to_string(),
            origin: Origin::unknown()
        }
        .is_fatal());
        assert!(!ConfigError::cannot_open("lib.swc").is_fatal());
    }

    #[test]
    fn test_path_errors_take_var() {
        let err = ConfigError::cannot_open("missing.swc").with_var("compiler.library-path");
        assert_eq!(err.var(), Some("compiler.library-path"));
        assert_eq!(err.key(), "CannotOpen");
    }
}
