use std::path::Path;

use crate::buffer::{ConfigurationValue, TokenTable};
use crate::error::{ConfigError, ConfigResult, Origin};

use super::descriptor::ArgContract;

/// A typed argument after token substitution and coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Str(String),
    Int(i32),
    Long(i64),
    Bool(bool),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// What a setter sees for one pending value.
pub struct OptionCall<'a> {
    var: &'a str,
    contract: &'a ArgContract,
    value: &'a ConfigurationValue,
    args: Vec<ArgValue>,
    tokens: &'a TokenTable,
}

impl<'a> OptionCall<'a> {
    pub(crate) fn new(
        var: &'a str,
        contract: &'a ArgContract,
        value: &'a ConfigurationValue,
        args: Vec<ArgValue>,
        tokens: &'a TokenTable,
    ) -> Self {
        Self {
            var,
            contract,
            value,
            args,
            tokens,
        }
    }

    pub fn var(&self) -> &str {
        self.var
    }

    pub fn value(&self) -> &ConfigurationValue {
        self.value
    }

    pub fn origin(&self) -> Origin {
        self.value.origin()
    }

    /// Base directory for relative paths in this value, if it came from a file.
    pub fn context(&self) -> Option<&Path> {
        self.value.context()
    }

    pub fn token(&self, name: &str) -> Option<&str> {
        self.tokens.get(name)
    }

    /// Process property, bypassing buffer tokens.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.tokens.properties().get(name)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn args(&self) -> &[ArgValue] {
        &self.args
    }

    /// Every argument as a string; the shape unbounded options receive.
    pub fn list(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| match a {
                ArgValue::Str(s) => s.clone(),
                ArgValue::Int(i) => i.to_string(),
                ArgValue::Long(l) => l.to_string(),
                ArgValue::Bool(b) => b.to_string(),
            })
            .collect()
    }

    fn arg(&self, index: usize) -> ConfigResult<&ArgValue> {
        self.args.get(index).ok_or_else(|| ConfigError::MissingArgument {
            var: self.var.to_string(),
            argument: self.contract.arg_name(index).to_string(),
            origin: self.origin(),
        })
    }

    fn mismatch(&self, index: usize, found: &ArgValue) -> ConfigError {
        ConfigError::TypeMismatch {
            var: self.var.to_string(),
            expected: self.contract.arg_type(index),
            value: format!("{:?}", found),
            origin: self.origin(),
        }
    }

    pub fn string(&self, index: usize) -> ConfigResult<&str> {
        match self.arg(index)? {
            ArgValue::Str(s) => Ok(s),
            other => Err(self.mismatch(index, other)),
        }
    }

    pub fn int(&self, index: usize) -> ConfigResult<i32> {
        match self.arg(index)? {
            ArgValue::Int(i) => Ok(*i),
            other => Err(self.mismatch(index, other)),
        }
    }

    pub fn long(&self, index: usize) -> ConfigResult<i64> {
        match self.arg(index)? {
            ArgValue::Long(l) => Ok(*l),
            ArgValue::Int(i) => Ok(i64::from(*i)),
            other => Err(self.mismatch(index, other)),
        }
    }

    pub fn boolean(&self, index: usize) -> ConfigResult<bool> {
        match self.arg(index)? {
            ArgValue::Bool(b) => Ok(*b),
            other => Err(self.mismatch(index, other)),
        }
    }

    /// Look up a value-object field by its hyphenated name.
    pub fn field(&self, name: &str) -> ConfigResult<&ArgValue> {
        let index = self
            .contract
            .field_index(name)
            .ok_or_else(|| ConfigError::MissingArgument {
                var: self.var.to_string(),
                argument: name.to_string(),
                origin: self.origin(),
            })?;
        self.arg(index)
    }

    pub fn int_field(&self, name: &str) -> ConfigResult<i32> {
        match self.field(name)? {
            ArgValue::Int(i) => Ok(*i),
            other => Err(ConfigError::TypeMismatch {
                var: self.var.to_string(),
                expected: super::ArgType::Int,
                value: format!("{:?}", other),
                origin: self.origin(),
            }),
        }
    }
}
