use std::path::{Path, PathBuf};

use crate::error::Origin;

/// One raw assignment attempt, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationValue {
    var: String,
    args: Vec<String>,
    source: String,
    line: Option<u32>,
    context: Option<PathBuf>,
    append: bool,
}

impl ConfigurationValue {
    pub fn new<I, S>(var: impl Into<String>, args: I, source: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            var: var.into(),
            args: args.into_iter().map(Into::into).collect(),
            source: source.into(),
            line: None,
            context: None,
            append: false,
        }
    }

    pub fn at_line(mut self, line: Option<u32>) -> Self {
        self.line = line;
        self
    }

    pub fn in_context(mut self, context: Option<&Path>) -> Self {
        self.context = context.map(Path::to_path_buf);
        self
    }

    pub fn appending(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn context(&self) -> Option<&Path> {
        self.context.as_deref()
    }

    pub fn is_append(&self) -> bool {
        self.append
    }

    pub fn origin(&self) -> Origin {
        Origin::new(self.source.clone(), self.line)
    }

    pub(crate) fn into_canonical(mut self, var: &str, args: Vec<String>) -> Self {
        self.var = var.to_string();
        self.args = args;
        self
    }
}
