use std::fmt;
use std::sync::Arc;

use super::call::OptionCall;
use super::naming;

/// Setter invoked once per pending value during commit.
pub type Setter<T> = Arc<dyn Fn(&mut T, &OptionCall<'_>) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    String,
    Int,
    Long,
    Bool,
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::String => write!(f, "string"),
            ArgType::Int => write!(f, "int"),
            ArgType::Long => write!(f, "long"),
            ArgType::Bool => write!(f, "boolean"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: String,
    pub ty: ArgType,
}

impl ArgSpec {
    pub fn new(name: impl Into<String>, ty: ArgType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// How an option's raw arguments map onto its setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgContract {
    /// Positional, typed arguments.
    Fixed(Vec<ArgSpec>),
    /// Any number of strings, all passed as one list.
    UnboundedList { name: String },
    /// Named fields populated positionally; field names are hyphenated.
    ValueObject(Vec<ArgSpec>),
}

impl ArgContract {
    pub fn string(name: &str) -> Self {
        ArgContract::Fixed(vec![ArgSpec::new(name, ArgType::String)])
    }

    pub fn boolean(name: &str) -> Self {
        ArgContract::Fixed(vec![ArgSpec::new(name, ArgType::Bool)])
    }

    pub fn int(name: &str) -> Self {
        ArgContract::Fixed(vec![ArgSpec::new(name, ArgType::Int)])
    }

    pub fn fixed(args: &[(&str, ArgType)]) -> Self {
        ArgContract::Fixed(args.iter().map(|(n, t)| ArgSpec::new(*n, *t)).collect())
    }

    pub fn list(name: &str) -> Self {
        ArgContract::UnboundedList {
            name: name.to_string(),
        }
    }

    /// Fields are given by member name and exposed hyphenated.
    pub fn value_object(fields: &[(&str, ArgType)]) -> Self {
        ArgContract::ValueObject(
            fields
                .iter()
                .map(|(n, t)| ArgSpec::new(naming::camel_to_hyphen(n), *t))
                .collect(),
        )
    }

    /// `None` for unbounded lists.
    pub fn arg_count(&self) -> Option<usize> {
        match self {
            ArgContract::Fixed(args) | ArgContract::ValueObject(args) => Some(args.len()),
            ArgContract::UnboundedList { .. } => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, ArgContract::UnboundedList { .. })
    }

    pub fn specs(&self) -> &[ArgSpec] {
        match self {
            ArgContract::Fixed(args) | ArgContract::ValueObject(args) => args,
            ArgContract::UnboundedList { .. } => &[],
        }
    }

    /// Name of argument `index`; past the end the last name repeats.
    pub fn arg_name(&self, index: usize) -> &str {
        match self {
            ArgContract::UnboundedList { name } => name,
            ArgContract::Fixed(args) | ArgContract::ValueObject(args) => args
                .get(index)
                .or_else(|| args.last())
                .map(|a| a.name.as_str())
                .unwrap_or(""),
        }
    }

    pub fn arg_type(&self, index: usize) -> ArgType {
        self.specs()
            .get(index)
            .map(|a| a.ty)
            .unwrap_or(ArgType::String)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.specs().iter().position(|a| a.name == name)
    }

    /// Single boolean argument; `-debug` alone means `true` on the command line.
    pub fn is_flag(&self) -> bool {
        matches!(self, ArgContract::Fixed(args) if args.len() == 1 && args[0].ty == ArgType::Bool)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deprecation {
    pub since: Option<String>,
    pub replacement: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionFlags {
    pub allow_multiple: bool,
    pub is_path: bool,
    pub is_required: bool,
    pub is_advanced: bool,
    pub is_hidden: bool,
    pub is_displayed: bool,
    pub is_greedy: bool,
    pub is_removed: bool,
    pub is_ecosystem_only: bool,
    pub is_library_only: bool,
}

impl Default for OptionFlags {
    fn default() -> Self {
        Self {
            allow_multiple: false,
            is_path: false,
            is_required: false,
            is_advanced: false,
            is_hidden: false,
            is_displayed: true,
            is_greedy: false,
            is_removed: false,
            is_ecosystem_only: false,
            is_library_only: false,
        }
    }
}

fn ignore_value<T>(_: &mut T, _: &OptionCall<'_>) -> anyhow::Result<()> {
    Ok(())
}

/// Everything the binder knows about one option.
pub struct OptionDescriptor<T> {
    name: String,
    contract: ArgContract,
    flags: OptionFlags,
    deprecation: Option<Deprecation>,
    default_args: Vec<String>,
    default_value: Option<Vec<String>>,
    prerequisites: Vec<String>,
    soft_prerequisites: Vec<String>,
    setter: Setter<T>,
}

impl<T> Clone for OptionDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            contract: self.contract.clone(),
            flags: self.flags.clone(),
            deprecation: self.deprecation.clone(),
            default_args: self.default_args.clone(),
            default_value: self.default_value.clone(),
            prerequisites: self.prerequisites.clone(),
            soft_prerequisites: self.soft_prerequisites.clone(),
            setter: Arc::clone(&self.setter),
        }
    }
}

impl<T> fmt::Debug for OptionDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("name", &self.name)
            .field("contract", &self.contract)
            .field("flags", &self.flags)
            .field("deprecation", &self.deprecation)
            .field("prerequisites", &self.prerequisites)
            .field("soft_prerequisites", &self.soft_prerequisites)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> OptionDescriptor<T> {
    pub fn new(name: impl Into<String>, contract: ArgContract) -> Self {
        Self {
            name: name.into(),
            contract,
            flags: OptionFlags::default(),
            deprecation: None,
            default_args: Vec::new(),
            default_value: None,
            prerequisites: Vec::new(),
            soft_prerequisites: Vec::new(),
            setter: Arc::new(ignore_value::<T>),
        }
    }

    /// Declare by member name (`compilerFontsManagers`).
    pub fn member(member: &str, contract: ArgContract) -> Self {
        Self::new(naming::member_to_option(member), contract)
    }

    pub fn on_set<F>(mut self, setter: F) -> Self
    where
        F: Fn(&mut T, &OptionCall<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.setter = Arc::new(setter);
        self
    }

    pub fn multiple(mut self) -> Self {
        self.flags.allow_multiple = true;
        self
    }

    pub fn path(mut self) -> Self {
        self.flags.is_path = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.flags.is_required = true;
        self
    }

    pub fn advanced(mut self) -> Self {
        self.flags.is_advanced = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.flags.is_hidden = true;
        self.flags.is_displayed = false;
        self
    }

    pub fn not_displayed(mut self) -> Self {
        self.flags.is_displayed = false;
        self
    }

    pub fn greedy(mut self) -> Self {
        self.flags.is_greedy = true;
        self
    }

    pub fn removed(mut self) -> Self {
        self.flags.is_removed = true;
        self.flags.is_displayed = false;
        self
    }

    pub fn ecosystem_only(mut self) -> Self {
        self.flags.is_ecosystem_only = true;
        self
    }

    pub fn library_only(mut self) -> Self {
        self.flags.is_library_only = true;
        self
    }

    pub fn deprecated(mut self, deprecation: Deprecation) -> Self {
        self.deprecation = Some(deprecation);
        self
    }

    /// Trailing values used when fewer arguments are supplied.
    pub fn default_args(mut self, values: &[&str]) -> Self {
        self.default_args = values.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Value stored by the defaults source before any other source runs.
    pub fn default_value(mut self, values: &[&str]) -> Self {
        self.default_value = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn requires(mut self, names: &[&str]) -> Self {
        self.prerequisites = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn after(mut self, names: &[&str]) -> Self {
        self.soft_prerequisites = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member_name(&self) -> String {
        naming::option_to_member(&self.name)
    }

    pub fn contract(&self) -> &ArgContract {
        &self.contract
    }

    pub fn flags(&self) -> &OptionFlags {
        &self.flags
    }

    pub fn deprecation(&self) -> Option<&Deprecation> {
        self.deprecation.as_ref()
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecation.is_some()
    }

    pub fn arg_count(&self) -> Option<usize> {
        self.contract.arg_count()
    }

    pub fn arg_name(&self, index: usize) -> &str {
        self.contract.arg_name(index)
    }

    pub fn default_args_list(&self) -> &[String] {
        &self.default_args
    }

    pub fn default_values(&self) -> Option<&[String]> {
        self.default_value.as_deref()
    }

    pub fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    pub fn soft_prerequisites(&self) -> &[String] {
        &self.soft_prerequisites
    }

    pub fn setter(&self) -> &Setter<T> {
        &self.setter
    }

    /// One usage line: `-name <arg> <arg>` or `-name [arg] [...]`.
    pub fn usage(&self) -> String {
        let mut line = format!("-{}", self.name);
        match &self.contract {
            ArgContract::UnboundedList { name } => line.push_str(&format!(" [{}] [...]", name)),
            ArgContract::Fixed(args) | ArgContract::ValueObject(args) => {
                let defaults_from = args.len().saturating_sub(self.default_args.len());
                for (i, arg) in args.iter().enumerate() {
                    if i >= defaults_from {
                        line.push_str(&format!(" [{}]", arg.name));
                    } else {
                        line.push_str(&format!(" <{}>", arg.name));
                    }
                }
            }
        }
        line
    }
}

/// Declarative description of a configuration surface.
pub struct Schema<T> {
    pub(crate) options: Vec<OptionDescriptor<T>>,
    pub(crate) aliases: Vec<(String, String)>,
}

impl<T> Default for Schema<T> {
    fn default() -> Self {
        Self {
            options: Vec::new(),
            aliases: Vec::new(),
        }
    }
}

impl<T> Schema<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn option(mut self, descriptor: OptionDescriptor<T>) -> Self {
        self.options.push(descriptor);
        self
    }

    pub fn alias(mut self, alias: &str, target: &str) -> Self {
        self.aliases.push((alias.to_string(), target.to_string()));
        self
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
