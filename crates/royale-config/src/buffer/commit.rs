use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::{ConfigError, ConfigResult, Origin};
use crate::problem::ConfigurationProblem;
use crate::schema::{ArgContract, ArgType, ArgValue, OptionCall, OptionDescriptor};

use super::{ConfigurationBuffer, ConfigurationValue};

impl<T: 'static> ConfigurationBuffer<T> {
    /// Apply every pending value to `target`, options in declaration order,
    /// prerequisites first. Failures are pushed onto `problems` and the
    /// remaining options are still committed. Returns `true` when no problem
    /// was added.
    pub fn commit(&mut self, target: &mut T, problems: &mut Vec<ConfigurationProblem>) -> bool {
        let before = problems.len();
        let registry = Arc::clone(&self.registry);
        let mut done = HashSet::new();

        for descriptor in registry.iter() {
            if !self.has_values(descriptor.name()) {
                continue;
            }
            let mut visiting = Vec::new();
            if let Err(err) = self.commit_variable(target, descriptor, &mut done, &mut visiting) {
                debug!(var = descriptor.name(), error = %err, "Option failed to commit");
                problems.push(err.into());
            }
        }

        for required in registry.required() {
            if !self.committed.contains(required) {
                problems.push(
                    ConfigError::MissingRequirement {
                        required: required.clone(),
                        dependent: None,
                        origin: Origin::unknown(),
                    }
                    .into(),
                );
            }
        }

        let added = problems.len() - before;
        debug!(committed = self.committed.len(), problems = added, "Committed configuration buffer");
        added == 0
    }

    fn commit_variable(
        &mut self,
        target: &mut T,
        descriptor: &OptionDescriptor<T>,
        done: &mut HashSet<String>,
        visiting: &mut Vec<String>,
    ) -> ConfigResult<()> {
        let var = descriptor.name();

        visiting.push(var.to_string());
        let resolved = self
            .resolve_prerequisites(target, descriptor, descriptor.prerequisites(), true, done, visiting)
            .and_then(|_| {
                self.resolve_prerequisites(target, descriptor, descriptor.soft_prerequisites(), false, done, visiting)
            });
        visiting.pop();
        resolved?;

        if self.committed.contains(var) {
            return Ok(());
        }
        self.committed.insert(var.to_string());
        done.insert(var.to_string());

        let values = self.vars.get(var).cloned().unwrap_or_default();
        for value in &values {
            let args = self.build_args(descriptor, value)?;
            let call = OptionCall::new(var, descriptor.contract(), value, args, &self.tokens);
            (descriptor.setter())(target, &call).map_err(|err| setter_error(err, var, &value.origin()))?;
        }
        trace!(var, values = values.len(), "Committed option");
        Ok(())
    }

    fn resolve_prerequisites(
        &mut self,
        target: &mut T,
        descriptor: &OptionDescriptor<T>,
        prerequisites: &[String],
        required: bool,
        done: &mut HashSet<String>,
        visiting: &mut Vec<String>,
    ) -> ConfigResult<()> {
        let var = descriptor.name();
        let registry = Arc::clone(&self.registry);

        for prerequisite in prerequisites {
            let mut dep = prerequisite.clone();
            // Sibling in the dependent's group wins unless only the bare name exists.
            if let Some(dot) = var.rfind('.') {
                let sibling = format!("{}.{}", &var[..dot], prerequisite);
                if self.is_valid_var(&sibling) || !self.is_valid_var(prerequisite) {
                    dep = sibling;
                }
            }

            if done.contains(&dep) || !self.is_valid_var(&dep) {
                continue;
            }
            let dep = self.unalias(&dep).to_string();
            if visiting.contains(&dep) {
                warn!(var, prerequisite = %dep, "Prerequisite cycle; skipping");
                continue;
            }

            if self.has_values(&dep) {
                if let Some(dep_descriptor) = registry.lookup(&dep) {
                    self.commit_variable(target, dep_descriptor, done, visiting)?;
                }
            } else if required && !self.committed.contains(&dep) {
                let origin = self
                    .vars
                    .get(var)
                    .and_then(|values| values.first())
                    .map(ConfigurationValue::origin)
                    .unwrap_or_default();
                return Err(ConfigError::MissingRequirement {
                    required: dep,
                    dependent: Some(var.to_string()),
                    origin,
                });
            }
        }
        Ok(())
    }

    fn build_args(&self, descriptor: &OptionDescriptor<T>, value: &ConfigurationValue) -> ConfigResult<Vec<ArgValue>> {
        let var = descriptor.name();
        let origin = value.origin();
        let processed = self.process_values(var, value.args(), &origin)?;

        match descriptor.contract() {
            ArgContract::UnboundedList { .. } => Ok(processed.into_iter().map(ArgValue::Str).collect()),
            ArgContract::Fixed(specs) | ArgContract::ValueObject(specs) => {
                if processed.len() != specs.len() {
                    return Err(ConfigError::IncorrectArgumentCount {
                        var: var.to_string(),
                        expected: specs.len(),
                        actual: processed.len(),
                        origin,
                    });
                }
                specs
                    .iter()
                    .zip(processed)
                    .map(|(spec, raw)| coerce(var, spec.ty, raw, &origin))
                    .collect()
            }
        }
    }
}

fn coerce(var: &str, ty: ArgType, raw: String, origin: &Origin) -> ConfigResult<ArgValue> {
    let converted = match ty {
        ArgType::String => return Ok(ArgValue::Str(raw)),
        ArgType::Int => decode_int(&raw).map(ArgValue::Int),
        ArgType::Long => decode_long(&raw).map(ArgValue::Long),
        ArgType::Bool => parse_bool(&raw).map(ArgValue::Bool),
    };
    converted.ok_or_else(|| ConfigError::TypeMismatch {
        var: var.to_string(),
        expected: ty,
        value: raw,
        origin: origin.clone(),
    })
}

fn setter_error(err: anyhow::Error, var: &str, origin: &Origin) -> ConfigError {
    match err.downcast::<ConfigError>() {
        Ok(config_error) => config_error.with_origin(origin),
        Err(other) => ConfigError::OtherThrowable {
            var: var.to_string(),
            message: format!("{:#}", other),
            origin: origin.clone(),
        },
    }
}

/// Decode a 64-bit integer: optional sign, then `0x`/`0X`/`#` hex, a leading
/// `0` for octal, or decimal.
pub fn decode_long(text: &str) -> Option<i64> {
    let (negative, rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (radix, digits) = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (16, hex)
    } else if let Some(hex) = rest.strip_prefix('#') {
        (16, hex)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };

    if digits.is_empty() || digits.starts_with(['-', '+']) {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

/// [`decode_long`] restricted to the 32-bit range.
pub fn decode_int(text: &str) -> Option<i32> {
    decode_long(text).and_then(|v| i32::try_from(v).ok())
}

/// `true` or `false`, ignoring case and surrounding whitespace.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::Properties;
    use crate::schema::{OptionRegistry, Schema};

    #[derive(Debug, Default)]
    struct Target {
        first: Option<String>,
        second: Option<i32>,
        third: Vec<String>,
        password: Option<String>,
        order: Vec<String>,
    }

    fn buffer(schema: Schema<Target>) -> ConfigurationBuffer<Target> {
        let registry = Arc::new(OptionRegistry::build(schema).unwrap());
        ConfigurationBuffer::new(registry, Arc::new(Properties::new()))
    }

    fn three_options(second_fails: bool) -> Schema<Target> {
        Schema::new()
            .option(OptionDescriptor::new("first", ArgContract::string("value")).on_set(|t: &mut Target, call| {
                t.first = Some(call.string(0)?.to_string());
                Ok(())
            }))
            .option(OptionDescriptor::new("second", ArgContract::int("value")).on_set(move |t: &mut Target, call| {
                if second_fails {
                    anyhow::bail!("second always fails");
                }
                t.second = Some(call.int(0)?);
                Ok(())
            }))
            .option(OptionDescriptor::new("third", ArgContract::list("item")).multiple().on_set(|t: &mut Target, call| {
                t.third.extend(call.list());
                Ok(())
            }))
    }

    #[test]
    fn test_decode_integers() {
        assert_eq!(decode_int("42"), Some(42));
        assert_eq!(decode_int("-42"), Some(-42));
        assert_eq!(decode_int("+7"), Some(7));
        assert_eq!(decode_int("0x1F"), Some(31));
        assert_eq!(decode_int("#FFFFFF"), Some(0xFFFFFF));
        assert_eq!(decode_int("010"), Some(8));
        assert_eq!(decode_int("0"), Some(0));
        assert_eq!(decode_int("-0x10"), Some(-16));
        assert_eq!(decode_int("0x-1"), None);
        assert_eq!(decode_int("12abc"), None);
        assert_eq!(decode_int(""), None);
        assert_eq!(decode_int("2147483648"), None);
        assert_eq!(decode_long("2147483648"), Some(2147483648));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool(" TRUE "), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn test_commit_applies_all_options() {
        let mut buf = buffer(three_options(false));
        buf.set_var("first", ["a"], "command line", Some(0)).unwrap();
        buf.set_var("second", ["0x10"], "command line", Some(1)).unwrap();
        buf.set_var("third", ["x", "y"], "command line", Some(2)).unwrap();

        let mut target = Target::default();
        let mut problems = Vec::new();
        assert!(buf.commit(&mut target, &mut problems));
        assert!(problems.is_empty());
        assert_eq!(target.first.as_deref(), Some("a"));
        assert_eq!(target.second, Some(16));
        assert_eq!(target.third, vec!["x", "y"]);
        assert!(buf.is_committed("second"));
    }

    #[test]
    fn test_partial_commit_continues_past_failing_setter() {
        let mut buf = buffer(three_options(true));
        buf.set_var("first", ["a"], "command line", Some(0)).unwrap();
        buf.set_var("second", ["1"], "command line", Some(1)).unwrap();
        buf.set_var("third", ["x"], "command line", Some(2)).unwrap();

        let mut target = Target::default();
        let mut problems = Vec::new();
        assert!(!buf.commit(&mut target, &mut problems));

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].key, "OtherThrowable");
        assert_eq!(problems[0].var.as_deref(), Some("second"));
        assert_eq!(problems[0].source.as_deref(), Some("command line"));
        assert_eq!(problems[0].line, Some(1));
        assert_eq!(target.first.as_deref(), Some("a"));
        assert_eq!(target.third, vec!["x"]);
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let mut buf = buffer(three_options(false));
        buf.set_var("second", ["ten"], "a.toml", Some(3)).unwrap();

        let mut target = Target::default();
        let mut problems = Vec::new();
        assert!(!buf.commit(&mut target, &mut problems));
        assert_eq!(problems[0].key, "TypeMismatch");
        assert_eq!(problems[0].line, Some(3));
        assert_eq!(target.second, None);
    }

    #[test]
    fn test_commit_is_idempotent_until_value_changes() {
        let mut buf = buffer(three_options(false));
        buf.set_var("third", ["x"], "command line", None).unwrap();

        let mut target = Target::default();
        let mut problems = Vec::new();
        buf.commit(&mut target, &mut problems);
        buf.commit(&mut target, &mut problems);
        assert_eq!(target.third, vec!["x"]);

        buf.set_var("third", ["y"], "other", None).unwrap();
        assert!(!buf.is_committed("third"));
        buf.commit(&mut target, &mut problems);
        assert_eq!(target.third, vec!["x", "y"]);
    }

    #[test]
    fn test_missing_hard_prerequisite_skips_setter() {
        let schema = Schema::new()
            .option(OptionDescriptor::new("compiler.debug", ArgContract::boolean("debug")))
            .option(
                OptionDescriptor::new("debug-password", ArgContract::string("password"))
                    .requires(&["compiler.debug"])
                    .on_set(|t: &mut Target, call| {
                        t.password = Some(call.string(0)?.to_string());
                        Ok(())
                    }),
            );
        let mut buf = buffer(schema);
        buf.set_var("debug-password", ["secret"], "command line", Some(0)).unwrap();

        let mut target = Target::default();
        let mut problems = Vec::new();
        assert!(!buf.commit(&mut target, &mut problems));
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].key, "MissingRequirement");
        assert_eq!(
            problems[0].message,
            "'compiler.debug' is required by 'debug-password'"
        );
        assert!(target.password.is_none());
        assert!(!buf.is_committed("debug-password"));
    }

    fn ordered(name: &'static str) -> OptionDescriptor<Target> {
        OptionDescriptor::new(name, ArgContract::string("value")).on_set(move |t: &mut Target, _| {
            t.order.push(name.to_string());
            Ok(())
        })
    }

    #[test]
    fn test_prerequisites_commit_first() {
        let schema = Schema::new()
            .option(ordered("compiler.library-path").after(&["locale", "target-player"]))
            .option(ordered("target-player"))
            .option(ordered("compiler.locale"));
        let mut buf = buffer(schema);
        for var in ["compiler.library-path", "target-player", "compiler.locale"] {
            buf.set_var(var, ["v"], "command line", None).unwrap();
        }

        let mut target = Target::default();
        let mut problems = Vec::new();
        assert!(buf.commit(&mut target, &mut problems));
        // "locale" resolves to the sibling, "target-player" falls back to the bare name.
        assert_eq!(target.order, vec!["compiler.locale", "target-player", "compiler.library-path"]);
    }

    #[test]
    fn test_sibling_preferred_over_bare_name() {
        let schema = Schema::new()
            .option(ordered("compiler.mxml.minimum-supported-version").requires(&["compatibility-version"]))
            .option(ordered("compatibility-version"))
            .option(ordered("compiler.mxml.compatibility-version"));
        let mut buf = buffer(schema);
        buf.set_var("compiler.mxml.minimum-supported-version", ["v"], "command line", None)
            .unwrap();
        buf.set_var("compatibility-version", ["v"], "command line", None).unwrap();

        let mut target = Target::default();
        let mut problems = Vec::new();
        assert!(!buf.commit(&mut target, &mut problems));
        assert_eq!(problems.len(), 1);
        assert!(problems[0].message.contains("'compiler.mxml.compatibility-version'"));
        assert_eq!(target.order, vec!["compatibility-version"]);
    }

    #[test]
    fn test_soft_prerequisite_absent_is_fine() {
        let schema = Schema::new()
            .option(ordered("a").after(&["b"]))
            .option(ordered("b"));
        let mut buf = buffer(schema);
        buf.set_var("a", ["v"], "command line", None).unwrap();

        let mut target = Target::default();
        let mut problems = Vec::new();
        assert!(buf.commit(&mut target, &mut problems));
        assert_eq!(target.order, vec!["a"]);
    }

    #[test]
    fn test_prerequisite_cycle_is_broken() {
        let schema = Schema::new()
            .option(ordered("a").requires(&["b"]))
            .option(ordered("b").requires(&["a"]));
        let mut buf = buffer(schema);
        buf.set_var("a", ["v"], "command line", None).unwrap();
        buf.set_var("b", ["v"], "command line", None).unwrap();

        let mut target = Target::default();
        let mut problems = Vec::new();
        assert!(buf.commit(&mut target, &mut problems));
        assert_eq!(target.order, vec!["b", "a"]);
    }

    #[test]
    fn test_required_option_never_set() {
        let schema = Schema::new()
            .option(ordered("output").required())
            .option(ordered("other"));
        let mut buf = buffer(schema);
        buf.set_var("other", ["v"], "command line", None).unwrap();

        let mut target = Target::default();
        let mut problems = Vec::new();
        assert!(!buf.commit(&mut target, &mut problems));
        assert_eq!(problems[0].message, "'output' is a required option");
    }

    #[test]
    fn test_setter_config_error_keeps_kind() {
        let schema = Schema::new().option(
            OptionDescriptor::new("target-player", ArgContract::string("version")).on_set(|_: &mut Target, call| {
                Err(ConfigError::BadVersion {
                    var: call.var().to_string(),
                    version: call.string(0)?.to_string(),
                    origin: Origin::unknown(),
                }
                .into())
            }),
        );
        let mut buf = buffer(schema);
        buf.set_var("target-player", ["9"], "command line", Some(2)).unwrap();

        let mut target = Target::default();
        let mut problems = Vec::new();
        buf.commit(&mut target, &mut problems);
        assert_eq!(problems[0].key, "BadVersion");
        assert_eq!(problems[0].line, Some(2));
    }
}
