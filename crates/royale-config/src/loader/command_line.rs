use std::sync::Arc;

use tracing::{debug, trace};

use crate::buffer::{parse_bool, ConfigurationBuffer, ConfigurationValue};
use crate::error::{ConfigError, ConfigResult, Origin};

pub const SOURCE_COMMAND_LINE: &str = "command line";

/// Tokenizes command-line arguments into buffer assignments.
///
/// Recognized forms, where the line of each value is its argument index:
///
/// * `-name=a,b` sets, `-name+=a,b` appends, `-name=` sets an empty list
/// * `-name v1 v2` takes the option's arity from the following arguments;
///   a boolean option not followed by `true` or `false` means `true`
/// * `+name=value` defines a `${name}` token
/// * `--` ends option parsing
/// * any other argument is appended to the default variable
pub struct CommandLineConfigurator;

impl CommandLineConfigurator {
    pub fn parse<T: 'static>(
        buffer: &mut ConfigurationBuffer<T>,
        default_var: Option<&str>,
        args: &[String],
    ) -> ConfigResult<()> {
        Self::parse_as(buffer, default_var, args, SOURCE_COMMAND_LINE)
    }

    /// [`CommandLineConfigurator::parse`], attributing values to `source`.
    pub fn parse_as<T: 'static>(
        buffer: &mut ConfigurationBuffer<T>,
        default_var: Option<&str>,
        args: &[String],
        source: &str,
    ) -> ConfigResult<()> {
        let mut options_done = false;
        let mut i = 0;

        while i < args.len() {
            let arg = args[i].as_str();
            let line = Some(i as u32);

            if !options_done && arg == "--" {
                options_done = true;
                i += 1;
                continue;
            }

            if !options_done && arg.len() > 1 && arg.starts_with('+') {
                Self::define_token(buffer, &arg[1..], source, line)?;
                i += 1;
                continue;
            }

            if !options_done && is_option(arg) {
                let body = arg.strip_prefix("--").unwrap_or(&arg[1..]);
                i = match body.find('=') {
                    Some(eq) => {
                        Self::assign(buffer, body, eq, source, line)?;
                        i + 1
                    }
                    None => Self::consume(buffer, body, args, i, source)?,
                };
                continue;
            }

            match default_var {
                Some(var) => {
                    trace!(var, arg, "Binding positional argument");
                    buffer.set_value(
                        ConfigurationValue::new(var, [arg], source)
                            .at_line(line)
                            .appending(true),
                    )?;
                }
                None => {
                    return Err(ConfigError::UnexpectedArgument {
                        arg: arg.to_string(),
                        origin: Origin::new(source, line),
                    })
                }
            }
            i += 1;
        }

        debug!(source, args = args.len(), "Parsed arguments");
        Ok(())
    }

    fn define_token<T: 'static>(
        buffer: &mut ConfigurationBuffer<T>,
        body: &str,
        source: &str,
        line: Option<u32>,
    ) -> ConfigResult<()> {
        match body.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                buffer.set_token(name, value);
                Ok(())
            }
            _ => Err(ConfigError::bad_value(body, "token definitions take the form +name=value")
                .with_origin(&Origin::new(source, line))),
        }
    }

    /// `-name=a,b` or `-name+=a,b`.
    fn assign<T: 'static>(
        buffer: &mut ConfigurationBuffer<T>,
        body: &str,
        eq: usize,
        source: &str,
        line: Option<u32>,
    ) -> ConfigResult<()> {
        let (name, append) = match body[..eq].strip_suffix('+') {
            Some(name) => (name, true),
            None => (&body[..eq], false),
        };
        let value = &body[eq + 1..];
        let args: Vec<String> = if value.is_empty() {
            Vec::new()
        } else {
            value.split(',').map(|s| s.trim().to_string()).collect()
        };
        buffer.set_value(
            ConfigurationValue::new(name, args, source)
                .at_line(line)
                .appending(append),
        )
    }

    /// `-name v1 v2 ...`; returns the index of the next unconsumed argument.
    fn consume<T: 'static>(
        buffer: &mut ConfigurationBuffer<T>,
        name: &str,
        args: &[String],
        index: usize,
        source: &str,
    ) -> ConfigResult<usize> {
        let line = Some(index as u32);
        let registry = Arc::clone(buffer.registry());
        let descriptor = registry
            .lookup(buffer.unalias(name))
            .ok_or_else(|| ConfigError::UnknownVariable {
                var: name.to_string(),
                origin: Origin::new(source, line),
            })?;

        let rest = &args[index + 1..];
        let (values, consumed) = if descriptor.flags().is_greedy {
            (rest.to_vec(), rest.len())
        } else if descriptor.contract().is_flag() {
            match rest.first().filter(|a| parse_bool(a).is_some()) {
                Some(explicit) => (vec![explicit.clone()], 1),
                None => (vec!["true".to_string()], 0),
            }
        } else {
            let limit = descriptor.arg_count().unwrap_or(usize::MAX);
            let values: Vec<String> = rest
                .iter()
                .take_while(|a| !is_option(a) && !is_token(a))
                .take(limit)
                .cloned()
                .collect();
            let consumed = values.len();
            (values, consumed)
        };

        let next = index + 1 + consumed;
        buffer.set_value(ConfigurationValue::new(name, values, source).at_line(line))?;
        Ok(next)
    }
}

fn is_option(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-')
}

fn is_token(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('+')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::properties::Properties;

    fn buffer() -> ConfigurationBuffer<Configuration> {
        ConfigurationBuffer::new(Configuration::registry().unwrap(), Arc::new(Properties::new()))
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_equals_forms() {
        let mut buf = buffer();
        CommandLineConfigurator::parse(
            &mut buf,
            None,
            &args(&["-includes=ClassA", "-includes+=ClassB,ClassC", "-compiler.keep-as3-metadata="]),
        )
        .unwrap();

        let includes = buf.get_var("includes").unwrap();
        assert_eq!(includes.len(), 2);
        assert_eq!(includes[1].args(), ["ClassB", "ClassC"]);
        assert!(includes[1].is_append());
        assert!(buf.get_var("compiler.keep-as3-metadata").unwrap()[0].args().is_empty());
    }

    #[test]
    fn test_spaced_forms() {
        let mut buf = buffer();
        CommandLineConfigurator::parse(
            &mut buf,
            Some("file-specs"),
            &args(&["-debug-password", "-default-size", "640", "480", "-l", "a.swc", "b.swc", "-compiler.debug", "Main.as"]),
        )
        .unwrap();

        assert_eq!(buf.get_var("debug-password").unwrap()[0].args(), [""]);
        assert_eq!(buf.get_var("default-size").unwrap()[0].args(), ["640", "480"]);
        assert_eq!(buf.get_var("compiler.library-path").unwrap()[0].args(), ["a.swc", "b.swc"]);
        assert_eq!(buf.get_var("compiler.debug").unwrap()[0].args(), ["true"]);
        let specs = buf.get_var("file-specs").unwrap();
        assert_eq!(specs[0].args(), ["Main.as"]);
        assert_eq!(specs[0].line(), Some(8));
    }

    #[test]
    fn test_tokens_and_double_dash() {
        let mut buf = buffer();
        CommandLineConfigurator::parse(
            &mut buf,
            Some("file-specs"),
            &args(&["+out=bin", "-o", "${out}/a.swf", "--", "-odd.as"]),
        )
        .unwrap();
        assert_eq!(buf.get_token("out"), Some("bin"));
        assert_eq!(buf.peek_simple_var("output").unwrap().as_deref(), Some("bin/a.swf"));
        assert_eq!(buf.get_var("file-specs").unwrap()[0].args(), ["-odd.as"]);
    }

    #[test]
    fn test_help_is_greedy() {
        let mut buf = buffer();
        CommandLineConfigurator::parse(&mut buf, None, &args(&["-help", "-list", "advanced"])).unwrap();
        assert_eq!(buf.get_var("help").unwrap()[0].args(), ["-list", "advanced"]);
    }

    #[test]
    fn test_flag_takes_explicit_boolean() {
        let mut buf = buffer();
        CommandLineConfigurator::parse(
            &mut buf,
            Some("file-specs"),
            &args(&["-compiler.optimize", "false", "-compiler.debug", "Main.as"]),
        )
        .unwrap();
        assert_eq!(buf.get_var("compiler.optimize").unwrap()[0].args(), ["false"]);
        assert_eq!(buf.get_var("compiler.debug").unwrap()[0].args(), ["true"]);
        assert_eq!(buf.get_var("file-specs").unwrap()[0].args(), ["Main.as"]);
    }

    #[test]
    fn test_errors_carry_argument_index() {
        let mut buf = buffer();
        let err = CommandLineConfigurator::parse(&mut buf, None, &args(&["-o", "a.swf", "-bogus"])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownVariable { ref var, .. } if var == "bogus"));
        assert_eq!(err.line(), Some(2));

        let err = CommandLineConfigurator::parse(&mut buffer(), None, &args(&["Main.as"])).unwrap_err();
        assert!(matches!(err, ConfigError::UnexpectedArgument { .. }));

        let err = CommandLineConfigurator::parse(&mut buffer(), None, &args(&["-default-size", "10"])).unwrap_err();
        assert!(matches!(err, ConfigError::IncorrectArgumentCount { .. }));
    }
}
