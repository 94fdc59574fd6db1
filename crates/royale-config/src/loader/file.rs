use std::fs;
use std::path::Path;
use std::sync::Arc;

use toml::{Table, Value};
use tracing::{debug, info};

use crate::buffer::{ConfigurationBuffer, ConfigurationValue};
use crate::error::{ConfigError, ConfigResult, Origin};
use crate::schema::naming::join_name;

/// Loads a TOML configuration file into the buffer.
///
/// Nested tables build dotted option names, so `[compiler] debug = true`
/// and `"compiler.debug" = true` are the same assignment. A key is an
/// assignment as soon as its dotted path (or an alias) names an option.
///
/// * a scalar is one argument, an array is the argument list
/// * a table gives arguments by name (`{ uri = "...", manifest = "..." }`),
///   or a `values` list, plus an optional `append = true`
/// * an array of tables is one assignment per table
///
/// Relative paths in values are taken against the file's directory.
pub struct FileConfigurator;

struct FileSource<'a> {
    name: String,
    text: &'a str,
    context: Option<&'a Path>,
    ignore_unknown: bool,
}

impl FileConfigurator {
    pub fn load<T: 'static>(buffer: &mut ConfigurationBuffer<T>, path: &Path, ignore_unknown: bool) -> ConfigResult<()> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path.display().to_string(), &e))?;
        info!(path = %path.display(), "Loading configuration file");
        Self::load_str(buffer, &text, &path.display().to_string(), path.parent(), ignore_unknown)
    }

    /// Load already-read `text`, attributing values to `source`.
    pub fn load_str<T: 'static>(
        buffer: &mut ConfigurationBuffer<T>,
        text: &str,
        source: &str,
        context: Option<&Path>,
        ignore_unknown: bool,
    ) -> ConfigResult<()> {
        let table: Table = text.parse().map_err(|e: toml::de::Error| ConfigError::FileSyntax {
            path: source.to_string(),
            line: e.span().map(|span| line_at(text, span.start)),
            message: e.message().to_string(),
        })?;

        let file = FileSource {
            name: source.to_string(),
            text,
            context,
            ignore_unknown,
        };
        walk(buffer, &file, &table, None)?;
        debug!(source, "Loaded configuration file");
        Ok(())
    }
}

fn walk<T: 'static>(
    buffer: &mut ConfigurationBuffer<T>,
    file: &FileSource<'_>,
    table: &Table,
    base: Option<&str>,
) -> ConfigResult<()> {
    for (key, item) in table {
        let name = join_name(base, key);
        if buffer.is_valid_var(&name) {
            assign(buffer, file, &name, item)?;
        } else if let Value::Table(nested) = item {
            walk(buffer, file, nested, Some(&name))?;
        } else if file.ignore_unknown {
            debug!(var = %name, source = %file.name, "Skipping unknown configuration item");
        } else {
            let line = line_of(file.text, &name);
            return Err(ConfigError::UnknownVariable {
                var: name,
                origin: Origin::new(file.name.clone(), line),
            });
        }
    }
    Ok(())
}

fn assign<T: 'static>(
    buffer: &mut ConfigurationBuffer<T>,
    file: &FileSource<'_>,
    name: &str,
    item: &Value,
) -> ConfigResult<()> {
    let origin = Origin::new(file.name.clone(), line_of(file.text, name));
    let store = |buffer: &mut ConfigurationBuffer<T>, args: Vec<String>, append: bool, line: Option<u32>| {
        buffer.set_value(
            ConfigurationValue::new(name, args, file.name.as_str())
                .at_line(line)
                .in_context(file.context)
                .appending(append),
        )
    };

    match item {
        Value::Table(table) => {
            let (args, append) = table_args(buffer, name, table, &origin)?;
            store(buffer, args, append, origin.line)
        }
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_table) => {
            for (index, entry) in items.iter().enumerate() {
                if let Value::Table(table) = entry {
                    let origin = Origin::new(
                        file.name.clone(),
                        header_line(file.text, name, index).or(origin.line),
                    );
                    let (args, append) = table_args(buffer, name, table, &origin)?;
                    store(buffer, args, append, origin.line)?;
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            let args = items
                .iter()
                .map(|v| scalar(name, v, &origin))
                .collect::<ConfigResult<Vec<_>>>()?;
            store(buffer, args, false, origin.line)
        }
        other => {
            let arg = scalar(name, other, &origin)?;
            store(buffer, vec![arg], false, origin.line)
        }
    }
}

/// Arguments of a table-shaped assignment, in the option's argument order.
fn table_args<T: 'static>(
    buffer: &ConfigurationBuffer<T>,
    name: &str,
    table: &Table,
    origin: &Origin,
) -> ConfigResult<(Vec<String>, bool)> {
    let append = match table.get("append") {
        None => false,
        Some(Value::Boolean(b)) => *b,
        Some(_) => return Err(ConfigError::bad_value(name, "'append' must be a boolean").with_origin(origin)),
    };

    if let Some(values) = table.get("values") {
        let args = match values {
            Value::Array(items) => items
                .iter()
                .map(|v| scalar(name, v, origin))
                .collect::<ConfigResult<Vec<_>>>()?,
            other => vec![scalar(name, other, origin)?],
        };
        return Ok((args, append));
    }

    let registry = Arc::clone(buffer.registry());
    let specs = registry
        .lookup(buffer.unalias(name))
        .map(|d| d.contract().specs().to_vec())
        .unwrap_or_default();

    if let Some(field) = table
        .keys()
        .find(|k| k.as_str() != "append" && !specs.iter().any(|s| &s.name == *k))
    {
        return Err(ConfigError::bad_value(name, format!("unexpected field '{}'", field)).with_origin(origin));
    }

    let mut args = Vec::new();
    for spec in &specs {
        match table.get(&spec.name) {
            Some(value) => args.push(scalar(name, value, origin)?),
            None => break,
        }
    }
    Ok((args, append))
}

fn scalar(name: &str, value: &Value, origin: &Origin) -> ConfigResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Datetime(d) => Ok(d.to_string()),
        Value::Array(_) | Value::Table(_) => {
            Err(ConfigError::bad_value(name, "nested arrays and tables are not valid arguments").with_origin(origin))
        }
    }
}

fn line_at(text: &str, offset: usize) -> u32 {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() as u32 + 1
}

/// Dotted key paths of a TOML text with their 1-based lines. Header lines
/// yield the table path; assignments yield the table path joined with the key.
fn key_paths(text: &str) -> impl Iterator<Item = (u32, String, bool)> + '_ {
    let mut table = String::new();
    text.lines().enumerate().filter_map(move |(index, line)| {
        let line = line.trim();
        let line_no = index as u32 + 1;
        if let Some(header) = line.strip_prefix('[') {
            let header = header.trim_start_matches('[');
            table = dotted(header.split(']').next().unwrap_or(""));
            Some((line_no, table.clone(), true))
        } else if line.starts_with('#') {
            None
        } else {
            let (key, _) = line.split_once('=')?;
            Some((line_no, join_name(Some(table.as_str()), &dotted(key)), false))
        }
    })
}

fn dotted(key: &str) -> String {
    key.split('.')
        .map(|part| part.trim().trim_matches('"').trim_matches('\''))
        .collect::<Vec<_>>()
        .join(".")
}

/// Best-effort line on which the option `name` is assigned or its table opens.
fn line_of(text: &str, name: &str) -> Option<u32> {
    let nested = format!("{}.", name);
    key_paths(text)
        .find(|(_, path, _)| path == name || path.starts_with(&nested))
        .map(|(line, _, _)| line)
}

/// Line of the `occurrence`-th `[[name]]` header.
fn header_line(text: &str, name: &str, occurrence: usize) -> Option<u32> {
    key_paths(text)
        .filter(|(_, path, header)| *header && path == name)
        .nth(occurrence)
        .map(|(line, _, _)| line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::properties::Properties;

    fn buffer() -> ConfigurationBuffer<Configuration> {
        ConfigurationBuffer::new(Configuration::registry().unwrap(), Arc::new(Properties::new()))
    }

    const CONFIG: &str = r#"
output = "bin/app.swf"
default-size = { width = 800, height = 600 }

[compiler]
debug = true
library-path = ["libs", "more/libs"]

[[compiler.namespaces.namespace]]
uri = "library://ns.apache.org/royale/basic"
manifest = "basic-manifest.xml"

[[compiler.namespaces.namespace]]
uri = "library://ns.apache.org/royale/express"
manifest = "express-manifest.xml"

[includes]
append = true
values = ["ClassA"]
"#;

    #[test]
    fn test_load_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app-config.toml");
        fs::write(&path, CONFIG).unwrap();

        let mut buf = buffer();
        FileConfigurator::load(&mut buf, &path, false).unwrap();

        let output = &buf.get_var("output").unwrap()[0];
        assert_eq!(output.args(), ["bin/app.swf"]);
        assert_eq!(output.context(), Some(dir.path()));
        assert_eq!(output.source(), path.display().to_string());
        assert_eq!(output.line(), Some(2));

        assert_eq!(buf.get_var("default-size").unwrap()[0].args(), ["800", "600"]);
        assert_eq!(buf.get_var("compiler.debug").unwrap()[0].args(), ["true"]);
        assert_eq!(buf.get_var("compiler.debug").unwrap()[0].line(), Some(6));
        assert_eq!(buf.get_var("l").unwrap()[0].args(), ["libs", "more/libs"]);

        let namespaces = buf.get_var("compiler.namespaces.namespace").unwrap();
        assert_eq!(namespaces.len(), 2);
        assert_eq!(namespaces[1].args()[1], "express-manifest.xml");
        assert_eq!(namespaces[0].line(), Some(9));
        assert_eq!(namespaces[1].line(), Some(13));

        let includes = &buf.get_var("includes").unwrap()[0];
        assert!(includes.is_append());
        assert_eq!(includes.line(), Some(17));
        assert_eq!(includes.args(), ["ClassA"]);
    }

    #[test]
    fn test_unknown_key() {
        let text = "output = \"a.swf\"\n\n[compiler]\nno-such-thing = 1\n";
        let err = FileConfigurator::load_str(&mut buffer(), text, "a.toml", None, false).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownVariable { ref var, .. } if var == "compiler.no-such-thing"));
        assert_eq!(err.line(), Some(4));

        FileConfigurator::load_str(&mut buffer(), text, "a.toml", None, true).unwrap();
    }

    #[test]
    fn test_line_is_taken_within_the_enclosing_table() {
        let text = "output = \"a.swf\"\n\n[compiler]\noutput = 1\n";
        let err = FileConfigurator::load_str(&mut buffer(), text, "a.toml", None, false).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownVariable { ref var, .. } if var == "compiler.output"));
        assert_eq!(err.line(), Some(4));

        let text = "debug-password = \"x\"\ncompiler.debug = true\n";
        let mut buf = buffer();
        FileConfigurator::load_str(&mut buf, text, "a.toml", None, false).unwrap();
        assert_eq!(buf.get_var("compiler.debug").unwrap()[0].line(), Some(2));
    }

    #[test]
    fn test_unknown_keys_reported_in_document_order() {
        let text = "zzz-unknown = 1\naaa-unknown = 2\n";
        let err = FileConfigurator::load_str(&mut buffer(), text, "a.toml", None, false).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownVariable { ref var, .. } if var == "zzz-unknown"));
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_bad_table_field() {
        let text = "[default-size]\nwidth = 1\ndepth = 2\n";
        let err = FileConfigurator::load_str(&mut buffer(), text, "a.toml", None, false).unwrap_err();
        assert_eq!(err.key(), "BadValue");
        assert_eq!(err.source_name(), Some("a.toml"));
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_syntax_error() {
        let err = FileConfigurator::load_str(&mut buffer(), "output = \n", "broken.toml", None, false).unwrap_err();
        assert!(matches!(err, ConfigError::FileSyntax { ref path, .. } if path == "broken.toml"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfigurator::load(&mut buffer(), &dir.path().join("nope.toml"), false).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
