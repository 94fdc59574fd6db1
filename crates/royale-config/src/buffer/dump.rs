use std::fmt;

use super::ConfigurationBuffer;

/// `option=a,b;c` per line, sorted by option name. Commas separate the
/// arguments of one assignment, semicolons separate assignments.
impl<T> fmt::Display for ConfigurationBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (var, values) in &self.vars {
            if values.is_empty() {
                continue;
            }
            let assignments: Vec<String> = values.iter().map(|v| v.args().join(",")).collect();
            writeln!(f, "{}={}", var, assignments.join(";"))?;
        }
        Ok(())
    }
}

impl<T: 'static> ConfigurationBuffer<T> {
    /// Every known option with its contract, flags and provenance of its
    /// current values.
    pub fn info_dump(&self) -> String {
        let mut out = String::new();
        for descriptor in self.registry.iter() {
            let flags = descriptor.flags();
            let mut tags = Vec::new();
            if flags.allow_multiple {
                tags.push("multiple");
            }
            if flags.is_path {
                tags.push("path");
            }
            if flags.is_required {
                tags.push("required");
            }
            if flags.is_advanced {
                tags.push("advanced");
            }
            if flags.is_hidden {
                tags.push("hidden");
            }
            if flags.is_removed {
                tags.push("removed");
            }
            if descriptor.is_deprecated() {
                tags.push("deprecated");
            }
            if flags.is_ecosystem_only {
                tags.push("royale-only");
            }
            if flags.is_library_only {
                tags.push("library-only");
            }

            out.push_str(&descriptor.usage());
            if !tags.is_empty() {
                out.push_str(&format!(" [{}]", tags.join(", ")));
            }
            if let Some(values) = self.vars.get(descriptor.name()) {
                let sources: Vec<String> = values.iter().map(|v| v.origin().to_string()).collect();
                out.push_str(&format!(" <- {}", sources.join(", ")));
            }
            out.push('\n');
        }
        out
    }
}
