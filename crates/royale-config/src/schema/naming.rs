//! Conversion between member names (`compilerFontsManagers`) and option
//! names (`compiler.fonts.managers`).

/// Flattened prefixes of the historical sub-configuration groups, paired with
/// their dotted form. Checked in order; the first match wins.
const LEGACY_PREFIXES: &[(&str, &str)] = &[
    ("compiler-fonts-languages-", "compiler.fonts.languages."),
    ("compiler-fonts-", "compiler.fonts."),
    ("compiler-namespaces-", "compiler.namespaces."),
    ("compiler-mxml-", "compiler.mxml."),
    ("compiler-", "compiler."),
    ("metadata-", "metadata."),
    ("licenses-", "licenses."),
    ("frames-", "frames."),
    (
        "runtime-shared-library-settings-",
        "runtime-shared-library-settings.",
    ),
];

/// `maxRecursionDepth` -> `max-recursion-depth`, with no prefix mapping.
pub fn camel_to_hyphen(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 5);
    for c in camel.chars() {
        if c.is_uppercase() {
            out.push('-');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Member name to canonical option name.
pub fn member_to_option(member: &str) -> String {
    let hyphenated = camel_to_hyphen(member);
    for (from, to) in LEGACY_PREFIXES {
        if let Some(rest) = hyphenated.strip_prefix(from) {
            return format!("{}{}", to, rest);
        }
    }
    hyphenated
}

/// Canonical option name back to its member name.
pub fn option_to_member(option: &str) -> String {
    let mut flattened = option.to_string();
    for (from, to) in LEGACY_PREFIXES {
        if let Some(rest) = option.strip_prefix(to) {
            flattened = format!("{}{}", from, rest);
            break;
        }
    }

    let mut out = String::with_capacity(flattened.len());
    let mut upper = false;
    for c in flattened.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Qualify `name` with an enclosing group, as file readers do for nested keys.
pub fn join_name(base: Option<&str>, name: &str) -> String {
    match base {
        Some(base) if !base.is_empty() => format!("{}.{}", base, name),
        _ => name.to_string(),
    }
}
