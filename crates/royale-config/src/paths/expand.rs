use std::path::PathBuf;

use tracing::warn;

use crate::buffer::ConfigurationValue;
use crate::problem::ConfigurationProblem;

use super::{resolve_path_strict, PathResolver};

pub const LOCALE_TOKEN: &str = "{locale}";

const PLAYERGLOBAL_HOME_TOKEN: &str = "{playerglobalHome}";
const AIR_HOME_TOKEN: &str = "{airHome}";
const ROYALE_VERSION_TOKEN: &str = "{royaleVersion}";
const PLAYER_MAJOR_TOKEN: &str = "{targetPlayerMajorVersion}";
const PLAYER_MINOR_TOKEN: &str = "{targetPlayerMinorVersion}";

/// Values for the curly-brace placeholders other than `{locale}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTokens {
    pub playerglobal_home: String,
    pub air_home: String,
    pub tool_version: String,
    pub player_major: u32,
    pub player_minor: u32,
}

impl Default for PathTokens {
    fn default() -> Self {
        Self {
            playerglobal_home: "libs/player".to_string(),
            air_home: "..".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            player_major: 11,
            player_minor: 1,
        }
    }
}

impl PathTokens {
    pub fn substitute(&self, path: &str) -> String {
        path.replace(PLAYERGLOBAL_HOME_TOKEN, &self.playerglobal_home)
            .replace(AIR_HOME_TOKEN, &self.air_home)
            .replace(ROYALE_VERSION_TOKEN, &self.tool_version)
            .replace(PLAYER_MAJOR_TOKEN, &self.player_major.to_string())
            .replace(PLAYER_MINOR_TOKEN, &self.player_minor.to_string())
    }
}

/// Result of expanding a search path.
#[derive(Debug, Default)]
pub struct Expansion {
    pub paths: Vec<PathBuf>,
    /// Resolved path to the locale it was expanded for.
    pub locale_sources: Vec<(PathBuf, String)>,
    /// One entry per element that could not be resolved and was dropped.
    pub problems: Vec<ConfigurationProblem>,
}

/// Expand placeholders in every element of a search path and resolve it.
///
/// An element containing `{locale}` yields one path per configured locale
/// (none when no locale is configured) and each of those must exist. Other
/// elements are resolved honouring `tolerate_missing`. An element that fails
/// to resolve is dropped and reported; the rest of the list is still used.
pub fn expand_tokens(
    resolver: &dyn PathResolver,
    tokens: &PathTokens,
    elements: &[String],
    locales: &[String],
    value: &ConfigurationValue,
    tolerate_missing: bool,
) -> Expansion {
    let mut expansion = Expansion::default();
    let origin = value.origin();

    let accept = |expansion: &mut Expansion, path: &str, locale: Option<&str>, tolerate: bool| {
        match resolve_path_strict(resolver, path, value.context(), tolerate) {
            Ok(resolved) => {
                if let Some(locale) = locale {
                    expansion.locale_sources.push((resolved.clone(), locale.to_string()));
                }
                expansion.paths.push(resolved);
            }
            Err(err) => {
                warn!(var = value.var(), path, error = %err, "Dropping unresolvable path element");
                expansion
                    .problems
                    .push(err.with_var(value.var()).with_origin(&origin).into());
            }
        }
    };

    for element in elements {
        let substituted = tokens.substitute(element);
        if substituted.contains(LOCALE_TOKEN) {
            for locale in locales {
                let localized = substituted.replace(LOCALE_TOKEN, locale);
                accept(&mut expansion, &localized, Some(locale.as_str()), false);
            }
        } else {
            accept(&mut expansion, &substituted, None, tolerate_missing);
        }
    }

    expansion
}
