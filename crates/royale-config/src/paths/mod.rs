//! Path resolution: the strict single-path policy and the best-effort
//! placeholder expansion used for search paths.

mod expand;

pub use expand::{expand_tokens, Expansion, PathTokens, LOCALE_TOKEN};

use std::fmt;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Turns configured path strings into absolute paths and answers
/// existence questions about them.
pub trait PathResolver: Send + Sync + fmt::Debug {
    fn resolve(&self, path: &str) -> PathBuf;

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Resolves relative paths against a fixed root directory.
#[derive(Debug, Clone)]
pub struct FsPathResolver {
    root: PathBuf,
}

impl FsPathResolver {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: normalize(root.as_ref()),
        }
    }

    /// Rooted at the process working directory.
    pub fn from_current_dir() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PathResolver for FsPathResolver {
    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.root.join(path))
        }
    }
}

/// Lexically remove `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Resolve one path, failing with `CannotOpen` when it does not exist and
/// `tolerate_missing` is off.
///
/// Relative paths are taken against `context` when given. A path with a
/// `*` is cut back to its last fixed directory, which is what gets checked
/// and returned. Paths naming a member inside a `.swc` are returned as is.
pub fn resolve_path_strict(
    resolver: &dyn PathResolver,
    path: &str,
    context: Option<&Path>,
    tolerate_missing: bool,
) -> ConfigResult<PathBuf> {
    let mut processed = path.to_string();
    if let Some(context) = context {
        if !Path::new(&processed).is_absolute() {
            processed = context.join(&processed).to_string_lossy().into_owned();
        }
    }

    if let Some(star) = processed.find('*') {
        if let Some(separator) = processed[..star].rfind(['/', MAIN_SEPARATOR]) {
            processed.truncate(separator);
        }
    }

    if processed.contains(".swc:") {
        return Ok(PathBuf::from(processed));
    }

    let resolved = resolver.resolve(&processed);
    if !tolerate_missing && !resolver.exists(&resolved) {
        debug!(path = %resolved.display(), "Path does not exist");
        return Err(ConfigError::cannot_open(
            normalize(Path::new(&processed)).display().to_string(),
        ));
    }
    Ok(resolved)
}

/// [`resolve_path_strict`] over a list; the first failure aborts.
pub fn resolve_paths_strict(
    resolver: &dyn PathResolver,
    paths: &[String],
    context: Option<&Path>,
    tolerate_missing: bool,
) -> ConfigResult<Vec<PathBuf>> {
    paths
        .iter()
        .map(|p| resolve_path_strict(resolver, p, context, tolerate_missing))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("../a/b/..")), PathBuf::from("../a"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn test_resolve_against_root_and_context() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("libs")).unwrap();
        fs::create_dir_all(dir.path().join("conf/libs")).unwrap();
        let resolver = FsPathResolver::new(dir.path());

        let from_root = resolve_path_strict(&resolver, "libs", None, false).unwrap();
        assert_eq!(from_root, dir.path().join("libs"));

        let context = dir.path().join("conf");
        let from_context = resolve_path_strict(&resolver, "libs", Some(&context), false).unwrap();
        assert_eq!(from_context, dir.path().join("conf/libs"));
    }

    #[test]
    fn test_missing_path_is_cannot_open_unless_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FsPathResolver::new(dir.path());

        let err = resolve_path_strict(&resolver, "nope.swc", None, false).unwrap_err();
        assert_eq!(err.key(), "CannotOpen");

        let tolerated = resolve_path_strict(&resolver, "nope.swc", None, true).unwrap();
        assert_eq!(tolerated, dir.path().join("nope.swc"));
    }

    #[test]
    fn test_wildcard_checks_fixed_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/assets")).unwrap();
        let resolver = FsPathResolver::new(dir.path());

        let resolved = resolve_path_strict(&resolver, "src/assets/*.png", None, false).unwrap();
        assert_eq!(resolved, dir.path().join("src/assets"));

        assert!(resolve_path_strict(&resolver, "missing/*.png", None, false).is_err());
    }

    #[test]
    fn test_swc_member_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FsPathResolver::new(dir.path());
        let out = resolve_path_strict(&resolver, "/nowhere/lib.swc:defaults.css", None, false).unwrap();
        assert_eq!(out, PathBuf::from("/nowhere/lib.swc:defaults.css"));
    }

    #[test]
    fn test_list_fails_on_first_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.swc"), b"").unwrap();
        let resolver = FsPathResolver::new(dir.path());
        let paths = vec!["a.swc".to_string(), "b.swc".to_string()];
        assert!(resolve_paths_strict(&resolver, &paths, None, false).is_err());
        assert_eq!(resolve_paths_strict(&resolver, &paths, None, true).unwrap().len(), 2);
    }
}
