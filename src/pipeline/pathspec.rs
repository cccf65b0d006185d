// src/pipeline/pathspec.rs

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;

/// One inclusion glob plus zero or more exclusion globs, all relative to the
/// project root.
///
/// `*` does not cross `/`; use `**` for recursive matches. The *base* of a
/// spec is the leading run of literal directories of the inclusion pattern
/// (`src/**/*.coffee` → `src`), and matched files keep their path relative
/// to that base when they are written to a destination tree.
#[derive(Clone)]
pub struct PathSpec {
    include: String,
    exclude: Vec<String>,
    base: PathBuf,
    include_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathSpec")
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .finish_non_exhaustive()
    }
}

/// A file selected by [`PathSpec::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchedFile {
    /// Path as found under the root (root-joined).
    pub path: PathBuf,
    /// Path relative to the spec's base; this is where the file lands in a
    /// destination tree.
    pub rel: PathBuf,
}

impl PathSpec {
    pub fn new(include: &str, exclude: &[String]) -> Result<Self> {
        let include = normalize_pattern(include);
        let exclude: Vec<String> = exclude.iter().map(|p| normalize_pattern(p)).collect();

        let include_set = build_globset(std::slice::from_ref(&include))?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(&exclude)?)
        };

        Ok(Self {
            base: glob_base(&include),
            include,
            exclude,
            include_set,
            exclude_set,
        })
    }

    pub fn include(&self) -> &str {
        &self.include
    }

    /// Literal directory prefix of the inclusion pattern (may be empty).
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns true if the given path (relative to project root, forward
    /// slashes), e.g. `"src/foo/bar.coffee"`, belongs to this spec.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    /// Collect all files under `root` that currently match.
    ///
    /// Always walks the tree; nothing is cached between calls. Only the base
    /// directory is visited. A missing base directory yields an empty list.
    /// Symlinked directories are not descended into. The result is sorted by
    /// path.
    pub fn resolve(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<MatchedFile>> {
        let start = if self.base.as_os_str().is_empty() {
            root.to_path_buf()
        } else {
            root.join(&self.base)
        };

        let mut files = Vec::new();
        if !fs.is_dir(&start) {
            return Ok(files);
        }

        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    if fs.is_symlink(&path) {
                        debug!(dir = ?path, "skipping symlinked directory");
                        continue;
                    }
                    stack.push(path);
                } else if fs.is_file(&path) {
                    let Ok(rel_root) = path.strip_prefix(root) else {
                        continue;
                    };
                    let rel_str = rel_root.to_string_lossy().replace('\\', "/");
                    if self.matches(&rel_str) {
                        let rel = rel_root
                            .strip_prefix(&self.base)
                            .unwrap_or(rel_root)
                            .to_path_buf();
                        files.push(MatchedFile { path, rel });
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

fn normalize_pattern(pattern: &str) -> String {
    pattern.trim().trim_start_matches("./").to_string()
}

fn is_literal(component: &str) -> bool {
    !component.contains(['*', '?', '[', '{'])
}

/// Leading literal directories of a pattern. The last component is always
/// treated as the file part, even when it is literal.
fn glob_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').collect();
    let dirs = &parts[..parts.len().saturating_sub(1)];
    dirs.iter()
        .take_while(|c| is_literal(c))
        .filter(|c| !c.is_empty())
        .collect()
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|source| BuildError::Pattern {
                pattern: pat.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| BuildError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_is_leading_literal_directories() {
        assert_eq!(glob_base("src/**/*.coffee"), PathBuf::from("src"));
        assert_eq!(glob_base("vendor/**/*"), PathBuf::from("vendor"));
        assert_eq!(glob_base("*.src"), PathBuf::new());
        assert_eq!(glob_base("style/constants.styl"), PathBuf::from("style"));
        assert_eq!(glob_base("a/b/{c,d}/*.x"), PathBuf::from("a/b"));
    }

    #[test]
    fn exclusions_win_over_inclusion() {
        let spec = PathSpec::new("style/**/*.styl", &["style/constants.styl".to_string()]).unwrap();
        assert!(spec.matches("style/main.styl"));
        assert!(spec.matches("style/nested/x.styl"));
        assert!(!spec.matches("style/constants.styl"));
        assert!(!spec.matches("src/main.coffee"));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let spec = PathSpec::new("*.src", &[]).unwrap();
        assert!(spec.matches("a.src"));
        assert!(!spec.matches("nested/a.src"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_loops_are_not_followed() {
        use crate::fs::RealFileSystem;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("vendor/lib")).unwrap();
        std::fs::write(root.join("vendor/lib/jquery.js"), "jquery").unwrap();
        std::os::unix::fs::symlink(root.join("vendor"), root.join("vendor/lib/loop")).unwrap();

        let spec = PathSpec::new("vendor/**/*", &[]).unwrap();
        let files = spec.resolve(&RealFileSystem, root).unwrap();

        let rels: Vec<PathBuf> = files.into_iter().map(|f| f.rel).collect();
        assert_eq!(rels, vec![PathBuf::from("lib/jquery.js")]);
    }

    #[test]
    fn invalid_glob_is_a_pattern_error() {
        let err = PathSpec::new("src/[", &[]).unwrap_err();
        assert!(matches!(err, BuildError::Pattern { .. }));
    }
}
