// src/watch/path_utils.rs

use std::path::Path;

/// Spell a changed path the way [`PathSpec`](crate::pipeline::PathSpec)
/// patterns are written: relative to `root`, forward slashes, no leading
/// `./`.
///
/// Relative paths are taken to be root-relative already. Absolute paths are
/// stripped of `root`, retrying on canonical forms for symlinked roots
/// (`/tmp` vs `/private/tmp`). Paths outside the root yield `None`.
pub fn project_relative(root: &Path, path: &Path) -> Option<String> {
    let rel = if path.is_relative() {
        path.to_path_buf()
    } else if let Ok(rel) = path.strip_prefix(root) {
        rel.to_path_buf()
    } else {
        let root = root.canonicalize().ok()?;
        let path = path.canonicalize().ok()?;
        path.strip_prefix(&root).ok()?.to_path_buf()
    };

    let s = rel.to_string_lossy().replace('\\', "/");
    let s = s.trim_start_matches("./");
    if s.is_empty() {
        return None;
    }
    Some(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_from_absolute_paths() {
        let root = Path::new("/work/app");
        assert_eq!(
            project_relative(root, Path::new("/work/app/src/main.coffee")).as_deref(),
            Some("src/main.coffee")
        );
    }

    #[test]
    fn relative_paths_are_kept_without_leading_dot() {
        let root = Path::new("/work/app");
        assert_eq!(
            project_relative(root, Path::new("./style/a.styl")).as_deref(),
            Some("style/a.styl")
        );
        assert_eq!(
            project_relative(root, Path::new("style/a.styl")).as_deref(),
            Some("style/a.styl")
        );
    }

    #[test]
    fn paths_outside_root_or_the_root_itself_are_rejected() {
        let root = Path::new("/work/app");
        assert_eq!(project_relative(root, Path::new("/elsewhere/x.coffee")), None);
        assert_eq!(project_relative(root, Path::new("/work/app")), None);
    }

    #[test]
    fn canonical_forms_are_compared_for_symlinked_roots() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir_all(real.join("src")).unwrap();
        std::fs::write(real.join("src/a.coffee"), "x").unwrap();

        #[cfg(unix)]
        {
            let link = dir.path().join("link");
            std::os::unix::fs::symlink(&real, &link).unwrap();
            assert_eq!(
                project_relative(&link, &real.join("src/a.coffee")).as_deref(),
                Some("src/a.coffee")
            );
        }
    }
}
