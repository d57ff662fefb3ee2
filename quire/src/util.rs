use std::path::{Path, PathBuf};

use folio::error::{Chainable, Result};
use folio::{err, error};

/// Resolves `path` against `root`, checking that it's a directory. A missing
/// directory is only an error when `must_exist`.
#[track_caller]
pub fn dircheck(root: &Path, path: &Path, must_exist: bool) -> Result<Option<PathBuf>> {
    let full = root.join(path);
    match (full.is_dir(), full.exists(), must_exist) {
        (true, _, _) => Ok(Some(full)),
        (false, false, false) => Ok(None),
        (false, true, _) => err! {
            format!("{} must point to a directory", path.display()),
            "path is not a directory" => full.display(),
        },
        (false, false, true) => err! {
            format!("{} must point to an existing directory", path.display()),
            "path does not exist" => full.display(),
        },
    }
}

/// Writes `contents` to `path`, creating missing parent directories.
pub fn write(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .chain_with(|| error!("failed to create directory", "path" => parent.display()))?;
    }

    std::fs::write(path, contents)
        .chain_with(|| error!("failed to write file", "path" => path.display()))
}

/// Copies every non-hidden file under `from` to the same relative path under
/// `to`. Returns the number of files copied.
pub fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in jwalk::WalkDir::new(from).follow_links(true).sort(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let source = entry.path();
        let Ok(relative) = source.strip_prefix(from) else { continue };
        let destination = to.join(relative);
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::copy(&source, &destination).chain_with(|| error! {
            "failed to copy file",
            "source path" => source.display(),
            "destination path" => destination.display(),
        })?;

        copied += 1;
    }

    Ok(copied)
}

/// `path` relative to `root` with `/` separators.
pub fn relative_str(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dircheck_kinds() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("content")).unwrap();
        std::fs::write(root.path().join("file"), "").unwrap();

        let found = dircheck(root.path(), Path::new("content"), true).unwrap();
        assert_eq!(found, Some(root.path().join("content")));

        assert_eq!(dircheck(root.path(), Path::new("assets"), false).unwrap(), None);
        assert!(dircheck(root.path(), Path::new("assets"), true).is_err());
        assert!(dircheck(root.path(), Path::new("file"), false).is_err());
    }

    #[test]
    fn copy_tree_skips_hidden_files() {
        let from = tempfile::tempdir().unwrap();
        let to = tempfile::tempdir().unwrap();
        write(&from.path().join("css/site.css"), "body {}").unwrap();
        write(&from.path().join("logo.svg"), "<svg/>").unwrap();
        write(&from.path().join(".DS_Store"), "").unwrap();

        assert_eq!(copy_tree(from.path(), to.path()).unwrap(), 2);
        let css = std::fs::read_to_string(to.path().join("css/site.css")).unwrap();
        assert_eq!(css, "body {}");
        assert!(to.path().join("logo.svg").is_file());
        assert!(!to.path().join(".DS_Store").exists());
    }

    #[test]
    fn relative_strings() {
        let root = Path::new("/site/content");
        assert_eq!(relative_str(root, Path::new("/site/content/en/a.md")), "en/a.md");
        assert_eq!(relative_str(root, Path::new("/site/content/a.md")), "a.md");
    }
}
