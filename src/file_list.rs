//! # File List Resolution
//!
//! Turns an input specifier into a [`FileList`]: the mapping from
//! archive-internal entry name to the source file that provides its bytes.
//!
//! Two input shapes are accepted:
//!
//! - **Directory**: every regular file below the root becomes one entry,
//!   named by its path relative to the root with `/` separators.
//! - **Manifest**: a UTF-8 JSON document of the form
//!   `[["name", "path"], ["name", "path"], ...]`. Names are used verbatim,
//!   paths are taken literally (relative paths resolve against the current
//!   working directory, not the manifest's location).
//!
//! Names are unique within a list; inserting an existing name replaces the
//! previous source path (last write wins).

use std::collections::btree_map::{self, BTreeMap};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::PackError;

/// One manifest element. Deserializes only from a JSON array of exactly two strings.
#[derive(Deserialize, Debug)]
struct ManifestEntry(String, PathBuf);

/// Mapping from archive entry name to source path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileList {
    entries: BTreeMap<String, PathBuf>,
}

impl FileList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `input` as a directory when it is one, and as a manifest otherwise.
    pub fn resolve(input: &Path) -> Result<Self, PackError> {
        if input.is_dir() {
            Self::from_directory(input)
        } else {
            Self::from_manifest(input)
        }
    }

    /// Builds the list from every regular file under `root`.
    ///
    /// Symlinks to regular files are packed under the link's own name;
    /// symlinked directories are not descended into. Sub-paths that cannot
    /// be read during the walk are logged and skipped.
    pub fn from_directory(root: &Path) -> Result<Self, PackError> {
        if !root.is_dir() {
            return Err(PackError::InputNotFolder { path: root.to_path_buf() });
        }

        let mut list = Self::new();
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("skipping unreadable path during walk: {}", e);
                    continue;
                }
            };
            if !is_packable(&entry) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                warn!("skipping '{}': outside of '{}'", entry.path().display(), root.display());
                continue;
            };
            list.insert(entry_name(relative), entry.path().to_path_buf());
        }

        debug!("resolved {} files from directory '{}'", list.len(), root.display());
        Ok(list)
    }

    /// Builds the list from a JSON manifest file.
    pub fn from_manifest(path: &Path) -> Result<Self, PackError> {
        let text = fs::read_to_string(path).map_err(|source| PackError::InputReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let list = Self::parse_manifest(&text).map_err(|source| PackError::InputDocument {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("resolved {} entries from manifest '{}'", list.len(), path.display());
        Ok(list)
    }

    /// Parses manifest text. Any element that is not a `[string, string]`
    /// pair rejects the whole document.
    pub fn parse_manifest(text: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<ManifestEntry> = serde_json::from_str(text)?;
        let mut list = Self::new();
        for ManifestEntry(name, path) in entries {
            if let Some(previous) = list.insert(name.clone(), path) {
                debug!("manifest entry '{}' overrides '{}'", name, previous.display());
            }
        }
        Ok(list)
    }

    /// Inserts an entry, returning the source path it replaced, if any.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Option<PathBuf> {
        self.entries.insert(name.into(), path.into())
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in lexicographic name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p.as_path()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Verifies up front that every source is an existing regular file.
    ///
    /// Packing discovers missing sources on its own; this only moves the
    /// failure before the archive is created.
    pub fn check_sources(&self) -> Result<(), PackError> {
        for (name, path) in self.iter() {
            let meta = fs::metadata(path).map_err(|source| PackError::ReadFile {
                name: name.to_string(),
                path: path.to_path_buf(),
                source,
            })?;
            if !meta.is_file() {
                return Err(PackError::ReadFile {
                    name: name.to_string(),
                    path: path.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
                });
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FileList {
    type Item = (&'a String, &'a PathBuf);
    type IntoIter = btree_map::Iter<'a, String, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<N: Into<String>, P: Into<PathBuf>> FromIterator<(N, P)> for FileList {
    fn from_iter<I: IntoIterator<Item = (N, P)>>(iter: I) -> Self {
        let mut list = Self::new();
        for (name, path) in iter {
            list.insert(name, path);
        }
        list
    }
}

/// A regular file, or a symlink whose target is one.
fn is_packable(entry: &walkdir::DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    if !file_type.is_symlink() {
        return false;
    }
    match fs::metadata(entry.path()) {
        Ok(meta) => meta.is_file(),
        Err(e) => {
            warn!("skipping dangling link '{}': {}", entry.path().display(), e);
            false
        }
    }
}

/// Joins the normal components of a relative path with `/`.
pub(crate) fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, data: &[u8]) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn directory_keys_are_relative_regular_files() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.txt", b"abc");
        let b = write(dir.path(), "sub/b.txt", b"hello");
        let c = write(dir.path(), "sub/deeper/c.bin", &[0u8; 16]);
        fs::create_dir_all(dir.path().join("empty/nested")).unwrap();

        let list = FileList::from_directory(dir.path()).unwrap();

        let names: BTreeSet<&str> = list.names().collect();
        let expected: BTreeSet<&str> = ["a.txt", "sub/b.txt", "sub/deeper/c.bin"].into_iter().collect();
        assert_eq!(names, expected);
        assert_eq!(list.get("a.txt"), Some(a.as_path()));
        assert_eq!(list.get("sub/b.txt"), Some(b.as_path()));
        assert_eq!(list.get("sub/deeper/c.bin"), Some(c.as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_packed_under_link_name() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        write(&root, "a.txt", b"a");
        let real = write(dir.path(), "real.txt", b"real");
        write(dir.path(), "outside/hidden.txt", b"h");
        symlink(&real, root.join("link.txt")).unwrap();
        symlink(dir.path().join("outside"), root.join("linked_dir")).unwrap();
        symlink(dir.path().join("gone.txt"), root.join("dangling.txt")).unwrap();

        let list = FileList::from_directory(&root).unwrap();

        assert_eq!(list.names().collect::<Vec<_>>(), ["a.txt", "link.txt"]);
        assert_eq!(list.get("link.txt"), Some(root.join("link.txt").as_path()));
        list.check_sources().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        write(dir.path(), "a.txt", b"a");
        write(dir.path(), "locked/hidden.txt", b"h");
        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Privileged users can still list the directory.
        let readable = fs::read_dir(&locked).is_ok();

        let result = FileList::from_directory(dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let list = result.unwrap();
        assert!(list.contains("a.txt"));
        assert_eq!(list.contains("locked/hidden.txt"), readable);
    }

    #[test]
    fn empty_directory_gives_empty_list() {
        let dir = tempdir().unwrap();
        let list = FileList::from_directory(dir.path()).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn from_directory_rejects_a_file() {
        let dir = tempdir().unwrap();
        let file = write(dir.path(), "plain.txt", b"x");
        let err = FileList::from_directory(&file).unwrap_err();
        assert!(matches!(err, PackError::InputNotFolder { .. }));
    }

    #[test]
    fn manifest_last_write_wins() {
        let list = FileList::parse_manifest(r#"[["x","a.txt"],["x","b.txt"]]"#).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("x"), Some(Path::new("b.txt")));
    }

    #[test]
    fn manifest_names_and_paths_are_verbatim() {
        let list = FileList::parse_manifest(
            r#"[["data/config.ini", "/abs/config.ini"], ["Sub\\Win.txt", "rel/win.txt"]]"#,
        )
        .unwrap();
        assert_eq!(list.get("data/config.ini"), Some(Path::new("/abs/config.ini")));
        assert_eq!(list.get("Sub\\Win.txt"), Some(Path::new("rel/win.txt")));
    }

    #[test]
    fn empty_manifest_is_valid() {
        assert!(FileList::parse_manifest("[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_manifests_are_rejected() {
        let bad = [
            r#"{"x": "a.txt"}"#,
            r#""a.txt""#,
            r#"[["x"]]"#,
            r#"[["x", "a.txt", "extra"]]"#,
            r#"[["x", 1]]"#,
            r#"[[1, "a.txt"]]"#,
            r#"[["ok", "a.txt"], "x"]"#,
            r#"[["x", null]]"#,
            r#"[["x", "a.txt"]"#,
            "",
        ];
        for text in bad {
            assert!(FileList::parse_manifest(text).is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn manifest_file_errors_map_to_kinds() {
        let dir = tempdir().unwrap();

        let missing = dir.path().join("nope.json");
        let err = FileList::from_manifest(&missing).unwrap_err();
        assert!(matches!(err, PackError::InputReadFailed { .. }));

        let broken = write(dir.path(), "broken.json", br#"[["x", 5]]"#);
        let err = FileList::from_manifest(&broken).unwrap_err();
        assert!(matches!(err, PackError::InputDocument { .. }));
    }

    #[test]
    fn resolve_dispatches_on_input_shape() {
        let dir = tempdir().unwrap();
        write(dir.path(), "tree/one.txt", b"1");
        let manifest = write(dir.path(), "list.json", br#"[["only", "somewhere/else.txt"]]"#);

        let from_dir = FileList::resolve(&dir.path().join("tree")).unwrap();
        assert_eq!(from_dir.names().collect::<Vec<_>>(), vec!["one.txt"]);

        let from_manifest = FileList::resolve(&manifest).unwrap();
        assert_eq!(from_manifest.get("only"), Some(Path::new("somewhere/else.txt")));
    }

    #[test]
    fn check_sources_reports_first_missing() {
        let dir = tempdir().unwrap();
        let present = write(dir.path(), "present.txt", b"ok");
        let list: FileList = [
            ("a", present.clone()),
            ("b", dir.path().join("absent.txt")),
            ("c", dir.path().to_path_buf()),
        ]
        .into_iter()
        .collect();

        match list.check_sources().unwrap_err() {
            PackError::ReadFile { name, .. } => assert_eq!(name, "b"),
            other => panic!("unexpected error: {other}"),
        }

        let ok: FileList = [("a", present)].into_iter().collect();
        ok.check_sources().unwrap();
    }

    #[test]
    fn entry_name_uses_forward_slashes() {
        let rel: PathBuf = ["sub", "deeper", "c.bin"].iter().collect();
        assert_eq!(entry_name(&rel), "sub/deeper/c.bin");
        assert_eq!(entry_name(Path::new("./a.txt")), "a.txt");
    }
}
