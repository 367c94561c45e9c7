use std::path::{self, Path, PathBuf};

use tracing::trace;

use super::{path_to_file_name, SourceFile, SourceResolver};
use crate::Error;

/// An implementation of [`SourceResolver`] which joins import names onto a single directory.
///
/// There is no search list: an import `"a/b.proto"` is always read from `<root>/a/b.proto`.
#[derive(Debug, Clone)]
pub struct ImportRootResolver {
    root: PathBuf,
}

impl ImportRootResolver {
    /// Constructs an `ImportRootResolver` that reads files relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ImportRootResolver { root: root.into() }
    }

    /// The directory imports are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceResolver for ImportRootResolver {
    /// Converts a file system path under the import root to a file name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::path::{Path, PathBuf};
    /// # use protodoc::file::{ImportRootResolver, SourceResolver};
    /// let resolver = ImportRootResolver::new("/path/to/protos");
    /// assert_eq!(resolver.resolve_path(Path::new("/path/to/protos/dir/foo.proto")), Some("dir/foo.proto".to_owned()));
    /// assert_eq!(resolver.resolve_path(Path::new("/elsewhere/foo.proto")), None);
    /// ```
    fn resolve_path(&self, path: &Path) -> Option<String> {
        path_to_file_name(strip_prefix(path, &self.root)?)
    }

    /// Reads the file `name` relative to the import root.
    ///
    /// # Errors
    ///
    /// If the file does not exist, [`Error::file_not_found()`] is returned.
    fn open(&self, name: &str) -> Result<SourceFile, Error> {
        let path = self.root.join(name);
        trace!(name, path = %path.display(), "opening file");
        SourceFile::read(name, &path)
    }
}

fn strip_prefix<'a>(path: &'a Path, prefix: &Path) -> Option<&'a Path> {
    Some(iter_after(path.components(), prefix.components())?.as_path())
}

/// Comparison of paths which ignores '.' components and is case-insensitive on windows.
fn iter_after<'a, 'b, I, J>(mut iter: I, mut prefix: J) -> Option<I>
where
    I: Iterator<Item = path::Component<'a>> + Clone,
    J: Iterator<Item = path::Component<'b>> + Clone,
{
    loop {
        let mut path_next = iter.clone();
        let mut prefix_next = prefix.clone();

        match (path_next.next(), prefix_next.next()) {
            (Some(path::Component::CurDir), _) => {
                iter = path_next;
            }
            (_, Some(path::Component::CurDir)) => {
                prefix = prefix_next;
            }
            (Some(ref l), Some(ref r)) if path_component_eq(l, r) => {
                iter = path_next;
                prefix = prefix_next;
            }
            (Some(_), Some(_)) | (None, Some(_)) => return None,
            (Some(_), None) | (None, None) => return Some(iter),
        }
    }
}

#[cfg(windows)]
fn path_component_eq(l: &path::Component, r: &path::Component) -> bool {
    l.as_os_str().eq_ignore_ascii_case(r.as_os_str())
}

#[cfg(not(windows))]
fn path_component_eq(l: &path::Component, r: &path::Component) -> bool {
    l == r
}
