//! Loading of protobuf source files.

mod import_root;

pub use import_root::ImportRootResolver;

use std::{
    fs, io,
    path::{self, Path, PathBuf},
};

use crate::{error::ErrorKind, Error};

/// A strategy for locating protobuf source files.
///
/// The main implementation is [`ImportRootResolver`] which uses the file system, but this trait
/// allows sourcing files from other places as well.
pub trait SourceResolver {
    /// Converts a file system path to a unique file name, as it would be written in an `import` statement.
    fn resolve_path(&self, _path: &Path) -> Option<String> {
        None
    }

    /// Opens a file by its unique name.
    ///
    /// # Errors
    ///
    /// If the file is not found, the implementation should return [`Error::file_not_found`].
    fn open(&self, name: &str) -> Result<SourceFile, Error>;
}

impl<T> SourceResolver for Box<T>
where
    T: SourceResolver + ?Sized,
{
    fn resolve_path(&self, path: &Path) -> Option<String> {
        (**self).resolve_path(path)
    }

    fn open(&self, name: &str) -> Result<SourceFile, Error> {
        (**self).open(name)
    }
}

/// The text of a protobuf source file, returned by [`SourceResolver::open`].
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    path: Option<PathBuf>,
    source: String,
}

impl SourceFile {
    /// Reads a protobuf source file from the filesystem.
    ///
    /// `name` is the unique name the file is known by, such as the path given in an `import` statement.
    ///
    /// # Errors
    ///
    /// If the file does not exist, [`Error::file_not_found()`] is returned. Other IO errors are
    /// returned with the path that failed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::fs;
    /// # use protodoc::file::SourceFile;
    /// let dir = tempfile::tempdir().unwrap();
    /// let path = dir.path().join("foo.proto");
    /// fs::write(&path, "message Foo {}").unwrap();
    ///
    /// let file = SourceFile::read("foo.proto", &path).unwrap();
    /// assert_eq!(file.name(), "foo.proto");
    /// assert_eq!(file.path(), Some(path.as_path()));
    /// assert_eq!(file.source(), "message Foo {}");
    ///
    /// let missing = dir.path().join("missing.proto");
    /// assert!(SourceFile::read("missing.proto", &missing).unwrap_err().is_file_not_found());
    /// ```
    pub fn read(name: &str, path: &Path) -> Result<Self, Error> {
        match fs::read_to_string(path) {
            Ok(source) => Ok(SourceFile {
                name: name.to_owned(),
                path: Some(path.to_owned()),
                source,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(Error::file_not_found(name)),
            Err(err) => Err(Error::from_kind(ErrorKind::OpenFile {
                name: name.to_owned(),
                path: path.to_owned(),
                err,
            })),
        }
    }

    /// Creates a source file from text held in memory.
    pub fn from_source(name: &str, source: &str) -> Self {
        SourceFile {
            name: name.to_owned(),
            path: None,
            source: source.to_owned(),
        }
    }

    /// The unique name of this file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The filesystem path, if this source is backed by a physical file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The full text of the file.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn into_parts(self) -> (String, Option<PathBuf>, String) {
        (self.name, self.path, self.source)
    }
}

/// Converts a relative path into a `/`-separated file name, if it has no `.`, `..` or root components.
pub(crate) fn path_to_file_name(path: &Path) -> Option<String> {
    let mut name = String::new();
    for component in path.components() {
        match component {
            path::Component::Normal(component) => {
                let component = component.to_str()?;
                if !name.is_empty() {
                    name.push('/');
                }
                name.push_str(component);
            }
            path::Component::CurDir => continue,
            _ => return None,
        }
    }

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
