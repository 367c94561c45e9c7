use std::{fmt, io, ops::Range, path::PathBuf};

use miette::{Diagnostic, NamedSource};
use protodoc_parse::{ast::Import, ParseError};
use thiserror::Error;

/// An error that can occur while building a [`FileBundle`](crate::FileBundle).
#[derive(Diagnostic, Error)]
#[error(transparent)]
#[diagnostic(transparent)]
pub struct Error {
    kind: Box<ErrorKind>,
}

#[derive(Debug, Diagnostic, Error)]
pub(crate) enum ErrorKind {
    #[error("{}", err)]
    #[diagnostic(forward(err))]
    Parse { err: ParseError },
    #[error("error opening file '{}'", path.display())]
    OpenFile {
        name: String,
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("file '{name}' not found")]
    FileNotFound { name: String },
    #[error("import '{name}' not found")]
    ImportNotFound {
        name: String,
        importer: String,
        line: usize,
        #[label("imported here")]
        span: Range<usize>,
        #[source_code]
        source_code: NamedSource,
    },
    #[error("file '{}' is not in the import root", path.display())]
    #[diagnostic(help("pass a path relative to the import root, or change the import root"))]
    FileNotIncluded { path: PathBuf },
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Creates an instance of [`struct@Error`] with an arbitrary payload.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::from_kind(ErrorKind::Custom(error.into()))
    }

    /// Creates an instance of [`struct@Error`] indicating that a file could not be found.
    ///
    /// This error should be returned by [`SourceResolver`](crate::file::SourceResolver) instances if a file is not found.
    pub fn file_not_found(name: &str) -> Self {
        Error::from_kind(ErrorKind::FileNotFound {
            name: name.to_owned(),
        })
    }

    /// The file in which this error occurred, if available.
    ///
    /// For a missing import, this is the file containing the `import` statement.
    pub fn file(&self) -> Option<&str> {
        match &*self.kind {
            ErrorKind::Parse { err } => Some(err.file()),
            ErrorKind::OpenFile { name, .. } | ErrorKind::FileNotFound { name } => Some(name),
            ErrorKind::ImportNotFound { importer, .. } => Some(importer),
            ErrorKind::FileNotIncluded { .. } | ErrorKind::Custom(_) => None,
        }
    }

    pub(crate) fn from_kind(kind: ErrorKind) -> Self {
        Error {
            kind: Box::new(kind),
        }
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns true if this is an instance of [`Error::file_not_found()`], or a missing import.
    pub fn is_file_not_found(&self) -> bool {
        matches!(
            &*self.kind,
            ErrorKind::FileNotFound { .. }
                | ErrorKind::ImportNotFound { .. }
                | ErrorKind::FileNotIncluded { .. }
        )
    }

    /// Returns true if this error is caused by an invalid protobuf source file.
    pub fn is_parse(&self) -> bool {
        matches!(&*self.kind, ErrorKind::Parse { .. })
    }

    /// Returns true if this error is caused by an IO error while opening a file.
    pub fn is_io(&self) -> bool {
        match &*self.kind {
            ErrorKind::OpenFile { .. } => true,
            ErrorKind::Custom(err) if err.downcast_ref::<io::Error>().is_some() => true,
            _ => false,
        }
    }

    /// Converts a [`Error::file_not_found()`] for an imported file into an error pointing at the `import` statement.
    pub(crate) fn into_import_error(self, importer: &str, source: &str, import: &Import) -> Self {
        match *self.kind {
            ErrorKind::FileNotFound { name } => Error::from_kind(ErrorKind::ImportNotFound {
                name,
                importer: importer.to_owned(),
                line: import.line,
                span: import.span.clone(),
                source_code: NamedSource::new(importer, source.to_owned()),
            }),
            kind => Error::from_kind(kind),
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::from_kind(ErrorKind::Parse { err })
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::new(err)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.kind {
            ErrorKind::Parse { err } => err.fmt(f),
            ErrorKind::OpenFile { err, .. } => write!(f, "{}: {}", self, err),
            ErrorKind::FileNotFound { .. } | ErrorKind::FileNotIncluded { .. } => {
                write!(f, "{}", self)
            }
            ErrorKind::ImportNotFound { importer, line, .. } => {
                write!(f, "{}:{}: {}", importer, line, self)
            }
            ErrorKind::Custom(err) => err.fmt(f),
        }
    }
}

#[test]
fn fmt_debug_io() {
    let err = Error::from_kind(ErrorKind::OpenFile {
        name: "file.proto".into(),
        path: "path/to/file.proto".into(),
        err: io::Error::new(io::ErrorKind::Other, "io error"),
    });

    assert!(err.is_io());
    assert!(!err.is_parse());
    assert_eq!(err.file(), Some("file.proto"));
    assert_eq!(
        format!("{:?}", err),
        "error opening file 'path/to/file.proto': io error"
    );
}

#[test]
fn fmt_debug_parse() {
    let err = Error::from(protodoc_parse::parse("file.proto", "invalid").unwrap_err());

    assert!(err.is_parse());
    assert_eq!(err.file(), Some("file.proto"));
    assert_eq!(
        format!("{:?}", err),
        "file.proto:1:1: expected 'syntax', 'package', 'import', 'option', 'message', 'enum', 'service', 'extend' or ';', but found 'invalid'"
    );
}

#[test]
fn fmt_debug_import_not_found() {
    let source = "syntax = \"proto3\";\nimport \"missing.proto\";\n";
    let file = protodoc_parse::parse("root.proto", source).unwrap();

    let err = Error::file_not_found("missing.proto").into_import_error(
        "root.proto",
        source,
        &file.imports()[0],
    );

    assert!(err.is_file_not_found());
    assert_eq!(err.file(), Some("root.proto"));
    assert_eq!(
        format!("{:?}", err),
        "root.proto:2: import 'missing.proto' not found"
    );
    match err.kind() {
        ErrorKind::ImportNotFound { span, .. } => assert_eq!(&source[span.clone()], "import \"missing.proto\""),
        kind => panic!("unexpected error {:?}", kind),
    }
}

#[test]
fn custom_io_error() {
    let err = Error::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));

    assert!(err.is_io());
    assert!(!err.is_file_not_found());
    assert_eq!(err.file(), None);
    assert_eq!(format!("{:?}", err), format!("{:?}", io::Error::new(io::ErrorKind::PermissionDenied, "denied")));
}
