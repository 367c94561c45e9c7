use std::fmt;

use logos::Span;
use miette::{Diagnostic, NamedSource};
use thiserror::Error;

use crate::lines::LineResolver;

/// An error that may occur while tokenizing or parsing a protobuf source file.
#[derive(Error, Diagnostic)]
#[error("{}", kind)]
#[diagnostic(forward(kind))]
pub struct ParseError {
    kind: Box<ParseErrorKind>,
    file: String,
    line: usize,
    column: usize,
    #[source_code]
    source_code: NamedSource,
}

#[derive(Error, Debug, Diagnostic, PartialEq, Eq)]
pub(crate) enum ParseErrorKind {
    #[error("backslashes are only allowed inside string literals")]
    IllegalBackslash {
        #[label("found here")]
        span: Span,
    },
    #[error("expected '/' or '*' after '/'")]
    #[diagnostic(help("comments must start with '//' or '/*'"))]
    MalformedCommentOpener {
        #[label("found here")]
        span: Span,
    },
    #[error("unterminated string")]
    UnterminatedString {
        #[label("string starts here")]
        span: Span,
    },
    #[error("unterminated block comment")]
    UnterminatedComment {
        #[label("comment starts here")]
        span: Span,
    },
    #[error("invalid type name '{name}'")]
    #[diagnostic(help(
        "type names are identifiers separated by '.', optionally starting with '.' where a fully-qualified name is allowed"
    ))]
    InvalidTypeName {
        name: String,
        #[label("defined here")]
        span: Span,
    },
    #[error("invalid number '{value}'")]
    InvalidNumber {
        value: String,
        #[label("defined here")]
        span: Span,
    },
    #[error("expected {expected}, but found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        #[label("found here")]
        span: Span,
    },
    #[error("expected {expected}, but reached end of file")]
    UnexpectedEof { expected: String },
}

impl ParseErrorKind {
    fn span(&self) -> Option<Span> {
        match self {
            ParseErrorKind::IllegalBackslash { span }
            | ParseErrorKind::MalformedCommentOpener { span }
            | ParseErrorKind::UnterminatedString { span }
            | ParseErrorKind::UnterminatedComment { span }
            | ParseErrorKind::InvalidTypeName { span, .. }
            | ParseErrorKind::InvalidNumber { span, .. }
            | ParseErrorKind::UnexpectedToken { span, .. } => Some(span.clone()),
            ParseErrorKind::UnexpectedEof { .. } => None,
        }
    }

    fn is_tokenize(&self) -> bool {
        matches!(
            self,
            ParseErrorKind::IllegalBackslash { .. }
                | ParseErrorKind::MalformedCommentOpener { .. }
                | ParseErrorKind::UnterminatedString { .. }
                | ParseErrorKind::UnterminatedComment { .. }
        )
    }
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, name: &str, source: &str) -> Self {
        let lines = LineResolver::new(source);
        // Errors at the end of the file are reported on the last line.
        let offset = kind.span().map_or(source.len(), |span| span.start);
        let (line, column) = lines.resolve(offset);

        ParseError {
            kind: Box::new(kind),
            file: name.to_owned(),
            line: line + 1,
            column: column + 1,
            source_code: NamedSource::new(name, source.to_owned()),
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> ParseErrorKind {
        *self.kind
    }

    /// Gets the name of the file in which this error occurred.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Gets the 1-based line number of the offending token.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Gets the 1-based column of the offending token.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Gets the primary source code span associated with this error, if any.
    pub fn span(&self) -> Option<Span> {
        self.kind.span()
    }

    /// Gets the text of the token that did not match the grammar, if this error was raised by the parser.
    pub fn found(&self) -> Option<&str> {
        match &*self.kind {
            ParseErrorKind::UnexpectedToken { found, .. } => Some(found),
            ParseErrorKind::InvalidTypeName { name, .. } => Some(name),
            ParseErrorKind::InvalidNumber { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Returns true if this error was raised while splitting the file into tokens, rather than by the grammar.
    pub fn is_tokenize(&self) -> bool {
        self.kind.is_tokenize()
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}: {}", self.file, self.line, self.column, self)
    }
}
