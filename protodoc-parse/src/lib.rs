//! Tokenizing, parsing and scoped name resolution of protobuf source files.
//!
//! See the documentation for [`parse()`] for details.
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/protodoc-parse/0.1.0/")]

pub mod ast;
mod case;
mod error;
mod lex;
mod lines;
mod parse;
mod resolve;

pub use self::ast::{File, Scope, Type};
pub use self::error::ParseError;
pub use self::lex::{Token, TokenKind, TokenStream};
pub use self::resolve::{Resolution, TypeKind};

/// Parses a single protobuf source file.
///
/// This function only looks at the file itself: it does not read imports, and type names that are
/// not declared in this file are left unresolved. `name` is used for diagnostics and is available
/// as [`File::name`].
///
/// Comments are attached to the messages, enums, services, fields and enum values they document.
/// A comment documents the declaration on the same line, or the one starting on the following line
/// as long as no blank line separates them.
///
/// # Examples
///
/// ```
/// # use protodoc_parse::{parse, Resolution};
/// let source = r#"
///     syntax = "proto3";
///     package demo;
///
///     // A greeting.
///     message Hello {
///         Kind kind = 1;
///
///         enum Kind {
///             FORMAL = 0;
///         }
///     }
/// "#;
///
/// let file = parse("demo.proto", source).unwrap();
/// assert_eq!(file.package(), Some("demo"));
///
/// let hello = file.messages().next().unwrap();
/// assert_eq!(hello.comment(), Some("A greeting."));
///
/// let types = hello.used_types();
/// assert!(matches!(types[0].resolve(&file), Resolution::Enum(_)));
/// ```
pub fn parse(name: &str, source: &str) -> Result<File, ParseError> {
    let tokens = lex::tokenize(source).map_err(|kind| ParseError::new(kind, name, source))?;
    parse::parse_file(name, tokens).map_err(|kind| ParseError::new(kind, name, source))
}

/// Splits a protobuf source file into tokens, attributing comments to the tokens they document.
///
/// # Examples
///
/// ```
/// # use protodoc_parse::{tokenize, TokenKind};
/// let mut tokens = tokenize("demo.proto", "// The answer.\nint32 answer = 42;").unwrap();
///
/// let first = tokens.next().unwrap();
/// assert_eq!(first.kind(), TokenKind::Word);
/// assert_eq!(first.text(), "int32");
/// assert_eq!(tokens.comment(), Some("The answer."));
/// assert_eq!(tokens.line_number(), Some(2));
/// ```
pub fn tokenize(name: &str, source: &str) -> Result<TokenStream, ParseError> {
    lex::tokenize(source).map_err(|kind| ParseError::new(kind, name, source))
}
