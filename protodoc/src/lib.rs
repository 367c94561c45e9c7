//! Collects the protobuf declarations needed to document a set of root files.
//!
//! Root files are parsed with [`protodoc_parse`], and their imports are read only as far as needed
//! to find the types they refer to. The result is a [`FileBundle`]: every parsed file, with the
//! messages and enums that belong to the closure marked as included.
//!
//! For a single call, see [`build_bundle()`]. For more options see [`Importer`].
//!
//! # Examples
//!
//! ```
//! # use std::fs;
//! let dir = tempfile::tempdir().unwrap();
//! fs::write(dir.path().join("money.proto"), "
//!     syntax = 'proto3';
//!     package money;
//!
//!     // An amount of money.
//!     message Money {
//!         string currency_code = 1;
//!         int64 units = 2;
//!     }
//!
//!     message Unrelated {}
//! ").unwrap();
//! fs::write(dir.path().join("shop.proto"), "
//!     syntax = 'proto3';
//!     package shop;
//!     import 'money.proto';
//!
//!     message Item {
//!         money.Money price = 1;
//!     }
//! ").unwrap();
//!
//! let bundle = protodoc::build_bundle([dir.path().join("shop.proto")], dir.path()).unwrap();
//!
//! let messages: Vec<_> = bundle
//!     .all_messages()
//!     .map(|(file, message)| (message.qualified_name(file), message.comment()))
//!     .collect();
//! assert_eq!(messages, vec![
//!     ("shop.Item".to_owned(), None),
//!     ("money.Money".to_owned(), Some("An amount of money.")),
//! ]);
//! ```
//!
//! ### Error messages
//!
//! This crate uses [`miette`](https://crates.io/crates/miette) to add details to errors. For nice
//! error messages, enable the `fancy` feature of `miette` and return a
//! [`miette::Result`](https://docs.rs/miette/latest/miette/type.Result.html):
//!
//! ```text
//! Error:
//!   × import 'missing.proto' not found
//!    ╭─[root.proto:1:1]
//!  1 │ import "missing.proto";
//!    · ───────────┬──────────
//!    ·            ╰── imported here
//!  2 │ message Root { Missing m = 1; }
//!    ╰────
//! ```
#![warn(missing_debug_implementations, missing_docs)]
#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/protodoc/0.1.0/")]

pub mod file;

mod bundle;
mod error;
mod import;

use std::path::{Path, PathBuf};

pub use protodoc_parse;

pub use self::bundle::FileBundle;
pub use self::error::Error;
pub use self::import::Importer;

/// Builds the bundle for a set of root files, resolving imports against `import_root`.
///
/// This function is equivalent to:
///
/// ```rust
/// # use protodoc::Importer;
/// # fn main() -> Result<(), protodoc::Error> {
/// # let files: Vec<std::path::PathBuf> = vec![];
/// let mut importer = Importer::new(".");
/// for file in files {
///     importer.add_root_file(file)?;
/// }
/// let bundle = importer.into_bundle();
/// # Ok(())
/// # }
/// ```
pub fn build_bundle(
    files: impl IntoIterator<Item = impl AsRef<Path>>,
    import_root: impl Into<PathBuf>,
) -> Result<FileBundle, Error> {
    let mut importer = Importer::new(import_root);
    for file in files {
        importer.add_root_file(file)?;
    }
    Ok(importer.into_bundle())
}
