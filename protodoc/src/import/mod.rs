use std::{
    collections::HashSet,
    fmt,
    path::{Path, PathBuf},
};

use protodoc_parse::{
    ast::{Extend, Import, ImportKind, MessageId},
    File, Resolution, Type,
};
use tracing::{debug, trace};

use crate::{
    bundle::{BundleFile, FileBundle},
    error::ErrorKind,
    file::{path_to_file_name, ImportRootResolver, SourceFile, SourceResolver},
    Error,
};


/// Builds the minimal [`FileBundle`] describing a set of root files.
///
/// Every declaration of a root file is part of the closure. Imported files are only read when a
/// root file refers to a type it does not declare itself, and only the messages reachable from
/// such references are included.
///
/// # Examples
///
/// ```
/// # use std::fs;
/// # use protodoc::Importer;
/// let dir = tempfile::tempdir().unwrap();
/// fs::write(dir.path().join("dep.proto"), "package dep; message Used {} message Unused {}").unwrap();
///
/// let mut importer = Importer::new(dir.path());
/// importer.add_root_source("root.proto", r#"
///     import "dep.proto";
///     message Root { dep.Used used = 1; }
/// "#).unwrap();
///
/// let bundle = importer.into_bundle();
/// assert_eq!(bundle.file_count(), 2);
/// assert_eq!(
///     bundle.all_messages().map(|(file, message)| message.qualified_name(file)).collect::<Vec<_>>(),
///     vec!["Root", "dep.Used"],
/// );
/// ```
pub struct Importer {
    resolver: Box<dyn SourceResolver>,
    bundle: FileBundle,
    requested: HashSet<(usize, Wanted)>,
}

/// A type referenced from one file that must be declared in another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Wanted {
    /// The fully-qualified names the reference may denote, most specific first.
    candidates: Vec<String>,
}

impl Importer {
    /// Creates a new [`Importer`] which reads imports relative to `import_root`.
    pub fn new(import_root: impl Into<PathBuf>) -> Self {
        Importer::with_resolver(ImportRootResolver::new(import_root))
    }

    /// Creates a new [`Importer`] with a custom [`SourceResolver`] for looking up imported files.
    pub fn with_resolver<R>(resolver: R) -> Self
    where
        R: SourceResolver + 'static,
    {
        Importer {
            resolver: Box::new(resolver),
            bundle: FileBundle::default(),
            requested: HashSet::new(),
        }
    }

    /// Sets the pattern used by [`FileBundle::source_url`] to link to source files.
    ///
    /// The pattern does not affect which files are read or how they are parsed.
    pub fn source_url_pattern(&mut self, pattern: Option<String>) -> &mut Self {
        self.bundle.set_source_url_pattern(pattern);
        self
    }

    /// Reads the file at `path` and adds it to the bundle as a root file.
    ///
    /// If the path is under the import root, the file is named relative to it, in the same way as
    /// `import` statements. Otherwise it is read directly and named by its path.
    pub fn add_root_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, Error> {
        let path = path.as_ref();

        let index = match self
            .resolver
            .resolve_path(path)
            .or_else(|| path_to_file_name(path))
        {
            Some(name) => match self.bundle.index_of(&name) {
                Some(index) => index,
                None => {
                    let source = self.resolver.open(&name).map_err(|err| {
                        if err.is_file_not_found() {
                            Error::from_kind(ErrorKind::FileNotIncluded {
                                path: path.to_owned(),
                            })
                        } else {
                            err
                        }
                    })?;
                    self.insert(&name, source)?
                }
            },
            None => {
                let name = path.display().to_string();
                match self.bundle.index_of(&name) {
                    Some(index) => index,
                    None => {
                        let source = SourceFile::read(&name, path)?;
                        self.insert(&name, source)?
                    }
                }
            }
        };

        self.add_root(index)?;
        Ok(self)
    }

    /// Parses `source` and adds it to the bundle as a root file named `name`.
    ///
    /// If a file with this name was already parsed, the existing file is used instead.
    pub fn add_root_source(&mut self, name: &str, source: &str) -> Result<&mut Self, Error> {
        let index = match self.bundle.index_of(name) {
            Some(index) => index,
            None => self.insert(name, SourceFile::from_source(name, source))?,
        };

        self.add_root(index)?;
        Ok(self)
    }

    /// The files and declarations collected so far.
    pub fn bundle(&self) -> &FileBundle {
        &self.bundle
    }

    /// Consumes the importer, returning the collected files.
    pub fn into_bundle(self) -> FileBundle {
        self.bundle
    }

    fn add_root(&mut self, index: usize) -> Result<(), Error> {
        let bundle_file = self.bundle.get_mut(index);
        bundle_file.include_all();

        let file = &bundle_file.file;
        let mut outstanding = Vec::new();
        for ty in file.used_types() {
            if ty.is_atomic() {
                continue;
            }

            match ty.resolve(file) {
                Resolution::Message(_) | Resolution::Enum(_) => {
                    trace!(file = file.name(), ty = ty.name(), "resolved locally");
                }
                Resolution::Unresolved => push_unique(&mut outstanding, Wanted::new(ty, file)),
            }
        }

        debug!(
            file = file.name(),
            outstanding = outstanding.len(),
            "added root file"
        );
        self.forward(index, outstanding, false)
    }

    /// Looks for the `wanted` types in the imports of a file.
    ///
    /// With `public_only` set, only `import public` statements are followed. These re-export
    /// their declarations to any file importing this one.
    fn forward(&mut self, index: usize, wanted: Vec<Wanted>, public_only: bool) -> Result<(), Error> {
        let file = &self.bundle.get(index).file;
        if wanted.is_empty() {
            if !public_only && !file.imports().is_empty() {
                debug!(file = file.name(), "no outstanding types, skipping imports");
            }
            return Ok(());
        }

        let imports: Vec<Import> = file
            .imports()
            .iter()
            .filter(|import| !public_only || import.kind == ImportKind::Public)
            .cloned()
            .collect();

        for import in &imports {
            let import_index = self.load_import(index, import)?;
            self.visit(import_index, &wanted)?;
        }
        Ok(())
    }

    fn visit(&mut self, index: usize, wanted: &[Wanted]) -> Result<(), Error> {
        let mut outstanding = Vec::new();
        let mut unmatched = Vec::new();

        let bundle_file = self.bundle.get_mut(index);
        for wanted in wanted {
            if !self.requested.insert((index, wanted.clone())) {
                continue;
            }

            match wanted.resolve(&bundle_file.file) {
                Resolution::Message(id) => include_closure(bundle_file, id, &mut outstanding),
                Resolution::Enum(id) => bundle_file.reach_enum(id),
                Resolution::Unresolved => unmatched.push(wanted.clone()),
            }
        }

        self.forward(index, outstanding, false)?;
        self.forward(index, unmatched, true)
    }

    fn load_import(&mut self, importer: usize, import: &Import) -> Result<usize, Error> {
        if let Some(index) = self.bundle.index_of(&import.path) {
            debug!(name = %import.path, "file already parsed");
            return Ok(index);
        }

        match self.resolver.open(&import.path) {
            Ok(source) => self.insert(&import.path, source),
            Err(err) => {
                let importer = self.bundle.get(importer);
                Err(err.into_import_error(importer.file.name(), &importer.source, import))
            }
        }
    }

    fn insert(&mut self, name: &str, source: SourceFile) -> Result<usize, Error> {
        let (_, path, source) = source.into_parts();
        let file = protodoc_parse::parse(name, &source)?;

        debug!(
            name,
            messages = file.all_messages().len(),
            imports = file.imports().len(),
            "parsed file"
        );
        Ok(self.bundle.insert(file, path, source))
    }
}

/// Includes a message and every message of the same file reachable from its fields and nested
/// `extend` blocks.
///
/// References that do not resolve in this file are added to `outstanding`.
fn include_closure(bundle_file: &mut BundleFile, root: MessageId, outstanding: &mut Vec<Wanted>) {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !bundle_file.include_message(id) {
            continue;
        }

        let file = &bundle_file.file;
        let message = file.message(id);
        debug!(
            file = file.name(),
            message = %message.qualified_name(file),
            "including message"
        );

        let extends = message.extends().iter().flat_map(Extend::used_types);
        for ty in message.used_types().into_iter().chain(extends) {
            if ty.is_atomic() {
                continue;
            }

            match ty.resolve(file) {
                Resolution::Message(id) => stack.push(id),
                Resolution::Enum(id) => bundle_file.reached_enums[id.index()] = true,
                Resolution::Unresolved => push_unique(outstanding, Wanted::new(ty, file)),
            }
        }
    }
}

fn push_unique(wanted: &mut Vec<Wanted>, item: Wanted) {
    if !wanted.contains(&item) {
        wanted.push(item);
    }
}

impl Wanted {
    /// Expands a reference written in `file` into the names it may denote.
    ///
    /// A relative name `b.Foo` written in package `x.y` may refer to `x.y.b.Foo`, `x.b.Foo` or
    /// `b.Foo`.
    fn new(ty: &Type, file: &File) -> Self {
        if let Some(absolute) = ty.name().strip_prefix('.') {
            return Wanted {
                candidates: vec![absolute.to_owned()],
            };
        }

        let mut candidates = Vec::new();
        let mut scope = file.package();
        while let Some(package) = scope {
            candidates.push(format!("{}.{}", package, ty.name()));
            scope = package.rfind('.').map(|index| &package[..index]);
        }
        candidates.push(ty.name().to_owned());

        Wanted { candidates }
    }

    fn resolve(&self, file: &File) -> Resolution {
        self.candidates
            .iter()
            .map(|name| file.lookup(name))
            .find(|resolution| *resolution != Resolution::Unresolved)
            .unwrap_or(Resolution::Unresolved)
    }
}

impl fmt::Debug for Importer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Importer")
            .field("bundle", &self.bundle)
            .field("requested", &self.requested.len())
            .finish_non_exhaustive()
    }
}
