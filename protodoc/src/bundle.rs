use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use protodoc_parse::{
    ast::{EnumDef, EnumId, Message, MessageId, Service},
    File,
};

/// The deduplicated set of parsed files needed to describe a set of root files.
///
/// Every file is parsed in full, but only some of its declarations are part of the closure:
///
/// * all messages, enums and services of a root file,
/// * messages of imported files that are referenced, directly or transitively, from the root files,
/// * enums of imported files that are referenced from an included message or a root file.
#[derive(Default)]
pub struct FileBundle {
    files: Vec<BundleFile>,
    by_name: HashMap<String, usize>,
    by_package: HashMap<String, Vec<usize>>,
    source_url_pattern: Option<String>,
}

pub(crate) struct BundleFile {
    pub(crate) file: File,
    pub(crate) path: Option<PathBuf>,
    pub(crate) source: String,
    pub(crate) is_root: bool,
    pub(crate) included: Vec<bool>,
    pub(crate) reached_enums: Vec<bool>,
}

impl FileBundle {
    /// The number of files parsed into this bundle, including imports.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no file has been added.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Gets a file by its unique name.
    pub fn file(&self, name: &str) -> Option<&File> {
        self.by_name.get(name).map(|&index| &self.files[index].file)
    }

    /// All files in the order they were parsed.
    pub fn files(&self) -> impl ExactSizeIterator<Item = &File> + '_ {
        self.files.iter().map(|file| &file.file)
    }

    /// The root files, in the order they were parsed.
    pub fn root_files(&self) -> impl Iterator<Item = &File> + '_ {
        self.files
            .iter()
            .filter(|file| file.is_root)
            .map(|file| &file.file)
    }

    /// Maps the name of every parsed file to the file.
    pub fn file_dict(&self) -> HashMap<&str, &File> {
        self.by_name
            .iter()
            .map(|(name, &index)| (name.as_str(), &self.files[index].file))
            .collect()
    }

    /// The files declaring the package `package`.
    pub fn files_in_package<'a>(&'a self, package: &str) -> impl Iterator<Item = &'a File> + 'a {
        self.by_package
            .get(package)
            .into_iter()
            .flatten()
            .map(move |&index| &self.files[index].file)
    }

    /// Returns true if `name` was added as a root file.
    pub fn is_root(&self, name: &str) -> bool {
        self.by_name
            .get(name)
            .map_or(false, |&index| self.files[index].is_root)
    }

    /// Returns true if the message `id` of the file `name` is part of the closure.
    pub fn is_included(&self, name: &str, id: MessageId) -> bool {
        self.by_name.get(name).map_or(false, |&index| {
            self.files[index].included.get(id.index()) == Some(&true)
        })
    }

    /// Every included message, paired with the file declaring it.
    pub fn all_messages(&self) -> impl Iterator<Item = (&File, &Message)> + '_ {
        self.files.iter().flat_map(|bundle_file| {
            bundle_file
                .file
                .all_messages()
                .iter()
                .filter(move |message| bundle_file.included[message.id().index()])
                .map(move |message| (&bundle_file.file, message))
        })
    }

    /// Every enum declared in a root file or referenced from the closure, paired with the file declaring it.
    pub fn all_enum_defs(&self) -> impl Iterator<Item = (&File, &EnumDef)> + '_ {
        self.files.iter().flat_map(|bundle_file| {
            bundle_file
                .file
                .all_enums()
                .iter()
                .filter(move |enum_def| bundle_file.reached_enums[enum_def.id().index()])
                .map(move |enum_def| (&bundle_file.file, enum_def))
        })
    }

    /// The services of all root files.
    pub fn all_services(&self) -> impl Iterator<Item = (&File, &Service)> + '_ {
        self.files
            .iter()
            .filter(|bundle_file| bundle_file.is_root)
            .flat_map(|bundle_file| {
                bundle_file
                    .file
                    .services()
                    .iter()
                    .map(move |service| (&bundle_file.file, service))
            })
    }

    /// The full text of the file `name`.
    pub fn source(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(name)
            .map(|&index| self.files[index].source.as_str())
    }

    /// The filesystem path of the file `name`, if it was read from disk.
    pub fn path(&self, name: &str) -> Option<&Path> {
        self.by_name
            .get(name)
            .and_then(|&index| self.files[index].path.as_deref())
    }

    /// A link to the source of `file`, built from the configured URL pattern.
    ///
    /// Every `{path}` in the pattern is replaced by the name of the file.
    ///
    /// # Examples
    ///
    /// ```
    /// # use protodoc::Importer;
    /// let mut importer = Importer::new(".");
    /// importer.source_url_pattern(Some("https://example.com/blob/main/{path}".to_owned()));
    /// importer.add_root_source("api/v1/service.proto", "message Foo {}").unwrap();
    ///
    /// let bundle = importer.into_bundle();
    /// let file = bundle.file("api/v1/service.proto").unwrap();
    /// assert_eq!(
    ///     bundle.source_url(file).as_deref(),
    ///     Some("https://example.com/blob/main/api/v1/service.proto")
    /// );
    /// ```
    pub fn source_url(&self, file: &File) -> Option<String> {
        let pattern = self.source_url_pattern.as_deref()?;
        Some(pattern.replace("{path}", file.name()))
    }

    pub(crate) fn set_source_url_pattern(&mut self, pattern: Option<String>) {
        self.source_url_pattern = pattern;
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn get(&self, index: usize) -> &BundleFile {
        &self.files[index]
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut BundleFile {
        &mut self.files[index]
    }

    pub(crate) fn insert(&mut self, file: File, path: Option<PathBuf>, source: String) -> usize {
        let index = self.files.len();

        self.by_name.insert(file.name().to_owned(), index);
        if let Some(package) = file.package() {
            self.by_package
                .entry(package.to_owned())
                .or_default()
                .push(index);
        }

        self.files.push(BundleFile {
            included: vec![false; file.all_messages().len()],
            reached_enums: vec![false; file.all_enums().len()],
            file,
            path,
            source,
            is_root: false,
        });
        index
    }
}

impl BundleFile {
    /// Adds every declaration of this file to the closure.
    pub(crate) fn include_all(&mut self) {
        self.is_root = true;
        self.included.iter_mut().for_each(|included| *included = true);
        self.reached_enums.iter_mut().for_each(|reached| *reached = true);
    }

    /// Marks a message as included, returning true if it was not included before.
    pub(crate) fn include_message(&mut self, id: MessageId) -> bool {
        !std::mem::replace(&mut self.included[id.index()], true)
    }

    pub(crate) fn reach_enum(&mut self, id: EnumId) {
        self.reached_enums[id.index()] = true;
    }
}

impl fmt::Debug for FileBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBundle")
            .field("files", &self.by_name.keys().collect::<Vec<_>>())
            .field("source_url_pattern", &self.source_url_pattern)
            .finish_non_exhaustive()
    }
}
