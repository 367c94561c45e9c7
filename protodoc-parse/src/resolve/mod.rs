//! Scoped resolution of type names.
//!
//! A name is resolved in two phases. First the enclosing scopes are searched outwards for an
//! anchor matching the first component of the name. Then the remaining components are looked up
//! downwards from the anchor, considering only directly nested declarations at each step.


use crate::{
    ast::{EnumId, File, Message, MessageId, Scope, Type},
    case::is_scalar_type,
};

/// The declaration a type name refers to within a single file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Resolution {
    Message(MessageId),
    Enum(EnumId),
    /// The name is a scalar type, is declared in another file, or does not exist.
    Unresolved,
}

/// The classification of a type reference after resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A protobuf scalar type such as `int32` or `string`.
    Atomic,
    Message(MessageId),
    Enum(EnumId),
    /// A dotted name that is not declared in this file, so must come from an import.
    Imported,
    /// A simple name that is not declared in this file.
    Unresolved,
}

impl Type {
    /// Resolves this type against the scope it was written in.
    ///
    /// The result is computed once and cached; later calls return the cached value without
    /// searching `file` again.
    ///
    /// A `Type` does not know which file it belongs to, so `file` must be the file this type was
    /// parsed from. Passing any other file caches a meaningless result.
    pub fn resolve(&self, file: &File) -> Resolution {
        *self
            .resolution
            .get_or_init(|| resolve_name(file, self.scope(), self.name()))
    }

    /// Resolves this type and classifies the result.
    pub fn kind(&self, file: &File) -> TypeKind {
        if self.is_atomic() {
            return TypeKind::Atomic;
        }

        match self.resolve(file) {
            Resolution::Message(id) => TypeKind::Message(id),
            Resolution::Enum(id) => TypeKind::Enum(id),
            Resolution::Unresolved if self.is_dotted() => TypeKind::Imported,
            Resolution::Unresolved => TypeKind::Unresolved,
        }
    }
}

impl File {
    /// Resolves `name` as if it were written at the top level of this file.
    pub fn resolve_name(&self, name: &str) -> Resolution {
        resolve_name(self, Scope::File, name)
    }

    /// Resolves `name` as if it were written in `scope`.
    pub fn resolve_in(&self, scope: Scope, name: &str) -> Resolution {
        resolve_name(self, scope, name)
    }

    /// Looks up a declaration by its fully-qualified name, such as `pkg.Outer.Inner`.
    ///
    /// If this file has a package, the name must start with it.
    pub fn lookup(&self, qualified_name: &str) -> Resolution {
        let name = qualified_name.strip_prefix('.').unwrap_or(qualified_name);
        match self.package() {
            Some(_) => match strip_package(self, name) {
                Some(rest) => resolve_top_level(self, rest),
                None => Resolution::Unresolved,
            },
            None => resolve_top_level(self, name),
        }
    }
}

pub(crate) fn resolve_name(file: &File, scope: Scope, name: &str) -> Resolution {
    if is_scalar_type(name) {
        return Resolution::Unresolved;
    }

    match name.strip_prefix('.') {
        Some(absolute) => resolve_absolute(file, absolute),
        None => resolve_relative(file, scope, name),
    }
}

fn resolve_relative(file: &File, mut scope: Scope, name: &str) -> Resolution {
    let mut components = name.split('.');
    let first = match components.next() {
        Some(first) => first,
        None => return Resolution::Unresolved,
    };

    loop {
        let message = match scope {
            Scope::Message(id) => file.message(id),
            Scope::File => return resolve_file_scope(file, first, name),
        };

        if message.name() == first {
            return descend(file, message.id(), components);
        }

        match find_child(file, message.messages(), message.enums(), first) {
            Some(Resolution::Message(id)) => return descend(file, id, components),
            Some(Resolution::Enum(id)) => return enum_if_last(id, components),
            _ => scope = message.owner(),
        }
    }
}

/// A top-level declaration named `first` is the anchor. Only if there is none may the name be
/// prefixed with this file's package.
fn resolve_file_scope(file: &File, first: &str, name: &str) -> Resolution {
    if find_child(file, &file.messages, &file.enums, first).is_some() {
        return resolve_top_level(file, name);
    }

    match strip_package(file, name) {
        Some(rest) => resolve_top_level(file, rest),
        None => Resolution::Unresolved,
    }
}

fn resolve_absolute(file: &File, name: &str) -> Resolution {
    match strip_package(file, name).map(|rest| resolve_top_level(file, rest)) {
        Some(Resolution::Unresolved) | None => resolve_top_level(file, name),
        Some(resolution) => resolution,
    }
}

fn strip_package<'a>(file: &File, name: &'a str) -> Option<&'a str> {
    file.package()
        .and_then(|package| name.strip_prefix(package))
        .and_then(|rest| rest.strip_prefix('.'))
}

fn resolve_top_level(file: &File, name: &str) -> Resolution {
    let mut components = name.split('.');
    let first = match components.next() {
        Some(first) if !first.is_empty() => first,
        _ => return Resolution::Unresolved,
    };

    match find_child(file, &file.messages, &file.enums, first) {
        Some(Resolution::Message(id)) => descend(file, id, components),
        Some(Resolution::Enum(id)) => enum_if_last(id, components),
        _ => Resolution::Unresolved,
    }
}

/// Follows the remaining name components downwards from `anchor`, one nesting level at a time.
fn descend<'a>(
    file: &File,
    mut anchor: MessageId,
    mut components: impl Iterator<Item = &'a str>,
) -> Resolution {
    while let Some(component) = components.next() {
        let message: &Message = file.message(anchor);
        match find_child(file, message.messages(), message.enums(), component) {
            Some(Resolution::Message(id)) => anchor = id,
            Some(Resolution::Enum(id)) => return enum_if_last(id, components),
            _ => return Resolution::Unresolved,
        }
    }

    Resolution::Message(anchor)
}

/// An enum has no members that can be named with further dots.
fn enum_if_last<'a>(id: EnumId, mut components: impl Iterator<Item = &'a str>) -> Resolution {
    match components.next() {
        None => Resolution::Enum(id),
        Some(_) => Resolution::Unresolved,
    }
}

fn find_child(
    file: &File,
    messages: &[MessageId],
    enums: &[EnumId],
    name: &str,
) -> Option<Resolution> {
    if let Some(&id) = messages.iter().find(|&&id| file.message(id).name() == name) {
        return Some(Resolution::Message(id));
    }
    if let Some(&id) = enums.iter().find(|&&id| file.enum_def(id).name() == name) {
        return Some(Resolution::Enum(id));
    }
    None
}
