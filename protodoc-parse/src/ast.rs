//! The syntax tree of a single protobuf source file.
//!
//! A [`File`] owns every declaration in it. Messages and enums are stored in per-file arenas and
//! addressed by [`MessageId`] and [`EnumId`]; the owner of each declaration is recorded as a
//! [`Scope`], which never owns anything, so the enclosing scopes of a declaration can be walked
//! without reference cycles.

use std::fmt;

use once_cell::unsync::OnceCell;

use crate::{case::is_scalar_type, resolve::Resolution};

/// Identifies a message within the arena of its [`File`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub(crate) usize);

/// Identifies an enum within the arena of its [`File`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(pub(crate) usize);

impl MessageId {
    /// The position of this message in [`File::all_messages`].
    pub fn index(self) -> usize {
        self.0
    }
}

impl EnumId {
    /// The position of this enum in [`File::all_enums`].
    pub fn index(self) -> usize {
        self.0
    }
}

/// The lexical scope a declaration or type reference appears in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The top level of the file.
    File,
    /// The body of a message.
    Message(MessageId),
}

/// A parsed protobuf source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub(crate) name: String,
    pub(crate) package: Option<String>,
    pub(crate) syntax: Option<String>,
    pub(crate) imports: Vec<Import>,
    pub(crate) messages: Vec<MessageId>,
    pub(crate) enums: Vec<EnumId>,
    pub(crate) services: Vec<Service>,
    pub(crate) extends: Vec<Extend>,
    pub(crate) message_defs: Vec<Message>,
    pub(crate) enum_defs: Vec<EnumDef>,
}

impl File {
    pub(crate) fn new(name: &str) -> Self {
        File {
            name: name.to_owned(),
            package: None,
            syntax: None,
            imports: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            services: Vec::new(),
            extends: Vec::new(),
            message_defs: Vec::new(),
            enum_defs: Vec::new(),
        }
    }

    /// The path of this file, as given to [`parse()`](crate::parse()).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The package declared by this file, if any.
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// The value of the `syntax` statement, if present.
    pub fn syntax(&self) -> Option<&str> {
        self.syntax.as_deref()
    }

    /// The imports of this file, in declaration order.
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// The top-level messages of this file.
    pub fn messages(&self) -> impl ExactSizeIterator<Item = &Message> + '_ {
        self.messages.iter().map(move |&id| self.message(id))
    }

    /// The top-level enums of this file.
    pub fn enums(&self) -> impl ExactSizeIterator<Item = &EnumDef> + '_ {
        self.enums.iter().map(move |&id| self.enum_def(id))
    }

    /// The services of this file.
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// The top-level `extend` blocks of this file.
    pub fn extends(&self) -> &[Extend] {
        &self.extends
    }

    /// Every message in this file, including nested ones, in the order their declarations start.
    pub fn all_messages(&self) -> &[Message] {
        &self.message_defs
    }

    /// Every enum in this file, including nested ones, in the order their declarations start.
    pub fn all_enums(&self) -> &[EnumDef] {
        &self.enum_defs
    }

    /// Gets a message of this file by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created for this file.
    pub fn message(&self, id: MessageId) -> &Message {
        &self.message_defs[id.0]
    }

    /// Gets an enum of this file by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created for this file.
    pub fn enum_def(&self, id: EnumId) -> &EnumDef {
        &self.enum_defs[id.0]
    }

    /// Every type reference in this file: message fields, `extend` blocks and rpc signatures.
    pub fn used_types(&self) -> Vec<&Type> {
        let mut types = Vec::new();
        for message in &self.message_defs {
            types.extend(message.used_types());
            for extend in &message.extends {
                types.extend(extend.used_types());
            }
        }
        for extend in &self.extends {
            types.extend(extend.used_types());
        }
        for service in &self.services {
            for rpc in &service.rpcs {
                types.push(&rpc.input);
                types.push(&rpc.output);
            }
        }
        types
    }

    fn qualify(&self, mut owner: Scope, name: &str) -> String {
        let mut names = vec![name];
        while let Scope::Message(id) = owner {
            let message = self.message(id);
            names.push(&message.name);
            owner = message.owner;
        }
        if let Some(package) = &self.package {
            names.push(package);
        }

        names.reverse();
        names.join(".")
    }
}

/// A message declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub(crate) id: MessageId,
    pub(crate) name: String,
    pub(crate) comment: Option<String>,
    pub(crate) line: usize,
    pub(crate) owner: Scope,
    pub(crate) fields: Vec<Field>,
    pub(crate) messages: Vec<MessageId>,
    pub(crate) enums: Vec<EnumId>,
    pub(crate) extends: Vec<Extend>,
}

impl Message {
    /// The id of this message within its file.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// The unqualified name of this message.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The comment attached to the `message` keyword.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// The line on which the declaration starts.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The scope this message is declared in.
    pub fn owner(&self) -> Scope {
        self.owner
    }

    /// The fields of this message, in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The ids of the messages nested directly in this one.
    pub fn messages(&self) -> &[MessageId] {
        &self.messages
    }

    /// The ids of the enums nested directly in this one.
    pub fn enums(&self) -> &[EnumId] {
        &self.enums
    }

    /// The `extend` blocks nested in this message.
    pub fn extends(&self) -> &[Extend] {
        &self.extends
    }

    /// The package-prefixed, dot-separated path from `file` down to this message.
    pub fn qualified_name(&self, file: &File) -> String {
        file.qualify(self.owner, &self.name)
    }

    /// The type references of all fields of this message.
    pub fn used_types(&self) -> Vec<&Type> {
        self.fields.iter().flat_map(Field::used_types).collect()
    }
}

/// An enum declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub(crate) id: EnumId,
    pub(crate) name: String,
    pub(crate) comment: Option<String>,
    pub(crate) line: usize,
    pub(crate) owner: Scope,
    pub(crate) values: Vec<EnumValue>,
}

impl EnumDef {
    /// The id of this enum within its file.
    pub fn id(&self) -> EnumId {
        self.id
    }

    /// The unqualified name of this enum.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The comment attached to the `enum` keyword.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// The line on which the declaration starts.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The scope this enum is declared in.
    pub fn owner(&self) -> Scope {
        self.owner
    }

    /// The values of this enum, in declaration order.
    pub fn values(&self) -> &[EnumValue] {
        &self.values
    }

    /// The package-prefixed, dot-separated path from `file` down to this enum.
    pub fn qualified_name(&self, file: &File) -> String {
        file.qualify(self.owner, &self.name)
    }
}

/// A single value of an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
    pub comment: Option<String>,
}

/// A service declaration. Services are always declared at the top level of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub comment: Option<String>,
    pub line: usize,
    pub rpcs: Vec<Rpc>,
}

impl Service {
    /// The package-prefixed name of this service.
    pub fn qualified_name(&self, file: &File) -> String {
        file.qualify(Scope::File, &self.name)
    }
}

/// A method of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rpc {
    pub name: String,
    pub comment: Option<String>,
    pub input: Type,
    pub input_stream: bool,
    pub output: Type,
    pub output_stream: bool,
}

/// An `import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub path: String,
    pub kind: ImportKind,
    pub line: usize,
    pub span: logos::Span,
}

/// The optional keyword of an `import` statement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ImportKind {
    Normal,
    Weak,
    Public,
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportKind::Normal => f.write_str("normal"),
            ImportKind::Weak => f.write_str("weak"),
            ImportKind::Public => f.write_str("public"),
        }
    }
}

/// An `extend` block, at the top level of a file or nested in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extend {
    pub extendee: Type,
    pub comment: Option<String>,
    pub fields: Vec<Field>,
}

impl Extend {
    /// The extended type followed by the type references of all extension fields.
    pub fn used_types(&self) -> Vec<&Type> {
        let mut types = vec![&self.extendee];
        types.extend(self.fields.iter().flat_map(Field::used_types));
        types
    }
}

/// The label of a normal or group field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Modifier {
    None,
    Required,
    Optional,
    Repeated,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::None => Ok(()),
            Modifier::Required => f.write_str("required"),
            Modifier::Optional => f.write_str("optional"),
            Modifier::Repeated => f.write_str("repeated"),
        }
    }
}

/// A field of a message or `extend` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Normal(NormalField),
    OneOf(OneOf),
    Map(MapField),
    Group(GroupField),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalField {
    pub name: String,
    pub comment: Option<String>,
    pub modifier: Modifier,
    pub ty: Type,
    pub number: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOf {
    pub name: String,
    pub comment: Option<String>,
    pub fields: Vec<NormalField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapField {
    pub name: String,
    pub comment: Option<String>,
    pub key: Type,
    pub value: Type,
    pub number: i32,
}

/// A proto2 group. Its body is parsed like a message body; the fields are kept here, and any
/// declarations nested in the body belong to the enclosing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupField {
    pub name: String,
    pub comment: Option<String>,
    pub modifier: Modifier,
    pub number: i32,
    pub fields: Vec<Field>,
}

impl Field {
    pub fn name(&self) -> &str {
        match self {
            Field::Normal(field) => &field.name,
            Field::OneOf(oneof) => &oneof.name,
            Field::Map(field) => &field.name,
            Field::Group(group) => &group.name,
        }
    }

    pub fn comment(&self) -> Option<&str> {
        match self {
            Field::Normal(field) => field.comment.as_deref(),
            Field::OneOf(oneof) => oneof.comment.as_deref(),
            Field::Map(field) => field.comment.as_deref(),
            Field::Group(group) => group.comment.as_deref(),
        }
    }

    /// The field number, or `None` for a oneof.
    pub fn number(&self) -> Option<i32> {
        match self {
            Field::Normal(field) => Some(field.number),
            Field::OneOf(_) => None,
            Field::Map(field) => Some(field.number),
            Field::Group(group) => Some(group.number),
        }
    }

    /// Every type reference contained in this field.
    pub fn used_types(&self) -> Vec<&Type> {
        match self {
            Field::Normal(field) => vec![&field.ty],
            Field::OneOf(oneof) => oneof.fields.iter().map(|field| &field.ty).collect(),
            Field::Map(field) => vec![&field.key, &field.value],
            Field::Group(group) => group.fields.iter().flat_map(Field::used_types).collect(),
        }
    }
}

/// A reference to a type by name, as written in the source.
///
/// The name is resolved against the scope it was written in the first time
/// [`resolve`](Type::resolve) is called, and the result is cached for the lifetime of the node.
#[derive(Clone)]
pub struct Type {
    name: String,
    scope: Scope,
    pub(crate) resolution: OnceCell<Resolution>,
}

impl Type {
    pub(crate) fn new(name: String, scope: Scope) -> Self {
        Type {
            name,
            scope,
            resolution: OnceCell::new(),
        }
    }

    /// The name as written, possibly dotted and possibly starting with `.`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scope in which this reference was written.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns true if the name starts with `.` and is resolved from the top of the file.
    pub fn is_absolute(&self) -> bool {
        self.name.starts_with('.')
    }

    /// Returns true if the name contains a `.` after any leading one.
    pub fn is_dotted(&self) -> bool {
        self.name.trim_start_matches('.').contains('.')
    }

    /// Returns true if the name is one of the protobuf scalar types, such as `int32` or `string`.
    pub fn is_atomic(&self) -> bool {
        is_scalar_type(&self.name)
    }

    /// The cached resolution, if [`resolve`](Type::resolve) has been called.
    pub fn cached_resolution(&self) -> Option<Resolution> {
        self.resolution.get().copied()
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.scope == other.scope
    }
}

impl Eq for Type {}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
