#[cfg(test)]
mod tests;

use crate::{
    ast::{
        EnumDef, EnumId, EnumValue, Extend, Field, File, GroupField, Import, ImportKind, MapField,
        Message, MessageId, Modifier, NormalField, OneOf, Rpc, Scope, Service, Type,
    },
    case::{is_valid_ident, is_valid_type_name, parse_int},
    error::ParseErrorKind,
    lex::{
        Token,
        TokenKind::{self, Str, Symbol, Word},
        TokenStream,
    },
};

pub(crate) fn parse_file(name: &str, tokens: TokenStream) -> Result<File, ParseErrorKind> {
    Parser::new(name, tokens).parse_file()
}

struct Parser {
    tokens: TokenStream,
    file: File,
}

/// Declarations collected while parsing a message body, `extend` block or the top level of a file.
#[derive(Default)]
struct Body {
    fields: Vec<Field>,
    messages: Vec<MessageId>,
    enums: Vec<EnumId>,
    extends: Vec<Extend>,
}

impl Parser {
    fn new(name: &str, tokens: TokenStream) -> Self {
        Parser {
            tokens,
            file: File::new(name),
        }
    }

    fn parse_file(mut self) -> Result<File, ParseErrorKind> {
        let mut body = Body::default();

        while self.tokens.has_next() {
            match self.peek() {
                Some((Symbol, ";")) => {
                    self.bump();
                }
                Some((Word, "syntax")) => self.parse_syntax()?,
                Some((Word, "package")) => self.parse_package()?,
                Some((Word, "import")) => {
                    let import = self.parse_import()?;
                    self.file.imports.push(import);
                }
                Some((Word, "option")) => self.skip_statement()?,
                Some((Word, "message")) => {
                    let id = self.parse_message(Scope::File)?;
                    body.messages.push(id);
                }
                Some((Word, "enum")) => {
                    let id = self.parse_enum(Scope::File)?;
                    body.enums.push(id);
                }
                Some((Word, "service")) => {
                    let service = self.parse_service()?;
                    self.file.services.push(service);
                }
                Some((Word, "extend")) => self.parse_extend(Scope::File, &mut body)?,
                _ => {
                    return self.unexpected_token(
                        "'syntax', 'package', 'import', 'option', 'message', 'enum', 'service', 'extend' or ';'",
                    )
                }
            }
        }

        debug_assert!(body.fields.is_empty());
        self.file.messages = body.messages;
        self.file.enums = body.enums;
        self.file.extends = body.extends;
        Ok(self.file)
    }

    fn parse_syntax(&mut self) -> Result<(), ParseErrorKind> {
        self.expect_eq("syntax")?;
        self.expect_eq("=")?;
        let syntax = self.parse_string()?;
        self.expect_eq(";")?;

        self.file.syntax = Some(syntax.text().to_owned());
        Ok(())
    }

    fn parse_package(&mut self) -> Result<(), ParseErrorKind> {
        self.expect_eq("package")?;
        let name = self.parse_dotted_name(false)?;
        self.expect_eq(";")?;

        self.file.package = Some(name.text().to_owned());
        Ok(())
    }

    fn parse_import(&mut self) -> Result<Import, ParseErrorKind> {
        let keyword = self.expect_eq("import")?;

        let kind = match self.peek() {
            Some((Word, "weak")) => {
                self.bump();
                ImportKind::Weak
            }
            Some((Word, "public")) => {
                self.bump();
                ImportKind::Public
            }
            Some((Str, _)) => ImportKind::Normal,
            _ => return self.unexpected_token("a string literal, 'public' or 'weak'"),
        };

        let path = self.parse_string()?;
        self.expect_eq(";")?;

        Ok(Import {
            path: path.text().to_owned(),
            kind,
            line: keyword.line(),
            span: keyword.span().start..path.span().end,
        })
    }

    fn parse_message(&mut self, owner: Scope) -> Result<MessageId, ParseErrorKind> {
        let keyword = self.expect_eq("message")?;
        let name = self.parse_ident()?;

        // The id is allocated before the body is parsed so nested declarations can refer to it.
        let id = MessageId(self.file.message_defs.len());
        self.file.message_defs.push(Message {
            id,
            name: name.text().to_owned(),
            comment: keyword.comment().map(ToOwned::to_owned),
            line: keyword.line(),
            owner,
            fields: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            extends: Vec::new(),
        });

        let mut body = Body::default();
        self.parse_message_body(Scope::Message(id), &mut body)?;

        let message = &mut self.file.message_defs[id.0];
        message.fields = body.fields;
        message.messages = body.messages;
        message.enums = body.enums;
        message.extends = body.extends;
        Ok(id)
    }

    fn parse_message_body(&mut self, scope: Scope, body: &mut Body) -> Result<(), ParseErrorKind> {
        self.expect_eq("{")?;

        loop {
            match self.peek() {
                Some((Symbol, "}")) => {
                    self.bump();
                    return Ok(());
                }
                Some((Symbol, ";")) => {
                    self.bump();
                }
                Some((Word, "option" | "reserved" | "extensions")) => self.skip_statement()?,
                Some((Word, "message")) => {
                    let id = self.parse_message(scope)?;
                    body.messages.push(id);
                }
                Some((Word, "enum")) => {
                    let id = self.parse_enum(scope)?;
                    body.enums.push(id);
                }
                Some((Word, "extend")) => self.parse_extend(scope, body)?,
                Some((Word, "oneof")) => {
                    let oneof = self.parse_oneof(scope)?;
                    body.fields.push(Field::OneOf(oneof));
                }
                Some((Word, "map")) if self.is_map_field() => {
                    let map = self.parse_map(scope)?;
                    body.fields.push(Field::Map(map));
                }
                Some((Word, _)) => self.parse_field(scope, body)?,
                _ => {
                    return self.unexpected_token(
                        "a message field, oneof, 'message', 'enum', 'extend', 'option', 'reserved' or '}'",
                    )
                }
            }
        }
    }

    /// Parses a normal field, or a proto2 group if the type name is `group`.
    ///
    /// A field whose type is a message literally named `group` is therefore always read as a group.
    fn parse_field(&mut self, scope: Scope, body: &mut Body) -> Result<(), ParseErrorKind> {
        let comment = self.peek_comment();
        let modifier = self.parse_modifier();
        let ty = self.parse_dotted_name(true)?;

        if ty.text() == "group" {
            let name = self.parse_ident()?;
            self.expect_eq("=")?;
            let number = self.parse_number(false)?;
            self.skip_options()?;

            let mut group = Body::default();
            self.parse_message_body(scope, &mut group)?;
            body.messages.extend(group.messages);
            body.enums.extend(group.enums);
            body.extends.extend(group.extends);

            body.fields.push(Field::Group(GroupField {
                name: name.text().to_owned(),
                comment,
                modifier,
                number,
                fields: group.fields,
            }));
        } else {
            let field = self.parse_field_tail(comment, modifier, ty, scope)?;
            body.fields.push(Field::Normal(field));
        }

        Ok(())
    }

    fn parse_field_tail(
        &mut self,
        comment: Option<String>,
        modifier: Modifier,
        ty: Token,
        scope: Scope,
    ) -> Result<NormalField, ParseErrorKind> {
        let name = self.parse_ident()?;
        self.expect_eq("=")?;
        let number = self.parse_number(false)?;
        self.skip_options()?;
        self.expect_eq(";")?;

        Ok(NormalField {
            name: name.text().to_owned(),
            comment,
            modifier,
            ty: Type::new(ty.text().to_owned(), scope),
            number,
        })
    }

    fn parse_modifier(&mut self) -> Modifier {
        let modifier = match self.peek() {
            Some((Word, "required")) => Modifier::Required,
            Some((Word, "optional")) => Modifier::Optional,
            Some((Word, "repeated")) => Modifier::Repeated,
            _ => return Modifier::None,
        };

        self.bump();
        modifier
    }

    fn parse_oneof(&mut self, scope: Scope) -> Result<OneOf, ParseErrorKind> {
        let keyword = self.expect_eq("oneof")?;
        let name = self.parse_ident()?;
        self.expect_eq("{")?;

        let mut fields = Vec::new();
        loop {
            match self.peek() {
                Some((Symbol, "}")) => {
                    self.bump();
                    break;
                }
                Some((Symbol, ";")) => {
                    self.bump();
                }
                Some((Word, "option")) => self.skip_statement()?,
                Some((Word, _)) => {
                    let comment = self.peek_comment();
                    let ty = self.parse_dotted_name(true)?;
                    fields.push(self.parse_field_tail(comment, Modifier::None, ty, scope)?);
                }
                _ => return self.unexpected_token("a oneof field, 'option' or '}'"),
            }
        }

        Ok(OneOf {
            name: name.text().to_owned(),
            comment: keyword.comment().map(ToOwned::to_owned),
            fields,
        })
    }

    fn is_map_field(&self) -> bool {
        matches!(self.tokens.peek_nth(1), Some(token) if token.is("<"))
    }

    fn parse_map(&mut self, scope: Scope) -> Result<MapField, ParseErrorKind> {
        let keyword = self.expect_eq("map")?;
        self.expect_eq("<")?;
        let key = self.parse_type(scope)?;
        self.expect_eq(",")?;
        let value = self.parse_type(scope)?;
        self.expect_eq(">")?;

        let name = self.parse_ident()?;
        self.expect_eq("=")?;
        let number = self.parse_number(false)?;
        self.skip_options()?;
        self.expect_eq(";")?;

        Ok(MapField {
            name: name.text().to_owned(),
            comment: keyword.comment().map(ToOwned::to_owned),
            key,
            value,
            number,
        })
    }

    fn parse_extend(&mut self, scope: Scope, outer: &mut Body) -> Result<(), ParseErrorKind> {
        let keyword = self.expect_eq("extend")?;
        let extendee = self.parse_type(scope)?;
        self.expect_eq("{")?;

        let mut body = Body::default();
        loop {
            match self.peek() {
                Some((Symbol, "}")) => {
                    self.bump();
                    break;
                }
                Some((Symbol, ";")) => {
                    self.bump();
                }
                Some((Word, _)) => self.parse_field(scope, &mut body)?,
                _ => return self.unexpected_token("an extension field or '}'"),
            }
        }

        outer.messages.extend(body.messages);
        outer.enums.extend(body.enums);
        outer.extends.push(Extend {
            extendee,
            comment: keyword.comment().map(ToOwned::to_owned),
            fields: body.fields,
        });
        Ok(())
    }

    fn parse_enum(&mut self, owner: Scope) -> Result<EnumId, ParseErrorKind> {
        let keyword = self.expect_eq("enum")?;
        let name = self.parse_ident()?;
        self.expect_eq("{")?;

        let mut values = Vec::new();
        loop {
            match self.peek() {
                Some((Symbol, "}")) => {
                    self.bump();
                    break;
                }
                Some((Symbol, ";")) => {
                    self.bump();
                }
                Some((Word, "option" | "reserved")) => self.skip_statement()?,
                Some((Word, _)) => values.push(self.parse_enum_value()?),
                _ => return self.unexpected_token("an enum value, 'option', 'reserved' or '}'"),
            }
        }

        let id = EnumId(self.file.enum_defs.len());
        self.file.enum_defs.push(EnumDef {
            id,
            name: name.text().to_owned(),
            comment: keyword.comment().map(ToOwned::to_owned),
            line: keyword.line(),
            owner,
            values,
        });
        Ok(id)
    }

    fn parse_enum_value(&mut self) -> Result<EnumValue, ParseErrorKind> {
        let name = self.parse_ident()?;
        self.expect_eq("=")?;
        let number = self.parse_number(true)?;
        self.skip_options()?;
        self.expect_eq(";")?;

        Ok(EnumValue {
            name: name.text().to_owned(),
            number,
            comment: name.comment().map(ToOwned::to_owned),
        })
    }

    fn parse_service(&mut self) -> Result<Service, ParseErrorKind> {
        let keyword = self.expect_eq("service")?;
        let name = self.parse_ident()?;
        self.expect_eq("{")?;

        let mut rpcs = Vec::new();
        loop {
            match self.peek() {
                Some((Symbol, "}")) => {
                    self.bump();
                    break;
                }
                Some((Symbol, ";")) => {
                    self.bump();
                }
                Some((Word, "option")) => self.skip_statement()?,
                Some((Word, "rpc")) => rpcs.push(self.parse_rpc()?),
                _ => return self.unexpected_token("'rpc', 'option', ';' or '}'"),
            }
        }

        Ok(Service {
            name: name.text().to_owned(),
            comment: keyword.comment().map(ToOwned::to_owned),
            line: keyword.line(),
            rpcs,
        })
    }

    fn parse_rpc(&mut self) -> Result<Rpc, ParseErrorKind> {
        let keyword = self.expect_eq("rpc")?;
        let name = self.parse_ident()?;

        self.expect_eq("(")?;
        let input_stream = self.parse_stream();
        let input = self.parse_type(Scope::File)?;
        self.expect_eq(")")?;

        self.expect_eq("returns")?;

        self.expect_eq("(")?;
        let output_stream = self.parse_stream();
        let output = self.parse_type(Scope::File)?;
        self.expect_eq(")")?;

        match self.peek() {
            Some((Symbol, ";")) => {
                self.bump();
            }
            Some((Symbol, "{")) => self.skip_balanced("{", "}")?,
            _ => return self.unexpected_token("';' or '{'"),
        }

        Ok(Rpc {
            name: name.text().to_owned(),
            comment: keyword.comment().map(ToOwned::to_owned),
            input,
            input_stream,
            output,
            output_stream,
        })
    }

    /// Consumes the `stream` keyword, unless it is the name of the type itself.
    fn parse_stream(&mut self) -> bool {
        let is_stream = self.at("stream")
            && !matches!(self.tokens.peek_nth(1), Some(token) if token.is(")"));
        if is_stream {
            self.bump();
        }
        is_stream
    }

    fn parse_type(&mut self, scope: Scope) -> Result<Type, ParseErrorKind> {
        let name = self.parse_dotted_name(true)?;
        Ok(Type::new(name.text().to_owned(), scope))
    }

    fn parse_dotted_name(&mut self, allow_absolute: bool) -> Result<Token, ParseErrorKind> {
        if !self.at_kind(Word) {
            return self.unexpected_token("a type name");
        }

        let name = self.bump();
        if !is_valid_type_name(name.text(), allow_absolute) {
            return Err(ParseErrorKind::InvalidTypeName {
                name: name.text().to_owned(),
                span: name.span(),
            });
        }
        Ok(name)
    }

    fn parse_ident(&mut self) -> Result<Token, ParseErrorKind> {
        let is_ident = matches!(
            self.tokens.peek(),
            Some(token) if token.kind() == Word && is_valid_ident(token.text())
        );
        if is_ident {
            Ok(self.bump())
        } else {
            self.unexpected_token("an identifier")
        }
    }

    fn parse_number(&mut self, allow_negative: bool) -> Result<i32, ParseErrorKind> {
        let negative = allow_negative && self.eat("-");
        if !self.at_kind(Word) {
            return self.unexpected_token("an integer");
        }

        let token = self.bump();
        parse_int(token.text())
            .map(|value| if negative { -value } else { value })
            .and_then(|value| i32::try_from(value).ok())
            .ok_or_else(|| ParseErrorKind::InvalidNumber {
                value: token.to_string(),
                span: token.span(),
            })
    }

    fn parse_string(&mut self) -> Result<Token, ParseErrorKind> {
        if self.at_kind(Str) {
            Ok(self.bump())
        } else {
            self.unexpected_token("a string literal")
        }
    }

    /// Discards a statement such as `option`, `reserved` or `extensions` up to its terminating `;`.
    fn skip_statement(&mut self) -> Result<(), ParseErrorKind> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Some((Symbol, ";")) if depth == 0 => {
                    self.bump();
                    return Ok(());
                }
                Some((Symbol, "{" | "[" | "(" | "<")) => depth += 1,
                Some((Symbol, "}")) if depth == 0 => return self.unexpected_token("';'"),
                Some((Symbol, "}" | "]" | ")" | ">")) => depth = depth.saturating_sub(1),
                Some(_) => {}
                None => return self.unexpected_token("';'"),
            }
            self.bump();
        }
    }

    /// Discards a bracketed list of field or enum value options, if present.
    fn skip_options(&mut self) -> Result<(), ParseErrorKind> {
        if self.at("[") {
            self.skip_balanced("[", "]")
        } else {
            Ok(())
        }
    }

    fn skip_balanced(&mut self, open: &str, close: &str) -> Result<(), ParseErrorKind> {
        self.expect_eq(open)?;

        let mut depth = 1usize;
        while depth > 0 {
            if !self.tokens.has_next() {
                return self.unexpected_token(format!("'{}'", close));
            }

            let token = self.bump();
            if token.is(open) {
                depth += 1;
            } else if token.is(close) {
                depth -= 1;
            }
        }
        Ok(())
    }

    fn expect_eq(&mut self, text: &str) -> Result<Token, ParseErrorKind> {
        if self.at(text) {
            Ok(self.bump())
        } else {
            self.unexpected_token(format!("'{}'", text))
        }
    }

    fn eat(&mut self, text: &str) -> bool {
        let found = self.at(text);
        if found {
            self.bump();
        }
        found
    }

    fn at(&self, text: &str) -> bool {
        matches!(self.tokens.peek(), Some(token) if token.is(text))
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        matches!(self.tokens.peek(), Some(token) if token.kind() == kind)
    }

    fn peek(&self) -> Option<(TokenKind, &str)> {
        self.tokens
            .peek()
            .map(|token| (token.kind(), token.text()))
    }

    fn peek_comment(&self) -> Option<String> {
        self.tokens.peek()?;
        self.tokens.comment().map(ToOwned::to_owned)
    }

    fn bump(&mut self) -> Token {
        self.tokens
            .next()
            .cloned()
            .expect("called bump without peek returning Some()")
    }

    fn unexpected_token<T>(&self, expected: impl ToString) -> Result<T, ParseErrorKind> {
        match self.tokens.peek() {
            Some(found) => Err(ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
                span: found.span(),
            }),
            None => Err(ParseErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            }),
        }
    }
}
