use super::*;
use crate::lex::tokenize;

fn parse(source: &str) -> Result<File, ParseErrorKind> {
    parse_file("test.proto", tokenize(source).unwrap())
}

fn normal(field: &Field) -> &NormalField {
    match field {
        Field::Normal(field) => field,
        _ => panic!("expected a normal field, found {:?}", field),
    }
}

#[test]
fn parse_header() {
    let file = parse(
        r#"
        syntax = "proto3";
        package foo.bar;

        import "a.proto";
        import weak "b.proto";
        import public "c.proto";

        option java_package = "com.example.foo";
        option (custom).value = { list: [1, 2] };
    "#,
    )
    .unwrap();

    assert_eq!(file.name(), "test.proto");
    assert_eq!(file.syntax(), Some("proto3"));
    assert_eq!(file.package(), Some("foo.bar"));
    assert_eq!(
        file.imports()
            .iter()
            .map(|import| (import.path.as_str(), import.kind, import.line))
            .collect::<Vec<_>>(),
        vec![
            ("a.proto", ImportKind::Normal, 5),
            ("b.proto", ImportKind::Weak, 6),
            ("c.proto", ImportKind::Public, 7),
        ]
    );
    assert_eq!(file.messages().len(), 0);
}

#[test]
fn parse_message() {
    let file = parse(
        r#"
        message Outer {
            option deprecated = true;
            reserved 2, 15, 9 to 11;
            reserved "foo", "bar";
            extensions 100 to max;

            required int32 id = 1;
            optional string name = 3 [default = "x", json_name = "n"];
            repeated Inner inners = 4;
            .pkg.Other other = 5;
            map<string, Inner.Kind> kinds = 6;

            oneof choice {
                option (my_option) = 1;
                int64 number = 7;
                Inner inner = 8;
            }

            message Inner {
                enum Kind {
                    option allow_alias = true;
                    UNKNOWN = 0;
                    NEGATIVE = -1;
                    HEX = 0x10 [deprecated = true];
                    reserved 5;
                }
            };
        }
    "#,
    )
    .unwrap();

    assert_eq!(file.all_messages().len(), 2);
    assert_eq!(file.all_enums().len(), 1);

    let outer = file.messages().next().unwrap();
    assert_eq!(outer.name(), "Outer");
    assert_eq!(outer.owner(), Scope::File);
    assert_eq!(outer.line(), 2);
    assert_eq!(
        outer.fields().iter().map(Field::name).collect::<Vec<_>>(),
        vec!["id", "name", "inners", "other", "kinds", "choice"]
    );
    assert_eq!(
        outer
            .fields()
            .iter()
            .map(Field::number)
            .collect::<Vec<_>>(),
        vec![Some(1), Some(3), Some(4), Some(5), Some(6), None]
    );

    let id = normal(&outer.fields()[0]);
    assert_eq!(id.modifier, Modifier::Required);
    assert_eq!(id.ty.name(), "int32");
    assert!(id.ty.is_atomic());
    assert_eq!(normal(&outer.fields()[2]).modifier, Modifier::Repeated);
    assert_eq!(normal(&outer.fields()[3]).modifier, Modifier::None);
    assert!(normal(&outer.fields()[3]).ty.is_absolute());

    match &outer.fields()[4] {
        Field::Map(map) => {
            assert_eq!(map.key.name(), "string");
            assert_eq!(map.value.name(), "Inner.Kind");
            assert_eq!(map.value.scope(), Scope::Message(outer.id()));
        }
        field => panic!("expected a map field, found {:?}", field),
    }

    match &outer.fields()[5] {
        Field::OneOf(oneof) => {
            assert_eq!(
                oneof
                    .fields
                    .iter()
                    .map(|field| (field.name.as_str(), field.ty.name(), field.number))
                    .collect::<Vec<_>>(),
                vec![("number", "int64", 7), ("inner", "Inner", 8)]
            );
        }
        field => panic!("expected a oneof, found {:?}", field),
    }

    let inner = file.message(outer.messages()[0]);
    assert_eq!(inner.name(), "Inner");
    assert_eq!(inner.owner(), Scope::Message(outer.id()));

    let kind = file.enum_def(inner.enums()[0]);
    assert_eq!(kind.owner(), Scope::Message(inner.id()));
    assert_eq!(
        kind.values()
            .iter()
            .map(|value| (value.name.as_str(), value.number))
            .collect::<Vec<_>>(),
        vec![("UNKNOWN", 0), ("NEGATIVE", -1), ("HEX", 16)]
    );
}

#[test]
fn parse_service() {
    let file = parse(
        r#"
        service Greeter {
            option deprecated = true;
            rpc Hello (HelloRequest) returns (HelloReply);
            rpc Chat (stream .chat.Message) returns (stream Reply) {
                option idempotency_level = NO_SIDE_EFFECTS;
            }
            rpc Named (stream) returns (stream stream);
        }
    "#,
    )
    .unwrap();

    let service = &file.services()[0];
    assert_eq!(service.name, "Greeter");
    assert_eq!(service.line, 2);

    let rpcs = &service.rpcs;
    assert_eq!(rpcs.len(), 3);
    assert_eq!(rpcs[0].name, "Hello");
    assert_eq!(rpcs[0].input.name(), "HelloRequest");
    assert!(!rpcs[0].input_stream);
    assert_eq!(rpcs[0].output.name(), "HelloReply");
    assert!(!rpcs[0].output_stream);

    assert_eq!(rpcs[1].input.name(), ".chat.Message");
    assert!(rpcs[1].input_stream);
    assert_eq!(rpcs[1].output.name(), "Reply");
    assert!(rpcs[1].output_stream);

    assert_eq!(rpcs[2].input.name(), "stream");
    assert!(!rpcs[2].input_stream);
    assert_eq!(rpcs[2].output.name(), "stream");
    assert!(rpcs[2].output_stream);
    assert_eq!(rpcs[2].input.scope(), Scope::File);
}

#[test]
fn parse_extend() {
    let file = parse(
        r#"
        syntax = "proto2";

        // Extends options.
        extend google.protobuf.FieldOptions {
            optional string doc = 50000;
        }

        message Holder {
            extend Base {
                repeated Holder holders = 100;
            }
        }
    "#,
    )
    .unwrap();

    let extend = &file.extends()[0];
    assert_eq!(extend.extendee.name(), "google.protobuf.FieldOptions");
    assert_eq!(extend.comment.as_deref(), Some("Extends options."));
    assert_eq!(extend.fields[0].name(), "doc");

    let holder = file.messages().next().unwrap();
    assert!(holder.fields().is_empty());
    let nested = &holder.extends()[0];
    assert_eq!(nested.extendee.scope(), Scope::Message(holder.id()));
    assert_eq!(
        nested
            .used_types()
            .iter()
            .map(|ty| ty.name())
            .collect::<Vec<_>>(),
        vec!["Base", "Holder"]
    );

    let used = file.used_types();
    assert_eq!(
        used.iter().map(|ty| ty.name()).collect::<Vec<_>>(),
        vec!["Base", "Holder", "google.protobuf.FieldOptions", "string"]
    );
}

#[test]
fn parse_group() {
    let file = parse(
        r#"
        syntax = "proto2";

        message SearchResponse {
            repeated group Result = 1 {
                required string url = 2;
                optional Extra extra = 3;
                message Extra {}
            }
        }
    "#,
    )
    .unwrap();

    let response = file.messages().next().unwrap();
    assert_eq!(response.fields().len(), 1);
    match &response.fields()[0] {
        Field::Group(group) => {
            assert_eq!(group.name, "Result");
            assert_eq!(group.modifier, Modifier::Repeated);
            assert_eq!(group.number, 1);
            assert_eq!(
                group.fields.iter().map(Field::name).collect::<Vec<_>>(),
                vec!["url", "extra"]
            );
        }
        field => panic!("expected a group, found {:?}", field),
    }

    // Declarations in the group body belong to the enclosing message.
    let extra = file.message(response.messages()[0]);
    assert_eq!(extra.name(), "Extra");
    assert_eq!(extra.owner(), Scope::Message(response.id()));
    assert_eq!(
        response
            .used_types()
            .iter()
            .map(|ty| ty.name())
            .collect::<Vec<_>>(),
        vec!["string", "Extra"]
    );
}

#[test]
fn type_named_group_is_always_a_group() {
    // A message named `group` cannot be used as a field type: the field is read as a group
    // declaration, which then fails because it has no body.
    let err = parse(
        r#"
        message group {}
        message Foo {
            optional group g = 1;
        }
    "#,
    )
    .unwrap_err();

    assert_eq!(
        err,
        ParseErrorKind::UnexpectedToken {
            expected: "'{'".to_owned(),
            found: ";".to_owned(),
            span: 80..81,
        }
    );
}

#[test]
fn comments_attach_to_declarations() {
    let file = parse(
        r#"
        // Documents Foo.
        message Foo {
            // Documents bar.
            int32 bar = 1;
            int32 baz = 2; // Documents baz.

            // Detached.

            int32 qux = 3;
        }

        /* Documents State. */
        enum State {
            // Documents ON.
            ON = 0;
        }

        // Documents Svc.
        service Svc {
            // Documents Call.
            rpc Call (Foo) returns (Foo);
        }
    "#,
    )
    .unwrap();

    let foo = file.messages().next().unwrap();
    assert_eq!(foo.comment(), Some("Documents Foo."));
    assert_eq!(
        foo.fields().iter().map(Field::comment).collect::<Vec<_>>(),
        vec![Some("Documents bar."), Some("Documents baz."), None]
    );

    let state = file.enums().next().unwrap();
    assert_eq!(state.comment(), Some("Documents State."));
    assert_eq!(state.values()[0].comment.as_deref(), Some("Documents ON."));

    let svc = &file.services()[0];
    assert_eq!(svc.comment.as_deref(), Some("Documents Svc."));
    assert_eq!(svc.rpcs[0].comment.as_deref(), Some("Documents Call."));
}

#[test]
fn blank_line_between_comment_and_message() {
    let file = parse("// Not attached.\n\nmessage A {}\n").unwrap();
    assert_eq!(file.messages().next().unwrap().comment(), None);

    let file = parse("message A {} // Attached.\n\nmessage B {}\n").unwrap();
    let mut messages = file.messages();
    assert_eq!(messages.next().unwrap().comment(), Some("Attached."));
    assert_eq!(messages.next().unwrap().comment(), None);
}

#[test]
fn qualified_names() {
    let file = parse(
        r#"
        package p;
        message a {
            message aa {
                message aaa {}
                enum E {}
            }
        }
        service S {}
    "#,
    )
    .unwrap();

    assert_eq!(
        file.all_messages()
            .iter()
            .map(|message| message.qualified_name(&file))
            .collect::<Vec<_>>(),
        vec!["p.a", "p.a.aa", "p.a.aa.aaa"]
    );
    assert_eq!(file.all_enums()[0].qualified_name(&file), "p.a.aa.E");
    assert_eq!(file.services()[0].qualified_name(&file), "p.S");
}

#[test]
fn qualified_names_without_package() {
    let file = parse("message a { message b {} }").unwrap();
    assert_eq!(file.all_messages()[1].qualified_name(&file), "a.b");
}

#[test]
fn arena_order() {
    let file = parse(
        r#"
        message A {
            message B {
                message C {}
            }
            message D {}
        }
        message E {}
    "#,
    )
    .unwrap();

    assert_eq!(
        file.all_messages()
            .iter()
            .map(|message| (message.name(), message.id().index()))
            .collect::<Vec<_>>(),
        vec![("A", 0), ("B", 1), ("C", 2), ("D", 3), ("E", 4)]
    );
    assert_eq!(
        file.messages().map(Message::name).collect::<Vec<_>>(),
        vec!["A", "E"]
    );
}

#[test]
fn empty_statements() {
    let file = parse(";;message A {;};;enum B {;};").unwrap();
    assert_eq!(file.messages().len(), 1);
    assert_eq!(file.enums().len(), 1);
}

#[test]
fn unexpected_token() {
    assert_eq!(
        parse("message Foo { int32 = 1; }").unwrap_err(),
        ParseErrorKind::UnexpectedToken {
            expected: "an identifier".to_owned(),
            found: "=".to_owned(),
            span: 20..21,
        }
    );
    assert_eq!(
        parse("foo bar;").unwrap_err(),
        ParseErrorKind::UnexpectedToken {
            expected:
                "'syntax', 'package', 'import', 'option', 'message', 'enum', 'service', 'extend' or ';'"
                    .to_owned(),
            found: "foo".to_owned(),
            span: 0..3,
        }
    );
    assert_eq!(
        parse("import foo;").unwrap_err(),
        ParseErrorKind::UnexpectedToken {
            expected: "a string literal, 'public' or 'weak'".to_owned(),
            found: "foo".to_owned(),
            span: 7..10,
        }
    );
    assert_eq!(
        parse("message Foo { \"str\" }").unwrap_err(),
        ParseErrorKind::UnexpectedToken {
            expected:
                "a message field, oneof, 'message', 'enum', 'extend', 'option', 'reserved' or '}'"
                    .to_owned(),
            found: "\"str\"".to_owned(),
            span: 14..19,
        }
    );
}

#[test]
fn unexpected_eof() {
    assert_eq!(
        parse("message Foo {").unwrap_err(),
        ParseErrorKind::UnexpectedEof {
            expected:
                "a message field, oneof, 'message', 'enum', 'extend', 'option', 'reserved' or '}'"
                    .to_owned(),
        }
    );
    assert_eq!(
        parse("option foo = 1").unwrap_err(),
        ParseErrorKind::UnexpectedEof {
            expected: "';'".to_owned(),
        }
    );
    assert_eq!(
        parse("message Foo { int32 a = 1 [deprecated = true").unwrap_err(),
        ParseErrorKind::UnexpectedEof {
            expected: "']'".to_owned(),
        }
    );
}

#[test]
fn invalid_type_name() {
    assert_eq!(
        parse("message Foo { foo..Bar bar = 1; }").unwrap_err(),
        ParseErrorKind::InvalidTypeName {
            name: "foo..Bar".to_owned(),
            span: 14..22,
        }
    );
    assert_eq!(
        parse("package .foo;").unwrap_err(),
        ParseErrorKind::InvalidTypeName {
            name: ".foo".to_owned(),
            span: 8..12,
        }
    );
}

#[test]
fn invalid_number() {
    assert_eq!(
        parse("message Foo { int32 a = one; }").unwrap_err(),
        ParseErrorKind::InvalidNumber {
            value: "one".to_owned(),
            span: 24..27,
        }
    );
    assert_eq!(
        parse("message Foo { int32 a = 4294967296; }").unwrap_err(),
        ParseErrorKind::InvalidNumber {
            value: "4294967296".to_owned(),
            span: 24..34,
        }
    );
    assert_eq!(
        parse("message Foo { int32 a = -1; }").unwrap_err(),
        ParseErrorKind::UnexpectedToken {
            expected: "an integer".to_owned(),
            found: "-".to_owned(),
            span: 24..25,
        }
    );
}

#[test]
fn error_line_numbers() {
    let err = crate::parse(
        "errors.proto",
        "syntax = \"proto3\";\n\nmessage Foo {\n  int32 x = ;\n}\n",
    )
    .unwrap_err();

    assert_eq!(err.file(), "errors.proto");
    assert_eq!(err.line(), 4);
    assert_eq!(err.column(), 13);
    assert_eq!(err.found(), Some(";"));
    assert!(!err.is_tokenize());
    assert_eq!(
        err.to_string(),
        "expected an integer, but found ';'"
    );
    assert_eq!(
        format!("{:?}", err),
        "errors.proto:4:13: expected an integer, but found ';'"
    );
}
