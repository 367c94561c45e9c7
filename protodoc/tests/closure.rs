use std::{fs, path::Path};

use protodoc::{build_bundle, FileBundle, Importer};
use tempfile::TempDir;

fn write_files(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, source) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, source).unwrap();
    }
    dir
}

fn message_names(bundle: &FileBundle) -> Vec<String> {
    bundle
        .all_messages()
        .map(|(file, message)| message.qualified_name(file))
        .collect()
}

fn enum_names(bundle: &FileBundle) -> Vec<String> {
    bundle
        .all_enum_defs()
        .map(|(file, enum_def)| enum_def.qualified_name(file))
        .collect()
}

#[test]
fn self_contained_root_reads_no_imports() {
    // The import does not exist, but nothing needs it.
    let dir = write_files(&[(
        "root.proto",
        r#"
        syntax = "proto3";
        package root;
        import "does/not/exist.proto";

        message Tree {
            repeated Tree children = 1;
            Kind kind = 2;
            enum Kind { LEAF = 0; BRANCH = 1; }
        }
        "#,
    )]);

    let bundle = build_bundle([dir.path().join("root.proto")], dir.path()).unwrap();
    assert_eq!(bundle.file_count(), 1);
    assert_eq!(message_names(&bundle), vec!["root.Tree"]);
    assert_eq!(enum_names(&bundle), vec!["root.Tree.Kind"]);
}

#[test]
fn closure_across_directories() {
    let dir = write_files(&[
        (
            "api/v1/orders.proto",
            r#"
            syntax = "proto3";
            package api.v1;
            import "common/money.proto";
            import "common/time.proto";

            // Places orders.
            service Orders {
                // Creates an order.
                rpc Create (CreateRequest) returns (common.Receipt);
            }

            message CreateRequest {
                common.Money total = 1;
                map<string, common.Money> line_items = 2;
            }
            "#,
        ),
        (
            "common/money.proto",
            r#"
            syntax = "proto3";
            package common;

            message Money {
                string currency = 1;
                Units units = 2;
                message Units { int64 whole = 1; int32 nanos = 2; }
            }

            message Receipt {
                Money paid = 1;
                Status status = 2;
            }

            enum Status { PENDING = 0; PAID = 1; }

            enum Unused { UNUSED = 0; }

            message NeverUsed {}
            "#,
        ),
        (
            "common/time.proto",
            "syntax = \"proto3\"; package common; message Timestamp { int64 seconds = 1; }",
        ),
    ]);

    let mut importer = Importer::new(dir.path());
    importer
        .source_url_pattern(Some("https://example.com/{path}".to_owned()))
        .add_root_file(dir.path().join("api/v1/orders.proto"))
        .unwrap();
    let bundle = importer.into_bundle();

    assert_eq!(
        message_names(&bundle),
        vec![
            "api.v1.CreateRequest",
            "common.Money",
            "common.Money.Units",
            "common.Receipt",
        ]
    );
    assert_eq!(enum_names(&bundle), vec!["common.Status"]);

    assert!(bundle.is_root("api/v1/orders.proto"));
    assert_eq!(bundle.root_files().count(), 1);
    assert_eq!(bundle.files_in_package("common").count(), 2);

    let services: Vec<_> = bundle.all_services().collect();
    assert_eq!(services.len(), 1);
    let (file, service) = services[0];
    assert_eq!(service.qualified_name(file), "api.v1.Orders");
    assert_eq!(service.comment.as_deref(), Some("Places orders."));
    assert_eq!(service.rpcs[0].comment.as_deref(), Some("Creates an order."));
    assert_eq!(
        bundle.source_url(file).as_deref(),
        Some("https://example.com/api/v1/orders.proto")
    );

    let money = bundle.file("common/money.proto").unwrap();
    assert_eq!(
        bundle.path("common/money.proto"),
        Some(dir.path().join("common/money.proto").as_path())
    );
    assert!(bundle
        .source("common/money.proto")
        .unwrap()
        .contains("message NeverUsed"));
    assert_eq!(money.all_messages().len(), 4);
}

#[test]
fn import_cycle() {
    let dir = write_files(&[
        (
            "a.proto",
            "package a; import \"b.proto\"; message A { b.B b = 1; }",
        ),
        (
            "b.proto",
            "package b; import \"a.proto\"; message B { a.A a = 1; b.C c = 2; } message C {}",
        ),
    ]);

    let bundle = build_bundle([dir.path().join("a.proto")], dir.path()).unwrap();
    assert_eq!(bundle.file_count(), 2);
    assert_eq!(message_names(&bundle), vec!["a.A", "b.B", "b.C"]);
}

#[test]
fn relative_root_path() {
    let dir = write_files(&[
        ("root.proto", "import \"dep.proto\"; message Root { Dep dep = 1; }"),
        ("dep.proto", "message Dep {}"),
    ]);

    let mut importer = Importer::new(dir.path());
    importer.add_root_file(Path::new("root.proto")).unwrap();
    assert_eq!(message_names(importer.bundle()), vec!["Root", "Dep"]);
    assert!(importer.bundle().file("root.proto").is_some());
}

#[test]
fn root_file_outside_import_root() {
    let imports = write_files(&[("dep.proto", "package dep; message Dep {}")]);
    let roots = write_files(&[(
        "root.proto",
        "import \"dep.proto\"; message Root { dep.Dep dep = 1; }",
    )]);

    let root_path = roots.path().join("root.proto");
    let bundle = build_bundle([&root_path], imports.path()).unwrap();

    let name = root_path.display().to_string();
    assert!(bundle.is_root(&name));
    assert_eq!(message_names(&bundle), vec!["Root", "dep.Dep"]);
}

#[test]
fn same_root_twice() {
    let dir = write_files(&[("root.proto", "message Root {}")]);

    let mut importer = Importer::new(dir.path());
    importer
        .add_root_file(dir.path().join("root.proto"))
        .unwrap()
        .add_root_file("root.proto")
        .unwrap();

    let bundle = importer.into_bundle();
    assert_eq!(bundle.file_count(), 1);
    assert_eq!(message_names(&bundle), vec!["Root"]);
}

#[test]
fn imported_file_becomes_root() {
    let dir = write_files(&[
        ("first.proto", "import \"second.proto\"; message First { Used used = 1; }"),
        ("second.proto", "message Used {} message Other {}"),
    ]);

    let bundle = build_bundle(
        [dir.path().join("first.proto"), dir.path().join("second.proto")],
        dir.path(),
    )
    .unwrap();

    assert_eq!(bundle.file_count(), 2);
    assert!(bundle.is_root("second.proto"));
    assert_eq!(message_names(&bundle), vec!["First", "Used", "Other"]);
}
