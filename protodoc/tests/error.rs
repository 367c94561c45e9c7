use std::fs;

use miette::{Diagnostic, JSONReportHandler};
use protodoc::{
    file::{SourceFile, SourceResolver},
    Error, Importer,
};

struct TestSourceResolver {
    files: &'static [(&'static str, &'static str)],
}

impl SourceResolver for TestSourceResolver {
    fn open(&self, name: &str) -> Result<SourceFile, Error> {
        if name == "customerror.proto" {
            return Err(Error::new("failed to load file!"));
        }

        for file in self.files {
            if file.0 == name {
                return Ok(SourceFile::from_source(name, file.1));
            }
        }

        Err(Error::file_not_found(name))
    }
}

fn check_err(files: &'static [(&'static str, &'static str)]) -> serde_json::Value {
    let mut importer = Importer::with_resolver(TestSourceResolver { files });
    let err = importer.add_root_file(files[0].0).unwrap_err();
    error_to_json(&err)
}

fn error_to_json(err: &dyn Diagnostic) -> serde_json::Value {
    let mut json = String::new();
    JSONReportHandler::new()
        .render_report(&mut json, err)
        .unwrap();
    serde_json::from_str(&json).unwrap()
}

#[test]
fn import_not_found() {
    let json = check_err(&[(
        "root.proto",
        "import \"missing.proto\";\nmessage Root { Missing m = 1; }",
    )]);

    assert_eq!(json["message"], "import 'missing.proto' not found");
    assert_eq!(json["filename"], "root.proto");
    assert_eq!(json["labels"][0]["label"], "imported here");
    assert_eq!(json["labels"][0]["span"]["offset"], 0);
    assert_eq!(json["labels"][0]["span"]["length"], 22);
}

#[test]
fn nested_import_not_found() {
    let json = check_err(&[
        (
            "root.proto",
            "import 'dep.proto';\nmessage Root { dep.Dep d = 1; }",
        ),
        (
            "dep.proto",
            "package dep;\nimport public 'gone.proto';\nmessage Other {}",
        ),
    ]);

    assert_eq!(json["message"], "import 'gone.proto' not found");
    assert_eq!(json["filename"], "dep.proto");
    assert_eq!(json["labels"][0]["span"]["offset"], 13);
    assert_eq!(json["labels"][0]["span"]["length"], 26);
}

#[test]
fn import_error() {
    let json = check_err(&[(
        "root.proto",
        "import 'customerror.proto'; message Root { x.Y y = 1; }",
    )]);

    assert_eq!(json["message"], "failed to load file!");
}

#[test]
fn parse_error() {
    let json = check_err(&[("root.proto", "message Foo {\n  int32 = 1;\n}")]);

    assert_eq!(json["message"], "expected an identifier, but found '='");
    assert_eq!(json["filename"], "root.proto");
    assert_eq!(json["labels"][0]["label"], "found here");
    assert_eq!(json["labels"][0]["span"]["offset"], 22);
    assert_eq!(json["labels"][0]["span"]["length"], 1);
}

#[test]
fn parse_error_in_import() {
    let json = check_err(&[
        ("root.proto", "import 'bad.proto'; message Root { Bad b = 1; }"),
        ("bad.proto", "message Bad { string s = 1 }"),
    ]);

    assert_eq!(json["message"], "expected ';', but found '}'");
    assert_eq!(json["filename"], "bad.proto");
}

#[test]
fn tokenize_error() {
    let json = check_err(&[("root.proto", "message Foo \\ {}")]);

    assert_eq!(
        json["message"],
        "backslashes are only allowed inside string literals"
    );
    assert_eq!(json["labels"][0]["span"]["offset"], 12);
}

#[test]
fn file_not_in_import_root() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("present.proto"), "message Present {}").unwrap();

    let mut importer = Importer::new(dir.path());
    let err = importer.add_root_file("missing.proto").unwrap_err();
    let json = error_to_json(&err);

    assert_eq!(json["message"], "file 'missing.proto' is not in the import root");
    assert_eq!(
        json["help"],
        "pass a path relative to the import root, or change the import root"
    );
    assert!(err.is_file_not_found());
}

#[test]
fn unreadable_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("dir.proto")).unwrap();

    let mut importer = Importer::new(dir.path());
    let err = importer.add_root_file("dir.proto").unwrap_err();

    assert!(err.is_io());
    assert_eq!(err.file(), Some("dir.proto"));
}
