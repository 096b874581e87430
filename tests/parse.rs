//! Parser integration tests.
//!
//! Parses the mojom files under tests/fixtures/ and checks the shape of the
//! resulting syntax trees, plus the positions reported for malformed input.

use std::path::{Path, PathBuf};

use mojom_compiler::cst::{Definition, InterfaceMember, StructMember, TypeExpr};
use mojom_compiler::interner;
use mojom_compiler::{parse, parse_source, tokenize, CompilerError, Token};

// ===== Helpers =====

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn collect_mojom_files(dir: &Path, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_mojom_files(&path, files);
            } else if path.extension().is_some_and(|e| e == "mojom") {
                files.push(path);
            }
        }
    }
}

fn read_fixture(relative: &str) -> String {
    std::fs::read_to_string(fixtures_dir().join(relative)).unwrap()
}

fn parse_error(source: &str) -> String {
    match parse_source(source, "test.mojom") {
        Err(e) => e.to_string(),
        Ok(tree) => panic!("expected a parse error, got {:?}", tree),
    }
}

// ===== Fixtures =====

#[test]
fn parse_all_fixtures() {
    let mut files = Vec::new();
    collect_mojom_files(&fixtures_dir(), &mut files);
    files.sort();
    assert!(!files.is_empty(), "Expected mojom fixture files");

    for path in &files {
        let source = std::fs::read_to_string(path).unwrap();
        let name = path.to_string_lossy();
        parse_source(&source, &name).unwrap_or_else(|e| {
            panic!("Failed to parse {}: {}", path.display(), e);
        });
    }
}

#[test]
fn parse_service_fixture_structure() {
    let tree = parse_source(&read_fixture("sample/service.mojom"), "sample/service.mojom").unwrap();

    let module = tree.module.as_ref().unwrap();
    assert_eq!(module.name.to_dotted(), "sample");
    assert_eq!(module.attributes.len(), 1);
    assert_eq!(interner::name(module.attributes[0].key), "JavaPackage");

    let imports: Vec<&str> = tree.imports.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(imports, vec!["base/types.mojom"]);

    let kinds: Vec<&str> = tree
        .definitions
        .iter()
        .map(|d| match d {
            Definition::Struct(_) => "struct",
            Definition::Union(_) => "union",
            Definition::Enum(_) => "enum",
            Definition::Interface(_) => "interface",
            Definition::Const(_) => "const",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["const", "const", "struct", "union", "interface", "interface"]
    );

    let Definition::Struct(shape) = &tree.definitions[2] else {
        panic!("expected struct Shape");
    };
    assert_eq!(interner::name(shape.name), "Shape");
    assert!(matches!(shape.members[0], StructMember::Enum(_)));
    let fields: Vec<String> = shape
        .members
        .iter()
        .filter_map(|m| match m {
            StructMember::Field(f) => Some(interner::name(f.name)),
            _ => None,
        })
        .collect();
    assert_eq!(fields, vec!["kind", "points", "color", "label", "weights"]);

    let Definition::Union(value) = &tree.definitions[3] else {
        panic!("expected union Value");
    };
    let ordinals: Vec<Option<u32>> = value.fields.iter().map(|f| f.ordinal).collect();
    assert_eq!(ordinals, vec![None, Some(4), None]);

    let Definition::Interface(service) = &tree.definitions[4] else {
        panic!("expected interface Service");
    };
    let methods: Vec<_> = service
        .members
        .iter()
        .filter_map(|m| match m {
            InterfaceMember::Method(m) => Some(m),
            _ => None,
        })
        .collect();
    assert_eq!(methods.len(), 3);
    assert_eq!(methods[0].response.as_ref().map(Vec::len), Some(1));
    assert_eq!(methods[1].ordinal, Some(3));
    assert!(methods[1].response.is_none());
    assert!(matches!(
        methods[2].params[0].ty,
        TypeExpr::InterfaceRequest { .. }
    ));
}

#[test]
fn parse_from_token_stream() {
    let source = read_fixture("sample/base/types.mojom");
    let tokens = tokenize(&source);
    let tree = parse(tokens, "types.mojom").unwrap();
    assert_eq!(tree.definitions.len(), 3);

    let first = tokenize(&source).next().unwrap().unwrap();
    assert_eq!(first.node, Token::Module);
    assert_eq!(first.span.pos.line, 2);
}

// ===== Errors =====

#[test]
fn error_missing_semicolon() {
    insta::assert_snapshot!(
        parse_error("struct Foo {\n  int32 x\n};"),
        @"test.mojom:3:1: error: expected ';', found '}'"
    );
}

#[test]
fn error_lex_failure_points_at_character() {
    let err = parse_source("struct Foo {\n  int32 $x;\n};", "bad.mojom").unwrap_err();
    assert_eq!(err.code(), "LexError");
    assert_eq!(
        err.to_string(),
        "bad.mojom:2:9: error: unexpected character '$'\n    int32 $x;\n          ^"
    );
}

#[test]
fn error_union_default() {
    let err = parse_source("union U {\n  int32 a = 1;\n};", "test.mojom").unwrap_err();
    let CompilerError::Parse(parse) = &err else {
        panic!("expected a parse error, got {:?}", err);
    };
    assert_eq!(parse.line, 2);
    assert!(parse.message.contains("union fields cannot have default values"));
}

#[test]
fn error_import_after_definition() {
    let err = parse_source("struct A {};\nimport \"b.mojom\";", "test.mojom").unwrap_err();
    assert_eq!(err.code(), "ParseError");
    assert!(err.to_string().starts_with("test.mojom:2:"));
}
