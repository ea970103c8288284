use std::path::PathBuf;

use assert_fs::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use syntax_outline::core::{DeclarationKind, Divergence, Harness, Outline, Qualifier};
use syntax_outline::OutlineError;

fn fixture(language: &str, file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(language)
        .join(file)
}

/// Structural invariants every outline must satisfy.
fn assert_invariants(outline: &Outline) {
    let mut paths = std::collections::HashSet::new();

    for decl in outline.iter().skip(1) {
        assert_eq!(decl.qualified_path, outline.derive_path(decl.id), "{}", decl.path());
        assert!(paths.insert(decl.path()), "duplicate path {}", decl.path());

        let parent = outline.parent(decl.id).expect("non-root declarations have a parent");
        assert!(parent.id < decl.id, "parent of {} comes later in the arena", decl.path());
        match decl.kind {
            DeclarationKind::Method => assert!(matches!(
                parent.kind,
                DeclarationKind::Class | DeclarationKind::Method
            )),
            DeclarationKind::Function => assert!(matches!(
                parent.kind,
                DeclarationKind::Module | DeclarationKind::Function
            )),
            _ => {}
        }
        if decl.kind != DeclarationKind::Class {
            assert!(decl.bases.is_empty(), "{} has bases", decl.path());
        }
        assert!(!(decl.has(Qualifier::Static) && decl.has(Qualifier::ClassLevel)));
        assert_eq!(decl.has(Qualifier::Decorated), !decl.decorators.is_empty());
    }
}

#[rstest]
#[case::python("python", "sample.py")]
#[case::javascript("javascript", "sample.js")]
#[case::java("java", "sample.java")]
#[case::rust("rust", "sample.rs")]
#[case::csharp("csharp", "sample.cs")]
#[case::typescript("typescript", "sample.ts")]
fn test_fixture_conforms_to_golden(#[case] language: &str, #[case] sample: &str) {
    let harness = Harness::with_defaults().unwrap();
    let outline = harness
        .check_fixture(fixture(language, sample), fixture(language, "expected_outline.toml"))
        .unwrap_or_else(|e| panic!("{} fixture: {}", language, e));

    assert_eq!(outline.language().name(), language);
    assert_invariants(&outline);
}

#[rstest]
#[case::python("python", "sample.py")]
#[case::rust("rust", "sample.rs")]
fn test_fixture_is_idempotent(#[case] language: &str, #[case] sample: &str) {
    let harness = Harness::with_defaults().unwrap();
    let golden = fixture(language, "expected_outline.toml");
    let first = harness.check_fixture(fixture(language, sample), &golden).unwrap();
    let second = harness.check_fixture(fixture(language, sample), &golden).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_json_golden_fixture_pair() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("shapes.py")
        .write_str("class Shape:\n    @staticmethod\n    def unit():\n        pass\n")
        .unwrap();
    temp.child("expected.json")
        .write_str(
            r#"{
                "kind": "module",
                "name": "shapes",
                "children": [
                    {
                        "kind": "class",
                        "name": "Shape",
                        "children": [
                            {"kind": "method", "name": "unit", "qualifiers": ["static"]}
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();

    let harness = Harness::with_defaults().unwrap();
    let outline = harness
        .check_fixture(temp.child("shapes.py").path(), temp.child("expected.json").path())
        .unwrap();
    assert_eq!(outline.root().name, "shapes");
}

#[test]
fn test_mismatch_names_first_divergence() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("sample.py")
        .write_str("class Child(Base):\n    def run(self):\n        pass\n")
        .unwrap();
    temp.child("expected_outline.toml")
        .write_str(
            "[[children]]\nkind = \"class\"\nname = \"Child\"\nbases = [\"Parent\"]\n\n[[children.children]]\nkind = \"method\"\nname = \"run\"\nqualifiers = [\"async\"]\n",
        )
        .unwrap();

    let harness = Harness::with_defaults().unwrap();
    let error = harness
        .check_fixture(
            temp.child("sample.py").path(),
            temp.child("expected_outline.toml").path(),
        )
        .unwrap_err();

    let OutlineError::Conformance(mismatch) = &error else {
        panic!("expected a conformance mismatch, got {}", error);
    };
    assert_eq!(mismatch.divergence, Divergence::WrongBases);
    assert_eq!(mismatch.path, "Child");

    let message = error.to_string();
    assert!(predicate::str::contains("wrong bases").eval(&message));
    assert!(predicate::str::contains("[Parent]").and(predicate::str::contains("[Base]")).eval(&message));
}

#[test]
fn test_malformed_golden_is_reported() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("sample.py").write_str("def f():\n    pass\n").unwrap();
    temp.child("expected_outline.toml").write_str("kind = \"widget\"\n").unwrap();

    let harness = Harness::with_defaults().unwrap();
    let error = harness
        .check_fixture(
            temp.child("sample.py").path(),
            temp.child("expected_outline.toml").path(),
        )
        .unwrap_err();
    assert!(matches!(error, OutlineError::Golden(_)));

    temp.child("expected_outline.toml")
        .assert(predicate::str::contains("widget"));
}
