use std::collections::BTreeSet;

use syntax_outline::config::ParsingConfig;
use syntax_outline::core::{DeclarationKind, Language, Outline, OutlineParser, Position, Qualifier};
use syntax_outline::OutlineError;

const SAMPLE: &str = include_str!("fixtures/python/sample.py");

fn parser() -> OutlineParser {
    OutlineParser::new(&ParsingConfig::default()).unwrap()
}

fn sample() -> Outline {
    parser().parse_named(Language::Python, "sample", SAMPLE).unwrap()
}

#[test]
fn test_every_fixture_form_yields_one_declaration() {
    let outline = sample();
    let expected = [
        ("basic_function", DeclarationKind::Function),
        ("parameterized_function", DeclarationKind::Function),
        ("TestClass", DeclarationKind::Class),
        ("TestClass.__init__", DeclarationKind::Method),
        ("TestClass.instance_method", DeclarationKind::Method),
        ("TestClass.class_method", DeclarationKind::Method),
        ("TestClass.static_method", DeclarationKind::Method),
        ("async_function", DeclarationKind::Function),
        ("decorator", DeclarationKind::Function),
        ("decorator.wrapper", DeclarationKind::Function),
        ("decorated_function", DeclarationKind::Function),
        ("ChildClass", DeclarationKind::Class),
        ("ChildClass.child_method", DeclarationKind::Method),
    ];

    assert_eq!(outline.len(), expected.len() + 1);
    for (path, kind) in expected {
        let decl = outline.find(path).unwrap_or_else(|| panic!("missing {}", path));
        assert_eq!(decl.kind, kind, "{}", path);
    }
}

#[test]
fn test_typed_and_defaulted_parameters() {
    let outline = sample();
    let func = outline.find("parameterized_function").unwrap();
    assert_eq!(func.parameters.len(), 2);
    assert_eq!(func.parameters[0].name, "a");
    assert_eq!(func.parameters[0].type_annotation.as_deref(), Some("int"));
    assert!(!func.parameters[0].default_value_present);
    assert_eq!(func.parameters[1].type_annotation.as_deref(), Some("str"));
    assert!(func.parameters[1].default_value_present);
    assert_eq!(func.return_type.as_deref(), Some("str"));
}

#[test]
fn test_qualifiers_across_the_fixture() {
    let outline = sample();
    let qualifiers = |path: &str| outline.find(path).unwrap().qualifiers.clone();

    assert_eq!(qualifiers("TestClass.class_method"), BTreeSet::from([Qualifier::ClassLevel]));
    assert_eq!(qualifiers("TestClass.static_method"), BTreeSet::from([Qualifier::Static]));
    assert_eq!(qualifiers("async_function"), BTreeSet::from([Qualifier::Async]));
    assert_eq!(qualifiers("decorated_function"), BTreeSet::from([Qualifier::Decorated]));
    assert!(qualifiers("TestClass.__init__").is_empty());
    assert!(qualifiers("basic_function").is_empty());

    // decoration changes neither kind nor name
    let decorated = outline.find("decorated_function").unwrap();
    assert_eq!(decorated.kind, DeclarationKind::Function);
    assert_eq!(decorated.decorators, vec!["decorator"]);
}

#[test]
fn test_inheritance_is_recorded_by_name() {
    let outline = sample();
    assert_eq!(outline.find("ChildClass").unwrap().bases, vec!["TestClass"]);
    assert!(outline.find("TestClass").unwrap().bases.is_empty());
}

#[test]
fn test_locations_are_zero_based() {
    let outline = sample();
    let basic = outline.find("basic_function").unwrap();
    assert_eq!(basic.location.start, Position::new(1, 0));

    let init = outline.find("TestClass.__init__").unwrap();
    assert_eq!(init.location.start, Position::new(12, 4));

    // decorators belong to the declaration they decorate
    let class_method = outline.find("TestClass.class_method").unwrap();
    assert_eq!(class_method.location.start, Position::new(19, 4));
}

#[test]
fn test_spans_cover_their_declarations() {
    let outline = sample();
    for decl in outline.iter().skip(1) {
        let text = decl.location.slice(SAMPLE).unwrap();
        assert!(text.contains(&decl.name), "{} span lacks its name", decl.path());
        let keyword = match decl.kind {
            DeclarationKind::Class => "class",
            _ => "def",
        };
        assert!(text.contains(keyword), "{} span lacks `{}`", decl.path(), keyword);
    }
}

#[test]
fn test_docstrings_propagate() {
    let outline = sample();
    assert_eq!(
        outline.find("TestClass").unwrap().doc_comment.as_deref(),
        Some("Test class docstring")
    );
    assert_eq!(
        outline.find("TestClass.instance_method").unwrap().doc_comment.as_deref(),
        Some("Instance method docstring")
    );
    assert!(outline.find("basic_function").unwrap().doc_comment.is_none());
}

#[test]
fn test_json_round_trip() {
    let outline = sample();
    let json = serde_json::to_string(&outline).unwrap();
    let restored: Outline = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, outline);
}

#[test]
fn test_malformed_input_is_a_structural_error() {
    let truncated = &SAMPLE[..SAMPLE.find("(TestClass)").unwrap() + 4];
    let error = parser().parse(Language::Python, truncated).unwrap_err();
    let OutlineError::Structural(error) = error else {
        panic!("expected a structural error, got {}", error);
    };
    assert!(error.location.line >= 41);
    assert!(error.byte <= truncated.len());
}

#[test]
fn test_scenario_blocks_in_isolation() {
    let parser = parser();

    let start = SAMPLE.find("class TestClass").unwrap();
    let end = SAMPLE.find("# Async function").unwrap();
    let outline = parser.parse(Language::Python, &SAMPLE[start..end]).unwrap();
    let class = outline.find("TestClass").unwrap();
    let methods: Vec<_> = outline.children(class.id).map(|m| m.name.as_str()).collect();
    assert_eq!(methods, vec!["__init__", "instance_method", "class_method", "static_method"]);

    let outline = parser
        .parse(Language::Python, "@decorator\ndef decorated_function(): pass\n")
        .unwrap();
    let decorated = outline.find("decorated_function").unwrap();
    assert_eq!(decorated.qualifiers, BTreeSet::from([Qualifier::Decorated]));
    assert_eq!(decorated.decorators, vec!["decorator"]);

    let start = SAMPLE.find("class ChildClass").unwrap();
    let outline = parser.parse(Language::Python, &SAMPLE[start..]).unwrap();
    assert_eq!(outline.find("ChildClass").unwrap().bases, vec!["TestClass"]);
}
