use tree_sitter::Node;

use super::{
    child_of_kind, clean_doc_comments, field_text, leading_comments, named_children, node_text,
    DeclarationSyntax, Language,
};
use crate::core::model::{Qualifier, Visibility};
use crate::core::modifiers::{BuiltinRule, ModifierSource, RawModifier};
use crate::core::walker::{KindHint, RawDeclaration, RawParameter, ScopeRole};
use crate::error::StructuralError;

const CLASS: KindHint = KindHint::new("class", ScopeRole::Type);
const INTERFACE: KindHint = KindHint::new("interface", ScopeRole::Type);
const ENUM: KindHint = KindHint::new("enum", ScopeRole::Type);
const RECORD: KindHint = KindHint::new("record", ScopeRole::Type);
const METHOD: KindHint = KindHint::new("method", ScopeRole::Callable);
const CONSTRUCTOR: KindHint = KindHint::new("constructor", ScopeRole::Callable);

const RULES: &[BuiltinRule] = &[
    BuiltinRule::visibility("public", Visibility::Public),
    BuiltinRule::visibility("protected", Visibility::Protected),
    BuiltinRule::visibility("private", Visibility::Private),
    BuiltinRule::qualifier(ModifierSource::Keyword, "static", Qualifier::Static),
    BuiltinRule::qualifier(ModifierSource::Keyword, "abstract", Qualifier::Abstract),
    BuiltinRule::qualifier(ModifierSource::Implicit, "abstract", Qualifier::Abstract),
];

/// Java front end over tree-sitter-java
pub struct JavaSyntax;

impl JavaSyntax {
    pub fn new() -> Self {
        Self
    }

    fn type_declaration<'t>(
        &self,
        hint: KindHint,
        node: Node<'t>,
        source: &'t str,
    ) -> Option<RawDeclaration<'t>> {
        let name = field_text(node, "name", source)?;
        let mut decl = RawDeclaration::new(hint, name, node);
        decl.modifiers = self.modifiers(node, source);

        if let Some(superclass) = node.child_by_field_name("superclass") {
            decl.bases.extend(named_children(superclass).into_iter().map(|t| node_text(t, source)));
        }
        // `implements` on classes, `extends` on interfaces
        let interfaces = node
            .child_by_field_name("interfaces")
            .or_else(|| child_of_kind(node, "extends_interfaces"));
        if let Some(list) = interfaces.and_then(|i| child_of_kind(i, "type_list")) {
            decl.bases.extend(named_children(list).into_iter().map(|t| node_text(t, source)));
        }

        decl.doc_comment = self.javadoc(node, source);
        decl.body = node.child_by_field_name("body");
        Some(decl)
    }

    fn method<'t>(
        &self,
        hint: KindHint,
        node: Node<'t>,
        source: &'t str,
    ) -> Option<RawDeclaration<'t>> {
        let name = field_text(node, "name", source)?;
        let mut decl = RawDeclaration::new(hint, name, node);
        decl.modifiers = self.modifiers(node, source);
        decl.return_type = field_text(node, "type", source);
        decl.parameters = node
            .child_by_field_name("parameters")
            .map(|params| self.parameters(params, source))
            .unwrap_or_default();
        decl.body = node.child_by_field_name("body");

        // interface methods without a body, unless `default` or `static`
        let in_interface = node
            .parent()
            .is_some_and(|parent| parent.kind() == "interface_body");
        let concrete = decl
            .modifiers
            .iter()
            .any(|m| m.source == ModifierSource::Keyword && matches!(m.text.as_str(), "default" | "static" | "abstract"));
        if in_interface && decl.body.is_none() && !concrete {
            decl.modifiers.push(RawModifier::implicit("abstract"));
        }

        decl.doc_comment = self.javadoc(node, source);
        Some(decl)
    }

    /// Annotations and keywords from the `modifiers` child, in source order.
    fn modifiers(&self, node: Node<'_>, source: &str) -> Vec<RawModifier> {
        let Some(modifiers) = child_of_kind(node, "modifiers") else {
            return Vec::new();
        };

        let mut cursor = modifiers.walk();
        let found = modifiers
            .children(&mut cursor)
            .filter_map(|child| match child.kind() {
                "marker_annotation" | "annotation" => Some(RawModifier::annotation(
                    node_text(child, source).trim_start_matches('@').trim(),
                )),
                "line_comment" | "block_comment" => None,
                _ if !child.is_named() => Some(RawModifier::keyword(node_text(child, source))),
                _ => None,
            })
            .collect();
        found
    }

    fn parameters(&self, node: Node<'_>, source: &str) -> Vec<RawParameter> {
        named_children(node)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "formal_parameter" => Some(RawParameter {
                    name: field_text(param, "name", source)?,
                    type_annotation: field_text(param, "type", source),
                    default_value: None,
                }),
                "spread_parameter" => {
                    let children = named_children(param);
                    let declarator = children.iter().find(|c| c.kind() == "variable_declarator")?;
                    let type_annotation = children
                        .iter()
                        .find(|c| !matches!(c.kind(), "modifiers" | "variable_declarator"))
                        .map(|t| format!("{}...", node_text(*t, source)));
                    Some(RawParameter {
                        name: field_text(*declarator, "name", source)
                            .unwrap_or_else(|| node_text(*declarator, source)),
                        type_annotation,
                        default_value: None,
                    })
                }
                _ => None,
            })
            .collect()
    }

    fn javadoc(&self, node: Node<'_>, source: &str) -> Option<String> {
        let comments: Vec<String> = leading_comments(node, &["block_comment", "line_comment"], &[], source)
            .into_iter()
            .filter(|comment| comment.starts_with("/**"))
            .collect();
        clean_doc_comments(&comments, "///")
    }
}

impl Default for JavaSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationSyntax for JavaSyntax {
    fn language(&self) -> Language {
        Language::Java
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_java::LANGUAGE.into()
    }

    fn modifier_rules(&self) -> &'static [BuiltinRule] {
        RULES
    }

    fn declaration<'t>(
        &self,
        node: Node<'t>,
        source: &'t str,
    ) -> Result<Option<RawDeclaration<'t>>, StructuralError> {
        let decl = match node.kind() {
            "class_declaration" => self.type_declaration(CLASS, node, source),
            "interface_declaration" => self.type_declaration(INTERFACE, node, source),
            "enum_declaration" => self.type_declaration(ENUM, node, source),
            "record_declaration" => self.type_declaration(RECORD, node, source),
            "method_declaration" => self.method(METHOD, node, source),
            "constructor_declaration" => self.method(CONSTRUCTOR, node, source),
            _ => None,
        };
        Ok(decl)
    }

    fn descend(&self, node: Node<'_>) -> bool {
        !matches!(
            node.kind(),
            "line_comment" | "block_comment" | "import_declaration" | "package_declaration" | "modifiers"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frontend::FrontEnd;
    use crate::core::walker::{DeclarationWalker, WalkEvent};

    fn declarations(source: &str) -> Vec<RawDeclaration<'static>> {
        let syntax = JavaSyntax::new();
        let tree = FrontEnd::new(&syntax).unwrap().parse(source).unwrap();
        DeclarationWalker::new(&syntax, &tree)
            .filter_map(|event| match event.unwrap() {
                WalkEvent::Enter(decl) => Some(detach(decl)),
                WalkEvent::Leave => None,
            })
            .collect()
    }

    /// Drop the body node so declarations outlive the tree.
    fn detach(decl: RawDeclaration<'_>) -> RawDeclaration<'static> {
        RawDeclaration {
            kind_hint: decl.kind_hint,
            name: decl.name,
            span: decl.span,
            parameters: decl.parameters,
            return_type: decl.return_type,
            modifiers: decl.modifiers,
            bases: decl.bases,
            doc_comment: decl.doc_comment,
            body: None,
        }
    }

    #[test]
    fn test_class_with_bases_and_members() {
        let source = r#"
/** Repository of users. */
public class UserRepository extends BaseRepository implements Closeable, Iterable<User> {
    public UserRepository(String url) {}

    @Override
    public static List<User> findAll(int limit, String... tags) { return null; }
}
"#;
        let found = declarations(source);
        let names: Vec<_> = found.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["UserRepository", "UserRepository", "findAll"]);

        let class = &found[0];
        assert_eq!(class.bases, vec!["BaseRepository", "Closeable", "Iterable<User>"]);
        assert_eq!(class.doc_comment.as_deref(), Some("Repository of users."));
        assert_eq!(class.modifiers, vec![RawModifier::keyword("public")]);

        assert_eq!(found[1].kind_hint.token, "constructor");

        let find_all = &found[2];
        assert_eq!(
            find_all.modifiers,
            vec![
                RawModifier::annotation("Override"),
                RawModifier::keyword("public"),
                RawModifier::keyword("static"),
            ]
        );
        assert_eq!(find_all.return_type.as_deref(), Some("List<User>"));
        assert_eq!(find_all.parameters.len(), 2);
        assert_eq!(find_all.parameters[0].type_annotation.as_deref(), Some("int"));
        assert_eq!(find_all.parameters[1].name, "tags");
    }

    #[test]
    fn test_interface_methods_are_implicitly_abstract() {
        let source = "interface Shape extends Comparable<Shape> {\n    double area();\n    default String label() { return \"shape\"; }\n}\n";
        let found = declarations(source);
        assert_eq!(found[0].bases, vec!["Comparable<Shape>"]);
        assert_eq!(found[1].modifiers, vec![RawModifier::implicit("abstract")]);
        assert_eq!(found[2].modifiers, vec![RawModifier::keyword("default")]);
    }
}
