use tree_sitter::Node;

use super::{
    clean_doc_comments, field_text, keyword_children, leading_comments, named_children, node_text,
    DeclarationSyntax, Language,
};
use crate::core::model::Qualifier;
use crate::core::modifiers::{BuiltinRule, ModifierSource, RawModifier};
use crate::core::walker::{KindHint, RawDeclaration, RawParameter, ScopeRole};
use crate::error::StructuralError;

const FUNCTION: KindHint = KindHint::new("function", ScopeRole::Callable);
const ARROW: KindHint = KindHint::new("=>", ScopeRole::Callable);
const METHOD: KindHint = KindHint::new("method", ScopeRole::Callable);
const CLASS: KindHint = KindHint::new("class", ScopeRole::Type);

const RULES: &[BuiltinRule] = &[
    BuiltinRule::qualifier(ModifierSource::Keyword, "async", Qualifier::Async),
    BuiltinRule::qualifier(ModifierSource::Keyword, "static", Qualifier::Static),
];

const FUNCTION_VALUES: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

/// JavaScript front end over tree-sitter-javascript
pub struct JavaScriptSyntax;

impl JavaScriptSyntax {
    pub fn new() -> Self {
        Self
    }

    fn function_declaration<'t>(&self, node: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        let name = field_text(node, "name", source)?;
        let mut decl = RawDeclaration::new(FUNCTION, name, node);
        self.callable(&mut decl, node, source);
        decl.doc_comment = self.doc_comment(node, source);
        Some(decl)
    }

    fn class_declaration<'t>(&self, node: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        let name = field_text(node, "name", source)?;
        Some(self.class(name, node, node, source))
    }

    /// `const Cart = class extends Base {...}` takes the binding's name.
    fn bound_class<'t>(&self, declarator: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        let value = declarator.child_by_field_name("value")?;
        let name_node = declarator.child_by_field_name("name")?;
        if value.kind() != "class" || name_node.kind() != "identifier" {
            return None;
        }
        let mut decl = self.class(node_text(name_node, source), declarator, value, source);
        let statement = declarator
            .parent()
            .filter(|parent| matches!(parent.kind(), "lexical_declaration" | "variable_declaration"))
            .unwrap_or(declarator);
        decl.doc_comment = self.doc_comment(statement, source);
        Some(decl)
    }

    fn class<'t>(&self, name: String, outer: Node<'t>, node: Node<'t>, source: &'t str) -> RawDeclaration<'t> {
        let mut decl = RawDeclaration::new(CLASS, name, outer);
        decl.modifiers = self.decorators(node, source);

        // `class A extends B` keeps the heritage expression verbatim
        if let Some(heritage) = named_children(node)
            .into_iter()
            .find(|child| child.kind() == "class_heritage")
        {
            decl.bases = named_children(heritage)
                .into_iter()
                .filter(|base| base.kind() != "comment")
                .map(|base| node_text(base, source))
                .collect();
        }

        decl.doc_comment = self.doc_comment(node, source);
        decl.body = node.child_by_field_name("body");
        decl
    }

    fn method_definition<'t>(&self, node: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        if in_object_literal(node) {
            return None;
        }
        let name = field_text(node, "name", source)?;
        let mut decl = RawDeclaration::new(METHOD, name, node);
        decl.modifiers = keyword_children(node, &["static"])
            .into_iter()
            .map(RawModifier::keyword)
            .collect();
        decl.modifiers.extend(self.decorators(node, source));
        self.callable(&mut decl, node, source);
        decl.doc_comment = self.doc_comment(node, source);
        Some(decl)
    }

    /// `const f = () => ...`, `let g = function () {...}` and class fields
    /// holding a function.
    fn bound_function<'t>(
        &self,
        node: Node<'t>,
        name_field: &str,
        source: &'t str,
    ) -> Option<RawDeclaration<'t>> {
        let value = node.child_by_field_name("value")?;
        if !FUNCTION_VALUES.contains(&value.kind()) {
            return None;
        }
        let name_node = node.child_by_field_name(name_field)?;
        if !matches!(name_node.kind(), "identifier" | "property_identifier" | "private_property_identifier") {
            return None;
        }

        let (hint, role_node) = if node.kind() == "field_definition" {
            (METHOD, node)
        } else if value.kind() == "arrow_function" {
            (ARROW, node)
        } else {
            (FUNCTION, node)
        };

        let mut decl = RawDeclaration::new(hint, node_text(name_node, source), role_node);
        if node.kind() == "field_definition" {
            decl.modifiers = keyword_children(node, &["static"])
                .into_iter()
                .map(RawModifier::keyword)
                .collect();
            decl.modifiers.extend(self.decorators(node, source));
        }
        self.callable(&mut decl, value, source);

        // comments sit above the whole `const` statement
        let statement = node
            .parent()
            .filter(|parent| matches!(parent.kind(), "lexical_declaration" | "variable_declaration"))
            .unwrap_or(node);
        decl.doc_comment = self.doc_comment(statement, source);
        Some(decl)
    }

    /// Shared by every callable form: `async`, parameters and body.
    fn callable<'t>(&self, decl: &mut RawDeclaration<'t>, function: Node<'t>, source: &'t str) {
        let mut keywords: Vec<RawModifier> = keyword_children(function, &["async"])
            .into_iter()
            .map(RawModifier::keyword)
            .collect();
        keywords.append(&mut decl.modifiers);
        decl.modifiers = keywords;

        if let Some(parameters) = function.child_by_field_name("parameters") {
            decl.parameters = self.parameters(parameters, source);
        } else if let Some(parameter) = function.child_by_field_name("parameter") {
            decl.parameters = vec![RawParameter::named(node_text(parameter, source))];
        }
        decl.body = function.child_by_field_name("body");
    }

    fn parameters(&self, node: Node<'_>, source: &str) -> Vec<RawParameter> {
        named_children(node)
            .into_iter()
            .filter(|param| param.kind() != "comment")
            .map(|param| match param.kind() {
                "assignment_pattern" => RawParameter {
                    name: field_text(param, "left", source).unwrap_or_default(),
                    type_annotation: None,
                    default_value: field_text(param, "right", source),
                },
                _ => RawParameter::named(node_text(param, source)),
            })
            .collect()
    }

    fn decorators(&self, node: Node<'_>, source: &str) -> Vec<RawModifier> {
        named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "decorator")
            .map(|decorator| RawModifier::decorator(node_text(decorator, source).trim_start_matches('@').trim()))
            .collect()
    }

    fn doc_comment(&self, node: Node<'_>, source: &str) -> Option<String> {
        // exported declarations carry their comments on the export statement
        let anchor = node
            .parent()
            .filter(|parent| parent.kind() == "export_statement")
            .unwrap_or(node);
        let comments = leading_comments(anchor, &["comment"], &["decorator"], source);
        clean_doc_comments(&comments, "///")
    }
}

impl Default for JavaScriptSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationSyntax for JavaScriptSyntax {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_javascript::LANGUAGE.into()
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
            "function_declaration" | "generator_function_declaration" => {
                self.function_declaration(node, source)
            }
            "class_declaration" | "class" => self.class_declaration(node, source),
            "method_definition" => self.method_definition(node, source),
            "variable_declarator" => self
                .bound_class(node, source)
                .or_else(|| self.bound_function(node, "name", source)),
            "field_definition" => self.bound_function(node, "property", source),
            _ => None,
        };
        Ok(decl)
    }

    fn descend(&self, node: Node<'_>) -> bool {
        // object literal methods are values, not declarations
        if in_object_literal(node) {
            return false;
        }
        !matches!(node.kind(), "comment" | "string" | "template_string" | "regex" | "import_statement")
    }
}

fn in_object_literal(node: Node<'_>) -> bool {
    node.kind() == "method_definition" && node.parent().is_some_and(|parent| parent.kind() == "object")
}
