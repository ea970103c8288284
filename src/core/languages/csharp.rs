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
const STRUCT: KindHint = KindHint::new("struct", ScopeRole::Type);
const INTERFACE: KindHint = KindHint::new("interface", ScopeRole::Type);
const RECORD: KindHint = KindHint::new("record", ScopeRole::Type);
const ENUM: KindHint = KindHint::new("enum", ScopeRole::Type);
const METHOD: KindHint = KindHint::new("method", ScopeRole::Callable);
const CONSTRUCTOR: KindHint = KindHint::new("constructor", ScopeRole::Callable);
const LOCAL_FUNCTION: KindHint = KindHint::new("local function", ScopeRole::Callable);
const NAMESPACE: KindHint = KindHint::new("namespace", ScopeRole::Namespace);

const RULES: &[BuiltinRule] = &[
    BuiltinRule::visibility("public", Visibility::Public),
    BuiltinRule::visibility("protected", Visibility::Protected),
    BuiltinRule::visibility("private", Visibility::Private),
    BuiltinRule::visibility("internal", Visibility::Internal),
    BuiltinRule::qualifier(ModifierSource::Keyword, "async", Qualifier::Async),
    BuiltinRule::qualifier(ModifierSource::Keyword, "static", Qualifier::Static),
    BuiltinRule::qualifier(ModifierSource::Keyword, "abstract", Qualifier::Abstract),
    BuiltinRule::qualifier(ModifierSource::Implicit, "abstract", Qualifier::Abstract),
];

/// C# front end over tree-sitter-c-sharp
pub struct CSharpSyntax;

impl CSharpSyntax {
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

        if let Some(bases) = child_of_kind(node, "base_list") {
            decl.bases = named_children(bases)
                .into_iter()
                .filter(|base| base.kind() != "comment")
                .map(|base| node_text(base, source))
                .collect();
        }
        // positional records: `record Point(int X, int Y);`
        if let Some(parameters) = child_of_kind(node, "parameter_list") {
            decl.parameters = self.parameters(parameters, source);
        }

        decl.doc_comment = self.doc_comment(node, source);
        if hint != ENUM {
            decl.body = node.child_by_field_name("body");
        }
        Some(decl)
    }

    fn callable<'t>(
        &self,
        hint: KindHint,
        node: Node<'t>,
        source: &'t str,
    ) -> Option<RawDeclaration<'t>> {
        let name = field_text(node, "name", source)?;
        let mut decl = RawDeclaration::new(hint, name, node);
        decl.modifiers = self.modifiers(node, source);
        decl.return_type = field_text(node, "returns", source).or_else(|| field_text(node, "type", source));
        decl.parameters = node
            .child_by_field_name("parameters")
            .map(|params| self.parameters(params, source))
            .unwrap_or_default();
        decl.body = node.child_by_field_name("body");

        let in_interface = node
            .parent()
            .and_then(|list| list.parent())
            .is_some_and(|owner| owner.kind() == "interface_declaration");
        if in_interface && decl.body.is_none() {
            decl.modifiers.push(RawModifier::implicit("abstract"));
        }

        decl.doc_comment = self.doc_comment(node, source);
        Some(decl)
    }

    fn namespace<'t>(&self, node: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        let name = field_text(node, "name", source)?;
        let mut decl = RawDeclaration::new(NAMESPACE, name, node);
        decl.doc_comment = self.doc_comment(node, source);
        decl.body = node.child_by_field_name("body");
        Some(decl)
    }

    /// `[Attr]` lists first, then keyword modifiers, both in source order.
    fn modifiers(&self, node: Node<'_>, source: &str) -> Vec<RawModifier> {
        let mut attributes = Vec::new();
        let mut keywords = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "attribute_list" => attributes.extend(
                    named_children(child)
                        .into_iter()
                        .filter(|attr| attr.kind() == "attribute")
                        .map(|attr| RawModifier::attribute(node_text(attr, source))),
                ),
                "modifier" => keywords.push(RawModifier::keyword(node_text(child, source))),
                _ => {}
            }
        }
        attributes.extend(keywords);
        attributes
    }

    fn parameters(&self, node: Node<'_>, source: &str) -> Vec<RawParameter> {
        named_children(node)
            .into_iter()
            .filter(|param| matches!(param.kind(), "parameter" | "parameter_array"))
            .filter_map(|param| {
                Some(RawParameter {
                    name: field_text(param, "name", source)?,
                    type_annotation: field_text(param, "type", source),
                    default_value: self.default_value(param, source),
                })
            })
            .collect()
    }

    /// `= value` either wrapped in an `equals_value_clause` or inline after `=`.
    fn default_value(&self, param: Node<'_>, source: &str) -> Option<String> {
        if let Some(clause) = child_of_kind(param, "equals_value_clause") {
            return named_children(clause).first().map(|value| node_text(*value, source));
        }
        let equals = child_of_kind(param, "=")?;
        equals.next_named_sibling().map(|value| node_text(value, source))
    }

    fn doc_comment(&self, node: Node<'_>, source: &str) -> Option<String> {
        let comments = leading_comments(node, &["comment"], &[], source);
        clean_doc_comments(&comments, "///")
    }
}

impl Default for CSharpSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationSyntax for CSharpSyntax {
    fn language(&self) -> Language {
        Language::CSharp
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_c_sharp::LANGUAGE.into()
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
            "struct_declaration" => self.type_declaration(STRUCT, node, source),
            "interface_declaration" => self.type_declaration(INTERFACE, node, source),
            "record_declaration" | "record_struct_declaration" => {
                self.type_declaration(RECORD, node, source)
            }
            "enum_declaration" => self.type_declaration(ENUM, node, source),
            "method_declaration" => self.callable(METHOD, node, source),
            "constructor_declaration" => self.callable(CONSTRUCTOR, node, source),
            "local_function_statement" => self.callable(LOCAL_FUNCTION, node, source),
            "namespace_declaration" => self.namespace(node, source),
            _ => None,
        };
        Ok(decl)
    }

    fn descend(&self, node: Node<'_>) -> bool {
        !matches!(
            node.kind(),
            "comment" | "using_directive" | "attribute_list" | "string_literal" | "verbatim_string_literal"
        )
    }
}
