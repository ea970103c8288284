use tree_sitter::Node;

use super::{
    child_of_kind, clean_doc_comments, field_text, leading_comments, named_children, node_text,
    DeclarationSyntax, Language,
};
use crate::core::model::{Qualifier, Visibility};
use crate::core::modifiers::{BuiltinRule, ModifierSource, RawModifier};
use crate::core::walker::{KindHint, RawDeclaration, RawParameter, ScopeRole};
use crate::error::StructuralError;

const FN: KindHint = KindHint::new("fn", ScopeRole::Callable);
const STRUCT: KindHint = KindHint::new("struct", ScopeRole::Type);
const ENUM: KindHint = KindHint::new("enum", ScopeRole::Type);
const UNION: KindHint = KindHint::new("union", ScopeRole::Type);
const TRAIT: KindHint = KindHint::new("trait", ScopeRole::Type);
const IMPL: KindHint = KindHint::new("impl", ScopeRole::Extension);
const MOD: KindHint = KindHint::new("mod", ScopeRole::Namespace);

const RULES: &[BuiltinRule] = &[
    BuiltinRule::visibility("pub", Visibility::Public),
    BuiltinRule::visibility(r"pub\s*\(\s*(crate|super|in\s+.+)\s*\)", Visibility::Internal),
    BuiltinRule::visibility(r"pub\s*\(\s*self\s*\)", Visibility::Private),
    BuiltinRule::qualifier(ModifierSource::Keyword, "async", Qualifier::Async),
    BuiltinRule::qualifier(ModifierSource::Implicit, "static", Qualifier::Static),
    BuiltinRule::qualifier(ModifierSource::Implicit, "abstract", Qualifier::Abstract),
];

/// Rust front end over tree-sitter-rust
pub struct RustSyntax;

impl RustSyntax {
    pub fn new() -> Self {
        Self
    }

    fn function<'t>(&self, node: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        let name = field_text(node, "name", source)?;
        let mut decl = RawDeclaration::new(FN, name, node);

        decl.modifiers = self.attributes(node, source);
        decl.modifiers.extend(self.visibility(node, source));
        if let Some(qualifiers) = child_of_kind(node, "function_modifiers") {
            let mut cursor = qualifiers.walk();
            let keywords: Vec<_> = qualifiers
                .children(&mut cursor)
                .map(|keyword| RawModifier::keyword(node_text(keyword, source)))
                .collect();
            decl.modifiers.extend(keywords);
        }

        let parameters = node.child_by_field_name("parameters");
        decl.parameters = parameters
            .map(|params| self.parameters(params, source))
            .unwrap_or_default();
        decl.return_type = field_text(node, "return_type", source);
        decl.body = node.child_by_field_name("body");

        // associated items: no receiver means static, no body in a trait means abstract
        if let Some(owner) = self.associated_owner(node) {
            let has_receiver = parameters
                .is_some_and(|params| child_of_kind(params, "self_parameter").is_some());
            if !has_receiver {
                decl.modifiers.push(RawModifier::implicit("static"));
            }
            if owner == "trait_item" && decl.body.is_none() {
                decl.modifiers.push(RawModifier::implicit("abstract"));
            }
        }

        decl.doc_comment = self.doc_comment(node, source);
        Some(decl)
    }

    /// Kind of the `impl` or `trait` item owning `node`, if any.
    fn associated_owner(&self, node: Node<'_>) -> Option<&'static str> {
        let list = node.parent().filter(|parent| parent.kind() == "declaration_list")?;
        match list.parent()?.kind() {
            "impl_item" => Some("impl_item"),
            "trait_item" => Some("trait_item"),
            _ => None,
        }
    }

    fn type_item<'t>(
        &self,
        hint: KindHint,
        node: Node<'t>,
        source: &'t str,
    ) -> Option<RawDeclaration<'t>> {
        let name = field_text(node, "name", source)?;
        let mut decl = RawDeclaration::new(hint, name, node);
        decl.modifiers = self.attributes(node, source);
        decl.modifiers.extend(self.visibility(node, source));

        if let Some(bounds) = node.child_by_field_name("bounds") {
            decl.bases = named_children(bounds)
                .into_iter()
                .filter(|bound| bound.kind() != "lifetime")
                .map(|bound| node_text(bound, source))
                .collect();
        }
        // only traits hold nested declarations
        if hint == TRAIT {
            decl.body = node.child_by_field_name("body");
        }

        decl.doc_comment = self.doc_comment(node, source);
        Some(decl)
    }

    fn impl_item<'t>(&self, node: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        let target = node.child_by_field_name("type")?;
        let mut decl = RawDeclaration::new(IMPL, self.type_name(target, source), node);
        decl.modifiers = self.attributes(node, source);
        if let Some(implemented) = node.child_by_field_name("trait") {
            decl.bases.push(node_text(implemented, source));
        }
        decl.doc_comment = self.doc_comment(node, source);
        decl.body = node.child_by_field_name("body");
        Some(decl)
    }

    /// Bare name of an impl target: `Wrapper<T>` → `Wrapper`, `fmt::Formatter` → `Formatter`.
    fn type_name(&self, node: Node<'_>, source: &str) -> String {
        match node.kind() {
            "generic_type" => node
                .child_by_field_name("type")
                .map(|inner| self.type_name(inner, source))
                .unwrap_or_else(|| node_text(node, source)),
            "scoped_type_identifier" => {
                field_text(node, "name", source).unwrap_or_else(|| node_text(node, source))
            }
            _ => node_text(node, source),
        }
    }

    fn module<'t>(&self, node: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        // `mod name;` lives in another file
        let body = node.child_by_field_name("body")?;
        let name = field_text(node, "name", source)?;
        let mut decl = RawDeclaration::new(MOD, name, node);
        decl.modifiers = self.attributes(node, source);
        decl.modifiers.extend(self.visibility(node, source));
        decl.doc_comment = self.doc_comment(node, source);
        decl.body = Some(body);
        Some(decl)
    }

    fn parameters(&self, node: Node<'_>, source: &str) -> Vec<RawParameter> {
        named_children(node)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "self_parameter" => Some(RawParameter::named(node_text(param, source))),
                "parameter" => Some(RawParameter {
                    name: field_text(param, "pattern", source)?,
                    type_annotation: field_text(param, "type", source),
                    default_value: None,
                }),
                "variadic_parameter" => Some(RawParameter::named("...")),
                _ => None,
            })
            .collect()
    }

    fn visibility(&self, node: Node<'_>, source: &str) -> Option<RawModifier> {
        child_of_kind(node, "visibility_modifier").map(|vis| RawModifier::keyword(node_text(vis, source)))
    }

    /// `#[...]` items stacked directly above the declaration, in source order.
    fn attributes(&self, node: Node<'_>, source: &str) -> Vec<RawModifier> {
        let mut attributes = Vec::new();
        let mut sibling = node.prev_named_sibling();
        while let Some(candidate) = sibling {
            match candidate.kind() {
                "attribute_item" => {
                    let text = child_of_kind(candidate, "attribute")
                        .map(|attr| node_text(attr, source))
                        .unwrap_or_else(|| node_text(candidate, source));
                    attributes.push(RawModifier::attribute(text));
                }
                "line_comment" | "block_comment" => {}
                _ => break,
            }
            sibling = candidate.prev_named_sibling();
        }
        attributes.reverse();
        attributes
    }

    fn doc_comment(&self, node: Node<'_>, source: &str) -> Option<String> {
        let comments = leading_comments(node, &["line_comment", "block_comment"], &["attribute_item"], source);
        clean_doc_comments(&comments, "///")
    }
}

impl Default for RustSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationSyntax for RustSyntax {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_rust::LANGUAGE.into()
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
            "function_item" | "function_signature_item" => self.function(node, source),
            "struct_item" => self.type_item(STRUCT, node, source),
            "enum_item" => self.type_item(ENUM, node, source),
            "union_item" => self.type_item(UNION, node, source),
            "trait_item" => self.type_item(TRAIT, node, source),
            "impl_item" => self.impl_item(node, source),
            "mod_item" => self.module(node, source),
            _ => None,
        };
        Ok(decl)
    }

    fn descend(&self, node: Node<'_>) -> bool {
        !matches!(
            node.kind(),
            "line_comment"
                | "block_comment"
                | "attribute_item"
                | "inner_attribute_item"
                | "use_declaration"
                | "macro_invocation"
                | "macro_definition"
                | "string_literal"
                | "raw_string_literal"
        )
    }
}
