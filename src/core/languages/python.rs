use tree_sitter::Node;

use super::{child_of_kind, field_text, keyword_children, named_children, node_text, DeclarationSyntax, Language};
use crate::core::model::Qualifier;
use crate::core::modifiers::{BuiltinRule, ModifierSource, RawModifier};
use crate::core::walker::{KindHint, RawDeclaration, RawParameter, ScopeRole};
use crate::error::StructuralError;

const DEF: KindHint = KindHint::new("def", ScopeRole::Callable);
const ASYNC_DEF: KindHint = KindHint::new("async def", ScopeRole::Callable);
const CLASS: KindHint = KindHint::new("class", ScopeRole::Type);

const RULES: &[BuiltinRule] = &[
    BuiltinRule::qualifier(ModifierSource::Keyword, "async", Qualifier::Async),
    BuiltinRule::qualifier(ModifierSource::Decorator, r"(builtins\.)?staticmethod", Qualifier::Static),
    BuiltinRule::qualifier(ModifierSource::Decorator, r"(builtins\.)?classmethod", Qualifier::ClassLevel),
    BuiltinRule::qualifier(ModifierSource::Decorator, r"(abc\.)?abstractmethod", Qualifier::Abstract),
];

/// Statements that can never contain a `def` or `class`.
const LEAF_STATEMENTS: &[&str] = &[
    "expression_statement",
    "return_statement",
    "import_statement",
    "import_from_statement",
    "future_import_statement",
    "pass_statement",
    "break_statement",
    "continue_statement",
    "assert_statement",
    "raise_statement",
    "delete_statement",
    "global_statement",
    "nonlocal_statement",
    "print_statement",
    "comment",
];

/// Python front end over tree-sitter-python
pub struct PythonSyntax;

impl PythonSyntax {
    pub fn new() -> Self {
        Self
    }

    fn function<'t>(
        &self,
        def: Node<'t>,
        outer: Node<'t>,
        decorators: Vec<String>,
        source: &'t str,
    ) -> Result<Option<RawDeclaration<'t>>, StructuralError> {
        let Some(name) = field_text(def, "name", source) else {
            return Ok(None);
        };

        let keywords = keyword_children(def, &["async"]);
        let hint = if keywords.is_empty() { DEF } else { ASYNC_DEF };

        let mut decl = RawDeclaration::new(hint, name, outer);
        decl.modifiers = keywords.into_iter().map(RawModifier::keyword).collect();
        decl.modifiers.extend(decorators.into_iter().map(RawModifier::decorator));
        if let Some(parameters) = def.child_by_field_name("parameters") {
            decl.parameters = self.parameters(parameters, source);
        }
        decl.return_type = field_text(def, "return_type", source);

        let body = self.suite(def, &decl.name)?;
        decl.doc_comment = self.docstring(body, source);
        decl.body = Some(body);

        Ok(Some(decl))
    }

    fn class<'t>(
        &self,
        def: Node<'t>,
        outer: Node<'t>,
        decorators: Vec<String>,
        source: &'t str,
    ) -> Result<Option<RawDeclaration<'t>>, StructuralError> {
        let Some(name) = field_text(def, "name", source) else {
            return Ok(None);
        };

        let mut decl = RawDeclaration::new(CLASS, name, outer);
        decl.modifiers = decorators.into_iter().map(RawModifier::decorator).collect();

        // keyword arguments such as `metaclass=` and `*`/`**` unpacking are not bases
        if let Some(superclasses) = def.child_by_field_name("superclasses") {
            decl.bases = named_children(superclasses)
                .into_iter()
                .filter(|base| {
                    !matches!(
                        base.kind(),
                        "keyword_argument" | "list_splat" | "dictionary_splat" | "comment"
                    )
                })
                .map(|base| node_text(base, source))
                .collect();
        }

        let body = self.suite(def, &decl.name)?;
        decl.doc_comment = self.docstring(body, source);
        decl.body = Some(body);

        Ok(Some(decl))
    }

    /// The indented body of a `def` or `class`. Python requires at least one
    /// statement there, even though the grammar tolerates an empty block.
    fn suite<'t>(&self, def: Node<'t>, name: &str) -> Result<Node<'t>, StructuralError> {
        if let Some(body) = def.child_by_field_name("body") {
            let has_statement = named_children(body)
                .iter()
                .any(|statement| statement.kind() != "comment");
            if has_statement {
                return Ok(body);
            }
        }

        let header_end = child_of_kind(def, ":").unwrap_or(def);
        Err(StructuralError::new(
            header_end.end_position().into(),
            header_end.end_byte(),
            format!("`{}` has no body", name),
        ))
    }

    fn parameters(&self, node: Node<'_>, source: &str) -> Vec<RawParameter> {
        named_children(node)
            .into_iter()
            .filter_map(|param| {
                let parameter = match param.kind() {
                    "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" | "tuple_pattern" => {
                        RawParameter::named(node_text(param, source))
                    }
                    "typed_parameter" => RawParameter {
                        name: param
                            .named_child(0)
                            .map(|name| node_text(name, source))
                            .unwrap_or_default(),
                        type_annotation: field_text(param, "type", source),
                        default_value: None,
                    },
                    "default_parameter" | "typed_default_parameter" => RawParameter {
                        name: field_text(param, "name", source).unwrap_or_default(),
                        type_annotation: field_text(param, "type", source),
                        default_value: field_text(param, "value", source),
                    },
                    // bare `*` and `/` separators
                    _ => return None,
                };
                Some(parameter)
            })
            .collect()
    }

    /// Leading string literal of a body, cleaned like `inspect.cleandoc`.
    fn docstring(&self, body: Node<'_>, source: &str) -> Option<String> {
        let first = named_children(body)
            .into_iter()
            .find(|statement| statement.kind() != "comment")?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let literal = first.named_child(0)?;
        if literal.kind() != "string" {
            return None;
        }
        clean_docstring(&node_text(literal, source))
    }
}

impl Default for PythonSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationSyntax for PythonSyntax {
    fn language(&self) -> Language {
        Language::Python
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn modifier_rules(&self) -> &'static [BuiltinRule] {
        RULES
    }

    fn declaration<'t>(
        &self,
        node: Node<'t>,
        source: &'t str,
    ) -> Result<Option<RawDeclaration<'t>>, StructuralError> {
        match node.kind() {
            "function_definition" => self.function(node, node, Vec::new(), source),
            "class_definition" => self.class(node, node, Vec::new(), source),
            "decorated_definition" => {
                let Some(definition) = node.child_by_field_name("definition") else {
                    return Ok(None);
                };
                let decorators = named_children(node)
                    .into_iter()
                    .filter(|child| child.kind() == "decorator")
                    .map(|decorator| node_text(decorator, source).trim_start_matches('@').trim().to_string())
                    .collect();

                match definition.kind() {
                    "function_definition" => self.function(definition, node, decorators, source),
                    "class_definition" => self.class(definition, node, decorators, source),
                    _ => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    fn descend(&self, node: Node<'_>) -> bool {
        !LEAF_STATEMENTS.contains(&node.kind())
    }
}

/// Strip prefix and quotes, then drop the common indentation of the
/// continuation lines.
fn clean_docstring(literal: &str) -> Option<String> {
    let unprefixed = literal.trim_start_matches(|c: char| matches!(c, 'r' | 'R' | 'u' | 'U' | 'b' | 'B'));
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|quote| {
            unprefixed
                .strip_prefix(quote)
                .and_then(|rest| rest.strip_suffix(quote))
        })
        .unwrap_or(unprefixed);

    let mut lines = inner.lines();
    let first = lines.next().unwrap_or_default().trim();
    let rest: Vec<&str> = lines.collect();
    let indent = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned = vec![first.to_string()];
    cleaned.extend(
        rest.iter()
            .map(|line| line.get(indent..).unwrap_or("").trim_end().to_string()),
    );

    let text = cleaned.join("\n").trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
