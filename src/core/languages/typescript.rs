use tree_sitter::Node;

use super::{
    child_of_kind, clean_doc_comments, field_text, keyword_children, leading_comments, named_children,
    node_text, DeclarationSyntax, Language,
};
use crate::core::model::{Qualifier, Visibility};
use crate::core::modifiers::{BuiltinRule, ModifierSource, RawModifier};
use crate::core::walker::{KindHint, RawDeclaration, RawParameter, ScopeRole};
use crate::error::StructuralError;

const FUNCTION: KindHint = KindHint::new("function", ScopeRole::Callable);
const ARROW: KindHint = KindHint::new("=>", ScopeRole::Callable);
const METHOD: KindHint = KindHint::new("method", ScopeRole::Callable);
const CLASS: KindHint = KindHint::new("class", ScopeRole::Type);
const INTERFACE: KindHint = KindHint::new("interface", ScopeRole::Type);
const ENUM: KindHint = KindHint::new("enum", ScopeRole::Type);
const NAMESPACE: KindHint = KindHint::new("namespace", ScopeRole::Namespace);

const RULES: &[BuiltinRule] = &[
    BuiltinRule::visibility("public", Visibility::Public),
    BuiltinRule::visibility("protected", Visibility::Protected),
    BuiltinRule::visibility("private", Visibility::Private),
    BuiltinRule::qualifier(ModifierSource::Keyword, "async", Qualifier::Async),
    BuiltinRule::qualifier(ModifierSource::Keyword, "static", Qualifier::Static),
    BuiltinRule::qualifier(ModifierSource::Keyword, "abstract", Qualifier::Abstract),
    BuiltinRule::qualifier(ModifierSource::Implicit, "abstract", Qualifier::Abstract),
];

const FUNCTION_VALUES: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

/// TypeScript front end over tree-sitter-typescript.
///
/// The `.ts` and `.tsx` dialects share node kinds and differ only in the
/// grammar table, so one front end serves both.
pub struct TypeScriptSyntax {
    tsx: bool,
}

impl TypeScriptSyntax {
    pub fn new() -> Self {
        Self { tsx: false }
    }

    /// Front end for `.tsx` files with JSX enabled.
    pub fn tsx() -> Self {
        Self { tsx: true }
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

    /// `const Store = class implements Repo {...}` takes the binding's name.
    fn bound_class<'t>(&self, declarator: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        let value = declarator.child_by_field_name("value")?;
        let name_node = declarator.child_by_field_name("name")?;
        if value.kind() != "class" || name_node.kind() != "identifier" {
            return None;
        }
        let mut decl = self.class(node_text(name_node, source), declarator, value, source);
        decl.doc_comment = self.doc_comment(statement_of(declarator), source);
        Some(decl)
    }

    fn class<'t>(&self, name: String, outer: Node<'t>, node: Node<'t>, source: &'t str) -> RawDeclaration<'t> {
        let mut decl = RawDeclaration::new(CLASS, name, outer);
        decl.modifiers = self.decorators(node, source);
        // `abstract class` carries the keyword on the declaration itself
        decl.modifiers.extend(
            keyword_children(node, &["abstract"])
                .into_iter()
                .map(RawModifier::keyword),
        );

        if let Some(heritage) = child_of_kind(node, "class_heritage") {
            for clause in named_children(heritage) {
                match clause.kind() {
                    // `extends Base<T>` names a value; its type arguments are dropped
                    "extends_clause" => decl.bases.extend(
                        named_children(clause)
                            .into_iter()
                            .filter(|base| !matches!(base.kind(), "type_arguments" | "comment"))
                            .map(|base| node_text(base, source)),
                    ),
                    "implements_clause" => decl.bases.extend(
                        named_children(clause)
                            .into_iter()
                            .filter(|base| base.kind() != "comment")
                            .map(|base| type_name(base, source)),
                    ),
                    _ => {}
                }
            }
        }

        decl.doc_comment = self.doc_comment(node, source);
        decl.body = node.child_by_field_name("body");
        decl
    }

    fn interface_declaration<'t>(&self, node: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        let name = field_text(node, "name", source)?;
        let mut decl = RawDeclaration::new(INTERFACE, name, node);
        if let Some(extends) = child_of_kind(node, "extends_type_clause") {
            decl.bases = named_children(extends)
                .into_iter()
                .filter(|base| base.kind() != "comment")
                .map(|base| type_name(base, source))
                .collect();
        }
        decl.doc_comment = self.doc_comment(node, source);
        decl.body = node.child_by_field_name("body");
        Some(decl)
    }

    fn enum_declaration<'t>(&self, node: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        let name = field_text(node, "name", source)?;
        let mut decl = RawDeclaration::new(ENUM, name, node);
        decl.doc_comment = self.doc_comment(node, source);
        Some(decl)
    }

    /// `namespace A.B {}` and `module "name" {}`; dotted names nest later.
    fn namespace<'t>(&self, node: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        let name = field_text(node, "name", source)?;
        let name = name.trim_matches(|c| c == '"' || c == '\'').to_string();
        let mut decl = RawDeclaration::new(NAMESPACE, name, node);
        decl.doc_comment = self.doc_comment(node, source);
        decl.body = node.child_by_field_name("body");
        Some(decl)
    }

    /// Class methods, abstract method signatures and interface members.
    fn method<'t>(&self, node: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        if in_object_literal(node) {
            return None;
        }
        // overload signatures in a class body precede the implementation
        let in_interface = in_interface_body(node);
        if node.kind() == "method_signature" && !in_interface {
            return None;
        }

        let name = field_text(node, "name", source)?;
        let mut decl = RawDeclaration::new(METHOD, name, node);
        decl.modifiers = self.member_modifiers(node, source);
        self.callable(&mut decl, node, source);
        if in_interface {
            decl.modifiers.push(RawModifier::implicit("abstract"));
        }
        decl.doc_comment = self.doc_comment(node, source);
        Some(decl)
    }

    /// `const f = () => ...`, `let g = function () {...}` and class fields
    /// holding a function.
    fn bound_function<'t>(&self, node: Node<'t>, source: &'t str) -> Option<RawDeclaration<'t>> {
        let value = node.child_by_field_name("value")?;
        if !FUNCTION_VALUES.contains(&value.kind()) {
            return None;
        }
        let name_node = node.child_by_field_name("name")?;
        if !matches!(name_node.kind(), "identifier" | "property_identifier" | "private_property_identifier") {
            return None;
        }

        let field = node.kind() == "public_field_definition";
        let hint = if field {
            METHOD
        } else if value.kind() == "arrow_function" {
            ARROW
        } else {
            FUNCTION
        };

        let mut decl = RawDeclaration::new(hint, node_text(name_node, source), node);
        if field {
            decl.modifiers = self.member_modifiers(node, source);
        }
        self.callable(&mut decl, value, source);
        decl.doc_comment = self.doc_comment(statement_of(node), source);
        Some(decl)
    }

    /// Decorators, then accessibility and keyword modifiers of a class member.
    fn member_modifiers(&self, node: Node<'_>, source: &str) -> Vec<RawModifier> {
        let mut modifiers = self.decorators(node, source);
        if let Some(accessibility) = child_of_kind(node, "accessibility_modifier") {
            modifiers.push(RawModifier::keyword(node_text(accessibility, source)));
        }
        modifiers.extend(
            keyword_children(node, &["static", "abstract"])
                .into_iter()
                .map(RawModifier::keyword),
        );
        modifiers
    }

    /// Shared by every callable form: `async`, typed parameters, return
    /// type and body.
    fn callable<'t>(&self, decl: &mut RawDeclaration<'t>, function: Node<'t>, source: &'t str) {
        decl.modifiers.extend(
            keyword_children(function, &["async"])
                .into_iter()
                .map(RawModifier::keyword),
        );

        if let Some(parameters) = function.child_by_field_name("parameters") {
            decl.parameters = self.parameters(parameters, source);
        } else if let Some(parameter) = function.child_by_field_name("parameter") {
            decl.parameters = vec![RawParameter::named(node_text(parameter, source))];
        }
        decl.return_type = function
            .child_by_field_name("return_type")
            .map(|annotation| annotation_text(annotation, source));
        decl.body = function.child_by_field_name("body");
    }

    fn parameters(&self, node: Node<'_>, source: &str) -> Vec<RawParameter> {
        named_children(node)
            .into_iter()
            .filter(|param| matches!(param.kind(), "required_parameter" | "optional_parameter"))
            .map(|param| RawParameter {
                name: field_text(param, "pattern", source).unwrap_or_else(|| node_text(param, source)),
                type_annotation: param
                    .child_by_field_name("type")
                    .map(|annotation| annotation_text(annotation, source)),
                default_value: field_text(param, "value", source),
            })
            .collect()
    }

    /// Member decorators sit before the member in the class body; class
    /// decorators may also sit before `export`.
    fn decorators(&self, node: Node<'_>, source: &str) -> Vec<RawModifier> {
        let mut decorators = Vec::new();
        let mut sibling = node.prev_named_sibling();
        while let Some(candidate) = sibling {
            match candidate.kind() {
                "decorator" => decorators.push(candidate),
                "comment" => {}
                _ => break,
            }
            sibling = candidate.prev_named_sibling();
        }
        decorators.reverse();
        decorators.extend(
            named_children(node)
                .into_iter()
                .filter(|child| child.kind() == "decorator"),
        );

        decorators
            .into_iter()
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

impl Default for TypeScriptSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationSyntax for TypeScriptSyntax {
    fn language(&self) -> Language {
        if self.tsx {
            Language::Tsx
        } else {
            Language::TypeScript
        }
    }

    fn grammar(&self) -> tree_sitter::Language {
        if self.tsx {
            tree_sitter_typescript::LANGUAGE_TSX.into()
        } else {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
        }
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
            "class_declaration" | "abstract_class_declaration" | "class" => self.class_declaration(node, source),
            "interface_declaration" => self.interface_declaration(node, source),
            "enum_declaration" => self.enum_declaration(node, source),
            "internal_module" | "module" => self.namespace(node, source),
            "method_definition" | "abstract_method_signature" | "method_signature" => self.method(node, source),
            "variable_declarator" => self
                .bound_class(node, source)
                .or_else(|| self.bound_function(node, source)),
            "public_field_definition" => self.bound_function(node, source),
            _ => None,
        };
        Ok(decl)
    }

    fn descend(&self, node: Node<'_>) -> bool {
        // object literal methods are values, not declarations
        if in_object_literal(node) {
            return false;
        }
        !matches!(
            node.kind(),
            "comment"
                | "string"
                | "template_string"
                | "regex"
                | "import_statement"
                | "type_alias_declaration"
                | "type_annotation"
        )
    }
}

/// Comments sit above the whole `const` statement, not the declarator.
fn statement_of(node: Node<'_>) -> Node<'_> {
    node.parent()
        .filter(|parent| matches!(parent.kind(), "lexical_declaration" | "variable_declaration"))
        .unwrap_or(node)
}

fn in_object_literal(node: Node<'_>) -> bool {
    node.kind() == "method_definition" && node.parent().is_some_and(|parent| parent.kind() == "object")
}

fn in_interface_body(node: Node<'_>) -> bool {
    node.parent()
        .and_then(|body| body.parent())
        .is_some_and(|owner| owner.kind() == "interface_declaration")
}

/// `: Promise<T>` without the leading colon.
fn annotation_text(node: Node<'_>, source: &str) -> String {
    node_text(node, source).trim_start_matches(':').trim().to_string()
}

/// `Repo<T>` is recorded as `Repo`.
fn type_name(node: Node<'_>, source: &str) -> String {
    match node.kind() {
        "generic_type" => field_text(node, "name", source).unwrap_or_else(|| node_text(node, source)),
        _ => node_text(node, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParsingConfig;
    use crate::core::frontend::FrontEnd;
    use crate::core::parser::OutlineParser;
    use crate::core::walker::{DeclarationWalker, WalkEvent};

    /// Hand the declarations entered while walking `source` to `check`.
    fn inspect(syntax: &TypeScriptSyntax, source: &str, check: impl FnOnce(&[RawDeclaration<'_>])) {
        let tree = FrontEnd::new(syntax).unwrap().parse(source).unwrap();
        let found: Vec<_> = DeclarationWalker::new(syntax, &tree)
            .filter_map(|event| match event.unwrap() {
                WalkEvent::Enter(decl) => Some(decl),
                WalkEvent::Leave => None,
            })
            .collect();
        check(&found);
    }

    fn names(found: &[RawDeclaration<'_>]) -> Vec<String> {
        found.iter().map(|decl| decl.name.clone()).collect()
    }

    #[test]
    fn test_interface_members_are_abstract() {
        let source = "interface Store extends Reader<string>, Writer {\n  id: string;\n  get(key: string): string;\n}\n";
        inspect(&TypeScriptSyntax::new(), source, |found| {
            assert_eq!(names(found), vec!["Store", "get"]);
            assert_eq!(found[0].kind_hint, INTERFACE);
            assert_eq!(found[0].bases, vec!["Reader", "Writer"]);
            assert_eq!(found[1].modifiers, vec![RawModifier::implicit("abstract")]);
            assert_eq!(found[1].return_type.as_deref(), Some("string"));
        });
    }

    #[test]
    fn test_abstract_class_and_heritage() {
        let source = "abstract class Shape extends Base<number> implements Drawable, Sized<T> {\n  abstract area(): number;\n  protected static create(): Shape { return null; }\n  render(): void;\n  render(): void {}\n}\n";
        inspect(&TypeScriptSyntax::new(), source, |found| {
            assert_eq!(names(found), vec!["Shape", "area", "create", "render"]);
            assert_eq!(found[0].modifiers, vec![RawModifier::keyword("abstract")]);
            assert_eq!(found[0].bases, vec!["Base", "Drawable", "Sized"]);
            assert_eq!(found[1].modifiers, vec![RawModifier::keyword("abstract")]);
            assert_eq!(
                found[2].modifiers,
                vec![RawModifier::keyword("protected"), RawModifier::keyword("static")]
            );
        });
    }

    #[test]
    fn test_typed_parameters_and_return_type() {
        let source = "export async function fetchUser(id: string, retries: number = 3, cache?: Map<string, User>): Promise<User> {}\n";
        inspect(&TypeScriptSyntax::new(), source, |found| {
            let decl = &found[0];
            assert_eq!(decl.modifiers, vec![RawModifier::keyword("async")]);
            assert_eq!(decl.return_type.as_deref(), Some("Promise<User>"));

            let params: Vec<_> = decl.parameters.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(params, vec!["id", "retries", "cache"]);
            assert_eq!(decl.parameters[0].type_annotation.as_deref(), Some("string"));
            assert_eq!(decl.parameters[1].default_value.as_deref(), Some("3"));
            assert_eq!(decl.parameters[2].type_annotation.as_deref(), Some("Map<string, User>"));
        });
    }

    #[test]
    fn test_member_decorators_and_arrow_fields() {
        let source = "class Panel {\n  @memoize\n  @trace('x')\n  size(): number { return 1; }\n  private onClick = async (event: Event): Promise<void> => {};\n}\n";
        inspect(&TypeScriptSyntax::new(), source, |found| {
            assert_eq!(names(found), vec!["Panel", "size", "onClick"]);
            assert_eq!(
                found[1].modifiers,
                vec![RawModifier::decorator("memoize"), RawModifier::decorator("trace('x')")]
            );
            assert_eq!(
                found[2].modifiers,
                vec![RawModifier::keyword("private"), RawModifier::keyword("async")]
            );
            assert_eq!(found[2].kind_hint, METHOD);
        });
    }

    #[test]
    fn test_type_aliases_and_annotations_declare_nothing() {
        let source = "type Handler = { run(): void };\nlet cb: { call(): void } = null;\nconst api = { get() {} };\nfunction real(): void {}\n";
        inspect(&TypeScriptSyntax::new(), source, |found| {
            assert_eq!(names(found), vec!["real"]);
        });
    }

    #[test]
    fn test_tsx_components() {
        let source = "interface Props { name: string }\n\nexport function Greeting({ name }: Props) {\n  return <h1>Hello {name}</h1>;\n}\n\nconst List = (props: Props) => <ul />;\n";
        inspect(&TypeScriptSyntax::tsx(), source, |found| {
            assert_eq!(names(found), vec!["Props", "Greeting", "List"]);
            assert_eq!(found[2].kind_hint, ARROW);
        });
    }

    #[test]
    fn test_outline_visibility_and_qualifiers() {
        let parser = OutlineParser::new(&ParsingConfig::default()).unwrap();
        let source = "namespace App.Models {\n  export abstract class Repo {\n    private cache(): void {}\n    abstract find(id: string): object;\n  }\n}\n";
        let outline = parser.parse(Language::TypeScript, source).unwrap();

        let repo = outline.find("App.Models.Repo").unwrap();
        assert!(repo.has(Qualifier::Abstract));
        let cache = outline.find("App.Models.Repo.cache").unwrap();
        assert_eq!(cache.visibility, Some(Visibility::Private));
        let find = outline.find("App.Models.Repo.find").unwrap();
        assert!(find.has(Qualifier::Abstract));
        assert_eq!(find.return_type.as_deref(), Some("object"));
    }
}
