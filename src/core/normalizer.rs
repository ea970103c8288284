//! Builds an [`Outline`] from the walker's event stream.
//!
//! The normalizer keeps a stack of open scopes (arena ids). Each `Enter`
//! becomes a [`Declaration`] under the scope on top, or merges into an
//! existing class for extension scopes such as Rust `impl` blocks. Errors
//! abort the whole build; no partial outline escapes.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::frontend::ConcreteTree;
use super::languages::DeclarationSyntax;
use super::model::{segment_for, Declaration, DeclarationId, DeclarationKind, Outline, Parameter, Span};
use super::modifiers::ModifierTable;
use super::walker::{DeclarationWalker, RawDeclaration, ScopeRole, WalkEvent};
use crate::error::StructuralError;

const ROOT: DeclarationId = DeclarationId(0);

pub struct Normalizer<'a> {
    table: &'a ModifierTable,
}

impl<'a> Normalizer<'a> {
    pub fn new(table: &'a ModifierTable) -> Self {
        Self { table }
    }

    /// Walk `tree` with `syntax` and assemble its outline.
    pub fn normalize(
        &self,
        syntax: &dyn DeclarationSyntax,
        module_name: &str,
        tree: &ConcreteTree<'_>,
    ) -> Result<Outline, StructuralError> {
        let mut builder = ArenaBuilder::new(module_name, Span::of(tree.root()));

        for event in DeclarationWalker::new(syntax, tree) {
            match event? {
                WalkEvent::Enter(raw) => builder.enter(raw, self.table),
                WalkEvent::Leave => builder.leave(tree)?,
            }
        }

        let declarations = builder.finish();
        debug!(
            "Normalized {} declarations for {} module `{}`",
            declarations.len() - 1,
            syntax.language(),
            module_name
        );
        Ok(Outline::from_arena(syntax.language(), declarations))
    }
}

struct ArenaBuilder {
    arena: Vec<Declaration>,
    scopes: Vec<DeclarationId>,
    /// How many scopes each open `Enter` pushed; dotted namespaces push several.
    opened: Vec<usize>,
    /// Classes created for an extension before their own declaration was seen.
    synthesized: HashSet<DeclarationId>,
}

impl ArenaBuilder {
    fn new(module_name: &str, location: Span) -> Self {
        let root = Declaration {
            id: ROOT,
            kind: DeclarationKind::Module,
            name: module_name.to_string(),
            qualified_path: Vec::new(),
            location,
            parameters: Vec::new(),
            return_type: None,
            qualifiers: BTreeSet::new(),
            decorators: Vec::new(),
            doc_comment: None,
            bases: Vec::new(),
            visibility: None,
            parent: None,
            children: Vec::new(),
        };

        Self {
            arena: vec![root],
            scopes: vec![ROOT],
            opened: Vec::new(),
            synthesized: HashSet::new(),
        }
    }

    fn scope(&self) -> DeclarationId {
        self.scopes.last().copied().unwrap_or(ROOT)
    }

    fn enter(&mut self, raw: RawDeclaration<'_>, table: &ModifierTable) {
        let parent = self.scope();
        let ids = match raw.kind_hint.role {
            ScopeRole::Extension => vec![self.extend(parent, raw, table)],
            ScopeRole::Type => match self.synthesized_class(parent, &raw.name) {
                Some(existing) => {
                    self.adopt(existing, raw, table);
                    vec![existing]
                }
                None => vec![self.declare(parent, raw, table)],
            },
            ScopeRole::Namespace => self.open_namespace(parent, raw, table),
            ScopeRole::Callable => vec![self.declare(parent, raw, table)],
        };
        self.opened.push(ids.len());
        self.scopes.extend(ids);
    }

    fn leave(&mut self, tree: &ConcreteTree<'_>) -> Result<(), StructuralError> {
        let Some(count) = self.opened.pop() else {
            let end = tree.root().end_position().into();
            return Err(StructuralError::new(end, tree.source().len(), "unbalanced declaration scope"));
        };
        let keep = self.scopes.len().saturating_sub(count).max(1);
        self.scopes.truncate(keep);
        Ok(())
    }

    fn finish(self) -> Vec<Declaration> {
        self.arena
    }

    fn kind_for(&self, role: ScopeRole, parent: DeclarationId) -> DeclarationKind {
        match role {
            ScopeRole::Callable => match self.arena[parent.0].kind {
                DeclarationKind::Class | DeclarationKind::Method => DeclarationKind::Method,
                DeclarationKind::Module | DeclarationKind::Function => DeclarationKind::Function,
            },
            ScopeRole::Type | ScopeRole::Extension => DeclarationKind::Class,
            ScopeRole::Namespace => DeclarationKind::Module,
        }
    }

    fn declare(&mut self, parent: DeclarationId, raw: RawDeclaration<'_>, table: &ModifierTable) -> DeclarationId {
        let id = DeclarationId(self.arena.len());
        let kind = self.kind_for(raw.kind_hint.role, parent);
        let resolved = table.resolve(&raw.modifiers);

        let scope = &self.arena[parent.0];
        let segment = segment_for(
            &raw.name,
            scope
                .children
                .iter()
                .map(|child| self.arena[child.0].name.as_str()),
        );
        let mut qualified_path = scope.qualified_path.clone();
        qualified_path.push(segment);

        let bases = if kind == DeclarationKind::Class {
            clean_bases(raw.bases)
        } else {
            Vec::new()
        };

        self.arena.push(Declaration {
            id,
            kind,
            name: raw.name,
            qualified_path,
            location: raw.span,
            parameters: raw
                .parameters
                .into_iter()
                .map(|param| Parameter {
                    name: param.name,
                    type_annotation: param.type_annotation,
                    default_value_present: param.default_value.is_some(),
                })
                .collect(),
            return_type: raw.return_type,
            qualifiers: resolved.qualifiers,
            decorators: resolved.decorators,
            doc_comment: raw.doc_comment,
            bases,
            visibility: resolved.visibility,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.arena[parent.0].children.push(id);
        id
    }

    /// Route an extension into the same-named class of the current scope,
    /// creating a placeholder class when none exists yet.
    fn extend(
        &mut self,
        parent: DeclarationId,
        mut raw: RawDeclaration<'_>,
        table: &ModifierTable,
    ) -> DeclarationId {
        let existing = self.arena[parent.0]
            .children
            .iter()
            .copied()
            .find(|child| {
                let decl = &self.arena[child.0];
                decl.kind == DeclarationKind::Class && decl.name == raw.name
            });

        match existing {
            Some(id) => {
                merge_bases(&mut self.arena[id.0].bases, clean_bases(raw.bases));
                id
            }
            None => {
                // impl attributes and docs describe the block, not the type
                raw.modifiers.clear();
                raw.doc_comment = None;
                let id = self.declare(parent, raw, table);
                self.synthesized.insert(id);
                id
            }
        }
    }

    /// Open `A.B.C` as nested modules, reusing same-named modules already in
    /// scope. Namespace blocks are open, so a repeated block merges.
    fn open_namespace(
        &mut self,
        parent: DeclarationId,
        mut raw: RawDeclaration<'_>,
        table: &ModifierTable,
    ) -> Vec<DeclarationId> {
        let segments: Vec<String> = raw
            .name
            .split('.')
            .map(|segment| segment.trim().to_string())
            .filter(|segment| !segment.is_empty())
            .collect();
        let Some((last, outer)) = segments.split_last() else {
            return vec![self.declare(parent, raw, table)];
        };

        let mut ids = Vec::with_capacity(segments.len());
        let mut scope = parent;
        for segment in outer {
            scope = match self.module_named(scope, segment) {
                Some(existing) => existing,
                None => {
                    let outer_raw = RawDeclaration {
                        name: segment.clone(),
                        modifiers: Vec::new(),
                        doc_comment: None,
                        ..raw.clone()
                    };
                    self.declare(scope, outer_raw, table)
                }
            };
            ids.push(scope);
        }

        let id = match self.module_named(scope, last) {
            Some(existing) => existing,
            None => {
                raw.name = last.clone();
                self.declare(scope, raw, table)
            }
        };
        ids.push(id);
        ids
    }

    fn module_named(&self, parent: DeclarationId, name: &str) -> Option<DeclarationId> {
        self.arena[parent.0].children.iter().copied().find(|child| {
            let decl = &self.arena[child.0];
            decl.kind == DeclarationKind::Module && decl.name == name
        })
    }

    fn synthesized_class(&self, parent: DeclarationId, name: &str) -> Option<DeclarationId> {
        self.arena[parent.0]
            .children
            .iter()
            .copied()
            .find(|child| self.synthesized.contains(child) && self.arena[child.0].name == name)
    }

    /// Fill a placeholder class with its real declaration.
    fn adopt(&mut self, id: DeclarationId, raw: RawDeclaration<'_>, table: &ModifierTable) {
        self.synthesized.remove(&id);
        let resolved = table.resolve(&raw.modifiers);
        let decl = &mut self.arena[id.0];

        let mut bases = clean_bases(raw.bases);
        merge_bases(&mut bases, std::mem::take(&mut decl.bases));
        decl.bases = bases;
        decl.location = raw.span;
        decl.qualifiers = resolved.qualifiers;
        decl.decorators = resolved.decorators;
        decl.visibility = resolved.visibility;
        decl.doc_comment = raw.doc_comment;
    }
}

/// Trim base names and drop empty entries, keeping written order.
fn clean_bases(bases: Vec<String>) -> Vec<String> {
    bases
        .into_iter()
        .map(|base| base.trim().to_string())
        .filter(|base| !base.is_empty())
        .collect()
}

fn merge_bases(bases: &mut Vec<String>, more: Vec<String>) {
    for base in more {
        if !bases.contains(&base) {
            bases.push(base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frontend::FrontEnd;
    use crate::core::languages::Language;
    use crate::core::model::Qualifier;

    fn outline(language: Language, source: &str) -> Result<Outline, StructuralError> {
        let syntax = language.syntax();
        let table = ModifierTable::new(syntax.modifier_rules()).unwrap();
        let mut front_end = FrontEnd::new(syntax.as_ref()).unwrap();
        let tree = front_end.parse(source)?;
        Normalizer::new(&table).normalize(syntax.as_ref(), "sample", &tree)
    }

    fn python(source: &str) -> Outline {
        outline(Language::Python, source).unwrap()
    }

    #[test]
    fn test_class_with_four_methods() {
        let source = r#"class TestClass:
    """Test class docstring"""

    def __init__(self):
        self.value = 42

    def instance_method(self):
        return self.value

    @classmethod
    def class_method(cls):
        return cls()

    @staticmethod
    def static_method():
        return "static"
"#;
        let outline = python(source);
        let class = outline.find("TestClass").unwrap();
        assert_eq!(class.kind, DeclarationKind::Class);
        assert!(class.bases.is_empty());
        assert_eq!(class.doc_comment.as_deref(), Some("Test class docstring"));

        let methods: Vec<_> = outline.children(class.id).collect();
        let names: Vec<_> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["__init__", "instance_method", "class_method", "static_method"]);
        assert!(methods.iter().all(|m| m.kind == DeclarationKind::Method));
        assert!(methods[0].qualifiers.is_empty());
        assert!(methods[1].qualifiers.is_empty());
        assert_eq!(methods[2].qualifiers, BTreeSet::from([Qualifier::ClassLevel]));
        assert_eq!(methods[3].qualifiers, BTreeSet::from([Qualifier::Static]));
        assert_eq!(methods[2].qualified_path, vec!["TestClass", "class_method"]);
    }

    #[test]
    fn test_decorated_function() {
        let outline = python("@decorator\ndef decorated_function(): pass\n");
        let func = outline.find("decorated_function").unwrap();
        assert_eq!(func.kind, DeclarationKind::Function);
        assert_eq!(func.qualifiers, BTreeSet::from([Qualifier::Decorated]));
        assert_eq!(func.decorators, vec!["decorator"]);
    }

    #[test]
    fn test_single_inheritance() {
        let source = "class TestClass:\n    pass\n\nclass ChildClass(TestClass):\n    def child_method(self):\n        return super().instance_method()\n";
        let outline = python(source);
        let child = outline.find("ChildClass").unwrap();
        assert_eq!(child.bases, vec!["TestClass"]);
        assert!(outline.find("TestClass").unwrap().bases.is_empty());
        let method = outline.find("ChildClass.child_method").unwrap();
        assert_eq!(method.kind, DeclarationKind::Method);
        assert_eq!(method.parent, Some(child.id));
    }

    #[test]
    fn test_malformed_input_yields_no_outline() {
        let error = outline(Language::Python, "class Broken(Base:\n    pass\n").unwrap_err();
        assert!(error.location.line <= 1);

        let error = outline(Language::Python, "def fine():\n    pass\n\nclass Empty:\n").unwrap_err();
        assert_eq!(error.location.line, 3);
    }

    #[test]
    fn test_nested_functions_are_preserved() {
        let source = "def outer():\n    def inner():\n        return 1\n    return inner\n\nclass Host:\n    def method(self):\n        def helper():\n            pass\n";
        let outline = python(source);
        let inner = outline.find("outer.inner").unwrap();
        assert_eq!(inner.kind, DeclarationKind::Function);
        let helper = outline.find("Host.method.helper").unwrap();
        assert_eq!(helper.kind, DeclarationKind::Method);
        assert_eq!(outline.parent(helper.id).map(|p| p.kind), Some(DeclarationKind::Method));
    }

    #[test]
    fn test_repeated_names_get_distinct_paths() {
        let source = "class Temperature:\n    @property\n    def celsius(self):\n        return self._c\n\n    @celsius.setter\n    def celsius(self, value):\n        self._c = value\n";
        let outline = python(source);
        let class = outline.find("Temperature").unwrap();
        let paths: Vec<_> = outline.children(class.id).map(|m| m.path()).collect();
        assert_eq!(paths, vec!["Temperature.celsius", "Temperature.celsius#2"]);
        for decl in outline.iter() {
            assert_eq!(decl.qualified_path, outline.derive_path(decl.id));
        }
        let setter = outline.find("Temperature.celsius#2").unwrap();
        assert_eq!(setter.name, "celsius");
        assert_eq!(setter.decorators, vec!["celsius.setter"]);
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let source = "class A(B, C):\n    async def run(self, *args, **kwargs) -> None:\n        pass\n";
        assert_eq!(python(source), python(source));
    }

    #[test]
    fn test_root_is_module() {
        let outline = python("def f():\n    pass\n");
        let root = outline.root();
        assert_eq!(root.kind, DeclarationKind::Module);
        assert_eq!(root.name, "sample");
        assert!(root.qualified_path.is_empty());
        assert!(root.parent.is_none());
        assert_eq!(outline.language(), Language::Python);
    }

    #[test]
    fn test_rust_impl_merges_into_struct() {
        let source = "impl Shape for Circle {\n    fn area(&self) -> f64 { 0.0 }\n}\n\n/// A circle.\npub struct Circle { r: f64 }\n\nimpl Circle {\n    pub fn new(r: f64) -> Self { Circle { r } }\n}\n";
        let outline = outline(Language::Rust, source).unwrap();
        let classes: Vec<_> = outline
            .iter()
            .filter(|d| d.kind == DeclarationKind::Class)
            .collect();
        assert_eq!(classes.len(), 1);

        let circle = classes[0];
        assert_eq!(circle.name, "Circle");
        assert_eq!(circle.bases, vec!["Shape"]);
        assert_eq!(circle.doc_comment.as_deref(), Some("A circle."));
        assert_eq!(circle.location.start.line, 5);

        let methods: Vec<_> = outline.children(circle.id).map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["area", "new"]);
        let new = outline.find("Circle.new").unwrap();
        assert_eq!(new.kind, DeclarationKind::Method);
        assert!(new.has(Qualifier::Static));
    }

    #[test]
    fn test_dotted_namespaces_nest_and_merge() {
        let source = "namespace A.B { class C {} }\nnamespace A { namespace B { class C {} } }\nnamespace D { class E {} }\n";
        let outline = outline(Language::CSharp, source).unwrap();
        let paths: Vec<_> = outline.iter().skip(1).map(|decl| decl.path()).collect();
        assert_eq!(paths, vec!["A", "A.B", "A.B.C", "A.B.C#2", "D", "D.E"]);

        let a = outline.find("A").unwrap();
        assert_eq!(a.kind, DeclarationKind::Module);
        assert_eq!(outline.children(a.id).count(), 1);
        for decl in outline.iter() {
            assert_eq!(decl.qualified_path, outline.derive_path(decl.id));
        }
        // scopes close correctly after a multi-segment namespace
        assert_eq!(outline.parent(outline.find("D").unwrap().id).map(|p| p.id), Some(outline.root().id));
    }

    #[test]
    fn test_bases_only_on_classes() {
        let outline = python("class A(B):\n    def m(self):\n        pass\n");
        for decl in outline.iter() {
            if decl.kind != DeclarationKind::Class {
                assert!(decl.bases.is_empty());
            }
        }
    }
}
