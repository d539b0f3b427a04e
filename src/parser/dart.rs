//! Dart declaration extraction on top of tree-sitter-dart.
//!
//! The capture query selects directives, annotations and declarations
//! directly under the `program` node. Each captured node is then walked to
//! fill the syntactic facts: class headers, const constructors, fields and
//! a restricted constant expression grammar. Anything else in the tree,
//! such as function bodies, is never looked at.

use lazy_static::lazy_static;
use phf::phf_set;
use tree_sitter::Node;

use super::treesitter::{Captured, Config, NodeCapture, TreeSitterParser};
use super::ParseError;
use crate::analysis::{
    AnnotationSyntax, Argument, ClassDecl, Combinator, CompilationUnit, ConstExpr,
    ConstructorDecl, Declaration, DeclarationKind, Directive, FieldDecl, Parameter,
    ParameterBinding, ParameterKind, Span, TypeRef, VariableDecl,
};

/// Top-level node kinds and what they are captured as.
static CAPTURES: &[NodeCapture] = &[
    NodeCapture { node_kind: "library_name", capture: "directive" },
    NodeCapture { node_kind: "import_or_export", capture: "directive" },
    NodeCapture { node_kind: "library_import", capture: "directive" },
    NodeCapture { node_kind: "library_export", capture: "directive" },
    NodeCapture { node_kind: "part_directive", capture: "directive" },
    NodeCapture { node_kind: "part_of_directive", capture: "directive" },
    NodeCapture { node_kind: "annotation", capture: "annotation" },
    NodeCapture { node_kind: "marker_annotation", capture: "annotation" },
    NodeCapture { node_kind: "metadata", capture: "annotation" },
    NodeCapture { node_kind: "class_definition", capture: "class" },
    NodeCapture { node_kind: "mixin_declaration", capture: "mixin" },
    NodeCapture { node_kind: "enum_declaration", capture: "enum" },
    NodeCapture { node_kind: "extension_declaration", capture: "extension" },
    NodeCapture { node_kind: "extension_type_declaration", capture: "extension_type" },
    NodeCapture { node_kind: "type_alias", capture: "typedef" },
    NodeCapture { node_kind: "function_signature", capture: "function" },
    NodeCapture { node_kind: "getter_signature", capture: "function" },
    NodeCapture { node_kind: "setter_signature", capture: "function" },
    NodeCapture { node_kind: "static_final_declaration_list", capture: "variables" },
    NodeCapture { node_kind: "initialized_identifier_list", capture: "variables" },
];

/// Keywords and type pieces that may precede a variable list or signature
/// as siblings of the same declaration.
static LEADING_KINDS: phf::Set<&'static str> = phf_set! {
    "const_builtin", "final_builtin", "inferred_type", "type_identifier", "type_arguments",
    "nullable_type", "function_type", "record_type", "void_type", ".", "?",
};

static LEADING_WORDS: phf::Set<&'static str> = phf_set! {
    "const", "final", "late", "var", "static", "external", "covariant", "augment", "Function",
};

/// Nodes whose children belong to the enclosing class header.
static HEADER_WRAPPERS: phf::Set<&'static str> = phf_set! {
    "superclass", "mixins", "interfaces", "mixin_application", "mixin_application_class",
};

/// Words that open a supertype clause; `=` opens a mixin application.
static CLAUSE_WORDS: phf::Set<&'static str> = phf_set! {
    "extends", "with", "implements", "on", "=",
};

static LIST_CONTROL_KINDS: phf::Set<&'static str> = phf_set! {
    "spread_element", "if_element", "for_element",
};

lazy_static! {
    static ref DART: Result<TreeSitterParser, String> =
        new_parser().map_err(|e| format!("cannot initialize Dart parser: {}", e));
}

/// Create the Dart capture parser.
pub fn new_parser() -> anyhow::Result<TreeSitterParser> {
    TreeSitterParser::new(Config {
        language: tree_sitter_dart::LANGUAGE.into(),
        language_name: "dart",
        root_kind: "program",
        captures: CAPTURES,
    })
}

/// Parse a Dart compilation unit.
pub fn parse_unit(source: &str) -> Result<CompilationUnit, ParseError> {
    let parser = DART
        .as_ref()
        .map_err(|message| ParseError::new(1, 1, message.clone()))?;
    let tree = parser.parse(source.as_bytes())?;
    let captures = parser.captures(&tree, source.as_bytes());
    Ok(Extractor::new(source).unit(&captures))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Clause {
    Extends,
    With,
    Implements,
    On,
}

fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn is_comment(node: Node) -> bool {
    node.kind().contains("comment")
}

fn is_annotation(node: Node) -> bool {
    matches!(node.kind(), "annotation" | "marker_annotation" | "metadata")
}

fn is_name(node: Node) -> bool {
    matches!(node.kind(), "identifier" | "type_identifier")
}

fn is_number(node: Node) -> bool {
    let kind = node.kind();
    kind.ends_with("integer_literal") || kind.ends_with("floating_point_literal")
}

fn span(node: Node) -> Span {
    let pos = node.start_position();
    Span {
        line: pos.row + 1,
        col: pos.column + 1,
    }
}

/// Walks captured nodes of one source file.
struct Extractor<'s> {
    source: &'s str,
    lines: Vec<&'s str>,
}

impl<'s> Extractor<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            lines: source.lines().collect(),
        }
    }

    fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Leaf nodes in order, with string literals kept whole.
    fn tokens<'t>(&self, node: Node<'t>, out: &mut Vec<Node<'t>>) {
        if is_comment(node) {
            return;
        }
        if node.child_count() == 0 || node.kind() == "string_literal" {
            out.push(node);
            return;
        }
        for child in children(node) {
            self.tokens(child, out);
        }
    }

    fn token_list<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let mut out = Vec::new();
        self.tokens(node, &mut out);
        out
    }

    fn is_word(&self, node: Node, word: &str) -> bool {
        node.kind() == word || self.text(node) == word
    }

    // ---------------------------------------------------------------------
    // Compilation unit
    // ---------------------------------------------------------------------

    fn unit(&self, captures: &[Captured]) -> CompilationUnit {
        let mut unit = CompilationUnit::default();
        let mut pending: Vec<Node> = Vec::new();

        for captured in captures {
            match captured.capture {
                "annotation" => pending.extend(self.annotation_nodes(captured.node)),
                "directive" => {
                    pending.clear();
                    if let Some(directive) = self.directive(captured.node) {
                        unit.directives.push(directive);
                    }
                }
                capture => {
                    let outer = std::mem::take(&mut pending);
                    self.declarations(capture, captured.node, &outer, &mut unit.declarations);
                }
            }
        }
        unit
    }

    fn annotation_nodes<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        if node.kind() == "metadata" {
            named_children(node)
                .into_iter()
                .filter(|c| is_annotation(*c))
                .collect()
        } else {
            vec![node]
        }
    }

    fn declarations<'t>(
        &self,
        capture: &str,
        node: Node<'t>,
        outer: &[Node<'t>],
        out: &mut Vec<Declaration>,
    ) {
        let leading = self.leading(node);
        let mut annotation_nodes: Vec<Node<'t>> = outer.to_vec();
        for child in children(node) {
            if is_annotation(child) {
                annotation_nodes.extend(self.annotation_nodes(child));
            }
        }
        let start = leading.first().copied().unwrap_or(node);
        let doc = self.doc(start, &annotation_nodes);
        let annotations: Vec<AnnotationSyntax> = annotation_nodes
            .iter()
            .map(|a| self.annotation(*a))
            .collect();

        let named: Vec<(Node, DeclarationKind)> = match capture {
            "class" => self
                .class_like(node, false)
                .map(|(name, decl)| (name, DeclarationKind::Class(decl)))
                .into_iter()
                .collect(),
            "mixin" => self
                .class_like(node, true)
                .map(|(name, decl)| (name, DeclarationKind::Mixin(decl)))
                .into_iter()
                .collect(),
            "enum" => self
                .simple_name(node)
                .map(|name| (name, DeclarationKind::Enum))
                .into_iter()
                .collect(),
            "extension" => self
                .extension_name(node)
                .map(|name| (name, DeclarationKind::Extension))
                .into_iter()
                .collect(),
            "extension_type" => self
                .extension_type_name(node)
                .map(|name| (name, DeclarationKind::ExtensionType))
                .into_iter()
                .collect(),
            "typedef" => self.typedef(node).into_iter().collect(),
            "function" => self
                .simple_name(node)
                .map(|name| (name, DeclarationKind::Function))
                .into_iter()
                .collect(),
            "variables" => {
                let is_const = leading.iter().any(|n| self.is_word(*n, "const"))
                    || leading.iter().any(|n| n.kind() == "const_builtin");
                self.variables(node)
                    .into_iter()
                    .map(|(name, initializer)| {
                        (
                            name,
                            DeclarationKind::Variable(VariableDecl {
                                is_const,
                                initializer,
                            }),
                        )
                    })
                    .collect()
            }
            _ => Vec::new(),
        };

        for (name, kind) in named {
            out.push(Declaration {
                name: self.text(name).to_string(),
                kind,
                span: span(name),
                doc: doc.clone(),
                annotations: annotations.clone(),
            });
        }
    }

    /// Modifier and type siblings that precede `node` in the same declaration.
    fn leading<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let mut out = Vec::new();
        let mut current = node.prev_sibling();
        while let Some(prev) = current {
            if !(LEADING_KINDS.contains(prev.kind()) || LEADING_WORDS.contains(self.text(prev))) {
                break;
            }
            out.push(prev);
            current = prev.prev_sibling();
        }
        out.reverse();
        out
    }

    /// `///` run directly above the declaration, else above its annotations.
    fn doc(&self, start: Node, annotations: &[Node]) -> Option<String> {
        let own_row = children(start)
            .into_iter()
            .find(|c| !is_annotation(*c) && !is_comment(*c))
            .map(|c| c.start_position().row)
            .unwrap_or(start.start_position().row);
        self.doc_above(own_row).or_else(|| {
            annotations
                .iter()
                .map(|a| a.start_position().row)
                .min()
                .and_then(|row| self.doc_above(row))
        })
    }

    fn doc_above(&self, row: usize) -> Option<String> {
        let mut run: Vec<&str> = self.lines[..row.min(self.lines.len())]
            .iter()
            .rev()
            .map(|line| line.trim())
            .take_while(|line| line.starts_with("///") && !line.starts_with("////"))
            .collect();
        if run.is_empty() {
            return None;
        }
        run.reverse();
        Some(run.join("\n"))
    }

    // ---------------------------------------------------------------------
    // Directives
    // ---------------------------------------------------------------------

    fn directive(&self, node: Node) -> Option<Directive> {
        let tokens: Vec<Node> = self
            .token_list(node)
            .into_iter()
            .skip_while(|t| !matches!(self.text(*t), "library" | "import" | "export" | "part"))
            .collect();
        let (keyword, rest) = tokens.split_first()?;

        match self.text(*keyword) {
            "library" => {
                let parts: Vec<&str> = rest
                    .iter()
                    .filter(|t| is_name(**t))
                    .map(|t| self.text(*t))
                    .collect();
                Some(Directive::Library(if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("."))
                }))
            }
            "import" | "export" => {
                let uri = rest
                    .iter()
                    .find(|t| t.kind() == "string_literal")
                    .and_then(|t| self.plain_string(*t))?;
                let (prefix, combinators) = self.import_clauses(rest);
                Some(if self.text(*keyword) == "import" {
                    Directive::Import {
                        uri,
                        prefix,
                        combinators,
                    }
                } else {
                    Directive::Export { uri, combinators }
                })
            }
            "part" => {
                let is_part_of = rest.first().is_some_and(|t| self.text(*t) == "of");
                if let Some(uri) = rest.iter().find(|t| t.kind() == "string_literal") {
                    let uri = self.plain_string(*uri)?;
                    return Some(if is_part_of {
                        Directive::PartOf(uri)
                    } else {
                        Directive::Part(uri)
                    });
                }
                let parts: Vec<&str> = rest
                    .iter()
                    .skip(1)
                    .filter(|t| is_name(**t))
                    .map(|t| self.text(*t))
                    .collect();
                (is_part_of && !parts.is_empty()).then(|| Directive::PartOf(parts.join(".")))
            }
            _ => None,
        }
    }

    /// `as` prefix and `show` / `hide` lists after the URI.
    fn import_clauses(&self, tokens: &[Node]) -> (Option<String>, Vec<Combinator>) {
        let mut prefix = None;
        let mut combinators = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            match self.text(tokens[i]) {
                "as" => {
                    prefix = tokens
                        .get(i + 1)
                        .filter(|t| is_name(**t))
                        .map(|t| self.text(*t).to_string());
                    i += 2;
                }
                word @ ("show" | "hide") => {
                    let mut names = Vec::new();
                    i += 1;
                    while let Some(t) = tokens.get(i) {
                        if is_name(*t) && !matches!(self.text(*t), "show" | "hide") {
                            names.push(self.text(*t).to_string());
                        } else if self.text(*t) != "," {
                            break;
                        }
                        i += 1;
                    }
                    combinators.push(if word == "show" {
                        Combinator::Show(names)
                    } else {
                        Combinator::Hide(names)
                    });
                }
                _ => i += 1,
            }
        }
        (prefix, combinators)
    }

    // ---------------------------------------------------------------------
    // Annotations and arguments
    // ---------------------------------------------------------------------

    fn annotation(&self, node: Node) -> AnnotationSyntax {
        let mut name = Vec::new();
        let mut args = None;
        for child in children(node) {
            match child.kind() {
                "arguments" => args = Some(self.arguments(child)),
                "type_arguments" => {}
                _ => name.extend(
                    self.token_list(child)
                        .into_iter()
                        .filter(|t| is_name(*t))
                        .map(|t| self.text(t).to_string()),
                ),
            }
        }
        AnnotationSyntax { name, args }
    }

    fn arguments(&self, node: Node) -> Vec<Argument> {
        let inner: Vec<Node> = children(node)
            .into_iter()
            .filter(|c| !matches!(c.kind(), "(" | ")") && !is_comment(*c))
            .collect();
        split_commas(&inner)
            .into_iter()
            .filter(|group| !group.is_empty())
            .map(|group| match group.as_slice() {
                [single] if single.kind() == "named_argument" => self.named_argument(*single),
                [single] if single.kind() == "argument" => Argument {
                    name: None,
                    value: self.const_expr(&children(*single)),
                },
                _ => Argument {
                    name: None,
                    value: self.const_expr(&group),
                },
            })
            .collect()
    }

    fn named_argument(&self, node: Node) -> Argument {
        let kids = children(node);
        let label = kids.iter().position(|k| k.kind() == "label");
        let name = label
            .and_then(|i| named_children(kids[i]).into_iter().find(|n| is_name(*n)))
            .map(|n| self.text(n).to_string());
        let value_from = label.map(|i| i + 1).unwrap_or(0);
        Argument {
            name,
            value: self.const_expr(&kids[value_from..]),
        }
    }

    // ---------------------------------------------------------------------
    // Classes and mixins
    // ---------------------------------------------------------------------

    /// Children of a class header with clause wrappers inlined.
    fn flat_header<'t>(&self, node: Node<'t>, out: &mut Vec<Node<'t>>) {
        for child in children(node) {
            let opens_clause = children(child)
                .first()
                .is_some_and(|first| CLAUSE_WORDS.contains(self.text(*first)));
            if child.child_count() > 0
                && (HEADER_WRAPPERS.contains(child.kind()) || (child.is_named() && opens_clause))
            {
                self.flat_header(child, out);
            } else {
                out.push(child);
            }
        }
    }

    fn class_like<'t>(&self, node: Node<'t>, is_mixin_decl: bool) -> Option<(Node<'t>, ClassDecl)> {
        let mut flat = Vec::new();
        self.flat_header(node, &mut flat);

        let mut decl = ClassDecl::default();
        let mut name = node.child_by_field_name("name");
        let mut clause: Option<Clause> = None;
        let mut buckets: Vec<(Clause, Vec<Node>)> = Vec::new();
        let mut body = None;

        for n in flat {
            if is_comment(n) || is_annotation(n) {
                continue;
            }
            let text = self.text(n);
            if n.kind() == "class_body" {
                body = Some(n);
                break;
            }
            if CLAUSE_WORDS.contains(text) && n.child_count() == 0 {
                let next = match text {
                    "extends" | "=" => Clause::Extends,
                    "with" => Clause::With,
                    "implements" => Clause::Implements,
                    _ => Clause::On,
                };
                clause = Some(next);
                buckets.push((next, Vec::new()));
                continue;
            }
            match clause {
                None => {
                    if text == "abstract" && !is_mixin_decl {
                        decl.is_abstract = true;
                    } else if name.is_none() && is_name(n) {
                        name = Some(n);
                    }
                }
                Some(_) => {
                    if !matches!(n.kind(), "type_parameters" | ";" | "{") {
                        if let Some((_, bucket)) = buckets.last_mut() {
                            bucket.push(n);
                        }
                    }
                }
            }
        }

        for (clause, nodes) in buckets {
            let types = self.collect_types(&nodes);
            match clause {
                Clause::Extends => decl.extends = types.into_iter().next(),
                Clause::With => decl.with.extend(types),
                Clause::Implements => decl.implements.extend(types),
                Clause::On => decl.on.extend(types),
            }
        }

        let name = name?;
        if let Some(body) = body {
            self.class_body(body, self.text(name), &mut decl);
        }
        Some((name, decl))
    }

    /// Types written in a clause, e.g. `foundation.State<Foo<T>>?, Bar`.
    fn collect_types(&self, nodes: &[Node]) -> Vec<TypeRef> {
        let mut out: Vec<TypeRef> = Vec::new();
        let mut dotted = false;
        for &node in nodes {
            let kind = node.kind();
            match kind {
                "type_identifier" | "identifier" => {
                    let name = self.text(node).to_string();
                    let qualifies = dotted
                        && out
                            .last()
                            .is_some_and(|last| last.prefix.is_none() && last.type_args.is_empty());
                    match out.last_mut() {
                        Some(last) if qualifies => {
                            last.prefix = Some(std::mem::replace(&mut last.name, name));
                        }
                        _ => out.push(TypeRef::simple(&name)),
                    }
                    dotted = false;
                    continue;
                }
                "." => {
                    dotted = true;
                    continue;
                }
                _ if kind.contains("dot_identifier") => {
                    if let (Some(last), Some(id)) = (
                        out.last_mut(),
                        named_children(node).into_iter().find(|c| is_name(*c)),
                    ) {
                        let name = self.text(id).to_string();
                        last.prefix = Some(std::mem::replace(&mut last.name, name));
                    }
                }
                "type_arguments" => {
                    if let Some(last) = out.last_mut() {
                        last.type_args = self.collect_types(&children(node));
                    }
                }
                "nullable_type" | "?" => {
                    if let Some(last) = out.last_mut() {
                        last.nullable = true;
                    }
                }
                "function_type" => {
                    let mut ty = TypeRef::simple("Function");
                    ty.nullable = self.text(node).trim_end().ends_with('?');
                    out.push(ty);
                }
                "record_type" => out.push(TypeRef::simple("Record")),
                "void_type" => out.push(TypeRef::simple("void")),
                _ if node.named_child_count() > 0 && kind != "type_parameters" => {
                    out.extend(self.collect_types(&children(node)));
                }
                _ => {}
            }
            dotted = false;
        }
        out
    }

    fn class_body(&self, body: Node, class_name: &str, decl: &mut ClassDecl) {
        for member in named_children(body) {
            let kids = children(member);
            if kids.iter().any(|k| k.kind().contains("factory")) {
                continue;
            }
            let signature = kids.iter().find(|k| {
                matches!(
                    k.kind(),
                    "constant_constructor_signature" | "constructor_signature"
                )
            });
            if let Some(signature) = signature {
                let is_const = signature.kind() == "constant_constructor_signature"
                    || kids.iter().any(|k| self.is_word(*k, "const"));
                let initializers = kids.iter().find(|k| k.kind() == "initializers");
                let initializers = initializers.copied();
                if let Some(ctor) = self.constructor(*signature, initializers, is_const, class_name)
                {
                    decl.constructors.push(ctor);
                }
                continue;
            }
            if member.kind() != "declaration" {
                continue;
            }
            let Some(list) = kids.iter().find(|k| {
                matches!(
                    k.kind(),
                    "static_final_declaration_list" | "initialized_identifier_list"
                )
            }) else {
                continue;
            };
            let is_static = kids.iter().any(|k| self.is_word(*k, "static"));
            let is_const = kids
                .iter()
                .any(|k| self.is_word(*k, "const") || k.kind() == "const_builtin");
            for (name, initializer) in self.variables(*list) {
                decl.fields.push(FieldDecl {
                    name: self.text(name).to_string(),
                    is_static,
                    is_const,
                    initializer,
                });
            }
        }
    }

    fn constructor(
        &self,
        signature: Node,
        initializers: Option<Node>,
        is_const: bool,
        class_name: &str,
    ) -> Option<ConstructorDecl> {
        let mut names = Vec::new();
        let mut params = Vec::new();
        for child in children(signature) {
            if child.kind() == "formal_parameter_list" {
                params = self.parameters(child);
            } else {
                names.extend(
                    self.token_list(child)
                        .into_iter()
                        .filter(|t| is_name(*t))
                        .map(|t| self.text(t)),
                );
            }
        }
        if names.first().copied() != Some(class_name) {
            return None;
        }
        Some(ConstructorDecl {
            name: names.get(1).map(|n| n.to_string()),
            is_const,
            params,
            initializers: initializers
                .map(|node| self.field_initializers(node))
                .unwrap_or_default(),
        })
    }

    fn parameters(&self, list: Node) -> Vec<Parameter> {
        let mut params = Vec::new();
        for child in children(list) {
            match child.kind() {
                "formal_parameter" => {
                    params.extend(self.parameter(child, ParameterKind::Positional, None));
                }
                "optional_formal_parameters" => self.optional_parameters(child, &mut params),
                _ => {}
            }
        }
        params
    }

    fn optional_parameters(&self, node: Node, params: &mut Vec<Parameter>) {
        let kids: Vec<Node> = children(node)
            .into_iter()
            .filter(|k| !is_comment(*k))
            .collect();
        let kind = if kids.first().is_some_and(|k| self.text(*k) == "{") {
            ParameterKind::Named
        } else {
            ParameterKind::OptionalPositional
        };
        let inner: Vec<Node> = kids
            .into_iter()
            .filter(|k| !matches!(k.kind(), "{" | "}" | "[" | "]"))
            .collect();

        for group in split_commas(&inner) {
            let wrapped = group.len() == 1
                && group[0].kind() != "formal_parameter"
                && group[0].named_child_count() > 0;
            let group = if wrapped { children(group[0]) } else { group };
            let Some(formal) = group.iter().find(|n| n.kind() == "formal_parameter") else {
                continue;
            };
            let default = group
                .iter()
                .position(|n| matches!(n.kind(), "=" | ":"))
                .map(|i| self.const_expr(&group[i + 1..]));
            params.extend(self.parameter(*formal, kind, default));
        }
    }

    fn parameter(
        &self,
        node: Node,
        kind: ParameterKind,
        default: Option<ConstExpr>,
    ) -> Option<Parameter> {
        let mut flat = Vec::new();
        for child in children(node) {
            if matches!(child.kind(), "constructor_param" | "super_formal_parameter") {
                flat.extend(children(child));
            } else {
                flat.push(child);
            }
        }

        let mut binding = ParameterBinding::Plain;
        let mut bound_name = None;
        let mut last_identifier = None;
        let mut last_type = None;
        for n in &flat {
            match (n.kind(), self.text(*n)) {
                (_, "this") if n.child_count() == 0 => binding = ParameterBinding::This,
                (_, "super") if n.child_count() == 0 => binding = ParameterBinding::Super,
                ("identifier", text) => {
                    if binding != ParameterBinding::Plain && bound_name.is_none() {
                        bound_name = Some(text);
                    }
                    last_identifier = Some(text);
                }
                ("type_identifier", text) => last_type = Some(text),
                _ => {}
            }
        }

        let name = match binding {
            ParameterBinding::Plain => last_identifier.or(last_type),
            _ => bound_name,
        }?;
        Some(Parameter {
            name: name.to_string(),
            kind,
            binding,
            default,
        })
    }

    /// `field = expr` entries of a constructor initializer list.
    fn field_initializers(&self, node: Node) -> Vec<(String, ConstExpr)> {
        let mut out = Vec::new();
        for entry in named_children(node) {
            let fields = if entry.kind() == "field_initializer" {
                vec![entry]
            } else {
                named_children(entry)
                    .into_iter()
                    .filter(|n| n.kind() == "field_initializer")
                    .collect()
            };
            for field in fields {
                let kids = children(field);
                let Some(eq) = kids.iter().position(|k| k.kind() == "=") else {
                    continue;
                };
                if let Some(name) = kids[..eq].iter().rev().find(|k| is_name(**k)) {
                    out.push((self.text(*name).to_string(), self.const_expr(&kids[eq + 1..])));
                }
            }
        }
        out
    }

    // ---------------------------------------------------------------------
    // Other declarations
    // ---------------------------------------------------------------------

    fn simple_name<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        node.child_by_field_name("name")
            .or_else(|| children(node).into_iter().find(|c| c.kind() == "identifier"))
    }

    fn extension_name<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        if let Some(name) = node.child_by_field_name("name") {
            return Some(name);
        }
        children(node)
            .into_iter()
            .take_while(|c| self.text(*c) != "on" && c.kind() != "extension_body")
            .find(|c| c.kind() == "identifier")
    }

    fn extension_type_name<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        if let Some(name) = node.child_by_field_name("name") {
            return Some(name);
        }
        children(node)
            .into_iter()
            .skip_while(|c| self.text(*c) != "type")
            .skip(1)
            .find(|c| is_name(*c))
    }

    fn typedef<'t>(&self, node: Node<'t>) -> Option<(Node<'t>, DeclarationKind)> {
        let kids = children(node);
        if let Some(eq) = kids.iter().position(|k| k.kind() == "=") {
            let name = kids[..eq].iter().find(|k| is_name(**k)).copied()?;
            let target: Vec<Node> = kids[eq + 1..]
                .iter()
                .copied()
                .filter(|k| k.kind() != ";" && !is_comment(*k))
                .collect();
            let types = self.collect_types(&target);
            let aliased = match types.as_slice() {
                [only] if only.name != "Function" => Some(only.clone()),
                _ => None,
            };
            return Some((name, DeclarationKind::Typedef(aliased)));
        }
        // Legacy `typedef Ret Name(params);`
        let name = kids
            .iter()
            .take_while(|k| !k.kind().contains("parameter") && k.kind() != "(")
            .filter(|k| is_name(**k))
            .last()
            .copied()?;
        Some((name, DeclarationKind::Typedef(None)))
    }

    fn variables<'t>(&self, list: Node<'t>) -> Vec<(Node<'t>, Option<ConstExpr>)> {
        let mut out = Vec::new();
        for child in named_children(list) {
            if child.kind() == "identifier" {
                out.push((child, None));
                continue;
            }
            let kids = children(child);
            let Some(name) = kids.iter().find(|k| k.kind() == "identifier").copied() else {
                continue;
            };
            let initializer = kids
                .iter()
                .position(|k| k.kind() == "=")
                .map(|eq| self.const_expr(&kids[eq + 1..]));
            out.push((name, initializer));
        }
        out
    }

    // ---------------------------------------------------------------------
    // Constant expressions
    // ---------------------------------------------------------------------

    /// The expression spelled by a run of sibling nodes, or
    /// [`ConstExpr::Unsupported`] outside the constant subset.
    fn const_expr(&self, nodes: &[Node]) -> ConstExpr {
        let nodes: Vec<Node> = nodes
            .iter()
            .copied()
            .filter(|n| !is_comment(*n) && n.kind() != ";")
            .skip_while(|n| matches!(self.text(*n), "const" | "new"))
            .collect();

        match nodes.as_slice() {
            [] => ConstExpr::Unsupported,
            [single] => self.single_expr(*single),
            all if all.iter().all(|n| n.kind() == "string_literal") => {
                let mut value = String::new();
                for n in all {
                    match self.single_expr(*n) {
                        ConstExpr::Str(part) => value.push_str(&part),
                        other => return other,
                    }
                }
                ConstExpr::Str(value)
            }
            [first, rest @ ..] if is_name(*first) => self.selector_chain(*first, rest),
            [minus, number] if self.text(*minus) == "-" && is_number(*number) => {
                parse_number(self.text(*number), true)
            }
            _ => ConstExpr::Unsupported,
        }
    }

    fn single_expr(&self, node: Node) -> ConstExpr {
        let text = self.text(node);
        match node.kind() {
            "string_literal" => string_value(text),
            _ if is_number(node) => parse_number(text, false),
            "true" | "false" | "boolean_literal" => match text {
                "true" => ConstExpr::Bool(true),
                "false" => ConstExpr::Bool(false),
                _ => ConstExpr::Unsupported,
            },
            "null_literal" => ConstExpr::Null,
            "list_literal" => self.list_literal(node),
            "identifier" | "type_identifier" => ConstExpr::Ident(vec![text.to_string()]),
            "scoped_identifier" | "qualified" => ConstExpr::Ident(
                self.token_list(node)
                    .into_iter()
                    .filter(|t| is_name(*t))
                    .map(|t| self.text(t).to_string())
                    .collect(),
            ),
            "const_object_expression" | "new_expression" => self.constructor_call(node),
            kind if kind.contains("unary") || kind.contains("prefix") => {
                let operands = named_children(node);
                match operands.last() {
                    Some(number) if text.trim_start().starts_with('-') && is_number(*number) => {
                        parse_number(self.text(*number), true)
                    }
                    _ => ConstExpr::Unsupported,
                }
            }
            _ if node.child_count() == 1 && node.named_child_count() == 1 => {
                match node.named_child(0) {
                    Some(inner) => self.single_expr(inner),
                    None => ConstExpr::Unsupported,
                }
            }
            _ => ConstExpr::Unsupported,
        }
    }

    /// `a.b.c` or `A.named(args)`.
    fn selector_chain(&self, first: Node, rest: &[Node]) -> ConstExpr {
        let mut parts = vec![self.text(first).to_string()];
        for (i, node) in rest.iter().enumerate() {
            let is_last = i + 1 == rest.len();
            let args = if node.kind() == "arguments" {
                Some(*node)
            } else {
                named_children(*node)
                    .into_iter()
                    .find_map(|c| match c.kind() {
                        "arguments" => Some(c),
                        "argument_part" => named_children(c)
                            .into_iter()
                            .find(|a| a.kind() == "arguments"),
                        _ => None,
                    })
            };
            if let Some(args) = args {
                if !is_last {
                    return ConstExpr::Unsupported;
                }
                return ConstExpr::Invocation {
                    target: parts,
                    args: self.arguments(args),
                };
            }
            match node.kind() {
                "." | "type_arguments" => continue,
                "identifier" => {
                    parts.push(self.text(*node).to_string());
                    continue;
                }
                _ => {}
            }
            let tokens = self.token_list(*node);
            match tokens.as_slice() {
                [dot, id] if self.text(*dot) == "." && is_name(*id) => {
                    parts.push(self.text(*id).to_string());
                }
                _ => return ConstExpr::Unsupported,
            }
        }
        ConstExpr::Ident(parts)
    }

    fn constructor_call(&self, node: Node) -> ConstExpr {
        let mut target = Vec::new();
        for child in children(node) {
            match child.kind() {
                "arguments" => {
                    return ConstExpr::Invocation {
                        target,
                        args: self.arguments(child),
                    }
                }
                "type_arguments" => {}
                _ => target.extend(
                    self.token_list(child)
                        .into_iter()
                        .filter(|t| is_name(*t))
                        .map(|t| self.text(t).to_string()),
                ),
            }
        }
        ConstExpr::Unsupported
    }

    fn list_literal(&self, node: Node) -> ConstExpr {
        let inner: Vec<Node> = children(node)
            .into_iter()
            .filter(|c| {
                !is_comment(*c)
                    && !matches!(c.kind(), "[" | "]" | "type_arguments" | "const_builtin")
                    && self.text(*c) != "const"
            })
            .collect();
        if inner
            .iter()
            .any(|c| LIST_CONTROL_KINDS.contains(c.kind()) || self.text(*c) == "...")
        {
            return ConstExpr::Unsupported;
        }
        ConstExpr::List(
            split_commas(&inner)
                .into_iter()
                .filter(|group| !group.is_empty())
                .map(|group| self.const_expr(&group))
                .collect(),
        )
    }

    /// String value of a non-interpolated literal.
    fn plain_string(&self, node: Node) -> Option<String> {
        match string_value(self.text(node)) {
            ConstExpr::Str(value) => Some(value),
            _ => None,
        }
    }
}

/// Groups of nodes between `,` separators.
fn split_commas<'t>(nodes: &[Node<'t>]) -> Vec<Vec<Node<'t>>> {
    let mut groups = vec![Vec::new()];
    for node in nodes {
        if node.kind() == "," {
            groups.push(Vec::new());
        } else if let Some(group) = groups.last_mut() {
            group.push(*node);
        }
    }
    groups
}

/// Decode one or more adjacent string literals as written in source.
fn string_value(text: &str) -> ConstExpr {
    let chars: Vec<char> = text.chars().collect();
    let mut value = String::new();
    let mut interpolated = false;
    let mut i = 0;

    loop {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i + 1 < chars.len() && chars[i] == '/' && chars[i + 1] == '/' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if i + 1 < chars.len() && chars[i] == '/' && chars[i + 1] == '*' {
            i += 2;
            while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            i += 2;
            continue;
        }
        if i >= chars.len() {
            break;
        }

        let raw = chars[i] == 'r';
        if raw {
            i += 1;
        }
        let Some(&quote) = chars.get(i).filter(|c| matches!(c, '\'' | '"')) else {
            return ConstExpr::Unsupported;
        };
        let triple = chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote);
        let width = if triple { 3 } else { 1 };
        i += width;
        if triple {
            if chars.get(i) == Some(&'\r') && chars.get(i + 1) == Some(&'\n') {
                i += 2;
            } else if chars.get(i) == Some(&'\n') {
                i += 1;
            }
        }

        let closes = |at: usize| (0..width).all(|k| chars.get(at + k) == Some(&quote));
        while i < chars.len() && !closes(i) {
            let c = chars[i];
            if raw {
                value.push(c);
                i += 1;
                continue;
            }
            match c {
                '\\' => i = escape(&chars, i + 1, &mut value),
                '$' => {
                    interpolated = true;
                    i = skip_interpolation(&chars, i + 1);
                }
                _ => {
                    value.push(c);
                    i += 1;
                }
            }
        }
        i += width;
    }

    if interpolated {
        ConstExpr::Interpolated
    } else {
        ConstExpr::Str(value)
    }
}

/// Decode the escape starting at `i` (after the backslash); returns the
/// index after it.
fn escape(chars: &[char], i: usize, value: &mut String) -> usize {
    let Some(&c) = chars.get(i) else {
        return i;
    };
    let hex = |from: usize, len: usize| -> Option<char> {
        let digits: String = chars.get(from..from + len)?.iter().collect();
        char::from_u32(u32::from_str_radix(&digits, 16).ok()?)
    };
    match c {
        'n' => value.push('\n'),
        'r' => value.push('\r'),
        't' => value.push('\t'),
        'b' => value.push('\u{8}'),
        'f' => value.push('\u{c}'),
        'v' => value.push('\u{b}'),
        'x' => {
            value.extend(hex(i + 1, 2));
            return i + 3;
        }
        'u' if chars.get(i + 1) == Some(&'{') => {
            let end = chars[i + 2..]
                .iter()
                .position(|c| *c == '}')
                .map(|p| i + 2 + p)
                .unwrap_or(chars.len());
            value.extend(hex(i + 2, end.saturating_sub(i + 2)));
            return end + 1;
        }
        'u' => {
            value.extend(hex(i + 1, 4));
            return i + 5;
        }
        '\r' | '\n' => {}
        other => value.push(other),
    }
    i + 1
}

/// Skip `name` or `{ expr }` after a `$`; returns the index after it.
fn skip_interpolation(chars: &[char], mut i: usize) -> usize {
    if chars.get(i) != Some(&'{') {
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
            i += 1;
        }
        return i;
    }
    let mut depth = 0usize;
    while i < chars.len() {
        match chars[i] {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    i
}

fn parse_number(text: &str, negative: bool) -> ConstExpr {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let sign = if negative { -1 } else { 1 };
    if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16)
            .map(|v| ConstExpr::Int(sign * v))
            .unwrap_or(ConstExpr::Unsupported);
    }
    if cleaned.contains(['.', 'e', 'E']) {
        return cleaned
            .parse::<f64>()
            .map(|v| ConstExpr::Double(sign as f64 * v))
            .unwrap_or(ConstExpr::Unsupported);
    }
    cleaned
        .parse::<i64>()
        .map(|v| ConstExpr::Int(sign * v))
        .unwrap_or(ConstExpr::Unsupported)
}
