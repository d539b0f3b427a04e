//! Fact structures extracted from Dart source.
//!
//! These are purely syntactic: names are unresolved and expressions are
//! unevaluated. Resolution happens in [`AnalysisContext`](super::AnalysisContext).

use std::fmt;

/// Source location of a declaration name (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A parsed compilation unit (one `.dart` file).
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    pub directives: Vec<Directive>,
    pub declarations: Vec<Declaration>,
}

impl CompilationUnit {
    /// The `part of` target if this unit is a fragment of another library.
    pub fn part_of(&self) -> Option<&str> {
        self.directives.iter().find_map(|d| match d {
            Directive::PartOf(target) => Some(target.as_str()),
            _ => None,
        })
    }

    /// Whether this unit is a part rather than a standalone library.
    pub fn is_part(&self) -> bool {
        self.part_of().is_some()
    }
}

/// `show` / `hide` clause on an import or export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Combinator {
    Show(Vec<String>),
    Hide(Vec<String>),
}

impl Combinator {
    /// Apply a chain of combinators to a name.
    pub fn allows(combinators: &[Combinator], name: &str) -> bool {
        combinators.iter().all(|c| match c {
            Combinator::Show(names) => names.iter().any(|n| n == name),
            Combinator::Hide(names) => !names.iter().any(|n| n == name),
        })
    }
}

/// A top-level directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Library(Option<String>),
    Import {
        uri: String,
        prefix: Option<String>,
        combinators: Vec<Combinator>,
    },
    Export {
        uri: String,
        combinators: Vec<Combinator>,
    },
    Part(String),
    /// Either a URI or a dotted library name.
    PartOf(String),
}

/// A reference to a type as written (`prefix.Name<Args>?`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub prefix: Option<String>,
    pub name: String,
    pub type_args: Vec<TypeRef>,
    pub nullable: bool,
}

impl TypeRef {
    pub fn simple(name: &str) -> Self {
        Self {
            prefix: None,
            name: name.to_string(),
            type_args: Vec::new(),
            nullable: false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{}.", prefix)?;
        }
        write!(f, "{}", self.name)?;
        if !self.type_args.is_empty() {
            let args: Vec<String> = self.type_args.iter().map(|t| t.to_string()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// A restricted constant expression.
///
/// Anything outside this grammar parses to [`ConstExpr::Unsupported`] and
/// fails evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstExpr {
    Str(String),
    /// A string literal containing `$` interpolation.
    Interpolated,
    Int(i64),
    Double(f64),
    Bool(bool),
    Null,
    List(Vec<ConstExpr>),
    /// `a`, `prefix.a`, `Class.field`, `prefix.Class.field`.
    Ident(Vec<String>),
    /// `Name(...)`, `Name.named(...)`, `prefix.Name.named(...)`.
    Invocation {
        target: Vec<String>,
        args: Vec<Argument>,
    },
    Unsupported,
}

/// An argument in an invocation or annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: ConstExpr,
}

/// An `@annotation` as written.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSyntax {
    /// Dotted name parts, e.g. `["Category"]` or `["foundation", "Summary"]`.
    pub name: Vec<String>,
    /// `None` for a bare identifier annotation like `@immutable`.
    pub args: Option<Vec<Argument>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Positional,
    OptionalPositional,
    Named,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterBinding {
    Plain,
    /// `this.field`
    This,
    /// `super.field`
    Super,
}

/// A constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub binding: ParameterBinding,
    pub default: Option<ConstExpr>,
}

/// A generative constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    /// `None` for the unnamed constructor.
    pub name: Option<String>,
    pub is_const: bool,
    pub params: Vec<Parameter>,
    /// `field = expr` entries from the initializer list.
    pub initializers: Vec<(String, ConstExpr)>,
}

/// A field declared in a class body.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub is_static: bool,
    pub is_const: bool,
    pub initializer: Option<ConstExpr>,
}

/// Shared shape of `class` and `mixin` declarations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassDecl {
    pub is_abstract: bool,
    pub extends: Option<TypeRef>,
    pub with: Vec<TypeRef>,
    pub implements: Vec<TypeRef>,
    /// Superclass constraints of a mixin declaration.
    pub on: Vec<TypeRef>,
    pub constructors: Vec<ConstructorDecl>,
    pub fields: Vec<FieldDecl>,
}

impl ClassDecl {
    /// All directly named supertypes, in clause order.
    pub fn direct_supertypes(&self) -> impl Iterator<Item = &TypeRef> {
        self.extends
            .iter()
            .chain(self.with.iter())
            .chain(self.implements.iter())
            .chain(self.on.iter())
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A top-level variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub is_const: bool,
    pub initializer: Option<ConstExpr>,
}

/// Kind of declaration, with kind-specific data.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationKind {
    Class(ClassDecl),
    Mixin(ClassDecl),
    Enum,
    Extension,
    ExtensionType,
    /// The aliased type, unless it is a function type.
    Typedef(Option<TypeRef>),
    Function,
    Variable(VariableDecl),
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Class(_) => "class",
            DeclarationKind::Mixin(_) => "mixin",
            DeclarationKind::Enum => "enum",
            DeclarationKind::Extension => "extension",
            DeclarationKind::ExtensionType => "extension type",
            DeclarationKind::Typedef(_) => "typedef",
            DeclarationKind::Function => "function",
            DeclarationKind::Variable(_) => "variable",
        }
    }

    /// Class-like data for classes and mixins.
    pub fn class_like(&self) -> Option<&ClassDecl> {
        match self {
            DeclarationKind::Class(c) | DeclarationKind::Mixin(c) => Some(c),
            _ => None,
        }
    }

    /// Target of a type alias.
    pub fn aliased(&self) -> Option<&TypeRef> {
        match self {
            DeclarationKind::Typedef(target) => target.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    pub span: Span,
    /// Raw doc comment text, lines joined with `\n`.
    pub doc: Option<String>,
    pub annotations: Vec<AnnotationSyntax>,
}

impl Declaration {
    /// Names starting with `_` are library-private.
    pub fn is_private(&self) -> bool {
        self.name.starts_with('_')
    }
}
