//! Restricted constant evaluation for annotations.
//!
//! Only what annotation arguments need: literals, lists, references to
//! `const` variables and `static const` fields, and `const` constructor
//! invocations whose fields are set from `this.` parameters, initializer
//! lists or field initializers.

use std::collections::HashMap;
use std::fmt;

use super::{
    AnnotationSyntax, Argument, ClassDecl, ConstExpr, ConstructorDecl, DeclarationKind, ElementId,
    ParameterBinding, ParameterKind, SymbolResolutionProvider,
};
use super::AnalysisContext;

const MAX_DEPTH: usize = 32;

/// An evaluated compile-time constant.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Str(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Null,
    List(Vec<ConstValue>),
    Object {
        type_name: String,
        fields: Vec<(String, ConstValue)>,
    },
}

impl ConstValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a list of strings, if it is exactly that.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            ConstValue::List(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            ConstValue::Str(_) => "String",
            ConstValue::Int(_) => "int",
            ConstValue::Double(_) => "double",
            ConstValue::Bool(_) => "bool",
            ConstValue::Null => "Null",
            ConstValue::List(_) => "List",
            ConstValue::Object { type_name, .. } => type_name,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Str(s) => write!(f, "{:?}", s),
            ConstValue::Int(v) => write!(f, "{}", v),
            ConstValue::Double(v) => write!(f, "{}", v),
            ConstValue::Bool(v) => write!(f, "{}", v),
            ConstValue::Null => write!(f, "null"),
            ConstValue::List(items) => {
                let items: Vec<_> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            ConstValue::Object { type_name, fields } => {
                let fields: Vec<_> = fields
                    .iter()
                    .map(|(name, value)| format!("{}: {}", name, value))
                    .collect();
                write!(f, "{}({})", type_name, fields.join(", "))
            }
        }
    }
}

/// A field of an evaluated annotation. `value` is `None` when the field
/// could not be evaluated to a constant.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationField {
    pub name: String,
    pub value: Option<ConstValue>,
}

/// An annotation resolved to its class and field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub type_name: String,
    /// Instance fields in declaration order. Empty if the annotation did not resolve.
    pub fields: Vec<AnnotationField>,
}

impl Annotation {
    pub fn field(&self, name: &str) -> Option<&AnnotationField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

type Bindings = HashMap<String, Option<ConstValue>>;

/// Evaluation frame: the file whose scope names resolve in, the class whose
/// static members are visible unqualified, and bound constructor parameters.
struct Frame<'b> {
    file: usize,
    class: Option<ElementId>,
    params: Option<&'b Bindings>,
}

pub(crate) struct ConstEvaluator<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> ConstEvaluator<'a> {
    pub(crate) fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    /// Evaluate an annotation attached to a declaration in `file`.
    pub(crate) fn annotation(&self, file: usize, syntax: &AnnotationSyntax) -> Annotation {
        let frame = Frame {
            file,
            class: None,
            params: None,
        };

        let resolved = match &syntax.args {
            Some(args) => self
                .resolve_constructor(file, &syntax.name)
                .and_then(|(class, ctor)| self.instantiate(class, ctor.as_deref(), args, &frame, 0)),
            // `@name` refers to a const variable holding an instance.
            None => match self.evaluate(&ConstExpr::Ident(syntax.name.clone()), &frame, 0) {
                Some(ConstValue::Object { type_name, fields }) => Some((
                    type_name,
                    fields
                        .into_iter()
                        .map(|(name, value)| (name, Some(value)))
                        .collect(),
                )),
                _ => None,
            },
        };

        match resolved {
            Some((type_name, fields)) => Annotation {
                type_name,
                fields: fields
                    .into_iter()
                    .map(|(name, value)| AnnotationField { name, value })
                    .collect(),
            },
            None => Annotation {
                type_name: syntactic_type_name(&syntax.name),
                fields: Vec::new(),
            },
        }
    }

    fn class(&self, id: ElementId) -> Option<(&'a str, &'a ClassDecl)> {
        let decl = self.ctx.declaration(id)?;
        match &decl.kind {
            DeclarationKind::Class(class) => Some((&decl.name, class)),
            _ => None,
        }
    }

    /// `Name`, `Name.ctor`, `prefix.Name` or `prefix.Name.ctor`.
    fn resolve_constructor(
        &self,
        file: usize,
        target: &[String],
    ) -> Option<(ElementId, Option<String>)> {
        let is_class = |id: &ElementId| self.class(*id).is_some();
        match target {
            [name] => self
                .ctx
                .lookup(file, None, name)
                .filter(is_class)
                .map(|id| (id, None)),
            [first, second] => {
                if let Some(id) = self.ctx.lookup(file, None, first).filter(is_class) {
                    Some((id, Some(second.clone())))
                } else {
                    self.ctx
                        .lookup(file, Some(first.as_str()), second)
                        .filter(is_class)
                        .map(|id| (id, None))
                }
            }
            [prefix, name, ctor] => self
                .ctx
                .lookup(file, Some(prefix.as_str()), name)
                .filter(is_class)
                .map(|id| (id, Some(ctor.clone()))),
            _ => None,
        }
    }

    /// Run a const constructor and return the instance's fields.
    fn instantiate(
        &self,
        class_id: ElementId,
        ctor_name: Option<&str>,
        args: &[Argument],
        caller: &Frame<'_>,
        depth: usize,
    ) -> Option<(String, Vec<(String, Option<ConstValue>)>)> {
        if depth > MAX_DEPTH {
            return None;
        }
        let (class_name, class) = self.class(class_id)?;
        let implicit = ConstructorDecl {
            name: None,
            is_const: true,
            params: Vec::new(),
            initializers: Vec::new(),
        };
        let ctor = match class
            .constructors
            .iter()
            .find(|c| c.name.as_deref() == ctor_name)
        {
            Some(ctor) => ctor,
            None if ctor_name.is_none() && class.constructors.is_empty() => &implicit,
            None => return None,
        };

        let mut positional = Vec::new();
        let mut named = HashMap::new();
        for arg in args {
            let value = self.evaluate(&arg.value, caller, depth + 1);
            match &arg.name {
                Some(name) => {
                    named.insert(name.as_str(), value);
                }
                None => positional.push(value),
            }
        }

        let class_frame = Frame {
            file: class_id.file,
            class: Some(class_id),
            params: None,
        };
        let mut bindings = Bindings::new();
        let mut positional = positional.into_iter();
        for param in &ctor.params {
            let supplied = match param.kind {
                ParameterKind::Named => named.remove(param.name.as_str()),
                ParameterKind::Positional | ParameterKind::OptionalPositional => positional.next(),
            };
            let value = match supplied {
                Some(value) => value,
                None => match &param.default {
                    Some(default) => self.evaluate(default, &class_frame, depth + 1),
                    None => Some(ConstValue::Null),
                },
            };
            bindings.insert(param.name.clone(), value);
        }

        let ctor_frame = Frame {
            file: class_id.file,
            class: Some(class_id),
            params: Some(&bindings),
        };
        let fields = class
            .fields
            .iter()
            .filter(|f| !f.is_static)
            .map(|field| {
                let from_param = ctor
                    .params
                    .iter()
                    .find(|p| p.binding == ParameterBinding::This && p.name == field.name);
                let from_initializer = ctor.initializers.iter().find(|(name, _)| *name == field.name);
                let value = if from_param.is_some() {
                    bindings.get(&field.name).cloned().flatten()
                } else if let Some((_, expr)) = from_initializer {
                    self.evaluate(expr, &ctor_frame, depth + 1)
                } else if let Some(expr) = &field.initializer {
                    self.evaluate(expr, &class_frame, depth + 1)
                } else {
                    Some(ConstValue::Null)
                };
                (field.name.clone(), value)
            })
            .collect();

        Some((class_name.to_string(), fields))
    }

    fn evaluate(&self, expr: &ConstExpr, frame: &Frame<'_>, depth: usize) -> Option<ConstValue> {
        if depth > MAX_DEPTH {
            return None;
        }
        match expr {
            ConstExpr::Str(s) => Some(ConstValue::Str(s.clone())),
            ConstExpr::Int(v) => Some(ConstValue::Int(*v)),
            ConstExpr::Double(v) => Some(ConstValue::Double(*v)),
            ConstExpr::Bool(v) => Some(ConstValue::Bool(*v)),
            ConstExpr::Null => Some(ConstValue::Null),
            ConstExpr::List(items) => items
                .iter()
                .map(|item| self.evaluate(item, frame, depth + 1))
                .collect::<Option<Vec<_>>>()
                .map(ConstValue::List),
            ConstExpr::Ident(parts) => self.reference(parts, frame, depth),
            ConstExpr::Invocation { target, args } => {
                let (class, ctor) = self.resolve_constructor(frame.file, target)?;
                let (type_name, fields) =
                    self.instantiate(class, ctor.as_deref(), args, frame, depth + 1)?;
                let fields = fields
                    .into_iter()
                    .map(|(name, value)| value.map(|v| (name, v)))
                    .collect::<Option<Vec<_>>>()?;
                Some(ConstValue::Object { type_name, fields })
            }
            ConstExpr::Interpolated | ConstExpr::Unsupported => None,
        }
    }

    /// Resolve an identifier to a parameter, a static const field or a
    /// top-level const variable.
    fn reference(&self, parts: &[String], frame: &Frame<'_>, depth: usize) -> Option<ConstValue> {
        match parts {
            [name] => {
                if let Some(value) = frame.params.and_then(|p| p.get(name)) {
                    return value.clone();
                }
                if let Some(class) = frame.class {
                    if let Some(value) = self.static_field(class, name, depth) {
                        return Some(value);
                    }
                }
                let id = self.ctx.lookup(frame.file, None, name)?;
                self.top_level_const(id, depth)
            }
            [first, second] => {
                if let Some(id) = self.ctx.lookup(frame.file, None, first) {
                    if self.class(id).is_some() {
                        return self.static_field(id, second, depth);
                    }
                }
                let id = self.ctx.lookup(frame.file, Some(first.as_str()), second)?;
                self.top_level_const(id, depth)
            }
            [prefix, class, field] => {
                let id = self.ctx.lookup(frame.file, Some(prefix.as_str()), class)?;
                self.static_field(id, field, depth)
            }
            _ => None,
        }
    }

    fn top_level_const(&self, id: ElementId, depth: usize) -> Option<ConstValue> {
        let decl = self.ctx.declaration(id)?;
        let DeclarationKind::Variable(var) = &decl.kind else {
            return None;
        };
        if !var.is_const {
            return None;
        }
        let frame = Frame {
            file: id.file,
            class: None,
            params: None,
        };
        self.evaluate(var.initializer.as_ref()?, &frame, depth + 1)
    }

    fn static_field(&self, class_id: ElementId, name: &str, depth: usize) -> Option<ConstValue> {
        let (_, class) = self.class(class_id)?;
        let field = class.field(name).filter(|f| f.is_static && f.is_const)?;
        let frame = Frame {
            file: class_id.file,
            class: Some(class_id),
            params: None,
        };
        self.evaluate(field.initializer.as_ref()?, &frame, depth + 1)
    }
}

/// Best-effort type name of an unresolved annotation: the last dotted part
/// that looks like a type, else the last part.
fn syntactic_type_name(name: &[String]) -> String {
    name.iter()
        .rev()
        .find(|part| part.starts_with(|c: char| c.is_ascii_uppercase()))
        .or_else(|| name.last())
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{BuildOptions, SymbolResolutionProvider};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const ANNOTATIONS: &str = r#"
class Summary {
  const Summary(this.text, {this.audience = Audience.everyone});
  final String text;
  final String audience;
}

class Audience {
  static const String everyone = 'everyone';
}

class Category {
  const Category(List<String> value) : sections = value;
  final List<String> sections;
}

class Flag {
  const Flag();
  final bool enabled = true;
}

const String kLayout = 'Layout';
const Category layoutCategory = Category(<String>[kLayout]);
const flag = Flag();
"#;

    fn annotations_of(source: &str, class: &str) -> Vec<Annotation> {
        let temp = TempDir::new().unwrap();
        let write = |rel: &str, content: &str| {
            let path = temp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        };
        write("pubspec.yaml", "name: ui\n");
        write("lib/annotations.dart", ANNOTATIONS);
        write("lib/subject.dart", source);

        let ctx = AnalysisContext::build(temp.path().join("lib"), &BuildOptions::default())
            .unwrap();
        let file = ctx
            .files()
            .iter()
            .position(|p| p.ends_with(Path::new("subject.dart")))
            .unwrap();
        let unit = ctx.unit(file).unwrap();
        let decl = unit.declarations.iter().find(|d| d.name == class).unwrap();
        decl.annotations
            .iter()
            .map(|a| ctx.evaluate_annotation(file, a))
            .collect()
    }

    fn value<'x>(annotation: &'x Annotation, field: &str) -> Option<&'x ConstValue> {
        annotation.field(field).and_then(|f| f.value.as_ref())
    }

    #[test]
    fn test_this_parameters_and_defaults() {
        let anns = annotations_of(
            "import 'annotations.dart';\n@Summary('  Shows text.  ')\nclass Text {}",
            "Text",
        );
        assert_eq!(anns[0].type_name, "Summary");
        assert_eq!(value(&anns[0], "text").and_then(|v| v.as_str()), Some("  Shows text.  "));
        assert_eq!(value(&anns[0], "audience").and_then(|v| v.as_str()), Some("everyone"));
    }

    #[test]
    fn test_named_arguments_and_initializer_lists() {
        let anns = annotations_of(
            "import 'annotations.dart';\n\
             @Summary('x', audience: 'experts')\n\
             @Category(['Basics', 'Text'])\n\
             class Text {}",
            "Text",
        );
        assert_eq!(value(&anns[0], "audience").and_then(|v| v.as_str()), Some("experts"));
        assert_eq!(
            value(&anns[1], "sections").and_then(|v| v.as_string_list()),
            Some(vec!["Basics".to_string(), "Text".to_string()])
        );
    }

    #[test]
    fn test_const_variable_references() {
        let anns = annotations_of(
            "import 'annotations.dart';\n@layoutCategory\n@flag\nclass Row {}",
            "Row",
        );
        assert_eq!(anns[0].type_name, "Category");
        assert_eq!(
            value(&anns[0], "sections").and_then(|v| v.as_string_list()),
            Some(vec!["Layout".to_string()])
        );
        assert_eq!(anns[1].type_name, "Flag");
        assert_eq!(value(&anns[1], "enabled"), Some(&ConstValue::Bool(true)));
    }

    #[test]
    fn test_prefixed_annotation() {
        let anns = annotations_of(
            "import 'annotations.dart' as a;\n@a.Category(<String>[a.kLayout])\nclass Row {}",
            "Row",
        );
        assert_eq!(
            value(&anns[0], "sections").and_then(|v| v.as_string_list()),
            Some(vec!["Layout".to_string()])
        );
    }

    #[test]
    fn test_unevaluable_field_is_marked() {
        let anns = annotations_of(
            "import 'annotations.dart';\n@Summary('a' + 'b')\n@Category(sections)\nclass Text {}",
            "Text",
        );
        let text = anns[0].field("text").unwrap();
        assert!(text.value.is_none());
        assert!(anns[1].field("sections").unwrap().value.is_none());
    }

    #[test]
    fn test_unresolved_annotation_keeps_name() {
        let anns = annotations_of(
            "import 'package:meta/meta.dart';\n@immutable\n@meta.Deprecated('x')\nclass Text {}",
            "Text",
        );
        assert_eq!(anns[0].type_name, "immutable");
        assert!(anns[0].fields.is_empty());
        assert_eq!(anns[1].type_name, "Deprecated");
    }

    #[test]
    fn test_value_helpers() {
        let list = ConstValue::List(vec![ConstValue::Str("a".into()), ConstValue::Int(1)]);
        assert!(list.as_string_list().is_none());
        assert_eq!(list.type_name(), "List");
        assert_eq!(list.to_string(), "[\"a\", 1]");
    }
}
