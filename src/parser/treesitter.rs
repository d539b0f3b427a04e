//! Tree-sitter based parser implementation.
//!
//! A [`TreeSitterParser`] parses source into a syntax tree and runs one
//! query that captures the top-level nodes a language cares about. Turning
//! those nodes into facts is left to the language module.

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser as TsParser, Query, QueryCursor, Tree};

use super::ParseError;

/// Defines which top-level node kind a capture stands for.
#[derive(Debug, Clone)]
pub struct NodeCapture {
    /// Node kind in the grammar (e.g., "class_definition")
    pub node_kind: &'static str,
    /// Capture name handed back to the caller (e.g., "class")
    pub capture: &'static str,
}

/// Configuration for a tree-sitter language parser.
#[derive(Clone)]
pub struct Config {
    /// The tree-sitter language
    pub language: Language,
    /// Language name (e.g., "dart")
    pub language_name: &'static str,
    /// Kind of the root node the captures are children of
    pub root_kind: &'static str,
    /// Top-level node kinds to capture
    pub captures: &'static [NodeCapture],
}

/// A captured top-level node.
#[derive(Debug, Clone, Copy)]
pub struct Captured<'t> {
    pub capture: &'static str,
    pub node: Node<'t>,
}

/// Tree-sitter based parser.
pub struct TreeSitterParser {
    config: Config,
    query: Query,
}

impl TreeSitterParser {
    /// Create a parser and compile its capture query.
    ///
    /// Node kinds the loaded grammar does not define are left out of the
    /// query, so one configuration works across grammar revisions.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let patterns: Vec<String> = config
            .captures
            .iter()
            .filter(|c| config.language.id_for_node_kind(c.node_kind, true) != 0)
            .map(|c| format!("({} ({}) @{})", config.root_kind, c.node_kind, c.capture))
            .collect();
        if patterns.is_empty() {
            anyhow::bail!(
                "{} grammar defines none of the configured node kinds",
                config.language_name
            );
        }
        let query = Query::new(&config.language, &patterns.join("\n"))?;
        Ok(Self { config, query })
    }

    pub fn language(&self) -> &str {
        self.config.language_name
    }

    /// Parse source code and return the tree, failing on any syntax error.
    pub fn parse(&self, source: &[u8]) -> Result<Tree, ParseError> {
        let mut parser = TsParser::new();
        parser.set_language(&self.config.language).map_err(|e| {
            ParseError::new(1, 1, format!("cannot load {} grammar: {}", self.language(), e))
        })?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseError::new(1, 1, "failed to parse source"))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(first_error(root, source));
        }
        Ok(tree)
    }

    /// Captured top-level nodes in source order.
    pub fn captures<'t>(&self, tree: &'t Tree, source: &[u8]) -> Vec<Captured<'t>> {
        let names = self.query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, tree.root_node(), source);

        let mut out = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let name = names[capture.index as usize];
                if let Some(c) = self.config.captures.iter().find(|c| c.capture == name) {
                    out.push(Captured {
                        capture: c.capture,
                        node: capture.node,
                    });
                }
            }
        }
        out.sort_by_key(|c| c.node.start_byte());
        out.dedup_by_key(|c| c.node.id());
        out
    }
}

/// The first `ERROR` or `MISSING` node in document order.
fn first_error(root: Node, source: &[u8]) -> ParseError {
    let mut node = root;
    'descend: loop {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.is_error() || child.is_missing() {
                return error_at(child, source);
            }
            if child.has_error() {
                node = child;
                continue 'descend;
            }
        }
        return error_at(node, source);
    }
}

fn error_at(node: Node, source: &[u8]) -> ParseError {
    let pos = node.start_position();
    let message = if node.is_missing() {
        format!("expected '{}'", node.kind())
    } else if node.start_byte() >= source.len() {
        "unexpected end of file".to_string()
    } else {
        let text = node.utf8_text(source).unwrap_or("");
        let first = text.split_whitespace().next().unwrap_or(text);
        let shown: String = first.chars().take(24).collect();
        format!("unexpected '{}'", shown)
    };
    ParseError::new(pos.row + 1, pos.column + 1, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> TreeSitterParser {
        TreeSitterParser::new(Config {
            language: tree_sitter_dart::LANGUAGE.into(),
            language_name: "dart",
            root_kind: "program",
            captures: &[
                NodeCapture {
                    node_kind: "class_definition",
                    capture: "class",
                },
                NodeCapture {
                    node_kind: "no_such_node_kind",
                    capture: "missing",
                },
            ],
        })
        .unwrap()
    }

    #[test]
    fn test_unknown_node_kinds_are_skipped() {
        let parser = parser();
        let source = b"class A {}\nclass B extends A {}\n";
        let tree = parser.parse(source).unwrap();
        let captures = parser.captures(&tree, source);
        assert_eq!(captures.len(), 2);
        assert!(captures.iter().all(|c| c.capture == "class"));
        assert!(captures[0].node.start_byte() < captures[1].node.start_byte());
    }

    #[test]
    fn test_syntax_error_position() {
        let err = parser().parse(b"class A {}\nclass B extends {\n").unwrap_err();
        assert!(err.line >= 2, "{}", err);
    }
}
