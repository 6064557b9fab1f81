use thiserror::Error;
use tree_sitter::{Language, Node, Parser};

/// Why structural parsing did not produce definitions
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("No structural grammar for language: {0}")]
    UnsupportedLanguage(String),

    #[error("Failed to load {language} grammar: {reason}")]
    Grammar { language: String, reason: String },

    #[error("Parser produced no syntax tree for {0}")]
    NoTree(String),

    #[error("{language} source has syntax errors near line {line}")]
    Syntax { language: String, line: usize },
}

/// A top-level definition located in the source text
#[derive(Debug, Clone)]
pub struct AstNode {
    pub kind: String,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub end_line: usize,
}

/// Language tags that have a tree-sitter grammar
pub const STRUCTURED_LANGUAGES: &[&str] = &[
    "Rust",
    "Python",
    "JavaScript",
    "TypeScript",
    "Go",
    "Java",
    "Swift",
    "C",
    "C++",
    "C#",
    "Ruby",
    "PHP",
];

/// Grammar and the node kinds that count as a definition for a language tag
fn grammar_for(language: &str) -> Option<(Language, &'static [&'static str])> {
    let entry: (Language, &'static [&'static str]) = match language {
        "Rust" => (
            tree_sitter_rust::LANGUAGE.into(),
            &[
                "function_item",
                "impl_item",
                "trait_item",
                "struct_item",
                "enum_item",
                "mod_item",
                "const_item",
                "static_item",
                "macro_definition",
                "type_item",
            ],
        ),
        "Python" => (
            tree_sitter_python::LANGUAGE.into(),
            &["function_definition", "class_definition", "decorated_definition"],
        ),
        "JavaScript" => (
            tree_sitter_javascript::LANGUAGE.into(),
            &[
                "function_declaration",
                "class_declaration",
                "generator_function_declaration",
                "lexical_declaration",
                "variable_declaration",
            ],
        ),
        "TypeScript" => (
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            &[
                "function_declaration",
                "class_declaration",
                "abstract_class_declaration",
                "interface_declaration",
                "enum_declaration",
                "type_alias_declaration",
                "lexical_declaration",
                "variable_declaration",
            ],
        ),
        "Go" => (
            tree_sitter_go::LANGUAGE.into(),
            &[
                "function_declaration",
                "method_declaration",
                "type_declaration",
                "const_declaration",
                "var_declaration",
            ],
        ),
        "Java" => (
            tree_sitter_java::LANGUAGE.into(),
            &[
                "class_declaration",
                "interface_declaration",
                "enum_declaration",
                "record_declaration",
            ],
        ),
        "Swift" => (
            tree_sitter_swift::LANGUAGE.into(),
            &[
                "function_declaration",
                "class_declaration",
                "protocol_declaration",
            ],
        ),
        "C" => (
            tree_sitter_c::LANGUAGE.into(),
            &[
                "function_definition",
                "struct_specifier",
                "enum_specifier",
                "union_specifier",
                "type_definition",
                "declaration",
                "preproc_def",
                "preproc_function_def",
            ],
        ),
        "C++" => (
            tree_sitter_cpp::LANGUAGE.into(),
            &[
                "function_definition",
                "class_specifier",
                "struct_specifier",
                "enum_specifier",
                "namespace_definition",
                "template_declaration",
            ],
        ),
        "C#" => (
            tree_sitter_c_sharp::LANGUAGE.into(),
            &[
                "class_declaration",
                "struct_declaration",
                "interface_declaration",
                "enum_declaration",
                "namespace_declaration",
                "record_declaration",
            ],
        ),
        "Ruby" => (
            tree_sitter_ruby::LANGUAGE.into(),
            &["method", "singleton_method", "class", "module"],
        ),
        "PHP" => (
            tree_sitter_php::LANGUAGE_PHP.into(),
            &[
                "function_definition",
                "class_declaration",
                "interface_declaration",
                "trait_declaration",
            ],
        ),
        _ => return None,
    };
    Some(entry)
}

/// AST parser that locates top-level definitions
pub struct AstParser {
    parser: Parser,
    language_name: String,
    target_kinds: &'static [&'static str],
}

impl AstParser {
    /// Create a parser for a language tag (see [`STRUCTURED_LANGUAGES`])
    pub fn new(language: &str) -> Result<Self, ParseError> {
        let (grammar, target_kinds) = grammar_for(language)
            .ok_or_else(|| ParseError::UnsupportedLanguage(language.to_string()))?;

        let mut parser = Parser::new();
        parser
            .set_language(&grammar)
            .map_err(|e| ParseError::Grammar {
                language: language.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            parser,
            language_name: language.to_string(),
            target_kinds,
        })
    }

    /// Parse source code and return its top-level definitions in source order.
    ///
    /// A tree containing syntax errors is rejected as a whole; nested
    /// definitions (methods inside a class) stay inside their parent.
    pub fn top_level_definitions(&mut self, source_code: &str) -> Result<Vec<AstNode>, ParseError> {
        let tree = self
            .parser
            .parse(source_code, None)
            .ok_or_else(|| ParseError::NoTree(self.language_name.clone()))?;

        let root_node = tree.root_node();
        if root_node.has_error() {
            return Err(ParseError::Syntax {
                language: self.language_name.clone(),
                line: first_error_line(root_node),
            });
        }

        let mut nodes = Vec::new();
        let mut cursor = root_node.walk();
        for child in root_node.named_children(&mut cursor) {
            if let Some(definition) = self.as_definition(child) {
                nodes.push(definition);
            }
        }

        Ok(nodes)
    }

    /// Accept a definition directly, or one wrapped in an `export` statement
    fn as_definition(&self, node: Node) -> Option<AstNode> {
        let is_target = self.target_kinds.contains(&node.kind())
            || (node.kind() == "export_statement"
                && node
                    .child_by_field_name("declaration")
                    .is_some_and(|decl| self.target_kinds.contains(&decl.kind())));

        if !is_target {
            return None;
        }

        Some(AstNode {
            kind: node.kind().to_string(),
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: node.start_position().row + 1, // Tree-sitter uses 0-indexed rows
            end_line: node.end_position().row + 1,
        })
    }

    /// Get the language name
    pub fn language_name(&self) -> &str {
        &self.language_name
    }
}

fn first_error_line(node: Node) -> usize {
    if node.is_error() || node.is_missing() {
        return node.start_position().row + 1;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            return first_error_line(child);
        }
    }
    node.start_position().row + 1
}
