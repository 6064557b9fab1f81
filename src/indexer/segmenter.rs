//! Language-aware pre-segmentation of file text

use super::ast_parser::{AstParser, ParseError, STRUCTURED_LANGUAGES};
use std::ops::Range;
use std::collections::HashMap;

/// How a language's text is cut into segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStrategy {
    /// One segment per top-level function/class definition; text outside
    /// them is not indexed
    TopLevelDefinitions,
    /// One segment per top-level definition plus one per run of other text
    /// between them, so the segments cover every non-blank line of the file
    CoveringDefinitions,
    /// The entire file is one segment
    WholeFile,
}

/// Closed lookup table from language tag to segmentation strategy
#[derive(Debug, Clone)]
pub struct Segmenter {
    strategies: HashMap<String, SegmentStrategy>,
    default: SegmentStrategy,
}

impl Segmenter {
    /// Python keeps definitions only; every other language with a grammar
    /// keeps the text between definitions too; the rest are whole-file
    pub fn new() -> Self {
        let strategies = STRUCTURED_LANGUAGES
            .iter()
            .map(|lang| {
                let strategy = if *lang == "Python" {
                    SegmentStrategy::TopLevelDefinitions
                } else {
                    SegmentStrategy::CoveringDefinitions
                };
                (lang.to_string(), strategy)
            })
            .collect();
        Self {
            strategies,
            default: SegmentStrategy::WholeFile,
        }
    }

    /// Override the strategy for one language tag
    pub fn with_strategy(mut self, language: &str, strategy: SegmentStrategy) -> Self {
        self.strategies.insert(language.to_string(), strategy);
        self
    }

    pub fn strategy_for(&self, language: &str) -> SegmentStrategy {
        self.strategies.get(language).copied().unwrap_or(self.default)
    }

    /// Split `text` into ordered segments.
    ///
    /// Whitespace-only text yields no segments. Parse failures never escape:
    /// they degrade to a single whole-file segment.
    pub fn segment<'a>(&self, text: &'a str, language: &str) -> Vec<&'a str> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let strategy = self.strategy_for(language);
        if strategy == SegmentStrategy::WholeFile {
            return vec![text];
        }

        match definition_spans(text, language) {
            Ok(spans) if spans.is_empty() => {
                tracing::debug!("No top-level definitions in {} source", language);
                vec![text]
            }
            Ok(spans) if strategy == SegmentStrategy::CoveringDefinitions => {
                with_gaps(text, &spans)
            }
            Ok(spans) => spans
                .into_iter()
                .filter_map(|span| text.get(span))
                .filter(|segment| !segment.trim().is_empty())
                .collect(),
            Err(e) => {
                tracing::warn!("Falling back to whole-file segment: {}", e);
                vec![text]
            }
        }
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

fn definition_spans(text: &str, language: &str) -> Result<Vec<Range<usize>>, ParseError> {
    let mut parser = AstParser::new(language)?;
    let nodes = parser.top_level_definitions(text)?;
    Ok(nodes
        .iter()
        .map(|node| node.start_byte..node.end_byte)
        .collect())
}

/// Definitions in source order, each run of non-blank text between them
/// becoming a segment of its own
fn with_gaps<'a>(text: &'a str, spans: &[Range<usize>]) -> Vec<&'a str> {
    let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
    let mut cursor = 0;

    for span in spans {
        let start = span.start.max(cursor);
        push_trimmed(&mut segments, text.get(cursor..start));
        push_trimmed(&mut segments, text.get(start..span.end));
        cursor = cursor.max(span.end);
    }
    push_trimmed(&mut segments, text.get(cursor..));

    segments
}

fn push_trimmed<'a>(segments: &mut Vec<&'a str>, piece: Option<&'a str>) {
    if let Some(piece) = piece.map(str::trim)
        && !piece.is_empty()
    {
        segments.push(piece);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_lookup() {
        let segmenter = Segmenter::new();
        assert_eq!(
            segmenter.strategy_for("Python"),
            SegmentStrategy::TopLevelDefinitions
        );
        assert_eq!(
            segmenter.strategy_for("Rust"),
            SegmentStrategy::CoveringDefinitions
        );
        assert_eq!(segmenter.strategy_for("Markdown"), SegmentStrategy::WholeFile);
        assert_eq!(segmenter.strategy_for("adoc"), SegmentStrategy::WholeFile);
    }

    #[test]
    fn test_strategy_override() {
        let segmenter = Segmenter::new().with_strategy("Python", SegmentStrategy::WholeFile);
        assert_eq!(segmenter.strategy_for("Python"), SegmentStrategy::WholeFile);
    }

    #[test]
    fn test_python_one_segment_per_definition() {
        let source = "import os\n\ndef a():\n    return 1\n\nclass B:\n    def c(self):\n        pass\n";
        let segments = Segmenter::new().segment(source, "Python");
        assert_eq!(
            segments,
            vec!["def a():\n    return 1", "class B:\n    def c(self):\n        pass"]
        );
    }

    #[test]
    fn test_python_parse_failure_falls_back_to_whole_file() {
        let source = "def broken(:\n    pass\n";
        let segments = Segmenter::new().segment(source, "Python");
        assert_eq!(segments, vec![source]);
    }

    #[test]
    fn test_python_without_definitions_falls_back_to_whole_file() {
        let source = "x = 1\ny = x + 1\n";
        let segments = Segmenter::new().segment(source, "Python");
        assert_eq!(segments, vec![source]);
    }

    #[test]
    fn test_markdown_is_whole_file() {
        let source = "# Title\n\nSome text.\n\n## Section\n\nMore text.\n";
        let segments = Segmenter::new().segment(source, "Markdown");
        assert_eq!(segments, vec![source]);
    }

    #[test]
    fn test_javascript_keeps_arrow_functions() {
        let source = "export const handler = async (event) => {\n  return event.body;\n};\n\nconst helper = (x) => x * 2;\n\nclass Config {\n  load() { return 1; }\n}\n";
        let segments = Segmenter::new().segment(source, "JavaScript");
        assert_eq!(
            segments,
            vec![
                "export const handler = async (event) => {\n  return event.body;\n};",
                "const helper = (x) => x * 2;",
                "class Config {\n  load() { return 1; }\n}",
            ]
        );
    }

    #[test]
    fn test_rust_segments_cover_every_token() {
        let source = r#"//! Demo module
use std::collections::HashMap;

const LIMIT: usize = 10;

macro_rules! square {
    ($x:expr) => {
        $x * $x
    };
}

static NAME: &str = "demo";

extern crate alloc;

fn main() {
    let m: HashMap<u8, u8> = HashMap::new();
    println!("{} {}", square!(LIMIT), m.len());
}
"#;
        let segments = Segmenter::new().segment(source, "Rust");
        assert!(segments.len() > 1);
        assert!(segments.iter().any(|s| s.contains("use std::collections::HashMap;")));
        assert!(segments.iter().any(|s| s.starts_with("extern crate alloc")));

        let covered: Vec<&str> = segments.iter().flat_map(|s| s.split_whitespace()).collect();
        let expected: Vec<&str> = source.split_whitespace().collect();
        assert_eq!(covered, expected);
    }

    #[test]
    fn test_go_segments_cover_every_token() {
        let source = "package main\n\nimport \"fmt\"\n\nconst Max = 3\n\nvar counter int\n\nfunc main() {\n\tfmt.Println(Max, counter)\n}\n";
        let segments = Segmenter::new().segment(source, "Go");
        assert!(segments.contains(&"const Max = 3"));
        assert!(segments.contains(&"var counter int"));

        let covered: Vec<&str> = segments.iter().flat_map(|s| s.split_whitespace()).collect();
        let expected: Vec<&str> = source.split_whitespace().collect();
        assert_eq!(covered, expected);
    }

    #[test]
    fn test_python_drops_text_outside_definitions() {
        let source = "import os\n\ndef a():\n    return 1\n";
        let segments = Segmenter::new().segment(source, "Python");
        assert_eq!(segments, vec!["def a():\n    return 1"]);
    }

    #[test]
    fn test_empty_and_whitespace_yield_nothing() {
        let segmenter = Segmenter::new();
        assert!(segmenter.segment("", "Python").is_empty());
        assert!(segmenter.segment("  \n\t\n", "Markdown").is_empty());
    }
}
