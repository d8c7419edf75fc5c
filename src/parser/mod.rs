//! Tree-sitter syntax tree source.
//!
//! Parses source files into the generic [`SyntaxNode`] shape consumed by the
//! analysis engine. Only named children are kept, matching the JSON dumps the
//! engine reads.

use phf::phf_map;
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Language, Node, Parser as TsParser};

use crate::tree::{Position, SyntaxNode};

/// File extension (no dot) to grammar name.
static GRAMMARS: phf::Map<&'static str, &'static str> = phf_map! {
    "py" => "python",
    "js" => "javascript",
    "jsx" => "javascript",
    "mjs" => "javascript",
    "cjs" => "javascript",
    "ts" => "typescript",
    "tsx" => "tsx",
    "java" => "java",
    "go" => "go",
    "c" => "c",
    "h" => "c",
    "cpp" => "cpp",
    "cc" => "cpp",
    "cxx" => "cpp",
    "hpp" => "cpp",
    "rs" => "rust",
    "scala" => "scala",
    "swift" => "swift",
};

/// Grammar name for a file extension, if one is bundled.
pub fn grammar_for_extension(ext: &str) -> Option<&'static str> {
    GRAMMARS.get(ext.to_ascii_lowercase().as_str()).copied()
}

pub fn is_supported_extension(ext: &str) -> bool {
    grammar_for_extension(ext).is_some()
}

fn language(grammar: &str) -> Option<Language> {
    let lang: Language = match grammar {
        "python" => tree_sitter_python::LANGUAGE.into(),
        "javascript" => tree_sitter_javascript::LANGUAGE.into(),
        "typescript" => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        "tsx" => tree_sitter_typescript::LANGUAGE_TSX.into(),
        "java" => tree_sitter_java::LANGUAGE.into(),
        "go" => tree_sitter_go::LANGUAGE.into(),
        "c" => tree_sitter_c::LANGUAGE.into(),
        "cpp" => tree_sitter_cpp::LANGUAGE.into(),
        "rust" => tree_sitter_rust::LANGUAGE.into(),
        "scala" => tree_sitter_scala::LANGUAGE.into(),
        "swift" => tree_sitter_swift::LANGUAGE.into(),
        _ => return None,
    };
    Some(lang)
}

/// Parse `source` with the grammar registered for `ext`.
pub fn parse_source(ext: &str, source: &[u8]) -> anyhow::Result<SyntaxNode> {
    let grammar = grammar_for_extension(ext)
        .ok_or_else(|| anyhow::anyhow!("no grammar for extension {:?}", ext))?;
    let language =
        language(grammar).ok_or_else(|| anyhow::anyhow!("grammar {} is not bundled", grammar))?;

    let mut parser = TsParser::new();
    parser.set_language(&language)?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| anyhow::anyhow!("failed to parse source"))?;
    Ok(convert(tree.root_node(), source))
}

/// Parse one file on disk.
pub fn parse_file(path: &Path) -> anyhow::Result<SyntaxNode> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let source = fs::read(path)?;
    parse_source(ext, &source)
}

/// Output location for `<root>/<rel>`: `<out_dir>/<rel>.json`.
pub fn output_path(out_dir: &Path, rel_path: &str) -> PathBuf {
    out_dir.join(format!("{}.json", rel_path))
}

fn convert(node: Node<'_>, source: &[u8]) -> SyntaxNode {
    let start = node.start_position();
    let end = node.end_position();
    let text = source
        .get(node.byte_range())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default();

    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .map(|child| convert(child, source))
        .collect();

    SyntaxNode {
        kind: node.kind().to_string(),
        text,
        start_position: Position::new(start.row, start.column),
        end_position: Position::new(end.row, end.column),
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::find_nodes_by_type;

    #[test]
    fn test_grammar_lookup() {
        assert_eq!(grammar_for_extension("py"), Some("python"));
        assert_eq!(grammar_for_extension("TSX"), Some("tsx"));
        assert_eq!(grammar_for_extension("kt"), None);
        assert!(is_supported_extension("rs"));
    }

    #[test]
    fn test_every_grammar_loads() {
        for grammar in GRAMMARS.values() {
            assert!(language(grammar).is_some(), "missing grammar {}", grammar);
        }
    }

    #[test]
    fn test_parse_python() {
        let source = b"import os\n\ndef main():\n    if os.name:\n        pass";
        let tree = parse_source("py", source).unwrap();
        assert_eq!(tree.kind, "module");
        assert_eq!(tree.start_position.row, 0);
        assert_eq!(tree.line_span(), 5);

        let import = find_nodes_by_type(&tree, "import_statement").next().unwrap();
        assert_eq!(import.text, "import os");
        assert_eq!(import.children[0].kind, "dotted_name");
        assert_eq!(find_nodes_by_type(&tree, "if_statement").count(), 1);
    }

    #[test]
    fn test_parse_skips_anonymous_nodes() {
        let tree = parse_source("js", b"let x = 1;").unwrap();
        // Punctuation like `=` and `;` is anonymous
        assert!(find_nodes_by_type(&tree, ";").next().is_none());
        assert!(find_nodes_by_type(&tree, "number").next().is_some());
    }

    #[test]
    fn test_parse_unknown_extension() {
        assert!(parse_source("kt", b"fun main() {}").is_err());
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("out"), "pkg/app.py"),
            Path::new("out").join("pkg/app.py.json")
        );
    }
}
