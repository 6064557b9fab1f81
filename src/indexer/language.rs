//! Language tags derived from file extensions

use std::path::Path;

/// Detect a language tag from a file extension (case-insensitive)
pub fn detect_language(extension: &str) -> Option<&'static str> {
    let lang = match extension.to_lowercase().as_str() {
        "rs" => "Rust",
        "py" | "pyi" => "Python",
        "js" | "mjs" | "cjs" | "jsx" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "java" => "Java",
        "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => "C++",
        "c" | "h" => "C",
        "cs" => "C#",
        "go" => "Go",
        "rb" => "Ruby",
        "php" => "PHP",
        "swift" => "Swift",
        "kt" | "kts" => "Kotlin",
        "sh" | "bash" => "Shell",
        "sql" => "SQL",
        "html" | "htm" => "HTML",
        "css" => "CSS",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "md" | "markdown" => "Markdown",
        "rst" => "reStructuredText",
        "txt" => "Text",
        _ => return None,
    };

    Some(lang)
}

/// Language tag for a path: the detected language, else the lowercase
/// extension, else `"unknown"`.
pub fn language_tag(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => detect_language(ext)
            .map(str::to_string)
            .unwrap_or_else(|| ext.to_lowercase()),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language_default_extensions() {
        assert_eq!(detect_language("py"), Some("Python"));
        assert_eq!(detect_language("js"), Some("JavaScript"));
        assert_eq!(detect_language("java"), Some("Java"));
        assert_eq!(detect_language("ts"), Some("TypeScript"));
        assert_eq!(detect_language("md"), Some("Markdown"));
    }

    #[test]
    fn test_detect_language_case_insensitive() {
        assert_eq!(detect_language("RS"), Some("Rust"));
        assert_eq!(detect_language("Py"), Some("Python"));
    }

    #[test]
    fn test_detect_language_unknown() {
        assert_eq!(detect_language("xyz"), None);
        assert_eq!(detect_language(""), None);
    }

    #[test]
    fn test_language_tag_falls_back_to_extension() {
        assert_eq!(language_tag(Path::new("src/app.py")), "Python");
        assert_eq!(language_tag(Path::new("notes.ADOC")), "adoc");
        assert_eq!(language_tag(Path::new("Makefile")), "unknown");
    }
}
