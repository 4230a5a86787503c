use std::sync::OnceLock;

use regex::Regex;

struct MarkdownPatterns {
    code_block: Regex,
    inline_code: Regex,
    image: Regex,
    link: Regex,
    header: Regex,
    bold_stars: Regex,
    bold_underscores: Regex,
    italic_star: Regex,
    italic_underscore: Regex,
    unordered_list: Regex,
    ordered_list: Regex,
    blockquote: Regex,
    horizontal_rule: Regex,
    extra_newlines: Regex,
}

fn patterns() -> &'static MarkdownPatterns {
    static PATTERNS: OnceLock<MarkdownPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| MarkdownPatterns {
        code_block: Regex::new(r"```[\s\S]*?```").unwrap(),
        inline_code: Regex::new(r"`[^`]+`").unwrap(),
        image: Regex::new(r"!\[.*?\]\(.*?\)").unwrap(),
        link: Regex::new(r"\[([^\]]+)\]\(.*?\)").unwrap(),
        header: Regex::new(r"(?m)^#{1,6}\s+").unwrap(),
        bold_stars: Regex::new(r"\*\*([^*]+)\*\*").unwrap(),
        bold_underscores: Regex::new(r"__([^_]+)__").unwrap(),
        italic_star: Regex::new(r"\*([^*]+)\*").unwrap(),
        italic_underscore: Regex::new(r"_([^_]+)_").unwrap(),
        unordered_list: Regex::new(r"(?m)^\s*[-*+]\s+").unwrap(),
        ordered_list: Regex::new(r"(?m)^\s*\d+\.\s+").unwrap(),
        blockquote: Regex::new(r"(?m)^\s*>\s+").unwrap(),
        horizontal_rule: Regex::new(r"(?m)^[-*_]{3,}\s*$").unwrap(),
        extra_newlines: Regex::new(r"\n{3,}").unwrap(),
    })
}

/// Strips Markdown syntax from text destined for speech synthesis, keeping
/// the readable content.
pub fn clean_markdown(content: &str) -> String {
    let p = patterns();
    let content = p.code_block.replace_all(content, "");
    let content = p.inline_code.replace_all(&content, "");
    let content = p.image.replace_all(&content, "");
    let content = p.link.replace_all(&content, "$1");
    let content = p.header.replace_all(&content, "");
    let content = p.bold_stars.replace_all(&content, "$1");
    let content = p.bold_underscores.replace_all(&content, "$1");
    let content = p.italic_star.replace_all(&content, "$1");
    let content = p.italic_underscore.replace_all(&content, "$1");
    let content = p.unordered_list.replace_all(&content, "");
    let content = p.ordered_list.replace_all(&content, "");
    let content = p.blockquote.replace_all(&content, "");
    let content = p.horizontal_rule.replace_all(&content, "");
    let content = p.extra_newlines.replace_all(&content, "\n\n");
    content.trim().to_string()
}

/// Prepares an uploaded `.txt`/`.md` file for synthesis. Markdown files are
/// cleaned; plain text is only trimmed.
pub fn prepare_upload_text(content: &str, is_markdown: bool) -> String {
    if is_markdown {
        clean_markdown(content)
    } else {
        content.trim().to_string()
    }
}
