//! Document Name Encoding
//!
//! Source keys encode wiki namespaces and subpages in file-safe form:
//! `___` is the namespace separator, `---` the subpage separator, and the
//! `.wikitext` file marker is dropped. Dots are reserved in generated names.

pub const WIKITEXT_SUFFIX: &str = ".wikitext";
pub const NAMESPACE_SEPARATOR: &str = "___";
pub const SUBPAGE_SEPARATOR: &str = "---";

pub fn strip_wikitext_suffix(name: &str) -> &str {
    name.strip_suffix(WIKITEXT_SUFFIX).unwrap_or(name)
}

/// `Foo___Bar---Baz.wikitext` -> `Foo:Bar/Baz`
pub fn decode_page_name(source: &str) -> String {
    strip_wikitext_suffix(source)
        .replace(NAMESPACE_SEPARATOR, ":")
        .replace(SUBPAGE_SEPARATOR, "/")
}

/// Pre-authored category and template names only carry subpages.
pub fn decode_subpages(source: &str) -> String {
    strip_wikitext_suffix(source).replace(SUBPAGE_SEPARATOR, "/")
}

pub fn category_page_name(source: &str) -> String {
    format!("category:{}", decode_subpages(source))
}

pub fn template_page_name(source: &str) -> String {
    format!("template:{}", decode_subpages(source))
}

pub fn escape_generated_name(name: &str) -> String {
    name.replace('.', "-")
}
