//! HTML rendering for extension-suffixed retrievals.
//!
//! The service runs no syntax engine of its own; it emits an escaped code
//! block wired to a client-side highlighter keyed by the extension.

const HIGHLIGHT_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/styles/github-dark.min.css";
const HIGHLIGHT_JS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/highlight.min.js";

/// Build a standalone highlight page for `code`, keyed by `language`.
pub fn highlight_page(code: &str, language: &str) -> String {
    let mut page = String::with_capacity(code.len() + 1024);
    page.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    page.push_str(&format!(
        "<link rel=\"stylesheet\" href=\"{}\">",
        HIGHLIGHT_CSS
    ));
    page.push_str(&format!("<script src=\"{}\"></script>", HIGHLIGHT_JS));
    page.push_str("<style>body{margin:0}pre{margin:0;padding:1em;min-height:100vh}</style>");
    page.push_str("</head><body>");
    page.push_str(&format!(
        "<pre><code class=\"language-{}\">",
        html_escape(language)
    ));
    page.push_str(&html_escape(code));
    page.push_str("</code></pre><script>hljs.highlightAll();</script></body></html>");
    page
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_in_content() {
        let page = highlight_page("<script>alert(1)</script>", "js");
        assert!(!page.contains("<script>alert"));
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn keys_code_block_by_language() {
        let page = highlight_page("x = 1", "py");
        assert!(page.contains("class=\"language-py\""));
        assert!(page.contains("x = 1"));
    }
}
