//! Small, tolerant HTML helpers shared by the HTML page-parser connectors.
//!
//! Per the design notes, a compact selector-based/regex extractor is
//! preferred over pulling in a full DOM parser; these helpers are the
//! common denominator every HTML connector builds its selector map on top
//! of.

use std::collections::HashSet;

use regex::Regex;
use url::Url;

/// Extract all `href` targets from an HTML document, resolved against
/// `base_url`. Skips fragments, `javascript:`, `mailto:`, and `tel:` links.
/// De-duplicates by resolved URL.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let re = Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).unwrap();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for cap in re.captures_iter(html) {
        let href = &cap[1];
        if href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }
        if let Ok(resolved) = base_url.join(href) {
            let resolved = resolved.to_string();
            if seen.insert(resolved.clone()) {
                out.push(resolved);
            }
        }
    }

    out
}

/// Anchor text + resolved href pairs, for connectors that need the link
/// label to decide whether an anchor looks like a job posting.
pub fn extract_anchors(html: &str, base_url: &Url) -> Vec<(String, String)> {
    let re = Regex::new(r#"(?is)<a\s+[^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#).unwrap();
    let mut out = Vec::new();

    for cap in re.captures_iter(html) {
        let href = &cap[1];
        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:")
        {
            continue;
        }
        if let Ok(resolved) = base_url.join(href) {
            let text = strip_tags(&cap[2]);
            out.push((text.trim().to_string(), resolved.to_string()));
        }
    }

    out
}

/// Strip all tags, leaving the textual content, collapsing whitespace.
pub fn strip_tags(html: &str) -> String {
    let tag_re = Regex::new(r"(?s)<[^>]*>").unwrap();
    let collapsed = tag_re.replace_all(html, " ");
    let whitespace_re = Regex::new(r"\s+").unwrap();
    whitespace_re.replace_all(&collapsed, " ").trim().to_string()
}

/// A small, tolerant HTML-to-markdown-ish conversion: strips `<script>`
/// and `<style>`, converts headings/paragraphs/breaks/anchors/list items,
/// decodes common entities, and collapses runs of blank lines.
pub fn html_to_markdown(html: &str) -> String {
    let mut text = html.to_string();

    text = Regex::new(r"(?is)<script[^>]*>.*?</script>")
        .unwrap()
        .replace_all(&text, "")
        .to_string();
    text = Regex::new(r"(?is)<style[^>]*>.*?</style>")
        .unwrap()
        .replace_all(&text, "")
        .to_string();

    for (level, prefix) in [(1, "#"), (2, "##"), (3, "###")] {
        let re = Regex::new(&format!(r"(?is)<h{}[^>]*>(.*?)</h{}>", level, level)).unwrap();
        text = re
            .replace_all(&text, |caps: &regex::Captures| {
                format!("\n{} {}\n", prefix, strip_tags(&caps[1]))
            })
            .to_string();
    }

    text = Regex::new(r"(?is)<a\s+[^>]*href\s*=\s*[\"']([^\"']+)[\"'][^>]*>(.*?)</a>")
        .unwrap()
        .replace_all(&text, |caps: &regex::Captures| {
            format!("[{}]({})", strip_tags(&caps[2]), &caps[1])
        })
        .to_string();

    text = Regex::new(r"(?is)<li[^>]*>(.*?)</li>")
        .unwrap()
        .replace_all(&text, |caps: &regex::Captures| {
            format!("- {}\n", strip_tags(&caps[1]))
        })
        .to_string();

    text = Regex::new(r"(?is)<br\s*/?>").unwrap().replace_all(&text, "\n").to_string();
    text = Regex::new(r"(?is)<p[^>]*>(.*?)</p>")
        .unwrap()
        .replace_all(&text, |caps: &regex::Captures| {
            format!("{}\n\n", strip_tags(&caps[1]))
        })
        .to_string();

    text = strip_tags(&text);

    text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    let collapse_blank_lines = Regex::new(r"\n{3,}").unwrap();
    collapse_blank_lines.replace_all(&text, "\n\n").trim().to_string()
}

/// Extract the document `<title>`, if present.
pub fn extract_title(html: &str) -> Option<String> {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>")
        .unwrap()
        .captures(html)
        .map(|caps| strip_tags(&caps[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://careers.example.com/jobs").unwrap()
    }

    #[test]
    fn extracts_and_dedupes_links() {
        let html = r#"<a href="/jobs/123">A</a><a href="/jobs/123">B</a><a href="#top">C</a><a href="mailto:x@y.com">D</a>"#;
        let links = extract_links(html, &base());
        assert_eq!(links, vec!["https://careers.example.com/jobs/123"]);
    }

    #[test]
    fn converts_headings_and_paragraphs() {
        let html = "<h1>Senior Engineer</h1><p>Join our team.</p>";
        let md = html_to_markdown(html);
        assert!(md.contains("# Senior Engineer"));
        assert!(md.contains("Join our team."));
    }

    #[test]
    fn extracts_title() {
        let html = "<html><head><title>Careers at Acme</title></head></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Careers at Acme"));
    }

    #[test]
    fn decodes_entities() {
        let html = "<p>R&amp;D &mdash; Acme&#39;s team</p>";
        let md = html_to_markdown(html);
        assert!(md.contains("R&D"));
    }
}
