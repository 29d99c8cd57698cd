//! HTML rendering for serve mode.
//!
//! Converts lesson markdown to HTML using comrak with GFM extensions and
//! raw HTML disabled, injects heading anchors, and wraps the result in a
//! page shell carrying the chapter menu as a nav sidebar.

use std::collections::HashMap;

use comrak::{
    format_html,
    nodes::{AstNode, NodeValue},
    parse_document, Arena, Options,
};

use crate::menu::{Chapter, ChapterKind};
use crate::parse;

/// A heading extracted from a lesson for anchor injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingEntry {
    pub level: u8,
    pub text: String,
    /// URL-safe anchor ID, deduplicated within the lesson.
    pub anchor_id: String,
}

/// Comrak options: GFM extensions, raw HTML stripped.
fn make_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.render.unsafe_ = false;
    options
}

/// Minimal HTML entity escaping for text content and attribute values.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Lowercase, keep alphanumerics, map separators to single hyphens.
fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if matches!(c, ' ' | '-' | '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_owned()
}

/// Plain-text content of a heading node, recursively.
fn node_plain_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for child in node.children() {
        match &child.data.borrow().value {
            NodeValue::Text(s) => text.push_str(s),
            NodeValue::Code(c) => text.push_str(&c.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => text.push_str(&node_plain_text(child)),
        }
    }
    text
}

/// Rewrite `<hN>` opening tags to carry the matching anchor IDs.
///
/// Sequential first-occurrence replacement is safe because raw HTML is
/// stripped by comrak, so only generated heading tags can match.
fn inject_heading_ids(html: &str, headings: &[HeadingEntry]) -> String {
    let mut result = html.to_owned();
    for heading in headings {
        let bare = format!("<h{}>", heading.level);
        let with_id = format!("<h{} id=\"{}\">", heading.level, heading.anchor_id);
        result = result.replacen(&bare, &with_id, 1);
    }
    result
}

/// Render lesson markdown to an HTML fragment plus its heading entries.
///
/// Frontmatter is stripped before rendering so it never leaks into the
/// page.
pub fn render_lesson_html(source: &str) -> (String, Vec<HeadingEntry>) {
    let (_, body) = parse::split_frontmatter(source);

    let options = make_options();
    let arena = Arena::new();
    let root = parse_document(&arena, body, &options);

    let mut headings = Vec::new();
    let mut slug_counts: HashMap<String, usize> = HashMap::new();
    for node in root.descendants() {
        let level = match &node.data.borrow().value {
            NodeValue::Heading(h) => h.level,
            _ => continue,
        };
        let text = node_plain_text(node);
        let base = slugify(&text);
        let count = slug_counts.entry(base.clone()).or_insert(0);
        let anchor_id = if *count == 0 {
            base.clone()
        } else {
            format!("{base}-{count}")
        };
        *count += 1;
        headings.push(HeadingEntry {
            level,
            text,
            anchor_id,
        });
    }

    let mut out = Vec::new();
    format_html(root, &options, &mut out).expect("writing HTML to a Vec cannot fail");
    let fragment = String::from_utf8_lossy(&out).into_owned();

    (inject_heading_ids(&fragment, &headings), headings)
}

/// Build the chapter-menu nav fragment: leaf chapters link directly,
/// sections carry a nested lesson list.
pub fn build_nav_html(chapters: &[Chapter]) -> String {
    let mut html = String::from("<nav class=\"sommaire\">\n<ul>\n");
    for chapter in chapters {
        match &chapter.kind {
            ChapterKind::Leaf(lesson) => {
                html.push_str(&format!(
                    "<li class=\"chapitre\"><a class=\"sujet\" href=\"/cours/{}.md\">{}</a></li>\n",
                    lesson.id,
                    html_escape(&chapter.label),
                ));
            }
            ChapterKind::Section(section) => {
                html.push_str(&format!(
                    "<li class=\"chapitre\">{}\n<ul class=\"sous-liste\">\n",
                    html_escape(&chapter.label),
                ));
                for lesson in &section.lessons {
                    html.push_str(&format!(
                        "<li><a class=\"sujet\" href=\"/cours/{}.md\">{}</a></li>\n",
                        lesson.id,
                        html_escape(&lesson.label),
                    ));
                }
                html.push_str("</ul>\n</li>\n");
            }
        }
    }
    html.push_str("</ul>\n</nav>\n");
    html
}

/// Wrap a rendered lesson (or any body fragment) in the full page shell.
pub fn build_page_shell(title: &str, nav_html: &str, body_html: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n\
         <link rel=\"stylesheet\" href=\"/assets/cours.css\">\n\
         </head>\n<body>\n<div class=\"layout\">\n{}\
         <main id=\"contenu-cours\">\n{}</main>\n</div>\n</body>\n</html>\n",
        html_escape(title),
        nav_html,
        body_html,
    )
}

/// Inline error body for a failed lesson load; always names the
/// identifier.
pub fn error_body(id: &str) -> String {
    format!(
        "<p class=\"erreur\">Erreur de chargement du cours : {}</p>\n",
        html_escape(id),
    )
}
