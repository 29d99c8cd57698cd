//! Terminal rendering of parsed lessons.
//!
//! Converts a [`ParsedLesson`] into styled ratatui [`Text`], reflowed at
//! the zoomed wrap width. Also builds the welcome and error panes so the
//! content pane always displays exactly one of the three.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
};

use crate::parse::{Block, BlockKind, ParsedLesson};

/// A heading's position in the rendered output, for the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingLine {
    pub level: u8,
    pub text: String,
    /// 0-based line index in the rendered text.
    pub line: usize,
}

/// A lesson rendered at a specific wrap width.
#[derive(Debug, Clone)]
pub struct RenderedLesson {
    pub text: Text<'static>,
    pub headings: Vec<HeadingLine>,
}

/// Render a parsed lesson, wrapping prose at `width` columns.
pub fn render_lesson(lesson: &ParsedLesson, width: u16) -> RenderedLesson {
    let width = width.max(1) as usize;
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut headings: Vec<HeadingLine> = Vec::new();

    for (i, block) in lesson.blocks.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        if let BlockKind::Heading(level) = block.kind {
            headings.push(HeadingLine {
                level,
                text: block.content.replace('\n', " "),
                line: lines.len(),
            });
        }
        render_block(block, width, &mut lines);
    }

    RenderedLesson {
        text: Text::from(lines),
        headings,
    }
}

/// The pane shown before any lesson is loaded.
pub fn welcome_text() -> Text<'static> {
    Text::from(vec![
        Line::default(),
        Line::from(Span::styled(
            "  Choisissez un cours dans le sommaire.",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
        Line::default(),
        Line::from(Span::raw(
            "  Enter opens a chapter or lesson, s toggles the sommaire,",
        )),
        Line::from(Span::raw("  + / - / 0 control the zoom, q quits.")),
    ])
}

/// The pane shown when a lesson failed to load; always names the
/// identifier.
pub fn error_text(id: &str) -> Text<'static> {
    let style = Style::default().fg(Color::Red).add_modifier(Modifier::BOLD);
    Text::from(vec![
        Line::default(),
        Line::from(Span::styled(
            format!("  Erreur de chargement du cours : {id}"),
            style,
        )),
    ])
}

fn heading_style(level: u8) -> Style {
    let base = Style::default().add_modifier(Modifier::BOLD);
    match level {
        1 => base.fg(Color::Magenta),
        2 => base.fg(Color::Cyan),
        3 => base.fg(Color::Green),
        _ => base.fg(Color::Yellow),
    }
}

fn render_block(block: &Block, width: usize, lines: &mut Vec<Line<'static>>) {
    match block.kind {
        BlockKind::Heading(level) => {
            let style = heading_style(level);
            let prefix = "#".repeat(level as usize);
            for wrapped in textwrap::wrap(&block.content.replace('\n', " "), width) {
                lines.push(Line::from(Span::styled(
                    format!("{prefix} {wrapped}"),
                    style,
                )));
            }
        }
        BlockKind::Paragraph => {
            for source_line in block.content.lines() {
                for wrapped in textwrap::wrap(source_line, width) {
                    lines.push(Line::from(Span::raw(wrapped.into_owned())));
                }
            }
        }
        BlockKind::CodeBlock => {
            let border = Style::default().fg(Color::DarkGray);
            let code = Style::default().fg(Color::Green);
            lines.push(Line::from(Span::styled("\u{250c}\u{2500}\u{2500}", border)));
            for source_line in block.content.lines() {
                lines.push(Line::from(vec![
                    Span::styled("\u{2502} ", border),
                    Span::styled(source_line.to_owned(), code),
                ]));
            }
            lines.push(Line::from(Span::styled("\u{2514}\u{2500}\u{2500}", border)));
        }
        BlockKind::List => {
            let bullet = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
            let item_width = width.saturating_sub(4).max(1);
            for item in block.content.lines() {
                let trimmed = item.trim();
                if trimmed.is_empty() {
                    continue;
                }
                for (wi, wrapped) in textwrap::wrap(trimmed, item_width).iter().enumerate() {
                    let marker = if wi == 0 { "  \u{2022} " } else { "    " };
                    lines.push(Line::from(vec![
                        Span::styled(marker, bullet),
                        Span::raw(wrapped.to_string()),
                    ]));
                }
            }
        }
        BlockKind::BlockQuote => {
            let bar = Style::default().fg(Color::DarkGray);
            let body = Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC);
            let quote_width = width.saturating_sub(4).max(1);
            for source_line in block.content.lines() {
                for wrapped in textwrap::wrap(source_line, quote_width) {
                    lines.push(Line::from(vec![
                        Span::styled("  \u{258c} ", bar),
                        Span::styled(wrapped.into_owned(), body),
                    ]));
                }
            }
        }
        BlockKind::ThematicBreak => {
            lines.push(Line::from(Span::styled(
                "\u{2500}".repeat(width.min(40)),
                Style::default().fg(Color::DarkGray),
            )));
        }
        BlockKind::Table => {
            for source_line in block.content.lines() {
                let trimmed = source_line.trim();
                if !trimmed.is_empty() {
                    lines.push(Line::from(Span::raw(format!("  {trimmed}"))));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn joined(text: &Text<'_>) -> String {
        text.lines
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn heading_rendered_with_marker_and_position() {
        let lesson = parse::parse("# Title\n\nbody\n");
        let rendered = render_lesson(&lesson, 80);
        assert!(rendered.text.lines[0].to_string().contains("# Title"));
        assert_eq!(rendered.headings.len(), 1);
        assert_eq!(rendered.headings[0].line, 0);
        assert_eq!(rendered.headings[0].text, "Title");
    }

    #[test]
    fn paragraph_wraps_at_width() {
        let lesson = parse::parse("one two three four five six seven eight nine ten\n");
        let narrow = render_lesson(&lesson, 12);
        let wide = render_lesson(&lesson, 200);
        assert!(narrow.text.lines.len() > wide.text.lines.len());
        for line in &narrow.text.lines {
            assert!(line.to_string().len() <= 12);
        }
    }

    #[test]
    fn code_block_bordered_and_unwrapped() {
        let lesson = parse::parse("```\nlet x = 1;\n```\n");
        let rendered = render_lesson(&lesson, 5);
        let all = joined(&rendered.text);
        assert!(all.contains("\u{250c}"));
        assert!(all.contains("let x = 1;"));
        assert!(all.contains("\u{2514}"));
    }

    #[test]
    fn list_items_bulleted() {
        let lesson = parse::parse("- alpha\n- beta\n");
        let rendered = render_lesson(&lesson, 80);
        let all = joined(&rendered.text);
        assert!(all.contains("\u{2022} alpha"));
        assert!(all.contains("\u{2022} beta"));
    }

    #[test]
    fn quote_has_bar() {
        let lesson = parse::parse("> citation\n");
        let rendered = render_lesson(&lesson, 80);
        assert!(joined(&rendered.text).contains("\u{258c} citation"));
    }

    #[test]
    fn error_pane_names_identifier() {
        let text = error_text("missing");
        assert!(joined(&text).contains("missing"));
    }

    #[test]
    fn empty_lesson_renders_empty() {
        let lesson = parse::parse("");
        let rendered = render_lesson(&lesson, 80);
        assert!(rendered.text.lines.is_empty());
        assert!(rendered.headings.is_empty());
    }

    #[test]
    fn heading_positions_follow_blocks() {
        let lesson = parse::parse("# A\n\npara\n\n## B\n");
        let rendered = render_lesson(&lesson, 80);
        assert_eq!(rendered.headings.len(), 2);
        assert!(rendered.headings[1].line > rendered.headings[0].line);
    }
}
