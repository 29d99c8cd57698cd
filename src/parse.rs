//! Markdown lesson parsing.
//!
//! Turns lesson text into a flat list of content blocks plus the heading
//! list, via pulldown-cmark. An optional YAML frontmatter block supplies
//! the lesson's display title for the chapter menu.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// The kind of a top-level content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    CodeBlock,
    List,
    BlockQuote,
    ThematicBreak,
    Table,
}

/// A top-level content block with its flattened text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub content: String,
}

/// A heading extracted for outline/status display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// A parsed lesson ready for terminal rendering.
#[derive(Debug, Clone, Default)]
pub struct ParsedLesson {
    pub blocks: Vec<Block>,
    pub headings: Vec<Heading>,
}

/// Split an optional leading YAML frontmatter block from the body.
///
/// Frontmatter is delimited by a `---` line at the very start and a
/// closing `---` line; anything else returns the source unchanged.
pub fn split_frontmatter(source: &str) -> (Option<&str>, &str) {
    let rest = match source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))
    {
        Some(r) => r,
        None => return (None, source),
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, source)
}

/// Extract the `title:` field from a lesson's frontmatter, if any.
pub fn frontmatter_title(source: &str) -> Option<String> {
    let (yaml, _) = split_frontmatter(source);
    let value: serde_yml::Value = serde_yml::from_str(yaml?).ok()?;
    value
        .get("title")
        .and_then(|title| title.as_str())
        .map(str::to_owned)
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Returns `true` for tags that open a block (as opposed to inline spans).
fn is_block_tag(tag: &Tag) -> bool {
    !matches!(
        tag,
        Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
    )
}

fn is_block_tag_end(tag: &TagEnd) -> bool {
    !matches!(
        tag,
        TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link | TagEnd::Image
    )
}

/// Map a top-level block tag to its kind; nested-only tags return `None`.
fn block_kind_for(tag: &Tag) -> Option<BlockKind> {
    match tag {
        Tag::Paragraph => Some(BlockKind::Paragraph),
        Tag::Heading { level, .. } => Some(BlockKind::Heading(heading_level_to_u8(*level))),
        Tag::CodeBlock(_) => Some(BlockKind::CodeBlock),
        Tag::List(_) => Some(BlockKind::List),
        Tag::BlockQuote(..) => Some(BlockKind::BlockQuote),
        Tag::Table(_) => Some(BlockKind::Table),
        _ => None,
    }
}

/// Parse lesson markdown (frontmatter stripped) into blocks and headings.
pub fn parse(source: &str) -> ParsedLesson {
    let (_, body) = split_frontmatter(source);

    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(body, options);

    let mut lesson = ParsedLesson::default();

    let mut depth: usize = 0;
    let mut current: Option<BlockKind> = None;
    let mut text = String::new();

    let mut heading_level: Option<u8> = None;
    let mut heading_text = String::new();

    for event in parser {
        match event {
            Event::Start(tag) => {
                if is_block_tag(&tag) {
                    if depth == 0 {
                        current = block_kind_for(&tag);
                        text.clear();
                    } else if matches!(tag, Tag::Item | Tag::TableRow)
                        && !text.is_empty()
                        && !text.ends_with('\n')
                    {
                        text.push('\n');
                    }
                    depth += 1;
                }
                if let Tag::Heading { level, .. } = tag {
                    heading_level = Some(heading_level_to_u8(level));
                    heading_text.clear();
                }
            }

            Event::End(tag_end) => {
                if is_block_tag_end(&tag_end) {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        if let Some(kind) = current.take() {
                            lesson.blocks.push(Block {
                                kind,
                                content: std::mem::take(&mut text),
                            });
                        }
                    }
                }
                if matches!(tag_end, TagEnd::Heading(_)) {
                    if let Some(level) = heading_level.take() {
                        lesson.headings.push(Heading {
                            level,
                            text: std::mem::take(&mut heading_text),
                        });
                    }
                }
            }

            Event::Text(t) => {
                text.push_str(&t);
                if heading_level.is_some() {
                    heading_text.push_str(&t);
                }
            }

            Event::Code(code) => {
                text.push_str(&code);
                if heading_level.is_some() {
                    heading_text.push_str(&code);
                }
            }

            Event::SoftBreak | Event::HardBreak => {
                text.push('\n');
                if heading_level.is_some() {
                    heading_text.push(' ');
                }
            }

            Event::Html(html) | Event::InlineHtml(html) => {
                if depth > 0 {
                    text.push_str(&html);
                }
            }

            Event::Rule => {
                lesson.blocks.push(Block {
                    kind: BlockKind::ThematicBreak,
                    content: String::new(),
                });
            }

            _ => {}
        }
    }

    lesson
}
