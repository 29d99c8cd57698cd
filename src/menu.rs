//! Chapter menu: the catalog model, cursor state, and list toggling.
//!
//! The menu owns the chapter catalog built once at startup from the course
//! directory. Visual state (the hover marker, open/closed sublists, panel
//! visibility) is projected from explicit state fields; labels are never
//! mutated to apply the marker.

use std::fs;
use std::io;
use std::path::Path;

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::loader::{LESSON_DIR, LESSON_EXTENSION};
use crate::parse;

/// Glyph prefixed to the hovered (cursor) row.
pub const HOVER_MARKER: &str = "\u{261b} ";

/// Accent color for the hovered row.
const HOVER_COLOR: Color = Color::Rgb(0x31, 0x7a, 0xc1);

/// Open/closed state of a nested lesson list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    Open,
    Closed,
}

/// Visibility of the whole chapter panel.
///
/// The panel widget, the content pane width, and the status-bar hint are
/// all projections of this one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Expanded,
    Collapsed,
}

impl PanelState {
    pub fn toggle(&mut self) {
        *self = match self {
            PanelState::Expanded => PanelState::Collapsed,
            PanelState::Collapsed => PanelState::Expanded,
        };
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, PanelState::Expanded)
    }

    /// Status-bar hint for the toggle key. Exactly one of the two control
    /// labels is shown at a time.
    pub fn hint(&self) -> &'static str {
        match self {
            PanelState::Expanded => "hide sommaire",
            PanelState::Collapsed => "show sommaire",
        }
    }
}

/// A subject leaf: activation loads lesson content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    /// Identifier templated into `cours/<id>.md`.
    pub id: String,
    /// Display label (frontmatter title or file stem).
    pub label: String,
}

/// A nested lesson list under a chapter.
#[derive(Debug, Clone)]
pub struct Section {
    pub lessons: Vec<Lesson>,
    pub state: ListState,
}

/// What activating a chapter row does.
#[derive(Debug, Clone)]
pub enum ChapterKind {
    /// Leaf chapter: loads its lesson directly.
    Leaf(Lesson),
    /// Chapter owning a collapsible sublist.
    Section(Section),
}

/// A top-level menu entry.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub label: String,
    pub kind: ChapterKind,
}

/// A visible menu row: either a chapter line or a lesson line from an
/// open section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Chapter(usize),
    Lesson { chapter: usize, lesson: usize },
}

/// The menu controller: catalog plus cursor.
#[derive(Debug)]
pub struct Menu {
    chapters: Vec<Chapter>,
    cursor: usize,
}

impl Menu {
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self {
            chapters,
            cursor: 0,
        }
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Rows currently visible: every chapter, plus the lessons of the one
    /// open section (if any).
    pub fn visible_rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        for (ci, chapter) in self.chapters.iter().enumerate() {
            rows.push(Row::Chapter(ci));
            if let ChapterKind::Section(section) = &chapter.kind {
                if section.state == ListState::Open {
                    for li in 0..section.lessons.len() {
                        rows.push(Row::Lesson {
                            chapter: ci,
                            lesson: li,
                        });
                    }
                }
            }
        }
        rows
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        let last = self.visible_rows().len().saturating_sub(1);
        self.cursor = (self.cursor + 1).min(last);
    }

    /// Activate the row under the cursor.
    ///
    /// Returns `Some(identifier)` when a subject leaf was activated (the
    /// caller dispatches it to the loader). Activating a section chapter
    /// toggles its list with forced mutual exclusion: every section is
    /// closed first, then the clicked one reopens only if it was closed.
    /// A section with no lessons is a no-op and leaves other lists alone.
    pub fn activate(&mut self) -> Option<String> {
        enum Action {
            Load(String),
            Toggle { chapter: usize, was_open: bool },
            Nothing,
        }

        let rows = self.visible_rows();
        let action = match rows.get(self.cursor)? {
            Row::Lesson { chapter, lesson } => match &self.chapters[*chapter].kind {
                ChapterKind::Section(section) => {
                    Action::Load(section.lessons[*lesson].id.clone())
                }
                ChapterKind::Leaf(_) => Action::Nothing,
            },
            Row::Chapter(ci) => match &self.chapters[*ci].kind {
                ChapterKind::Leaf(lesson) => Action::Load(lesson.id.clone()),
                ChapterKind::Section(section) if section.lessons.is_empty() => Action::Nothing,
                ChapterKind::Section(section) => Action::Toggle {
                    chapter: *ci,
                    was_open: section.state == ListState::Open,
                },
            },
        };

        match action {
            Action::Load(id) => Some(id),
            Action::Nothing => None,
            Action::Toggle { chapter, was_open } => {
                self.close_all_sections();
                if !was_open {
                    if let ChapterKind::Section(section) = &mut self.chapters[chapter].kind {
                        section.state = ListState::Open;
                    }
                }
                self.clamp_cursor();
                None
            }
        }
    }

    pub fn close_all_sections(&mut self) {
        for chapter in &mut self.chapters {
            if let ChapterKind::Section(section) = &mut chapter.kind {
                section.state = ListState::Closed;
            }
        }
    }

    /// Number of sections currently open. The menu invariant keeps this
    /// at zero or one.
    pub fn open_section_count(&self) -> usize {
        self.chapters
            .iter()
            .filter(|c| {
                matches!(
                    &c.kind,
                    ChapterKind::Section(s) if s.state == ListState::Open
                )
            })
            .count()
    }

    fn clamp_cursor(&mut self) {
        let last = self.visible_rows().len().saturating_sub(1);
        self.cursor = self.cursor.min(last);
    }
}

/// Build the styled lines for the chapter panel.
///
/// The hover marker, accent color, and bold weight are applied here as a
/// projection of the cursor position; the underlying labels are untouched,
/// so moving the cursor away restores a row exactly.
pub fn menu_lines(menu: &Menu) -> Vec<Line<'static>> {
    let hover = Style::default().fg(HOVER_COLOR).add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    for (i, row) in menu.visible_rows().iter().enumerate() {
        let (label, indent) = match row {
            Row::Chapter(ci) => (menu.chapters()[*ci].label.clone(), ""),
            Row::Lesson { chapter, lesson } => match &menu.chapters()[*chapter].kind {
                ChapterKind::Section(section) => (section.lessons[*lesson].label.clone(), "  "),
                ChapterKind::Leaf(_) => continue,
            },
        };
        let line = if i == menu.cursor() {
            Line::from(Span::styled(format!("{indent}{HOVER_MARKER}{label}"), hover))
        } else {
            Line::from(Span::raw(format!("{indent}  {label}")))
        };
        lines.push(line);
    }

    lines
}

/// Build the chapter catalog from a course root.
///
/// Layout contract: `<root>/cours/` holds top-level `.md` files (leaf
/// chapters) and subdirectories (sections whose `.md` files are lessons).
/// Entries are sorted by file name for a stable menu order; dotfiles are
/// skipped. Labels come from a YAML frontmatter `title:` when present.
pub fn load_catalog(root: &Path) -> io::Result<Vec<Chapter>> {
    let lessons_dir = root.join(LESSON_DIR);
    let mut entries: Vec<fs::DirEntry> =
        fs::read_dir(&lessons_dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut chapters = Vec::new();
    for entry in entries {
        let name = match entry.file_name().into_string() {
            Ok(n) => n,
            Err(_) => continue,
        };
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            let mut files: Vec<fs::DirEntry> =
                fs::read_dir(&path)?.collect::<Result<_, _>>()?;
            files.sort_by_key(|e| e.file_name());

            let mut lessons = Vec::new();
            for file in files {
                let lesson_path = file.path();
                if lesson_path.extension().and_then(|e| e.to_str()) != Some(LESSON_EXTENSION) {
                    continue;
                }
                let stem = match lesson_path.file_stem().and_then(|s| s.to_str()) {
                    Some(s) => s.to_owned(),
                    None => continue,
                };
                lessons.push(Lesson {
                    id: format!("{name}/{stem}"),
                    label: lesson_label(&lesson_path, &stem),
                });
            }
            chapters.push(Chapter {
                label: prettify(&name),
                kind: ChapterKind::Section(Section {
                    lessons,
                    state: ListState::Closed,
                }),
            });
        } else if path.extension().and_then(|e| e.to_str()) == Some(LESSON_EXTENSION) {
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s.to_owned(),
                None => continue,
            };
            let label = lesson_label(&path, &stem);
            chapters.push(Chapter {
                label: label.clone(),
                kind: ChapterKind::Leaf(Lesson { id: stem, label }),
            });
        }
    }

    Ok(chapters)
}

fn lesson_label(path: &Path, stem: &str) -> String {
    fs::read_to_string(path)
        .ok()
        .and_then(|source| parse::frontmatter_title(&source))
        .unwrap_or_else(|| prettify(stem))
}

fn prettify(name: &str) -> String {
    name.replace(['_', '-'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(id: &str) -> Lesson {
        Lesson {
            id: id.to_owned(),
            label: id.to_owned(),
        }
    }

    fn fixture() -> Menu {
        Menu::new(vec![
            Chapter {
                label: "Intro".to_owned(),
                kind: ChapterKind::Leaf(lesson("intro")),
            },
            Chapter {
                label: "Bases".to_owned(),
                kind: ChapterKind::Section(Section {
                    lessons: vec![lesson("bases/variables"), lesson("bases/boucles")],
                    state: ListState::Closed,
                }),
            },
            Chapter {
                label: "Avance".to_owned(),
                kind: ChapterKind::Section(Section {
                    lessons: vec![lesson("avance/traits")],
                    state: ListState::Closed,
                }),
            },
            Chapter {
                label: "Annexe".to_owned(),
                kind: ChapterKind::Section(Section {
                    lessons: Vec::new(),
                    state: ListState::Closed,
                }),
            },
        ])
    }

    #[test]
    fn leaf_activation_returns_identifier() {
        let mut menu = fixture();
        assert_eq!(menu.activate().as_deref(), Some("intro"));
        // Leaf activation does not touch list state.
        assert_eq!(menu.open_section_count(), 0);
    }

    #[test]
    fn section_activation_opens_and_shows_lessons() {
        let mut menu = fixture();
        menu.move_down(); // Bases
        assert_eq!(menu.activate(), None);
        assert_eq!(menu.open_section_count(), 1);
        let rows = menu.visible_rows();
        assert!(rows.contains(&Row::Lesson {
            chapter: 1,
            lesson: 0
        }));
    }

    #[test]
    fn at_most_one_section_open() {
        let mut menu = fixture();
        menu.move_down(); // Bases
        menu.activate();
        // Move to Avance: Bases is open, so rows are
        // Intro, Bases, variables, boucles, Avance.
        for _ in 0..3 {
            menu.move_down();
        }
        menu.activate();
        assert_eq!(menu.open_section_count(), 1);
        // The open one is Avance, not Bases.
        match &menu.chapters()[2].kind {
            ChapterKind::Section(s) => assert_eq!(s.state, ListState::Open),
            _ => panic!("expected section"),
        }
        match &menu.chapters()[1].kind {
            ChapterKind::Section(s) => assert_eq!(s.state, ListState::Closed),
            _ => panic!("expected section"),
        }
    }

    #[test]
    fn double_activation_closes_again() {
        let mut menu = fixture();
        menu.move_down(); // Bases
        menu.activate();
        assert_eq!(menu.open_section_count(), 1);
        menu.activate();
        assert_eq!(menu.open_section_count(), 0);
    }

    #[test]
    fn empty_section_is_noop_and_leaves_others_open() {
        let mut menu = fixture();
        menu.move_down(); // Bases
        menu.activate();
        // Rows: Intro, Bases, variables, boucles, Avance, Annexe.
        for _ in 0..4 {
            menu.move_down();
        }
        assert_eq!(menu.activate(), None);
        // No mutual-exclusion sweep happened: Bases is still open.
        assert_eq!(menu.open_section_count(), 1);
        match &menu.chapters()[1].kind {
            ChapterKind::Section(s) => assert_eq!(s.state, ListState::Open),
            _ => panic!("expected section"),
        }
    }

    #[test]
    fn lesson_row_activation_returns_identifier() {
        let mut menu = fixture();
        menu.move_down(); // Bases
        menu.activate();
        menu.move_down(); // variables
        assert_eq!(menu.activate().as_deref(), Some("bases/variables"));
    }

    #[test]
    fn cursor_clamped_when_rows_shrink() {
        let mut menu = fixture();
        menu.move_down(); // Bases
        menu.activate(); // open
        for _ in 0..10 {
            menu.move_down();
        }
        let bottom = menu.cursor();
        assert_eq!(bottom, menu.visible_rows().len() - 1);
        // Closing Bases from elsewhere: cursor must stay in range.
        menu.close_all_sections();
        menu.move_down();
        assert!(menu.cursor() < menu.visible_rows().len());
    }

    #[test]
    fn hover_round_trip_restores_labels() {
        let mut menu = fixture();
        let plain = |lines: &[Line<'_>]| -> Vec<String> {
            lines
                .iter()
                .map(|l| l.to_string().trim_start().trim_start_matches(HOVER_MARKER).to_owned())
                .collect()
        };

        let before = plain(&menu_lines(&menu));
        menu.move_down();
        menu.move_down();
        menu.move_up();
        menu.move_up();
        let after = plain(&menu_lines(&menu));
        assert_eq!(before, after);
    }

    #[test]
    fn marker_only_on_cursor_row() {
        let mut menu = fixture();
        menu.move_down();
        let lines = menu_lines(&menu);
        let marked: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.to_string().contains(HOVER_MARKER.trim_end()))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(marked, vec![1]);
    }

    #[test]
    fn panel_toggle_is_an_involution() {
        let mut panel = PanelState::Expanded;
        let hint_before = panel.hint();
        panel.toggle();
        assert!(!panel.is_expanded());
        assert_ne!(panel.hint(), hint_before);
        panel.toggle();
        assert!(panel.is_expanded());
        assert_eq!(panel.hint(), hint_before);
    }

    #[test]
    fn catalog_built_from_course_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let cours = tmp.path().join(LESSON_DIR);
        std::fs::create_dir_all(cours.join("bases")).unwrap();
        std::fs::write(cours.join("intro.md"), "# Intro\n").unwrap();
        std::fs::write(
            cours.join("bases").join("variables.md"),
            "---\ntitle: Les variables\n---\n\n# Variables\n",
        )
        .unwrap();
        std::fs::write(cours.join("bases").join("notes.txt"), "ignored").unwrap();

        let chapters = load_catalog(tmp.path()).unwrap();
        assert_eq!(chapters.len(), 2);

        // Sorted: "bases" before "intro.md".
        match &chapters[0].kind {
            ChapterKind::Section(s) => {
                assert_eq!(s.lessons.len(), 1);
                assert_eq!(s.lessons[0].id, "bases/variables");
                assert_eq!(s.lessons[0].label, "Les variables");
                assert_eq!(s.state, ListState::Closed);
            }
            _ => panic!("expected section"),
        }
        match &chapters[1].kind {
            ChapterKind::Leaf(l) => assert_eq!(l.id, "intro"),
            _ => panic!("expected leaf"),
        }
    }

    #[test]
    fn missing_course_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_catalog(tmp.path()).is_err());
    }
}
