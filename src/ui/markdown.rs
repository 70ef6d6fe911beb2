//! Renders the Markdown that notes and answers are written in: headings,
//! lists, emphasis, inline code, code blocks and rules. Anything else is
//! shown as its plain text.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const BULLET: &str = "• ";
const RULE_WIDTH: usize = 12;

type Cell = (char, Style);

/// One unwrapped output line: a list/code prefix and its styled characters
#[derive(Debug, Default)]
struct Block {
    prefix: String,
    cells: Vec<Cell>,
}

impl Block {
    fn is_blank(&self) -> bool {
        self.prefix.is_empty() && self.cells.is_empty()
    }
}

struct Renderer {
    base: Style,
    styles: Vec<Style>,
    lists: Vec<Option<u64>>,
    in_code_block: bool,
    current: Option<Block>,
    blocks: Vec<Block>,
}

impl Renderer {
    fn new(base: Style) -> Self {
        Self {
            base,
            styles: Vec::new(),
            lists: Vec::new(),
            in_code_block: false,
            current: None,
            blocks: Vec::new(),
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(self.base)
    }

    fn push_modifier(&mut self, modifier: Modifier) {
        let next = self.style().add_modifier(modifier);
        self.styles.push(next);
    }

    fn line(&mut self) -> &mut Block {
        let indent = "  ".repeat(self.lists.len());
        self.current.get_or_insert_with(|| Block {
            prefix: indent,
            cells: Vec::new(),
        })
    }

    fn push_text(&mut self, text: &str, style: Style) {
        self.line().cells.extend(text.chars().map(|c| (c, style)));
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            self.blocks.push(block);
        }
    }

    /// Separates top-level blocks by one blank line
    fn gap(&mut self) {
        if self.blocks.last().is_some_and(|block| !block.is_blank()) {
            self.blocks.push(Block::default());
        }
    }

    fn start_item(&mut self) {
        self.flush();
        let depth = self.lists.len().saturating_sub(1);
        let marker = match self.lists.last_mut() {
            Some(Some(number)) => {
                let marker = format!("{}. ", number);
                *number += 1;
                marker
            }
            Some(None) | None => BULLET.to_string(),
        };
        self.current = Some(Block {
            prefix: format!("{}{}", "  ".repeat(depth), marker),
            cells: Vec::new(),
        });
    }

    fn code_text(&mut self, text: &str) {
        let style = self.base.fg(Color::Yellow);
        for code_line in text.lines() {
            self.current = Some(Block {
                prefix: "  ".repeat(self.lists.len() + 1),
                cells: code_line.chars().map(|c| (c, style)).collect(),
            });
            self.flush();
        }
    }

    // Events outside the rendered subset fall through to the catch-all arm
    #[allow(clippy::wildcard_enum_match_arm)]
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Paragraph) => {
                if self.current.as_ref().is_some_and(|block| !block.cells.is_empty()) {
                    self.flush();
                }
            }
            Event::End(TagEnd::Paragraph) => {
                self.flush();
                if self.lists.is_empty() {
                    self.gap();
                }
            }
            Event::Start(Tag::Heading { level, .. }) => {
                self.flush();
                let mut style = self.style().fg(Color::Cyan).add_modifier(Modifier::BOLD);
                if level == HeadingLevel::H1 {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                self.styles.push(style);
            }
            Event::End(TagEnd::Heading(_)) => {
                self.flush();
                self.styles.pop();
                self.gap();
            }
            Event::Start(Tag::List(start)) => {
                self.flush();
                self.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.gap();
                }
            }
            Event::Start(Tag::Item) => self.start_item(),
            Event::End(TagEnd::Item) => self.flush(),
            Event::Start(Tag::Strong) => self.push_modifier(Modifier::BOLD),
            Event::Start(Tag::Emphasis) => self.push_modifier(Modifier::ITALIC),
            Event::Start(Tag::Strikethrough) => self.push_modifier(Modifier::CROSSED_OUT),
            Event::End(TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough) => {
                self.styles.pop();
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.flush();
                self.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                self.flush();
                self.in_code_block = false;
                if self.lists.is_empty() {
                    self.gap();
                }
            }
            Event::Text(text) if self.in_code_block => self.code_text(&text),
            Event::Text(text) => {
                let style = self.style();
                self.push_text(&text, style);
            }
            Event::Code(code) => {
                let style = self.style().fg(Color::Yellow);
                self.push_text(&code, style);
            }
            Event::SoftBreak => {
                let style = self.style();
                self.push_text(" ", style);
            }
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                let style = self.base.fg(Color::DarkGray);
                self.push_text(&"─".repeat(RULE_WIDTH), style);
                self.flush();
                self.gap();
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        while self.blocks.last().is_some_and(Block::is_blank) {
            self.blocks.pop();
        }
        self.blocks
    }
}

/// Renders `text` as Markdown wrapped to `width` columns, keeping at most
/// `max_empty_lines` consecutive blank lines. `base` styles plain text.
pub(crate) fn render(
    text: &str,
    width: usize,
    max_empty_lines: usize,
    base: Style,
) -> Vec<Line<'static>> {
    let mut renderer = Renderer::new(base);
    for event in Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH) {
        renderer.event(event);
    }

    let mut lines = Vec::new();
    let mut empty_run = 0usize;
    for block in renderer.finish() {
        if block.is_blank() {
            empty_run += 1;
            if empty_run <= max_empty_lines {
                lines.push(Line::from(""));
            }
            continue;
        }
        empty_run = 0;
        lines.extend(wrap_block(&block, width, base));
    }
    lines
}

fn wrap_block(block: &Block, width: usize, base: Style) -> Vec<Line<'static>> {
    let prefix_width = block.prefix.width();
    let available = width.saturating_sub(prefix_width).max(1);
    let marker_style = base.fg(Color::Cyan);
    let continuation = " ".repeat(prefix_width);

    let rows = wrap_cells(&block.cells, available);
    if rows.is_empty() {
        return vec![Line::from(Span::styled(block.prefix.clone(), marker_style))];
    }

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let lead = if index == 0 {
                block.prefix.clone()
            } else {
                continuation.clone()
            };
            let mut spans = Vec::new();
            if !lead.is_empty() {
                spans.push(Span::styled(lead, marker_style));
            }
            spans.extend(coalesce(&row));
            Line::from(spans)
        })
        .collect()
}

fn char_width(character: char) -> usize {
    UnicodeWidthChar::width(character).unwrap_or(0).max(1)
}

/// Splits styled characters into whitespace-separated words
fn words(cells: &[Cell]) -> Vec<Vec<Cell>> {
    cells
        .split(|(character, _)| character.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(<[Cell]>::to_vec)
        .collect()
}

/// Greedy word wrap; words wider than `width` are split
fn wrap_cells(cells: &[Cell], width: usize) -> Vec<Vec<Cell>> {
    let mut rows = Vec::new();
    let mut row: Vec<Cell> = Vec::new();
    let mut row_width = 0usize;

    for word in words(cells) {
        let word_width: usize = word.iter().map(|(character, _)| char_width(*character)).sum();
        if !row.is_empty() && row_width + 1 + word_width > width {
            rows.push(std::mem::take(&mut row));
            row_width = 0;
        }
        if let (Some(&(_, previous)), Some(&(_, next))) = (row.last(), word.first()) {
            let space_style = if previous == next {
                previous
            } else {
                Style::default()
            };
            row.push((' ', space_style));
            row_width += 1;
        }
        for cell in word {
            let cell_width = char_width(cell.0);
            if row_width + cell_width > width && row_width > 0 {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            row.push(cell);
            row_width += cell_width;
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows
}

fn coalesce(row: &[Cell]) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut text = String::new();
    let mut current: Option<Style> = None;
    for &(character, style) in row {
        if current.is_some_and(|active| active != style) {
            spans.push(Span::styled(std::mem::take(&mut text), current.unwrap_or_default()));
        }
        current = Some(style);
        text.push(character);
    }
    if let Some(style) = current {
        spans.push(Span::styled(text, style));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    fn span_style(lines: &[Line], content: &str) -> Style {
        lines
            .iter()
            .flat_map(|line| line.spans.iter())
            .find(|span| span.content == content)
            .map(|span| span.style)
            .expect("span present")
    }

    #[test]
    fn test_heading_drops_markers_and_is_bold() {
        let lines = render("# Key points\n\nBody text", 40, 1, Style::default());
        assert_eq!(plain(&lines), vec!["Key points", "", "Body text"]);
        let style = span_style(&lines, "Key points");
        assert!(style.add_modifier.contains(Modifier::BOLD));
        assert!(style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_bullets_and_numbers_become_markers() {
        let lines = render("- one\n- two\n\n3. three\n4. four", 40, 0, Style::default());
        assert_eq!(plain(&lines), vec!["• one", "• two", "3. three", "4. four"]);
    }

    #[test]
    fn test_emphasis_is_styled_without_asterisks() {
        let lines = render("plain **bold** and *soft*", 40, 0, Style::default());
        assert_eq!(plain(&lines), vec!["plain bold and soft"]);
        assert!(span_style(&lines, "bold").add_modifier.contains(Modifier::BOLD));
        assert!(span_style(&lines, "soft").add_modifier.contains(Modifier::ITALIC));
        assert_eq!(span_style(&lines, "plain "), Style::default());
    }

    #[test]
    fn test_wrapped_items_keep_hanging_indent() {
        let lines = render("- alpha beta gamma", 10, 0, Style::default());
        assert_eq!(plain(&lines), vec!["• alpha", "  beta", "  gamma"]);
    }

    #[test]
    fn test_nested_lists_indent() {
        let lines = render("- outer\n  - inner", 40, 0, Style::default());
        assert_eq!(plain(&lines), vec!["• outer", "  • inner"]);
    }

    #[test]
    fn test_blank_lines_are_limited() {
        let text = "para one\n\npara two\n\n---\n\nend";
        assert_eq!(
            plain(&render(text, 40, 0, Style::default())),
            vec!["para one", "para two", "────────────", "end"]
        );
        assert_eq!(
            plain(&render(text, 40, 1, Style::default())),
            vec!["para one", "", "para two", "", "────────────", "", "end"]
        );
    }

    #[test]
    fn test_base_style_applies_to_plain_text() {
        let base = Style::default().fg(Color::Magenta);
        let lines = render("selected note", 40, 0, base);
        assert_eq!(span_style(&lines, "selected note"), base);
    }
}
