//! TextBlock Widget
//!
//! A borderless, bottom-anchored scrolling text region. Offsets count lines
//! up from the newest content, so new text stays in view unless the player
//! has scrolled back.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::StatefulWidget;
use textwrap::wrap;
use unicode_width::UnicodeWidthChar;

use crate::theme::{DIM_GRAY, FADE_GRAY};

/// One wrapped display line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyledLine {
    /// Text, already wrapped to the target width
    pub text: String,
    /// Style for the whole line
    pub style: Style,
}

/// Wrap `content` to `width`, keeping explicit line breaks
pub fn wrap_styled(content: &str, width: usize, style: Style) -> Vec<StyledLine> {
    content
        .split('\n')
        .flat_map(|line| {
            if line.trim().is_empty() {
                vec![String::new()]
            } else {
                wrap(line, width.max(1))
                    .into_iter()
                    .map(|cow| cow.to_string())
                    .collect()
            }
        })
        .map(|text| StyledLine { text, style })
        .collect()
}

/// Cut `text` to at most `width` terminal columns
pub fn fit_width(text: &str, width: usize) -> String {
    let mut used = 0;
    text.chars()
        .take_while(|c| {
            used += c.width().unwrap_or(0);
            used <= width
        })
        .collect()
}

/// State for a scrollable text block
#[derive(Debug, Default)]
pub struct TextBlockState {
    /// Scroll offset (lines up from the bottom, 0 = newest)
    pub scroll_offset: usize,
    /// Total content lines at last render
    pub total_lines: usize,
}

impl TextBlockState {
    /// Scroll back towards older lines
    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = (self.scroll_offset + lines).min(self.total_lines.saturating_sub(1));
    }

    /// Scroll forward towards the newest line
    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Jump back to the newest line
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }
}

/// A borderless, scrollable text block
pub struct TextBlock<'a> {
    lines: &'a [StyledLine],
}

impl<'a> TextBlock<'a> {
    pub fn new(lines: &'a [StyledLine]) -> Self {
        Self { lines }
    }
}

impl StatefulWidget for TextBlock<'_> {
    type State = TextBlockState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let height = area.height as usize;
        state.total_lines = self.lines.len();

        // Clamp scroll
        let max_scroll = state.total_lines.saturating_sub(height);
        state.scroll_offset = state.scroll_offset.min(max_scroll);

        let visible_end = state.total_lines - state.scroll_offset;
        let visible_start = visible_end.saturating_sub(height);
        let has_content_above = visible_start > 0;
        let has_content_below = state.scroll_offset > 0;

        for (i, line) in self.lines[visible_start..visible_end].iter().enumerate() {
            // Fade the edges that hide more content
            let style = if has_content_above && i < 2 {
                Style::default().fg(if i == 0 { DIM_GRAY } else { FADE_GRAY })
            } else if has_content_below && i + 2 >= height {
                Style::default().fg(if i + 1 == height { DIM_GRAY } else { FADE_GRAY })
            } else {
                line.style
            };

            let y = area.y + i as u16;
            buf.set_string(area.x, y, fit_width(&line.text, area.width as usize), style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(n: usize) -> Vec<StyledLine> {
        (0..n)
            .map(|i| StyledLine {
                text: format!("line {i}"),
                style: Style::default(),
            })
            .collect()
    }

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    #[test]
    fn test_wrap_styled_keeps_breaks() {
        let wrapped = wrap_styled("a b c d\n\nend", 3, Style::default());
        let texts: Vec<_> = wrapped.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a b", "c d", "", "end"]);
    }

    #[test]
    fn test_fit_width_counts_columns() {
        assert_eq!(fit_width("hello", 3), "hel");
        assert_eq!(fit_width("日本語", 4), "日本");
        assert_eq!(fit_width("ok", 10), "ok");
    }

    #[test]
    fn test_bottom_anchored() {
        let content = lines(10);
        let area = Rect::new(0, 0, 10, 3);
        let mut buf = Buffer::empty(area);
        let mut state = TextBlockState::default();

        TextBlock::new(&content).render(area, &mut buf, &mut state);
        assert_eq!(state.total_lines, 10);
        assert_eq!(row(&buf, 2), "line 9");
        assert_eq!(row(&buf, 1), "line 8");
    }

    #[test]
    fn test_scroll_back_and_clamp() {
        let content = lines(10);
        let area = Rect::new(0, 0, 10, 3);
        let mut state = TextBlockState::default();
        let mut buf = Buffer::empty(area);
        TextBlock::new(&content).render(area, &mut buf, &mut state);

        state.scroll_up(100);
        let mut buf = Buffer::empty(area);
        TextBlock::new(&content).render(area, &mut buf, &mut state);
        assert_eq!(state.scroll_offset, 7);
        assert_eq!(row(&buf, 0), "line 0");

        state.scroll_down(100);
        assert_eq!(state.scroll_offset, 0);
    }
}
