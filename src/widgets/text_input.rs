use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};
use tui_textarea::{CursorMove, TextArea};

/// Event emitted by TextInput widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputEvent {
    None,
    Submit, // Enter pressed
    Cancel, // Esc pressed
}

/// Single-line text input widget wrapping tui-textarea
pub struct TextInput {
    textarea: TextArea<'static>,
    focused: bool,
}

impl TextInput {
    pub fn new() -> Self {
        let mut textarea = TextArea::default();
        // Single-line: no cursor line underline
        textarea.set_cursor_line_style(Style::default());
        let mut input = Self {
            textarea,
            focused: false,
        };
        input.apply_cursor_style();
        input
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        let mut input = Self::new();
        input.set_value(&value.into());
        input
    }

    pub fn value(&self) -> String {
        self.textarea.lines().first().cloned().unwrap_or_default()
    }

    pub fn set_value(&mut self, value: &str) {
        let single_line = value.replace(['\n', '\r'], " ");
        self.textarea = TextArea::new(vec![single_line]);
        self.textarea.set_cursor_line_style(Style::default());
        self.textarea.move_cursor(CursorMove::End);
        self.apply_cursor_style();
    }

    pub fn clear(&mut self) {
        self.set_value("");
    }

    pub fn set_focused(&mut self, focused: bool) {
        if self.focused != focused {
            self.focused = focused;
            self.apply_cursor_style();
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// The cursor block is only visible while the input has focus.
    fn apply_cursor_style(&mut self) {
        let style = if self.focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        self.textarea.set_cursor_style(style);
    }

    /// Route a key event into the textarea. Enter submits, Esc cancels,
    /// everything else edits the value.
    pub fn input(&mut self, key: &KeyEvent) -> TextInputEvent {
        match key.code {
            KeyCode::Enter => TextInputEvent::Submit,
            KeyCode::Esc => TextInputEvent::Cancel,
            _ => {
                self.textarea.input(*key);
                TextInputEvent::None
            }
        }
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        (&self.textarea).render(area, buf);
    }
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    #[test]
    fn typing_appends_to_value() {
        let mut input = TextInput::new();
        for c in ['m', 'a', 'i', 'n'] {
            let event = input.input(&KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
            assert_eq!(event, TextInputEvent::None);
        }
        assert_eq!(input.value(), "main");
    }

    #[test]
    fn enter_submits_and_esc_cancels() {
        let mut input = TextInput::with_value("x");
        assert_eq!(
            input.input(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            TextInputEvent::Submit
        );
        assert_eq!(
            input.input(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            TextInputEvent::Cancel
        );
        assert_eq!(input.value(), "x");
    }

    #[test]
    fn set_value_flattens_newlines() {
        let mut input = TextInput::new();
        input.set_value("a\nb");
        assert_eq!(input.value(), "a b");
    }

    #[test]
    fn backspace_removes_last_char() {
        let mut input = TextInput::with_value("abc");
        input.input(&KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(input.value(), "ab");
    }
}
