use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::gateway::NoteDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Title,
    Content,
    Submit,
    List,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Title => FocusPane::Content,
            FocusPane::Content => FocusPane::Submit,
            FocusPane::Submit => FocusPane::List,
            FocusPane::List => FocusPane::Title,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            FocusPane::Title => FocusPane::List,
            FocusPane::Content => FocusPane::Title,
            FocusPane::Submit => FocusPane::Content,
            FocusPane::List => FocusPane::Submit,
        }
    }
}

/// Byte offset of the caret inside one of the draft buffers. The buffers
/// themselves live in the store; this only tracks where edits land.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputCursor {
    position: usize,
}

impl InputCursor {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn insert_char(&mut self, text: &mut String, ch: char) {
        self.clamp(text);
        text.insert(self.position, ch);
        self.position += ch.len_utf8();
    }

    pub fn backspace(&mut self, text: &mut String) -> bool {
        self.clamp(text);
        if self.position == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(text, self.position);
        text.drain(prev..self.position);
        self.position = prev;
        true
    }

    pub fn delete(&mut self, text: &mut String) -> bool {
        self.clamp(text);
        if self.position >= text.len() {
            return false;
        }
        let next = next_grapheme_boundary(text, self.position);
        text.drain(self.position..next);
        true
    }

    pub fn move_left(&mut self, text: &str) -> bool {
        self.clamp(text);
        if self.position == 0 {
            return false;
        }
        self.position = prev_grapheme_boundary(text, self.position);
        true
    }

    pub fn move_right(&mut self, text: &str) -> bool {
        self.clamp(text);
        if self.position >= text.len() {
            return false;
        }
        self.position = next_grapheme_boundary(text, self.position);
        true
    }

    pub fn move_home(&mut self, text: &str) {
        self.clamp(text);
        self.position = line_start(text, self.position);
    }

    pub fn move_end(&mut self, text: &str) {
        self.clamp(text);
        self.position = line_end(text, self.position);
    }

    pub fn jump_to_end(&mut self, text: &str) {
        self.position = text.len();
    }

    /// Keeps the caret inside `text` and on a char boundary after the buffer
    /// was replaced underneath it.
    pub fn clamp(&mut self, text: &str) {
        if self.position > text.len() {
            self.position = text.len();
        }
        while !text.is_char_boundary(self.position) {
            self.position -= 1;
        }
    }

    /// Row and display column of the caret, counting newlines.
    pub fn row_col(&self, text: &str) -> (usize, usize) {
        let position = self.position.min(text.len());
        let before = &text[..position];
        let row = before.matches('\n').count();
        let start = line_start(text, position);
        (row, UnicodeWidthStr::width(&text[start..position]))
    }
}

/// Focus and caret positions for the note form.
#[derive(Debug, Clone)]
pub struct FormState {
    pub focus: FocusPane,
    pub title: InputCursor,
    pub content: InputCursor,
    pub selected: usize,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            focus: FocusPane::Title,
            title: InputCursor::default(),
            content: InputCursor::default(),
            selected: 0,
        }
    }
}

impl FormState {
    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
    }

    pub fn move_selection(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        let len = len as isize;
        let next = (self.selected as isize + delta).clamp(0, len - 1);
        self.selected = next as usize;
    }

    /// Re-validates carets and selection after the store changed.
    pub fn sync(&mut self, draft: &NoteDraft, len: usize) {
        self.title.clamp(&draft.title);
        self.content.clamp(&draft.content);
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    /// Puts both carets at the end of a freshly loaded draft.
    pub fn reset_cursors(&mut self, draft: &NoteDraft) {
        self.title.jump_to_end(&draft.title);
        self.content.jump_to_end(&draft.content);
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut last = 0;
    for (idx, _) in text[..cursor].grapheme_indices(true) {
        last = idx;
    }
    last
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor >= text.len() {
        return text.len();
    }
    let mut iter = text[cursor..].graphemes(true);
    if let Some(grapheme) = iter.next() {
        cursor + grapheme.len()
    } else {
        text.len()
    }
}

fn line_start(text: &str, cursor: usize) -> usize {
    text[..cursor].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

fn line_end(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .find('\n')
        .map(|idx| cursor + idx)
        .unwrap_or_else(|| text.len())
}
