/// Single-line chat input with a character cursor
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    content: String,
    cursor_index: usize,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_char(&mut self, character: char) {
        let insert_index = char_to_byte_index(&self.content, self.cursor_index);
        self.content.insert(insert_index, character);
        self.cursor_index = self.cursor_index.saturating_add(1);
    }

    /// Inserts pasted text at the cursor; line breaks become spaces
    pub fn insert_str(&mut self, text: &str) {
        for character in text.chars() {
            match character {
                '\r' => {}
                '\n' => self.add_char(' '),
                other => self.add_char(other),
            }
        }
    }

    /// Backspace
    pub fn remove_char(&mut self) {
        if self.cursor_index == 0 {
            return;
        }
        let end_index = char_to_byte_index(&self.content, self.cursor_index);
        let start_index = char_to_byte_index(&self.content, self.cursor_index - 1);
        self.content.replace_range(start_index..end_index, "");
        self.cursor_index -= 1;
    }

    /// Delete
    pub fn delete_char(&mut self) {
        if self.cursor_index >= self.content.chars().count() {
            return;
        }
        let start_index = char_to_byte_index(&self.content, self.cursor_index);
        let end_index = char_to_byte_index(&self.content, self.cursor_index + 1);
        self.content.replace_range(start_index..end_index, "");
    }

    pub fn move_left(&mut self) {
        self.cursor_index = self.cursor_index.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor_index < self.content.chars().count() {
            self.cursor_index += 1;
        }
    }

    pub fn move_to_start(&mut self) {
        self.cursor_index = 0;
    }

    pub fn move_to_end(&mut self) {
        self.cursor_index = self.content.chars().count();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Cursor position in characters
    pub fn cursor_position(&self) -> usize {
        self.cursor_index
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor_index = 0;
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    #[cfg(test)]
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.cursor_index = self.content.chars().count();
    }
}

fn char_to_byte_index(value: &str, char_index: usize) -> usize {
    value
        .char_indices()
        .nth(char_index)
        .map_or_else(|| value.len(), |(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editing_in_the_middle_of_multibyte_text() {
        let mut input = TextInput::new();
        input.set_content("héllo");
        input.move_left();
        input.move_left();
        input.add_char('X');
        assert_eq!(input.content(), "hélXlo");

        input.remove_char();
        input.move_to_start();
        input.delete_char();
        assert_eq!(input.content(), "éllo");
        assert_eq!(input.cursor_position(), 0);
    }

    #[test]
    fn test_paste_flattens_newlines() {
        let mut input = TextInput::new();
        input.insert_str("one\r\ntwo");
        assert_eq!(input.content(), "one two");
        assert_eq!(input.cursor_position(), 7);
    }
}
