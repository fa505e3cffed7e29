use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line editor fed with raw key events while the command line or
/// the rule wizard collects text.
#[derive(Default)]
pub struct Inputter {
    prompt: String,
    current_input: String,
    cursor_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone)]
pub struct InputResult {
    pub prompt: String,
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor_pos: usize,
}

impl Inputter {
    /// Reset the editor and give it the prompt to show.
    pub fn arm(&mut self, prompt: &str) {
        self.clear();
        self.prompt = prompt.to_string();
    }

    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        trace!("Inputter received {:?}", key.code);
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.enter(),
            (KeyCode::Esc, KeyModifiers::NONE) => self.escape(),
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Left, KeyModifiers::NONE) => self.left(),
            (KeyCode::Right, KeyModifiers::NONE) => self.right(),
            (kc, km) => self.key(kc, km),
        }
    }

    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.cursor_pos = self.current_input.chars().count();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            prompt: self.prompt.clone(),
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            cursor_pos: self.cursor_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.cursor_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.clear();
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let byte_pos = self.byte_pos();
            self.current_input.remove(byte_pos);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.cursor_pos < self.current_input.chars().count() {
            self.cursor_pos += 1;
        }
        self.get()
    }

    fn key(&mut self, code: KeyCode, _modifier: KeyModifiers) -> InputResult {
        if let Some(chr) = code.as_char() {
            let byte_pos = self.byte_pos();
            self.current_input.insert(byte_pos, chr);
            self.cursor_pos += 1;
        }
        self.get()
    }

    fn byte_pos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.cursor_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(inputter: &mut Inputter, code: KeyCode) -> InputResult {
        inputter.read(event::KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(inputter: &mut Inputter, s: &str) {
        for chr in s.chars() {
            press(inputter, KeyCode::Char(chr));
        }
    }

    #[test]
    fn typing_builds_the_input() {
        let mut inputter = Inputter::default();
        inputter.arm("search");
        type_str(&mut inputter, "madrid");
        let result = inputter.get();
        assert_eq!(result.input, "madrid");
        assert_eq!(result.cursor_pos, 6);
        assert_eq!(result.prompt, "search");
        assert!(!result.finished);
    }

    #[test]
    fn backspace_removes_before_the_cursor() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "abc");
        press(&mut inputter, KeyCode::Left);
        let result = press(&mut inputter, KeyCode::Backspace);
        assert_eq!(result.input, "ac");
        assert_eq!(result.cursor_pos, 1);
    }

    #[test]
    fn characters_insert_at_the_cursor() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "ac");
        press(&mut inputter, KeyCode::Left);
        let result = press(&mut inputter, KeyCode::Char('b'));
        assert_eq!(result.input, "abc");
        assert_eq!(result.cursor_pos, 2);
    }

    #[test]
    fn enter_finishes_with_the_input_intact() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "7.5");
        let result = press(&mut inputter, KeyCode::Enter);
        assert!(result.finished);
        assert!(!result.canceled);
        assert_eq!(result.input, "7.5");
    }

    #[test]
    fn escape_cancels_and_clears() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "half typed");
        let result = press(&mut inputter, KeyCode::Esc);
        assert!(result.finished);
        assert!(result.canceled);
        assert!(result.input.is_empty());
    }
}
