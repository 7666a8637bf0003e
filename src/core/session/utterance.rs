/// Final transcript fragments of the utterance in progress
#[derive(Debug, Default, Clone)]
pub struct UtteranceBuffer {
    fragments: Vec<String>,
}

impl UtteranceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a final transcript fragment; blank fragments are skipped
    pub fn push_final(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.fragments.push(text.to_string());
        }
    }

    /// Flush the buffer into one utterance, or `None` when nothing was heard
    pub fn take(&mut self) -> Option<String> {
        if self.fragments.is_empty() {
            return None;
        }
        let utterance = self.fragments.join(" ");
        self.fragments.clear();
        Some(utterance)
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
    }
}
