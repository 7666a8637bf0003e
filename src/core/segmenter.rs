/// Characters that end a sentence
const TERMINALS: [char; 4] = ['.', '!', '?', '\n'];

fn is_terminal(c: char) -> bool {
    TERMINALS.contains(&c)
}

/// Incrementally slices streamed text into complete sentences
///
/// Text is pushed fragment by fragment; every complete sentence is returned as
/// soon as its terminal marker arrives and the unfinished tail stays buffered.
/// A run of terminals (`"?!"`, `"..."`) closes a single sentence. Fragments
/// without any alphanumeric content are never returned.
#[derive(Debug, Default)]
pub struct SentenceSegmenter {
    buffer: String,
}

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and drain every sentence it completes
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        self.buffer.push_str(fragment);

        let mut sentences = Vec::new();
        while let Some(end) = self.sentence_end() {
            let sentence: String = self.buffer.drain(..end).collect();
            let leading_ws = self.buffer.len() - self.buffer.trim_start().len();
            self.buffer.drain(..leading_ws);

            if let Some(sentence) = speakable(&sentence) {
                sentences.push(sentence);
            }
        }
        sentences
    }

    /// Take whatever remains once the stream is complete
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        speakable(&rest)
    }

    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Byte offset just past the first terminal run, if any
    fn sentence_end(&self) -> Option<usize> {
        let mut chars = self.buffer.char_indices().skip_while(|(_, c)| !is_terminal(*c));
        let (start, first) = chars.next()?;
        let mut end = start + first.len_utf8();
        for (idx, c) in chars {
            if !is_terminal(c) {
                break;
            }
            end = idx + c.len_utf8();
        }
        Some(end)
    }
}

fn speakable(text: &str) -> Option<String> {
    let trimmed = text.trim();
    trimmed
        .chars()
        .any(char::is_alphanumeric)
        .then(|| trimmed.to_string())
}
