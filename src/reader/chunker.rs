/*!
 * Speech chunking.
 *
 * Splits text into sentence-respecting chunks of bounded length. Sentences
 * are packed greedily; a sentence longer than the limit is packed word by
 * word instead. Words are never split, so a single word longer than the
 * limit becomes a chunk of its own.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// A run ending in sentence punctuation, or an unterminated tail
static SENTENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^.!?]*[.!?]+|[^.!?]+$").expect("Invalid sentence regex")
});

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Length of `current` after appending `next` with a separating space
fn joined_len(current: &str, next: &str) -> usize {
    if current.is_empty() {
        char_len(next)
    } else {
        char_len(current) + 1 + char_len(next)
    }
}

fn push_joined(current: &mut String, next: &str) {
    if !current.is_empty() {
        current.push(' ');
    }
    current.push_str(next);
}

/// Split `text` into speech chunks of at most `max_length` characters.
///
/// Never returns an empty list: if segmentation produces nothing the whole
/// input is returned as the only chunk.
pub fn chunk_text(text: &str, max_length: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in SENTENCE_REGEX.find_iter(text) {
        let sentence = sentence.as_str().trim();
        if sentence.is_empty() {
            continue;
        }

        if joined_len(&current, sentence) <= max_length {
            push_joined(&mut current, sentence);
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if char_len(sentence) <= max_length {
            current = sentence.to_string();
            continue;
        }

        for word in sentence.split_whitespace() {
            if joined_len(&current, word) > max_length && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            push_joined(&mut current, word);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    if chunks.is_empty() {
        vec![text.to_string()]
    } else {
        chunks
    }
}
