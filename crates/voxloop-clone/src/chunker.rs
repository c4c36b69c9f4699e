//! Sentence-aligned text batching for streaming synthesis.
//!
//! Fewer, larger batches reduce audible seams between chunks; the cap
//! keeps time-to-first-audio reasonable.

/// Split `text` into batches of at most `max_chars` characters, preferring
/// sentence boundaries and falling back to word boundaries for oversized
/// sentences. Whitespace-only input yields nothing.
pub fn chunk_text_for_streaming(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut sentences: Vec<String> = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?' | '\n') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    // Greedily pack sentences, splitting any single sentence that exceeds
    // the cap on word boundaries.
    let mut batches: Vec<String> = Vec::new();
    let mut batch = String::new();
    let mut flush = |batch: &mut String, batches: &mut Vec<String>| {
        if !batch.is_empty() {
            batches.push(std::mem::take(batch));
        }
    };

    for sentence in sentences {
        for piece in split_oversized(&sentence, max_chars) {
            let extra = if batch.is_empty() { 0 } else { 1 };
            if batch.chars().count() + extra + piece.chars().count() > max_chars {
                flush(&mut batch, &mut batches);
            }
            if !batch.is_empty() {
                batch.push(' ');
            }
            batch.push_str(&piece);
        }
    }
    flush(&mut batch, &mut batches);
    batches
}

fn split_oversized(sentence: &str, max_chars: usize) -> Vec<String> {
    if sentence.chars().count() <= max_chars {
        return vec![sentence.to_string()];
    }
    let mut pieces = Vec::new();
    let mut piece = String::new();
    for word in sentence.split_whitespace() {
        let extra = if piece.is_empty() { 0 } else { 1 };
        if !piece.is_empty() && piece.chars().count() + extra + word.chars().count() > max_chars {
            pieces.push(std::mem::take(&mut piece));
        }
        if !piece.is_empty() {
            piece.push(' ');
        }
        piece.push_str(word);
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_batch() {
        assert_eq!(
            chunk_text_for_streaming("Hello world.", 240),
            vec!["Hello world."]
        );
    }

    #[test]
    fn sentences_pack_up_to_the_cap() {
        let text = "One. Two. Three.";
        assert_eq!(
            chunk_text_for_streaming(text, 10),
            vec!["One. Two.", "Three."]
        );
        assert_eq!(chunk_text_for_streaming(text, 4), vec!["One.", "Two.", "Three."]);
        assert_eq!(chunk_text_for_streaming(text, 240), vec!["One. Two. Three."]);
    }

    #[test]
    fn oversized_sentence_splits_on_words() {
        let text = "alpha beta gamma delta epsilon";
        let batches = chunk_text_for_streaming(text, 12);
        assert!(batches.len() >= 2);
        assert!(batches.iter().all(|b| b.chars().count() <= 12));
        assert_eq!(batches.join(" "), text);
    }

    #[test]
    fn whitespace_only_yields_nothing() {
        assert!(chunk_text_for_streaming("   \n  ", 240).is_empty());
    }

    #[test]
    fn newlines_break_sentences() {
        let batches = chunk_text_for_streaming("line one\nline two", 8);
        assert_eq!(batches, vec!["line one", "line two"]);
    }
}
