//! Sentence-aware sliding-window text chunker.
//!
//! Splits normalized document text into overlapping segments of at most
//! `max_chars` characters. Window ends snap backward to the last sentence
//! boundary in the window when one exists past 60% of the window, so
//! chunks rarely sever mid-sentence. Consecutive chunks overlap by
//! `overlap_chars` to preserve context continuity across cut points.
//!
//! Pure function over its inputs; chunking the same text with the same
//! parameters always yields the identical sequence.

/// Collapse all whitespace runs to single spaces and trim.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Split text into overlapping chunks of at most `max_chars` characters.
///
/// Empty (or all-whitespace) input yields an empty vector, not an error.
/// Operates on character positions, so multi-byte input is never split
/// inside a code point.
pub fn chunk_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let cleaned: Vec<char> = normalize_text(text).chars().collect();
    if cleaned.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    // The overlap must stay below the window size or the window cannot
    // advance. Config validation rejects this; clamp here as well so the
    // function can never loop on bad inputs.
    let overlap = overlap_chars.min(max_chars.saturating_sub(1));

    let len = cleaned.len();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut end = (start + max_chars).min(len);

        if end < len {
            // Snap backward to the last period in the window, but only
            // if that keeps the chunk past 60% of the window; closer
            // boundaries would shrink chunks too aggressively.
            if let Some(rel) = cleaned[start..end].iter().rposition(|&c| c == '.') {
                let period = start + rel;
                if (period as f64) > (start as f64) + (max_chars as f64) * 0.6 {
                    end = period + 1;
                }
            }
        }

        let piece: String = cleaned[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if end == len {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    chunks
}

/// Cheap length-derived token estimate stored alongside each chunk.
pub fn token_estimate(content: &str) -> i64 {
    content.chars().count() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 1200, 150).is_empty());
        assert!(chunk_text("   \n\t  ", 1200, 150).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 1200, 150);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_whitespace_normalized() {
        let chunks = chunk_text("alpha\n\nbeta\t  gamma", 1200, 150);
        assert_eq!(chunks, vec!["alpha beta gamma".to_string()]);
    }

    #[test]
    fn test_scenario_3000_chars_three_chunks() {
        // No periods, so every window hard-cuts at max_chars.
        let text: String = std::iter::repeat('a').take(3000).collect();
        let chunks = chunk_text(&text, 1200, 150);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 1200);
        // Second window starts at the first window's end minus the overlap.
        assert_eq!(chunks[1].chars().count(), 1200);
        assert_eq!(chunks[2].chars().count(), 3000 - 2100);
    }

    #[test]
    fn test_overlap_repeats_tail_of_previous_chunk() {
        let text: String = (0..2000).map(|i| ((b'a' + (i % 26) as u8) as char)).collect();
        let chunks = chunk_text(&text, 1200, 150);
        assert_eq!(chunks.len(), 2);
        let tail: String = chunks[0].chars().skip(1200 - 150).collect();
        let head: String = chunks[1].chars().take(150).collect();
        assert_eq!(tail, head);
    }

    #[test]
    fn test_sentence_boundary_snap() {
        // A period at position 999 (past 60% of the 1200 window) should
        // end the first chunk, even though 1200 chars would fit.
        let mut text: String = std::iter::repeat('x').take(999).collect();
        text.push('.');
        text.push_str(&"y".repeat(1000));
        let chunks = chunk_text(&text, 1200, 150);
        assert!(chunks[0].ends_with('.'));
        assert_eq!(chunks[0].chars().count(), 1000);
    }

    #[test]
    fn test_boundary_before_threshold_ignored() {
        // Period at 40% of the window is too early; the cut stays at
        // max_chars.
        let mut text: String = std::iter::repeat('x').take(480).collect();
        text.push('.');
        text.push_str(&"y".repeat(2000));
        let chunks = chunk_text(&text, 1200, 150);
        assert_eq!(chunks[0].chars().count(), 1200);
    }

    #[test]
    fn test_no_chunk_exceeds_max_chars() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(200);
        for chunk in chunk_text(&text, 500, 80) {
            assert!(chunk.chars().count() <= 500, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn test_coverage_no_gaps() {
        // Every character position of the normalized text must fall in
        // at least one chunk window. Unique words keep every chunk an
        // unambiguous substring, so offsets are exact.
        let text: String = (0..900).map(|i| format!("word{} ", i)).collect();
        let normalized = normalize_text(&text);
        let chunks = chunk_text(&text, 700, 100);

        let mut covered_to = 0usize;
        let mut search_from = 0usize;
        for chunk in &chunks {
            let at = normalized[search_from..]
                .find(chunk.as_str())
                .map(|p| p + search_from)
                .expect("chunk must be a substring of the normalized text");
            assert!(at <= covered_to, "gap before offset {}", at);
            covered_to = covered_to.max(at + chunk.len());
            search_from = at;
        }
        assert_eq!(covered_to, normalized.len());
    }

    #[test]
    fn test_deterministic() {
        let text = "Sentence one. Sentence two is a bit longer. Third sentence here. ".repeat(50);
        let a = chunk_text(&text, 400, 60);
        let b = chunk_text(&text, 400, 60);
        assert_eq!(a, b);
    }

    #[test]
    fn test_degenerate_overlap_terminates() {
        // overlap >= max_chars is clamped; must still terminate and
        // cover the text.
        let text: String = std::iter::repeat('z').take(500).collect();
        let chunks = chunk_text(&text, 100, 100);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn test_multibyte_input_is_safe() {
        let text = "héllo wörld. ".repeat(300);
        let chunks = chunk_text(&text, 256, 32);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 256);
        }
    }
}
