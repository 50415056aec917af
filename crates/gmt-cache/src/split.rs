//! Deterministic, lossless text splitting.
//!
//! Chunks concatenate back to the exact source text. Cut points prefer
//! paragraph breaks, then line breaks, then a hard character cut, so code and
//! other structured content is not severed mid-token when avoidable.

/// Split `text` into chunks of at most `max_chars` characters each.
///
/// The same input always yields the same segmentation.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    assert!(max_chars > 0, "chunk size must be positive");

    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let Some((limit, _)) = rest.char_indices().nth(max_chars) else {
            // Remainder fits in one chunk.
            chunks.push(rest.to_string());
            break;
        };

        let window = &rest[..limit];
        let cut = pick_cut(window, limit);
        chunks.push(window[..cut].to_string());
        rest = &rest[cut..];
    }

    chunks
}

/// Best byte offset to cut a full window at, never zero.
fn pick_cut(window: &str, hard_limit: usize) -> usize {
    // Paragraph boundary: cut after the blank line.
    if let Some(pos) = window.rfind("\n\n") {
        let cut = pos + 2;
        if cut < hard_limit {
            return cut;
        }
    }
    // Line boundary: cut after the newline.
    if let Some(pos) = window.rfind('\n') {
        let cut = pos + 1;
        if cut < hard_limit {
            return cut;
        }
    }
    hard_limit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_round_trip(text: &str, max_chars: usize) {
        let chunks = split_text(text, max_chars);
        assert_eq!(chunks.concat(), text, "concat must reproduce source");
        for chunk in &chunks {
            assert!(chunk.chars().count() <= max_chars, "chunk over budget");
            assert!(!chunk.is_empty(), "empty chunk produced");
        }
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(split_text("", 100).is_empty());
    }

    #[test]
    fn test_short_input_single_chunk() {
        let chunks = split_text("hello", 100);
        assert_eq!(chunks, vec!["hello"]);
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let text = "first paragraph\n\nsecond paragraph that is fairly long";
        let chunks = split_text(text, 30);
        assert_eq!(chunks[0], "first paragraph\n\n");
        assert_round_trip(text, 30);
    }

    #[test]
    fn test_falls_back_to_line_boundary() {
        let text = "line one here\nline two here\nline three";
        let chunks = split_text(text, 20);
        assert!(chunks[0].ends_with('\n'));
        assert_round_trip(text, 20);
    }

    #[test]
    fn test_hard_cut_without_any_boundary() {
        let text = "x".repeat(25);
        let chunks = split_text(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks[2].len(), 5);
        assert_round_trip(&text, 10);
    }

    #[test]
    fn test_multibyte_hard_cut_is_char_safe() {
        let text = "🔥".repeat(10);
        let chunks = split_text(&text, 3);
        assert_eq!(chunks.len(), 4);
        assert_round_trip(&text, 3);
    }

    #[test]
    fn test_deterministic() {
        let text = "alpha\nbeta\n\ngamma\ndelta\n".repeat(40);
        assert_eq!(split_text(&text, 64), split_text(&text, 64));
        assert_round_trip(&text, 64);
    }

    #[test]
    fn test_large_split_count() {
        // 500k chars at 50k boundaries -> exactly 10 chunks for uniform input.
        let text = "a".repeat(500_000);
        let chunks = split_text(&text, 50_000);
        assert_eq!(chunks.len(), 10);
        assert_round_trip(&text, 50_000);
    }

    #[test]
    fn test_code_like_content_round_trip() {
        let text = "fn main() {\n    println!(\"hi\");\n}\n\nfn other() {\n    // body\n}\n";
        for size in [8, 16, 24, 100] {
            assert_round_trip(text, size);
        }
    }
}
